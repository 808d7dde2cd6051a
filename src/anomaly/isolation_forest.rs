//! Isolation Forest outlier model.
//!
//! Anomalies are easier to isolate: random axis-aligned splits separate them
//! from the bulk of the data in fewer steps, so their average path length across
//! the forest is short.

use nalgebra::DMatrix;
use rand::prelude::*;
use rand::rngs::StdRng;

use super::{ModelLabel, OutlierModel};
use crate::domain::AnomalyConfig;
use crate::error::AppError;

#[derive(Debug, Clone)]
enum Node {
    Internal {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
    Leaf {
        size: usize,
    },
}

impl Node {
    fn build(data: &DMatrix<f64>, rows: &[usize], depth: usize, max_depth: usize, rng: &mut StdRng) -> Node {
        if depth >= max_depth || rows.len() <= 1 {
            return Node::Leaf { size: rows.len() };
        }

        let feature = rng.gen_range(0..data.ncols());
        let (min, max) = rows.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &r| {
            let v = data[(r, feature)];
            (lo.min(v), hi.max(v))
        });
        if max - min <= 1e-12 {
            return Node::Leaf { size: rows.len() };
        }

        let threshold = rng.gen_range(min..max);
        let (left, right): (Vec<usize>, Vec<usize>) =
            rows.iter().copied().partition(|&r| data[(r, feature)] < threshold);
        if left.is_empty() || right.is_empty() {
            return Node::Leaf { size: rows.len() };
        }

        Node::Internal {
            feature,
            threshold,
            left: Box::new(Node::build(data, &left, depth + 1, max_depth, rng)),
            right: Box::new(Node::build(data, &right, depth + 1, max_depth, rng)),
        }
    }

    fn path_length(&self, data: &DMatrix<f64>, row: usize, depth: usize) -> f64 {
        match self {
            Node::Leaf { size } => depth as f64 + average_path_length(*size),
            Node::Internal {
                feature,
                threshold,
                left,
                right,
            } => {
                if data[(row, *feature)] < *threshold {
                    left.path_length(data, row, depth + 1)
                } else {
                    right.path_length(data, row, depth + 1)
                }
            }
        }
    }
}

/// Average path length of an unsuccessful BST search over `n` points.
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + 0.577_215_664_9) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Isolation Forest with a fixed contamination rate and seed.
#[derive(Debug, Clone)]
pub struct IsolationForest {
    pub n_trees: usize,
    pub max_samples: usize,
    /// Expected share of outliers; the top `ceil(n * contamination)` scores are flagged.
    pub contamination: f64,
    pub seed: u64,
}

impl IsolationForest {
    pub fn new(config: &AnomalyConfig, seed: u64) -> Self {
        Self {
            n_trees: config.n_trees,
            max_samples: config.max_samples,
            contamination: config.contamination,
            seed,
        }
    }

    /// Anomaly score per row in `(0, 1]`; higher is more anomalous.
    pub fn score_samples(&self, data: &DMatrix<f64>) -> Vec<f64> {
        let n = data.nrows();
        if n == 0 || data.ncols() == 0 {
            return vec![0.5; n];
        }

        let sample_size = self.max_samples.min(n).max(1);
        let max_depth = (sample_size as f64).log2().ceil() as usize;
        let mut rng = StdRng::seed_from_u64(self.seed);

        let trees: Vec<Node> = (0..self.n_trees.max(1))
            .map(|_| {
                let rows = rand::seq::index::sample(&mut rng, n, sample_size).into_vec();
                Node::build(data, &rows, 0, max_depth, &mut rng)
            })
            .collect();

        let c = average_path_length(sample_size);
        (0..n)
            .map(|row| {
                let mean_path =
                    trees.iter().map(|t| t.path_length(data, row, 0)).sum::<f64>() / trees.len() as f64;
                if c > 0.0 { 2.0_f64.powf(-mean_path / c) } else { 0.5 }
            })
            .collect()
    }
}

impl OutlierModel for IsolationForest {
    fn name(&self) -> &str {
        "isolation-forest"
    }

    fn fit_predict(&mut self, features: &DMatrix<f64>) -> Result<Vec<ModelLabel>, AppError> {
        if features.iter().any(|v| !v.is_finite()) {
            return Err(AppError::external(self.name(), "feature matrix contains non-finite values"));
        }

        let n = features.nrows();
        let scores = self.score_samples(features);
        let n_outliers = ((n as f64) * self.contamination).ceil() as usize;

        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| scores[b].partial_cmp(&scores[a]).unwrap_or(std::cmp::Ordering::Equal));

        let mut labels = vec![ModelLabel::Inlier; n];
        for &row in order.iter().take(n_outliers.min(n)) {
            labels[row] = ModelLabel::Outlier;
        }
        Ok(labels)
    }
}
