//! ASCII/Unicode plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Price plot elements:
//! - close: `*` line
//! - short / long moving average: `:` / `=` lines
//! - forecast: `~` line continuing after the last close
//! - anomalous days: `A`

use crate::app::pipeline::DashboardRun;
use crate::domain::{AnomalyLabel, Column};

pub const LEGEND: &str = "* close  : sma short  = sma long  ~ forecast  A anomaly";

/// One polyline. `None` values break the line.
struct Layer {
    points: Vec<(f64, Option<f64>)>,
    ch: char,
}

/// Render the price chart for a dashboard run.
pub fn render_price_plot(run: &DashboardRun, width: usize, height: usize) -> String {
    let table = &run.table;
    let n = table.len();
    let indexed = |col: Column| -> Vec<(f64, Option<f64>)> {
        table.column(col).into_iter().enumerate().map(|(i, v)| (i as f64, v)).collect()
    };

    let mut layers = vec![
        Layer {
            points: indexed(Column::Close),
            ch: '*',
        },
        Layer {
            points: indexed(Column::SmaShort),
            ch: ':',
        },
        Layer {
            points: indexed(Column::SmaLong),
            ch: '=',
        },
    ];

    let mut x_max = n.saturating_sub(1) as f64;
    if let Some(forecast) = &run.forecast {
        // Start the forecast line at the last close so it reads as a continuation.
        let mut points: Vec<(f64, Option<f64>)> = table
            .rows
            .last()
            .map(|r| ((n - 1) as f64, r.bar.close))
            .into_iter()
            .collect();
        points.extend(
            forecast
                .predictions
                .iter()
                .enumerate()
                .map(|(i, p)| ((n + i) as f64, Some(p.close))),
        );
        x_max += forecast.predictions.len() as f64;
        layers.push(Layer { points, ch: '~' });
    }

    let markers: Vec<(f64, f64, char)> = match &run.labels {
        Some(labels) => table
            .rows
            .iter()
            .zip(&labels.labels)
            .enumerate()
            .filter(|(_, (_, l))| **l == Some(AnomalyLabel::Anomalous))
            .filter_map(|(i, (row, _))| Some((i as f64, row.bar.close?, 'A')))
            .collect(),
        None => Vec::new(),
    };

    let title = match (table.rows.first(), table.rows.last()) {
        (Some(a), Some(b)) => format!("Price {}: {} .. {}", table.symbol.usd_ticker(), a.bar.date, b.bar.date),
        _ => format!("Price {}", table.symbol.usd_ticker()),
    };
    render_plot(&title, &layers, &markers, (0.0, x_max), None, width, height)
}

/// Render a single column against the day index.
///
/// `y_fixed` pins the y-axis (e.g. `0..100` for RSI); otherwise it fits the data.
pub fn render_line_plot(
    title: &str,
    values: &[Option<f64>],
    y_fixed: Option<(f64, f64)>,
    width: usize,
    height: usize,
) -> String {
    let layer = Layer {
        points: values.iter().enumerate().map(|(i, &v)| (i as f64, v)).collect(),
        ch: '*',
    };
    let x_max = values.len().saturating_sub(1) as f64;
    render_plot(title, &[layer], &[], (0.0, x_max), y_fixed, width, height)
}

fn render_plot(
    title: &str,
    layers: &[Layer],
    markers: &[(f64, f64, char)],
    (x_min, x_max): (f64, f64),
    y_fixed: Option<(f64, f64)>,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);
    let x_max = if x_max > x_min { x_max } else { x_min + 1.0 };

    let (y_min, y_max) = match y_fixed {
        Some(range) => range,
        None => {
            let (lo, hi) = y_range(layers, markers).unwrap_or((0.0, 1.0));
            pad_range(lo, hi, 0.05)
        }
    };

    let mut grid = vec![vec![' '; width]; height];

    // Earlier layers win where lines overlap; markers overlay everything.
    for layer in layers {
        draw_layer(&mut grid, layer, (x_min, x_max), (y_min, y_max));
    }
    for &(x, y, ch) in markers {
        let col = map_x(x, x_min, x_max, width);
        let row = map_y(y, y_min, y_max, height);
        grid[row][col] = ch;
    }

    let mut out = String::new();
    out.push_str(&format!("{title} | y=[{y_min:.2}, {y_max:.2}]\n"));
    for row in grid {
        out.push_str(row.into_iter().collect::<String>().trim_end());
        out.push('\n');
    }
    out
}

fn y_range(layers: &[Layer], markers: &[(f64, f64, char)]) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;

    let values = layers
        .iter()
        .flat_map(|l| l.points.iter().filter_map(|&(_, y)| y))
        .chain(markers.iter().map(|&(_, y, _)| y));
    for y in values.filter(|y| y.is_finite()) {
        min_y = min_y.min(y);
        max_y = max_y.max(y);
    }

    if !(min_y.is_finite() && max_y.is_finite()) {
        return None;
    }
    if max_y > min_y {
        Some((min_y, max_y))
    } else {
        // Flat line: centre it.
        Some((min_y - 0.5, max_y + 0.5))
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_layer(grid: &mut [Vec<char>], layer: &Layer, (x_min, x_max): (f64, f64), (y_min, y_max): (f64, f64)) {
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(x, y) in &layer.points {
        let Some(y) = y.filter(|v| v.is_finite()) else {
            prev = None;
            continue;
        };
        let col = map_x(x, x_min, x_max, width);
        let row = map_y(y, y_min, y_max, height);
        match prev {
            Some((c0, r0)) => draw_line(grid, c0, r0, col, row, layer.ch),
            None => {
                if grid[row][col] == ' ' {
                    grid[row][col] = layer.ch;
                }
            }
        }
        prev = Some((col, row));
    }
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
