//! Plotters-powered line chart widget for Ratatui.
//!
//! We render Plotters output into the Ratatui buffer using `plotters-ratatui-backend`.
//! One widget type serves all three dashboard panels (price, volatility, RSI).

use plotters::prelude::*;
use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

/// A polyline split at missing values.
#[derive(Debug, Clone)]
pub struct ChartLine {
    pub segments: Vec<Vec<(f64, f64)>>,
    pub color: RGBColor,
}

impl ChartLine {
    /// Build from `(x, y)` pairs; a `None` ends the current segment.
    pub fn from_points(points: impl IntoIterator<Item = (f64, Option<f64>)>, color: RGBColor) -> Self {
        let mut segments = Vec::new();
        let mut current = Vec::new();
        for (x, y) in points {
            match y.filter(|v| v.is_finite()) {
                Some(y) => current.push((x, y)),
                None => {
                    if !current.is_empty() {
                        segments.push(std::mem::take(&mut current));
                    }
                }
            }
        }
        if !current.is_empty() {
            segments.push(current);
        }
        Self { segments, color }
    }

    pub fn y_extent(&self) -> Option<(f64, f64)> {
        let mut ys = self.segments.iter().flatten().map(|&(_, y)| y);
        let first = ys.next()?;
        Some(ys.fold((first, first), |(lo, hi), y| (lo.min(y), hi.max(y))))
    }
}

/// A render-only chart description.
///
/// All series and bounds are computed outside the render call, which keeps
/// `render()` focused on drawing.
pub struct LinePlottersChart<'a> {
    /// Drawn in order; later lines paint over earlier ones.
    pub lines: &'a [ChartLine],
    /// Highlighted points (anomalous days).
    pub markers: &'a [(f64, f64)],
    pub marker_color: RGBColor,
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
    pub x_label: &'a str,
    pub y_label: &'a str,
    pub fmt_x: &'a dyn Fn(f64) -> String,
    pub fmt_y: fn(f64) -> String,
}

impl Widget for LinePlottersChart<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // When the available area is too small, Plotters may fail to build a chart.
        if area.width < 20 || area.height < 6 {
            buf.set_string(
                area.x,
                area.y,
                "Chart area too small (resize terminal).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }

        let [x0, x1] = self.x_bounds;
        let [y0, y1] = self.y_bounds;
        if !(x0.is_finite() && x1.is_finite() && y0.is_finite() && y1.is_finite()) || x1 <= x0 || y1 <= y0 {
            return;
        }

        let widget = widget_fn(move |root| {
            let mut chart = ChartBuilder::on(&root)
                .margin(1)
                .set_label_area_size(LabelAreaPosition::Left, 6)
                .set_label_area_size(LabelAreaPosition::Bottom, 2)
                .build_cartesian_2d(x0..x1, y0..y1)?;

            // Mesh lines are clutter at terminal resolution.
            chart
                .configure_mesh()
                .disable_x_mesh()
                .disable_y_mesh()
                .x_desc(self.x_label)
                .y_desc(self.y_label)
                .x_labels(5)
                .y_labels(5)
                .x_label_formatter(&|v| (self.fmt_x)(*v))
                .y_label_formatter(&|v| (self.fmt_y)(*v))
                .label_style(("sans-serif", 10).into_font().color(&WHITE))
                .axis_style(&WHITE)
                .bold_line_style(&WHITE)
                .draw()?;

            for line in self.lines {
                for segment in &line.segments {
                    chart.draw_series(LineSeries::new(segment.iter().copied(), &line.color))?;
                }
            }

            // `Circle` radii are mis-scaled by the backend; a coloured pixel reads fine.
            chart.draw_series(self.markers.iter().map(|&(x, y)| Pixel::new((x, y), self.marker_color)))?;

            Ok(())
        });

        widget.render(area, buf);
    }
}
