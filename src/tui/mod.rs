//! Ratatui-based terminal UI.
//!
//! The TUI provides a settings panel for the dashboard sliders (symbol, days of
//! history, moving-average and volatility windows), then renders the price,
//! volatility and RSI charts plus the summary, anomaly, forecast and sentiment
//! panels for the current settings.
//!
//! Fetched bars are cached per `(symbol, range)`; changing only a window
//! re-runs the pipeline on the cached series.

use std::io;
use std::time::Duration;

use chrono::NaiveDate;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use plotters::style::RGBColor;
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};

use crate::anomaly::IsolationForest;
use crate::app::pipeline::{DashboardRun, Section, run_dashboard_on_series};
use crate::cli::DashboardArgs;
use crate::data::{MarketDataSource, SentimentSource};
use crate::domain::{
    AnomalyLabel, Column, DashboardConfig, HORIZON_DAYS, LONG_WINDOW, SHORT_WINDOW, Series, Symbol,
    VOLATILITY_WINDOW,
};
use crate::error::AppError;
use crate::forecast::LinearAutoregressor;

mod plotters_chart;

use plotters_chart::{ChartLine, LinePlottersChart};

const DAYS_STEP: u32 = 10;
const FIELD_COUNT: usize = 5;

const CLOSE_COLOR: RGBColor = RGBColor(255, 255, 255);
const SMA_SHORT_COLOR: RGBColor = RGBColor(0, 255, 255);
const SMA_LONG_COLOR: RGBColor = RGBColor(255, 0, 255);
const FORECAST_COLOR: RGBColor = RGBColor(255, 255, 0);
const ANOMALY_COLOR: RGBColor = RGBColor(255, 0, 0);
const INDICATOR_COLOR: RGBColor = RGBColor(0, 255, 0);

/// Start the TUI.
pub fn run(args: DashboardArgs) -> Result<(), AppError> {
    let config = crate::app::dashboard_config_from_args(&args);
    config.validate()?;
    let market = crate::app::build_market_source(&args)?;
    let sentiment = crate::app::build_sentiment_source(&args);

    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal =
        Terminal::new(backend).map_err(|e| AppError::terminal(format!("failed to initialize terminal: {e}")))?;

    let today = chrono::Local::now().date_naive();
    let mut app = App::new(config, today, market, sentiment);
    app.refresh();
    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::terminal(format!("failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::terminal(format!("failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

/// Bars fetched for one `(symbol, range)`.
struct CachedSeries {
    symbol: Symbol,
    range: (NaiveDate, NaiveDate),
    series: Series,
}

struct App {
    config: DashboardConfig,
    today: NaiveDate,
    market: Box<dyn MarketDataSource>,
    sentiment: Box<dyn SentimentSource>,
    cache: Option<CachedSeries>,
    selected_field: usize,
    status: String,
    /// A fatal error for the current settings; replaces the charts.
    error: Option<String>,
    run: Option<DashboardRun>,
}

impl App {
    fn new(
        config: DashboardConfig,
        today: NaiveDate,
        market: Box<dyn MarketDataSource>,
        sentiment: Box<dyn SentimentSource>,
    ) -> Self {
        Self {
            config,
            today,
            market,
            sentiment,
            cache: None,
            selected_field: 0,
            status: String::new(),
            error: None,
            run: None,
        }
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::terminal(format!("draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100)).map_err(|e| AppError::terminal(format!("event poll error: {e}")))? {
                continue;
            }

            match event::read().map_err(|e| AppError::terminal(format!("event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns `true` when the user asked to quit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Up => {
                self.selected_field = self.selected_field.saturating_sub(1);
            }
            KeyCode::Down => {
                if self.selected_field + 1 < FIELD_COUNT {
                    self.selected_field += 1;
                }
            }
            KeyCode::Left => self.adjust_field(-1),
            KeyCode::Right => self.adjust_field(1),
            KeyCode::Char('r') => {
                self.cache = None;
                self.refresh();
            }
            _ => {}
        }
        false
    }

    fn adjust_field(&mut self, delta: i32) {
        let mut next = self.config.clone();
        let w = &mut next.windows;
        match self.selected_field {
            0 => {
                next.symbol = if delta >= 0 {
                    next.symbol.next()
                } else {
                    next.symbol.prev()
                };
            }
            1 => next.horizon_days = step_u32(next.horizon_days, delta, DAYS_STEP, HORIZON_DAYS.0, HORIZON_DAYS.1),
            2 => w.short_window = step_usize(w.short_window, delta, SHORT_WINDOW.0, SHORT_WINDOW.1),
            3 => w.long_window = step_usize(w.long_window, delta, LONG_WINDOW.0, LONG_WINDOW.1),
            4 => {
                w.volatility_window = step_usize(w.volatility_window, delta, VOLATILITY_WINDOW.0, VOLATILITY_WINDOW.1)
            }
            _ => {}
        }

        if next == self.config {
            return;
        }
        // Rejected settings never reach the pipeline.
        if let Err(err) = next.validate() {
            self.status = err.to_string();
            return;
        }
        self.config = next;
        self.refresh();
    }

    /// Re-run the pipeline for the current settings, fetching only when the
    /// symbol or range changed.
    fn refresh(&mut self) {
        let range = self.config.date_range(self.today);
        let cached = self
            .cache
            .as_ref()
            .is_some_and(|c| c.symbol == self.config.symbol && c.range == range);

        if !cached {
            match self.market.fetch(self.config.symbol, range.0, range.1) {
                Ok(series) if !series.is_empty() => {
                    self.cache = Some(CachedSeries {
                        symbol: self.config.symbol,
                        range,
                        series,
                    });
                }
                Ok(_) => {
                    self.fail(AppError::unavailable(format!(
                        "{} returned no bars for {}",
                        self.market.name(),
                        self.config.symbol
                    )));
                    return;
                }
                Err(err) => {
                    self.fail(err);
                    return;
                }
            }
        }

        let Some(cache) = &self.cache else {
            return;
        };
        let mut outlier = IsolationForest::new(&self.config.anomaly, self.config.seed);
        let mut sequence = LinearAutoregressor::new();
        let result = run_dashboard_on_series(
            &self.config,
            cache.series.clone(),
            cache.range,
            self.market.name(),
            self.sentiment.as_ref(),
            &mut outlier,
            &mut sequence,
        );

        match result {
            Ok(run) => {
                self.status = match run.warnings.len() {
                    0 => format!("{} rows from {}", run.table.len(), run.source),
                    n => format!("{} rows from {} | {n} warning(s)", run.table.len(), run.source),
                };
                self.error = None;
                self.run = Some(run);
            }
            Err(err) => self.fail(err),
        }
    }

    fn fail(&mut self, err: AppError) {
        self.status = format!("error: {err}");
        self.error = Some(err.to_string());
        self.run = None;
    }

    fn draw(&self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let (start, end) = self.config.date_range(self.today);
        let mut lines = vec![
            Line::from(vec![
                Span::styled("cdash", Style::default().fg(Color::Cyan)),
                Span::raw(format!(" {} Analysis Dashboard", self.config.symbol.usd_ticker())),
            ]),
            Line::from(Span::styled(
                format!(
                    "range: {start} .. {end} | SMA {}/{} | vol {} | RSI {}",
                    self.config.windows.short_window,
                    self.config.windows.long_window,
                    self.config.windows.volatility_window,
                    self.config.windows.rsi_window,
                ),
                Style::default().fg(Color::Gray),
            )),
        ];
        if let Some(stats) = self.run.as_ref().and_then(|r| r.summary.close.as_ref()) {
            lines[1].spans.push(Span::styled(
                format!(
                    " | close mean {:.2} min {:.2} max {:.2}",
                    stats.mean, stats.min, stats.max
                ),
                Style::default().fg(Color::Gray),
            ));
        }

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(34), Constraint::Min(0)])
            .split(area);

        let side = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(7), Constraint::Min(0)])
            .split(columns[0]);
        self.draw_settings(frame, side[0]);
        self.draw_panels(frame, side[1]);

        let charts = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(25), Constraint::Percentage(25)])
            .split(columns[1]);

        let Some(run) = &self.run else {
            let block = Block::default().title("Price").borders(Borders::ALL);
            let inner = block.inner(columns[1]);
            frame.render_widget(block, columns[1]);
            let (msg, color) = match &self.error {
                Some(err) => (err.as_str(), Color::Red),
                None => ("Waiting for data...", Color::Yellow),
            };
            frame.render_widget(
                Paragraph::new(msg).style(Style::default().fg(color)).wrap(Wrap { trim: true }),
                inner,
            );
            return;
        };

        let start = run.table.rows.first().map(|r| r.bar.date);
        let fmt_x = move |v: f64| match start {
            Some(d) => (d + chrono::Duration::days(v.round() as i64)).format("%m-%d").to_string(),
            None => format!("{v:.0}"),
        };

        let (lines, markers) = price_lines(run);
        draw_chart(frame, charts[0], "Price", &lines, &markers, None, "usd", &fmt_x);

        let vol = [indexed_line(run, Column::Volatility, INDICATOR_COLOR)];
        draw_chart(frame, charts[1], "Volatility", &vol, &[], None, "vol", &fmt_x);

        let rsi = [indexed_line(run, Column::Rsi, INDICATOR_COLOR)];
        draw_chart(frame, charts[2], "RSI", &rsi, &[], Some([0.0, 100.0]), "rsi", &fmt_x);
    }

    fn draw_settings(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let w = self.config.windows;
        let items = vec![
            ListItem::new(format!("Symbol: {}", self.config.symbol)),
            ListItem::new(format!("Days: {}", self.config.horizon_days)),
            ListItem::new(format!("Short MA: {}", w.short_window)),
            ListItem::new(format!("Long MA: {}", w.long_window)),
            ListItem::new(format!("Volatility: {}", w.volatility_window)),
        ];

        let list = List::new(items)
            .block(Block::default().title("Settings").borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");

        let mut state = ratatui::widgets::ListState::default();
        state.select(Some(self.selected_field));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_panels(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().title("Signals").borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let Some(run) = &self.run else {
            return;
        };
        let label = Style::default().add_modifier(Modifier::BOLD);
        let warn = Style::default().fg(Color::Yellow);
        let mut lines: Vec<Line> = Vec::new();

        lines.push(Line::from(Span::styled("Anomalies", label)));
        match &run.labels {
            Some(labels) => {
                lines.push(Line::from(format!(
                    "{} of {} days",
                    labels.anomalous_count(),
                    labels.scored_count()
                )));
                let recent = run
                    .table
                    .rows
                    .iter()
                    .zip(&labels.labels)
                    .rev()
                    .filter(|(_, l)| **l == Some(AnomalyLabel::Anomalous))
                    .take(3);
                for (row, _) in recent {
                    lines.push(Line::from(format!("  {}", row.bar.date)));
                }
            }
            None => lines.push(Line::from("n/a")),
        }
        push_warnings(&mut lines, run, Section::Anomalies, warn);

        lines.push(Line::from(Span::styled("Forecast", label)));
        match &run.forecast {
            Some(f) => {
                for p in &f.predictions {
                    lines.push(Line::from(format!("  {}  {:.4}", p.date, p.close)));
                }
            }
            None => lines.push(Line::from("n/a")),
        }
        push_warnings(&mut lines, run, Section::Forecast, warn);

        lines.push(Line::from(Span::styled("Sentiment", label)));
        lines.push(Line::from(
            run.sentiment.map_or_else(|| "n/a".to_string(), |s| format!("{s:+.2}")),
        ));
        push_warnings(&mut lines, run, Section::Sentiment, warn);
        push_warnings(&mut lines, run, Section::Data, warn);
        push_warnings(&mut lines, run, Section::Indicators, warn);

        frame.render_widget(Paragraph::new(Text::from(lines)).wrap(Wrap { trim: true }), inner);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "↑/↓ select  ←/→ adjust  r refetch  q quit";
        let status_color = if self.error.is_some() { Color::Red } else { Color::Yellow };
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(status_color)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

fn push_warnings(lines: &mut Vec<Line<'_>>, run: &DashboardRun, section: Section, style: Style) {
    for w in run.warnings_for(section) {
        lines.push(Line::from(Span::styled(format!("! {}", w.message), style)));
    }
}

#[allow(clippy::too_many_arguments)]
fn draw_chart(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    title: &str,
    lines: &[ChartLine],
    markers: &[(f64, f64)],
    y_fixed: Option<[f64; 2]>,
    y_label: &str,
    fmt_x: &dyn Fn(f64) -> String,
) {
    let block = Block::default().title(title.to_string()).borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    frame.render_widget(Clear, inner);

    let Some(x_bounds) = x_bounds(lines) else {
        frame.render_widget(
            Paragraph::new("No data for this window.").style(Style::default().fg(Color::Yellow)),
            inner,
        );
        return;
    };
    let y_bounds = y_fixed.unwrap_or_else(|| y_bounds(lines, markers));

    let widget = LinePlottersChart {
        lines,
        markers,
        marker_color: ANOMALY_COLOR,
        x_bounds,
        y_bounds,
        x_label: "date",
        y_label,
        fmt_x,
        fmt_y: fmt_axis_y,
    };
    frame.render_widget(widget, inner);
}

/// Close, both moving averages and the forecast continuation, plus anomaly markers.
fn price_lines(run: &DashboardRun) -> (Vec<ChartLine>, Vec<(f64, f64)>) {
    let mut lines = vec![
        indexed_line(run, Column::Close, CLOSE_COLOR),
        indexed_line(run, Column::SmaShort, SMA_SHORT_COLOR),
        indexed_line(run, Column::SmaLong, SMA_LONG_COLOR),
    ];

    let n = run.table.len();
    if let (Some(forecast), Some(last)) = (&run.forecast, run.table.rows.last()) {
        let anchor = ((n - 1) as f64, last.bar.close);
        let points = std::iter::once(anchor).chain(
            forecast
                .predictions
                .iter()
                .enumerate()
                .map(|(i, p)| ((n + i) as f64, Some(p.close))),
        );
        lines.push(ChartLine::from_points(points, FORECAST_COLOR));
    }

    let markers = match &run.labels {
        Some(labels) => run
            .table
            .rows
            .iter()
            .zip(&labels.labels)
            .enumerate()
            .filter(|(_, (_, l))| **l == Some(AnomalyLabel::Anomalous))
            .filter_map(|(i, (row, _))| Some((i as f64, row.bar.close?)))
            .collect(),
        None => Vec::new(),
    };
    (lines, markers)
}

fn indexed_line(run: &DashboardRun, column: Column, color: RGBColor) -> ChartLine {
    let values = run.table.column(column);
    ChartLine::from_points(values.into_iter().enumerate().map(|(i, v)| (i as f64, v)), color)
}

fn x_bounds(lines: &[ChartLine]) -> Option<[f64; 2]> {
    let mut xs = lines.iter().flat_map(|l| l.segments.iter().flatten().map(|&(x, _)| x));
    let first = xs.next()?;
    let (lo, hi) = xs.fold((first, first), |(lo, hi), x| (lo.min(x), hi.max(x)));
    Some(if hi > lo { [lo, hi] } else { [lo - 0.5, hi + 0.5] })
}

fn y_bounds(lines: &[ChartLine], markers: &[(f64, f64)]) -> [f64; 2] {
    let extent = lines
        .iter()
        .filter_map(ChartLine::y_extent)
        .chain(markers.iter().map(|&(_, y)| (y, y)))
        .reduce(|(a, b), (c, d)| (a.min(c), b.max(d)));

    let (y_min, y_max) = match extent {
        Some((lo, hi)) if hi > lo => (lo, hi),
        Some((lo, hi)) => (lo - 0.5, hi + 0.5),
        None => (0.0, 1.0),
    };
    let pad = ((y_max - y_min).abs() * 0.05).max(1e-12);
    [y_min - pad, y_max + pad]
}

fn fmt_axis_y(v: f64) -> String {
    if v.abs() >= 1000.0 {
        format!("{v:.0}")
    } else if v.abs() >= 1.0 {
        format!("{v:.1}")
    } else {
        format!("{v:.3}")
    }
}

fn step_u32(value: u32, delta: i32, step: u32, min: u32, max: u32) -> u32 {
    if delta >= 0 {
        value.saturating_add(step).min(max)
    } else {
        value.saturating_sub(step).max(min)
    }
}

fn step_usize(value: usize, delta: i32, min: usize, max: usize) -> usize {
    if delta >= 0 {
        (value + 1).min(max)
    } else {
        value.saturating_sub(1).max(min)
    }
}
