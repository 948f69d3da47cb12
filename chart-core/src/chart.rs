use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::interact::{EventResponse, InteractionState, Tooltip};
use crate::reconcile::{Diff, DrawnSet, KeyedPrimitives, Primitive, PrimitiveKey, Shape};
use crate::scale::{data_max, derive_scales, ChartScales, PlotArea, ZoomConfig, ZoomDelta, ZoomState};
use crate::tick::{validate, Tick};
use crate::window::{accumulate, WindowSet};
use crate::ChartError;

/// Radius of line-chart point marks.
const MARK_RADIUS: f64 = 4.0;
/// Half-width of bar and candle bodies, in pixels.
const BODY_HALF_WIDTH: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChartKind {
    Line,
    Bar,
    Candlestick,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartConfig {
    pub kind: ChartKind,
    /// Window cap per symbol.
    pub max_points: usize,
    /// Strict chronological mode; arrival order is the default.
    pub sort_by_timestamp: bool,
    pub plot: PlotArea,
    pub zoom: ZoomConfig,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            kind: ChartKind::Line,
            max_points: 15,
            sort_by_timestamp: false,
            plot: PlotArea::default(),
            zoom: ZoomConfig::default(),
        }
    }
}

impl ChartConfig {
    pub fn with_kind(mut self, kind: ChartKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_max_points(mut self, max_points: usize) -> Self {
        self.max_points = max_points;
        self
    }

    pub fn with_zoom(mut self, zoom: ZoomConfig) -> Self {
        self.zoom = zoom;
        self
    }

    pub fn validate(&self) -> Result<(), ChartError> {
        if self.max_points < 1 {
            return Err(ChartError::InvalidConfig("max_points must be >= 1".into()));
        }
        if !(self.plot.width > 0.0 && self.plot.height > 0.0) {
            return Err(ChartError::InvalidConfig(
                "plot area must have positive extent".into(),
            ));
        }
        self.zoom.validate()
    }
}

/// Lifecycle of a chart instance: `Empty` until the first valid point lands,
/// then `Populated` for the rest of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Empty,
    Populated,
}

/// Everything the host renderer needs for one frame: the derived axis
/// mappings and the minimal visual mutations against the previous frame.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPlan {
    pub scales: ChartScales,
    pub diff: Diff,
}

/// Per-symbol summary drawn next to the plot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub symbol: String,
    pub series_index: usize,
    pub low: f64,
    pub high: f64,
    pub average: f64,
}

/// One live chart: bounded per-symbol history, a zoom state, the last-drawn
/// primitive set, and hover state.
///
/// The host invokes [`ChartInstance::apply_batch`] for every delivered batch
/// and forwards pointer/wheel events; there is no hidden reactivity. Tearing
/// the chart down is dropping it (plus stopping its feed subscription).
#[derive(Debug)]
pub struct ChartInstance {
    config: ChartConfig,
    windows: WindowSet,
    zoom: ZoomState,
    drawn: DrawnSet,
    interaction: InteractionState,
    phase: Phase,
}

impl ChartInstance {
    pub fn new(config: ChartConfig) -> Result<Self, ChartError> {
        config.validate()?;
        Ok(Self {
            config,
            windows: WindowSet::new(),
            zoom: ZoomState::default(),
            drawn: DrawnSet::default(),
            interaction: InteractionState::default(),
            phase: Phase::Empty,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn windows(&self) -> &WindowSet {
        &self.windows
    }

    pub fn zoom(&self) -> &ZoomState {
        &self.zoom
    }

    pub fn drawn(&self) -> &DrawnSet {
        &self.drawn
    }

    /// One full recompute cycle: validate, accumulate, rescale, reconcile.
    ///
    /// Runs synchronously; the host's event loop serializes batches so a
    /// cycle is atomic with respect to the next delivery. Returns `None`
    /// while no valid point has ever landed (nothing to draw is not an
    /// error).
    pub fn apply_batch(&mut self, batch: &[Tick]) -> Option<RenderPlan> {
        let valid = validate(batch);
        self.windows = accumulate(&valid, &self.windows, self.config.max_points);
        self.recompute()
    }

    /// Recompute scales and the keyed diff from the current windows, without
    /// new data (used after zoom changes).
    pub fn recompute(&mut self) -> Option<RenderPlan> {
        if self.windows.values().all(|w| w.is_empty()) {
            return None;
        }
        self.phase = Phase::Populated;

        let scales = derive_scales(&self.windows, &self.zoom, &self.config.plot);
        let keyed = self.project(&scales);
        let diff = self.drawn.reconcile(keyed, scales.baseline_y());
        debug!(
            enter = diff.enter.len(),
            update = diff.update.len(),
            exit = diff.exit.len(),
            "recomputed chart frame"
        );
        Some(RenderPlan { scales, diff })
    }

    /// Wheel over the chart surface adjusts the vertical zoom; the default
    /// scroll is always consumed there. The host follows up with
    /// [`ChartInstance::recompute`] to redraw.
    pub fn on_wheel(&mut self, delta_y: f64) -> EventResponse {
        if let Some(max) = data_max(&self.windows) {
            self.zoom
                .apply_delta(ZoomDelta::from_delta_y(delta_y), max, &self.config.zoom);
        }
        EventResponse::ConsumeDefault
    }

    /// Hover-enter on a drawn primitive; per-point marks yield a tooltip.
    pub fn hover_enter(&mut self, key: &PrimitiveKey, pointer: (f64, f64)) -> Option<&Tooltip> {
        let primitive = self.drawn.get(key)?.clone();
        self.interaction.hover_enter(&primitive, pointer)
    }

    pub fn hover_exit(&mut self) {
        self.interaction.hover_exit();
    }

    pub fn tooltip(&self) -> Option<&Tooltip> {
        self.interaction.tooltip()
    }

    /// Low/high/average per symbol over the points currently in window.
    pub fn legend(&self) -> Vec<LegendEntry> {
        let mut entries = Vec::new();
        for (series_index, (symbol, window)) in self.windows.iter().enumerate() {
            let values: Vec<f64> = window.points().iter().filter_map(|p| p.plot_value()).collect();
            if values.is_empty() {
                continue;
            }
            let low = values.iter().copied().fold(f64::INFINITY, f64::min);
            let high = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let average = values.iter().sum::<f64>() / values.len() as f64;
            entries.push(LegendEntry {
                symbol: symbol.clone(),
                series_index,
                low,
                high,
                average,
            });
        }
        entries
    }

    // --- projection ---------------------------------------------------------

    /// Map the current windows onto keyed primitives for this chart kind.
    /// Points whose shape does not fit the kind (scalar-only in a candlestick
    /// chart, OHLC-only in a line chart) are skipped, not errors.
    fn project(&self, scales: &ChartScales) -> KeyedPrimitives {
        let mut keyed = KeyedPrimitives::new();
        for (series_index, (symbol, window)) in self.windows.iter().enumerate() {
            let points = if self.config.sort_by_timestamp {
                window.chronological()
            } else {
                window.points().to_vec()
            };
            match self.config.kind {
                ChartKind::Line => {
                    self.project_line(&mut keyed, symbol, series_index, &points, scales)
                }
                ChartKind::Bar => {
                    self.project_bars(&mut keyed, symbol, series_index, &points, scales)
                }
                ChartKind::Candlestick => {
                    self.project_candles(&mut keyed, symbol, series_index, &points, scales)
                }
            }
        }
        keyed
    }

    fn project_line(
        &self,
        keyed: &mut KeyedPrimitives,
        symbol: &str,
        series_index: usize,
        points: &[Tick],
        scales: &ChartScales,
    ) {
        let mut path = Vec::new();
        for point in points {
            let (Some(ms), true) = (point.timestamp_ms(), point.has_value()) else {
                continue;
            };
            let value = point.value.unwrap_or(0.0);
            let x = scales.time.apply(ms as f64);
            let y = scales.price.apply(value);
            path.push((x, y));
            keyed.insert(
                PrimitiveKey::Point {
                    symbol: symbol.to_string(),
                    timestamp: point.timestamp.clone(),
                },
                Primitive {
                    shape: Shape::Circle { cx: x, cy: y, r: MARK_RADIUS },
                    series_index,
                    source: Some(point.clone()),
                },
            );
        }
        if !path.is_empty() {
            keyed.insert(
                PrimitiveKey::Series(symbol.to_string()),
                Primitive {
                    shape: Shape::Path { points: path },
                    series_index,
                    source: None,
                },
            );
        }
    }

    fn project_bars(
        &self,
        keyed: &mut KeyedPrimitives,
        symbol: &str,
        series_index: usize,
        points: &[Tick],
        scales: &ChartScales,
    ) {
        let baseline = scales.baseline_y();
        for point in points {
            let (Some(ms), true) = (point.timestamp_ms(), point.has_value()) else {
                continue;
            };
            let value = point.value.unwrap_or(0.0);
            let x = scales.time.apply(ms as f64);
            let y = scales.price.apply(value);
            keyed.insert(
                PrimitiveKey::Point {
                    symbol: symbol.to_string(),
                    timestamp: point.timestamp.clone(),
                },
                Primitive {
                    shape: Shape::Rect {
                        x: x - BODY_HALF_WIDTH,
                        y,
                        width: BODY_HALF_WIDTH * 2.0,
                        height: (baseline - y).max(0.0),
                    },
                    series_index,
                    source: Some(point.clone()),
                },
            );
        }
    }

    fn project_candles(
        &self,
        keyed: &mut KeyedPrimitives,
        symbol: &str,
        series_index: usize,
        points: &[Tick],
        scales: &ChartScales,
    ) {
        let mut midline = Vec::new();
        for point in points {
            let (Some(ms), true) = (point.timestamp_ms(), point.has_ohlc()) else {
                continue;
            };
            let (open, high, low, close) = (
                point.open.unwrap_or(0.0),
                point.high.unwrap_or(0.0),
                point.low.unwrap_or(0.0),
                point.close.unwrap_or(0.0),
            );
            let x = scales.time.apply(ms as f64);
            midline.push((x, scales.price.apply((open + close) / 2.0)));
            keyed.insert(
                PrimitiveKey::Point {
                    symbol: symbol.to_string(),
                    timestamp: point.timestamp.clone(),
                },
                Primitive {
                    shape: Shape::Candle {
                        x,
                        half_width: BODY_HALF_WIDTH,
                        y_open: scales.price.apply(open),
                        y_close: scales.price.apply(close),
                        y_high: scales.price.apply(high),
                        y_low: scales.price.apply(low),
                        bullish: close > open,
                    },
                    series_index,
                    source: Some(point.clone()),
                },
            );
        }
        if !midline.is_empty() {
            keyed.insert(
                PrimitiveKey::Series(symbol.to_string()),
                Primitive {
                    shape: Shape::Path { points: midline },
                    series_index,
                    source: None,
                },
            );
        }
    }
}
