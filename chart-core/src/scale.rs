use serde::{Deserialize, Serialize};

use crate::window::{flattened, WindowSet};
use crate::ChartError;

/// Pixel extent of the chart surface, with axis margins carved out of it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlotArea {
    pub width: f64,
    pub height: f64,
    pub margin_top: f64,
    pub margin_right: f64,
    pub margin_bottom: f64,
    pub margin_left: f64,
}

impl Default for PlotArea {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 500.0,
            margin_top: 40.0,
            margin_right: 220.0,
            margin_bottom: 50.0,
            margin_left: 70.0,
        }
    }
}

impl PlotArea {
    /// Left-to-right pixel range for the time axis.
    pub fn x_range(&self) -> (f64, f64) {
        (self.margin_left, self.width - self.margin_right)
    }

    /// Bottom-to-top pixel range for the value axis (inverted, y grows down).
    pub fn y_range(&self) -> (f64, f64) {
        (self.height - self.margin_bottom, self.margin_top)
    }
}

/// Linear map from a data domain onto a pixel range, output clamped to the
/// range so coordinates never escape the plot area even when the input does.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearScale {
    d0: f64,
    d1: f64,
    r0: f64,
    r1: f64,
}

impl LinearScale {
    /// Degenerate domains (empty, equal endpoints, non-finite) fall back to a
    /// defined domain instead of letting NaN reach pixel coordinates: `[d0,
    /// d0+1]` when the anchor is finite, `[0, 1]` otherwise.
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        let (mut d0, mut d1) = domain;
        if !d0.is_finite() || !d1.is_finite() || d0 == d1 {
            if d0.is_finite() {
                d1 = d0 + 1.0;
            } else {
                d0 = 0.0;
                d1 = 1.0;
            }
        }
        Self {
            d0,
            d1,
            r0: range.0,
            r1: range.1,
        }
    }

    pub fn domain(&self) -> (f64, f64) {
        (self.d0, self.d1)
    }

    pub fn apply(&self, v: f64) -> f64 {
        let t = ((v - self.d0) / (self.d1 - self.d0)).clamp(0.0, 1.0);
        self.r0 + t * (self.r1 - self.r0)
    }
}

/// Fixed zoom constants.
///
/// `step`: pixels of range change per wheel notch. `margin`: minimum headroom
/// kept above the tallest visible value. `expansion_factor`: max zoom-out
/// ratio relative to that value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomConfig {
    pub step: f64,
    pub margin: f64,
    pub expansion_factor: f64,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            step: 10.0,
            margin: 10.0,
            expansion_factor: 1.5,
        }
    }
}

impl ZoomConfig {
    pub fn validate(&self) -> Result<(), ChartError> {
        if !(self.step > 0.0) {
            return Err(ChartError::InvalidConfig("zoom step must be > 0".into()));
        }
        if !(self.margin > 0.0) {
            return Err(ChartError::InvalidConfig("zoom margin must be > 0".into()));
        }
        if !(self.expansion_factor > 1.0) {
            return Err(ChartError::InvalidConfig(
                "zoom expansion factor must be > 1".into(),
            ));
        }
        Ok(())
    }
}

/// One wheel notch, mapped from the raw `deltaY` sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomDelta {
    /// Raise the upper bound (zoom out).
    Expand,
    /// Lower the upper bound (zoom in).
    Shrink,
}

impl ZoomDelta {
    /// Scrolling down shrinks the axis, scrolling up expands it.
    pub fn from_delta_y(delta_y: f64) -> Self {
        if delta_y > 0.0 {
            ZoomDelta::Shrink
        } else {
            ZoomDelta::Expand
        }
    }

    fn signum(self) -> f64 {
        match self {
            ZoomDelta::Expand => 1.0,
            ZoomDelta::Shrink => -1.0,
        }
    }
}

/// User-adjustable upper bound of the value axis. Mutated only by wheel
/// events; always clamped against the data currently in view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomState {
    pub y_max: f64,
}

impl Default for ZoomState {
    fn default() -> Self {
        Self { y_max: 100.0 }
    }
}

impl ZoomState {
    /// Apply one wheel notch against the tallest visible value.
    ///
    /// The result is clamped to `[data_max + margin, data_max *
    /// expansion_factor]`: the series is never clipped and zoom-out stays
    /// bounded. Should the data ever invert those bounds (tiny `data_max`
    /// against a large `margin`), the lower bound wins.
    pub fn apply_delta(&mut self, delta: ZoomDelta, data_max: f64, cfg: &ZoomConfig) {
        if !data_max.is_finite() {
            return;
        }
        let lo = data_max + cfg.margin;
        let hi = data_max * cfg.expansion_factor;
        let candidate = self.y_max + delta.signum() * cfg.step;
        self.y_max = if lo > hi { lo } else { candidate.clamp(lo, hi) };
    }
}

/// The coordinate mappings for one recompute cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartScales {
    /// Milliseconds since epoch -> x pixel.
    pub time: LinearScale,
    /// Price -> y pixel, domain `[0, y_max]`.
    pub price: LinearScale,
}

impl ChartScales {
    /// The y pixel of value zero, where bars and entering primitives grow from.
    pub fn baseline_y(&self) -> f64 {
        self.price.apply(0.0)
    }
}

/// The tallest value-or-high across every point in view.
pub fn data_max(windows: &WindowSet) -> Option<f64> {
    flattened(windows)
        .filter_map(|p| p.peak())
        .fold(None, |acc, v| Some(acc.map_or(v, |m: f64| m.max(v))))
}

/// Derive both axis mappings from the current windows and zoom state.
pub fn derive_scales(windows: &WindowSet, zoom: &ZoomState, area: &PlotArea) -> ChartScales {
    let mut t_min = i64::MAX;
    let mut t_max = i64::MIN;
    for point in flattened(windows) {
        if let Some(ms) = point.timestamp_ms() {
            t_min = t_min.min(ms);
            t_max = t_max.max(ms);
        }
    }
    let time_domain = if t_min > t_max {
        (f64::NAN, f64::NAN) // empty window, LinearScale falls back to [0, 1]
    } else {
        (t_min as f64, t_max as f64)
    };

    ChartScales {
        time: LinearScale::new(time_domain, area.x_range()),
        price: LinearScale::new((0.0, zoom.y_max), area.y_range()),
    }
}
