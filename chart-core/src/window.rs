use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::tick::Tick;

/// Per-symbol windows, ordered by symbol so every downstream traversal is
/// deterministic.
pub type WindowSet = BTreeMap<String, SeriesWindow>;

/// Bounded, insertion-ordered history for one symbol.
///
/// Points keep their arrival order even when upstream delivers out-of-order
/// timestamps; chronological ordering is an opt-in view, not the default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesWindow {
    points: Vec<Tick>,
}

impl SeriesWindow {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Tick] {
        &self.points
    }

    pub fn first(&self) -> Option<&Tick> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&Tick> {
        self.points.last()
    }

    /// Copy of the window sorted by parsed timestamp (strict mode only).
    /// Unparsable timestamps cannot occur here, validated points only.
    pub fn chronological(&self) -> Vec<Tick> {
        let mut sorted = self.points.clone();
        sorted.sort_by_key(|p| p.timestamp_ms().unwrap_or(i64::MIN));
        sorted
    }
}

/// Merge a validated batch into per-symbol windows, creating windows lazily
/// and capping each at `max_points` (oldest entries evicted first).
///
/// Returns a new map and leaves the input untouched, so callers can detect
/// whether aggregation changed anything by comparing the two. Truncation is
/// independent per symbol.
pub fn accumulate(batch: &[Tick], windows: &WindowSet, max_points: usize) -> WindowSet {
    let max_points = max_points.max(1);
    let mut next = windows.clone();
    for point in batch {
        next.entry(point.symbol.clone())
            .or_default()
            .points
            .push(point.clone());
    }
    for window in next.values_mut() {
        if window.points.len() > max_points {
            let excess = window.points.len() - max_points;
            window.points.drain(..excess);
        }
    }
    next
}

/// All points currently in view, across symbols.
pub fn flattened(windows: &WindowSet) -> impl Iterator<Item = &Tick> {
    windows.values().flat_map(|w| w.points.iter())
}
