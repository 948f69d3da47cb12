use serde::Serialize;

use crate::reconcile::Primitive;

/// What the host must do with the originating browser event after the core
/// has handled it. Wheel events over the chart surface always consume the
/// default so the page does not scroll underneath the zoom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResponse {
    ConsumeDefault,
    Propagate,
}

/// Snapshot shown next to the pointer while hovering a per-point mark.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tooltip {
    pub symbol: String,
    pub timestamp: String,
    pub value: Option<f64>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    /// Pointer page coordinates at hover-enter.
    pub x: f64,
    pub y: f64,
}

/// Hover state: at most one active tooltip per chart, set on hover-enter and
/// cleared on hover-exit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InteractionState {
    tooltip: Option<Tooltip>,
}

impl InteractionState {
    /// Series-level primitives (paths) carry no source point and produce no
    /// tooltip; hovering one leaves the current state alone.
    pub fn hover_enter(&mut self, primitive: &Primitive, pointer: (f64, f64)) -> Option<&Tooltip> {
        let source = primitive.source.as_ref()?;
        self.tooltip = Some(Tooltip {
            symbol: source.symbol.clone(),
            timestamp: source.timestamp.clone(),
            value: source.value,
            open: source.open,
            high: source.high,
            low: source.low,
            close: source.close,
            x: pointer.0,
            y: pointer.1,
        });
        self.tooltip.as_ref()
    }

    pub fn hover_exit(&mut self) {
        self.tooltip = None;
    }

    pub fn tooltip(&self) -> Option<&Tooltip> {
        self.tooltip.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::Shape;
    use crate::tick::Tick;

    fn mark(tick: Tick) -> Primitive {
        Primitive {
            shape: Shape::Circle { cx: 0.0, cy: 0.0, r: 4.0 },
            series_index: 0,
            source: Some(tick),
        }
    }

    #[test]
    fn hover_enter_sets_tooltip_from_source_point() {
        let mut state = InteractionState::default();
        let tick = Tick::ohlc_point("AAPL", "2024-03-01T20:00:00Z", 10.0, 12.0, 9.0, 11.0);
        let tooltip = state.hover_enter(&mark(tick), (120.0, 80.0)).unwrap();
        assert_eq!(tooltip.symbol, "AAPL");
        assert_eq!(tooltip.high, Some(12.0));
        assert_eq!((tooltip.x, tooltip.y), (120.0, 80.0));
    }

    #[test]
    fn hover_exit_clears_tooltip() {
        let mut state = InteractionState::default();
        state.hover_enter(
            &mark(Tick::value_point("AAPL", "2024-03-01T20:00:00Z", 10.0)),
            (0.0, 0.0),
        );
        assert!(state.tooltip().is_some());
        state.hover_exit();
        assert!(state.tooltip().is_none());
    }

    #[test]
    fn at_most_one_tooltip_active() {
        let mut state = InteractionState::default();
        state.hover_enter(
            &mark(Tick::value_point("AAPL", "2024-03-01T20:00:00Z", 10.0)),
            (0.0, 0.0),
        );
        state.hover_enter(
            &mark(Tick::value_point("MSFT", "2024-03-01T20:00:01Z", 20.0)),
            (5.0, 5.0),
        );
        assert_eq!(state.tooltip().unwrap().symbol, "MSFT");
    }

    #[test]
    fn series_path_produces_no_tooltip() {
        let mut state = InteractionState::default();
        let path = Primitive {
            shape: Shape::Path { points: vec![] },
            series_index: 0,
            source: None,
        };
        assert!(state.hover_enter(&path, (0.0, 0.0)).is_none());
        assert!(state.tooltip().is_none());
    }
}
