pub mod chart;
pub mod interact;
pub mod reconcile;
pub mod scale;
pub mod tick;
pub mod window;

pub use chart::{ChartConfig, ChartInstance, ChartKind, LegendEntry, Phase, RenderPlan};
pub use interact::{EventResponse, InteractionState, Tooltip};
pub use reconcile::{Diff, DrawnSet, KeyedPrimitives, Primitive, PrimitiveKey, Shape};
pub use scale::{ChartScales, LinearScale, PlotArea, ZoomConfig, ZoomDelta, ZoomState};
pub use tick::{validate, Tick};
pub use window::{accumulate, SeriesWindow, WindowSet};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("invalid chart configuration: {0}")]
    InvalidConfig(String),
}
