//! Live and offline orchestration

mod live;
mod offline;

pub use live::{LiveReport, LiveState, LiveVisualizer, StopReason};
pub use offline::{OfflineRenderer, RenderReport, RenderStage};
