mod input;
mod loop_runner;
mod metrics;
mod perf_stats;
mod rendering;
mod scene;

pub use input::InputAction;
pub use loop_runner::{run_app, run_app_with_metrics, AppError, LoopConfig, SLOW_FRAME_ENV_VAR};
pub use metrics::{LoopMetricsSnapshot, MetricsHandle};
pub use perf_stats::{PerfStatsSnapshot, RollingMsStats};
pub use rendering::{write_frame_png, CaptureError, Renderer};
pub use scene::{InputSnapshot, Scene, SceneCommand};
