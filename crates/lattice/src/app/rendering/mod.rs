mod capture;
mod raster;
mod renderer;

pub use capture::{write_frame_png, CaptureError};
pub(crate) use capture::next_capture_path;
pub use renderer::Renderer;
