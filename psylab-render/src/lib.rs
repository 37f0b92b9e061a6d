mod error;
pub mod geometry;
pub mod images;
mod render;
pub mod text;

pub use error::RenderError;
pub use render::{FrameStats, SkiaRenderer};
