//! Rendering engine: upsample a calibrated grid and colour it.
//!
//! Pure and host-testable; the browser page served by the firmware runs the
//! same algorithms in JavaScript.

pub mod palette;
pub mod upsample;
pub mod viewer;

pub use palette::{colorize, normalize, Hsl, Palette, Rgb};
pub use upsample::{upsample, upsample_frame, UpsampledGrid};
pub use viewer::{FeedMode, RenderedImage, Viewer};
