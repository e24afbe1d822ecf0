//! Rendering backends.
//!
//! Only a bitmap backend exists: the live window shows its RGB buffers and
//! the saved learning curve is its PNG output.

mod image;

pub use image::{save_png, ImageBackend};
