//! Errors raised while drawing, showing or saving plots.

use std::fmt;
use std::io;

#[derive(Debug)]
pub enum RenderError {
    /// Writing the image or spawning the worker failed
    Io(io::Error),
    /// plotters failed to draw, or the pixels could not be encoded
    ImageEncoding(String),
    /// Text could not be drawn because no font was found
    Font(String),
    InvalidConfig(String),
    /// minifb could not open or refresh the window
    WindowCreation(String),
    PlotterPanicked,
}

impl RenderError {
    /// Map a plotters `DrawingAreaErrorKind` onto a variant, keeping font
    /// failures apart so the caller can retry without labels.
    pub(crate) fn drawing<E: fmt::Debug>(err: E) -> Self {
        let detail = format!("{:?}", err);
        if detail.contains("FontError") {
            RenderError::Font(detail)
        } else {
            RenderError::ImageEncoding(detail)
        }
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::Io(e) => write!(f, "plot I/O failed: {}", e),
            RenderError::ImageEncoding(detail) => write!(f, "could not draw plot: {}", detail),
            RenderError::Font(detail) => write!(f, "no usable font: {}", detail),
            RenderError::InvalidConfig(reason) => write!(f, "bad plot config: {}", reason),
            RenderError::WindowCreation(detail) => write!(f, "plot window unavailable: {}", detail),
            RenderError::PlotterPanicked => f.write_str("plotting thread panicked"),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        if let RenderError::Io(e) = self {
            Some(e)
        } else {
            None
        }
    }
}

impl From<io::Error> for RenderError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

#[cfg(feature = "render")]
impl From<image::ImageError> for RenderError {
    fn from(e: image::ImageError) -> Self {
        Self::ImageEncoding(e.to_string())
    }
}

pub type RenderResult<T> = Result<T, RenderError>;
