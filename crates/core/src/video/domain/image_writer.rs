use std::path::Path;

use crate::shared::error::Result;
use crate::shared::frame::Frame;

/// Writes a single frame to an image file.
pub trait ImageWriter: Send {
    /// Writes a frame to the given path; the format follows the extension.
    fn write(&self, path: &Path, frame: &Frame) -> Result<()>;
}
