use std::path::Path;

use crate::shared::error::Result;
use crate::shared::frame::Frame;

/// Loads one still image into a BGR [`Frame`].
pub trait FrameDecoder: Send {
    fn decode(&self, path: &Path) -> Result<Frame>;
}
