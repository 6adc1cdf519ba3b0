use std::path::Path;

use crate::shared::error::Result;
use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Random-access frame reader over a video container.
///
/// Implementations handle I/O details (codec, container format, etc.)
/// while the pipeline works with the abstract `Frame` and `VideoMetadata`
/// types.
pub trait VideoReader: Send {
    /// Opens a video file and returns its metadata.
    fn open(&mut self, path: &Path) -> Result<VideoMetadata>;

    /// Best-effort frame count from container metadata.
    fn frame_count(&self) -> usize;

    /// Decodes the frame at `index`.
    ///
    /// Returns `None` past the end of the stream, on a decode failure, or
    /// when the reader is not open. Callers treat `None` as end of input.
    fn read_frame(&mut self, index: usize) -> Option<Frame>;

    /// Releases any resources held by the reader.
    fn close(&mut self);
}
