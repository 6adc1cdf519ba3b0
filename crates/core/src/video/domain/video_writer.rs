use crate::shared::error::Result;
use crate::shared::frame::Frame;
use crate::shared::video_spec::VideoSpec;

/// A frame-at-a-time encoding session bound to one output file.
///
/// Lifecycle is `open` → `write`* → `close`. Writing before `open` or after
/// `close` fails fast; `close` on a writer that is not open is a no-op.
pub trait VideoWriter: Send {
    fn open(&mut self, spec: &VideoSpec) -> Result<()>;

    /// Appends one frame. Frames must arrive in presentation order and match
    /// the size given to `open`.
    fn write(&mut self, frame: &Frame) -> Result<()>;

    /// Flushes and finalizes the output.
    fn close(&mut self) -> Result<()>;
}
