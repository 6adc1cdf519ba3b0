use std::path::Path;

use crate::shared::error::Result;
use crate::shared::image_extension::ImageExtension;
use crate::shared::video_spec::VideoSpec;

/// Encodes a directory of already-saved images in one external call.
///
/// No per-frame progress is available; the call blocks until the encoder
/// exits.
pub trait BatchEncoder: Send {
    fn encode(&self, source_dir: &Path, extension: ImageExtension, spec: &VideoSpec)
        -> Result<()>;
}
