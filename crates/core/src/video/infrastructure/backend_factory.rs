use crate::video::domain::batch_encoder::BatchEncoder;
use crate::video::domain::video_writer::VideoWriter;

use super::ffmpeg_batch_encoder::{BatchOptions, FfmpegBatchEncoder};
use super::ffmpeg_pipe_writer::{FfmpegPipeWriter, PipeOptions};
use super::ffmpeg_writer::FfmpegWriter;

/// Which encoder turns frames into a video file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum EncoderBackend {
    /// Linked libav* libraries, codec chosen by four-character code.
    #[default]
    Native,
    /// External encoder fed raw frames over stdin.
    StreamingPipe(PipeOptions),
    /// External encoder run once over the saved image directory.
    BatchInvocation(BatchOptions),
}

impl EncoderBackend {
    pub fn name(&self) -> &'static str {
        match self {
            EncoderBackend::Native => "native",
            EncoderBackend::StreamingPipe(_) => "pipe",
            EncoderBackend::BatchInvocation(_) => "batch",
        }
    }
}

/// A ready-to-use backend. Streaming backends accept frames one by one;
/// the batch backend consumes a whole directory.
pub enum Backend {
    Streaming(Box<dyn VideoWriter>),
    Batch(Box<dyn BatchEncoder>),
}

impl Backend {
    pub fn is_batch(&self) -> bool {
        matches!(self, Backend::Batch(_))
    }
}

pub fn create_backend(config: &EncoderBackend) -> Backend {
    log::info!("Using {} encoder backend", config.name());
    match config {
        EncoderBackend::Native => Backend::Streaming(Box::new(FfmpegWriter::new())),
        EncoderBackend::StreamingPipe(options) => {
            Backend::Streaming(Box::new(FfmpegPipeWriter::new(options.clone())))
        }
        EncoderBackend::BatchInvocation(options) => {
            Backend::Batch(Box::new(FfmpegBatchEncoder::new(options.clone())))
        }
    }
}
