/// Blank frames inserted between a title/credit card and the main sequence.
pub const FILLER_SECONDS: u32 = 1;

pub const DEFAULT_FRAME_RATE: u32 = 10;
pub const MAX_FRAME_RATE: u32 = 1000;

/// Four-character code used by the native writer when none is given.
pub const DEFAULT_NATIVE_FOURCC: &str = "mp4v";

/// ffmpeg encoder name used by the pipe and batch backends.
pub const DEFAULT_FFMPEG_ENCODER: &str = "libx264";
pub const DEFAULT_FFMPEG_PROGRAM: &str = "ffmpeg";

pub const PIPE_PIXEL_FORMAT_IN: &str = "bgr24";
pub const DEFAULT_PIXEL_FORMAT_OUT: &str = "yuv420p";

/// H.264/H.265 constant rate factor; lower means higher quality.
pub const DEFAULT_CRF: u32 = 23;
pub const MAX_CRF: u32 = 51;

pub const DEFAULT_IMAGE_PREFIX: &str = "image-";
pub const DEFAULT_IMAGE_START_ID: u64 = 10000;
