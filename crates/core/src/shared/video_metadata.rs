use std::path::PathBuf;

/// What a reader learned about a video when opening it.
///
/// `total_frames` is container metadata and may overstate (or understate)
/// the number of frames that actually decode.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub total_frames: usize,
    pub codec: String,
    pub source_path: Option<PathBuf>,
}
