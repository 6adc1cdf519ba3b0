pub mod constants;
pub mod error;
pub mod frame;
pub mod image_extension;
pub mod progress;
pub mod video_metadata;
pub mod video_spec;
