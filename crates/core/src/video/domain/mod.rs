pub mod batch_encoder;
pub mod frame_decoder;
pub mod image_writer;
pub mod session_state;
pub mod video_reader;
pub mod video_writer;
