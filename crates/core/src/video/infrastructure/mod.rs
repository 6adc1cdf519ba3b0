pub mod backend_factory;
pub mod ffmpeg_batch_encoder;
pub mod ffmpeg_pipe_writer;
pub mod ffmpeg_reader;
pub mod ffmpeg_writer;
pub mod image_file_decoder;
pub mod image_file_writer;
