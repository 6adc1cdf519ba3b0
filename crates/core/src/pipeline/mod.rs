pub mod assemble_video_use_case;
pub mod extract_frames_use_case;
