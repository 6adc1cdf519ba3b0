//! Image sequence to video assembly and frame extraction.
//!
//! Frames travel as packed BGR buffers ([`shared::frame::Frame`]). The
//! assembler feeds them to one of three encoder backends; the extractor
//! reads them back out of a video into numbered image files.

pub mod pipeline;
pub mod sequence;
pub mod shared;
pub mod video;
