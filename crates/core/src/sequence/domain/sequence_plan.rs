use std::path::PathBuf;

use crate::shared::constants::FILLER_SECONDS;

/// What a title or credit card shows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CardContent {
    /// A still image, decoded once and repeated.
    Image(PathBuf),
    /// A solid BGR colour.
    Solid([u8; 3]),
}

/// A still shown for `seconds` before or after the main sequence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TitleCard {
    pub seconds: u32,
    pub content: CardContent,
}

impl TitleCard {
    pub fn image(seconds: u32, path: impl Into<PathBuf>) -> Self {
        Self {
            seconds,
            content: CardContent::Image(path.into()),
        }
    }

    pub fn solid(seconds: u32, bgr: [u8; 3]) -> Self {
        Self {
            seconds,
            content: CardContent::Solid(bgr),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SegmentKind {
    Prologue,
    PrologueFiller,
    Main,
    EpilogueFiller,
    Epilogue,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Segment {
    pub kind: SegmentKind,
    pub frames: usize,
}

/// Ordered segments of one assembled video.
///
/// Only non-empty segments are kept. A filler exists only next to a
/// non-empty title or credit segment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameSequencePlan {
    segments: Vec<Segment>,
}

impl FrameSequencePlan {
    pub fn build(
        frame_rate: u32,
        prologue_seconds: u32,
        main_frames: usize,
        epilogue_seconds: u32,
    ) -> Self {
        let per_second = frame_rate as usize;
        let prologue = prologue_seconds as usize * per_second;
        let epilogue = epilogue_seconds as usize * per_second;
        let filler = FILLER_SECONDS as usize * per_second;

        let candidates = [
            (SegmentKind::Prologue, prologue),
            (SegmentKind::PrologueFiller, if prologue > 0 { filler } else { 0 }),
            (SegmentKind::Main, main_frames),
            (SegmentKind::EpilogueFiller, if epilogue > 0 { filler } else { 0 }),
            (SegmentKind::Epilogue, epilogue),
        ];

        let segments = candidates
            .into_iter()
            .filter(|&(_, frames)| frames > 0)
            .map(|(kind, frames)| Segment { kind, frames })
            .collect();

        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn total_frames(&self) -> usize {
        self.segments.iter().map(|s| s.frames).sum()
    }

    pub fn frames_in(&self, kind: SegmentKind) -> usize {
        self.segments
            .iter()
            .find(|s| s.kind == kind)
            .map_or(0, |s| s.frames)
    }

    /// Enough content for at least one second plus one frame.
    pub fn meets_minimum(&self, frame_rate: u32) -> bool {
        self.total_frames() > frame_rate as usize
    }
}
