use std::path::PathBuf;

use crate::shared::error::{FramereelError, Result};
use crate::shared::image_extension::ImageExtension;

/// Lists the image files of one directory in frame order.
///
/// Only regular files whose names end with the extension are returned,
/// sorted by file name. Hidden files are skipped.
pub struct DirectoryFrameSource {
    dir: PathBuf,
    extension: ImageExtension,
}

impl DirectoryFrameSource {
    pub fn new(dir: impl Into<PathBuf>, extension: ImageExtension) -> Self {
        Self {
            dir: dir.into(),
            extension,
        }
    }

    pub fn list_frames(&self) -> Result<Vec<PathBuf>> {
        if !self.dir.is_dir() {
            return Err(FramereelError::source_not_found("image directory", &self.dir));
        }

        let mut frames = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                log::debug!("Skipping non UTF-8 file name {:?}", entry.path());
                continue;
            };
            if name.starts_with('.') || !self.extension.matches(name) {
                continue;
            }
            frames.push(entry.path());
        }

        frames.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"").unwrap();
    }

    fn names(paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_lists_matching_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.png", "a.png", "c.jpg", "notes.txt", "a10.png", "a2.png"] {
            touch(dir.path(), name);
        }

        let frames = DirectoryFrameSource::new(dir.path(), ImageExtension::Png)
            .list_frames()
            .unwrap();
        assert_eq!(names(&frames), vec!["a.png", "a10.png", "a2.png", "b.png"]);
    }

    #[test]
    fn test_skips_hidden_files_and_directories() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), ".hidden.png");
        touch(dir.path(), "frame.png");
        std::fs::create_dir(dir.path().join("sub.png")).unwrap();

        let frames = DirectoryFrameSource::new(dir.path(), ImageExtension::Png)
            .list_frames()
            .unwrap();
        assert_eq!(names(&frames), vec!["frame.png"]);
    }

    #[test]
    fn test_empty_directory_yields_empty_list() {
        let dir = tempfile::tempdir().unwrap();
        let frames = DirectoryFrameSource::new(dir.path(), ImageExtension::Jpg)
            .list_frames()
            .unwrap();
        assert!(frames.is_empty());
    }

    #[test]
    fn test_missing_directory_is_source_not_found() {
        let err = DirectoryFrameSource::new("/nonexistent/frames", ImageExtension::Png)
            .list_frames()
            .unwrap_err();
        assert!(matches!(err, FramereelError::SourceNotFound { .. }));
    }
}
