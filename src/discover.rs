//! Media discovery: walk a directory tree and/or validate a single file.

use std::path::Path;

use tracing::{debug, error, info};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::media::{self, MediaCandidate, MediaKind};

/// Discover processable media from a directory tree and/or a single file.
///
/// Candidates are returned in directory-walk encounter order with no
/// re-sorting; individual file failures are isolated downstream, so a stable
/// cross-platform order is not required here.
pub fn discover(directory: Option<&Path>, file: Option<&Path>) -> Result<Vec<MediaCandidate>> {
    discover_with(directory, file, media::classify)
}

/// [`discover`] with an injectable classifier.
///
/// The classifier seam keeps discovery testable without an `ffprobe` binary.
pub fn discover_with<F>(
    directory: Option<&Path>,
    file: Option<&Path>,
    classify: F,
) -> Result<Vec<MediaCandidate>>
where
    F: Fn(&Path) -> MediaKind,
{
    let mut candidates = Vec::new();

    if let Some(dir) = directory {
        for entry in WalkDir::new(dir) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    // Unreadable entries are excluded the same way invalid files are.
                    debug!("skipping unreadable directory entry: {err}");
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            if let Some(candidate) =
                MediaCandidate::from_classification(path, classify(path))
            {
                candidates.push(candidate);
            }
        }

        if candidates.is_empty() {
            return Err(Error::NoMediaInDirectory(dir.to_path_buf()));
        }

        info!(
            "found {} media file(s) under '{}'",
            candidates.len(),
            dir.display()
        );
    }

    if let Some(path) = file {
        match MediaCandidate::from_classification(path, classify(path)) {
            Some(candidate) => candidates.push(candidate),
            // An invalid explicit file fails on its own, but it does not throw away
            // candidates a directory walk already produced.
            None if candidates.is_empty() => {
                return Err(Error::NotAMediaFile(path.to_path_buf()));
            }
            None => {
                error!("'{}' is not a valid media file; continuing with directory results", path.display());
            }
        }
    }

    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use super::*;
    use crate::media::MediaKind;

    /// Extension-based stand-in for the ffprobe classifier.
    fn classify_by_extension(path: &Path) -> MediaKind {
        match path.extension().and_then(|e| e.to_str()) {
            Some("mp3") | Some("wav") => MediaKind::Audio,
            Some("mkv") | Some("mp4") => MediaKind::Video,
            _ => MediaKind::NotMedia,
        }
    }

    #[test]
    fn directory_walk_excludes_non_media_silently() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("talk.mp3"), b"")?;
        fs::write(dir.path().join("notes.txt"), b"")?;

        let candidates = discover_with(Some(dir.path()), None, classify_by_extension)?;

        assert_eq!(candidates.len(), 1);
        assert!(candidates[0].is_audio());
        assert!(candidates[0].path.ends_with("talk.mp3"));
        Ok(())
    }

    #[test]
    fn directory_with_no_media_is_not_found() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("notes.txt"), b"")?;

        let err = discover_with(Some(dir.path()), None, classify_by_extension).unwrap_err();
        assert!(matches!(err, Error::NoMediaInDirectory(_)));
        Ok(())
    }

    #[test]
    fn walk_recurses_into_subdirectories() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        fs::create_dir(dir.path().join("season1"))?;
        fs::write(dir.path().join("season1/episode.mkv"), b"")?;

        let candidates = discover_with(Some(dir.path()), None, classify_by_extension)?;

        assert_eq!(candidates.len(), 1);
        assert!(!candidates[0].is_audio());
        Ok(())
    }

    #[test]
    fn single_valid_file_is_appended() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let file = dir.path().join("clip.mp4");
        fs::write(&file, b"")?;

        let candidates = discover_with(None, Some(&file), classify_by_extension)?;
        assert_eq!(candidates.len(), 1);
        Ok(())
    }

    #[test]
    fn single_invalid_file_alone_is_not_found() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let file = dir.path().join("clip.txt");
        fs::write(&file, b"")?;

        let err = discover_with(None, Some(&file), classify_by_extension).unwrap_err();
        assert!(matches!(err, Error::NotAMediaFile(_)));
        Ok(())
    }

    #[test]
    fn invalid_file_does_not_discard_directory_results() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("talk.mp3"), b"")?;
        let bogus = dir.path().join("clip.txt");
        fs::write(&bogus, b"")?;

        let candidates =
            discover_with(Some(dir.path()), Some(&bogus), classify_by_extension)?;
        assert_eq!(candidates.len(), 1);
        Ok(())
    }
}
