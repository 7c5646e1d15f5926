//! Batch control flow: drive each discovered candidate through the pipeline.
//!
//! Per-candidate state machine:
//! Discovered → AudioReady → Transcribed → Formatted → Written | Failed.
//! A failure in any state is confined to that candidate; the batch always
//! moves on to the next one.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{error, info};

use crate::engine::{DEFAULT_BATCH_SIZE, SpeechEngine};
use crate::extract::{self, ExtractionOutcome, ExtractionRequest};
use crate::media::MediaCandidate;
use crate::progress::ProgressReporter;
use crate::srt;
use crate::stopwatch::{LapSummary, Stopwatch};
use crate::transcribe::transcribe;

/// Terminal state of one candidate.
#[derive(Debug)]
pub enum FileOutcome {
    Written {
        source: PathBuf,
        subtitle_path: PathBuf,
        language_code: String,
    },
    Failed {
        source: PathBuf,
        reason: anyhow::Error,
    },
}

/// Everything a run produced: per-file outcomes plus the timing summary.
#[derive(Debug)]
pub struct BatchReport {
    pub outcomes: Vec<FileOutcome>,
    pub timings: Vec<LapSummary>,
}

impl BatchReport {
    pub fn written_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, FileOutcome::Written { .. }))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.len() - self.written_count()
    }
}

/// Sequentially processes candidates through extraction, transcription, and
/// subtitle rendering.
///
/// Owns the run's [`Stopwatch`]; the engine and progress reporter are borrowed
/// because the caller constructed them once for the whole run.
pub struct BatchRunner<'a> {
    engine: &'a mut dyn SpeechEngine,
    progress: &'a mut dyn ProgressReporter,
    extraction: ExtractionRequest,
    batch_size: usize,
    stopwatch: Stopwatch,
}

impl<'a> BatchRunner<'a> {
    pub fn new(engine: &'a mut dyn SpeechEngine, progress: &'a mut dyn ProgressReporter) -> Self {
        Self {
            engine,
            progress,
            extraction: ExtractionRequest::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            stopwatch: Stopwatch::new(),
        }
    }

    /// Process every candidate, isolating failures per file.
    pub fn run(mut self, candidates: &[MediaCandidate]) -> BatchReport {
        let mut outcomes = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            let label = file_label(&candidate.path);
            self.stopwatch.start(&label);
            let result = self.process(candidate);
            self.stopwatch.stop(&label);

            outcomes.push(match result {
                Ok((subtitle_path, language_code)) => {
                    info!("subtitle file generated: {}", subtitle_path.display());
                    FileOutcome::Written {
                        source: candidate.path.clone(),
                        subtitle_path,
                        language_code,
                    }
                }
                Err(reason) => {
                    error!(
                        "failed to process '{}': {reason:#}",
                        candidate.path.display()
                    );
                    FileOutcome::Failed {
                        source: candidate.path.clone(),
                        reason,
                    }
                }
            });
        }

        BatchReport {
            outcomes,
            timings: self.stopwatch.summary(),
        }
    }

    fn process(&mut self, candidate: &MediaCandidate) -> Result<(PathBuf, String)> {
        // Discovered → AudioReady: audio-only sources skip extraction entirely.
        let audio_path = if candidate.is_audio() {
            info!("processing audio file: {}", candidate.path.display());
            candidate.path.clone()
        } else {
            info!("processing video file: {}", candidate.path.display());
            match extract::extract_audio(&candidate.path, &self.extraction, &mut self.stopwatch) {
                ExtractionOutcome::Extracted(path) => path,
                ExtractionOutcome::Failed { path, reason } => {
                    return Err(reason.context(format!(
                        "audio extraction produced no usable artifact at '{}'",
                        path.display()
                    )));
                }
            }
        };

        // AudioReady → Transcribed.
        let transcript = transcribe(
            self.engine,
            &audio_path,
            self.batch_size,
            &mut self.stopwatch,
            self.progress,
        )?;

        // Transcribed → Formatted.
        let rendered = srt::render(&transcript.segments)?;
        let subtitles = srt::clip_long_lines(&rendered);

        // Formatted → Written.
        let subtitle_path = subtitle_path(&candidate.path, &transcript.language_code);
        write_subtitles(&subtitle_path, &subtitles)?;

        Ok((subtitle_path, transcript.language_code))
    }
}

/// Output path for a source file: `{stem}.ai-{language}.srt`, next to the source.
pub fn subtitle_path(source: &Path, language_code: &str) -> PathBuf {
    let stem = source
        .file_stem()
        .unwrap_or(source.as_os_str())
        .to_string_lossy();
    let file_name = format!("{stem}.ai-{language_code}.srt");

    match source.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(file_name),
        _ => PathBuf::from(file_name),
    }
}

/// Per-file stopwatch label: the source file's stem.
fn file_label(path: &Path) -> String {
    path.file_stem()
        .unwrap_or(path.as_os_str())
        .to_string_lossy()
        .into_owned()
}

fn write_subtitles(path: &Path, content: &str) -> Result<()> {
    let mut file = File::create(path)
        .with_context(|| format!("failed to create subtitle file '{}'", path.display()))?;
    file.write_all(content.as_bytes())
        .with_context(|| format!("failed to write subtitle file '{}'", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subtitle_path_lands_next_to_the_source() {
        assert_eq!(
            subtitle_path(Path::new("/media/show/episode-01.mkv"), "en"),
            PathBuf::from("/media/show/episode-01.ai-en.srt")
        );
        assert_eq!(
            subtitle_path(Path::new("talk.mp3"), "de"),
            PathBuf::from("talk.ai-de.srt")
        );
    }

    #[test]
    fn file_label_is_the_stem() {
        assert_eq!(file_label(Path::new("/a/b/episode-01.mkv")), "episode-01");
    }
}
