//! Transcription orchestration: recognize, then align.

use std::path::Path;

use anyhow::Result;
use tracing::{debug, info};

use crate::engine::SpeechEngine;
use crate::progress::ProgressReporter;
use crate::segments::Transcript;
use crate::stopwatch::Stopwatch;

/// Stopwatch label covering both engine passes.
pub const TRANSCRIPTION_LABEL: &str = "Transcription";

/// Drive the speech engine's two passes and assemble a [`Transcript`].
///
/// Engine errors propagate as-is — fatal for the current file, no retry, no
/// partial-result salvage. Timing and progress reporting wrap both passes and
/// are balanced on the error path too, so the next file can reuse the label.
pub fn transcribe(
    engine: &mut dyn SpeechEngine,
    audio_path: &Path,
    batch_size: usize,
    stopwatch: &mut Stopwatch,
    progress: &mut dyn ProgressReporter,
) -> Result<Transcript> {
    stopwatch.start(TRANSCRIPTION_LABEL);
    progress.on_start("Transcribing");

    let result = run_passes(engine, audio_path, batch_size);

    progress.on_end("Transcribing");
    stopwatch.stop(TRANSCRIPTION_LABEL);

    result
}

fn run_passes(
    engine: &mut dyn SpeechEngine,
    audio_path: &Path,
    batch_size: usize,
) -> Result<Transcript> {
    let recognition = engine.recognize(audio_path, batch_size)?;

    // Capture the language now; alignment does not report it again.
    let language_code = recognition.language_code;

    let segments = engine.align(&recognition.segments, &language_code, audio_path)?;

    info!("language: {language_code}");
    for segment in &segments {
        debug!(
            "[{:.2}s -> {:.2}s] {}",
            segment.start_seconds, segment.end_seconds, segment.text
        );
    }

    Ok(Transcript {
        language_code,
        segments,
    })
}
