use std::path::Path;

use anyhow::Result;

use crate::segments::Segment;

/// Batch size handed to the recognition pass.
pub const DEFAULT_BATCH_SIZE: usize = 16;

/// Output of the recognition pass: interim segments plus the detected language.
///
/// The language is only ever reported here — the alignment pass does not
/// return it — so callers must capture it before aligning.
#[derive(Debug, Clone)]
pub struct Recognition {
    pub language_code: String,
    pub segments: Vec<Segment>,
}

/// Pluggable speech-to-text engine used by the transcription orchestrator.
///
/// The engine owns the expensive model state and is loaded once per run.
/// Transcription happens in two sequential passes:
///
/// 1. [`recognize`](SpeechEngine::recognize) — raw speech recognition over the
///    audio file, yielding interim segments and the detected language.
/// 2. [`align`](SpeechEngine::align) — refine the interim segments' time
///    boundaries against the audio using the detected language.
///
/// Both calls are blocking and single-attempt; any error is fatal for the
/// file being processed.
pub trait SpeechEngine {
    fn recognize(&mut self, audio_path: &Path, batch_size: usize) -> Result<Recognition>;

    fn align(
        &mut self,
        interim: &[Segment],
        language_code: &str,
        audio_path: &Path,
    ) -> Result<Vec<Segment>>;
}
