//! Built-in speech engine powered by `whisper-rs` / whisper.cpp.
//!
//! The two-pass engine contract maps onto whisper.cpp as follows:
//! - `recognize` runs a beam-search full pass with language auto-detection and
//!   reports segment-level timestamps.
//! - `align` re-runs the pass with the detected language pinned and per-token
//!   timestamps enabled, deriving refined segment boundaries from token timing.

use std::fmt;
use std::os::raw::{c_char, c_void};
use std::path::{Path, PathBuf};
use std::sync::Once;

use anyhow::{Context, Result, ensure};
use clap::ValueEnum;
use tracing::debug;
use whisper_rs::{
    FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters, WhisperSegment,
    WhisperState,
};

use crate::decoder::decode_file_to_mono_16k;
use crate::device::Device;
use crate::engine::{Recognition, SpeechEngine};
use crate::segments::Segment;

/// Fallback when whisper cannot name the detected language.
const UNDETERMINED_LANGUAGE: &str = "und";

/// The whisper model catalog: every size whisper.cpp ships ggml weights for.
///
/// The `.en` variants are English-tuned and smaller-vocabulary; `base.en` is
/// the default because it is the best accuracy-per-second trade-off for
/// English content on a CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WhisperModel {
    #[value(name = "tiny")]
    Tiny,
    #[value(name = "tiny.en")]
    TinyEn,
    #[value(name = "base")]
    Base,
    #[value(name = "base.en")]
    BaseEn,
    #[value(name = "small")]
    Small,
    #[value(name = "small.en")]
    SmallEn,
    #[value(name = "medium")]
    Medium,
    #[value(name = "medium.en")]
    MediumEn,
    #[value(name = "large-v2")]
    LargeV2,
    #[value(name = "large-v3")]
    LargeV3,
}

impl WhisperModel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tiny => "tiny",
            Self::TinyEn => "tiny.en",
            Self::Base => "base",
            Self::BaseEn => "base.en",
            Self::Small => "small",
            Self::SmallEn => "small.en",
            Self::Medium => "medium",
            Self::MediumEn => "medium.en",
            Self::LargeV2 => "large-v2",
            Self::LargeV3 => "large-v3",
        }
    }

    /// File name of the ggml weights, as distributed by whisper.cpp.
    pub fn ggml_file_name(self) -> String {
        format!("ggml-{}.bin", self.as_str())
    }

    /// Resolve the weights path inside a model directory.
    pub fn resolve_in(self, model_dir: &Path) -> PathBuf {
        model_dir.join(self.ggml_file_name())
    }
}

impl fmt::Display for WhisperModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where a pass takes its segment timing from.
#[derive(Clone, Copy)]
enum TimingSource {
    /// Whisper's segment-level timestamps (recognition pass).
    SegmentTimestamps,
    /// Boundaries derived from per-token timing (alignment pass).
    TokenTimestamps,
}

/// A loaded whisper.cpp model.
///
/// Model loading is expensive, so one engine is constructed per run and reused
/// across every file in the batch.
pub struct WhisperEngine {
    ctx: WhisperContext,
}

impl WhisperEngine {
    /// Load a ggml model from disk, targeting the selected compute device.
    pub fn load(model_path: &Path, device: Device) -> Result<Self> {
        quiet_whisper_logs();

        ensure!(
            model_path.is_file(),
            "model not found at '{}'",
            model_path.display()
        );
        let model_path_str = model_path.to_str().ok_or_else(|| {
            anyhow::anyhow!("model path is not valid UTF-8: '{}'", model_path.display())
        })?;

        let mut ctx_params = WhisperContextParameters::default();
        ctx_params.use_gpu(device.is_cuda());

        let ctx = WhisperContext::new_with_params(model_path_str, ctx_params)
            .with_context(|| format!("failed to load model from '{}'", model_path.display()))?;

        Ok(Self { ctx })
    }

    fn run_full(&self, params: FullParams, samples: &[f32]) -> Result<WhisperState> {
        let mut state = self
            .ctx
            .create_state()
            .context("failed to create whisper state")?;

        state
            .full(params, samples)
            .context("failed to run whisper full()")?;

        Ok(state)
    }
}

impl SpeechEngine for WhisperEngine {
    fn recognize(&mut self, audio_path: &Path, batch_size: usize) -> Result<Recognition> {
        // whisper.cpp has no batched decode; the knob exists for engines that do.
        debug!(
            "recognizing '{}' (batch size {batch_size} not used by whisper.cpp)",
            audio_path.display()
        );

        let samples = decode_file_to_mono_16k(audio_path)?;

        let mut params = base_full_params();
        params.set_language(None); // auto-detect

        let state = self.run_full(params, &samples)?;

        let language_code = detected_language(&state);
        let segments = collect_segments(&state, TimingSource::SegmentTimestamps)?;

        Ok(Recognition {
            language_code,
            segments,
        })
    }

    fn align(
        &mut self,
        interim: &[Segment],
        language_code: &str,
        audio_path: &Path,
    ) -> Result<Vec<Segment>> {
        let samples = decode_file_to_mono_16k(audio_path)?;

        let mut params = base_full_params();
        params.set_language(Some(language_code));
        params.set_token_timestamps(true);

        let state = self.run_full(params, &samples)?;
        let aligned = collect_segments(&state, TimingSource::TokenTimestamps)?;

        debug!(
            "aligned {} interim segment(s) into {} segment(s)",
            interim.len(),
            aligned.len()
        );

        Ok(aligned)
    }
}

fn base_full_params<'a, 'b>() -> FullParams<'a, 'b> {
    let mut params = FullParams::new(SamplingStrategy::BeamSearch {
        beam_size: 5,
        patience: 1.0,
    });

    params.set_n_threads(num_cpus::get() as i32);
    params.set_translate(false);
    params.set_no_context(true);
    params.set_single_segment(false);

    params.set_print_progress(false);
    params.set_print_special(false);
    params.set_print_realtime(false);
    params.set_print_timestamps(false);

    params
}

fn collect_segments(state: &WhisperState, timing: TimingSource) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    for whisper_segment in state.as_iter() {
        segments.push(to_segment(whisper_segment, timing)?);
    }
    Ok(segments)
}

fn to_segment(segment: WhisperSegment, timing: TimingSource) -> Result<Segment> {
    let text = segment
        .to_str()
        .context("failed to get segment text")?
        .to_owned();

    let fallback = (
        centiseconds_to_seconds(segment.start_timestamp()),
        centiseconds_to_seconds(segment.end_timestamp()),
    );

    // Token timing avoids boundaries that swallow leading/trailing silence, but
    // falls back to segment timestamps when no token carries usable timing.
    let (start_seconds, end_seconds) = match timing {
        TimingSource::SegmentTimestamps => fallback,
        TimingSource::TokenTimestamps => token_bounds(&segment)?.unwrap_or(fallback),
    };

    Ok(Segment {
        start_seconds,
        end_seconds,
        text,
    })
}

/// Earliest and latest usable token timestamps in a segment.
fn token_bounds(segment: &WhisperSegment) -> Result<Option<(f32, f32)>> {
    let token_count = segment.n_tokens();
    let token_count = usize::try_from(token_count)
        .with_context(|| format!("segment reported negative token count: {token_count}"))?;

    let mut min_start: Option<f32> = None;
    let mut max_end: Option<f32> = None;

    for token_idx in 0..token_count {
        let token = segment
            .get_token(token_idx as i32)
            .context("failed to get token from segment")?;

        let text = token
            .to_str()
            .with_context(|| format!("failed to get token text at index {token_idx}"))?;

        // Filter out whisper special/control tokens (formatted like `[_BEG_]`, `[_TT_50]`).
        if text.starts_with("[_") && text.ends_with("_]") {
            continue;
        }

        let data = token.token_data();
        let start = centiseconds_to_seconds(data.t0);
        let end = centiseconds_to_seconds(data.t1);

        // Skip tokens with unknown timestamps (whisper uses -1, clamped to 0.0).
        if start <= 0.0 && end <= 0.0 {
            continue;
        }

        min_start = Some(min_start.map_or(start, |v| v.min(start)));
        max_end = Some(max_end.map_or(end, |v| v.max(end)));
    }

    Ok(match (min_start, max_end) {
        (Some(s), Some(e)) if e >= s => Some((s, e)),
        _ => None,
    })
}

fn detected_language(state: &WhisperState) -> String {
    match state.full_lang_id_from_state() {
        Ok(id) => whisper_rs::get_lang_str(id)
            .unwrap_or(UNDETERMINED_LANGUAGE)
            .to_owned(),
        Err(err) => {
            debug!("language detection unavailable: {err}");
            UNDETERMINED_LANGUAGE.to_owned()
        }
    }
}

fn centiseconds_to_seconds(value: i64) -> f32 {
    if value < 0 { 0.0 } else { value as f32 / 100.0 }
}

/// A no-op log callback used to silence logs emitted by whisper.cpp.
unsafe extern "C" fn whisper_log_callback(
    _level: u32,
    _c_msg: *const c_char,
    _user_data: *mut c_void,
) {
    // Intentionally left empty.
}

/// Silence whisper.cpp's logging exactly once for the lifetime of the process.
fn quiet_whisper_logs() {
    static INIT: Once = Once::new();

    INIT.call_once(|| unsafe {
        whisper_rs::set_log_callback(Some(whisper_log_callback), std::ptr::null_mut());
    });
}
