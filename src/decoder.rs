//! Decode an audio file into mono `f32` samples at the engine's sample rate.
//!
//! Built on Symphonia: probe the container, pick the first decodable audio
//! track, decode packet by packet, and normalize through [`AudioPipeline`].
//! Inputs are regular files (the extraction artifact or an audio-only source),
//! so we decode from a seekable source rather than a byte stream.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::audio_pipeline::AudioPipeline;

/// Decode `path` fully into normalized mono samples at the target rate.
///
/// Error handling policy (streaming-friendly, matches Symphonia's model):
/// - `DecodeError` → skip the bad frame and keep going
/// - `IoError` → treat as end-of-stream
/// - anything else → fatal
pub fn decode_file_to_mono_16k(path: &Path) -> Result<Vec<f32>> {
    let file = File::open(path)
        .with_context(|| format!("failed to open audio file '{}'", path.display()))?;

    let mss_opts = MediaSourceStreamOptions {
        // Symphonia expects a power-of-two buffer > 32KiB for good probing behavior.
        buffer_len: 256 * 1024,
    };
    let mss = MediaSourceStream::new(Box::new(file), mss_opts);

    // The file extension improves probe accuracy for ambiguous containers.
    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let format_opts: FormatOptions = Default::default();
    let metadata_opts: MetadataOptions = Default::default();

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &format_opts, &metadata_opts)
        .map_err(|e| anyhow!(e))
        .with_context(|| format!("failed to probe audio file '{}'", path.display()))?;

    let mut format = probed.format;

    // Track selection: first decodable track with a known sample rate.
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL && t.codec_params.sample_rate.is_some())
        .cloned()
        .ok_or_else(|| anyhow!("no audio track found in '{}'", path.display()))?;
    let track_id = track.id;

    let decoder_opts: DecoderOptions = Default::default();
    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &decoder_opts)
        .map_err(|e| anyhow!(e))
        .context("failed to create decoder for audio track")?;

    let mut pipeline = AudioPipeline::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(_)) => break,
            Err(e) => return Err(anyhow!(e)).context("failed reading packet"),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => pipeline
                .push_decoded(&decoded)
                .context("audio pipeline failed while processing decoded samples")?,

            // Recoverable: corrupted frame, but decoding can continue.
            Err(SymphoniaError::DecodeError(_)) => continue,

            // Treat IO errors as graceful end-of-stream.
            Err(SymphoniaError::IoError(_)) => break,

            Err(e) => return Err(anyhow!(e)).context("decoder failure"),
        }
    }

    pipeline.finish()
}
