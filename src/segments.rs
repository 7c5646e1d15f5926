use serde::Serialize;

/// A single time-bounded span of recognized speech.
///
/// Segments are produced in playback order (monotonically non-decreasing start
/// times) and satisfy `start_seconds <= end_seconds`.
#[derive(Debug, Serialize, Clone)]
pub struct Segment {
    pub start_seconds: f32,
    pub end_seconds: f32,
    pub text: String,
}

impl Segment {
    pub fn new(start_seconds: f32, end_seconds: f32, text: impl Into<String>) -> Self {
        Self {
            start_seconds,
            end_seconds,
            text: text.into(),
        }
    }
}

/// One file's worth of recognized, aligned speech.
///
/// Created once per processed file and consumed by the subtitle renderer.
#[derive(Debug, Serialize, Clone)]
pub struct Transcript {
    /// BCP-47-ish language code detected during recognition (e.g. `"en"`).
    pub language_code: String,
    pub segments: Vec<Segment>,
}
