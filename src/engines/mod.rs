//! Speech engine implementations.

pub mod whisper;
