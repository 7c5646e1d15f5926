use std::io::Write;

use anyhow::Result;
use tracing::warn;

use crate::segments::Segment;

/// Maximum rendered line length before the post-processing pass clips it.
pub const MAX_LINE_CHARS: usize = 150;

/// Writes segments as SubRip blocks to a `Write` implementation.
///
/// Design:
/// - We stream output directly to the writer; no intermediate document model.
/// - The block index is an internal counter, so indices are contiguous from 1
///   and always match segment order.
pub struct SrtEncoder<W: Write> {
    /// The underlying writer we stream SRT into.
    w: W,

    /// Index of the last block written (0 = nothing written yet).
    index: usize,

    /// Whether the encoder has been closed.
    closed: bool,
}

impl<W: Write> SrtEncoder<W> {
    /// Create a new SRT encoder that writes to the provided writer.
    pub fn new(w: W) -> Self {
        Self {
            w,
            index: 0,
            closed: false,
        }
    }

    /// Write a single SubRip block: index, timing line, trimmed text, blank line.
    pub fn write_segment(&mut self, seg: &Segment) -> Result<()> {
        if self.closed {
            anyhow::bail!("cannot write segment: encoder is already closed");
        }

        self.index += 1;

        let start = format_timestamp_srt(seg.start_seconds);
        let end = format_timestamp_srt(seg.end_seconds);

        writeln!(&mut self.w, "{}", self.index)?;
        writeln!(&mut self.w, "{start} --> {end}")?;
        writeln!(&mut self.w, "{}", seg.text.trim())?;

        // Blank line separates blocks.
        writeln!(&mut self.w)?;

        Ok(())
    }

    /// Number of blocks written so far.
    pub fn count(&self) -> usize {
        self.index
    }

    /// Flush the underlying writer. This is idempotent.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }

        self.w.flush()?;
        self.closed = true;

        Ok(())
    }
}

/// Render ordered segments into a SubRip document string.
pub fn render(segments: &[Segment]) -> Result<String> {
    let mut out = Vec::new();

    let mut encoder = SrtEncoder::new(&mut out);
    for segment in segments {
        encoder.write_segment(segment)?;
    }
    encoder.close()?;

    Ok(String::from_utf8(out)?)
}

/// Line-length normalization pass applied after rendering.
///
/// Lines longer than [`MAX_LINE_CHARS`] characters are cut at the last
/// whitespace boundary at or before that position (dropping the partial word);
/// a line with no whitespace in that span is hard-cut at exactly the limit.
/// Shorter lines pass through unchanged, and existing line terminators are
/// preserved as-is.
///
/// Keeping this separate from [`render`] keeps timestamp/index formatting
/// orthogonal to the readability constraint.
pub fn clip_long_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());

    for piece in text.split_inclusive('\n') {
        let (body, terminator) = match piece.strip_suffix('\n') {
            Some(body) => (body, "\n"),
            None => (piece, ""),
        };

        out.push_str(clip_line(body));
        out.push_str(terminator);
    }

    out
}

/// Clip a single line to [`MAX_LINE_CHARS`] characters on a word boundary.
fn clip_line(line: &str) -> &str {
    // Byte offset of the character after the limit; `None` means the line fits.
    let Some((cut, _)) = line.char_indices().nth(MAX_LINE_CHARS) else {
        return line;
    };

    let prefix = &line[..cut];
    match prefix.rfind(char::is_whitespace) {
        Some(ws) => &prefix[..ws],
        None => {
            warn!("line too long and cannot be split on whitespace; clipping to {MAX_LINE_CHARS} characters");
            prefix
        }
    }
}

/// Format seconds into a SubRip timestamp (`HH:MM:SS,mmm`).
///
/// Rounding policy:
/// - We round to the nearest millisecond to reduce drift when converting from `f32`.
/// - Hours have no upper bound; they just keep growing past two digits.
fn format_timestamp_srt(seconds: f32) -> String {
    let total_ms = (seconds * 1000.0).round() as u64;

    let ms = total_ms % 1000;
    let total_s = total_ms / 1000;

    let s = total_s % 60;
    let total_m = total_s / 60;

    let m = total_m % 60;
    let h = total_m / 60;

    format!("{h:02}:{m:02}:{s:02},{ms:03}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(start: f32, end: f32, text: &str) -> Segment {
        Segment::new(start, end, text)
    }

    #[test]
    fn render_of_no_segments_is_empty() -> anyhow::Result<()> {
        let rendered = render(&[])?;
        assert_eq!(rendered, "");
        assert_eq!(clip_long_lines(&rendered), "");
        Ok(())
    }

    #[test]
    fn render_formats_blocks_and_trims_text() -> anyhow::Result<()> {
        let rendered = render(&[
            seg(0.0, 1.5, "  hello  "),
            seg(61.2, 62.0, "world"),
        ])?;

        assert_eq!(
            rendered,
            "1\n00:00:00,000 --> 00:00:01,500\nhello\n\n2\n00:01:01,200 --> 00:01:02,000\nworld\n\n"
        );
        Ok(())
    }

    #[test]
    fn indices_are_contiguous_from_one_in_segment_order() -> anyhow::Result<()> {
        let segments: Vec<Segment> = (0..5)
            .map(|i| seg(i as f32, i as f32 + 1.0, &format!("segment {i}")))
            .collect();

        let rendered = render(&segments)?;

        let indices: Vec<&str> = rendered
            .split("\n\n")
            .filter(|block| !block.is_empty())
            .map(|block| block.lines().next().unwrap())
            .collect();
        assert_eq!(indices, vec!["1", "2", "3", "4", "5"]);

        let texts: Vec<&str> = rendered
            .split("\n\n")
            .filter(|block| !block.is_empty())
            .map(|block| block.lines().nth(2).unwrap())
            .collect();
        assert_eq!(
            texts,
            vec!["segment 0", "segment 1", "segment 2", "segment 3", "segment 4"]
        );
        Ok(())
    }

    #[test]
    fn write_after_close_errors() -> anyhow::Result<()> {
        let mut out = Vec::new();
        let mut enc = SrtEncoder::new(&mut out);
        enc.close()?;
        let err = enc.write_segment(&seg(0.0, 1.0, "nope")).unwrap_err();
        assert!(err.to_string().contains("already closed"));
        Ok(())
    }

    #[test]
    fn timestamp_formats_zero_and_over_an_hour() {
        assert_eq!(format_timestamp_srt(0.0), "00:00:00,000");
        assert_eq!(format_timestamp_srt(3725.5), "01:02:05,500");
    }

    #[test]
    fn timestamp_rounds_to_nearest_millisecond() {
        assert_eq!(format_timestamp_srt(0.0004), "00:00:00,000");
        assert_eq!(format_timestamp_srt(1.9995), "00:00:02,000");
    }

    #[test]
    fn clip_is_identity_for_short_lines() {
        let line = "a".repeat(MAX_LINE_CHARS);
        assert_eq!(clip_long_lines(&line), line);

        let text = "short one\nshort two\n";
        assert_eq!(clip_long_lines(text), text);
    }

    #[test]
    fn clip_cuts_on_the_last_whitespace_boundary() {
        // 8-char words + spaces: the cut lands mid-word and drops the partial word.
        let word = "abcdefgh";
        let line: String = std::iter::repeat(word)
            .take(30)
            .collect::<Vec<_>>()
            .join(" ");
        assert!(line.chars().count() > MAX_LINE_CHARS);

        let clipped = clip_long_lines(&line);
        assert!(clipped.chars().count() <= MAX_LINE_CHARS);
        assert!(line.starts_with(&clipped));
        assert!(!clipped.ends_with(char::is_whitespace));
        assert!(clipped.ends_with(word));
    }

    #[test]
    fn clip_hard_truncates_unsplittable_lines() {
        let line = "x".repeat(400);
        let clipped = clip_long_lines(&line);
        assert_eq!(clipped, "x".repeat(MAX_LINE_CHARS));
    }

    #[test]
    fn clip_counts_characters_not_bytes() {
        // Multi-byte characters with no whitespace: the cut must land on a char boundary.
        let line = "é".repeat(200);
        let clipped = clip_long_lines(&line);
        assert_eq!(clipped.chars().count(), MAX_LINE_CHARS);
    }

    #[test]
    fn clip_preserves_line_terminators() {
        let long = "y".repeat(200);
        let text = format!("keep me\n{long}\nand me\n");
        let clipped = clip_long_lines(&text);

        let lines: Vec<&str> = clipped.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "keep me");
        assert_eq!(lines[1], "y".repeat(MAX_LINE_CHARS));
        assert_eq!(lines[2], "and me");
        assert!(clipped.ends_with('\n'));
    }
}
