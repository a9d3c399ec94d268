use std::io::{self, Write};

use crate::sources::Transcript;

/// Join segment texts with single spaces, keeping playback order
pub fn join_segments(transcript: &Transcript) -> String {
    transcript
        .segments
        .iter()
        .map(|segment| segment.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Write the transcript text as one line
pub fn write_transcript<W: Write>(writer: &mut W, text: &str) -> io::Result<()> {
    writeln!(writer, "{}", text)?;
    writer.flush()
}

/// Write the single diagnostic line for a failure
pub fn write_error<W: Write>(writer: &mut W, error: &dyn std::fmt::Display) -> io::Result<()> {
    writeln!(writer, "Error: {}", error)?;
    writer.flush()
}
