use std::io::Write;

use crate::output;
use crate::sources::TranscriptSource;
use crate::{CaptionError, Result};

/// Fetches one video's transcript and turns it into plain text
pub struct CaptionFetcher<S> {
    source: S,
}

impl<S: TranscriptSource> CaptionFetcher<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Fetch the caption text of a video as a single space-joined line
    pub async fn fetch_text(&self, video_id: &str) -> Result<String> {
        tracing::info!("Fetching transcript for video: {}", video_id);

        let video_ids = [video_id.to_string()];
        let mut transcripts = self.source.fetch(&video_ids).await?;

        let transcript = transcripts
            .remove(video_id)
            .ok_or_else(|| CaptionError::NoTranscriptFound {
                video_id: video_id.to_string(),
                requested: Vec::new(),
                available: Vec::new(),
            })?;

        Ok(output::join_segments(&transcript))
    }

    /// Fetch and print, returning the process exit status (0 on success, 1 on any failure)
    pub async fn run<O: Write, E: Write>(&self, video_id: &str, stdout: &mut O, stderr: &mut E) -> u8 {
        let written = match self.fetch_text(video_id).await {
            Ok(text) => output::write_transcript(stdout, &text),
            Err(err) => {
                tracing::debug!("Caption fetch failed: {:?}", err);
                return report_failure(stderr, &err);
            }
        };

        match written {
            Ok(()) => 0,
            Err(err) => report_failure(stderr, &err),
        }
    }
}

/// Print the diagnostic line for a failure and return the failing exit status
pub fn report_failure<E: Write>(stderr: &mut E, error: &dyn std::fmt::Display) -> u8 {
    // Nothing left to report to if stderr itself is gone
    let _ = output::write_error(stderr, error);
    1
}
