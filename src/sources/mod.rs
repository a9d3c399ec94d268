use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub mod parser;
pub mod youtube;

pub use youtube::YoutubeTranscriptSource;

use crate::Result;

/// Transcript of one video, segments in playback order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    /// Video the transcript belongs to
    pub video_id: String,

    /// Human readable language name (e.g. "English (auto-generated)")
    pub language: String,

    /// Language code of the track (e.g. "en")
    pub language_code: String,

    /// Whether the track was generated by speech recognition
    pub is_generated: bool,

    /// Caption segments
    pub segments: Vec<TranscriptSegment>,
}

/// Individual caption segment with timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Segment text
    pub text: String,

    /// Start time in seconds
    pub start: f64,

    /// Duration in seconds
    pub duration: f64,
}

impl TranscriptSegment {
    pub fn new(text: impl Into<String>, start: f64, duration: f64) -> Self {
        Self {
            text: text.into(),
            start,
            duration,
        }
    }
}

/// One caption track offered for a video
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionTrack {
    /// URL the timedtext document is served from
    pub base_url: String,

    /// Human readable language name
    pub language: String,

    /// Language code
    pub language_code: String,

    /// Generated by speech recognition rather than uploaded
    pub is_generated: bool,

    /// Whether YouTube can machine-translate this track
    pub is_translatable: bool,
}

/// Anything that can look up transcripts by video id
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Fetch transcripts for every id, keyed by id.
    ///
    /// Ids are processed in order and the first failure aborts the call.
    async fn fetch(&self, video_ids: &[String]) -> Result<HashMap<String, Transcript>>;
}

/// Pick the preferred track: languages in priority order, uploaded tracks before generated ones
pub fn select_track<'a>(tracks: &'a [CaptionTrack], languages: &[String]) -> Option<&'a CaptionTrack> {
    languages.iter().find_map(|code| {
        let mut matching = tracks.iter().filter(|track| &track.language_code == code);
        let generated = matching.clone().find(|track| track.is_generated);
        matching.find(|track| !track.is_generated).or(generated)
    })
}
