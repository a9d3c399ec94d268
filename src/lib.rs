//! Caption Fetcher - A Rust CLI tool for printing the caption text of a video
//!
//! This library looks up the caption tracks of a YouTube video, downloads the best
//! matching track and flattens its segments into a single line of text.

pub mod cli;
pub mod config;
pub mod fetcher;
pub mod output;
pub mod sources;

pub use cli::Cli;
pub use config::Config;
pub use fetcher::CaptionFetcher;
pub use sources::{Transcript, TranscriptSegment, TranscriptSource};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, CaptionError>;

/// Error types specific to caption retrieval
#[derive(thiserror::Error, Debug)]
pub enum CaptionError {
    #[error("Transcripts are disabled for this video.")]
    TranscriptsDisabled { video_id: String },

    #[error("No transcript found for this video.")]
    NoTranscriptFound {
        video_id: String,
        /// Language codes that were asked for
        requested: Vec<String>,
        /// Language codes the video actually offers
        available: Vec<String>,
    },

    #[error("No video ID provided.")]
    MissingVideoId,

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("You provided a URL instead of a video ID: {0}")]
    InvalidVideoId(String),

    #[error("The video is no longer available: {0}")]
    VideoUnavailable(String),

    #[error("YouTube is receiving too many requests from this IP and now requires solving a captcha (video {0})")]
    TooManyRequests(String),

    #[error("Failed to automatically give consent to saving cookies (video {0})")]
    ConsentCookie(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Request to YouTube failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Failed to parse transcript data: {0}")]
    Parse(String),
}
