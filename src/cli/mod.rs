use clap::error::ErrorKind;
use clap::Parser;

use crate::CaptionError;

#[derive(Parser, Debug)]
#[command(
    name = "get-captions",
    about = "Caption Fetcher - Print the caption text of a YouTube video",
    version,
    long_about = "Fetches the caption track of a YouTube video and prints its text as a single line. Accepts a bare video ID or a YouTube URL."
)]
pub struct Cli {
    /// YouTube video ID (or a YouTube URL containing one)
    #[arg(value_name = "VIDEO_ID")]
    pub video_id: Option<String>,
}

impl Cli {
    /// The requested video id, or `MissingVideoId` when none was given
    pub fn video_id(&self) -> crate::Result<&str> {
        self.video_id.as_deref().ok_or(CaptionError::MissingVideoId)
    }
}

/// Outcome of parsing the command line
#[derive(Debug)]
pub enum ParsedArgs {
    /// Arguments were valid
    Run(Cli),
    /// Help or version was requested; clap prints it and exits cleanly
    Display(clap::Error),
    /// Arguments were rejected
    Invalid(CaptionError),
}

/// Parse arguments without letting clap exit the process on errors
pub fn parse_args<I, T>(args: I) -> ParsedArgs
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    match Cli::try_parse_from(args) {
        Ok(cli) => ParsedArgs::Run(cli),
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            ParsedArgs::Display(err)
        }
        Err(err) => ParsedArgs::Invalid(CaptionError::InvalidArguments(first_line(&err))),
    }
}

/// First line of clap's rendered error, without its `error: ` prefix
fn first_line(err: &clap::Error) -> String {
    let rendered = err.to_string();
    let line = rendered.lines().next().unwrap_or_default().trim();
    line.strip_prefix("error: ").unwrap_or(line).to_string()
}
