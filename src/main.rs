use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use caption_fetcher::cli::{self, ParsedArgs};
use caption_fetcher::fetcher::{report_failure, CaptionFetcher};
use caption_fetcher::sources::YoutubeTranscriptSource;
use caption_fetcher::Config;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing; logs share stderr with the diagnostic line, so keep it quiet by default
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "caption_fetcher=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();

    let cli = match cli::parse_args(std::env::args_os()) {
        ParsedArgs::Run(cli) => cli,
        ParsedArgs::Display(info) => info.exit(),
        ParsedArgs::Invalid(err) => return ExitCode::from(report_failure(&mut stderr, &err)),
    };

    let video_id = match cli.video_id() {
        Ok(video_id) => video_id,
        Err(err) => return ExitCode::from(report_failure(&mut stderr, &err)),
    };

    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => return ExitCode::from(report_failure(&mut stderr, &format!("{:#}", err))),
    };

    let source = match YoutubeTranscriptSource::new(&config.youtube) {
        Ok(source) => source,
        Err(err) => return ExitCode::from(report_failure(&mut stderr, &err)),
    };

    let fetcher = CaptionFetcher::new(source);
    ExitCode::from(fetcher.run(video_id, &mut stdout, &mut stderr).await)
}
