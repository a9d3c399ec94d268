use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, COOKIE};
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

use super::parser::{self, CONSENT_FORM_MARKER};
use super::{select_track, CaptionTrack, Transcript, TranscriptSource};
use crate::config::YoutubeConfig;
use crate::{CaptionError, Result};

/// Transcript source that scrapes caption tracks from YouTube watch pages
pub struct YoutubeTranscriptSource {
    client: Client,
    watch_url: Url,
    languages: Vec<String>,
}

impl YoutubeTranscriptSource {
    pub fn new(config: &YoutubeConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let accept_language = HeaderValue::from_str(&config.accept_language)
            .map_err(|_| CaptionError::InvalidConfig(format!("accept_language {:?}", config.accept_language)))?;
        headers.insert(ACCEPT_LANGUAGE, accept_language);

        let mut builder = Client::builder().default_headers(headers);
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        let watch_url = Url::parse(&format!("{}/watch", config.base_url.trim_end_matches('/')))
            .map_err(|e| CaptionError::InvalidConfig(format!("base_url {}: {}", config.base_url, e)))?;

        Ok(Self {
            client: builder.build()?,
            watch_url,
            languages: config.languages.clone(),
        })
    }

    fn watch_url(&self, video_id: &str) -> String {
        let mut url = self.watch_url.clone();
        url.query_pairs_mut().append_pair("v", video_id);
        url.to_string()
    }

    /// GET a URL and return its body, failing on non-success statuses
    async fn get_text(&self, url: &str, cookie: Option<&str>) -> Result<String> {
        let mut request = self.client.get(url);
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }

        let response = request.send().await?.error_for_status()?;
        Ok(response.text().await?)
    }

    /// Fetch the watch page, accepting the cookie consent form when it shows up
    async fn fetch_watch_page(&self, video_id: &str) -> Result<String> {
        let url = self.watch_url(video_id);
        tracing::debug!("Fetching watch page: {}", url);

        let html = self.get_text(&url, None).await?;
        if !html.contains(CONSENT_FORM_MARKER) {
            return Ok(html);
        }

        tracing::debug!("Consent form returned for {}, retrying with consent cookie", video_id);
        let token = parser::consent_token(&html)
            .ok_or_else(|| CaptionError::ConsentCookie(video_id.to_string()))?;
        let cookie = format!("CONSENT=YES+{}", token);

        let html = self.get_text(&url, Some(&cookie)).await?;
        if html.contains(CONSENT_FORM_MARKER) {
            return Err(CaptionError::ConsentCookie(video_id.to_string()));
        }

        Ok(html)
    }

    /// List every caption track the video offers
    pub async fn list_tracks(&self, video_id: &str) -> Result<Vec<CaptionTrack>> {
        let html = self.fetch_watch_page(video_id).await?;
        parser::caption_tracks(video_id, &html)
    }

    /// Fetch the preferred transcript of one video
    pub async fn fetch_transcript(&self, video_id: &str) -> Result<Transcript> {
        let tracks = self.list_tracks(video_id).await?;

        let track = select_track(&tracks, &self.languages).ok_or_else(|| CaptionError::NoTranscriptFound {
            video_id: video_id.to_string(),
            requested: self.languages.clone(),
            available: tracks.iter().map(|t| t.language_code.clone()).collect(),
        })?;

        tracing::info!(
            "Using {} track '{}' for {}",
            if track.is_generated { "generated" } else { "manual" },
            track.language_code,
            video_id
        );

        let xml = self.get_text(&track.base_url, None).await?;
        let segments = parser::parse_timedtext(&xml)?;
        tracing::debug!("Parsed {} caption segments for {}", segments.len(), video_id);

        Ok(Transcript {
            video_id: video_id.to_string(),
            language: track.language.clone(),
            language_code: track.language_code.clone(),
            is_generated: track.is_generated,
            segments,
        })
    }
}

#[async_trait]
impl TranscriptSource for YoutubeTranscriptSource {
    async fn fetch(&self, video_ids: &[String]) -> Result<HashMap<String, Transcript>> {
        let mut transcripts = HashMap::with_capacity(video_ids.len());

        for video_id in video_ids {
            let transcript = self.fetch_transcript(video_id).await?;
            transcripts.insert(video_id.clone(), transcript);
        }

        Ok(transcripts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const CONSENT_PAGE: &str = r#"<form action="https://consent.youtube.com/s"><input type="hidden" name="v" value="cb.20210328-17-p0"></form>"#;

    fn source_for(server: &MockServer, languages: &[&str]) -> YoutubeTranscriptSource {
        let config = YoutubeConfig {
            base_url: server.uri(),
            languages: languages.iter().map(|l| l.to_string()).collect(),
            ..YoutubeConfig::default()
        };
        YoutubeTranscriptSource::new(&config).unwrap()
    }

    /// Watch page offering one track per `(language code, kind)` pair
    fn watch_page(server: &MockServer, tracks: &[(&str, Option<&str>)]) -> String {
        let caption_tracks: Vec<_> = tracks
            .iter()
            .map(|(code, kind)| {
                json!({
                    "baseUrl": format!("{}/api/timedtext?lang={}", server.uri(), code),
                    "name": { "simpleText": code },
                    "languageCode": code,
                    "kind": kind,
                    "isTranslatable": true,
                })
            })
            .collect();
        let captions = json!({ "playerCaptionsTracklistRenderer": { "captionTracks": caption_tracks } });

        format!(
            r#"<script>var ytInitialPlayerResponse = {{"playabilityStatus":{{"status":"OK"}},"captions":{},"videoDetails":{{"videoId":"abc"}}}};</script>"#,
            captions
        )
    }

    async fn mount_watch_page(server: &MockServer, video_id: &str, body: String) {
        Mock::given(method("GET"))
            .and(path("/watch"))
            .and(query_param("v", video_id))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    async fn mount_timedtext(server: &MockServer, lang: &str, body: &str) {
        Mock::given(method("GET"))
            .and(path("/api/timedtext"))
            .and(query_param("lang", lang))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    #[test]
    fn test_watch_url_trims_trailing_slash() {
        let config = YoutubeConfig {
            base_url: "http://localhost:8080/".to_string(),
            ..YoutubeConfig::default()
        };
        let source = YoutubeTranscriptSource::new(&config).unwrap();
        assert_eq!(source.watch_url("abc"), "http://localhost:8080/watch?v=abc");
        assert_eq!(
            source.watch_url("https://youtu.be/abc"),
            "http://localhost:8080/watch?v=https%3A%2F%2Fyoutu.be%2Fabc"
        );
    }

    #[test]
    fn test_invalid_accept_language_is_a_config_error() {
        let config = YoutubeConfig {
            accept_language: "en\nUS".to_string(),
            ..YoutubeConfig::default()
        };
        let err = YoutubeTranscriptSource::new(&config).err().unwrap();
        assert!(matches!(err, CaptionError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_fetch_transcript() {
        let server = MockServer::start().await;
        mount_watch_page(&server, "abc", watch_page(&server, &[("en", Some("asr")), ("en", None)])).await;
        mount_timedtext(
            &server,
            "en",
            r#"<transcript><text start="0" dur="1.5">Hello</text><text start="1.5" dur="2">world</text></transcript>"#,
        )
        .await;

        let source = source_for(&server, &["en"]);
        let transcript = source.fetch_transcript("abc").await.unwrap();
        assert_eq!(transcript.video_id, "abc");
        assert_eq!(transcript.language_code, "en");
        assert!(!transcript.is_generated);
        let texts: Vec<_> = transcript.segments.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["Hello", "world"]);
    }

    #[tokio::test]
    async fn test_consent_form_is_accepted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/watch"))
            .and(header("cookie", "CONSENT=YES+cb.20210328-17-p0"))
            .respond_with(ResponseTemplate::new(200).set_body_string(watch_page(&server, &[("en", None)])))
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;
        mount_watch_page(&server, "abc", CONSENT_PAGE.to_string()).await;
        mount_timedtext(&server, "en", r#"<transcript><text start="0">after consent</text></transcript>"#).await;

        let source = source_for(&server, &["en"]);
        let transcript = source.fetch_transcript("abc").await.unwrap();
        assert_eq!(transcript.segments[0].text, "after consent");
    }

    #[tokio::test]
    async fn test_consent_form_without_token() {
        let server = MockServer::start().await;
        mount_watch_page(&server, "abc", r#"<form action="https://consent.youtube.com/s"></form>"#.to_string()).await;

        let err = source_for(&server, &["en"]).fetch_transcript("abc").await.unwrap_err();
        assert!(matches!(err, CaptionError::ConsentCookie(ref id) if id == "abc"));
    }

    #[tokio::test]
    async fn test_consent_form_that_persists() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/watch"))
            .respond_with(ResponseTemplate::new(200).set_body_string(CONSENT_PAGE))
            .expect(2)
            .mount(&server)
            .await;

        let err = source_for(&server, &["en"]).fetch_transcript("abc").await.unwrap_err();
        assert!(matches!(err, CaptionError::ConsentCookie(_)));
    }

    #[tokio::test]
    async fn test_no_track_in_requested_languages() {
        let server = MockServer::start().await;
        mount_watch_page(&server, "abc", watch_page(&server, &[("de", None), ("fr", Some("asr"))])).await;

        let err = source_for(&server, &["en", "es"]).fetch_transcript("abc").await.unwrap_err();
        match err {
            CaptionError::NoTranscriptFound { video_id, requested, available } => {
                assert_eq!(video_id, "abc");
                assert_eq!(requested, vec!["en".to_string(), "es".to_string()]);
                assert_eq!(available, vec!["de".to_string(), "fr".to_string()]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_error_status_is_a_request_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/watch"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = source_for(&server, &["en"]).fetch_transcript("abc").await.unwrap_err();
        assert!(matches!(err, CaptionError::Request(_)));
        assert!(err.to_string().starts_with("Request to YouTube failed: "));
    }

    #[tokio::test]
    async fn test_fetch_stops_at_first_error() {
        let server = MockServer::start().await;
        mount_watch_page(&server, "good", watch_page(&server, &[("en", None)])).await;
        mount_timedtext(&server, "en", r#"<transcript><text start="0">fine</text></transcript>"#).await;
        Mock::given(method("GET"))
            .and(path("/watch"))
            .and(query_param("v", "bad"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/watch"))
            .and(query_param("v", "later"))
            .respond_with(ResponseTemplate::new(200).set_body_string(watch_page(&server, &[("en", None)])))
            .expect(0)
            .mount(&server)
            .await;

        let source = source_for(&server, &["en"]);
        let ids = vec!["good".to_string(), "bad".to_string(), "later".to_string()];
        let err = source.fetch(&ids).await.unwrap_err();
        assert!(matches!(err, CaptionError::Request(_)));

        let transcripts = source.fetch(&ids[..1]).await.unwrap();
        assert_eq!(transcripts["good"].segments[0].text, "fine");
    }
}
