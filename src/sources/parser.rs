//! Parsing of YouTube watch pages and timedtext caption documents.
//!
//! Everything here is pure string processing so it can be tested without network access.

use regex::{Captures, Regex};
use serde::Deserialize;
use std::sync::OnceLock;

use super::{CaptionTrack, TranscriptSegment};
use crate::{CaptionError, Result};

/// Marker of the cookie consent interstitial served to some regions
pub const CONSENT_FORM_MARKER: &str = "action=\"https://consent.youtube.com/s\"";

const CAPTIONS_MARKER: &str = "\"captions\":";
const VIDEO_DETAILS_MARKER: &str = ",\"videoDetails";
const RECAPTCHA_MARKER: &str = "class=\"g-recaptcha\"";
const PLAYABILITY_MARKER: &str = "\"playabilityStatus\":";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionsJson {
    player_captions_tracklist_renderer: Option<TracklistRenderer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TracklistRenderer {
    caption_tracks: Option<Vec<CaptionTrackJson>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionTrackJson {
    base_url: String,
    name: Option<TrackName>,
    language_code: String,
    kind: Option<String>,
    #[serde(default)]
    is_translatable: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrackName {
    simple_text: Option<String>,
    runs: Option<Vec<TextRun>>,
}

#[derive(Debug, Deserialize)]
struct TextRun {
    text: String,
}

impl TrackName {
    fn text(&self) -> Option<String> {
        self.simple_text.clone().or_else(|| {
            self.runs
                .as_ref()
                .map(|runs| runs.iter().map(|run| run.text.as_str()).collect())
        })
    }
}

impl From<CaptionTrackJson> for CaptionTrack {
    fn from(track: CaptionTrackJson) -> Self {
        let language = track
            .name
            .as_ref()
            .and_then(TrackName::text)
            .unwrap_or_else(|| track.language_code.clone());

        CaptionTrack {
            base_url: track.base_url,
            language,
            language_code: track.language_code,
            is_generated: track.kind.as_deref() == Some("asr"),
            is_translatable: track.is_translatable,
        }
    }
}

/// Value of the hidden `v` field in the consent form
pub fn consent_token(html: &str) -> Option<String> {
    static CONSENT_VALUE: OnceLock<Regex> = OnceLock::new();
    let re = CONSENT_VALUE.get_or_init(|| Regex::new(r#"name="v" value="(.*?)""#).expect("valid regex"));
    re.captures(html).map(|caps| caps[1].to_string())
}

/// Extract the caption track list from a watch page
pub fn caption_tracks(video_id: &str, html: &str) -> Result<Vec<CaptionTrack>> {
    let Some((_, after_marker)) = html.split_once(CAPTIONS_MARKER) else {
        return Err(classify_missing_captions(video_id, html));
    };

    let raw = after_marker
        .split(VIDEO_DETAILS_MARKER)
        .next()
        .unwrap_or_default()
        .replace('\n', "");

    let captions: CaptionsJson = serde_json::from_str(&raw)
        .map_err(|e| CaptionError::Parse(format!("captions JSON for {}: {}", video_id, e)))?;

    let renderer = captions
        .player_captions_tracklist_renderer
        .ok_or_else(|| CaptionError::TranscriptsDisabled {
            video_id: video_id.to_string(),
        })?;

    let tracks: Vec<CaptionTrack> = renderer
        .caption_tracks
        .unwrap_or_default()
        .into_iter()
        .map(CaptionTrack::from)
        .collect();

    if tracks.is_empty() {
        return Err(CaptionError::NoTranscriptFound {
            video_id: video_id.to_string(),
            requested: Vec::new(),
            available: Vec::new(),
        });
    }

    Ok(tracks)
}

fn looks_like_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Work out why a watch page carries no captions JSON
fn classify_missing_captions(video_id: &str, html: &str) -> CaptionError {
    if looks_like_url(video_id) {
        CaptionError::InvalidVideoId(video_id.to_string())
    } else if html.contains(RECAPTCHA_MARKER) {
        CaptionError::TooManyRequests(video_id.to_string())
    } else if !html.contains(PLAYABILITY_MARKER) {
        CaptionError::VideoUnavailable(video_id.to_string())
    } else {
        CaptionError::TranscriptsDisabled {
            video_id: video_id.to_string(),
        }
    }
}

/// Parse a timedtext XML document into segments
pub fn parse_timedtext(xml: &str) -> Result<Vec<TranscriptSegment>> {
    static SELF_CLOSING: OnceLock<Regex> = OnceLock::new();
    static TEXT_ELEMENT: OnceLock<Regex> = OnceLock::new();

    if !xml.contains("<transcript") {
        return Err(CaptionError::Parse("timedtext document has no transcript element".to_string()));
    }

    let self_closing = SELF_CLOSING.get_or_init(|| Regex::new(r"<text\b[^>]*/>").expect("valid regex"));
    let text_element = TEXT_ELEMENT
        .get_or_init(|| Regex::new(r"(?s)<text\b([^>]*)>(.*?)</text>").expect("valid regex"));

    let xml = self_closing.replace_all(xml, "");
    let mut segments = Vec::new();

    for caps in text_element.captures_iter(&xml) {
        let raw = &caps[2];
        if raw.is_empty() {
            continue;
        }

        let attrs = &caps[1];
        let start = parse_seconds(attribute(attrs, "start").as_deref(), "start")?;
        let duration = match attribute(attrs, "dur") {
            Some(dur) => parse_seconds(Some(&dur), "dur")?,
            None => 0.0,
        };

        // Text arrives XML-escaped around HTML-escaped content
        let text = decode_xml_entities(raw);
        let text = html_escape::decode_html_entities(&text);
        segments.push(TranscriptSegment::new(strip_tags(&text), start, duration));
    }

    Ok(segments)
}

fn attribute(attrs: &str, name: &str) -> Option<String> {
    static ATTRIBUTE: OnceLock<Regex> = OnceLock::new();
    let re = ATTRIBUTE.get_or_init(|| Regex::new(r#"([\w:-]+)\s*=\s*"([^"]*)""#).expect("valid regex"));
    re.captures_iter(attrs)
        .find(|caps| &caps[1] == name)
        .map(|caps| caps[2].to_string())
}

fn parse_seconds(value: Option<&str>, name: &str) -> Result<f64> {
    let value = value.ok_or_else(|| CaptionError::Parse(format!("text element without {} attribute", name)))?;
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| CaptionError::Parse(format!("invalid {} value: {}", name, value)))
}

/// Decode the XML layer: the five predefined entities and numeric character references
pub fn decode_xml_entities(input: &str) -> String {
    static ENTITY: OnceLock<Regex> = OnceLock::new();
    let re = ENTITY.get_or_init(|| {
        Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|amp|lt|gt|quot|apos);").expect("valid regex")
    });

    re.replace_all(input, |caps: &Captures| {
        let entity = &caps[1];
        let decoded = if let Some(hex) = entity.strip_prefix("#x").or_else(|| entity.strip_prefix("#X")) {
            u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
        } else if let Some(dec) = entity.strip_prefix('#') {
            dec.parse::<u32>().ok().and_then(char::from_u32)
        } else {
            match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => None,
            }
        };

        decoded.map(String::from).unwrap_or_else(|| caps[0].to_string())
    })
    .into_owned()
}

/// Remove markup such as `<font>` or `<i>` from caption text
pub fn strip_tags(input: &str) -> String {
    static TAG: OnceLock<Regex> = OnceLock::new();
    let re = TAG.get_or_init(|| Regex::new(r"<[^>]*>").expect("valid regex"));
    re.replace_all(input, "").into_owned()
}
