use crate::error::Result;
use crate::{CaptionTrack, TranscriptError, TranscriptSegment};
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

/// Largest plausible on-screen duration, in seconds, for a single caption.
const MAX_PLAUSIBLE_CAPTION_SECS: f64 = 100.0;

static TRANSCRIPT_TEXT_RE: OnceLock<Regex> = OnceLock::new();
static TIMEDTEXT_P_RE: OnceLock<Regex> = OnceLock::new();
static ATTRIBUTE_RE: OnceLock<Regex> = OnceLock::new();
static TAG_RE: OnceLock<Regex> = OnceLock::new();

fn cached_regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("caption pattern should compile"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadFormat {
    TimedTextXml,
    Json3,
}

impl PayloadFormat {
    pub fn accept_header(self) -> &'static str {
        match self {
            PayloadFormat::TimedTextXml => "*/*",
            PayloadFormat::Json3 => "application/json, */*",
        }
    }
}

pub fn parse_payload(format: PayloadFormat, body: &str) -> Result<Vec<TranscriptSegment>> {
    if body.trim().is_empty() {
        return Err(TranscriptError::TransientFetch(
            "empty caption payload".to_string(),
        ));
    }

    match format {
        PayloadFormat::TimedTextXml => parse_timedtext_xml(body),
        PayloadFormat::Json3 => parse_json3(body),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Seconds,
    Milliseconds,
}

impl TimeUnit {
    /// Durations above the plausible caption length can only be milliseconds.
    pub fn infer(durations: impl IntoIterator<Item = f64>) -> Self {
        if durations
            .into_iter()
            .any(|duration| duration > MAX_PLAUSIBLE_CAPTION_SECS)
        {
            TimeUnit::Milliseconds
        } else {
            TimeUnit::Seconds
        }
    }

    pub fn to_seconds(self, value: f64) -> f64 {
        let value = value.max(0.0);
        match self {
            TimeUnit::Seconds => value,
            TimeUnit::Milliseconds => value / 1000.0,
        }
    }
}

/// Timed-text XML, either `<transcript><text start dur>` (seconds) or the
/// `<timedtext><body><p t d>` layout (milliseconds).
pub fn parse_timedtext_xml(body: &str) -> Result<Vec<TranscriptSegment>> {
    if body.contains("<transcript") {
        let element_re = cached_regex(
            &TRANSCRIPT_TEXT_RE,
            r"(?s)<text\b([^>]*?)(?:/>|>(.*?)</text>)",
        );
        parse_xml_elements(body, element_re, ("start", "dur"), TimeUnit::Seconds)
    } else if body.contains("<timedtext") {
        let element_re = cached_regex(&TIMEDTEXT_P_RE, r"(?s)<p\b([^>]*?)(?:/>|>(.*?)</p>)");
        parse_xml_elements(body, element_re, ("t", "d"), TimeUnit::Milliseconds)
    } else {
        Err(TranscriptError::Parse(
            "payload is not timed-text xml".to_string(),
        ))
    }
}

fn parse_xml_elements(
    body: &str,
    element_re: &Regex,
    (start_attr, duration_attr): (&str, &str),
    unit: TimeUnit,
) -> Result<Vec<TranscriptSegment>> {
    let attribute_re = cached_regex(&ATTRIBUTE_RE, r#"([A-Za-z_:]+)\s*=\s*"([^"]*)""#);
    let tag_re = cached_regex(&TAG_RE, r"<[^>]*>");

    let mut segments = Vec::new();
    for capture in element_re.captures_iter(body) {
        let attributes = capture.get(1).map(|m| m.as_str()).unwrap_or_default();
        let mut start = 0.0;
        let mut duration = 0.0;

        for attribute in attribute_re.captures_iter(attributes) {
            let target = match &attribute[1] {
                name if name == start_attr => &mut start,
                name if name == duration_attr => &mut duration,
                _ => continue,
            };
            *target = parse_number(&attribute[2])?;
        }

        let raw_text = capture.get(2).map(|m| m.as_str()).unwrap_or_default();
        let stripped = tag_re.replace_all(raw_text, "");
        // The XML layer escapes text that was already HTML-escaped upstream.
        let text = decode_caption_text(&html_escape::decode_html_entities(&stripped));
        if text.is_empty() {
            continue;
        }

        segments.push(TranscriptSegment::new(
            text,
            unit.to_seconds(start),
            unit.to_seconds(duration),
        ));
    }

    Ok(segments)
}

fn parse_number(raw: &str) -> Result<f64, TranscriptError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|error| TranscriptError::Parse(format!("bad timing value {raw:?}: {error}")))
}

#[derive(Debug, Deserialize)]
struct Json3Payload {
    events: Option<Vec<Json3Event>>,
}

#[derive(Debug, Deserialize)]
struct Json3Event {
    #[serde(rename = "tStartMs", default)]
    start_ms: f64,
    #[serde(rename = "dDurationMs", default)]
    duration_ms: f64,
    #[serde(default)]
    segs: Option<Vec<Json3Seg>>,
}

#[derive(Debug, Deserialize)]
struct Json3Seg {
    #[serde(default)]
    utf8: String,
}

/// `{"events": [{"tStartMs", "dDurationMs", "segs": [{"utf8"}]}]}`; events without
/// `segs` are layout markers and carry no text.
pub fn parse_json3(body: &str) -> Result<Vec<TranscriptSegment>> {
    let payload: Json3Payload = serde_json::from_str(body)
        .map_err(|error| TranscriptError::Parse(format!("json3 payload: {error}")))?;
    let events = payload.events.ok_or_else(|| {
        TranscriptError::Parse("json3 payload has no events".to_string())
    })?;

    Ok(events
        .into_iter()
        .filter_map(|event| {
            let segs = event.segs?;
            let raw = segs.iter().map(|seg| seg.utf8.as_str()).collect::<String>();
            let text = decode_caption_text(&raw);
            if text.is_empty() {
                return None;
            }
            Some(TranscriptSegment::new(
                text,
                TimeUnit::Milliseconds.to_seconds(event.start_ms),
                TimeUnit::Milliseconds.to_seconds(event.duration_ms),
            ))
        })
        .collect())
}

#[derive(Debug, Deserialize)]
struct RawSegment {
    #[serde(default)]
    text: String,
    #[serde(default, alias = "offset")]
    start: f64,
    #[serde(default, alias = "dur")]
    duration: f64,
}

/// `[{"text", "start"|"offset", "duration"|"dur"}]` as written by library-based fetchers,
/// whose time unit varies by version. The unit is inferred once for the whole payload.
pub fn parse_segment_list(body: &str) -> Result<Vec<TranscriptSegment>> {
    let raw: Vec<RawSegment> = serde_json::from_str(body)
        .map_err(|error| TranscriptError::Parse(format!("segment list: {error}")))?;
    let unit = TimeUnit::infer(raw.iter().map(|segment| segment.duration));

    Ok(raw
        .into_iter()
        .filter_map(|segment| {
            let text = decode_caption_text(&segment.text);
            if text.is_empty() {
                return None;
            }
            Some(TranscriptSegment::new(
                text,
                unit.to_seconds(segment.start),
                unit.to_seconds(segment.duration),
            ))
        })
        .collect())
}

/// Decodes HTML entities, turns line breaks and non-breaking spaces into spaces and trims.
pub fn decode_caption_text(raw: &str) -> String {
    html_escape::decode_html_entities(raw)
        .replace("\r\n", " ")
        .replace(['\n', '\r', '\u{a0}'], " ")
        .trim()
        .to_string()
}

/// Exact language first, then any track sharing the primary subtag, then the first track.
pub fn select_track<'a>(tracks: &'a [CaptionTrack], language: &str) -> Option<&'a CaptionTrack> {
    let primary = language
        .split(['-', '_'])
        .next()
        .unwrap_or(language)
        .to_lowercase();

    tracks
        .iter()
        .find(|track| track.language_code.eq_ignore_ascii_case(language))
        .or_else(|| {
            tracks
                .iter()
                .find(|track| track.language_code.to_lowercase().starts_with(&primary))
        })
        .or_else(|| tracks.first())
}
