use crate::{CaptionTrack, TranscriptError};
use serde_json::Value;

const PLAYER_RESPONSE_MARKER: &str = "ytInitialPlayerResponse";
const UNAVAILABLE_STATUSES: [&str; 3] = ["ERROR", "UNPLAYABLE", "LOGIN_REQUIRED"];

/// Pulls the `ytInitialPlayerResponse` object out of a watch page.
pub fn extract_player_response(html: &str) -> Result<Value, TranscriptError> {
    let mut last_error = None;

    for (marker, _) in html.match_indices(PLAYER_RESPONSE_MARKER) {
        let after_marker = html[marker + PLAYER_RESPONSE_MARKER.len()..].trim_start();
        let Some(assignment) = after_marker.strip_prefix('=') else {
            continue;
        };
        let assignment = assignment.trim_start();
        if !assignment.starts_with('{') {
            continue;
        }

        // The object is followed by more script; read exactly one JSON value.
        match serde_json::Deserializer::from_str(assignment)
            .into_iter::<Value>()
            .next()
        {
            Some(Ok(value)) => return Ok(value),
            Some(Err(error)) => last_error = Some(error.to_string()),
            None => {}
        }
    }

    Err(TranscriptError::Parse(match last_error {
        Some(error) => format!("player response: {error}"),
        None => "could not find player response in page".to_string(),
    }))
}

/// Reads the caption track list, classifying why there is none.
pub fn caption_tracks(player_response: &Value) -> Result<Vec<CaptionTrack>, TranscriptError> {
    if let Some(status) = player_response
        .pointer("/playabilityStatus/status")
        .and_then(Value::as_str)
    {
        if UNAVAILABLE_STATUSES.contains(&status) {
            let reason = player_response
                .pointer("/playabilityStatus/reason")
                .and_then(Value::as_str)
                .unwrap_or(status);
            return Err(TranscriptError::VideoUnavailable(reason.to_string()));
        }
    }

    let Some(captions) = player_response.get("captions") else {
        return Err(TranscriptError::CaptionsDisabled);
    };

    let tracks: Vec<CaptionTrack> = captions
        .pointer("/playerCaptionsTracklistRenderer/captionTracks")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(parse_track).collect())
        .unwrap_or_default();

    if tracks.is_empty() {
        return Err(TranscriptError::NoTranscriptAvailable);
    }

    Ok(tracks)
}

fn parse_track(raw: &Value) -> Option<CaptionTrack> {
    let base_url = raw.get("baseUrl").and_then(Value::as_str)?.to_string();
    let language_code = raw.get("languageCode").and_then(Value::as_str)?.to_string();
    let name = raw
        .pointer("/name/simpleText")
        .or_else(|| raw.pointer("/name/runs/0/text"))
        .and_then(Value::as_str)
        .unwrap_or("Unknown")
        .to_string();

    Some(CaptionTrack {
        base_url,
        name,
        language_code,
        is_translatable: raw
            .get("isTranslatable")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        is_generated: raw.get("kind").and_then(Value::as_str) == Some("asr"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn player_response_is_read_from_page_script() -> Result<(), Box<dyn std::error::Error>> {
        let html = r#"<html><script>var ytInitialPlayerResponse = {"videoDetails":{"title":"a;b}"},"captions":{}};var meta = {};</script></html>"#;
        let value = extract_player_response(html)?;
        assert_eq!(value["videoDetails"]["title"], "a;b}");
        Ok(())
    }

    #[test]
    fn earlier_mentions_of_the_marker_are_skipped() -> Result<(), Box<dyn std::error::Error>> {
        let html = r#"<script>if (window.ytInitialPlayerResponse) {}</script><script>var ytInitialPlayerResponse = {"captions":{}};</script>"#;
        let value = extract_player_response(html)?;
        assert!(value.get("captions").is_some());
        Ok(())
    }

    #[test]
    fn missing_player_response_is_a_parse_error() {
        assert!(matches!(
            extract_player_response("<html></html>"),
            Err(TranscriptError::Parse(_))
        ));
        assert!(matches!(
            extract_player_response("ytInitialPlayerResponse = {broken"),
            Err(TranscriptError::Parse(_))
        ));
    }

    #[test]
    fn tracks_are_listed_with_names() -> Result<(), Box<dyn std::error::Error>> {
        let response = json!({
            "playabilityStatus": {"status": "OK"},
            "captions": {"playerCaptionsTracklistRenderer": {"captionTracks": [
                {"baseUrl": "https://x.test/a", "languageCode": "en", "name": {"simpleText": "English"}, "isTranslatable": true},
                {"baseUrl": "https://x.test/b", "languageCode": "de", "name": {"runs": [{"text": "German (auto)"}]}, "kind": "asr"},
                {"languageCode": "fr"}
            ]}}
        });

        let tracks = caption_tracks(&response)?;
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].name, "English");
        assert!(tracks[0].is_translatable);
        assert_eq!(tracks[1].name, "German (auto)");
        assert!(tracks[1].is_generated);
        Ok(())
    }

    #[test]
    fn failures_are_classified() {
        let disabled = json!({"playabilityStatus": {"status": "OK"}});
        assert!(matches!(
            caption_tracks(&disabled),
            Err(TranscriptError::CaptionsDisabled)
        ));

        let empty = json!({"captions": {"playerCaptionsTracklistRenderer": {"captionTracks": []}}});
        assert!(matches!(
            caption_tracks(&empty),
            Err(TranscriptError::NoTranscriptAvailable)
        ));

        let removed = json!({"playabilityStatus": {"status": "ERROR", "reason": "Video unavailable"}});
        match caption_tracks(&removed) {
            Err(TranscriptError::VideoUnavailable(reason)) => assert_eq!(reason, "Video unavailable"),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
