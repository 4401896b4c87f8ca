use crate::credentials::ApiKeyRotator;
use crate::traits::{CredentialProvider, VideoMetadataSource};
use crate::{MetadataError, VideoInfo};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use url::Url;

const DEFAULT_ENDPOINT: &str = "https://www.googleapis.com/youtube/v3";
const MAX_IDS_PER_REQUEST: usize = 50;
const BACKEND: &str = "youtube-data-api";

/// YouTube Data API v3 `videos.list`, one rotated key per request.
pub struct YouTubeDataApi<C = ApiKeyRotator> {
    client: Client,
    endpoint: String,
    credentials: C,
}

impl<C: CredentialProvider> YouTubeDataApi<C> {
    pub fn new(credentials: C) -> Self {
        Self {
            client: Client::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            credentials,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn videos_url(&self, video_ids: &[String], key: &str) -> Result<Url, MetadataError> {
        let mut url = Url::parse(&format!("{}/videos", self.endpoint.trim_end_matches('/')))?;
        url.query_pairs_mut()
            .append_pair("part", "snippet,contentDetails,statistics")
            .append_pair("id", &video_ids.join(","))
            .append_pair("maxResults", &MAX_IDS_PER_REQUEST.to_string())
            .append_pair("key", key);
        Ok(url)
    }
}

#[async_trait]
impl<C: CredentialProvider> VideoMetadataSource for YouTubeDataApi<C> {
    async fn videos_info(
        &self,
        video_ids: &[String],
    ) -> Result<HashMap<String, VideoInfo>, MetadataError> {
        let mut info = HashMap::new();

        for batch in video_ids.chunks(MAX_IDS_PER_REQUEST) {
            let key = self
                .credentials
                .next()
                .ok_or(MetadataError::MissingCredentials)?;

            let response = self
                .client
                .get(self.videos_url(batch, &key)?)
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(MetadataError::BackendResponse {
                    backend: BACKEND.to_string(),
                    details: response.status().to_string(),
                });
            }

            let body: Value = response.json().await?;
            let items = body
                .pointer("/items")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();

            for item in items.iter().filter_map(parse_video_item) {
                info.insert(item.id.clone(), item);
            }
        }

        Ok(info)
    }
}

/// Used when no API key is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMetadata;

#[async_trait]
impl VideoMetadataSource for NoMetadata {
    async fn videos_info(
        &self,
        _video_ids: &[String],
    ) -> Result<HashMap<String, VideoInfo>, MetadataError> {
        Ok(HashMap::new())
    }
}

fn parse_video_item(item: &Value) -> Option<VideoInfo> {
    let id = item.get("id").and_then(Value::as_str)?.to_string();
    let text = |pointer: &str| {
        item.pointer(pointer)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    let thumbnail_url = ["high", "medium", "default"]
        .iter()
        .find_map(|size| {
            item.pointer(&format!("/snippet/thumbnails/{size}/url"))
                .and_then(Value::as_str)
        })
        .unwrap_or_default()
        .to_string();

    Some(VideoInfo {
        title: text("/snippet/title"),
        channel_title: text("/snippet/channelTitle"),
        published_at: text("/snippet/publishedAt"),
        thumbnail_url,
        duration_secs: parse_iso8601_duration(&text("/contentDetails/duration")).unwrap_or(0),
        view_count: text("/statistics/viewCount").parse().unwrap_or(0),
        id,
    })
}

/// `P1DT2H3M4S` style durations as returned in `contentDetails.duration`.
pub fn parse_iso8601_duration(raw: &str) -> Option<u64> {
    let body = raw.trim().strip_prefix('P')?;
    let mut total = 0u64;
    let mut digits = String::new();
    let mut in_time = false;

    for character in body.chars() {
        match character {
            '0'..='9' => digits.push(character),
            'T' if digits.is_empty() => in_time = true,
            unit => {
                let value: u64 = digits.parse().ok()?;
                let multiplier = match (unit, in_time) {
                    ('W', false) => 7 * 86_400,
                    ('D', false) => 86_400,
                    ('H', true) => 3_600,
                    ('M', true) => 60,
                    ('S', true) => 1,
                    _ => return None,
                };
                total = total.checked_add(value.checked_mul(multiplier)?)?;
                digits.clear();
            }
        }
    }

    if !digits.is_empty() {
        return None;
    }
    Some(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn durations_are_converted_to_seconds() {
        assert_eq!(parse_iso8601_duration("PT4M13S"), Some(253));
        assert_eq!(parse_iso8601_duration("PT1H"), Some(3_600));
        assert_eq!(parse_iso8601_duration("P1DT2H3M4S"), Some(93_784));
        assert_eq!(parse_iso8601_duration("P0D"), Some(0));
        assert_eq!(parse_iso8601_duration("PT"), Some(0));
        assert_eq!(parse_iso8601_duration("4M13S"), None);
        assert_eq!(parse_iso8601_duration("PT12"), None);
        assert_eq!(parse_iso8601_duration("P1M"), None);
    }

    #[test]
    fn video_items_are_mapped() {
        let item = json!({
            "id": "dQw4w9WgXcQ",
            "snippet": {
                "title": "Never Gonna Give You Up",
                "channelTitle": "Rick Astley",
                "publishedAt": "2009-10-25T06:57:33Z",
                "thumbnails": {
                    "default": {"url": "https://i.ytimg.com/vi/dQw4w9WgXcQ/default.jpg"},
                    "medium": {"url": "https://i.ytimg.com/vi/dQw4w9WgXcQ/mqdefault.jpg"}
                }
            },
            "contentDetails": {"duration": "PT3M33S"},
            "statistics": {"viewCount": "1500000000"}
        });

        let info = parse_video_item(&item).expect("item should map");
        assert_eq!(info.title, "Never Gonna Give You Up");
        assert_eq!(info.thumbnail_url, "https://i.ytimg.com/vi/dQw4w9WgXcQ/mqdefault.jpg");
        assert_eq!(info.duration_secs, 213);
        assert_eq!(info.view_count, 1_500_000_000);
    }

    #[test]
    fn request_url_carries_ids_and_key() -> Result<(), Box<dyn std::error::Error>> {
        let api = YouTubeDataApi::new(ApiKeyRotator::new(["k1"])).with_endpoint("http://api.test/v3/");
        let url = api.videos_url(&["a".to_string(), "b".to_string()], "k1")?;
        assert_eq!(url.path(), "/v3/videos");
        let pairs: HashMap<String, String> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs["id"], "a,b");
        assert_eq!(pairs["key"], "k1");
        Ok(())
    }

    #[tokio::test]
    async fn missing_credentials_fail_fast() {
        let api = YouTubeDataApi::new(ApiKeyRotator::default());
        assert!(matches!(
            api.videos_info(&["dQw4w9WgXcQ".to_string()]).await,
            Err(MetadataError::MissingCredentials)
        ));
    }
}
