use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::input::DurationFilter;

pub const UNKNOWN_TITLE: &str = "Unknown Title";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub text: String,
    /// Seconds from video start.
    pub start: f64,
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

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptMatch {
    pub keyword: String,
    pub timestamp: f64,
    pub text: String,
    pub context_before: String,
    pub context_after: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionTrack {
    pub base_url: String,
    pub name: String,
    pub language_code: String,
    pub is_translatable: bool,
    /// Auto-generated (ASR) track.
    pub is_generated: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoInfo {
    pub id: String,
    pub title: String,
    pub thumbnail_url: String,
    pub channel_title: String,
    pub published_at: String,
    pub duration_secs: u64,
    pub view_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSearchResult {
    pub video_id: String,
    pub video_title: String,
    pub video_url: String,
    pub thumbnail_url: String,
    pub matches: Vec<TranscriptMatch>,
    pub match_count: usize,
}

impl VideoSearchResult {
    /// Returns `None` when there is nothing to report for the video.
    pub fn from_matches(
        video_id: &str,
        info: Option<&VideoInfo>,
        matches: Vec<TranscriptMatch>,
    ) -> Option<Self> {
        if matches.is_empty() {
            return None;
        }

        Some(Self {
            video_id: video_id.to_string(),
            video_title: info
                .map(|info| info.title.clone())
                .filter(|title| !title.is_empty())
                .unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
            video_url: watch_url(video_id),
            thumbnail_url: info.map(|info| info.thumbnail_url.clone()).unwrap_or_default(),
            match_count: matches.len(),
            matches,
        })
    }
}

pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={video_id}")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoFailure {
    pub video_id: String,
    pub error: String,
}

#[derive(Debug, Clone)]
pub struct BatchSearchRequest {
    pub video_ids: Vec<String>,
    /// Raw comma-delimited keyword input, quoted phrases allowed.
    pub keywords: String,
    pub context_window: usize,
    pub concurrency: usize,
    pub duration_filters: Vec<DurationFilter>,
}

impl BatchSearchRequest {
    pub fn new(video_ids: Vec<String>, keywords: impl Into<String>) -> Self {
        Self {
            video_ids,
            keywords: keywords.into(),
            context_window: 1,
            concurrency: 1,
            duration_filters: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSearchReport {
    pub results: Vec<VideoSearchResult>,
    pub total_matches: usize,
    pub videos_scanned: usize,
    pub videos_with_matches: usize,
    pub execution_time_ms: u64,
    pub keywords_not_found: Vec<String>,
    pub errors: Vec<VideoFailure>,
    pub cancelled: bool,
    pub searched_at: DateTime<Utc>,
}
