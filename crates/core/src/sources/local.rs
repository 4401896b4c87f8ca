use crate::captions::parse_segment_list;
use crate::input::is_video_id;
use crate::traits::TranscriptSource;
use crate::{TranscriptError, TranscriptSegment};
use async_trait::async_trait;
use serde::Deserialize;
use std::io::ErrorKind;
use std::path::PathBuf;

/// Reads `<root>/<video_id>.json` dumps written by an external fetcher, either a
/// segment list or an `{"error": "..."}` object.
#[derive(Debug, Clone)]
pub struct LocalTranscriptSource {
    root: PathBuf,
}

#[derive(Debug, Deserialize)]
struct UpstreamFailure {
    error: String,
}

impl LocalTranscriptSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl TranscriptSource for LocalTranscriptSource {
    async fn fetch_transcript(
        &self,
        video_id: &str,
    ) -> Result<Vec<TranscriptSegment>, TranscriptError> {
        if !is_video_id(video_id) {
            return Err(TranscriptError::VideoUnavailable(format!(
                "invalid video id {video_id:?}"
            )));
        }

        let path = self.root.join(format!("{video_id}.json"));
        let body = match tokio::fs::read_to_string(&path).await {
            Ok(body) => body,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                return Err(TranscriptError::NoTranscriptAvailable)
            }
            Err(error) => {
                return Err(TranscriptError::TransientFetch(format!(
                    "{}: {error}",
                    path.display()
                )))
            }
        };

        if let Ok(failure) = serde_json::from_str::<UpstreamFailure>(&body) {
            return Err(TranscriptError::from_upstream_message(&failure.error));
        }

        parse_segment_list(&body)
    }
}
