use crate::{MetadataError, TranscriptError, TranscriptSegment, VideoInfo};
use async_trait::async_trait;
use std::collections::HashMap;

/// One way of turning a video id into its caption segments.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    async fn fetch_transcript(
        &self,
        video_id: &str,
    ) -> Result<Vec<TranscriptSegment>, TranscriptError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub status: u16,
    pub body: String,
}

impl FetchedPage {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Plain HTTP GET against the video host.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn get(&self, url: &str, accept: &str) -> Result<FetchedPage, TranscriptError>;
}

/// Display metadata for videos; ids missing from the map are simply unknown.
#[async_trait]
pub trait VideoMetadataSource: Send + Sync {
    async fn videos_info(
        &self,
        video_ids: &[String],
    ) -> Result<HashMap<String, VideoInfo>, MetadataError>;
}

pub trait CredentialProvider: Send + Sync {
    fn next(&self) -> Option<String>;
}
