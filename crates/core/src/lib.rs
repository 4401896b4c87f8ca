pub mod captions;
pub mod config;
pub mod credentials;
pub mod engine;
pub mod error;
pub mod format;
pub mod input;
pub mod keywords;
pub mod models;
pub mod orchestrator;
pub mod player;
pub mod sources;
pub mod traits;

pub use captions::{
    decode_caption_text, parse_json3, parse_payload, parse_segment_list, parse_timedtext_xml,
    select_track, PayloadFormat, TimeUnit,
};
pub use config::{AcquisitionConfig, DEFAULT_LANGUAGE, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
pub use credentials::{ApiKeyRotator, API_KEY_ENV_VARS};
pub use engine::search_transcript;
pub use error::{MetadataError, SearchError, TranscriptError, VideoSearchError};
pub use format::{format_duration, format_timestamp, highlight_keywords, jump_link};
pub use input::{
    dedupe_ids, extract_video_id, is_video_id, parse_duration_filters, parse_max_videos,
    parse_targets, DurationBound, DurationFilter, TargetList, VIDEO_ID_LEN,
};
pub use keywords::{parse_keywords, Keyword};
pub use models::{
    watch_url, BatchSearchReport, BatchSearchRequest, CaptionTrack, TranscriptMatch,
    TranscriptSegment, VideoFailure, VideoInfo, VideoSearchResult, UNKNOWN_TITLE,
};
pub use orchestrator::TranscriptSearcher;
pub use player::{caption_tracks, extract_player_response};
pub use sources::{
    HttpPageFetcher, LocalTranscriptSource, NoMetadata, YouTubeDataApi, YouTubeTranscripts,
};
pub use traits::{
    CredentialProvider, FetchedPage, PageFetcher, TranscriptSource, VideoMetadataSource,
};
