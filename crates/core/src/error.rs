use thiserror::Error;

#[derive(Debug, Error)]
pub enum TranscriptError {
    #[error("transcripts are disabled for this video")]
    CaptionsDisabled,

    #[error("no transcript available for this video")]
    NoTranscriptAvailable,

    #[error("video unavailable: {0}")]
    VideoUnavailable(String),

    #[error("transient fetch failure: {0}")]
    TransientFetch(String),

    #[error("transcript parse error: {0}")]
    Parse(String),
}

impl TranscriptError {
    /// Failures that may clear up if the same video is tried again later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TranscriptError::TransientFetch(_))
    }

    /// Maps free-form upstream messages (library or subprocess output) onto the taxonomy.
    pub fn from_upstream_message(message: &str) -> Self {
        let lowered = message.to_lowercase();
        if lowered.contains("disabled") {
            TranscriptError::CaptionsDisabled
        } else if lowered.contains("no transcript") || lowered.contains("no captions") {
            TranscriptError::NoTranscriptAvailable
        } else if lowered.contains("unavailable") || lowered.contains("not available") {
            TranscriptError::VideoUnavailable(message.to_string())
        } else {
            TranscriptError::Parse(message.to_string())
        }
    }
}

impl From<reqwest::Error> for TranscriptError {
    fn from(error: reqwest::Error) -> Self {
        TranscriptError::TransientFetch(error.to_string())
    }
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

#[derive(Debug, Error)]
pub enum VideoSearchError {
    #[error(transparent)]
    Transcript(#[from] TranscriptError),

    #[error(transparent)]
    Search(#[from] SearchError),
}

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("no api key configured for metadata lookups")]
    MissingCredentials,
}

pub type Result<T, E = TranscriptError> = std::result::Result<T, E>;
