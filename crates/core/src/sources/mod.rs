pub mod data_api;
pub mod http;
pub mod local;
pub mod youtube;

pub use data_api::{NoMetadata, YouTubeDataApi};
pub use http::HttpPageFetcher;
pub use local::LocalTranscriptSource;
pub use youtube::YouTubeTranscripts;
