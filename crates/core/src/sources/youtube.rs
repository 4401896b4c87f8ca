use crate::captions::{parse_payload, select_track, PayloadFormat};
use crate::player::{caption_tracks, extract_player_response};
use crate::sources::HttpPageFetcher;
use crate::traits::{PageFetcher, TranscriptSource};
use crate::{AcquisitionConfig, CaptionTrack, TranscriptError, TranscriptSegment};
use async_trait::async_trait;
use tracing::debug;
use url::Url;

const WATCH_PAGE_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Scrapes the watch page for caption tracks and downloads the selected track.
pub struct YouTubeTranscripts<F = HttpPageFetcher> {
    fetcher: F,
    config: AcquisitionConfig,
}

impl YouTubeTranscripts<HttpPageFetcher> {
    pub fn new(config: AcquisitionConfig) -> Result<Self, TranscriptError> {
        let fetcher = HttpPageFetcher::new(&config)?;
        Ok(Self { fetcher, config })
    }
}

impl<F: PageFetcher> YouTubeTranscripts<F> {
    pub fn with_fetcher(fetcher: F, config: AcquisitionConfig) -> Self {
        Self { fetcher, config }
    }

    pub fn config(&self) -> &AcquisitionConfig {
        &self.config
    }

    pub async fn list_tracks(&self, video_id: &str) -> Result<Vec<CaptionTrack>, TranscriptError> {
        let page = self
            .fetcher
            .get(&self.config.watch_url(video_id), WATCH_PAGE_ACCEPT)
            .await?;

        match page.status {
            404 | 410 => {
                return Err(TranscriptError::VideoUnavailable(format!(
                    "watch page returned {}",
                    page.status
                )))
            }
            status if !page.is_success() => {
                return Err(TranscriptError::TransientFetch(format!(
                    "watch page returned {status}"
                )))
            }
            _ => {}
        }

        let player_response = extract_player_response(&page.body)?;
        let tracks = caption_tracks(&player_response)?;

        Ok(tracks
            .into_iter()
            .map(|mut track| {
                track.base_url = self.absolute_url(&track.base_url);
                track
            })
            .collect())
    }

    /// Downloads one track, retrying once as JSON3 when the default payload is unusable.
    pub async fn fetch_track(
        &self,
        track: &CaptionTrack,
    ) -> Result<Vec<TranscriptSegment>, TranscriptError> {
        let primary_error = match self
            .fetch_payload(&track.base_url, PayloadFormat::TimedTextXml)
            .await
        {
            Ok(segments) => return Ok(segments),
            Err(error) => error,
        };

        debug!(
            language = %track.language_code,
            error = %primary_error,
            "caption payload unusable, retrying as json3"
        );

        let fallback = match alternate_payload_url(&track.base_url) {
            Ok(url) => self.fetch_payload(&url, PayloadFormat::Json3).await,
            Err(error) => Err(error),
        };

        fallback.map_err(|fallback_error| {
            TranscriptError::Parse(format!(
                "{primary_error}; json3 fallback failed: {fallback_error}"
            ))
        })
    }

    async fn fetch_payload(
        &self,
        url: &str,
        format: PayloadFormat,
    ) -> Result<Vec<TranscriptSegment>, TranscriptError> {
        let page = self.fetcher.get(url, format.accept_header()).await?;
        if !page.is_success() {
            return Err(TranscriptError::TransientFetch(format!(
                "caption payload returned {}",
                page.status
            )));
        }

        parse_payload(format, &page.body)
    }

    fn absolute_url(&self, url: &str) -> String {
        if url.starts_with('/') {
            format!("{}{url}", self.config.watch_base_url.trim_end_matches('/'))
        } else {
            url.to_string()
        }
    }
}

#[async_trait]
impl<F: PageFetcher> TranscriptSource for YouTubeTranscripts<F> {
    async fn fetch_transcript(
        &self,
        video_id: &str,
    ) -> Result<Vec<TranscriptSegment>, TranscriptError> {
        let tracks = self.list_tracks(video_id).await?;
        let track = select_track(&tracks, &self.config.language)
            .ok_or(TranscriptError::NoTranscriptAvailable)?;

        debug!(
            video_id,
            language = %track.language_code,
            generated = track.is_generated,
            "selected caption track"
        );

        self.fetch_track(track).await
    }
}

/// Same caption resource, requested as `fmt=json3`.
fn alternate_payload_url(base_url: &str) -> Result<String, TranscriptError> {
    let mut url = Url::parse(base_url)
        .map_err(|error| TranscriptError::Parse(format!("caption url {base_url}: {error}")))?;

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "fmt")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    url.query_pairs_mut()
        .clear()
        .extend_pairs(pairs)
        .append_pair("fmt", "json3");

    Ok(url.into())
}
