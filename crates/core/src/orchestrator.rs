use crate::engine::search_transcript;
use crate::input::dedupe_ids;
use crate::keywords::parse_keywords;
use crate::traits::{TranscriptSource, VideoMetadataSource};
use crate::{
    BatchSearchReport, BatchSearchRequest, SearchError, TranscriptMatch, VideoFailure, VideoInfo,
    VideoSearchError, VideoSearchResult,
};
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Runs keyword searches across many videos, tolerating per-video failures.
pub struct TranscriptSearcher<S: ?Sized, M: ?Sized> {
    source: Arc<S>,
    metadata: Arc<M>,
}

enum VideoOutcome {
    Matches(Vec<TranscriptMatch>),
    Failed(String),
    Rejected(SearchError),
}

impl<S, M> TranscriptSearcher<S, M>
where
    S: TranscriptSource + ?Sized + 'static,
    M: VideoMetadataSource + ?Sized,
{
    pub fn new(source: Arc<S>, metadata: Arc<M>) -> Self {
        Self { source, metadata }
    }

    /// Searches every requested video. Results keep submission order regardless of
    /// `request.concurrency`; a cancelled token stops new acquisitions and the partial
    /// report comes back with `cancelled` set.
    pub async fn search(
        &self,
        request: &BatchSearchRequest,
        cancel: &CancellationToken,
    ) -> Result<BatchSearchReport, SearchError> {
        let started = Instant::now();
        let searched_at = Utc::now();

        let keywords = parse_keywords(&request.keywords);
        if keywords.is_empty() {
            return Err(SearchError::InvalidInput(
                "at least one keyword is required".to_string(),
            ));
        }

        let mut video_ids = dedupe_ids(&request.video_ids);
        let info = self.lookup_metadata(&video_ids).await;

        if !request.duration_filters.is_empty() {
            video_ids.retain(|id| {
                info.get(id).is_some_and(|video| {
                    request
                        .duration_filters
                        .iter()
                        .all(|filter| filter.accepts(video.duration_secs))
                })
            });
        }

        info!(
            videos = video_ids.len(),
            keywords = keywords.len(),
            concurrency = request.concurrency.max(1),
            "starting transcript search"
        );

        let keywords = Arc::new(keywords);
        let slots = self
            .scan(
                &video_ids,
                Arc::clone(&keywords),
                request.context_window,
                request.concurrency,
                cancel,
            )
            .await;

        let mut results = Vec::new();
        let mut errors = Vec::new();
        let mut found = HashSet::new();
        let mut videos_scanned = 0usize;

        for (video_id, slot) in video_ids.iter().zip(slots) {
            let Some(outcome) = slot else {
                continue;
            };
            videos_scanned += 1;

            match outcome {
                VideoOutcome::Matches(matches) => {
                    found.extend(matches.iter().map(|item| item.keyword.to_lowercase()));
                    if let Some(result) =
                        VideoSearchResult::from_matches(video_id, info.get(video_id), matches)
                    {
                        results.push(result);
                    }
                }
                VideoOutcome::Failed(error) => errors.push(VideoFailure {
                    video_id: video_id.clone(),
                    error,
                }),
                VideoOutcome::Rejected(error) => return Err(error),
            }
        }

        let keywords_not_found = keywords
            .iter()
            .filter(|keyword| !found.contains(&keyword.to_lowercase()))
            .cloned()
            .collect();

        let report = BatchSearchReport {
            total_matches: results.iter().map(|result| result.match_count).sum(),
            videos_with_matches: results.len(),
            videos_scanned,
            results,
            execution_time_ms: started.elapsed().as_millis() as u64,
            keywords_not_found,
            errors,
            cancelled: videos_scanned < video_ids.len(),
            searched_at,
        };

        info!(
            scanned = report.videos_scanned,
            with_matches = report.videos_with_matches,
            matches = report.total_matches,
            failures = report.errors.len(),
            cancelled = report.cancelled,
            "transcript search finished"
        );

        Ok(report)
    }

    /// One video, failing with the classified acquisition error instead of recording it.
    pub async fn search_video(
        &self,
        video_id: &str,
        keywords: &str,
        context_window: usize,
    ) -> Result<Option<VideoSearchResult>, VideoSearchError> {
        let keywords = parse_keywords(keywords);
        if keywords.is_empty() {
            return Err(SearchError::InvalidInput(
                "at least one keyword is required".to_string(),
            )
            .into());
        }

        let segments = self.source.fetch_transcript(video_id).await?;
        let matches = search_transcript(&segments, &keywords, context_window)?;
        let info = self.lookup_metadata(&[video_id.to_string()]).await;

        Ok(VideoSearchResult::from_matches(
            video_id,
            info.get(video_id),
            matches,
        ))
    }

    async fn lookup_metadata(&self, video_ids: &[String]) -> HashMap<String, VideoInfo> {
        if video_ids.is_empty() {
            return HashMap::new();
        }

        match self.metadata.videos_info(video_ids).await {
            Ok(info) => info,
            Err(error) => {
                warn!(%error, "video metadata lookup failed, continuing without it");
                HashMap::new()
            }
        }
    }

    /// One slot per video in submission order; `None` marks videos skipped after cancellation.
    async fn scan(
        &self,
        video_ids: &[String],
        keywords: Arc<Vec<String>>,
        context_window: usize,
        concurrency: usize,
        cancel: &CancellationToken,
    ) -> Vec<Option<VideoOutcome>> {
        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
        let mut handles = Vec::with_capacity(video_ids.len());

        for (position, video_id) in video_ids.iter().enumerate() {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };
            if cancel.is_cancelled() {
                break;
            }

            debug!(position, total = video_ids.len(), video_id = %video_id, "scanning video");

            let source = Arc::clone(&self.source);
            let keywords = Arc::clone(&keywords);
            let video_id = video_id.clone();

            handles.push(tokio::spawn(async move {
                let outcome =
                    scan_video(source.as_ref(), &video_id, &keywords, context_window).await;
                drop(permit);
                outcome
            }));
        }

        let mut slots: Vec<Option<VideoOutcome>> = video_ids.iter().map(|_| None).collect();
        for (position, handle) in handles.into_iter().enumerate() {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(error) => {
                    warn!(%error, video_id = %video_ids[position], "video scan task failed");
                    VideoOutcome::Failed(format!("scan task failed: {error}"))
                }
            };
            slots[position] = Some(outcome);
        }

        slots
    }
}

async fn scan_video<S: TranscriptSource + ?Sized>(
    source: &S,
    video_id: &str,
    keywords: &[String],
    context_window: usize,
) -> VideoOutcome {
    match source.fetch_transcript(video_id).await {
        Ok(segments) => match search_transcript(&segments, keywords, context_window) {
            Ok(matches) => VideoOutcome::Matches(matches),
            Err(error) => VideoOutcome::Rejected(error),
        },
        Err(error) => {
            warn!(video_id, %error, "skipping video");
            VideoOutcome::Failed(error.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::DurationFilter;
    use crate::sources::NoMetadata;
    use crate::{MetadataError, TranscriptError, TranscriptSegment, UNKNOWN_TITLE};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    enum FakeTranscript {
        Segments(Vec<TranscriptSegment>, Duration),
        Disabled,
        Removed,
    }

    #[derive(Default)]
    struct FakeTranscriptSource {
        transcripts: HashMap<String, FakeTranscript>,
        calls: Mutex<Vec<String>>,
        cancel_on: Option<(String, CancellationToken)>,
    }

    impl FakeTranscriptSource {
        fn with(mut self, video_id: &str, transcript: FakeTranscript) -> Self {
            self.transcripts.insert(video_id.to_string(), transcript);
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl TranscriptSource for FakeTranscriptSource {
        async fn fetch_transcript(
            &self,
            video_id: &str,
        ) -> Result<Vec<TranscriptSegment>, TranscriptError> {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(video_id.to_string());
            }
            if let Some((trigger, token)) = &self.cancel_on {
                if trigger == video_id {
                    token.cancel();
                }
            }

            match self.transcripts.get(video_id) {
                Some(FakeTranscript::Segments(segments, delay)) => {
                    tokio::time::sleep(*delay).await;
                    Ok(segments.clone())
                }
                Some(FakeTranscript::Disabled) => Err(TranscriptError::CaptionsDisabled),
                Some(FakeTranscript::Removed) | None => Err(TranscriptError::VideoUnavailable(
                    "video removed".to_string(),
                )),
            }
        }
    }

    struct FakeMetadata {
        info: Result<Vec<VideoInfo>, ()>,
    }

    #[async_trait]
    impl VideoMetadataSource for FakeMetadata {
        async fn videos_info(
            &self,
            _video_ids: &[String],
        ) -> Result<HashMap<String, VideoInfo>, MetadataError> {
            match &self.info {
                Ok(info) => Ok(info
                    .iter()
                    .map(|video| (video.id.clone(), video.clone()))
                    .collect()),
                Err(()) => Err(MetadataError::MissingCredentials),
            }
        }
    }

    fn talk(lines: &[&str]) -> FakeTranscript {
        talk_after(lines, Duration::ZERO)
    }

    fn talk_after(lines: &[&str], delay: Duration) -> FakeTranscript {
        FakeTranscript::Segments(
            lines
                .iter()
                .enumerate()
                .map(|(index, line)| TranscriptSegment::new(*line, index as f64 * 5.0, 5.0))
                .collect(),
            delay,
        )
    }

    fn video(id: &str, title: &str, duration_secs: u64) -> VideoInfo {
        VideoInfo {
            id: id.to_string(),
            title: title.to_string(),
            duration_secs,
            ..VideoInfo::default()
        }
    }

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[tokio::test]
    async fn failures_are_recorded_without_aborting_siblings() -> Result<(), SearchError> {
        let source = FakeTranscriptSource::default()
            .with("aaaaaaaaaaa", talk(&["intro to api design", "more api talk", "wrap up"]))
            .with("bbbbbbbbbbb", FakeTranscript::Disabled)
            .with("ccccccccccc", talk(&["api again"]));
        let searcher = TranscriptSearcher::new(Arc::new(source), Arc::new(NoMetadata));

        let request = BatchSearchRequest::new(
            ids(&["aaaaaaaaaaa", "bbbbbbbbbbb", "ccccccccccc", "ddddddddddd"]),
            "api, \"graph ql\"",
        );
        let report = searcher.search(&request, &CancellationToken::new()).await?;

        assert_eq!(report.videos_scanned, 4);
        assert_eq!(report.videos_with_matches, 2);
        assert_eq!(report.total_matches, 3);
        assert_eq!(report.results[0].video_id, "aaaaaaaaaaa");
        assert_eq!(report.results[0].video_title, UNKNOWN_TITLE);
        assert_eq!(report.results[1].video_id, "ccccccccccc");
        assert_eq!(
            report.errors,
            vec![
                VideoFailure {
                    video_id: "bbbbbbbbbbb".to_string(),
                    error: "transcripts are disabled for this video".to_string(),
                },
                VideoFailure {
                    video_id: "ddddddddddd".to_string(),
                    error: "video unavailable: video removed".to_string(),
                },
            ]
        );
        assert_eq!(report.keywords_not_found, vec!["graph ql"]);
        assert!(!report.cancelled);
        Ok(())
    }

    #[tokio::test]
    async fn blank_keywords_are_rejected() {
        let searcher = TranscriptSearcher::new(
            Arc::new(FakeTranscriptSource::default()),
            Arc::new(NoMetadata),
        );
        let request = BatchSearchRequest::new(ids(&["aaaaaaaaaaa"]), " , ");
        assert!(matches!(
            searcher.search(&request, &CancellationToken::new()).await,
            Err(SearchError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn repeated_ids_are_fetched_once() -> Result<(), SearchError> {
        let source = Arc::new(
            FakeTranscriptSource::default().with("aaaaaaaaaaa", talk(&["api"])),
        );
        let searcher = TranscriptSearcher::new(Arc::clone(&source), Arc::new(NoMetadata));

        let request = BatchSearchRequest::new(ids(&["aaaaaaaaaaa", "aaaaaaaaaaa"]), "api");
        let report = searcher.search(&request, &CancellationToken::new()).await?;

        assert_eq!(report.videos_scanned, 1);
        assert_eq!(source.calls(), vec!["aaaaaaaaaaa"]);
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_scan_keeps_submission_order() -> Result<(), SearchError> {
        let source = FakeTranscriptSource::default()
            .with("aaaaaaaaaaa", talk_after(&["api one"], Duration::from_millis(60)))
            .with("bbbbbbbbbbb", talk_after(&["api two"], Duration::from_millis(30)))
            .with("ccccccccccc", talk_after(&["api three"], Duration::ZERO));
        let searcher = TranscriptSearcher::new(Arc::new(source), Arc::new(NoMetadata));

        let mut request =
            BatchSearchRequest::new(ids(&["aaaaaaaaaaa", "bbbbbbbbbbb", "ccccccccccc"]), "api");
        request.concurrency = 3;
        let report = searcher.search(&request, &CancellationToken::new()).await?;

        let order: Vec<&str> = report
            .results
            .iter()
            .map(|result| result.video_id.as_str())
            .collect();
        assert_eq!(order, vec!["aaaaaaaaaaa", "bbbbbbbbbbb", "ccccccccccc"]);
        Ok(())
    }

    #[tokio::test]
    async fn cancelled_token_stops_before_any_fetch() -> Result<(), SearchError> {
        let source = Arc::new(
            FakeTranscriptSource::default().with("aaaaaaaaaaa", talk(&["api"])),
        );
        let searcher = TranscriptSearcher::new(Arc::clone(&source), Arc::new(NoMetadata));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = searcher
            .search(&BatchSearchRequest::new(ids(&["aaaaaaaaaaa"]), "api"), &cancel)
            .await?;

        assert!(report.cancelled);
        assert_eq!(report.videos_scanned, 0);
        assert!(source.calls().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn cancellation_between_videos_keeps_finished_work() -> Result<(), SearchError> {
        let cancel = CancellationToken::new();
        let source = Arc::new(FakeTranscriptSource {
            cancel_on: Some(("bbbbbbbbbbb".to_string(), cancel.clone())),
            ..FakeTranscriptSource::default()
                .with("aaaaaaaaaaa", talk(&["api one"]))
                .with("bbbbbbbbbbb", talk(&["api two"]))
                .with("ccccccccccc", talk(&["api three"]))
        });
        let searcher = TranscriptSearcher::new(Arc::clone(&source), Arc::new(NoMetadata));

        let request =
            BatchSearchRequest::new(ids(&["aaaaaaaaaaa", "bbbbbbbbbbb", "ccccccccccc"]), "api");
        let report = searcher.search(&request, &cancel).await?;

        assert!(report.cancelled);
        assert_eq!(report.videos_scanned, 2);
        assert_eq!(report.videos_with_matches, 2);
        assert_eq!(source.calls(), vec!["aaaaaaaaaaa", "bbbbbbbbbbb"]);
        Ok(())
    }

    #[tokio::test]
    async fn duration_filters_use_metadata() -> Result<(), SearchError> {
        let source = FakeTranscriptSource::default()
            .with("aaaaaaaaaaa", talk(&["api"]))
            .with("bbbbbbbbbbb", talk(&["api"]))
            .with("ccccccccccc", talk(&["api"]));
        let metadata = FakeMetadata {
            info: Ok(vec![
                video("aaaaaaaaaaa", "Short clip", 120),
                video("bbbbbbbbbbb", "Long talk", 1_800),
            ]),
        };
        let searcher = TranscriptSearcher::new(Arc::new(source), Arc::new(metadata));

        let mut request =
            BatchSearchRequest::new(ids(&["aaaaaaaaaaa", "bbbbbbbbbbb", "ccccccccccc"]), "api");
        request.duration_filters = vec![DurationFilter::parse("+5m").expect("filter")];
        let report = searcher.search(&request, &CancellationToken::new()).await?;

        assert_eq!(report.videos_scanned, 1);
        assert_eq!(report.results[0].video_id, "bbbbbbbbbbb");
        assert_eq!(report.results[0].video_title, "Long talk");
        Ok(())
    }

    #[tokio::test]
    async fn metadata_failure_falls_back_to_defaults() -> Result<(), SearchError> {
        let source = FakeTranscriptSource::default().with("aaaaaaaaaaa", talk(&["api"]));
        let searcher =
            TranscriptSearcher::new(Arc::new(source), Arc::new(FakeMetadata { info: Err(()) }));

        let report = searcher
            .search(
                &BatchSearchRequest::new(ids(&["aaaaaaaaaaa"]), "api"),
                &CancellationToken::new(),
            )
            .await?;
        assert_eq!(report.results[0].video_title, UNKNOWN_TITLE);
        Ok(())
    }

    #[tokio::test]
    async fn single_video_search_surfaces_classified_errors() {
        let source = FakeTranscriptSource::default()
            .with("aaaaaaaaaaa", FakeTranscript::Disabled)
            .with("bbbbbbbbbbb", FakeTranscript::Removed)
            .with("ccccccccccc", talk(&["nothing here"]));
        let searcher = TranscriptSearcher::new(Arc::new(source), Arc::new(NoMetadata));

        assert!(matches!(
            searcher.search_video("aaaaaaaaaaa", "api", 1).await,
            Err(VideoSearchError::Transcript(TranscriptError::CaptionsDisabled))
        ));
        assert!(matches!(
            searcher.search_video("bbbbbbbbbbb", "api", 1).await,
            Err(VideoSearchError::Transcript(TranscriptError::VideoUnavailable(_)))
        ));
        assert!(matches!(
            searcher.search_video("ccccccccccc", "api", 1).await,
            Ok(None)
        ));
    }
}
