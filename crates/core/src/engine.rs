use crate::keywords::Keyword;
use crate::{SearchError, TranscriptMatch, TranscriptSegment};
use std::collections::HashSet;

/// Case-insensitive substring search over caption segments.
///
/// Matching is containment, not word-boundary: "api" also matches inside "rapid".
/// Every match carries up to `context_window` neighbouring segments on each side; large
/// windows grow the context strings linearly, so callers clamp it to a small range.
///
/// Output is sorted by timestamp; ties keep keyword order. At most one match survives per
/// `(timestamp, keyword)` pair and the first context computed for the pair wins.
pub fn search_transcript<S: AsRef<str>>(
    segments: &[TranscriptSegment],
    keywords: &[S],
    context_window: usize,
) -> Result<Vec<TranscriptMatch>, SearchError> {
    let keywords = normalize_keywords(keywords);
    if keywords.is_empty() {
        return Err(SearchError::InvalidInput(
            "at least one keyword is required".to_string(),
        ));
    }

    let mut seen = HashSet::<(u64, &str)>::new();
    let mut matches = Vec::new();

    for (index, segment) in segments.iter().enumerate() {
        let lowered = segment.text.to_lowercase();

        for keyword in &keywords {
            if !keyword.occurs_in(&lowered) {
                continue;
            }
            if !seen.insert((segment.start.to_bits(), keyword.folded())) {
                continue;
            }

            matches.push(TranscriptMatch {
                keyword: keyword.original().to_string(),
                timestamp: segment.start,
                text: segment.text.clone(),
                context_before: context_before(segments, index, context_window),
                context_after: context_after(segments, index, context_window),
            });
        }
    }

    matches.sort_by(|left, right| left.timestamp.total_cmp(&right.timestamp));
    Ok(matches)
}

/// Trims, drops blanks and collapses keywords that fold to the same text.
fn normalize_keywords<S: AsRef<str>>(keywords: &[S]) -> Vec<Keyword> {
    let mut folded = HashSet::new();
    keywords
        .iter()
        .filter_map(|raw| Keyword::new(raw.as_ref()))
        .filter(|keyword| folded.insert(keyword.folded().to_string()))
        .collect()
}

fn context_before(segments: &[TranscriptSegment], index: usize, window: usize) -> String {
    join_text(&segments[index.saturating_sub(window)..index])
}

fn context_after(segments: &[TranscriptSegment], index: usize, window: usize) -> String {
    let end = index.saturating_add(window).min(segments.len().saturating_sub(1));
    if end <= index {
        return String::new();
    }
    join_text(&segments[index + 1..=end])
}

fn join_text(segments: &[TranscriptSegment]) -> String {
    segments
        .iter()
        .map(|segment| segment.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}
