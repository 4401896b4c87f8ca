use regex::{Captures, Regex};

/// `MM:SS`; minutes keep counting past the hour.
pub fn format_timestamp(seconds: f64) -> String {
    let total = seconds.max(0.0).floor() as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// `1h 23m`, `5m 30s` or `42s`.
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3_600;
    let minutes = (seconds % 3_600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m {secs}s")
    } else {
        format!("{secs}s")
    }
}

/// Watch link that starts playback at the match.
pub fn jump_link(video_id: &str, seconds: f64) -> String {
    format!(
        "https://www.youtube.com/watch?v={video_id}&t={}s",
        seconds.max(0.0).floor() as u64
    )
}

/// Wraps every case-insensitive occurrence of each keyword using `wrap(keyword_index, matched)`.
/// All keywords are matched in a single pass, longest first, so wrappers are never rescanned.
pub fn highlight_keywords<S, F>(text: &str, keywords: &[S], wrap: F) -> Result<String, regex::Error>
where
    S: AsRef<str>,
    F: Fn(usize, &str) -> String,
{
    let mut terms: Vec<(usize, &str)> = keywords
        .iter()
        .enumerate()
        .map(|(index, keyword)| (index, keyword.as_ref().trim()))
        .filter(|(_, keyword)| !keyword.is_empty())
        .collect();
    if terms.is_empty() {
        return Ok(text.to_string());
    }
    terms.sort_by(|left, right| right.1.len().cmp(&left.1.len()));

    // One capture group per term; the group that matched names the keyword.
    let alternation = terms
        .iter()
        .map(|(_, term)| format!("({})", regex::escape(term)))
        .collect::<Vec<_>>()
        .join("|");
    let pattern = Regex::new(&format!("(?i){alternation}"))?;

    Ok(pattern
        .replace_all(text, |capture: &Captures| {
            let index = (1..capture.len())
                .find(|group| capture.get(*group).is_some())
                .map_or(0, |group| terms[group - 1].0);
            wrap(index, &capture[0])
        })
        .into_owned())
}
