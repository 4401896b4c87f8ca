use crate::SearchError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::OnceLock;

pub const VIDEO_ID_LEN: usize = 11;

static VIDEO_URL_RE: OnceLock<Regex> = OnceLock::new();

fn video_url_pattern() -> &'static Regex {
    VIDEO_URL_RE.get_or_init(|| {
        Regex::new(
            r"(?:youtube\.com/(?:watch\?(?:[^#]*&)?v=|embed/|v/|shorts/|live/)|youtu\.be/)([A-Za-z0-9_-]{11})(?:[^A-Za-z0-9_-]|$)",
        )
        .expect("video url pattern should compile")
    })
}

pub fn is_video_id(candidate: &str) -> bool {
    candidate.len() == VIDEO_ID_LEN
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Accepts a bare id or any of the watch, short-link, embed, `/v/`, shorts and live URL forms.
pub fn extract_video_id(input: &str) -> Option<String> {
    let input = input.trim();
    if is_video_id(input) {
        return Some(input.to_string());
    }

    video_url_pattern()
        .captures(input)
        .and_then(|capture| capture.get(1))
        .map(|id| id.as_str().to_string())
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetList {
    pub video_ids: Vec<String>,
    /// Non-blank lines that held no recognizable video reference.
    pub rejected: Vec<String>,
}

/// Newline-separated URLs or ids, as found in a batch file.
pub fn parse_targets(contents: &str) -> TargetList {
    let mut targets = TargetList::default();

    for line in contents.lines().map(str::trim).filter(|line| !line.is_empty()) {
        match extract_video_id(line) {
            Some(id) => targets.video_ids.push(id),
            None => targets.rejected.push(line.to_string()),
        }
    }

    targets
}

/// Keeps the first occurrence of each id.
pub fn dedupe_ids(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DurationBound {
    AtLeast,
    AtMost,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DurationFilter {
    pub bound: DurationBound,
    pub seconds: f64,
}

impl DurationFilter {
    /// `+5m` keeps videos of at least five minutes, `-2h` at most two hours.
    /// The sign is required; the unit defaults to seconds.
    pub fn parse(expr: &str) -> Option<Self> {
        let expr = expr.trim();
        let mut chars = expr.chars();
        let bound = match chars.next()? {
            '+' => DurationBound::AtLeast,
            '-' => DurationBound::AtMost,
            _ => return None,
        };

        let rest = chars.as_str();
        let (number, multiplier) = match rest.chars().last()? {
            's' => (&rest[..rest.len() - 1], 1.0),
            'm' => (&rest[..rest.len() - 1], 60.0),
            'h' => (&rest[..rest.len() - 1], 3_600.0),
            _ => (rest, 1.0),
        };

        if !is_plain_decimal(number) {
            return None;
        }

        let value: f64 = number.parse().ok()?;
        Some(Self {
            bound,
            seconds: value * multiplier,
        })
    }

    pub fn accepts(&self, duration_secs: u64) -> bool {
        let duration = duration_secs as f64;
        match self.bound {
            DurationBound::AtLeast => duration >= self.seconds,
            DurationBound::AtMost => duration <= self.seconds,
        }
    }
}

impl FromStr for DurationFilter {
    type Err = SearchError;

    fn from_str(expr: &str) -> Result<Self, Self::Err> {
        Self::parse(expr).ok_or_else(|| {
            SearchError::InvalidInput(format!(
                "bad length filter {expr:?}; use +5m, -2h, +30s"
            ))
        })
    }
}

/// Each entry may hold several filters separated by commas or whitespace.
pub fn parse_duration_filters<S: AsRef<str>>(
    exprs: &[S],
) -> Result<Vec<DurationFilter>, SearchError> {
    exprs
        .iter()
        .flat_map(|expr| {
            expr.as_ref()
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|token| !token.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .map(|token| token.parse())
        .collect()
}

fn is_plain_decimal(number: &str) -> bool {
    let mut parts = number.splitn(2, '.');
    let whole = parts.next().unwrap_or_default();
    let fraction = parts.next();

    let all_digits = |part: &str| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit());
    all_digits(whole) && fraction.map_or(true, all_digits)
}

/// Human-friendly counts such as `1.3k`, `2m` or `1,000`.
pub fn parse_max_videos(raw: &str) -> Option<usize> {
    let value = raw.to_lowercase().replace(',', "");
    let value = value.trim();

    let (number, multiplier) = if let Some(number) = value.strip_suffix('k') {
        (number, 1_000.0)
    } else if let Some(number) = value.strip_suffix('m') {
        (number, 1_000_000.0)
    } else {
        return value.parse().ok();
    };

    let scaled = number.trim().parse::<f64>().ok()? * multiplier;
    if !scaled.is_finite() || scaled < 0.0 {
        return None;
    }
    Some(scaled.round() as usize)
}
