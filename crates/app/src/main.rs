use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use colored::{Color, Colorize};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use yttr_search_core::{
    dedupe_ids, extract_video_id, format_duration, format_timestamp, highlight_keywords,
    jump_link, parse_duration_filters, parse_keywords, parse_max_videos, parse_targets,
    select_track, AcquisitionConfig, ApiKeyRotator, BatchSearchReport, BatchSearchRequest,
    LocalTranscriptSource, NoMetadata, TranscriptSearcher, TranscriptSource, VideoMetadataSource,
    VideoSearchError, VideoSearchResult, YouTubeDataApi, YouTubeTranscripts, DEFAULT_LANGUAGE,
    DEFAULT_TIMEOUT_SECS,
};

const HIGHLIGHT_COLORS: [Color; 6] = [
    Color::Yellow,
    Color::Cyan,
    Color::Magenta,
    Color::Green,
    Color::Blue,
    Color::Red,
];

#[derive(Parser)]
#[command(name = "yttr-search", version, about = "Search YouTube transcripts for keywords")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Preferred caption language
    #[arg(long, global = true, env = "YTTR_LANG", default_value = DEFAULT_LANGUAGE)]
    lang: String,

    /// Per-request timeout in seconds
    #[arg(long, global = true, env = "YTTR_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,
}

#[derive(Subcommand)]
enum Command {
    /// Search one or more videos and print timestamped matches.
    Search(SearchArgs),
    /// List the caption tracks a video offers.
    Tracks {
        /// Video URL or id.
        #[arg(short, long)]
        video: String,
    },
}

#[derive(Args)]
struct SearchArgs {
    /// Comma-separated keywords; quote phrases that contain commas.
    #[arg(short, long)]
    keywords: String,

    /// Video URL or id, repeatable.
    #[arg(short, long = "video")]
    videos: Vec<String>,

    /// File with one video URL or id per line.
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Segments of context on each side of a match.
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(0..=5))]
    context: u8,

    /// Videos fetched at the same time.
    #[arg(long, default_value_t = 1)]
    concurrency: usize,

    /// Stop after this many videos, e.g. 25, 1.3k or 2m.
    #[arg(short, long, value_parser = parse_maximum)]
    maximum: Option<usize>,

    /// Length filter such as +5m or -2h, repeatable. Needs a YouTube API key.
    #[arg(short, long = "length")]
    lengths: Vec<String>,

    /// Read `<id>.json` transcripts from this directory instead of YouTube.
    #[arg(long, env = "YTTR_TRANSCRIPT_DIR")]
    transcript_dir: Option<PathBuf>,

    /// Print the full report as JSON.
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn parse_maximum(raw: &str) -> Result<usize, String> {
    parse_max_videos(raw).ok_or_else(|| format!("expected a count such as 25, 1.3k or 2m, got {raw:?}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = AcquisitionConfig::from_env()
        .with_language(cli.lang)
        .with_timeout(Duration::from_secs(cli.timeout_secs));

    info!(
        version = env!("CARGO_PKG_VERSION"),
        started_at = %Utc::now().to_rfc3339(),
        language = %config.language,
        "yttr-search boot"
    );

    match cli.command {
        Command::Search(args) => run_search(config, args).await,
        Command::Tracks { video } => list_tracks(config, &video).await,
    }
}

async fn run_search(config: AcquisitionConfig, args: SearchArgs) -> anyhow::Result<()> {
    let mut video_ids = Vec::new();
    for reference in &args.videos {
        let video_id = extract_video_id(reference)
            .with_context(|| format!("not a YouTube video reference: {reference}"))?;
        video_ids.push(video_id);
    }

    if let Some(path) = &args.file {
        let contents = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        let targets = parse_targets(&contents);
        for line in &targets.rejected {
            warn!(line = %line, "ignoring line without a video reference");
        }
        video_ids.extend(targets.video_ids);
    }

    let mut video_ids = dedupe_ids(&video_ids);
    if video_ids.is_empty() {
        bail!("no videos to search; pass --video or --file");
    }
    if let Some(maximum) = args.maximum {
        video_ids.truncate(maximum);
    }

    let keywords = parse_keywords(&args.keywords);
    if keywords.is_empty() {
        bail!("at least one keyword is required");
    }

    let request = BatchSearchRequest {
        video_ids,
        keywords: args.keywords.clone(),
        context_window: usize::from(args.context),
        concurrency: args.concurrency,
        duration_filters: parse_duration_filters(&args.lengths)?,
    };

    let api_keys = ApiKeyRotator::from_env();
    if !request.duration_filters.is_empty() && api_keys.is_empty() {
        bail!("--length needs video durations; set YOUTUBE_API_KEY");
    }

    let metadata: Arc<dyn VideoMetadataSource> = if api_keys.is_empty() {
        info!("no YouTube API key configured, titles will be unknown");
        Arc::new(NoMetadata)
    } else {
        info!(keys = api_keys.len(), "using YouTube Data API for video metadata");
        Arc::new(YouTubeDataApi::new(api_keys))
    };

    let source: Arc<dyn TranscriptSource> = match &args.transcript_dir {
        Some(dir) => Arc::new(LocalTranscriptSource::new(dir)),
        None => Arc::new(YouTubeTranscripts::new(config)?),
    };

    let searcher = TranscriptSearcher::new(source, metadata);
    if args.json || !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }

    if request.video_ids.len() == 1 && request.duration_filters.is_empty() && !args.json {
        let video_id = &request.video_ids[0];
        let result = match searcher
            .search_video(video_id, &request.keywords, request.context_window)
            .await
        {
            Ok(result) => result,
            Err(VideoSearchError::Transcript(error)) if error.is_retryable() => {
                bail!("{video_id}: {error} (temporary, try again later)")
            }
            Err(error) => return Err(error).with_context(|| video_id.clone()),
        };

        match result {
            Some(result) => print_result(&result, &keywords)?,
            None => println!("No matches in {video_id} for: {}", keywords.join(", ")),
        }
        return Ok(());
    }

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, finishing videos already in flight");
            interrupt.cancel();
        }
    });

    let report = searcher.search(&request, &cancel).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, &keywords)?;
    }

    Ok(())
}

async fn list_tracks(config: AcquisitionConfig, reference: &str) -> anyhow::Result<()> {
    let video_id = extract_video_id(reference)
        .with_context(|| format!("not a YouTube video reference: {reference}"))?;
    let language = config.language.clone();

    let tracks = YouTubeTranscripts::new(config)?
        .list_tracks(&video_id)
        .await
        .with_context(|| format!("listing caption tracks for {video_id}"))?;
    let selected = select_track(&tracks, &language).map(|track| track.base_url.clone());

    for track in &tracks {
        let marker = if selected.as_deref() == Some(track.base_url.as_str()) {
            "*"
        } else {
            " "
        };
        let kind = if track.is_generated { " (auto-generated)" } else { "" };
        println!("{marker} {:<8} {}{kind}", track.language_code, track.name);
    }

    Ok(())
}

fn print_report(report: &BatchSearchReport, keywords: &[String]) -> anyhow::Result<()> {
    for result in &report.results {
        print_result(result, keywords)?;
    }

    if !report.keywords_not_found.is_empty() {
        println!("\nKeywords not found: {}", report.keywords_not_found.join(", "));
    }

    if !report.errors.is_empty() {
        println!("\nSkipped {} video(s):", report.errors.len());
        for failure in &report.errors {
            println!("  {}: {}", failure.video_id, failure.error);
        }
    }

    let elapsed = if report.execution_time_ms >= 1_000 {
        format_duration(report.execution_time_ms / 1_000)
    } else {
        format!("{}ms", report.execution_time_ms)
    };
    println!(
        "\nScanned {} video(s), {} with matches, {} match(es) in {elapsed}",
        report.videos_scanned, report.videos_with_matches, report.total_matches
    );
    if report.cancelled {
        println!("Search was interrupted; results are partial.");
    }

    Ok(())
}

fn print_result(result: &VideoSearchResult, keywords: &[String]) -> anyhow::Result<()> {
    println!("\n{} ({})", result.video_title, result.video_url);
    println!("{} match(es)", result.match_count);

    for item in &result.matches {
        println!(
            "  [{}] {}",
            format_timestamp(item.timestamp),
            jump_link(&result.video_id, item.timestamp)
        );
        if !item.context_before.is_empty() {
            println!("      {}", item.context_before);
        }
        println!("    > {}", highlight(&item.text, keywords)?);
        if !item.context_after.is_empty() {
            println!("      {}", item.context_after);
        }
    }

    Ok(())
}

fn highlight(text: &str, keywords: &[String]) -> anyhow::Result<String> {
    Ok(highlight_keywords(text, keywords, |index, matched| {
        matched
            .color(HIGHLIGHT_COLORS[index % HIGHLIGHT_COLORS.len()])
            .bold()
            .to_string()
    })?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn context_window_is_bounded() {
        assert!(Cli::try_parse_from(["yttr-search", "search", "-k", "api", "--context", "5"]).is_ok());
        assert!(Cli::try_parse_from(["yttr-search", "search", "-k", "api", "--context", "6"]).is_err());
    }

    #[test]
    fn maximum_accepts_suffixed_counts() {
        assert_eq!(parse_maximum("1.3k"), Ok(1_300));
        assert!(parse_maximum("many").is_err());
    }

    #[test]
    fn matches_are_colored_per_keyword() -> anyhow::Result<()> {
        colored::control::set_override(true);
        let keywords = vec!["api".to_string(), "m".to_string()];
        assert_eq!(
            highlight("my API", &keywords)?,
            format!("{}y {}", "m".cyan().bold(), "API".yellow().bold())
        );
        Ok(())
    }
}
