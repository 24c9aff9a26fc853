use clap::{Parser, Subcommand};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use indicatif_log_bridge::LogWrapper;
use log::{LevelFilter, debug, info, trace};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use ytconvert::config::Config;
use ytconvert::media::MediaRequest;
use ytconvert::media::hooks::Hooks;
use ytconvert::media::utils::timestamp;
use ytconvert::{PageKind, build_fetcher, classify_page_url};

#[derive(Parser, Clone)]
#[command(version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    #[arg(long = "binary", global = true)]
    pub binary: Option<PathBuf>,

    #[arg(long = "cookies", global = true)]
    pub cookies: Option<PathBuf>,

    #[arg(
        long = "verbosity",
        short,
        global = true,
        default_value = "info",
        value_parser = clap::builder::PossibleValuesParser::new([
            "info", "debug", "error", "none", "full"
        ])
    )]
    pub verbosity: String,
}

#[derive(Subcommand, Clone)]
pub enum Command {
    /// Prints the direct URL of the best single format
    Url { url: String },
    /// Prints every direct URL of the page
    Urls { url: String },
    /// Prints the media record as JSON
    Info {
        url: String,
        /// Reads the record from the tool's JSON dump
        #[arg(long = "json-mode", action = clap::ArgAction::SetTrue)]
        json_mode: bool,
    },
    /// Prints the direct URL and the subtitles as JSON
    Subtitles {
        url: String,
        #[arg(long = "format", short)]
        format: Option<String>,
    },
    /// Prints the duration in seconds
    Duration { url: String },
    /// Formats seconds as HH:MM:SS.cc
    Timestamp { seconds: f64 },
    /// Parses a [[HH:]MM:]SS timestamp into seconds
    Seconds { timestamp: String },
    /// Writes the default config file
    PublishConfig {
        #[arg(long = "force", action = clap::ArgAction::SetTrue)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Cli::parse();
    let level = match args.verbosity.as_str() {
        "none" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "debug" => LevelFilter::Debug,
        "full" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    };

    let multi = MultiProgress::new();
    let logger = env_logger::Builder::new()
        .filter_level(level.min(LevelFilter::Warn))
        .filter_module("ytconvert", level)
        .filter_module("yt_dlp_media", level)
        .build();
    LogWrapper::new(multi.clone(), logger).try_init()?;
    log::set_max_level(level);

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => Config::default_path()?,
    };

    let url = match &args.command {
        Command::Timestamp { seconds } => {
            println!("{}", timestamp::seconds_to_timestamp(*seconds));
            return Ok(());
        }
        Command::Seconds { timestamp } => {
            println!("{}", timestamp::timestamp_to_seconds(timestamp));
            return Ok(());
        }
        Command::PublishConfig { force } => {
            if !Config::publish(&config_path, *force)? {
                info!("Use --force to overwrite it");
            }
            return Ok(());
        }
        Command::Url { url }
        | Command::Urls { url }
        | Command::Info { url, .. }
        | Command::Subtitles { url, .. }
        | Command::Duration { url } => url.trim().to_string(),
    };

    match classify_page_url(&url) {
        Some(PageKind::Video) => debug!("Video page: {}", url),
        Some(PageKind::PlaylistEntry(hint)) => {
            info!("Playlist {} entry {}", hint.list, hint.index)
        }
        None => return Err(format!("Not a page URL: {}", url).into()),
    }

    let mut config = Config::load_from(&config_path)?;
    if let Some(binary) = args.binary {
        config.binary_path = binary;
    }
    if args.cookies.is_some() {
        config.cookie_file = args.cookies;
    }

    let spinner = multi.add(ProgressBar::new_spinner());
    spinner.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
    spinner.set_message(format!("Asking {} about {}", config.binary_path.display(), url));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let progress_bar = spinner.clone();
    let hooks = Hooks::default()
        .on_progress(move |progress| progress_bar.set_message(progress.to_string()))
        .on_debug(|channel, buffer| trace!("[{}] {}", channel, buffer.trim_end()));

    let fetcher = build_fetcher(&config, hooks)?;
    debug!("{}", fetcher);

    let request = MediaRequest::new(&url);
    let result = run(&fetcher, args.command, request).await;
    spinner.finish_and_clear();

    println!("{}", result?);
    Ok(())
}

async fn run(
    fetcher: &ytconvert::media::MediaFetcher,
    command: Command,
    request: MediaRequest,
) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
    let gave_up = || format!("yt-dlp never printed complete output for {}", request.page_url);

    match command {
        Command::Url { .. } => fetcher
            .fetch_direct_url(request.clone())
            .await?
            .ok_or_else(|| format!("No direct URL for {}", request.page_url).into()),
        Command::Urls { .. } => Ok(fetcher.fetch_direct_urls(request.clone()).await?.join("\n")),
        Command::Info { json_mode, .. } => {
            let record = if json_mode {
                fetcher.fetch_media_record_json(request.clone()).await?
            } else {
                fetcher.fetch_media_record(request.clone()).await?
            };
            to_json(&record.ok_or_else(gave_up)?)
        }
        Command::Subtitles { format, .. } => {
            let video = fetcher
                .fetch_video_with_subtitles(request.clone(), format.as_deref())
                .await?
                .ok_or_else(gave_up)?;
            to_json(&video)
        }
        Command::Duration { .. } => Ok(fetcher.fetch_duration(request.clone()).await?.to_string()),
        Command::Timestamp { .. } | Command::Seconds { .. } | Command::PublishConfig { .. } => {
            Err("Command needs no page".into())
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
    Ok(serde_json::to_string_pretty(value)?)
}
