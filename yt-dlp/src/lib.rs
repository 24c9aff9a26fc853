//! Media URL, metadata, duration and subtitle extraction on top of the yt-dlp binary.
//!
//! The extraction itself is done by the external tool. This crate builds its command
//! lines, runs it, maps its line-oriented output onto typed records, retries when the
//! output comes back incomplete, and caches records until their signed URL expires.

use crate::cache::CacheStore;
use crate::executor::{ProcessRunner, YtDlp};
use crate::model::schema::OutputSchema;
use derive_more::Constructor;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub mod cache;
pub mod error;
pub mod executor;
pub mod fetcher;
pub mod hooks;
pub mod model;
pub mod utils;

pub use error::{Error, Result};
pub use fetcher::request::{MediaRequest, PlaylistHint};
pub use model::MediaRecord;
pub use model::caption::{SubtitleEntry, VideoWithSubtitles};

/// The locale the tool runs under unless configured otherwise.
pub const DEFAULT_LOCALE: &str = "en_US.UTF-8";
/// The subtitle format requested unless configured otherwise.
pub const DEFAULT_SUBTITLE_FORMAT: &str = "vtt";

/// How often a call is repeated when the tool output is incomplete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Constructor)]
pub struct RetryPolicy {
    /// The total number of calls, the first one included.
    pub max_attempts: usize,
    /// The pause between two calls.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(1),
        }
    }
}

/// A fetcher that asks yt-dlp for direct URLs, metadata, durations and subtitles.
///
/// The operations are located in the 'fetcher' module.
///
/// # Examples
///
/// ```rust,no_run
/// # use yt_dlp_media::MediaFetcher;
/// # use yt_dlp_media::executor::YtDlp;
/// # use yt_dlp_media::cache::MemoryCache;
/// # use std::sync::Arc;
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut fetcher = MediaFetcher::new(YtDlp::new("yt-dlp"));
/// fetcher.with_cache(Arc::new(MemoryCache::new()));
///
/// let url = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";
/// if let Some(record) = fetcher.fetch_media_record(url).await? {
///     println!("{}: {}", record.title, record.url);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct MediaFetcher {
    /// The runner of the tool.
    pub runner: Arc<dyn ProcessRunner>,
    /// Extra arguments passed to every call.
    pub args: Vec<String>,
    /// The cookie file used when a request has none.
    pub cookie_file: Option<PathBuf>,
    /// The locale the tool runs under, so that its output is formatted consistently.
    pub locale: String,
    /// The subtitle format requested when none is given.
    pub subtitle_format: String,
    /// The fields requested for media records.
    pub record_schema: OutputSchema,
    /// The retry policy for incomplete output.
    pub retry: RetryPolicy,
    /// The cache for media records.
    pub cache: Option<Arc<dyn CacheStore>>,
}

impl fmt::Display for MediaFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MediaFetcher: locale={}, args={:?}, cache={}",
            self.locale,
            self.args,
            self.cache.is_some()
        )
    }
}

impl MediaFetcher {
    /// Creates a fetcher running the given tool.
    ///
    /// # Arguments
    ///
    /// * `tool` - The yt-dlp binary to run.
    pub fn new(tool: YtDlp) -> Self {
        Self::with_runner(Arc::new(tool))
    }

    /// Creates a fetcher on top of any process runner.
    pub fn with_runner(runner: Arc<dyn ProcessRunner>) -> Self {
        #[cfg(feature = "tracing")]
        tracing::debug!("Creating a new media fetcher with {:?}", runner);

        Self {
            runner,
            args: Vec::new(),
            cookie_file: None,
            locale: DEFAULT_LOCALE.to_string(),
            subtitle_format: DEFAULT_SUBTITLE_FORMAT.to_string(),
            record_schema: OutputSchema::media_record(),
            retry: RetryPolicy::default(),
            cache: None,
        }
    }

    /// Adds an argument to pass to every call.
    pub fn with_arg(&mut self, arg: impl AsRef<str>) -> &mut Self {
        self.args.push(arg.as_ref().to_string());
        self
    }

    /// Adds arguments to pass to every call.
    pub fn with_args(&mut self, mut args: Vec<String>) -> &mut Self {
        self.args.append(&mut args);
        self
    }

    /// Sets the cookie file used when a request has none.
    pub fn with_cookie_file(&mut self, cookie_file: Option<PathBuf>) -> &mut Self {
        self.cookie_file = cookie_file;
        self
    }

    /// Sets the locale the tool runs under.
    pub fn with_locale(&mut self, locale: impl Into<String>) -> &mut Self {
        self.locale = locale.into();
        self
    }

    /// Sets the subtitle format requested when none is given.
    pub fn with_subtitle_format(&mut self, format: impl Into<String>) -> &mut Self {
        self.subtitle_format = format.into();
        self
    }

    /// Sets the fields requested for media records.
    pub fn with_record_schema(&mut self, schema: OutputSchema) -> &mut Self {
        self.record_schema = schema;
        self
    }

    /// Sets the retry policy for incomplete output.
    pub fn with_retry_policy(&mut self, retry: RetryPolicy) -> &mut Self {
        self.retry = retry;
        self
    }

    /// Enables the media record cache.
    pub fn with_cache(&mut self, cache: Arc<dyn CacheStore>) -> &mut Self {
        #[cfg(feature = "tracing")]
        tracing::debug!("Enabling media record cache: {:?}", cache);

        self.cache = Some(cache);
        self
    }
}
