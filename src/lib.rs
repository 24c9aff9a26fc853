use {
    crate::config::{CacheBackend, Config},
    log::{debug, info},
    regex::Regex,
    std::{sync::Arc, time::Duration},
    yt_dlp_media::{
        MediaFetcher, PlaylistHint, RetryPolicy,
        cache::{MemoryCache, SqliteCache},
        executor::YtDlp,
        hooks::Hooks,
    },
};

pub mod config;

pub use yt_dlp_media as media;

const PAGE_URL_PATTERNS: [&str; 2] = [
    r"^https?://[A-Za-z0-9.-]+\.[A-Za-z]{2,}(:\d+)?(/\S*)?$",
    r"^https?://(localhost|\d{1,3}(\.\d{1,3}){3})(:\d+)?(/\S*)?$",
];

/// What a page URL points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageKind {
    Video,
    PlaylistEntry(PlaylistHint),
}

/// Tells whether the URL looks like a page the tool can handle, and what kind.
pub fn classify_page_url(url: &str) -> Option<PageKind> {
    let url = url.trim();
    for pattern in PAGE_URL_PATTERNS.iter() {
        let re = Regex::new(pattern).unwrap();
        if re.is_match(url) {
            return Some(match PlaylistHint::from_url(url) {
                Some(hint) => PageKind::PlaylistEntry(hint),
                None => PageKind::Video,
            });
        }
    }
    None
}

/// Wires the config into a fetcher: binary, locale, cookies, retry policy and cache.
pub fn build_fetcher(
    config: &Config,
    hooks: Hooks,
) -> Result<MediaFetcher, Box<dyn std::error::Error + Send + Sync>> {
    let tool = YtDlp::new(&config.binary_path)
        .with_interpreter(config.interpreter_path.clone())
        .with_timeout(Duration::from_secs(config.timeout_secs))
        .with_hooks(hooks);
    debug!("Using {}", tool);

    let mut fetcher = MediaFetcher::new(tool);
    fetcher
        .with_cookie_file(config.cookie_file.clone())
        .with_locale(&config.locale)
        .with_subtitle_format(&config.subtitle_format)
        .with_retry_policy(RetryPolicy::new(
            config.max_attempts,
            Duration::from_millis(config.retry_delay_ms),
        ));

    match config.cache {
        CacheBackend::Disabled => info!("Media record cache disabled"),
        CacheBackend::Memory => {
            fetcher.with_cache(Arc::new(MemoryCache::new()));
        }
        CacheBackend::Sqlite => {
            let cache_dir = config.resolved_cache_dir()?;
            debug!("Caching media records in {}", cache_dir.display());
            fetcher.with_cache(Arc::new(SqliteCache::new(cache_dir)?));
        }
    }

    Ok(fetcher)
}
