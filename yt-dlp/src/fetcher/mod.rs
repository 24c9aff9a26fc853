//! The fetcher operations.
//!
//! Every operation builds one command line, runs the tool and maps its output.
//! Operations reading several fields repeat the call while the output is incomplete,
//! see [`RetryPolicy`](crate::RetryPolicy).

use crate::MediaFetcher;
use crate::cache;
use crate::error::Result;
use crate::executor::Invocation;
use crate::model::caption::{self, VideoWithSubtitles};
use crate::model::schema::{Field, FieldMap, OutputSchema};
use crate::model::MediaRecord;
use crate::utils::{self, timestamp};
use chrono::Utc;

pub mod request;

use request::MediaRequest;

const SKIP_DASH: &str = "--youtube-skip-dash-manifest";
const SKIP_HLS: &str = "--youtube-skip-hls-manifest";

impl MediaFetcher {
    /// Fetches the direct URL of the best single format of a page.
    ///
    /// # Arguments
    ///
    /// * `request` - The page to fetch, e.g. 'https://www.youtube.com/watch?v=...'.
    ///
    /// # Errors
    ///
    /// This function will return an error if the tool could not be run or reported an error.
    pub async fn fetch_direct_url(&self, request: impl Into<MediaRequest>) -> Result<Option<String>> {
        let request = request.into();

        #[cfg(feature = "tracing")]
        tracing::debug!("Fetching direct URL of {}", request);

        let args = vec![SKIP_DASH, "-f", "best", "-g", &request.page_url];
        let lines = self.run_lines(&request, utils::to_owned(args)).await?;

        Ok(lines.into_iter().next())
    }

    /// Fetches every direct URL of a page, e.g. separate video and audio streams.
    ///
    /// # Errors
    ///
    /// This function will return an error if the tool could not be run or reported an error.
    pub async fn fetch_direct_urls(&self, request: impl Into<MediaRequest>) -> Result<Vec<String>> {
        let request = request.into();

        #[cfg(feature = "tracing")]
        tracing::debug!("Fetching direct URLs of {}", request);

        let args = vec![SKIP_DASH, "-g", &request.page_url];
        self.run_lines(&request, utils::to_owned(args)).await
    }

    /// Fetches the media record of a page, from the cache when it is still valid there.
    ///
    /// The record is cached until the expiry signed into its direct URL, if that lies in
    /// the future. Returns `None` when the tool never printed the expected number of lines.
    ///
    /// # Errors
    ///
    /// This function will return an error if the tool could not be run or reported an error.
    pub async fn fetch_media_record(
        &self,
        request: impl Into<MediaRequest>,
    ) -> Result<Option<MediaRecord>> {
        let request = request.into();
        let key = cache::cache_key(&request.page_url);

        if let Some(record) = self.cached(&key) {
            #[cfg(feature = "tracing")]
            tracing::debug!("Using cached media record for {}", request);

            return Ok(Some(record));
        }

        let schema = &self.record_schema;
        let mut args = schema.args();
        args.append(&mut utils::to_owned(vec![
            SKIP_DASH,
            SKIP_HLS,
            "-f",
            schema.format_selector(),
        ]));
        args.append(&mut request.selection_args(self.cookie_file.as_ref())?);
        args.push(request.page_url.clone());

        let Some(mut fields) = self.run_with_schema(&request, schema, args).await? else {
            return Ok(None);
        };

        let record = record_from_fields(&mut fields);
        self.store(&key, &record);

        Ok(Some(record))
    }

    /// Fetches the media record of a page from the tool's JSON dump.
    ///
    /// Shares the cache with [`fetch_media_record`](Self::fetch_media_record).
    ///
    /// A line that is not JSON counts as incomplete output and is retried.
    ///
    /// # Errors
    ///
    /// This function will return an error if the tool could not be run or reported an error.
    pub async fn fetch_media_record_json(
        &self,
        request: impl Into<MediaRequest>,
    ) -> Result<Option<MediaRecord>> {
        let request = request.into();
        let key = cache::cache_key(&request.page_url);

        if let Some(record) = self.cached(&key) {
            #[cfg(feature = "tracing")]
            tracing::debug!("Using cached media record for {}", request);

            return Ok(Some(record));
        }

        let mut args = utils::to_owned(vec![
            "-j",
            SKIP_DASH,
            SKIP_HLS,
            "-f",
            self.record_schema.format_selector(),
        ]);
        args.append(&mut request.selection_args(self.cookie_file.as_ref())?);
        args.push(request.page_url.clone());

        let decode = |lines: &[String]| match serde_json::from_str::<serde_json::Value>(&lines[0]) {
            Ok(info) => Some(info),
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::debug!("Tool printed a line that is not a JSON dump: {}", _e);
                None
            }
        };
        let Some(info) = self.run_until(&request, args, 1, decode).await? else {
            return Ok(None);
        };

        let record = record_from_info(&info);
        self.store(&key, &record);

        Ok(Some(record))
    }

    /// Fetches the direct URL of a page along with its subtitles in one format.
    ///
    /// # Arguments
    ///
    /// * `request` - The page to fetch.
    /// * `format` - The subtitle format, e.g. 'vtt'. Defaults to the fetcher's format.
    ///
    /// # Errors
    ///
    /// This function will return an error if the tool could not be run or reported an error.
    pub async fn fetch_video_with_subtitles(
        &self,
        request: impl Into<MediaRequest>,
        format: Option<&str>,
    ) -> Result<Option<VideoWithSubtitles>> {
        let request = request.into();
        let format = format.unwrap_or(&self.subtitle_format).to_string();

        #[cfg(feature = "tracing")]
        tracing::debug!("Fetching {} subtitles of {}", format, request);

        let schema = OutputSchema::subtitles();
        let mut args = schema.args();
        args.append(&mut utils::to_owned(vec![
            "-f",
            schema.format_selector(),
            SKIP_DASH,
            "--convert-subs",
            &format,
        ]));
        args.append(&mut request.selection_args(self.cookie_file.as_ref())?);
        args.push(request.page_url.clone());

        let Some(mut fields) = self.run_with_schema(&request, &schema, args).await? else {
            return Ok(None);
        };

        let subtitles = fields
            .get(Field::Subtitles)
            .map(|blob| caption::parse_subtitles(blob, &format))
            .unwrap_or_default();

        Ok(Some(VideoWithSubtitles {
            url: fields.take(Field::Url).unwrap_or_default(),
            subtitles,
        }))
    }

    /// Fetches the duration of a page in seconds, 0 when the tool prints none.
    ///
    /// # Errors
    ///
    /// This function will return an error if the tool could not be run or reported an error.
    pub async fn fetch_duration(&self, request: impl Into<MediaRequest>) -> Result<u64> {
        let request = request.into();

        let mut args = Field::Duration
            .args()
            .iter()
            .map(|arg| arg.to_string())
            .collect::<Vec<_>>();
        args.append(&mut request.selection_args(self.cookie_file.as_ref())?);
        args.push(request.page_url.clone());

        let lines = self.run_lines(&request, args).await?;
        let duration = lines.first().map(timestamp::timestamp_to_seconds).unwrap_or(0);

        #[cfg(feature = "tracing")]
        tracing::debug!("Duration of {} is {}s", request, duration);

        Ok(duration)
    }

    /// Runs the tool once and returns its non-empty output lines.
    async fn run_lines(&self, request: &MediaRequest, args: Vec<String>) -> Result<Vec<String>> {
        let mut final_args = self.args.clone();
        final_args.extend(args);

        let locale = request.locale.as_deref().unwrap_or(&self.locale);
        let invocation = Invocation::new(final_args).with_env("LC_ALL", locale);

        let output = self.runner.run(invocation).await?;
        Ok(utils::non_empty_lines(&output.stdout))
    }

    /// Runs the tool until it prints exactly `expected` lines that `decode` accepts,
    /// within the retry budget.
    ///
    /// Errors reported by the tool are returned at once and not retried.
    async fn run_until<T, F>(
        &self,
        request: &MediaRequest,
        args: Vec<String>,
        expected: usize,
        decode: F,
    ) -> Result<Option<T>>
    where
        F: Fn(&[String]) -> Option<T>,
    {
        let attempts = self.retry.max_attempts.max(1);

        for attempt in 1..=attempts {
            let lines = self.run_lines(request, args.clone()).await?;
            if lines.len() == expected {
                if let Some(decoded) = decode(&lines) {
                    return Ok(Some(decoded));
                }
            }

            #[cfg(feature = "tracing")]
            tracing::debug!(
                "Attempt {}/{} for {} printed {} unusable lines, expected {}",
                attempt,
                attempts,
                request,
                lines.len(),
                expected
            );

            if attempt < attempts {
                tokio::time::sleep(self.retry.delay).await;
            }
        }

        #[cfg(feature = "tracing")]
        tracing::warn!(
            "Giving up on {} after {} attempts without {} usable output lines",
            request,
            attempts,
            expected
        );

        Ok(None)
    }

    async fn run_with_schema(
        &self,
        request: &MediaRequest,
        schema: &OutputSchema,
        args: Vec<String>,
    ) -> Result<Option<FieldMap>> {
        self.run_until(request, args, schema.expected_lines(), |lines| {
            schema.map(lines).ok()
        })
        .await
    }

    fn cached(&self, key: &str) -> Option<MediaRecord> {
        let record = self.cache.as_ref()?.get(key)?;
        record.is_live_at(Utc::now()).then_some(record)
    }

    fn store(&self, key: &str, record: &MediaRecord) {
        let Some(cache) = &self.cache else {
            return;
        };

        match record.expires_at {
            Some(expires_at) if expires_at > Utc::now() => {
                if let Err(_e) = cache.put(key, record, expires_at) {
                    #[cfg(feature = "tracing")]
                    tracing::warn!("Failed to cache media record: {}", _e);
                }
            }
            _ => {
                #[cfg(feature = "tracing")]
                tracing::debug!("Not caching {}: no future expiry in its URL", record);
            }
        }
    }
}

fn record_from_fields(fields: &mut FieldMap) -> MediaRecord {
    MediaRecord {
        title: fields.take(Field::Title).unwrap_or_default(),
        id: fields.take(Field::Id).unwrap_or_default(),
        url: fields.take(Field::Url).unwrap_or_default(),
        audio_url: fields.take(Field::AudioUrl),
        ..Default::default()
    }
    .with_format(fields.take(Field::Format))
    .with_expiry_from_url()
}

fn record_from_info(info: &serde_json::Value) -> MediaRecord {
    let text = |value: &serde_json::Value| value.as_str().map(str::to_string);
    let dimension = |key: &str| info[key].as_u64().and_then(|v| u32::try_from(v).ok());

    let requested = info["requested_formats"].as_array();
    let (url, audio_url) = match requested {
        Some(formats) if formats.len() > 1 => (text(&formats[0]["url"]), text(&formats[1]["url"])),
        _ => (text(&info["url"]), None),
    };

    let mut record = MediaRecord {
        title: text(&info["title"]).unwrap_or_default(),
        id: text(&info["id"]).unwrap_or_default(),
        url: url.unwrap_or_default(),
        audio_url,
        ..Default::default()
    }
    .with_format(text(&info["format"]))
    .with_expiry_from_url();

    if record.width.is_none() {
        record.width = dimension("width");
        record.height = dimension("height");
    }

    record
}
