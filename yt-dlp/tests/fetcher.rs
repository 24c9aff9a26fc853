use async_trait::async_trait;
use chrono::Utc;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use yt_dlp_media::cache::{CacheStore, MemoryCache, cache_key};
use yt_dlp_media::executor::{Invocation, ProcessOutput, ProcessRunner};
use yt_dlp_media::model::schema::OutputSchema;
use yt_dlp_media::{Error, MediaFetcher, MediaRequest, Result, RetryPolicy};

const PAGE: &str = "https://www.youtube.com/watch?v=abc123";

/// Replays canned tool output, one entry per call.
#[derive(Debug, Default)]
struct ScriptedRunner {
    outputs: Mutex<VecDeque<std::result::Result<String, String>>>,
    invocations: Mutex<Vec<Invocation>>,
}

impl ScriptedRunner {
    fn new(outputs: Vec<std::result::Result<&str, &str>>) -> Arc<Self> {
        let outputs = outputs
            .into_iter()
            .map(|output| output.map(str::to_string).map_err(str::to_string))
            .collect();

        Arc::new(Self {
            outputs: Mutex::new(outputs),
            invocations: Mutex::new(Vec::new()),
        })
    }

    fn stdout(outputs: Vec<&str>) -> Arc<Self> {
        Self::new(outputs.into_iter().map(Ok).collect())
    }

    fn calls(&self) -> usize {
        self.invocations.lock().unwrap().len()
    }

    fn invocation(&self, index: usize) -> Invocation {
        self.invocations.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl ProcessRunner for ScriptedRunner {
    async fn run(&self, invocation: Invocation) -> Result<ProcessOutput> {
        self.invocations.lock().unwrap().push(invocation);

        match self.outputs.lock().unwrap().pop_front() {
            Some(Ok(stdout)) => Ok(ProcessOutput {
                stdout,
                stderr: String::new(),
                code: 0,
            }),
            Some(Err(stderr)) => Err(Error::ToolRuntime(stderr)),
            None => Ok(ProcessOutput {
                stdout: String::new(),
                stderr: String::new(),
                code: 0,
            }),
        }
    }
}

fn fetcher(runner: Arc<ScriptedRunner>) -> MediaFetcher {
    let mut fetcher = MediaFetcher::with_runner(runner);
    fetcher.with_retry_policy(RetryPolicy::new(5, Duration::ZERO));
    fetcher
}

fn future_expiry() -> i64 {
    Utc::now().timestamp() + 3600
}

#[tokio::test]
async fn direct_url_is_first_line() {
    let runner = ScriptedRunner::stdout(vec!["\nhttps://x/video\nhttps://x/other\n"]);
    let fetcher = fetcher(runner.clone());

    let url = fetcher.fetch_direct_url(PAGE).await.unwrap();

    assert_eq!(url.as_deref(), Some("https://x/video"));
    assert_eq!(
        runner.invocation(0).args,
        vec!["--youtube-skip-dash-manifest", "-f", "best", "-g", PAGE]
    );
}

#[tokio::test]
async fn direct_url_of_empty_output_is_none() {
    let runner = ScriptedRunner::stdout(vec![""]);
    let url = fetcher(runner.clone()).fetch_direct_url(PAGE).await.unwrap();

    assert_eq!(url, None);
    assert_eq!(runner.calls(), 1);
}

#[tokio::test]
async fn direct_urls_returns_every_stream() {
    let runner = ScriptedRunner::stdout(vec!["https://x/v\nhttps://x/a\n"]);
    let urls = fetcher(runner).fetch_direct_urls(PAGE).await.unwrap();

    assert_eq!(urls, vec!["https://x/v", "https://x/a"]);
}

#[tokio::test]
async fn media_record_is_cached_until_url_expiry() {
    let expire = future_expiry();
    let output = format!("Title\nabc123\nhttps://x/video?expire={}\n", expire);
    let runner = ScriptedRunner::stdout(vec![output.as_str()]);
    let cache = Arc::new(MemoryCache::new());

    let mut fetcher = fetcher(runner.clone());
    fetcher.with_record_schema(OutputSchema::basic());
    fetcher.with_cache(cache.clone());

    let record = fetcher.fetch_media_record(PAGE).await.unwrap().unwrap();
    assert_eq!(record.title, "Title");
    assert_eq!(record.id, "abc123");
    assert_eq!(record.url, format!("https://x/video?expire={}", expire));
    assert_eq!(record.expires_at.map(|e| e.timestamp()), Some(expire));

    let cached = cache.get(&cache_key(PAGE)).unwrap();
    assert_eq!(cached.expires_at.map(|e| e.timestamp()), Some(expire));

    let again = fetcher.fetch_media_record(PAGE).await.unwrap().unwrap();
    assert_eq!(again, record);
    assert_eq!(runner.calls(), 1);
}

#[tokio::test]
async fn media_record_without_expiry_is_not_cached() {
    let runner = ScriptedRunner::stdout(vec![
        "Title\nabc123\nhttps://x/video\n18 - 640x360 (360p)\n",
        "Title\nabc123\nhttps://x/video\n18 - 640x360 (360p)\n",
    ]);
    let cache = Arc::new(MemoryCache::new());
    let mut fetcher = fetcher(runner.clone());
    fetcher.with_cache(cache.clone());

    let record = fetcher.fetch_media_record(PAGE).await.unwrap().unwrap();
    assert_eq!(record.format.as_deref(), Some("18 - 640x360 (360p)"));
    assert_eq!((record.width, record.height), (Some(640), Some(360)));

    fetcher.fetch_media_record(PAGE).await.unwrap();
    assert!(cache.is_empty());
    assert_eq!(runner.calls(), 2);
}

#[tokio::test]
async fn media_record_with_past_expiry_is_not_cached() {
    let output = format!("Title\nabc123\nhttps://x/video?expire={}\n", Utc::now().timestamp() - 10);
    let runner = ScriptedRunner::stdout(vec![output.as_str()]);
    let cache = Arc::new(MemoryCache::new());
    let mut fetcher = fetcher(runner);
    fetcher.with_record_schema(OutputSchema::basic());
    fetcher.with_cache(cache.clone());

    assert!(fetcher.fetch_media_record(PAGE).await.unwrap().is_some());
    assert!(cache.is_empty());
}

#[tokio::test]
async fn retries_until_line_count_matches() {
    let runner = ScriptedRunner::stdout(vec![
        "Title\n",
        "WARNING: x\nTitle\nabc123\nhttps://x/video\n",
        "",
        "Title\nabc123\n",
        "Title\nabc123\nhttps://x/fifth\n",
    ]);
    let mut fetcher = fetcher(runner.clone());
    fetcher.with_record_schema(OutputSchema::basic());

    let record = fetcher.fetch_media_record(PAGE).await.unwrap().unwrap();

    assert_eq!(record.url, "https://x/fifth");
    assert_eq!(runner.calls(), 5);
}

#[tokio::test]
async fn gives_up_after_budget() {
    let runner = ScriptedRunner::stdout(vec!["Title\n"; 7]);
    let mut fetcher = fetcher(runner.clone());
    fetcher.with_record_schema(OutputSchema::basic());

    let record = fetcher.fetch_media_record(PAGE).await.unwrap();

    assert_eq!(record, None);
    assert_eq!(runner.calls(), 5);
}

#[tokio::test]
async fn tool_errors_are_not_retried() {
    let runner = ScriptedRunner::new(vec![Err("ERROR: Video unavailable"), Ok("Title\nabc123\nhttps://x/v\n")]);
    let mut fetcher = fetcher(runner.clone());
    fetcher.with_record_schema(OutputSchema::basic());

    let result = fetcher.fetch_media_record(PAGE).await;

    assert!(matches!(result, Err(Error::ToolRuntime(message)) if message.contains("unavailable")));
    assert_eq!(runner.calls(), 1);
}

#[tokio::test]
async fn record_args_carry_cookies_playlist_and_locale() {
    let runner = ScriptedRunner::stdout(vec!["Title\nabc123\nhttps://x/v\n18 - 640x360\n"]);
    let mut fetcher = fetcher(runner.clone());
    fetcher.with_cookie_file(Some("/tmp/cookies.txt".into()));
    fetcher.with_locale("de_DE.UTF-8");

    let request = MediaRequest::new(format!("{}&list=PL1&index=3", PAGE)).with_locale("C.UTF-8");
    fetcher.fetch_media_record(request).await.unwrap();

    let invocation = runner.invocation(0);
    assert_eq!(
        invocation.args,
        vec![
            "--get-title",
            "--get-id",
            "-g",
            "--get-format",
            "--youtube-skip-dash-manifest",
            "--youtube-skip-hls-manifest",
            "-f",
            "best",
            "--cookies",
            "/tmp/cookies.txt",
            "--playlist-items",
            "3",
            "https://www.youtube.com/watch?v=abc123&list=PL1&index=3",
        ]
    );
    assert_eq!(invocation.env, vec![("LC_ALL".to_string(), "C.UTF-8".to_string())]);
}

#[tokio::test]
async fn default_locale_is_set() {
    let runner = ScriptedRunner::stdout(vec!["3:25\n"]);
    let duration = fetcher(runner.clone()).fetch_duration(PAGE).await.unwrap();

    assert_eq!(duration, 205);
    assert_eq!(
        runner.invocation(0).env,
        vec![("LC_ALL".to_string(), "en_US.UTF-8".to_string())]
    );
    assert_eq!(runner.invocation(0).args, vec!["--get-duration", PAGE]);
}

#[tokio::test]
async fn duration_of_empty_output_is_zero() {
    let runner = ScriptedRunner::stdout(vec![""]);
    assert_eq!(fetcher(runner).fetch_duration(PAGE).await.unwrap(), 0);
}

#[tokio::test]
async fn subtitles_are_filtered_to_format() {
    let runner = ScriptedRunner::stdout(vec![
        "{'en': [{'ext': 'vtt', 'url': 'u1', 'name': 'English'}], 'de': [{'ext': 'srv3', 'url': 'u2'}], 'it': [{'ext': 'json3', 'url': 'u3'}, {'ext': 'vtt', 'url': 'u4', 'name': 'L\\'italiano'}]}\nhttps://x/video\n",
    ]);
    let fetcher = fetcher(runner.clone());

    let video = fetcher.fetch_video_with_subtitles(PAGE, None).await.unwrap().unwrap();

    assert_eq!(video.url, "https://x/video");
    let languages: Vec<_> = video.subtitles.iter().map(|s| s.language.as_str()).collect();
    assert_eq!(languages, vec!["en", "it"]);
    assert_eq!(video.subtitles[1].name.as_deref(), Some("L'italiano"));
    assert_eq!(video.subtitles[1].url, "u4");

    let args = runner.invocation(0).args;
    assert_eq!(&args[..3], &["--print", "%(subtitles)s", "-g"]);
    assert!(args.windows(2).any(|w| w[0] == "--convert-subs" && w[1] == "vtt"));
}

#[tokio::test]
async fn unreadable_subtitles_leave_the_url() {
    let runner = ScriptedRunner::stdout(vec!["NA\nhttps://x/video\n"]);
    let video = fetcher(runner)
        .fetch_video_with_subtitles(PAGE, Some("srt"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(video.url, "https://x/video");
    assert!(video.subtitles.is_empty());
}

#[tokio::test]
async fn subtitles_give_up_without_two_lines() {
    let runner = ScriptedRunner::stdout(vec!["https://x/video\n"; 5]);
    let video = fetcher(runner.clone()).fetch_video_with_subtitles(PAGE, None).await.unwrap();

    assert_eq!(video, None);
    assert_eq!(runner.calls(), 5);
}

#[tokio::test]
async fn json_mode_reads_dump() {
    let expire = future_expiry();
    let dump = format!(
        r#"{{"title": "Title", "id": "abc123", "url": "https://x/v?expire={}", "format": "22 - 1280x720 (720p)"}}"#,
        expire
    );
    let runner = ScriptedRunner::stdout(vec![dump.as_str()]);
    let mut fetcher = fetcher(runner.clone());
    fetcher.with_cache(Arc::new(MemoryCache::new()));

    let record = fetcher.fetch_media_record_json(PAGE).await.unwrap().unwrap();

    assert_eq!(record.id, "abc123");
    assert_eq!((record.width, record.height), (Some(1280), Some(720)));
    assert_eq!(runner.invocation(0).args[0], "-j");

    // Served from the cache shared with the line mode.
    let again = fetcher.fetch_media_record(PAGE).await.unwrap().unwrap();
    assert_eq!(again, record);
    assert_eq!(runner.calls(), 1);
}

#[tokio::test]
async fn json_mode_retries_a_line_that_is_not_json() {
    let dump = r#"{"title": "Title", "id": "abc123", "url": "https://x/v"}"#;
    let runner = ScriptedRunner::stdout(vec!["WARNING: not json\n", dump]);

    let record = fetcher(runner.clone())
        .fetch_media_record_json(PAGE)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(record.id, "abc123");
    assert_eq!(runner.calls(), 2);
}

#[tokio::test]
async fn json_mode_gives_up_without_a_dump() {
    let runner = ScriptedRunner::stdout(vec!["WARNING: not json"; 5]);

    let record = fetcher(runner.clone()).fetch_media_record_json(PAGE).await.unwrap();

    assert_eq!(record, None);
    assert_eq!(runner.calls(), 5);
}

#[tokio::test]
async fn extra_args_come_first() {
    let runner = ScriptedRunner::stdout(vec!["https://x/v\n"]);
    let mut fetcher = fetcher(runner.clone());
    fetcher.with_arg("--no-warnings");

    fetcher.fetch_direct_urls(PAGE).await.unwrap();

    assert_eq!(runner.invocation(0).args[0], "--no-warnings");
}
