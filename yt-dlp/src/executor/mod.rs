//! A tool for executing commands.
//!
//! Any data written to the error stream is fatal: the child is killed and the
//! call fails with [`Error::ToolRuntime`], whatever was written to stdout.

use crate::error::{Error, Result};
use crate::hooks::{Hooks, OutputChannel};
use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStderr};

/// Represents a command executor.
///
/// # Example
///
/// ```rust,no_run
/// # use yt_dlp_media::utils;
/// # use yt_dlp_media::executor::Executor;
/// # use std::path::PathBuf;
/// # use std::time::Duration;
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let executor = Executor {
///     executable_path: PathBuf::from("yt-dlp"),
///     interpreter_path: None,
///     env: vec![("LC_ALL".to_string(), "en_US.UTF-8".to_string())],
///     timeout: Duration::from_secs(30),
///     args: utils::to_owned(vec!["--version"]),
///     hooks: Default::default(),
/// };
///
/// let output = executor.execute().await?;
/// println!("Output: {}", output.stdout);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Executor {
    /// The path to the command executable.
    pub executable_path: PathBuf,
    /// The interpreter used to run the executable, if it is a script.
    pub interpreter_path: Option<PathBuf>,
    /// Extra environment variables for the process.
    pub env: Vec<(String, String)>,
    /// The timeout for the process.
    pub timeout: Duration,

    /// The arguments to pass to the command.
    pub args: Vec<String>,
    /// The observers of the process output.
    pub hooks: Hooks,
}

/// Represents the output of a process.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessOutput {
    /// The stdout of the process.
    pub stdout: String,
    /// The stderr of the process.
    pub stderr: String,
    /// The exit code of the process.
    pub code: i32,
}

enum Outcome {
    Exited(ExitStatus),
    Stderr(String),
}

impl Executor {
    /// Executes the command and returns the output.
    ///
    /// # Errors
    ///
    /// This function will return an error if the command could not be executed, if it wrote to
    /// its error stream, if it exited with a failure code, or if the process timed out.
    pub async fn execute(&self) -> Result<ProcessOutput> {
        #[cfg(feature = "tracing")]
        tracing::debug!("Executing command: {:?} {:?}", self.executable_path, self.args);

        let mut command = match &self.interpreter_path {
            Some(interpreter) => {
                let mut command = tokio::process::Command::new(interpreter);
                command.arg(&self.executable_path);
                command
            }
            None => tokio::process::Command::new(&self.executable_path),
        };

        command.stdin(Stdio::null());
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());
        command.kill_on_drop(true);
        command.envs(self.env.iter().map(|(key, value)| (key, value)));

        #[cfg(target_os = "windows")]
        {
            command.creation_flags(0x08000000);
        }

        command.args(&self.args);
        let mut child = command.spawn()?;

        let stdout_handle = child
            .stdout
            .take()
            .ok_or_else(|| Error::Command("Failed to capture stdout".to_string()))?;
        let mut stderr_handle = child
            .stderr
            .take()
            .ok_or_else(|| Error::Command("Failed to capture stderr".to_string()))?;

        // Drain stdout continuously so a large output never blocks the child.
        let hooks = self.hooks.clone();
        let mut stdout_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stdout_handle).lines();
            let mut buffer = String::new();
            while let Some(line) = lines.next_line().await? {
                hooks.line(&line);
                buffer.push_str(&line);
                buffer.push('\n');
            }
            Ok::<String, std::io::Error>(buffer)
        });

        let outcome =
            tokio::time::timeout(self.timeout, wait_or_stderr(&mut child, &mut stderr_handle)).await;

        let exit_status = match outcome {
            Ok(Ok(Outcome::Exited(status))) => status,
            Ok(Ok(Outcome::Stderr(stderr))) => {
                self.hooks.debug(OutputChannel::Stderr, &stderr);
                stop(&mut child).await;
                stdout_task.abort();

                #[cfg(feature = "tracing")]
                tracing::warn!("yt-dlp wrote to stderr: {}", stderr.trim());

                return Err(Error::ToolRuntime(stderr));
            }
            Ok(Err(e)) => {
                stop(&mut child).await;
                stdout_task.abort();
                return Err(e);
            }
            Err(_) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("Process timed out after {:?}, killing it", self.timeout);

                stop(&mut child).await;
                stdout_task.abort();
                return Err(Error::Timeout(self.timeout));
            }
        };

        // The child may exit before its stderr was read. A process it left behind
        // can hold both pipes open, so draining them is bounded too.
        let mut stderr = String::new();
        let drained =
            tokio::time::timeout(self.timeout, stderr_handle.read_to_string(&mut stderr)).await;
        match drained {
            Ok(read) => {
                read?;
            }
            Err(_) => {
                stdout_task.abort();
                return Err(Error::Timeout(self.timeout));
            }
        }

        if !stderr.is_empty() {
            self.hooks.debug(OutputChannel::Stderr, &stderr);
            stdout_task.abort();
            return Err(Error::ToolRuntime(stderr));
        }

        let stdout = match tokio::time::timeout(self.timeout, &mut stdout_task).await {
            Ok(Ok(Ok(buffer))) => buffer,
            Ok(Ok(Err(e))) => return Err(Error::IO(e)),
            Ok(Err(e)) => return Err(Error::Runtime(e)),
            Err(_) => {
                stdout_task.abort();
                return Err(Error::Timeout(self.timeout));
            }
        };

        let code = exit_status.code().unwrap_or(-1);
        if exit_status.success() {
            return Ok(ProcessOutput {
                stdout,
                stderr,
                code,
            });
        }

        Err(Error::Command(format!("Process failed with code {}", code)))
    }
}

/// Waits for the child to exit, or for the first chunk written to its error stream.
async fn wait_or_stderr(child: &mut Child, stderr: &mut ChildStderr) -> Result<Outcome> {
    let mut chunk = vec![0u8; 8 * 1024];
    let mut stderr_open = true;

    loop {
        tokio::select! {
            status = child.wait() => return Ok(Outcome::Exited(status?)),
            read = stderr.read(&mut chunk), if stderr_open => match read? {
                0 => stderr_open = false,
                n => return Ok(Outcome::Stderr(String::from_utf8_lossy(&chunk[..n]).into_owned())),
            },
        }
    }
}

async fn stop(child: &mut Child) {
    if let Err(_e) = child.kill().await {
        #[cfg(feature = "tracing")]
        tracing::error!("Failed to kill process: {}", _e);
    }
}

/// A single call of the tool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    /// The arguments, page URL included.
    pub args: Vec<String>,
    /// Environment overrides for this call only.
    pub env: Vec<(String, String)>,
}

impl Invocation {
    /// Creates an invocation without environment overrides.
    pub fn new(args: Vec<String>) -> Self {
        Self {
            args,
            env: Vec::new(),
        }
    }

    /// Adds an environment override.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

/// Something able to run the tool once and hand back its output.
#[async_trait]
pub trait ProcessRunner: fmt::Debug + Send + Sync {
    /// Runs the tool with the given invocation.
    async fn run(&self, invocation: Invocation) -> Result<ProcessOutput>;
}

/// The yt-dlp (or youtube-dl) binary.
#[derive(Debug, Clone)]
pub struct YtDlp {
    /// The path to the tool.
    pub binary_path: PathBuf,
    /// The interpreter used to run the tool, e.g. 'python3'.
    pub interpreter_path: Option<PathBuf>,
    /// The timeout of a single call.
    pub timeout: Duration,
    /// The observers of the tool output.
    pub hooks: Hooks,
}

impl fmt::Display for YtDlp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.interpreter_path {
            Some(interpreter) => write!(f, "{} {}", interpreter.display(), self.binary_path.display()),
            None => write!(f, "{}", self.binary_path.display()),
        }
    }
}

impl YtDlp {
    /// Creates a runner for the binary at the given path.
    pub fn new(binary_path: impl Into<PathBuf>) -> Self {
        Self {
            binary_path: binary_path.into(),
            interpreter_path: None,
            timeout: Duration::from_secs(30),
            hooks: Hooks::default(),
        }
    }

    /// Runs the tool through an interpreter.
    pub fn with_interpreter(mut self, interpreter_path: Option<PathBuf>) -> Self {
        self.interpreter_path = interpreter_path;
        self
    }

    /// Sets the timeout of a single call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the observers of the tool output.
    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }
}

#[async_trait]
impl ProcessRunner for YtDlp {
    async fn run(&self, invocation: Invocation) -> Result<ProcessOutput> {
        let executor = Executor {
            executable_path: self.binary_path.clone(),
            interpreter_path: self.interpreter_path.clone(),
            env: invocation.env,
            timeout: self.timeout,
            args: invocation.args,
            hooks: self.hooks.clone(),
        };

        executor.execute().await
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::utils;
    use std::sync::{Arc, Mutex};

    fn shell(script: &str) -> Executor {
        Executor {
            executable_path: PathBuf::from("sh"),
            interpreter_path: None,
            env: Vec::new(),
            timeout: Duration::from_secs(10),
            args: utils::to_owned(vec!["-c", script]),
            hooks: Hooks::default(),
        }
    }

    #[tokio::test]
    async fn captures_stdout() {
        let output = shell("echo Title; echo abc123").execute().await.unwrap();

        assert_eq!(output.stdout, "Title\nabc123\n");
        assert_eq!(output.code, 0);
    }

    #[tokio::test]
    async fn stderr_is_fatal_even_with_stdout() {
        let result = shell("echo https://x/video; echo 'ERROR: unavailable' >&2").execute().await;

        match result {
            Err(Error::ToolRuntime(stderr)) => assert!(stderr.contains("ERROR: unavailable")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn stderr_aborts_before_exit() {
        let mut executor = shell("echo 'WARNING: slow' >&2; sleep 5; echo late");
        executor.timeout = Duration::from_secs(3);

        let result = executor.execute().await;
        assert!(matches!(result, Err(Error::ToolRuntime(_))));
    }

    #[tokio::test]
    async fn failure_code_without_stderr() {
        let result = shell("exit 3").execute().await;
        assert!(matches!(result, Err(Error::Command(message)) if message.contains('3')));
    }

    #[tokio::test]
    async fn times_out() {
        let mut executor = shell("sleep 5");
        executor.timeout = Duration::from_millis(100);

        let result = executor.execute().await;
        assert!(matches!(result, Err(Error::Timeout(_))));
    }

    #[tokio::test]
    async fn leftover_process_holding_stderr_times_out() {
        let mut executor = shell("(sleep 5 >/dev/null) & echo done");
        executor.timeout = Duration::from_millis(300);

        let result = executor.execute().await;
        assert!(matches!(result, Err(Error::Timeout(_))));
    }

    #[tokio::test]
    async fn leftover_process_holding_stdout_times_out() {
        let mut executor = shell("(sleep 5 2>/dev/null) & echo done");
        executor.timeout = Duration::from_millis(300);

        let result = executor.execute().await;
        assert!(matches!(result, Err(Error::Timeout(_))));
    }

    #[tokio::test]
    async fn passes_environment() {
        let mut executor = shell("echo $LC_ALL");
        executor.env = vec![("LC_ALL".to_string(), "C.UTF-8".to_string())];

        let output = executor.execute().await.unwrap();
        assert_eq!(output.stdout.trim(), "C.UTF-8");
    }

    #[tokio::test]
    async fn runs_through_interpreter() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake-ytdlp");
        std::fs::write(&script, "echo \"$@\"\n").unwrap();

        let runner = YtDlp::new(&script).with_interpreter(Some(PathBuf::from("sh")));
        let output = runner
            .run(Invocation::new(utils::to_owned(vec!["-g", "https://x/watch"])))
            .await
            .unwrap();

        assert_eq!(output.stdout, "-g https://x/watch\n");
    }

    #[tokio::test]
    async fn hooks_see_stdout_lines() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mut executor = shell("echo one; echo two");
        executor.hooks = Hooks::default().on_debug(move |_, line| sink.lock().unwrap().push(line.to_string()));

        executor.execute().await.unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["one", "two"]);
    }
}
