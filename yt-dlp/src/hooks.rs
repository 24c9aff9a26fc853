//! Observer callbacks for tool invocations.
//!
//! Both hooks are optional, an unset hook is a no-op.

use crate::utils::progress::Progress;
use std::fmt;
use std::sync::Arc;

/// The stream a chunk of tool output was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputChannel {
    /// The success channel.
    Stdout,
    /// The error channel.
    Stderr,
}

impl fmt::Display for OutputChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputChannel::Stdout => write!(f, "out"),
            OutputChannel::Stderr => write!(f, "err"),
        }
    }
}

/// Called with every line (stdout) or chunk (stderr) the tool writes.
pub type DebugHook = Arc<dyn Fn(OutputChannel, &str) + Send + Sync>;
/// Called with every progress line the tool writes.
pub type ProgressHook = Arc<dyn Fn(&Progress) + Send + Sync>;

/// The set of observer callbacks attached to a runner.
#[derive(Clone, Default)]
pub struct Hooks {
    debug: Option<DebugHook>,
    progress: Option<ProgressHook>,
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("debug", &self.debug.is_some())
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl Hooks {
    /// Sets the debug callback.
    pub fn on_debug<F>(mut self, callback: F) -> Self
    where
        F: Fn(OutputChannel, &str) + Send + Sync + 'static,
    {
        self.debug = Some(Arc::new(callback));
        self
    }

    /// Sets the progress callback.
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Progress) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(callback));
        self
    }

    pub(crate) fn debug(&self, channel: OutputChannel, buffer: &str) {
        if let Some(debug) = &self.debug {
            debug(channel, buffer);
        }
    }

    /// Forwards a stdout line to the progress callback if it is a progress line.
    pub(crate) fn line(&self, line: &str) {
        self.debug(OutputChannel::Stdout, line);

        if let Some(progress) = &self.progress {
            if let Some(parsed) = Progress::parse(line) {
                progress(&parsed);
            }
        }
    }
}
