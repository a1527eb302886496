// Copyright 2025 bakri (tidynest@proton.me)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Privileged command gateway
//!
//! Every read and write of the module directory ends up as a shell command
//! run with root privileges. This module defines the [`CommandRunner`]
//! contract and two implementations:
//! - [`SuSession`]: one long-lived `su` process, requests framed by markers
//! - [`OneShotShell`]: a fresh `su` process per command
//!
//! Both honour a timeout and a [`CancelToken`]. A command that does not
//! finish in time gets its shell killed instead of leaving a thread stuck.
//!
//! # Example
//! ```no_run
//! use kctrl_config::shell::{CommandRunner, ShellCommand, SuSession};
//! use std::time::Duration;
//!
//! let shell = SuSession::new(ShellCommand::default(), Duration::from_secs(30));
//! let pid = shell.execute("cat /data/adb/modules/kctrl/mpid.txt")?;
//! println!("service pid: {}", pid);
//! # Ok::<(), kctrl_config::shell::ShellError>(())
//! ```

pub mod oneshot;
pub mod session;

#[cfg(test)]
pub mod testing;

pub use oneshot::OneShotShell;
pub use session::SuSession;

use serde::Deserialize;
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};
use thiserror::Error;

/// Longest command prefix written to the log.
const LOG_SUMMARY_LEN: usize = 120;

/// Errors returned by a [`CommandRunner`].
#[derive(Debug, Error)]
pub enum ShellError {
    /// The shell program could not be started.
    #[error("Failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Talking to the shell process failed.
    #[error("Shell I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The command did not finish in time. The shell was killed.
    #[error("Command timed out after {0:?}")]
    Timeout(Duration),

    /// The caller cancelled the command. The shell was killed.
    #[error("Command cancelled")]
    Cancelled,

    /// The shell exited while a command was in flight.
    #[error("Privileged shell exited unexpectedly")]
    SessionClosed,

    /// The command ran and exited non-zero.
    #[error("Command failed (exit {code:?}): {stderr}")]
    CommandFailed { code: Option<i32>, stderr: String },
}

/// Program and arguments used to obtain a privileged shell.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct ShellCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ShellCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }
}

impl Default for ShellCommand {
    fn default() -> Self {
        Self::new("su")
    }
}

/// Captured result of one command.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ShellOutput {
    /// Standard output, trimmed
    pub stdout: String,
    /// Standard error, trimmed
    pub stderr: String,
    /// Exit status, `None` when the process was killed by a signal
    pub status: Option<i32>,
}

impl ShellOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Converts a non-zero exit into [`ShellError::CommandFailed`].
    pub fn into_result(self) -> Result<String, ShellError> {
        if self.success() {
            Ok(self.stdout)
        } else {
            Err(ShellError::CommandFailed {
                code: self.status,
                stderr: self.stderr,
            })
        }
    }
}

/// Shared flag that aborts an in-flight command.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-call limits.
#[derive(Clone, Debug, Default)]
pub struct RunOptions {
    /// Overrides the runner's default timeout
    pub timeout: Option<Duration>,
    pub cancel: Option<CancelToken>,
}

impl RunOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }
}

/// Deadline bookkeeping shared by the runners.
pub(crate) struct Deadline {
    timeout: Duration,
    until: Instant,
}

impl Deadline {
    pub(crate) fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            until: Instant::now() + timeout,
        }
    }

    pub(crate) fn remaining(&self) -> Option<Duration> {
        self.until
            .checked_duration_since(Instant::now())
            .filter(|d| !d.is_zero())
    }

    pub(crate) fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Executes shell commands with root privileges.
pub trait CommandRunner: Send + Sync {
    /// Runs `command` and captures its output. A non-zero exit is not an error here.
    fn run_with(&self, command: &str, options: &RunOptions) -> Result<ShellOutput, ShellError>;

    fn run(&self, command: &str) -> Result<ShellOutput, ShellError> {
        self.run_with(command, &RunOptions::default())
    }

    /// Runs `command` and returns its trimmed stdout.
    ///
    /// # Errors
    ///
    /// Returns `ShellError::CommandFailed` with the stderr text when the
    /// command exits non-zero, and the runner's own errors otherwise.
    fn execute(&self, command: &str) -> Result<String, ShellError> {
        self.run(command)?.into_result()
    }
}

impl<T: CommandRunner + ?Sized> CommandRunner for Arc<T> {
    fn run_with(&self, command: &str, options: &RunOptions) -> Result<ShellOutput, ShellError> {
        (**self).run_with(command, options)
    }
}

/// Runs `command` on a background thread and hands the result to `callback`.
pub fn execute_async<F>(runner: Arc<dyn CommandRunner>, command: String, callback: F) -> JoinHandle<()>
where
    F: FnOnce(Result<String, ShellError>) + Send + 'static,
{
    thread::spawn(move || callback(runner.execute(&command)))
}

/// Quotes `value` for safe use as a single shell word.
///
/// ```
/// use kctrl_config::shell::quote;
///
/// assert_eq!(quote("/data/adb/modules/kctrl"), "'/data/adb/modules/kctrl'");
/// assert_eq!(quote("it's"), r"'it'\''s'");
/// ```
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Shortened command text for log lines.
pub(crate) fn summarize(command: &str) -> String {
    let first_line = command.lines().next().unwrap_or_default();
    match first_line.char_indices().nth(LOG_SUMMARY_LEN) {
        Some((idx, _)) => format!("{}...", &first_line[..idx]),
        None if command.contains('\n') => format!("{}...", first_line),
        None => first_line.to_string(),
    }
}

#[cfg(test)]
mod tests;
