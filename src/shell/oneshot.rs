// Copyright 2025 Eric Jingryd (tidynest@proton.me)
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

//! Process-per-command privileged shell
//!
//! Writes the command followed by `exit` to a fresh shell and collects its
//! output. Slower than [`SuSession`](crate::shell::SuSession) but keeps no
//! state between commands.

use std::{
    io::{Read, Write},
    process::{Command, Stdio},
    sync::mpsc::{self, Receiver, RecvTimeoutError},
    thread,
    time::Duration,
};

use crate::shell::{
    summarize, CommandRunner, Deadline, RunOptions, ShellCommand, ShellError, ShellOutput,
};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

pub struct OneShotShell {
    command: ShellCommand,
    default_timeout: Duration,
}

impl OneShotShell {
    pub fn new(command: ShellCommand, default_timeout: Duration) -> Self {
        Self {
            command,
            default_timeout,
        }
    }
}

fn collect<R: Read + Send + 'static>(stream: Option<R>) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut stream) = stream {
            let _ = stream.read_to_end(&mut buf);
        }
        let _ = tx.send(buf);
    });
    rx
}

/// Waits for a collected stream within the deadline.
///
/// A background process started by the command can hold the pipe open after
/// the shell exits, so the reader thread is abandoned once time runs out.
fn drain(output: &Receiver<Vec<u8>>, deadline: &Deadline) -> Result<Vec<u8>, ShellError> {
    let remaining = deadline
        .remaining()
        .ok_or(ShellError::Timeout(deadline.timeout()))?;
    match output.recv_timeout(remaining) {
        Ok(buf) => Ok(buf),
        Err(RecvTimeoutError::Timeout) => Err(ShellError::Timeout(deadline.timeout())),
        Err(RecvTimeoutError::Disconnected) => Ok(Vec::new()),
    }
}

impl CommandRunner for OneShotShell {
    fn run_with(&self, command: &str, options: &RunOptions) -> Result<ShellOutput, ShellError> {
        tracing::debug!(command = %summarize(command), "Running one-shot privileged command");

        let mut child = Command::new(&self.command.program)
            .args(&self.command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ShellError::Spawn {
                program: self.command.program.clone(),
                source,
            })?;

        let deadline = Deadline::new(options.timeout.unwrap_or(self.default_timeout));
        let stdout = collect(child.stdout.take());
        let stderr = collect(child.stderr.take());

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(format!("{}\nexit\n", command).as_bytes()) {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ShellError::Io(e));
            }
        }

        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }

            let failure = if options.is_cancelled() {
                Some(ShellError::Cancelled)
            } else if deadline.remaining().is_none() {
                Some(ShellError::Timeout(deadline.timeout()))
            } else {
                None
            };

            if let Some(failure) = failure {
                tracing::warn!(error = %failure, "Killing one-shot privileged shell");
                let _ = child.kill();
                let _ = child.wait();
                return Err(failure);
            }

            thread::sleep(POLL_INTERVAL);
        };

        let stdout = drain(&stdout, &deadline).inspect_err(|e| {
            tracing::warn!(error = %e, "One-shot output still open after exit");
        })?;
        let stderr = drain(&stderr, &deadline)?;

        Ok(ShellOutput {
            stdout: String::from_utf8_lossy(&stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
            status: status.code(),
        })
    }
}
