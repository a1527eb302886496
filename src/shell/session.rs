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

//! Long-lived privileged shell session
//!
//! A single `su` process serves every request. Each command runs in a
//! subshell with stdin redirected from `/dev/null`, followed by two marker
//! lines unique to the request: one on stdout carrying the exit status and
//! one on stderr. Reader threads forward output lines over a channel and the
//! caller collects them until both markers arrive.
//!
//! Requests are serialized by a mutex. When a command times out or is
//! cancelled the process is killed and the next request spawns a new one.

use std::{
    io::{BufRead, BufReader, Read, Write},
    process::{Child, ChildStdin, Command, Stdio},
    sync::{
        atomic::{AtomicU64, Ordering},
        mpsc::{self, Receiver, RecvTimeoutError, Sender},
        Mutex,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use crate::shell::{
    summarize, CommandRunner, Deadline, RunOptions, ShellCommand, ShellError, ShellOutput,
};

/// How often a waiting request checks its cancel token.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

enum StreamLine {
    Stdout(String),
    Stderr(String),
    Closed,
}

struct Session {
    child: Child,
    stdin: ChildStdin,
    lines: Receiver<StreamLine>,
    readers: Vec<JoinHandle<()>>,
}

impl Session {
    fn spawn(command: &ShellCommand) -> Result<Self, ShellError> {
        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ShellError::Spawn {
                program: command.program.clone(),
                source,
            })?;

        let (stdin, stdout, stderr) = match (child.stdin.take(), child.stdout.take(), child.stderr.take()) {
            (Some(stdin), Some(stdout), Some(stderr)) => (stdin, stdout, stderr),
            _ => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ShellError::SessionClosed);
            }
        };

        let (tx, lines) = mpsc::channel();
        let readers = vec![
            spawn_reader(stdout, tx.clone(), StreamLine::Stdout),
            spawn_reader(stderr, tx, StreamLine::Stderr),
        ];

        tracing::debug!(program = %command.program, pid = child.id(), "Privileged shell started");

        Ok(Self {
            child,
            stdin,
            lines,
            readers,
        })
    }

    fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    fn kill(mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        // Readers finish on their own once every holder of the pipes is gone.
        drop(self.readers);
    }
}

fn spawn_reader<R>(stream: R, tx: Sender<StreamLine>, wrap: fn(String) -> StreamLine) -> JoinHandle<()>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    if buf.ends_with(b"\n") {
                        buf.pop();
                    }
                    let line = String::from_utf8_lossy(&buf).into_owned();
                    if tx.send(wrap(line)).is_err() {
                        return;
                    }
                }
            }
        }
        let _ = tx.send(StreamLine::Closed);
    })
}

/// One privileged shell shared by every request.
pub struct SuSession {
    command: ShellCommand,
    default_timeout: Duration,
    inner: Mutex<Option<Session>>,
    next_id: AtomicU64,
}

impl SuSession {
    /// Creates a session. The shell is started by the first request.
    pub fn new(command: ShellCommand, default_timeout: Duration) -> Self {
        Self {
            command,
            default_timeout,
            inner: Mutex::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    /// Kills the shell process if one is running.
    pub fn close(&self) {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(session) = guard.take() {
            session.kill();
        }
    }

    fn marker(&self) -> String {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        format!("__KCTRL_{}_{}_DONE__", std::process::id(), id)
    }
}

impl Drop for SuSession {
    fn drop(&mut self) {
        self.close();
    }
}

impl CommandRunner for SuSession {
    fn run_with(&self, command: &str, options: &RunOptions) -> Result<ShellOutput, ShellError> {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(session) = guard.as_mut() {
            if !session.is_alive() {
                tracing::warn!("Privileged shell exited, restarting");
                if let Some(dead) = guard.take() {
                    dead.kill();
                }
            }
        }
        if guard.is_none() {
            *guard = Some(Session::spawn(&self.command)?);
        }

        let marker = self.marker();
        let deadline = Deadline::new(options.timeout.unwrap_or(self.default_timeout));
        tracing::debug!(command = %summarize(command), "Running privileged command");

        let result = match guard.as_mut() {
            Some(session) => exchange(session, command, &marker, &deadline, options),
            None => Err(ShellError::SessionClosed),
        };

        if let Err(e) = &result {
            if matches!(
                e,
                ShellError::Timeout(_) | ShellError::Cancelled | ShellError::SessionClosed | ShellError::Io(_)
            ) {
                tracing::warn!(error = %e, "Discarding privileged shell");
                if let Some(session) = guard.take() {
                    session.kill();
                }
            }
        }

        result
    }
}

fn exchange(
    session: &mut Session,
    command: &str,
    marker: &str,
    deadline: &Deadline,
    options: &RunOptions,
) -> Result<ShellOutput, ShellError> {
    let request = format!(
        "(\n{command}\n) </dev/null\n__kctrl_rc=$?\nprintf '\\n{marker} %d\\n' \"$__kctrl_rc\"\nprintf '\\n{marker}\\n' >&2\n"
    );
    session.stdin.write_all(request.as_bytes())?;
    session.stdin.flush()?;

    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let mut status = None;
    let mut stderr_done = false;

    while status.is_none() || !stderr_done {
        if options.is_cancelled() {
            return Err(ShellError::Cancelled);
        }
        let remaining = deadline.remaining().ok_or(ShellError::Timeout(deadline.timeout()))?;

        match session.lines.recv_timeout(remaining.min(POLL_INTERVAL)) {
            Ok(StreamLine::Stdout(line)) => match line.strip_prefix(marker) {
                Some(rest) => status = Some(rest.trim().parse::<i32>().ok()),
                None => stdout.push(line),
            },
            Ok(StreamLine::Stderr(line)) => {
                if line == marker {
                    stderr_done = true;
                } else {
                    stderr.push(line);
                }
            }
            Ok(StreamLine::Closed) | Err(RecvTimeoutError::Disconnected) => {
                return Err(ShellError::SessionClosed);
            }
            Err(RecvTimeoutError::Timeout) => {}
        }
    }

    Ok(ShellOutput {
        stdout: stdout.join("\n").trim().to_string(),
        stderr: stderr.join("\n").trim().to_string(),
        status: status.flatten(),
    })
}
