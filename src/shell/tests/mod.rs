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

//! Shell gateway tests
//!
//! These run against a plain `sh` instead of `su`, so the framing, timeout
//! and cancellation logic is exercised without root.

use std::{
    sync::{mpsc, Arc},
    thread,
    time::{Duration, Instant},
};

use crate::shell::{
    execute_async, quote, summarize, testing::ScriptedRunner, CancelToken, CommandRunner,
    OneShotShell, RunOptions, ShellCommand, ShellError, SuSession,
};

fn sh_session() -> SuSession {
    SuSession::new(ShellCommand::new("sh"), Duration::from_secs(10))
}

fn sh_oneshot() -> OneShotShell {
    OneShotShell::new(ShellCommand::new("sh"), Duration::from_secs(10))
}

#[test]
fn test_session_returns_trimmed_stdout() {
    let shell = sh_session();
    assert_eq!(shell.execute("echo '  hello  '").unwrap(), "hello");
}

#[test]
fn test_session_output_without_trailing_newline() {
    let shell = sh_session();
    let output = shell.run("printf 'no newline'").unwrap();
    assert_eq!(output.stdout, "no newline");
    assert!(output.success());
}

#[test]
fn test_session_reports_exit_status_and_stderr() {
    let shell = sh_session();
    let output = shell.run("echo oops >&2; exit 3").unwrap();

    assert_eq!(output.status, Some(3));
    assert_eq!(output.stderr, "oops");

    match shell.execute("echo bad >&2; false") {
        Err(ShellError::CommandFailed { code, stderr }) => {
            assert_eq!(code, Some(1));
            assert_eq!(stderr, "bad");
        }
        other => panic!("Expected CommandFailed, got {:?}", other),
    }
}

#[test]
fn test_session_is_reused_between_requests() {
    let shell = sh_session();
    let first = shell.execute("echo $$").unwrap();
    let second = shell.execute("echo $$").unwrap();
    assert_eq!(first, second, "Both requests should run in the same shell");
}

#[test]
fn test_session_commands_do_not_leak_state() {
    let shell = sh_session();
    shell.execute("cd /tmp; FOO=bar").unwrap();
    assert_eq!(shell.execute("echo \"x${FOO}x\"").unwrap(), "xx");
}

#[test]
fn test_session_commands_cannot_read_request_stream() {
    let shell = sh_session();
    assert_eq!(shell.execute("cat").unwrap(), "");
    assert_eq!(shell.execute("echo still-alive").unwrap(), "still-alive");
}

#[test]
fn test_session_timeout_kills_and_recovers() {
    let shell = sh_session();
    let options = RunOptions::default().with_timeout(Duration::from_millis(200));

    let started = Instant::now();
    let result = shell.run_with("sleep 5", &options);
    assert!(matches!(result, Err(ShellError::Timeout(_))), "Got {:?}", result);
    assert!(started.elapsed() < Duration::from_secs(4));

    assert_eq!(shell.execute("echo back").unwrap(), "back");
}

#[test]
fn test_session_cancellation() {
    let shell = Arc::new(sh_session());
    let cancel = CancelToken::new();

    let worker = {
        let shell = Arc::clone(&shell);
        let options = RunOptions::default().with_cancel(cancel.clone());
        thread::spawn(move || shell.run_with("sleep 5", &options))
    };

    thread::sleep(Duration::from_millis(200));
    cancel.cancel();

    let result = worker.join().unwrap();
    assert!(matches!(result, Err(ShellError::Cancelled)), "Got {:?}", result);
    assert_eq!(shell.execute("echo ok").unwrap(), "ok");
}

#[test]
fn test_session_recovers_after_shell_exit() {
    let shell = sh_session();
    shell.close();
    assert_eq!(shell.execute("echo fresh").unwrap(), "fresh");
}

#[test]
fn test_spawn_failure() {
    let shell = SuSession::new(
        ShellCommand::new("/nonexistent/kctrl-su"),
        Duration::from_secs(1),
    );
    assert!(matches!(shell.run("true"), Err(ShellError::Spawn { .. })));
}

#[test]
fn test_oneshot_runs_command() {
    let shell = sh_oneshot();
    assert_eq!(shell.execute("echo one; echo two").unwrap(), "one\ntwo");

    let output = shell.run("exit 7").unwrap();
    assert_eq!(output.status, Some(7));
}

#[test]
fn test_oneshot_timeout() {
    let shell = sh_oneshot();
    let options = RunOptions::default().with_timeout(Duration::from_millis(200));
    assert!(matches!(
        shell.run_with("sleep 5", &options),
        Err(ShellError::Timeout(_))
    ));
}

#[test]
fn test_oneshot_timeout_covers_inherited_output() {
    let shell = sh_oneshot();
    let options = RunOptions::default().with_timeout(Duration::from_millis(500));
    let started = Instant::now();

    // The shell exits at once but the background sleep keeps stdout open.
    let result = shell.run_with("sleep 5 & echo started", &options);

    assert!(matches!(result, Err(ShellError::Timeout(_))));
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[test]
fn test_execute_async_delivers_result() {
    let runner: Arc<dyn CommandRunner> = Arc::new(ScriptedRunner::new().on("whoami", "root"));
    let (tx, rx) = mpsc::channel();

    let handle = execute_async(runner, "whoami".to_string(), move |result| {
        tx.send(result.ok()).unwrap();
    });
    handle.join().unwrap();

    assert_eq!(rx.recv().unwrap(), Some("root".to_string()));
}

#[test]
fn test_quote_roundtrips_through_shell() {
    let shell = sh_session();
    let tricky = "it's a $(test) `x` \"y\"";
    assert_eq!(
        shell.execute(&format!("printf '%s' {}", quote(tricky))).unwrap(),
        tricky
    );
}

#[test]
fn test_summarize_truncates() {
    let long = "x".repeat(500);
    assert!(summarize(&long).len() < 130);
    assert_eq!(summarize("echo a\necho b"), "echo a...");
    assert_eq!(summarize("ls"), "ls");
}
