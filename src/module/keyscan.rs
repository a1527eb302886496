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

//! Key code detection with the module's `kfind` helper
//!
//! `kfind` waits for a key press and writes lines like
//! `[735] KEY_735 - EV_KEY (1)` to `kfind.txt`. The last such line is the
//! detected key.

use regex::Regex;
use std::{sync::Arc, thread, time::Duration};

use crate::{
    config::ModulePaths,
    module::ScanError,
    shell::{quote, CancelToken, CommandRunner, RunOptions},
};

const KFIND_LINE: &str = r"\[(\d+)\]\s+(\w+)";

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ScannedKey {
    pub code: u32,
    /// Name as reported by `kfind`
    pub name: String,
}

pub struct KeyScanner {
    runner: Arc<dyn CommandRunner>,
    paths: ModulePaths,
    timeout: Duration,
    settle: Duration,
}

impl KeyScanner {
    pub fn new(runner: Arc<dyn CommandRunner>, paths: ModulePaths) -> Self {
        Self {
            runner,
            paths,
            timeout: Duration::from_secs(30),
            settle: Duration::from_secs(2),
        }
    }

    /// How long to wait for a key press.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Delay between `kfind` returning and reading its result file.
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Checks that `kfind` exists and has its execute bit.
    pub fn check_tool(&self) -> Result<(), ScanError> {
        let tool = self.paths.kfind();
        let listing = self.runner.execute(&format!(
            "ls -la {} 2>/dev/null; true",
            quote(&tool.to_string_lossy())
        ))?;

        let mode = listing.split_whitespace().next().unwrap_or_default();
        if mode.is_empty() {
            return Err(ScanError::ToolMissing(tool));
        }
        if !matches!(mode.chars().nth(3), Some('x' | 's')) {
            return Err(ScanError::ToolNotExecutable(tool));
        }
        Ok(())
    }

    /// Runs `kfind` and waits for one key press.
    ///
    /// Stale `kfind` processes are killed and the old result file removed
    /// first, so a previous scan can never be read back.
    pub fn scan(&self, cancel: Option<CancelToken>) -> Result<ScannedKey, ScanError> {
        self.check_tool()?;

        let output_file = quote(&self.paths.kfind_output().to_string_lossy());
        self.runner.run("pkill -f kfind 2>/dev/null; true")?;
        self.runner.execute(&format!("rm -f {}", output_file))?;

        let mut options = RunOptions::default().with_timeout(self.timeout);
        if let Some(cancel) = cancel {
            options = options.with_cancel(cancel);
        }

        tracing::info!("Waiting for a key press");
        let run = self.runner.run_with(
            &format!(
                "cd {} && {}",
                quote(&self.paths.root().to_string_lossy()),
                quote(&self.paths.kfind().to_string_lossy())
            ),
            &options,
        )?;
        if !run.success() {
            tracing::debug!(status = ?run.status, stderr = %run.stderr, "kfind exited with an error");
        }

        if !self.settle.is_zero() {
            thread::sleep(self.settle);
        }

        let result = self.runner.run(&format!("cat {}", output_file))?;
        if !result.success() {
            return Err(ScanError::NoOutput);
        }

        let key = parse_kfind_output(&result.stdout)?;
        tracing::info!(code = key.code, name = %key.name, "Detected key");
        Ok(key)
    }
}

/// Parses the last non-empty line of `kfind.txt`.
///
/// ```
/// use kctrl_config::module::keyscan::parse_kfind_output;
///
/// let key = parse_kfind_output("[114] KEY_VOLUMEDOWN - EV_KEY (1)\n").unwrap();
/// assert_eq!(key.code, 114);
/// assert_eq!(key.name, "KEY_VOLUMEDOWN");
/// ```
pub fn parse_kfind_output(output: &str) -> Result<ScannedKey, ScanError> {
    let line = output
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .ok_or(ScanError::NoKeyDetected)?;

    let pattern = Regex::new(KFIND_LINE).map_err(|e| ScanError::Unparseable(e.to_string()))?;
    let captures = pattern
        .captures(line)
        .ok_or_else(|| ScanError::Unparseable(line.to_string()))?;

    let code = captures[1]
        .parse::<u32>()
        .map_err(|_| ScanError::Unparseable(line.to_string()))?;

    Ok(ScannedKey {
        code,
        name: captures[2].to_string(),
    })
}
