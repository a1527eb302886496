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

//! KCtrl service control
//!
//! The service writes its PID to `mpid.txt`. Stopping it is deliberately
//! heavy-handed: the recorded PID gets TERM then KILL, every process named
//! `kctrl` is killed, and anything still alive after a pause is killed
//! with signal 9.

use chrono::Local;
use std::{collections::BTreeMap, fmt, path::PathBuf, sync::Arc, thread, time::Duration};
use thiserror::Error;

use crate::{
    config::ModulePaths,
    shell::{quote, CommandRunner, ShellError},
    store::{AccessMode, StoreError},
};

/// Log lines included in a log report.
pub const LOG_REPORT_TAIL: usize = 1000;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Shell(#[from] ShellError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("KCtrl module is not installed at {0}")]
    NotInstalled(PathBuf),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ServiceStatus {
    Running(u32),
    Stopped,
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceStatus::Running(pid) => write!(f, "running (pid {})", pid),
            ServiceStatus::Stopped => write!(f, "stopped"),
        }
    }
}

/// Properties from `module.prop`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ModuleInfo {
    pub properties: BTreeMap<String, String>,
}

impl ModuleInfo {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn name(&self) -> Option<&str> {
        self.get("name")
    }

    pub fn version(&self) -> Option<&str> {
        self.get("version")
    }

    pub fn version_code(&self) -> Option<&str> {
        self.get("versionCode")
    }

    pub fn author(&self) -> Option<&str> {
        self.get("author")
    }
}

/// `key=value` lines, split on the first `=`. Other lines are ignored.
pub fn parse_module_prop(content: &str) -> ModuleInfo {
    let properties = content
        .lines()
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .filter(|(key, _)| !key.is_empty())
        .collect();
    ModuleInfo { properties }
}

pub struct ServiceController {
    runner: Arc<dyn CommandRunner>,
    paths: ModulePaths,
    mode: AccessMode,
    stop_grace: Duration,
    restart_delay: Duration,
}

impl ServiceController {
    pub fn new(runner: Arc<dyn CommandRunner>, paths: ModulePaths) -> Self {
        Self {
            runner,
            paths,
            mode: AccessMode::Live,
            stop_grace: Duration::from_secs(1),
            restart_delay: Duration::from_secs(2),
        }
    }

    pub fn with_mode(mut self, mode: AccessMode) -> Self {
        self.mode = mode;
        self
    }

    /// Pauses used by `stop` (before checking for survivors) and `restart`.
    pub fn with_delays(mut self, stop_grace: Duration, restart_delay: Duration) -> Self {
        self.stop_grace = stop_grace;
        self.restart_delay = restart_delay;
        self
    }

    fn path_arg(path: PathBuf) -> String {
        quote(&path.to_string_lossy())
    }

    fn pause(duration: Duration) {
        if !duration.is_zero() {
            thread::sleep(duration);
        }
    }

    pub fn is_installed(&self) -> Result<bool, ServiceError> {
        let output = self.runner.execute(&format!(
            "test -d {} && echo installed || echo ''",
            Self::path_arg(self.paths.root().to_path_buf())
        ))?;
        Ok(output == "installed")
    }

    /// Recorded PID, if the file holds a number.
    fn recorded_pid(&self) -> Result<Option<u32>, ServiceError> {
        let pid_file = Self::path_arg(self.paths.pid_file());
        let output = self
            .runner
            .execute(&format!("test -f {p} && cat {p} || echo ''", p = pid_file))?;
        if output.is_empty() {
            return Ok(None);
        }
        match output.parse::<u32>() {
            Ok(pid) => Ok(Some(pid)),
            Err(_) => {
                tracing::warn!(content = %output, "PID file does not hold a number");
                Ok(None)
            }
        }
    }

    /// Running when the PID file names a live process.
    pub fn status(&self) -> Result<ServiceStatus, ServiceError> {
        let Some(pid) = self.recorded_pid()? else {
            return Ok(ServiceStatus::Stopped);
        };
        let alive = self
            .runner
            .execute(&format!("ps -p {} -o pid= 2>/dev/null || echo ''", pid))?;
        Ok(if alive.is_empty() {
            ServiceStatus::Stopped
        } else {
            ServiceStatus::Running(pid)
        })
    }

    pub fn module_info(&self) -> Result<ModuleInfo, ServiceError> {
        let content = self.runner.execute(&format!(
            "cat {} 2>/dev/null; true",
            Self::path_arg(self.paths.module_prop())
        ))?;
        Ok(parse_module_prop(&content))
    }

    /// Stops the service and removes its PID file.
    pub fn stop(&self) -> Result<(), ServiceError> {
        if !self.mode.permits("stop the KCtrl service")? {
            return Ok(());
        }

        if let Some(pid) = self.recorded_pid()? {
            tracing::debug!(pid, "Signalling recorded service PID");
            self.runner.execute(&format!(
                "kill -TERM {pid} 2>/dev/null || kill -KILL {pid} 2>/dev/null; true"
            ))?;
        }
        self.runner
            .execute("pkill -x kctrl 2>/dev/null || killall -x kctrl 2>/dev/null || true")?;

        Self::pause(self.stop_grace);

        let survivors = self.runner.execute("pgrep -x kctrl 2>/dev/null || true")?;
        if !survivors.is_empty() {
            tracing::warn!(pids = %survivors.replace('\n', ","), "Force killing remaining kctrl processes");
            self.runner.execute(
                "pkill -9 -x kctrl 2>/dev/null || killall -9 -x kctrl 2>/dev/null || true",
            )?;
        }

        self.runner
            .execute(&format!("rm -f {}", Self::path_arg(self.paths.pid_file())))?;
        tracing::info!("KCtrl service stopped");
        Ok(())
    }

    /// Starts the service through the module's `service.sh`.
    pub fn start(&self) -> Result<(), ServiceError> {
        if !self.is_installed()? {
            return Err(ServiceError::NotInstalled(self.paths.root().to_path_buf()));
        }
        if !self.mode.permits("start the KCtrl service")? {
            return Ok(());
        }

        self.runner.execute(&format!(
            "cd {} && chmod 755 service.sh && sh service.sh >/dev/null 2>&1",
            Self::path_arg(self.paths.root().to_path_buf())
        ))?;
        tracing::info!("KCtrl service started");
        Ok(())
    }

    pub fn restart(&self) -> Result<(), ServiceError> {
        self.stop()?;
        Self::pause(self.restart_delay);
        self.start()
    }

    /// Text report of log settings, the config and the end of the service log.
    pub fn log_report(&self) -> Result<String, ServiceError> {
        let config_file = Self::path_arg(self.paths.config_file());
        let log_file = Self::path_arg(self.paths.log_file());
        let rule = "# ========================================\n";

        let mut report = String::from("# KCtrl log report\n");
        report.push_str(&format!(
            "# Exported: {}\n\n",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        ));

        let config = self
            .runner
            .execute(&format!("cat {} 2>/dev/null; true", config_file))?;

        report.push_str("# Log settings in config.txt:\n");
        if config.is_empty() {
            report.push_str("# config.txt is missing or empty\n");
        }
        for line in config.lines().map(str::trim) {
            let log_comment =
                line.starts_with('#') && (line.contains("日志") || line.contains("log"));
            if line.starts_with("enable_log") || log_comment {
                report.push_str(line);
                report.push('\n');
            }
        }
        report.push('\n');

        let log_exists = self
            .runner
            .execute(&format!("test -f {} && echo exists || echo ''", log_file))?
            == "exists";
        if log_exists {
            let size = self
                .runner
                .execute(&format!("du -h {} 2>/dev/null | cut -f1", log_file))?;
            let lines = self
                .runner
                .execute(&format!("wc -l < {} 2>/dev/null", log_file))?;
            report.push_str(&format!("# Log file size: {}\n", size));
            report.push_str(&format!("# Log file lines: {}\n", lines.trim()));
        } else {
            report.push_str(&format!(
                "# Log file does not exist ({})\n",
                self.paths.log_file().display()
            ));
        }

        report.push('\n');
        report.push_str(rule);
        report.push_str("# config.txt\n");
        report.push_str(rule);
        if config.is_empty() {
            report.push_str("# config.txt is missing or empty\n");
        } else {
            report.push_str(&config);
            report.push('\n');
        }

        report.push('\n');
        report.push_str(rule);
        report.push_str(&format!("# klog.log (last {} lines)\n", LOG_REPORT_TAIL));
        report.push_str(rule);
        if log_exists {
            let tail = self.runner.execute(&format!(
                "tail -n {} {} 2>/dev/null",
                LOG_REPORT_TAIL, log_file
            ))?;
            if tail.is_empty() {
                report.push_str("# Log file is empty\n");
            } else {
                report.push_str(&tail);
                report.push('\n');
            }
        } else {
            report.push_str("# Log file does not exist\n");
        }

        Ok(report)
    }
}
