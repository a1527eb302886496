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

//! Service controller tests

use std::{sync::Arc, time::Duration};

use crate::{
    config::ModulePaths,
    module::service::*,
    shell::testing::ScriptedRunner,
    store::{AccessMode, StoreError},
};

fn controller(runner: Arc<ScriptedRunner>) -> ServiceController {
    ServiceController::new(runner, ModulePaths::new("/m"))
        .with_delays(Duration::ZERO, Duration::ZERO)
}

#[test]
fn test_status_running() {
    let runner = Arc::new(
        ScriptedRunner::new()
            .on("test -f", "1234")
            .on("ps -p 1234", "1234"),
    );
    assert_eq!(controller(runner).status().unwrap(), ServiceStatus::Running(1234));
}

#[test]
fn test_status_with_stale_pid_file() {
    let runner = Arc::new(ScriptedRunner::new().on("test -f", "1234").on("ps -p", ""));
    assert_eq!(controller(runner).status().unwrap(), ServiceStatus::Stopped);
}

#[test]
fn test_status_ignores_garbage_pid() {
    let runner = Arc::new(ScriptedRunner::new().on("test -f", "1234; reboot"));
    let status = controller(runner.clone()).status().unwrap();

    assert_eq!(status, ServiceStatus::Stopped);
    assert!(!runner.ran("ps -p"), "Garbage must never reach the shell");
}

#[test]
fn test_stop_escalates_for_survivors() {
    let runner = Arc::new(
        ScriptedRunner::new()
            .on("test -f", "42")
            .on("pgrep -x kctrl", "77"),
    );
    controller(runner.clone()).stop().unwrap();

    assert!(runner.ran("kill -TERM 42"));
    assert!(runner.ran("pkill -x kctrl"));
    assert!(runner.ran("pkill -9 -x kctrl"));
    assert!(runner.ran("rm -f '/m/mpid.txt'"));
}

#[test]
fn test_stop_without_pid_or_survivors() {
    let runner = Arc::new(ScriptedRunner::new());
    controller(runner.clone()).stop().unwrap();

    assert!(!runner.ran("kill -TERM"));
    assert!(!runner.ran("pkill -9"));
    assert!(runner.ran("rm -f '/m/mpid.txt'"));
}

#[test]
fn test_stop_respects_access_mode() {
    let runner = Arc::new(ScriptedRunner::new());
    controller(runner.clone())
        .with_mode(AccessMode::DryRun)
        .stop()
        .unwrap();
    assert!(runner.commands().is_empty(), "Dry run runs nothing");

    let result = controller(runner).with_mode(AccessMode::ReadOnly).stop();
    assert!(matches!(
        result,
        Err(ServiceError::Store(StoreError::ReadOnly(_)))
    ));
}

#[test]
fn test_start_requires_installed_module() {
    let runner = Arc::new(ScriptedRunner::new().on("test -d", ""));
    assert!(matches!(
        controller(runner).start(),
        Err(ServiceError::NotInstalled(_))
    ));
}

#[test]
fn test_restart_stops_then_starts() {
    let runner = Arc::new(ScriptedRunner::new().on("test -d", "installed"));
    controller(runner.clone()).restart().unwrap();

    let commands = runner.commands();
    let removed = commands.iter().position(|c| c.contains("rm -f")).unwrap();
    let started = commands.iter().position(|c| c.contains("sh service.sh")).unwrap();
    assert!(removed < started);
}

#[test]
fn test_parse_module_prop() {
    let info = parse_module_prop(
        "id=kctrl\nname=KCtrl\nversion=v1.2\nversionCode=12\ndescription=a=b\n# comment\n",
    );

    assert_eq!(info.name(), Some("KCtrl"));
    assert_eq!(info.version_code(), Some("12"));
    assert_eq!(info.get("description"), Some("a=b"), "Split on the first '=' only");
    assert_eq!(info.author(), None);
}

#[test]
fn test_log_report_sections() {
    let runner = Arc::new(
        ScriptedRunner::new()
            .on("du -h", "4.0K")
            .on("wc -l", "12")
            .on("tail -n 1000", "last log line")
            .on("klog.log' && echo exists", "exists")
            .on("config.txt", "# 日志设置\nenable_log=1\ndevice=/dev/input/event0"),
    );
    let report = controller(runner).log_report().unwrap();

    assert!(report.contains("# 日志设置\nenable_log=1\n"));
    assert!(report.contains("# Log file size: 4.0K"));
    assert!(report.contains("# Log file lines: 12"));
    assert!(report.contains("device=/dev/input/event0"), "Full config is included");
    assert!(report.ends_with("last log line\n"));
}

#[test]
fn test_log_report_without_log_file() {
    let runner = Arc::new(ScriptedRunner::new());
    let report = controller(runner).log_report().unwrap();

    assert!(report.contains("# Log file does not exist (/m/klog.log)"));
    assert!(report.contains("# config.txt is missing or empty"));
}
