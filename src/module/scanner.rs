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

//! Input device discovery

use std::{collections::HashMap, sync::Arc};

use crate::{
    core::{reconcile::fallback_devices, DeviceSelection},
    module::ScanError,
    shell::CommandRunner,
};

/// Highest `eventN` probed when listing `/dev/input` finds nothing.
pub const PROBE_LIMIT: u32 = 20;

/// Where the repository gets the current device list from.
pub trait DeviceSource: Send + Sync {
    /// Devices in node order, nothing selected.
    fn scan_devices(&self) -> Result<Vec<DeviceSelection>, ScanError>;
}

/// A fixed device list, for tests and offline editing.
#[derive(Clone, Debug, Default)]
pub struct StaticDevices(pub Vec<DeviceSelection>);

impl DeviceSource for StaticDevices {
    fn scan_devices(&self) -> Result<Vec<DeviceSelection>, ScanError> {
        Ok(self.0.clone())
    }
}

/// Lists `/dev/input/event*` nodes and resolves their names through the shell.
pub struct ShellDeviceScanner {
    runner: Arc<dyn CommandRunner>,
}

impl ShellDeviceScanner {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    fn list_nodes(&self) -> Result<Vec<String>, ScanError> {
        let listed = self
            .runner
            .execute("find /dev/input -name 'event*' -type c 2>/dev/null | sort -V")?;
        let nodes = parse_event_paths(&listed);
        if !nodes.is_empty() {
            return Ok(nodes);
        }

        tracing::debug!("find returned no input nodes, probing event0..event{}", PROBE_LIMIT);
        let numbers: Vec<String> = (0..=PROBE_LIMIT).map(|n| n.to_string()).collect();
        let probed = self.runner.execute(&format!(
            "for n in {}; do [ -c /dev/input/event$n ] && echo /dev/input/event$n; done; true",
            numbers.join(" ")
        ))?;
        Ok(parse_event_paths(&probed))
    }

    fn sysfs_names(&self, events: &[&str]) -> Result<HashMap<String, String>, ScanError> {
        let output = self.runner.execute(&format!(
            "for n in {}; do printf '%s=%s\\n' \"$n\" \"$(cat /sys/class/input/$n/device/name 2>/dev/null)\"; done",
            events.join(" ")
        ))?;
        Ok(parse_sysfs_names(&output))
    }
}

impl DeviceSource for ShellDeviceScanner {
    fn scan_devices(&self) -> Result<Vec<DeviceSelection>, ScanError> {
        let nodes = self.list_nodes()?;
        if nodes.is_empty() {
            tracing::warn!("No input device nodes found, using placeholders");
            return Ok(fallback_devices());
        }

        let events: Vec<&str> = nodes.iter().filter_map(|p| event_name(p)).collect();
        let sysfs = self.sysfs_names(&events)?;
        let proc_names = if events.iter().all(|e| sysfs.contains_key(*e)) {
            HashMap::new()
        } else {
            parse_proc_devices(
                &self
                    .runner
                    .execute("cat /proc/bus/input/devices 2>/dev/null; true")?,
            )
        };

        let devices: Vec<DeviceSelection> = nodes
            .iter()
            .map(|path| {
                let event = event_name(path).unwrap_or_default();
                let name = sysfs
                    .get(event)
                    .or_else(|| proc_names.get(event))
                    .cloned()
                    .unwrap_or_else(|| placeholder_name(event));
                DeviceSelection::new(path.clone(), name)
            })
            .collect();

        tracing::debug!(count = devices.len(), "Scanned input devices");
        Ok(devices)
    }
}

/// `/dev/input/eventN` lines of a listing, in order, without duplicates.
pub fn parse_event_paths(output: &str) -> Vec<String> {
    let mut paths: Vec<String> = Vec::new();
    for line in output.lines().map(str::trim) {
        let valid = event_name(line).is_some_and(|event| {
            line.starts_with("/dev/input/") && event[5..].chars().all(|c| c.is_ascii_digit())
        });
        if valid && !paths.iter().any(|p| p == line) {
            paths.push(line.to_string());
        }
    }
    paths
}

fn event_name(path: &str) -> Option<&str> {
    path.rsplit('/')
        .next()
        .filter(|name| name.len() > 5 && name.starts_with("event"))
}

fn placeholder_name(event: &str) -> String {
    format!("Input device {}", event.trim_start_matches("event"))
}

/// `eventN=name` lines into a map, skipping empty names.
pub fn parse_sysfs_names(output: &str) -> HashMap<String, String> {
    output
        .lines()
        .filter_map(|line| line.split_once('='))
        .map(|(event, name)| (event.trim().to_string(), name.trim().to_string()))
        .filter(|(event, name)| !event.is_empty() && !name.is_empty())
        .collect()
}

/// Maps `eventN` handlers to device names from `/proc/bus/input/devices`.
///
/// Each block has an `N: Name="..."` line and an `H: Handlers=...` line;
/// blocks are separated by blank lines.
pub fn parse_proc_devices(content: &str) -> HashMap<String, String> {
    let mut names = HashMap::new();
    let mut current: Option<String> = None;

    for line in content.lines().map(str::trim) {
        if line.is_empty() {
            current = None;
        } else if let Some(name) = line.strip_prefix("N: Name=") {
            current = Some(name.trim().trim_matches('"').to_string());
        } else if let Some(handlers) = line.strip_prefix("H: Handlers=") {
            if let Some(name) = current.as_ref().filter(|n| !n.is_empty()) {
                for handler in handlers.split_whitespace().filter(|h| h.starts_with("event")) {
                    names.insert(handler.to_string(), name.clone());
                }
            }
        }
    }

    names
}
