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

//! Device scanner tests

use std::sync::Arc;

use crate::{
    core::reconcile::FALLBACK_DEVICE_COUNT,
    module::scanner::*,
    shell::testing::ScriptedRunner,
};

const PROC_DEVICES: &str = r#"I: Bus=0019 Vendor=0001 Product=0001 Version=0100
N: Name="gpio-keys"
P: Phys=gpio-keys/input0
H: Handlers=kbd event0
B: EV=3

I: Bus=0003 Vendor=046d Product=c31c Version=0110
N: Name="Logitech USB Keyboard"
H: Handlers=sysrq kbd leds event1
B: EV=120013

I: Bus=0000 Vendor=0000 Product=0000 Version=0000
N: Name=""
H: Handlers=event7
"#;

fn names(devices: &[crate::core::DeviceSelection]) -> Vec<(&str, &str)> {
    devices
        .iter()
        .map(|d| (d.path.as_str(), d.name.as_str()))
        .collect()
}

#[test]
fn test_scan_resolves_names_from_sysfs_then_proc() {
    let runner = ScriptedRunner::new()
        .on(
            "find /dev/input",
            "/dev/input/event0\n/dev/input/event1\n/dev/input/event2",
        )
        .on("/sys/class/input", "event0=gpio-keys\nevent1=\nevent2=sec_touchscreen")
        .on("/proc/bus/input/devices", PROC_DEVICES);
    let runner = Arc::new(runner);
    let scanner = ShellDeviceScanner::new(runner.clone());

    let devices = scanner.scan_devices().unwrap();

    assert_eq!(
        names(&devices),
        vec![
            ("/dev/input/event0", "gpio-keys"),
            ("/dev/input/event1", "Logitech USB Keyboard"),
            ("/dev/input/event2", "sec_touchscreen"),
        ]
    );
    assert!(devices.iter().all(|d| !d.is_selected), "Scans select nothing");
}

#[test]
fn test_scan_skips_proc_when_sysfs_has_every_name() {
    let runner = Arc::new(
        ScriptedRunner::new()
            .on("find /dev/input", "/dev/input/event0")
            .on("/sys/class/input", "event0=gpio-keys"),
    );
    ShellDeviceScanner::new(runner.clone()).scan_devices().unwrap();

    assert!(!runner.ran("/proc/bus/input/devices"));
}

#[test]
fn test_scan_probes_when_find_is_empty() {
    let runner = Arc::new(
        ScriptedRunner::new()
            .on("find /dev/input", "")
            .on("[ -c /dev/input", "/dev/input/event3"),
    );
    let devices = ShellDeviceScanner::new(runner.clone()).scan_devices().unwrap();

    assert_eq!(names(&devices), vec![("/dev/input/event3", "Input device 3")]);
    assert!(runner.ran("for n in 0 1 2"), "Probe should cover event0 upwards");
}

#[test]
fn test_scan_falls_back_to_placeholders() {
    let runner = Arc::new(ScriptedRunner::new());
    let devices = ShellDeviceScanner::new(runner).scan_devices().unwrap();

    assert_eq!(devices.len(), FALLBACK_DEVICE_COUNT);
    assert_eq!(devices[5].path, "/dev/input/event5");
}

#[test]
fn test_scan_propagates_shell_errors() {
    let runner = Arc::new(ScriptedRunner::new().on_failure("find /dev/input", 1, "permission denied"));
    assert!(ShellDeviceScanner::new(runner).scan_devices().is_err());
}

#[test]
fn test_parse_proc_devices() {
    let parsed = parse_proc_devices(PROC_DEVICES);

    assert_eq!(parsed.get("event0").map(String::as_str), Some("gpio-keys"));
    assert_eq!(
        parsed.get("event1").map(String::as_str),
        Some("Logitech USB Keyboard")
    );
    assert!(!parsed.contains_key("event7"), "Empty names are not recorded");
}

#[test]
fn test_parse_event_paths_filters_noise() {
    let paths = parse_event_paths(
        "/dev/input/event1\n/dev/input/mice\n/dev/input/event10\nfind: permission denied\n/dev/input/event1\n",
    );
    assert_eq!(paths, vec!["/dev/input/event1", "/dev/input/event10"]);
}

#[test]
fn test_static_devices() {
    let source = StaticDevices(vec![crate::core::DeviceSelection::new("/dev/input/event0", "a")]);
    assert_eq!(source.scan_devices().unwrap().len(), 1);
}
