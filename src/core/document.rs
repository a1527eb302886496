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

//! src/core/document.rs
//!
//! KCtrl config document encoder
//!
//! Two write paths exist and each owns a different part of the document:
//! - [`render_document`] regenerates everything except the `script_` lines,
//!   which it copies through verbatim
//! - [`replace_script_block`] keeps every other line verbatim and regenerates
//!   the `script_` lines from the key bindings
//!
//! Both produce plain UTF-8 with a trailing newline.

use std::collections::BTreeMap;

use crate::core::{
    parser::FORMAT_MARKER,
    types::{DeviceSelection, DeviceToken, KeyBinding, ModuleSettings},
};

/// Comment block written at the top of every generated document.
pub const DOCUMENT_HEADER: &str = "# KCtrl 配置文件\n# 此文件由应用自动生成\n";

/// Document exported when the module has no config yet.
pub const DEFAULT_DOCUMENT: &str = DOCUMENT_HEADER;

const SCRIPT_SECTION_COMMENT: &str = "# 按键脚本配置";

/// Tokens for the `device=` line.
///
/// Distinct names of selected name-mode devices come first, quoted and in
/// first-seen order. Raw paths of selected path-mode devices follow.
pub fn device_tokens(devices: &[DeviceSelection]) -> Vec<DeviceToken> {
    let mut names: Vec<DeviceToken> = Vec::new();
    let mut paths = Vec::new();

    for device in devices.iter().filter(|d| d.is_selected) {
        if device.use_device_name {
            let token = DeviceToken::Name(device.name.clone());
            if !names.contains(&token) {
                names.push(token);
            }
        } else {
            paths.push(DeviceToken::Path(device.path.clone()));
        }
    }

    names.extend(paths);
    names
}

/// Joins tokens the way the `device=` value stores them.
pub fn render_device_value(tokens: &[DeviceToken]) -> String {
    tokens
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("|")
}

/// `script_<code>_<event>=<file>` lines for every non-empty mapping.
pub fn render_script_lines(bindings: &[KeyBinding]) -> Vec<String> {
    bindings
        .iter()
        .flat_map(|binding| {
            binding
                .scripts
                .iter()
                .filter(|(_, name)| !name.is_empty())
                .map(move |(event, name)| format!("script_{}_{}={}", binding.code, event, name))
        })
        .collect()
}

/// Returns the `script_` lines of a document, untouched.
pub fn extract_script_lines(document: &str) -> Vec<String> {
    document
        .split('\n')
        .filter(|line| is_script_line(line))
        .map(|line| line.trim_end_matches('\r').to_string())
        .collect()
}

fn is_script_line(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.starts_with("script_") && trimmed.contains('=')
}

/// Renders the full document from settings and the device list.
///
/// `script_lines` are appended verbatim, normally the result of
/// [`extract_script_lines`] on the document being replaced.
///
/// # Example
/// ```
/// use kctrl_config::core::{document::render_document, DeviceSelection, ModuleSettings};
///
/// let mut device = DeviceSelection::new("/dev/input/event0", "gpio-keys");
/// device.is_selected = true;
///
/// let text = render_document(&ModuleSettings::default(), &[device], &[]);
/// assert!(text.contains("device=/dev/input/event0\n"));
/// assert!(text.contains("enable_log=0\n"));
/// ```
pub fn render_document(
    settings: &ModuleSettings,
    devices: &[DeviceSelection],
    script_lines: &[String],
) -> String {
    let mut out = String::from(DOCUMENT_HEADER);
    out.push_str(FORMAT_MARKER);
    out.push('\n');
    out.push('\n');

    let tokens = device_tokens(devices);
    if !tokens.is_empty() {
        out.push_str("# 监听设备\n");
        for (name, paths) in shared_name_groups(devices) {
            out.push_str(&format!("# \"{}\": {}\n", name, paths.join(", ")));
        }
        out.push_str(&format!("device={}\n\n", render_device_value(&tokens)));
    }

    let t = &settings.thresholds;
    out.push_str("# 按键时间阈值 (毫秒)\n");
    out.push_str(&format!("click_threshold={}\n", t.click));
    out.push_str(&format!("short_press_threshold={}\n", t.short_press));
    out.push_str(&format!("long_press_threshold={}\n", t.long_press));
    out.push_str(&format!("double_click_interval={}\n\n", t.double_click_interval));

    out.push_str(&format!("enable_log={}\n", u8::from(settings.enable_log)));

    let cores = if settings.cpu_affinity.is_empty() {
        "0".to_string()
    } else {
        settings
            .cpu_affinity
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",")
    };
    out.push_str(&format!("cpu_affinity={}\n", cores));

    if !script_lines.is_empty() {
        out.push('\n');
        out.push_str(SCRIPT_SECTION_COMMENT);
        out.push('\n');
        for line in script_lines {
            out.push_str(line);
            out.push('\n');
        }
    }

    out
}

/// Selected name-mode names backed by more than one device node.
fn shared_name_groups(devices: &[DeviceSelection]) -> Vec<(String, Vec<String>)> {
    let mut order = Vec::new();
    let mut groups: BTreeMap<&str, Vec<String>> = BTreeMap::new();

    for device in devices.iter().filter(|d| d.is_selected && d.use_device_name) {
        let paths = groups.entry(device.name.as_str()).or_default();
        if paths.is_empty() {
            order.push(device.name.clone());
        }
        paths.push(device.path.clone());
    }

    order
        .into_iter()
        .filter_map(|name| {
            let paths = groups.remove(name.as_str())?;
            (paths.len() > 1).then_some((name, paths))
        })
        .collect()
}

/// Rewrites the `script_` lines of `document` from `bindings`.
///
/// Every existing `script_` line is dropped, all other lines are kept as
/// they are, and one line per non-empty mapping is appended. An empty
/// document gets the standard header first.
pub fn replace_script_block(document: &str, bindings: &[KeyBinding]) -> String {
    let mut kept: Vec<&str> = document
        .split('\n')
        .filter(|line| !is_script_line(line))
        .collect();

    while kept.last().is_some_and(|line| line.trim().is_empty()) {
        kept.pop();
    }

    let mut out = if kept.is_empty() {
        format!("{}{}\n", DOCUMENT_HEADER, FORMAT_MARKER)
    } else {
        let mut text = kept.join("\n");
        text.push('\n');
        text
    };

    let lines = render_script_lines(bindings);
    if !lines.is_empty() && !out.contains(SCRIPT_SECTION_COMMENT) {
        out.push('\n');
        out.push_str(SCRIPT_SECTION_COMMENT);
        out.push('\n');
    }
    for line in lines {
        out.push_str(&line);
        out.push('\n');
    }

    out
}
