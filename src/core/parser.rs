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

//! src/core/parser.rs
//!
//! KCtrl config document decoder
//!
//! The document is a flat list of `key=value` lines:
//! - `#` lines and blank lines are ignored
//! - the value starts after the first `=`, so values may contain `=`
//! - `device=` holds `|`-separated tokens, quoted tokens are device names
//! - `script_<code>_<event>=<file>` lines build the key bindings
//!
//! # Degradation
//! Decoding never fails. Malformed lines, unknown keys and unparseable
//! numbers are skipped or replaced by a fallback value, and every such
//! decision is recorded as a [`Diagnostic`] next to the decoded state.
//!
//! # Legacy documents
//! Older writers stored the whole document base64-encoded. [`detect_format`]
//! recognises those, see its documentation for the exact rules.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use nom::{
    bytes::complete::{tag, take_till, take_till1},
    combinator::rest,
    sequence::{preceded, separated_pair},
    IResult, Parser,
};
use serde::Serialize;
use std::fmt;

use crate::core::types::{ConfigState, DeviceToken, EventType, KeyBinding, ModuleSettings};

/// Marker line the writer puts into every document it produces.
pub const FORMAT_MARKER: &str = "# kctrl-config-format: plain";

/// Encoding a document was stored in.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum DocumentFormat {
    /// UTF-8 text
    Plain,
    /// Whole document base64-encoded by an older writer
    LegacyBase64,
}

/// What went wrong with a single line.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub enum DiagnosticKind {
    /// Non-comment line without `=`
    MissingSeparator,
    /// Key the module does not know about
    UnknownKey(String),
    /// Numeric setting that did not parse, the value fell back to 0
    InvalidNumber(String),
    /// `enable_log` value other than `0` or `1`
    InvalidFlag(String),
    /// CPU core entry that is not a number
    InvalidCpuCore(String),
    /// Key code of a `script_` key that is not a number, fell back to 0
    InvalidKeyCode(String),
    /// Event part of a `script_` key that is not a known event type
    UnknownEvent(String),
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::MissingSeparator => write!(f, "line has no '=' separator"),
            DiagnosticKind::UnknownKey(key) => write!(f, "unknown key '{}'", key),
            DiagnosticKind::InvalidNumber(key) => {
                write!(f, "value of '{}' is not a number, using 0", key)
            }
            DiagnosticKind::InvalidFlag(value) => {
                write!(f, "enable_log expects 0 or 1, got '{}'", value)
            }
            DiagnosticKind::InvalidCpuCore(core) => write!(f, "invalid CPU core '{}'", core),
            DiagnosticKind::InvalidKeyCode(code) => {
                write!(f, "key code '{}' is not a number, using 0", code)
            }
            DiagnosticKind::UnknownEvent(event) => write!(f, "unknown event type '{}'", event),
        }
    }
}

/// A decoding decision tied to a line of the document.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Diagnostic {
    /// 1-based line number
    pub line: usize,
    /// Trimmed line content
    pub content: String,
    pub kind: DiagnosticKind,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {} ({})", self.line, self.kind, self.content)
    }
}

/// Result of decoding a document.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct DecodeReport {
    pub state: ConfigState,
    pub diagnostics: Vec<Diagnostic>,
    pub format: DocumentFormat,
}

impl DecodeReport {
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Parse a `key=value` line, splitting on the first `=` only
pub fn parse_key_value(input: &str) -> IResult<&str, (&str, &str)> {
    separated_pair(take_till1(|c| c == '='), tag("="), rest).parse(input)
}

/// Parse a `script_<code>_<event>` key into its code and event parts
///
/// The event part keeps its own underscores: `script_735_long_press`
/// yields `("735", "long_press")`. The code may be empty, the decoder
/// maps it to 0 like any other unparseable code.
pub fn parse_script_key(input: &str) -> IResult<&str, (&str, &str)> {
    preceded(
        tag("script_"),
        separated_pair(take_till(|c| c == '_'), tag("_"), rest),
    )
    .parse(input)
}

/// Splits a `device=` value into tokens, dropping empty ones.
pub fn parse_device_tokens(value: &str) -> Vec<DeviceToken> {
    value
        .split('|')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(DeviceToken::parse)
        .collect()
}

/// Decides whether raw file content is a legacy base64 document.
///
/// A document is plain when it contains the writer's marker line, any
/// `#` comment, or any character outside the base64 alphabet. Otherwise
/// it is treated as legacy base64 only if it decodes, the decoded bytes
/// are UTF-8, and every non-blank decoded line is a comment or contains
/// `=` with at least one such key line present. Everything else is plain.
pub fn detect_format(content: &str) -> DocumentFormat {
    match decode_legacy(content) {
        Some(_) => DocumentFormat::LegacyBase64,
        None => DocumentFormat::Plain,
    }
}

/// Returns the decoded text of a legacy base64 document, `None` for plain text.
pub fn decode_legacy(content: &str) -> Option<String> {
    if content.contains(FORMAT_MARKER) || content.contains('#') {
        return None;
    }

    let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty()
        || !compact
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '='))
    {
        return None;
    }

    let bytes = STANDARD.decode(compact.as_bytes()).ok()?;
    let text = String::from_utf8(bytes).ok()?;

    let mut key_lines = 0usize;
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if line.starts_with('#') {
            continue;
        }
        if !line.contains('=') {
            return None;
        }
        key_lines += 1;
    }

    (key_lines > 0).then_some(text)
}

/// Decodes raw file content, accepting both plain and legacy documents.
///
/// # Example
/// ```
/// use kctrl_config::core::parser::{decode_document, DocumentFormat};
///
/// let report = decode_document("device=/dev/input/event0\nclick_threshold=50\n");
/// assert_eq!(report.format, DocumentFormat::Plain);
/// assert_eq!(report.state.settings.thresholds.click, 50);
/// ```
pub fn decode_document(content: &str) -> DecodeReport {
    match decode_legacy(content) {
        Some(text) => {
            tracing::info!("Config document is legacy base64, decoding");
            let mut report = parse_document(&text);
            report.format = DocumentFormat::LegacyBase64;
            report
        }
        None => parse_document(content),
    }
}

/// Decodes a plain text document.
pub fn parse_document(content: &str) -> DecodeReport {
    let mut state = ConfigState::default();
    let mut diagnostics = Vec::new();

    for (line_num, line) in content.split('\n').enumerate() {
        let line_num = line_num + 1;
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut diag = |kind| {
            diagnostics.push(Diagnostic {
                line: line_num,
                content: line.to_string(),
                kind,
            })
        };

        let Ok((_, (key, value))) = parse_key_value(line) else {
            diag(DiagnosticKind::MissingSeparator);
            continue;
        };
        let key = key.trim();
        let value = value.trim();

        apply_entry(&mut state, key, value, &mut diag);
    }

    DecodeReport {
        state,
        diagnostics,
        format: DocumentFormat::Plain,
    }
}

fn apply_entry(
    state: &mut ConfigState,
    key: &str,
    value: &str,
    diag: &mut impl FnMut(DiagnosticKind),
) {
    let settings: &mut ModuleSettings = &mut state.settings;

    match key {
        "device" => state.device_tokens = parse_device_tokens(value),
        "click_threshold" => settings.thresholds.click = parse_millis(key, value, diag),
        "short_press_threshold" => {
            settings.thresholds.short_press = parse_millis(key, value, diag)
        }
        "long_press_threshold" => settings.thresholds.long_press = parse_millis(key, value, diag),
        "double_click_interval" => {
            settings.thresholds.double_click_interval = parse_millis(key, value, diag)
        }
        "enable_log" => {
            if value != "0" && value != "1" {
                diag(DiagnosticKind::InvalidFlag(value.to_string()));
            }
            settings.enable_log = value == "1";
        }
        "cpu_affinity" => settings.cpu_affinity = parse_cpu_list(value, diag),
        _ => match parse_script_key(key) {
            Ok((_, (code, event))) => apply_script(state, code, event, value, diag),
            Err(_) => diag(DiagnosticKind::UnknownKey(key.to_string())),
        },
    }
}

fn apply_script(
    state: &mut ConfigState,
    code: &str,
    event: &str,
    value: &str,
    diag: &mut impl FnMut(DiagnosticKind),
) {
    let Ok(event) = event.parse::<EventType>() else {
        diag(DiagnosticKind::UnknownEvent(event.to_string()));
        return;
    };
    let code = code.parse::<u32>().unwrap_or_else(|_| {
        diag(DiagnosticKind::InvalidKeyCode(code.to_string()));
        0
    });

    let idx = match state.bindings.iter().position(|b| b.code == code) {
        Some(idx) => idx,
        None => {
            state.bindings.push(KeyBinding::new(code));
            state.bindings.len() - 1
        }
    };

    let binding = &mut state.bindings[idx];
    if value.is_empty() {
        binding.scripts.remove(&event);
    } else {
        binding.scripts.insert(event, value.to_string());
    }
}

/// Thresholds are written as integers but older writers used floats.
fn parse_millis(key: &str, value: &str, diag: &mut impl FnMut(DiagnosticKind)) -> u32 {
    if let Ok(ms) = value.parse::<u32>() {
        return ms;
    }
    match value.parse::<f64>() {
        Ok(ms) if ms.is_finite() && ms >= 0.0 && ms <= f64::from(u32::MAX) => ms as u32,
        _ => {
            diag(DiagnosticKind::InvalidNumber(key.to_string()));
            0
        }
    }
}

fn parse_cpu_list(value: &str, diag: &mut impl FnMut(DiagnosticKind)) -> Vec<usize> {
    let mut cores = Vec::new();
    for core in value.split(',').map(str::trim).filter(|c| !c.is_empty()) {
        match core.parse::<usize>() {
            Ok(core) if !cores.contains(&core) => cores.push(core),
            Ok(_) => {}
            Err(_) => diag(DiagnosticKind::InvalidCpuCore(core.to_string())),
        }
    }
    if cores.is_empty() {
        cores.push(0);
    }
    cores
}
