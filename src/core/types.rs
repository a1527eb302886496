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

//! src/core/types.rs
//!
//! Domain types shared by the codec, the reconciler and the repository.

use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, str::FromStr};

use crate::core::keycodes;

/// Stub written into every freshly created script file.
pub const SCRIPT_STUB: &str = "#!/bin/bash\n\n# 脚本内容请在此处添加\n";

/// Press pattern the module distinguishes for a single key.
///
/// The string forms are part of the on-disk format: they appear in
/// `script_<code>_<event>` keys and in script file names.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum EventType {
    /// Short tap
    Click,
    /// Two taps within the double click interval
    DoubleClick,
    /// Held past the short press threshold
    ShortPress,
    /// Held past the long press threshold
    LongPress,
}

impl EventType {
    /// All event types in the order they are written to disk.
    pub const ALL: [EventType; 4] = [
        EventType::Click,
        EventType::DoubleClick,
        EventType::ShortPress,
        EventType::LongPress,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Click => "click",
            EventType::DoubleClick => "double_click",
            EventType::ShortPress => "short_press",
            EventType::LongPress => "long_press",
        }
    }

    /// Default script file name for this event on `code`, e.g. `long_press_735.sh`.
    pub fn script_file_name(&self, code: u32) -> String {
        format!("{}_{}.sh", self.as_str(), code)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::ALL
            .into_iter()
            .find(|event| event.as_str() == s)
            .ok_or_else(|| format!("unknown event type '{}'", s))
    }
}

/// A physical key and the scripts bound to its press patterns.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct KeyBinding {
    /// Linux input key code
    pub code: u32,
    /// Display name derived from the key code
    pub name: String,
    /// Script file name per event, relative to the scripts directory
    pub scripts: BTreeMap<EventType, String>,
}

impl KeyBinding {
    /// Creates a binding with no event mapped.
    pub fn new(code: u32) -> Self {
        Self {
            code,
            name: keycodes::display_name(code),
            scripts: BTreeMap::new(),
        }
    }

    /// Creates a binding with all four events mapped to their default script files.
    pub fn with_default_scripts(code: u32) -> Self {
        let mut binding = Self::new(code);
        for event in EventType::ALL {
            binding.scripts.insert(event, event.script_file_name(code));
        }
        binding
    }

    pub fn script(&self, event: EventType) -> Option<&str> {
        self.scripts.get(&event).map(String::as_str)
    }
}

/// How a device is referenced in the `device=` line.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum MatchMode {
    /// Raw device node path, e.g. `/dev/input/event2`
    Path,
    /// Quoted device name, survives node renumbering
    Name,
}

impl FromStr for MatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "path" => Ok(MatchMode::Path),
            "name" => Ok(MatchMode::Name),
            other => Err(format!("unknown match mode '{}'", other)),
        }
    }
}

/// One `|`-separated item of the `device=` value.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum DeviceToken {
    Path(String),
    Name(String),
}

impl DeviceToken {
    /// Classifies an already trimmed token. Quoted tokens are names.
    pub fn parse(raw: &str) -> Self {
        if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
            DeviceToken::Name(raw[1..raw.len() - 1].to_string())
        } else {
            DeviceToken::Path(raw.to_string())
        }
    }

    pub fn matches(&self, device: &DeviceSelection) -> bool {
        match self {
            DeviceToken::Path(path) => *path == device.path,
            DeviceToken::Name(name) => *name == device.name,
        }
    }
}

impl fmt::Display for DeviceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceToken::Path(path) => f.write_str(path),
            DeviceToken::Name(name) => write!(f, "\"{}\"", name),
        }
    }
}

/// An input device node together with its listening state.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct DeviceSelection {
    /// Device node path, e.g. `/dev/input/event3`
    pub path: String,
    /// Human readable device name reported by the kernel
    pub name: String,
    pub is_selected: bool,
    /// Serialize by quoted name instead of by path
    pub use_device_name: bool,
}

impl DeviceSelection {
    pub fn new(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            is_selected: false,
            use_device_name: false,
        }
    }

    pub fn match_mode(&self) -> MatchMode {
        if self.use_device_name {
            MatchMode::Name
        } else {
            MatchMode::Path
        }
    }
}

/// Press timing thresholds in milliseconds.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Thresholds {
    pub click: u32,
    pub short_press: u32,
    pub long_press: u32,
    pub double_click_interval: u32,
}

impl Thresholds {
    /// Lowest value any threshold may take once normalized.
    pub const MINIMUM: u32 = 100;
    /// Step used to push an out-of-order threshold past its predecessor.
    pub const STEP: u32 = 100;

    /// Returns a copy that satisfies the ordering rules the module expects.
    ///
    /// Every value is at least [`Self::MINIMUM`]; short press exceeds click,
    /// long press exceeds short press and the double click interval exceeds
    /// click. Values that break an ordering rule are raised one [`Self::STEP`]
    /// above the value they must exceed.
    pub fn normalized(&self) -> Self {
        let click = self.click.max(Self::MINIMUM);
        let mut short_press = self.short_press.max(Self::MINIMUM);
        if short_press <= click {
            short_press = click + Self::STEP;
        }
        let mut long_press = self.long_press.max(Self::MINIMUM);
        if long_press <= short_press {
            long_press = short_press + Self::STEP;
        }
        let mut double_click_interval = self.double_click_interval.max(Self::MINIMUM);
        if double_click_interval <= click {
            double_click_interval = click + Self::STEP;
        }

        Self {
            click,
            short_press,
            long_press,
            double_click_interval,
        }
    }

    pub fn is_normalized(&self) -> bool {
        *self == self.normalized()
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            click: 100,
            short_press: 1000,
            long_press: 2000,
            double_click_interval: 300,
        }
    }
}

/// Singular settings of the module config.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ModuleSettings {
    pub thresholds: Thresholds,
    pub enable_log: bool,
    /// CPU cores the service is pinned to
    pub cpu_affinity: Vec<usize>,
}

impl Default for ModuleSettings {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            enable_log: false,
            cpu_affinity: vec![0],
        }
    }
}

/// Everything a config document carries, before devices are reconciled.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct ConfigState {
    pub settings: ModuleSettings,
    /// Tokens of the last `device=` line, in file order
    pub device_tokens: Vec<DeviceToken>,
    /// Bindings in order of first appearance
    pub bindings: Vec<KeyBinding>,
}
