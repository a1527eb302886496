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

//! Device selection reconciliation
//!
//! Matches the tokens of a `device=` line against the devices present on
//! the system and applies selection edits while keeping two rules:
//! - devices sharing a name in name mode are selected or deselected together
//! - at least one device stays selected

use thiserror::Error;

use crate::core::{
    types::{DeviceSelection, DeviceToken, MatchMode},
    validator::{validate_device_name, ValidationError},
};

/// Number of placeholder nodes used when no device can be discovered.
pub const FALLBACK_DEVICE_COUNT: usize = 6;

/// Rejected selection edits
#[derive(Debug, Error, PartialEq)]
pub enum SelectionError {
    #[error("Device index {0} is out of range")]
    IndexOutOfRange(usize),

    #[error("At least one device must stay selected")]
    LastSelected,

    #[error("Device name cannot be stored in name mode: {0}")]
    UnencodableName(#[from] ValidationError),
}

/// Marks devices selected from `tokens`, the first matching token wins.
///
/// A path token selects the device in path mode, a name token in name mode.
/// Devices matching no token end up deselected in path mode. When nothing
/// matches, the first device is selected.
pub fn apply_tokens(devices: &mut [DeviceSelection], tokens: &[DeviceToken]) {
    for device in devices.iter_mut() {
        match tokens.iter().find(|token| token.matches(device)) {
            Some(DeviceToken::Name(_)) => {
                device.is_selected = true;
                device.use_device_name = true;
            }
            Some(DeviceToken::Path(_)) => {
                device.is_selected = true;
                device.use_device_name = false;
            }
            None => {
                device.is_selected = false;
                device.use_device_name = false;
            }
        }
    }

    if ensure_one_selected(devices) {
        tracing::info!("No configured device present, selecting the first one");
    }
}

/// Selects the first device if none is selected. Returns whether it changed anything.
pub fn ensure_one_selected(devices: &mut [DeviceSelection]) -> bool {
    if devices.iter().any(|d| d.is_selected) {
        return false;
    }
    match devices.first_mut() {
        Some(first) => {
            first.is_selected = true;
            true
        }
        None => false,
    }
}

fn group_indices(devices: &[DeviceSelection], name: &str) -> Vec<usize> {
    devices
        .iter()
        .enumerate()
        .filter(|(_, d)| d.name == name)
        .map(|(idx, _)| idx)
        .collect()
}

/// Flips the selection of the device at `index`.
///
/// In name mode the whole same-name group follows. A deselect is rejected
/// when it would leave nothing selected: in name mode some selected device
/// outside the name-mode group must remain, in path mode any other
/// selected device.
pub fn toggle_selection(devices: &mut [DeviceSelection], index: usize) -> Result<(), SelectionError> {
    let device = devices
        .get(index)
        .ok_or(SelectionError::IndexOutOfRange(index))?
        .clone();
    let select = !device.is_selected;

    if device.use_device_name {
        if !select {
            let others = devices
                .iter()
                .any(|d| d.is_selected && !(d.use_device_name && d.name == device.name));
            if !others {
                return Err(SelectionError::LastSelected);
            }
        }
        for idx in group_indices(devices, &device.name) {
            if devices[idx].use_device_name {
                devices[idx].is_selected = select;
            }
        }
    } else {
        if !select {
            let selected = devices.iter().filter(|d| d.is_selected).count();
            if selected <= 1 {
                return Err(SelectionError::LastSelected);
            }
        }
        devices[index].is_selected = select;
    }

    Ok(())
}

/// Switches the device at `index`, and every device sharing its name, to `mode`.
///
/// Moving to name mode selects the group if any member was selected.
/// Moving to path mode keeps each member's own selection.
pub fn set_match_mode(
    devices: &mut [DeviceSelection],
    index: usize,
    mode: MatchMode,
) -> Result<(), SelectionError> {
    let name = devices
        .get(index)
        .ok_or(SelectionError::IndexOutOfRange(index))?
        .name
        .clone();
    let group = group_indices(devices, &name);

    match mode {
        MatchMode::Name => {
            validate_device_name(&name)?;
            let any_selected = group.iter().any(|&idx| devices[idx].is_selected);
            for idx in group {
                devices[idx].use_device_name = true;
                devices[idx].is_selected = any_selected;
            }
        }
        MatchMode::Path => {
            for idx in group {
                devices[idx].use_device_name = false;
            }
        }
    }

    Ok(())
}

/// Placeholder device list, `event0` to `event5`.
pub fn fallback_devices() -> Vec<DeviceSelection> {
    (0..FALLBACK_DEVICE_COUNT)
        .map(|n| DeviceSelection::new(format!("/dev/input/event{}", n), format!("Input device {}", n)))
        .collect()
}
