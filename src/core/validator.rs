// Copyright 2025 bakri (tidynest@proton.me)
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

//! Input validation for values that end up in shell commands or the config
//!
//! Script names are joined onto the scripts directory and device names are
//! written between quotes into the `device=` line. Both are checked here
//! before anything is stored, so neither can escape its directory, split a
//! token or smuggle a command into the privileged shell.

use thiserror::Error;

use crate::core::types::KeyBinding;

/// Highest key code the Linux input layer defines (`KEY_MAX`).
pub const MAX_KEY_CODE: u32 = 0x2ff;

/// Longest file name accepted for a script.
pub const MAX_SCRIPT_NAME_LEN: usize = 255;

/// Validation errors
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Dangerous shell metacharacters detected
    #[error("Dangerous shell metacharacters detected: '{0}'")]
    ShellMetacharacters(String),

    /// Script name is empty, contains a path separator or is a dot entry
    #[error("Invalid script name '{0}'")]
    InvalidScriptName(String),

    /// Script name exceeds the file name limit
    #[error("Script name too long: {0} characters (max 255)")]
    ScriptNameTooLong(usize),

    /// Device name cannot be written as a quoted token
    #[error("Device name '{0}' contains '|', '\"' or a line break")]
    InvalidDeviceName(String),

    /// Key code outside 1..=KEY_MAX
    #[error("Invalid key code {0}")]
    InvalidKeyCode(u32),
}

/// Checks for shell metacharacters that enable command injection
///
/// Detects: ; | & $ ` ( ) { } [ ] < > \ " ' space and newlines
pub fn check_shell_metacharacters(input: &str) -> Result<(), ValidationError> {
    const DANGEROUS_CHARS: &[char] = &[
        ';', '|', '&', '$', '`', '(', ')', '{', '}',
        '[', ']', '<', '>', '\\', '"', '\'', ' ', '\n', '\r',
    ];

    if input.contains(DANGEROUS_CHARS) {
        return Err(ValidationError::ShellMetacharacters(input.to_string()));
    }

    Ok(())
}

/// Validates a script file name relative to the scripts directory
pub fn validate_script_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() || name == "." || name == ".." || name.contains('/') || name.contains('\0') {
        return Err(ValidationError::InvalidScriptName(name.to_string()));
    }
    if name.len() > MAX_SCRIPT_NAME_LEN {
        return Err(ValidationError::ScriptNameTooLong(name.len()));
    }
    check_shell_metacharacters(name)
}

/// Validates that a device name survives the quoted `device=` token form
pub fn validate_device_name(name: &str) -> Result<(), ValidationError> {
    if name.contains(['|', '"', '\n', '\r']) {
        return Err(ValidationError::InvalidDeviceName(name.to_string()));
    }
    Ok(())
}

/// Validates a key code for a new binding
pub fn validate_key_code(code: u32) -> Result<(), ValidationError> {
    if code == 0 || code > MAX_KEY_CODE {
        return Err(ValidationError::InvalidKeyCode(code));
    }
    Ok(())
}

/// Validates every script name of a binding
pub fn validate_binding(binding: &KeyBinding) -> Result<(), ValidationError> {
    binding
        .scripts
        .values()
        .try_for_each(|name| validate_script_name(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_semicolon_injection() {
        assert!(matches!(
            check_shell_metacharacters("click_735.sh; rm -rf /"),
            Err(ValidationError::ShellMetacharacters(_))
        ));
    }

    #[test]
    fn test_detects_substitution() {
        assert!(check_shell_metacharacters("$(reboot).sh").is_err());
        assert!(check_shell_metacharacters("`id`.sh").is_err());
    }

    #[test]
    fn test_allows_default_script_names() {
        assert!(validate_script_name("click_735.sh").is_ok());
        assert!(validate_script_name("double_click_115.sh").is_ok());
        assert!(validate_script_name("torch-toggle.sh").is_ok());
    }

    #[test]
    fn test_rejects_path_escapes() {
        assert!(validate_script_name("../service.sh").is_err());
        assert!(validate_script_name("..").is_err());
        assert!(validate_script_name("").is_err());
        assert!(validate_script_name("sub/dir.sh").is_err());
    }

    #[test]
    fn test_script_name_length_limit() {
        let long_name = "a".repeat(256);
        assert_eq!(
            validate_script_name(&long_name),
            Err(ValidationError::ScriptNameTooLong(256))
        );
    }

    #[test]
    fn test_device_name_rules() {
        assert!(validate_device_name("gpio-keys").is_ok());
        assert!(validate_device_name("Logitech USB Receiver").is_ok());
        assert!(validate_device_name("a|b").is_err());
        assert!(validate_device_name("say \"hi\"").is_err());
    }

    #[test]
    fn test_key_code_range() {
        assert!(validate_key_code(735).is_ok());
        assert!(validate_key_code(0).is_err());
        assert!(validate_key_code(MAX_KEY_CODE + 1).is_err());
    }
}
