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

//! Document validation before commit
//!
//! Runs two kinds of checks over a complete config document:
//! - **Errors** block the commit: script names that would escape the
//!   scripts directory or carry shell metacharacters
//! - **Warnings** are reported and allowed: lines the decoder had to skip or
//!   guess at, out-of-order thresholds, no `device=` line, key code 0
//!
//! # Example
//!
//! ```
//! use kctrl_config::config::validator::ConfigValidator;
//!
//! let report = ConfigValidator::new().validate_config("script_735_click=../../bin/sh\n");
//! assert!(report.has_errors());
//! ```

use std::fmt;

use crate::core::{
    parser::{decode_document, decode_legacy, parse_key_value, parse_script_key},
    validator::validate_script_name,
    DiagnosticKind, DocumentFormat,
};

/// Validation severity level
///
/// - **Error**: Blocks commit
/// - **Warning**: Allows commit, logged
/// - **Info**: Informational only
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ValidationLevel {
    Error,
    Warning,
    Info,
}

/// A single validation issue found in the document
#[derive(Clone, Debug)]
pub struct ValidationIssue {
    /// 1-based line number, `None` for document-wide issues
    pub line: Option<usize>,
    pub validation_level: ValidationLevel,
    /// Human-readable description of the issue
    pub message: String,
    /// Optional suggestion for fixing the issue
    pub suggestion: Option<String>,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {}: {}", line, self.message)?,
            None => write!(f, "{}", self.message)?,
        }
        if let Some(suggestion) = &self.suggestion {
            write!(f, " ({})", suggestion)?;
        }
        Ok(())
    }
}

/// Complete validation report for a document
#[derive(Debug)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
    pub format: DocumentFormat,
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            issues: Vec::new(),
            format: DocumentFormat::Plain,
        }
    }

    /// Returns true if the report contains any Error-level issues
    pub fn has_errors(&self) -> bool {
        self.count(ValidationLevel::Error) > 0
    }

    pub fn has_warnings(&self) -> bool {
        self.count(ValidationLevel::Warning) > 0
    }

    pub fn count(&self, level: ValidationLevel) -> usize {
        self.issues
            .iter()
            .filter(|issue| issue.validation_level == level)
            .count()
    }

    /// Adds an Error-level issue to the report
    pub fn add_error(&mut self, line: Option<usize>, message: String) {
        self.push(line, ValidationLevel::Error, message, None);
    }

    /// Adds a Warning-level issue to the report
    pub fn add_warning(&mut self, line: Option<usize>, message: String, suggestion: Option<String>) {
        self.push(line, ValidationLevel::Warning, message, suggestion);
    }

    pub fn add_info(&mut self, message: String) {
        self.push(None, ValidationLevel::Info, message, None);
    }

    fn push(
        &mut self,
        line: Option<usize>,
        validation_level: ValidationLevel,
        message: String,
        suggestion: Option<String>,
    ) {
        self.issues.push(ValidationIssue {
            line,
            validation_level,
            message,
            suggestion,
        });
    }
}

#[derive(Debug, Default)]
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validates a complete document, plain or legacy.
    pub fn validate_config(&self, content: &str) -> ValidationReport {
        let mut report = ValidationReport::new();
        let decoded = decode_document(content);
        report.format = decoded.format;

        let text = match decoded.format {
            DocumentFormat::LegacyBase64 => {
                report.add_info(
                    "Document is legacy base64 and will be rewritten as plain text".to_string(),
                );
                decode_legacy(content).unwrap_or_default()
            }
            DocumentFormat::Plain => content.to_string(),
        };

        self.check_script_names(&text, &mut report);

        for diagnostic in &decoded.diagnostics {
            report.add_warning(
                Some(diagnostic.line),
                format!("{}: {}", diagnostic.kind, diagnostic.content),
                suggestion_for(&diagnostic.kind),
            );
        }

        let state = &decoded.state;
        if state.device_tokens.is_empty() {
            report.add_warning(
                None,
                "No device= line, the module will not listen to any device".to_string(),
                Some("select at least one input device".to_string()),
            );
        }

        let thresholds = state.settings.thresholds;
        if !thresholds.is_normalized() {
            let fixed = thresholds.normalized();
            report.add_warning(
                None,
                format!(
                    "Thresholds out of order: click {} short {} long {} double {}",
                    thresholds.click,
                    thresholds.short_press,
                    thresholds.long_press,
                    thresholds.double_click_interval
                ),
                Some(format!(
                    "use click {} short {} long {} double {}",
                    fixed.click, fixed.short_press, fixed.long_press, fixed.double_click_interval
                )),
            );
        }

        if state.bindings.iter().any(|b| b.code == 0) {
            report.add_warning(
                None,
                "Scripts bound to key code 0".to_string(),
                Some("key code 0 is not a real key, rebind them to a detected code".to_string()),
            );
        }

        report
    }

    fn check_script_names(&self, text: &str, report: &mut ValidationReport) {
        for (idx, line) in text.split('\n').enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Ok((_, (key, value))) = parse_key_value(line) else {
                continue;
            };
            if parse_script_key(key.trim()).is_err() {
                continue;
            }
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            if let Err(e) = validate_script_name(value) {
                report.add_error(Some(idx + 1), format!("Unsafe script name: {}", e));
            }
        }
    }
}

fn suggestion_for(kind: &DiagnosticKind) -> Option<String> {
    match kind {
        DiagnosticKind::MissingSeparator => Some("use key=value or start the line with #".into()),
        DiagnosticKind::UnknownKey(_) => None,
        DiagnosticKind::InvalidNumber(_) => Some("use a whole number of milliseconds".into()),
        DiagnosticKind::InvalidFlag(_) => Some("use enable_log=0 or enable_log=1".into()),
        DiagnosticKind::InvalidCpuCore(_) => Some("list cores as numbers, e.g. 0,1".into()),
        DiagnosticKind::InvalidKeyCode(_) => Some("use the numeric key code".into()),
        DiagnosticKind::UnknownEvent(_) => {
            Some("events are click, double_click, short_press and long_press".into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLEAN: &str = "device=/dev/input/event0\n\
                         click_threshold=100\n\
                         short_press_threshold=1000\n\
                         long_press_threshold=2000\n\
                         double_click_interval=300\n\
                         enable_log=0\n\
                         script_735_click=click_735.sh\n";

    #[test]
    fn test_clean_document_passes() {
        let report = ConfigValidator::new().validate_config(CLEAN);
        assert!(report.issues.is_empty(), "Unexpected issues: {:?}", report.issues);
    }

    #[test]
    fn test_path_escape_in_script_name_blocks() {
        let content = format!("{}script_735_long_press=../../system/bin/sh\n", CLEAN);
        let report = ConfigValidator::new().validate_config(&content);

        assert!(report.has_errors(), "Path escape should block the commit");
        assert_eq!(report.count(ValidationLevel::Error), 1);
        assert_eq!(report.issues[0].line, Some(8));
    }

    #[test]
    fn test_injection_in_script_name_blocks() {
        let content = format!("{}script_735_click=a.sh;reboot\n", CLEAN);
        let report = ConfigValidator::new().validate_config(&content);
        assert!(report.has_errors());
    }

    #[test]
    fn test_decoder_diagnostics_become_warnings() {
        let content = format!("{}click_threshold=fast\ngarbage\n", CLEAN);
        let report = ConfigValidator::new().validate_config(&content);

        assert!(!report.has_errors(), "Malformed lines only warn");
        let lines: Vec<_> = report.issues.iter().filter_map(|i| i.line).collect();
        assert!(lines.contains(&8), "click_threshold=fast should be reported");
        assert!(lines.contains(&9), "garbage should be reported");
    }

    #[test]
    fn test_threshold_order_warning_suggests_fix() {
        let report = ConfigValidator::new()
            .validate_config("device=/dev/input/event0\nclick_threshold=50\n");

        let issue = report
            .issues
            .iter()
            .find(|i| i.message.contains("Thresholds"))
            .expect("threshold warning");
        assert_eq!(issue.validation_level, ValidationLevel::Warning);
        assert!(issue.suggestion.as_deref().unwrap_or("").contains("click 100"));
    }

    #[test]
    fn test_missing_device_and_code_zero_warn() {
        let report = ConfigValidator::new().validate_config("script_abc_click=click_0.sh\n");

        assert!(!report.has_errors());
        assert!(report.issues.iter().any(|i| i.message.contains("No device=")));
        assert!(report.issues.iter().any(|i| i.message.contains("key code 0")));
    }

    #[test]
    fn test_legacy_document_reported() {
        use base64::{engine::general_purpose::STANDARD, Engine as _};

        let encoded = STANDARD.encode(CLEAN);
        let report = ConfigValidator::new().validate_config(&encoded);

        assert_eq!(report.format, DocumentFormat::LegacyBase64);
        assert_eq!(report.count(ValidationLevel::Info), 1);
        assert!(!report.has_errors());
    }
}
