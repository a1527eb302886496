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

//! Scripted command runner for tests that must not touch the real system.

use std::sync::Mutex;

use crate::shell::{CommandRunner, RunOptions, ShellError, ShellOutput};

/// Answers commands from a list of `(substring, output)` rules.
///
/// The first rule whose substring occurs in the command wins. Commands
/// matching no rule succeed with empty output. Every command is recorded.
#[derive(Default)]
pub struct ScriptedRunner {
    rules: Mutex<Vec<(String, ShellOutput)>>,
    commands: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Successful reply with `stdout` for commands containing `pattern`.
    pub fn on(self, pattern: &str, stdout: &str) -> Self {
        self.on_output(
            pattern,
            ShellOutput {
                stdout: stdout.to_string(),
                stderr: String::new(),
                status: Some(0),
            },
        )
    }

    /// Failing reply for commands containing `pattern`.
    pub fn on_failure(self, pattern: &str, code: i32, stderr: &str) -> Self {
        self.on_output(
            pattern,
            ShellOutput {
                stdout: String::new(),
                stderr: stderr.to_string(),
                status: Some(code),
            },
        )
    }

    pub fn on_output(self, pattern: &str, output: ShellOutput) -> Self {
        self.rules
            .lock()
            .unwrap()
            .push((pattern.to_string(), output));
        self
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    /// True if some recorded command contains `pattern`.
    pub fn ran(&self, pattern: &str) -> bool {
        self.commands().iter().any(|c| c.contains(pattern))
    }
}

impl CommandRunner for ScriptedRunner {
    fn run_with(&self, command: &str, _options: &RunOptions) -> Result<ShellOutput, ShellError> {
        self.commands.lock().unwrap().push(command.to_string());

        let rules = self.rules.lock().unwrap();
        Ok(rules
            .iter()
            .find(|(pattern, _)| command.contains(pattern.as_str()))
            .map(|(_, output)| output.clone())
            .unwrap_or_else(|| ShellOutput {
                status: Some(0),
                ..ShellOutput::default()
            }))
    }
}
