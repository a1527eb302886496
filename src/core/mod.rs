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

//! src/core/mod.rs
//!
//! Core business logic module
//!
//! This module contains the data structures and pure algorithms of the
//! KCtrl config, including:
//! - Type definitions for devices, thresholds and key bindings
//! - Decoding and encoding of the `key=value` config document
//! - Device selection reconciliation
//! - Key binding edits and their script file effects
//! - Input validation for names that reach the privileged shell
//!
//! Nothing in here performs I/O, so all of it is tested without a device
//! or a root shell.

pub mod bindings;
pub mod document;
pub mod keycodes;
pub mod parser;
pub mod reconcile;
pub mod types;
pub mod validator;

pub use bindings::{BindingError, KeyBindingSet, ScriptChange};
pub use parser::{decode_document, DecodeReport, Diagnostic, DiagnosticKind, DocumentFormat};
pub use reconcile::SelectionError;
pub use types::*;
pub use validator::ValidationError;

#[cfg(test)]
mod tests;
