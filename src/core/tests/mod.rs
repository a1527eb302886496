//! Core module tests
//!
//! Contains test suites for core functionality:
//! - Document decoding, including legacy base64 documents
//! - Document encoding and the decode/encode round trip
//! - Device selection reconciliation
//! - Key binding edits

#[cfg(test)]
mod bindings_tests;
