//! Error types for parsing tuning values.

use thiserror::Error;

/// A textual value did not match any entry of the named table.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown {kind} value: {value:?} (expected one of: {expected})")]
pub struct ParseValueError {
    /// Which table was consulted (e.g. "modulation").
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
    /// Comma separated list of accepted nicks.
    pub expected: String,
}
