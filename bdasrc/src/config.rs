//! Session configuration.

use bdasrc_types::TuningParameters;
use serde::{Deserialize, Serialize};

use crate::queue::DEFAULT_CAPACITY;

/// Highest selectable device index.
pub const MAX_DEVICE_INDEX: u32 = 64;

/// Everything a session reads when it builds its graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SessionConfig {
    /// Tuning parameters handed to the locator mapping.
    pub tuning: TuningParameters,
    /// Ordinal of the tuner device to bind.
    pub device_index: u32,
    /// Queue capacity, in buffers.
    pub buffer_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tuning: TuningParameters::default(),
            device_index: 0,
            buffer_size: DEFAULT_CAPACITY,
        }
    }
}
