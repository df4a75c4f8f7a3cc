//! Instantiation of the stages every capture graph needs.

use std::fmt;
use std::sync::Arc;

use bdasrc_types::TunerStandard;

use crate::graph::{ProcessingStage, StageError};

/// Stages created by the session rather than found in the device directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    /// Network provider for the given standard.
    NetworkProvider(TunerStandard),
    /// MPEG-2 demultiplexer.
    Demultiplexer,
    /// Sample capture stage feeding the delivery callback.
    SampleCapture,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageKind::NetworkProvider(standard) => write!(f, "{} network provider", standard),
            StageKind::Demultiplexer => f.write_str("demultiplexer"),
            StageKind::SampleCapture => f.write_str("sample capture"),
        }
    }
}

/// Creates standard stages.
pub trait StageFactory: Send + Sync {
    fn instantiate(&self, kind: StageKind) -> Result<Arc<dyn ProcessingStage>, StageError>;
}
