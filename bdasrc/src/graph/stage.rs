//! Processing stage abstraction.
//!
//! A stage is one node of the capture graph: a network provider, the tuner
//! device, a receiver component, the demultiplexer, the sample capture
//! stage or a transport information stage. Every stage exposes the same
//! connection-point behavior; anything beyond that is an optional
//! capability reached through the `*_sink`/`topology`/`sample_source`
//! accessors.

use std::fmt;
use std::sync::Arc;

use bdasrc_types::{Guid, TuneRequest};
use thiserror::Error;

/// Index of a connection point within its stage.
pub type PinId = usize;

/// Direction of a connection point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinDirection {
    Input,
    Output,
}

/// Media carried over a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MediaType(pub &'static str);

impl MediaType {
    /// Accepts any peer.
    pub const ANY: MediaType = MediaType("*");
    /// Network provider to tuner control link.
    pub const TUNING: MediaType = MediaType("bda/tuning");
    /// Tuner to receiver component link (transport carried in-band).
    pub const RECEIVER: MediaType = MediaType("bda/receiver");
    /// MPEG-2 transport stream.
    pub const TRANSPORT: MediaType = MediaType("video/mpegts");
    /// Demultiplexed PSI/SI sections.
    pub const SECTIONS: MediaType = MediaType("mpeg2/sections");

    /// Whether two media types can be connected.
    pub fn accepts(self, other: MediaType) -> bool {
        self == MediaType::ANY || other == MediaType::ANY || self == other
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Snapshot of one connection point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinInfo {
    pub id: PinId,
    pub name: String,
    pub direction: PinDirection,
    pub media: MediaType,
    pub connected: bool,
}

impl PinInfo {
    /// Unconnected output pin.
    pub fn is_free_output(&self) -> bool {
        self.direction == PinDirection::Output && !self.connected
    }

    /// Unconnected input pin.
    pub fn is_free_input(&self) -> bool {
        self.direction == PinDirection::Input && !self.connected
    }
}

/// Run state of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageState {
    Stopped,
    Paused,
    Running,
}

/// Errors reported by a stage or one of its capabilities.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("Pin {0} does not exist")]
    NoSuchPin(PinId),

    #[error("Pin {0} is already connected")]
    AlreadyConnected(PinId),

    #[error("Pin {0} has the wrong direction")]
    WrongDirection(PinId),

    #[error("Media type {offered} is not accepted (expected {accepted})")]
    IncompatibleMedia {
        offered: MediaType,
        accepted: MediaType,
    },

    #[error("Unable to enumerate pins: {0}")]
    PinEnumeration(String),

    #[error("State change to {0:?} failed: {1}")]
    StateChange(StageState, String),

    #[error("Capability not supported: {0}")]
    Unsupported(&'static str),

    #[error("Driver error: {0}")]
    Driver(String),
}

/// A node of the processing graph.
///
/// Stages are shared driver objects, so every method takes `&self`;
/// implementations synchronize internally.
pub trait ProcessingStage: Send + Sync {
    /// Friendly name of the stage.
    fn name(&self) -> &str;

    /// Current connection points, in enumeration order.
    fn pins(&self) -> Result<Vec<PinInfo>, StageError>;

    /// Connect one of our output pins to an input pin of `peer`.
    ///
    /// Implementations negotiate with the peer through
    /// [`ProcessingStage::receive_connection`] and only mark their own pin
    /// connected when the peer accepted.
    fn connect(
        &self,
        output: PinId,
        peer: &dyn ProcessingStage,
        input: PinId,
    ) -> Result<(), StageError>;

    /// Accept (or refuse) an upstream connection on one of our input pins.
    fn receive_connection(&self, input: PinId, media: MediaType) -> Result<(), StageError>;

    /// Break the connection on one pin. Unconnected pins are ignored.
    fn disconnect(&self, pin: PinId);

    /// Change the run state.
    fn set_state(&self, _state: StageState) -> Result<(), StageError> {
        Ok(())
    }

    /// Network provider capability.
    fn tune_sink(&self) -> Option<&dyn TuneSink> {
        None
    }

    /// Tuner device topology capability.
    fn topology(&self) -> Option<&dyn Topology> {
        None
    }

    /// Sample capture capability.
    fn sample_source(&self) -> Option<&dyn SampleSource> {
        None
    }
}

impl fmt::Debug for dyn ProcessingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessingStage").field("name", &self.name()).finish()
    }
}

/// Accepts tune requests (network provider stages).
pub trait TuneSink: Send + Sync {
    /// Check a request without applying it.
    fn validate(&self, request: &TuneRequest) -> Result<(), StageError>;

    /// Apply a request.
    fn submit(&self, request: &TuneRequest) -> Result<(), StageError>;
}

/// One functional node of a device's internal topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeDescriptor {
    pub node_type: u32,
    pub function: Guid,
    pub name: Guid,
}

/// Reading of one signal statistics node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignalStatistics {
    /// Signal strength in mdB.
    pub strength: i32,
    /// Signal quality, 0 to 100.
    pub quality: i32,
    pub present: bool,
    pub locked: bool,
}

/// Internal topology of a tuner device.
pub trait Topology: Send + Sync {
    /// Functional node descriptors.
    fn node_descriptors(&self) -> Result<Vec<NodeDescriptor>, StageError>;

    /// Readings of every node that exposes signal statistics.
    fn signal_statistics(&self) -> Result<Vec<SignalStatistics>, StageError>;
}

/// Sample as handed over by the driver.
pub trait MediaSample {
    /// The sample's buffer.
    fn buffer(&self) -> Result<&[u8], StageError>;

    /// Number of valid bytes at the start of the buffer.
    fn actual_len(&self) -> usize;
}

impl MediaSample for &[u8] {
    fn buffer(&self) -> Result<&[u8], StageError> {
        Ok(*self)
    }

    fn actual_len(&self) -> usize {
        self.len()
    }
}

impl MediaSample for Vec<u8> {
    fn buffer(&self) -> Result<&[u8], StageError> {
        Ok(self.as_slice())
    }

    fn actual_len(&self) -> usize {
        self.len()
    }
}

/// What happened to a delivered sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Copied and queued.
    Queued,
    /// Dropped without touching the session (bad sample or flushing).
    Dropped,
}

/// Callback invoked on the driver's delivery thread, once per sample.
pub type SampleCallback = Arc<dyn Fn(&dyn MediaSample) -> Delivery + Send + Sync>;

/// Delivers captured samples to a registered callback.
pub trait SampleSource: Send + Sync {
    /// Install or clear the delivery callback.
    fn set_callback(&self, callback: Option<SampleCallback>) -> Result<(), StageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_accepts() {
        assert!(MediaType::TRANSPORT.accepts(MediaType::TRANSPORT));
        assert!(MediaType::ANY.accepts(MediaType::SECTIONS));
        assert!(MediaType::TUNING.accepts(MediaType::ANY));
        assert!(!MediaType::TUNING.accepts(MediaType::TRANSPORT));
    }

    #[test]
    fn test_slice_is_media_sample() {
        let data = vec![0x47u8; 188];
        let slice = data.as_slice();
        let sample: &dyn MediaSample = &slice;
        assert_eq!(sample.actual_len(), 188);
        assert_eq!(sample.buffer().unwrap()[0], 0x47);
    }
}
