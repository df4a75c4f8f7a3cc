//! Live MPEG-2 transport stream capture from broadcast tuner devices.
//!
//! A [`Session`] binds a tuner from a [`DeviceDirectory`], detects which
//! broadcast standard it implements, builds a processing graph around it
//! and turns the driver's push-style sample delivery into a bounded,
//! pull-style byte stream.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use bdasrc::backend::sim::{SimDirectory, SimFactory, SimSignal, SimStage};
//! use bdasrc::{DeviceCategory, Session, SessionState, TunerStandard};
//!
//! let directory = Arc::new(SimDirectory::new());
//! directory.add_device(
//!     DeviceCategory::NetworkTuner,
//!     Some("Sim Tuner"),
//!     SimStage::tuner("Sim Tuner", TunerStandard::DvbC, SimSignal::locked()),
//! );
//!
//! let session = Session::new(directory, Arc::new(SimFactory::new()));
//! session.set_property("frequency", 474_000u32).unwrap();
//! session.set_property("modulation", "QAM 64").unwrap();
//!
//! assert!(session.create_graph());
//! assert!(session.start_tuning());
//! assert_eq!(session.state(), SessionState::Running);
//!
//! session.stop();
//! ```

pub mod backend;
pub mod bridge;
pub mod config;
pub mod detect;
pub mod device;
pub mod factory;
pub mod graph;
pub mod mapper;
pub mod properties;
pub mod queue;
pub mod session;

pub use bdasrc_types::{
    DeviceCategory, LocatorDescriptor, NickTable, TuneRequest, TunerStandard, TuningParameters,
};

pub use bridge::DeliveryBridge;
pub use config::SessionConfig;
pub use device::{DeviceDirectory, DeviceDiscovery, DeviceHandle, DeviceMoniker, DirectoryError};
pub use factory::{StageFactory, StageKind};
pub use graph::{ProcessingGraph, ProcessingStage, StageError};
pub use properties::{PropertyError, PropertyValue, PROPERTIES};
pub use queue::{CapturedBuffer, Flushing, SampleQueue};
pub use session::{FrontendStats, Session, SessionError, SessionState};
