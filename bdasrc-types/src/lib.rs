//! Shared types for the bdasrc transport stream capture source.
//!
//! This crate holds the plain data that flows between the capture core and
//! its hosts: tuner standards, user tuning parameters, the standard-specific
//! locators produced from them, and the identifiers used to find devices
//! and classify their internal topology.
//!
//! # Example
//!
//! ```rust
//! use bdasrc_types::{Modulation, NickTable, TunerStandard, TuningParameters};
//!
//! let mut params = TuningParameters::default();
//! params.frequency = 474_000;
//! params.modulation = Modulation::from_nick("QAM 64").unwrap();
//!
//! assert_eq!(params.modulation, Modulation::Qam64);
//! assert_eq!(TunerStandard::DvbC.name(), "DVB-C");
//! ```

pub mod error;
#[macro_use]
pub mod tables;
pub mod guid;
pub mod locator;
pub mod types;

pub use error::ParseValueError;
pub use guid::{DeviceCategory, Guid, NodeFunction};
pub use locator::{
    AtscLocator, DvbCLocator, DvbSLocator, DvbTLocator, LocatorDescriptor, TuneRequest,
};
pub use tables::NickTable;
pub use types::{
    FecMethod, FecRate, GuardInterval, HierarchyAlpha, Modulation, NetworkType, Polarisation,
    TransmissionMode, TunerStandard, TuningParameters, TuningSpace, DEFAULT_BANDWIDTH_MHZ,
    MAX_BANDWIDTH_MHZ, MAX_ORBITAL_POSITION, MIN_BANDWIDTH_MHZ,
};
