//! Standard-specific locators and tune requests.

use crate::types::{
    FecMethod, FecRate, GuardInterval, HierarchyAlpha, Modulation, Polarisation,
    TransmissionMode, TunerStandard, TuningSpace,
};

/// ATSC locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtscLocator {
    pub carrier_frequency: u32,
    pub modulation: Modulation,
}

/// DVB-C locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DvbCLocator {
    pub carrier_frequency: u32,
    pub symbol_rate: u32,
    pub modulation: Modulation,
    pub inner_fec: FecMethod,
    pub inner_fec_rate: FecRate,
    pub outer_fec: FecMethod,
    pub outer_fec_rate: FecRate,
}

/// DVB-T locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DvbTLocator {
    pub carrier_frequency: u32,
    /// Bandwidth in MHz.
    pub bandwidth: u8,
    pub guard_interval: GuardInterval,
    pub transmission_mode: TransmissionMode,
    pub modulation: Modulation,
    pub hierarchy_alpha: HierarchyAlpha,
    pub inner_fec: FecMethod,
    pub inner_fec_rate: FecRate,
    pub lp_inner_fec: FecMethod,
    pub lp_inner_fec_rate: FecRate,
}

/// DVB-S locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DvbSLocator {
    pub carrier_frequency: u32,
    pub symbol_rate: u32,
    pub modulation: Modulation,
    /// Satellite longitude in tenths of a degree.
    pub orbital_position: u16,
    pub west_position: bool,
    pub polarisation: Polarisation,
    pub inner_fec: FecMethod,
    pub inner_fec_rate: FecRate,
}

/// Where and how to tune, tagged by standard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocatorDescriptor {
    Atsc(AtscLocator),
    DvbC(DvbCLocator),
    DvbS(DvbSLocator),
    DvbT(DvbTLocator),
}

impl LocatorDescriptor {
    /// The standard this locator belongs to.
    pub fn standard(&self) -> TunerStandard {
        match self {
            LocatorDescriptor::Atsc(_) => TunerStandard::Atsc,
            LocatorDescriptor::DvbC(_) => TunerStandard::DvbC,
            LocatorDescriptor::DvbS(_) => TunerStandard::DvbS,
            LocatorDescriptor::DvbT(_) => TunerStandard::DvbT,
        }
    }

    /// Carrier frequency in kHz.
    pub fn carrier_frequency(&self) -> u32 {
        match self {
            LocatorDescriptor::Atsc(l) => l.carrier_frequency,
            LocatorDescriptor::DvbC(l) => l.carrier_frequency,
            LocatorDescriptor::DvbS(l) => l.carrier_frequency,
            LocatorDescriptor::DvbT(l) => l.carrier_frequency,
        }
    }

    /// Modulation carried by the locator.
    pub fn modulation(&self) -> Modulation {
        match self {
            LocatorDescriptor::Atsc(l) => l.modulation,
            LocatorDescriptor::DvbC(l) => l.modulation,
            LocatorDescriptor::DvbS(l) => l.modulation,
            LocatorDescriptor::DvbT(l) => l.modulation,
        }
    }
}

/// A locator bound to the tuning space it is submitted through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TuneRequest {
    pub space: &'static TuningSpace,
    pub locator: LocatorDescriptor,
}

impl TuneRequest {
    pub fn standard(&self) -> TunerStandard {
        self.space.standard
    }
}
