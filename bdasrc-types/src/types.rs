//! Tuner standards, tuning parameters and their enumerated values.

use serde::{Deserialize, Serialize};

/// Lowest accepted terrestrial channel bandwidth, in MHz.
pub const MIN_BANDWIDTH_MHZ: u8 = 5;

/// Highest accepted terrestrial channel bandwidth, in MHz.
pub const MAX_BANDWIDTH_MHZ: u8 = 8;

/// Default terrestrial channel bandwidth, in MHz.
pub const DEFAULT_BANDWIDTH_MHZ: u8 = 8;

/// Highest orbital position, in tenths of a degree (180.0°).
pub const MAX_ORBITAL_POSITION: u16 = 1800;

/// Broadcast standard implemented by a tuner device.
///
/// Determined once per session from the device topology and never changed
/// afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TunerStandard {
    /// Detection was inconclusive.
    #[default]
    Unknown,
    /// ATSC terrestrial (8VSB).
    Atsc,
    /// DVB-C cable (QAM).
    DvbC,
    /// DVB-S satellite (QPSK).
    DvbS,
    /// DVB-T terrestrial (COFDM).
    DvbT,
}

nick_table!(TunerStandard, "input type", {
    TunerStandard::Unknown => "UNKNOWN",
    TunerStandard::Atsc => "ATSC",
    TunerStandard::DvbC => "DVB-C",
    TunerStandard::DvbS => "DVB-S",
    TunerStandard::DvbT => "DVB-T",
});

impl TunerStandard {
    /// Display name of the standard.
    pub fn name(self) -> &'static str {
        crate::tables::NickTable::nick(self)
    }

    /// Network type driven by a network provider for this standard.
    pub fn network_type(self) -> Option<NetworkType> {
        match self {
            TunerStandard::Unknown => None,
            TunerStandard::Atsc => Some(NetworkType::AtscTerrestrial),
            TunerStandard::DvbC => Some(NetworkType::DvbCable),
            TunerStandard::DvbS => Some(NetworkType::DvbSatellite),
            TunerStandard::DvbT => Some(NetworkType::DvbTerrestrial),
        }
    }

    /// The tuning space used for this standard.
    pub fn tuning_space(self) -> Option<&'static TuningSpace> {
        TUNING_SPACES.iter().find(|space| space.standard == self)
    }
}

/// Network type of a network provider stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NetworkType {
    AtscTerrestrial,
    DvbCable,
    DvbSatellite,
    DvbTerrestrial,
}

impl NetworkType {
    /// Name of the network type as registered by the driver stack.
    pub fn as_str(self) -> &'static str {
        match self {
            NetworkType::AtscTerrestrial => "ATSC_TERRESTRIAL_TV_NETWORK_TYPE",
            NetworkType::DvbCable => "DVB_CABLE_TV_NETWORK_TYPE",
            NetworkType::DvbSatellite => "DVB_SATELLITE_TV_NETWORK_TYPE",
            NetworkType::DvbTerrestrial => "DVB_TERRESTRIAL_TV_NETWORK_TYPE",
        }
    }
}

/// A named collection of tuning defaults for one network type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TuningSpace {
    /// Standard this space tunes.
    pub standard: TunerStandard,
    /// Unique name used to look the space up in the system container.
    pub unique_name: &'static str,
    /// Friendly name shown to users.
    pub friendly_name: &'static str,
    /// Network type of the provider that consumes requests from this space.
    pub network_type: NetworkType,
}

/// Tuning spaces, one per supported standard.
pub static TUNING_SPACES: [TuningSpace; 4] = [
    TuningSpace {
        standard: TunerStandard::Atsc,
        unique_name: "bdasrc ATSC",
        friendly_name: "ATSC",
        network_type: NetworkType::AtscTerrestrial,
    },
    TuningSpace {
        standard: TunerStandard::DvbC,
        unique_name: "bdasrc DVB-C",
        friendly_name: "DVB-C",
        network_type: NetworkType::DvbCable,
    },
    TuningSpace {
        standard: TunerStandard::DvbS,
        unique_name: "bdasrc DVB-S",
        friendly_name: "DVB-S",
        network_type: NetworkType::DvbSatellite,
    },
    TuningSpace {
        standard: TunerStandard::DvbT,
        unique_name: "bdasrc DVB-T",
        friendly_name: "DVB-T",
        network_type: NetworkType::DvbTerrestrial,
    },
];

/// Carrier modulation scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modulation {
    Qpsk,
    Qam16,
    Qam32,
    Qam64,
    Qam128,
    Qam256,
    Vsb8,
    Vsb16,
    NotSet,
}

nick_table!(Modulation, "modulation", {
    Modulation::Qpsk => "QPSK",
    Modulation::Qam16 => "QAM 16",
    Modulation::Qam32 => "QAM 32",
    Modulation::Qam64 => "QAM 64",
    Modulation::Qam128 => "QAM 128",
    Modulation::Qam256 => "QAM 256",
    Modulation::Vsb8 => "8VSB",
    Modulation::Vsb16 => "16VSB",
    Modulation::NotSet => "NONE",
});

/// Forward error correction method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FecMethod {
    NotSet,
    Viterbi,
    ReedSolomon204,
}

nick_table!(FecMethod, "FEC method", {
    FecMethod::NotSet => "NONE",
    FecMethod::Viterbi => "VITERBI",
    FecMethod::ReedSolomon204 => "RS-204/188",
});

/// Binary convolution code rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FecRate {
    NotSet,
    Rate1_2,
    Rate2_3,
    Rate3_4,
    Rate4_5,
    Rate5_6,
    Rate6_7,
    Rate7_8,
    Rate8_9,
}

nick_table!(FecRate, "code rate", {
    FecRate::NotSet => "NONE",
    FecRate::Rate1_2 => "1/2",
    FecRate::Rate2_3 => "2/3",
    FecRate::Rate3_4 => "3/4",
    FecRate::Rate4_5 => "4/5",
    FecRate::Rate5_6 => "5/6",
    FecRate::Rate6_7 => "6/7",
    FecRate::Rate7_8 => "7/8",
    FecRate::Rate8_9 => "8/9",
});

/// DVB-T guard interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GuardInterval {
    Guard1_32,
    Guard1_16,
    Guard1_8,
    Guard1_4,
    NotSet,
}

nick_table!(GuardInterval, "guard interval", {
    GuardInterval::Guard1_32 => "32",
    GuardInterval::Guard1_16 => "16",
    GuardInterval::Guard1_8 => "8",
    GuardInterval::Guard1_4 => "4",
    GuardInterval::NotSet => "NONE",
});

/// DVB-T transmission mode (FFT size).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransmissionMode {
    Mode2K,
    Mode8K,
    NotSet,
}

nick_table!(TransmissionMode, "transmission mode", {
    TransmissionMode::Mode2K => "2k",
    TransmissionMode::Mode8K => "8k",
    TransmissionMode::NotSet => "NONE",
});

/// DVB-T hierarchy alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HierarchyAlpha {
    NotSet,
    Alpha1,
    Alpha2,
    Alpha4,
}

nick_table!(HierarchyAlpha, "hierarchy", {
    HierarchyAlpha::NotSet => "NONE",
    HierarchyAlpha::Alpha1 => "1",
    HierarchyAlpha::Alpha2 => "2",
    HierarchyAlpha::Alpha4 => "4",
});

/// DVB-S signal polarisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Polarisation {
    NotSet,
    LinearH,
    LinearV,
    CircularL,
    CircularR,
}

nick_table!(Polarisation, "polarisation", {
    Polarisation::NotSet => "NONE",
    Polarisation::LinearH => "H",
    Polarisation::LinearV => "V",
    Polarisation::CircularL => "L",
    Polarisation::CircularR => "R",
});

/// User supplied tuning parameters.
///
/// One flat record serves every standard; the mapper only reads the fields
/// that are relevant to the detected standard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TuningParameters {
    /// Carrier frequency in kHz.
    pub frequency: u32,
    /// Symbol rate in kHz (DVB-C, DVB-S).
    pub symbol_rate: u32,
    /// Channel bandwidth in MHz (DVB-T).
    pub bandwidth: u8,
    /// Modulation (ATSC, DVB-C, DVB-T, DVB-S).
    pub modulation: Modulation,
    /// Guard interval (DVB-T).
    pub guard_interval: GuardInterval,
    /// Transmission mode (DVB-T).
    pub transmission_mode: TransmissionMode,
    /// Hierarchy alpha (DVB-T).
    pub hierarchy: HierarchyAlpha,
    /// DVB-S: satellite longitude in tenths of a degree.
    pub orbital_position: u16,
    /// DVB-S: true for west longitude.
    pub west_position: bool,
    /// Polarisation (DVB-S).
    pub polarisation: Polarisation,
    /// Inner FEC rate (DVB-S).
    pub inner_fec_rate: FecRate,
}

impl Default for TuningParameters {
    fn default() -> Self {
        Self {
            frequency: 0,
            symbol_rate: 0,
            bandwidth: DEFAULT_BANDWIDTH_MHZ,
            modulation: Modulation::Qam16,
            guard_interval: GuardInterval::Guard1_16,
            transmission_mode: TransmissionMode::Mode8K,
            hierarchy: HierarchyAlpha::NotSet,
            orbital_position: 0,
            west_position: false,
            polarisation: Polarisation::NotSet,
            inner_fec_rate: FecRate::NotSet,
        }
    }
}
