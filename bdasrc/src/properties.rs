//! Session property table.
//!
//! Every tunable is exposed as a named property with a fixed range and
//! default. Enumerated properties are read back as their nick and accept
//! either a nick or the typed value.

use std::fmt;

use bdasrc_types::{
    FecRate, GuardInterval, HierarchyAlpha, Modulation, NickTable, ParseValueError,
    Polarisation, TransmissionMode, TunerStandard, DEFAULT_BANDWIDTH_MHZ, MAX_BANDWIDTH_MHZ,
    MAX_ORBITAL_POSITION, MIN_BANDWIDTH_MHZ,
};
use thiserror::Error;

use crate::config::{SessionConfig, MAX_DEVICE_INDEX};
use crate::queue::DEFAULT_CAPACITY;

/// Value type and constraints of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Int { min: i64, max: i64, default: i64 },
    Bool { default: bool },
    Enum {
        nicks: &'static [&'static str],
        default: &'static str,
    },
    Text,
}

impl PropertyKind {
    fn type_name(&self) -> &'static str {
        match self {
            PropertyKind::Int { .. } => "integer",
            PropertyKind::Bool { .. } => "boolean",
            PropertyKind::Enum { .. } | PropertyKind::Text => "string",
        }
    }
}

/// Description of one property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertySpec {
    pub name: &'static str,
    pub nick: &'static str,
    pub blurb: &'static str,
    pub kind: PropertyKind,
    pub writable: bool,
}

/// All session properties.
pub static PROPERTIES: &[PropertySpec] = &[
    PropertySpec {
        name: "device-index",
        nick: "Device index",
        blurb: "Ordinal of the tuner device to use",
        kind: PropertyKind::Int {
            min: 0,
            max: MAX_DEVICE_INDEX as i64,
            default: 0,
        },
        writable: true,
    },
    PropertySpec {
        name: "device-name",
        nick: "Device name",
        blurb: "Friendly name of the bound tuner device",
        kind: PropertyKind::Text,
        writable: false,
    },
    PropertySpec {
        name: "input-type",
        nick: "Input type",
        blurb: "Broadcast standard detected on the tuner device",
        kind: PropertyKind::Enum {
            nicks: TunerStandard::NICKS,
            default: "UNKNOWN",
        },
        writable: false,
    },
    PropertySpec {
        name: "frequency",
        nick: "Frequency",
        blurb: "Carrier frequency in kHz",
        kind: PropertyKind::Int {
            min: 0,
            max: u32::MAX as i64,
            default: 0,
        },
        writable: true,
    },
    PropertySpec {
        name: "symbol-rate",
        nick: "Symbol rate",
        blurb: "Symbol rate in kHz (DVB-C, DVB-S)",
        kind: PropertyKind::Int {
            min: 0,
            max: u32::MAX as i64,
            default: 0,
        },
        writable: true,
    },
    PropertySpec {
        name: "bandwidth",
        nick: "Bandwidth",
        blurb: "Channel bandwidth in MHz (DVB-T)",
        kind: PropertyKind::Int {
            min: MIN_BANDWIDTH_MHZ as i64,
            max: MAX_BANDWIDTH_MHZ as i64,
            default: DEFAULT_BANDWIDTH_MHZ as i64,
        },
        writable: true,
    },
    PropertySpec {
        name: "modulation",
        nick: "Modulation",
        blurb: "Modulation (ATSC, DVB-C, DVB-T, DVB-S)",
        kind: PropertyKind::Enum {
            nicks: Modulation::NICKS,
            default: "QAM 16",
        },
        writable: true,
    },
    PropertySpec {
        name: "guard-interval",
        nick: "Guard interval",
        blurb: "Guard interval (DVB-T)",
        kind: PropertyKind::Enum {
            nicks: GuardInterval::NICKS,
            default: "16",
        },
        writable: true,
    },
    PropertySpec {
        name: "transmission-mode",
        nick: "Transmission mode",
        blurb: "Transmission mode (DVB-T)",
        kind: PropertyKind::Enum {
            nicks: TransmissionMode::NICKS,
            default: "8k",
        },
        writable: true,
    },
    PropertySpec {
        name: "hierarchy",
        nick: "Hierarchy",
        blurb: "Hierarchy alpha (DVB-T)",
        kind: PropertyKind::Enum {
            nicks: HierarchyAlpha::NICKS,
            default: "NONE",
        },
        writable: true,
    },
    PropertySpec {
        name: "orbital-position",
        nick: "Orbital position",
        blurb: "Satellite longitude in tenths of a degree (DVB-S)",
        kind: PropertyKind::Int {
            min: 0,
            max: MAX_ORBITAL_POSITION as i64,
            default: 0,
        },
        writable: true,
    },
    PropertySpec {
        name: "west-position",
        nick: "West position",
        blurb: "Satellite longitude is west (DVB-S)",
        kind: PropertyKind::Bool { default: false },
        writable: true,
    },
    PropertySpec {
        name: "polarisation",
        nick: "Polarisation",
        blurb: "Signal polarisation (DVB-S)",
        kind: PropertyKind::Enum {
            nicks: Polarisation::NICKS,
            default: "NONE",
        },
        writable: true,
    },
    PropertySpec {
        name: "inner-fec-rate",
        nick: "Inner FEC rate",
        blurb: "Inner forward error correction rate (DVB-S)",
        kind: PropertyKind::Enum {
            nicks: FecRate::NICKS,
            default: "NONE",
        },
        writable: true,
    },
    PropertySpec {
        name: "buffer-size",
        nick: "Buffer size",
        blurb: "Number of captured buffers kept before the oldest is dropped",
        kind: PropertyKind::Int {
            min: 1,
            max: u32::MAX as i64,
            default: DEFAULT_CAPACITY as i64,
        },
        writable: true,
    },
];

/// Look a property up by name.
pub fn find(name: &str) -> Option<&'static PropertySpec> {
    PROPERTIES.iter().find(|spec| spec.name == name)
}

/// A property value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Int(i64),
    Bool(bool),
    Text(String),
}

impl PropertyValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            PropertyValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Int(v) => write!(f, "{}", v),
            PropertyValue::Bool(v) => write!(f, "{}", v),
            PropertyValue::Text(v) => f.write_str(v),
        }
    }
}

macro_rules! from_int {
    ($($ty:ty),+) => {
        $(impl From<$ty> for PropertyValue {
            fn from(v: $ty) -> Self {
                PropertyValue::Int(v as i64)
            }
        })+
    };
}

macro_rules! from_nick {
    ($($ty:ty),+) => {
        $(impl From<$ty> for PropertyValue {
            fn from(v: $ty) -> Self {
                PropertyValue::Text(v.nick().to_string())
            }
        })+
    };
}

from_int!(i32, i64, u8, u16, u32, usize);
from_nick!(
    Modulation,
    GuardInterval,
    TransmissionMode,
    HierarchyAlpha,
    Polarisation,
    FecRate,
    TunerStandard
);

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        PropertyValue::Bool(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        PropertyValue::Text(v.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        PropertyValue::Text(v)
    }
}

/// Property access errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PropertyError {
    #[error("Unknown property '{0}'")]
    Unknown(String),

    #[error("Property '{0}' is read-only")]
    ReadOnly(&'static str),

    #[error("Property '{name}' expects a {expected} value")]
    TypeMismatch {
        name: &'static str,
        expected: &'static str,
    },

    #[error("Property '{name}' value {value} is out of range {min}..={max}")]
    OutOfRange {
        name: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("Property '{name}': {source}")]
    InvalidValue {
        name: &'static str,
        #[source]
        source: ParseValueError,
    },

    #[error("Property '{0}' cannot be changed while the session is active")]
    SessionActive(&'static str),
}

impl PropertySpec {
    /// Parse a textual value, e.g. from a command line, into this
    /// property's value type. Ranges and nicks are checked on write.
    pub fn parse(&self, text: &str) -> Result<PropertyValue, PropertyError> {
        let text = text.trim();
        match self.kind {
            PropertyKind::Int { .. } => text
                .parse::<i64>()
                .map(PropertyValue::Int)
                .map_err(|_| self.mismatch()),
            PropertyKind::Bool { .. } => match text.to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Ok(PropertyValue::Bool(true)),
                "false" | "no" | "off" | "0" => Ok(PropertyValue::Bool(false)),
                _ => Err(self.mismatch()),
            },
            PropertyKind::Enum { .. } | PropertyKind::Text => Ok(PropertyValue::Text(text.to_string())),
        }
    }

    fn mismatch(&self) -> PropertyError {
        PropertyError::TypeMismatch {
            name: self.name,
            expected: self.kind.type_name(),
        }
    }

    fn int(&self, value: &PropertyValue) -> Result<i64, PropertyError> {
        match (self.kind, value) {
            (PropertyKind::Int { min, max, .. }, PropertyValue::Int(v)) => {
                if *v < min || *v > max {
                    Err(PropertyError::OutOfRange {
                        name: self.name,
                        value: *v,
                        min,
                        max,
                    })
                } else {
                    Ok(*v)
                }
            }
            _ => Err(self.mismatch()),
        }
    }

    fn boolean(&self, value: &PropertyValue) -> Result<bool, PropertyError> {
        match (self.kind, value) {
            (PropertyKind::Bool { .. }, PropertyValue::Bool(v)) => Ok(*v),
            _ => Err(self.mismatch()),
        }
    }

    fn nick<T: NickTable>(&self, value: &PropertyValue) -> Result<T, PropertyError> {
        match (self.kind, value) {
            (PropertyKind::Enum { .. }, PropertyValue::Text(v)) => {
                T::from_nick(v).map_err(|source| PropertyError::InvalidValue {
                    name: self.name,
                    source,
                })
            }
            _ => Err(self.mismatch()),
        }
    }

    fn apply_to(&self, config: &mut SessionConfig, value: &PropertyValue) -> Result<(), PropertyError> {
        if !self.writable {
            return Err(PropertyError::ReadOnly(self.name));
        }

        let tuning = &mut config.tuning;
        match self.name {
            "device-index" => config.device_index = self.int(value)? as u32,
            "frequency" => tuning.frequency = self.int(value)? as u32,
            "symbol-rate" => tuning.symbol_rate = self.int(value)? as u32,
            "bandwidth" => tuning.bandwidth = self.int(value)? as u8,
            "modulation" => tuning.modulation = self.nick(value)?,
            "guard-interval" => tuning.guard_interval = self.nick(value)?,
            "transmission-mode" => tuning.transmission_mode = self.nick(value)?,
            "hierarchy" => tuning.hierarchy = self.nick(value)?,
            "orbital-position" => tuning.orbital_position = self.int(value)? as u16,
            "west-position" => tuning.west_position = self.boolean(value)?,
            "polarisation" => tuning.polarisation = self.nick(value)?,
            "inner-fec-rate" => tuning.inner_fec_rate = self.nick(value)?,
            "buffer-size" => config.buffer_size = self.int(value)? as usize,
            _ => return Err(PropertyError::Unknown(self.name.to_string())),
        }
        Ok(())
    }
}

/// Write a property into a configuration.
pub fn set(
    config: &mut SessionConfig,
    name: &str,
    value: &PropertyValue,
) -> Result<&'static PropertySpec, PropertyError> {
    let spec = find(name).ok_or_else(|| PropertyError::Unknown(name.to_string()))?;
    spec.apply_to(config, value)?;
    Ok(spec)
}

/// Check every writable property of a configuration against its range.
pub fn validate_config(config: &SessionConfig) -> Result<(), PropertyError> {
    let mut scratch = SessionConfig::default();
    for spec in PROPERTIES.iter().filter(|spec| spec.writable) {
        let value = get(config, spec.name, "", TunerStandard::Unknown)?;
        spec.apply_to(&mut scratch, &value)?;
    }
    Ok(())
}

/// Read a property.
///
/// `device_name` and `standard` back the read-only properties.
pub fn get(
    config: &SessionConfig,
    name: &str,
    device_name: &str,
    standard: TunerStandard,
) -> Result<PropertyValue, PropertyError> {
    let tuning = &config.tuning;
    let value: PropertyValue = match name {
        "device-index" => config.device_index.into(),
        "device-name" => device_name.into(),
        "input-type" => standard.into(),
        "frequency" => tuning.frequency.into(),
        "symbol-rate" => tuning.symbol_rate.into(),
        "bandwidth" => tuning.bandwidth.into(),
        "modulation" => tuning.modulation.into(),
        "guard-interval" => tuning.guard_interval.into(),
        "transmission-mode" => tuning.transmission_mode.into(),
        "hierarchy" => tuning.hierarchy.into(),
        "orbital-position" => tuning.orbital_position.into(),
        "west-position" => tuning.west_position.into(),
        "polarisation" => tuning.polarisation.into(),
        "inner-fec-rate" => tuning.inner_fec_rate.into(),
        "buffer-size" => config.buffer_size.into(),
        _ => return Err(PropertyError::Unknown(name.to_string())),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_config() {
        let config = SessionConfig::default();
        for spec in PROPERTIES {
            let value = get(&config, spec.name, "", TunerStandard::Unknown).unwrap();
            match spec.kind {
                PropertyKind::Int { default, .. } => {
                    assert_eq!(value, PropertyValue::Int(default), "{}", spec.name)
                }
                PropertyKind::Bool { default } => {
                    assert_eq!(value, PropertyValue::Bool(default), "{}", spec.name)
                }
                PropertyKind::Enum { default, nicks } => {
                    assert_eq!(value.as_str(), Some(default), "{}", spec.name);
                    assert!(nicks.contains(&default), "{}", spec.name);
                }
                PropertyKind::Text => assert_eq!(value.as_str(), Some(""), "{}", spec.name),
            }
        }
    }

    #[test]
    fn test_set_typed_and_nick() {
        let mut config = SessionConfig::default();
        set(&mut config, "modulation", &Modulation::Qam64.into()).unwrap();
        assert_eq!(config.tuning.modulation, Modulation::Qam64);

        set(&mut config, "modulation", &"qam 256".into()).unwrap();
        assert_eq!(config.tuning.modulation, Modulation::Qam256);

        set(&mut config, "transmission-mode", &"2K".into()).unwrap();
        assert_eq!(config.tuning.transmission_mode, TransmissionMode::Mode2K);

        set(&mut config, "frequency", &474_000u32.into()).unwrap();
        set(&mut config, "west-position", &true.into()).unwrap();
        assert_eq!(config.tuning.frequency, 474_000);
        assert!(config.tuning.west_position);
    }

    #[test]
    fn test_range_checks() {
        let mut config = SessionConfig::default();
        assert_eq!(
            set(&mut config, "bandwidth", &PropertyValue::Int(9)),
            Err(PropertyError::OutOfRange {
                name: "bandwidth",
                value: 9,
                min: 5,
                max: 8
            })
        );
        assert!(set(&mut config, "bandwidth", &PropertyValue::Int(5)).is_ok());
        assert!(set(&mut config, "device-index", &PropertyValue::Int(65)).is_err());
        assert!(set(&mut config, "device-index", &PropertyValue::Int(64)).is_ok());
        assert!(set(&mut config, "buffer-size", &PropertyValue::Int(0)).is_err());
        assert!(set(&mut config, "orbital-position", &PropertyValue::Int(1801)).is_err());
        assert!(set(&mut config, "frequency", &PropertyValue::Int(-1)).is_err());
    }

    #[test]
    fn test_rejected_writes() {
        let mut config = SessionConfig::default();
        assert_eq!(
            set(&mut config, "device-name", &"x".into()),
            Err(PropertyError::ReadOnly("device-name"))
        );
        assert_eq!(
            set(&mut config, "nope", &PropertyValue::Int(1)),
            Err(PropertyError::Unknown("nope".into()))
        );
        assert!(matches!(
            set(&mut config, "frequency", &"474000".into()),
            Err(PropertyError::TypeMismatch { .. })
        ));
        assert!(matches!(
            set(&mut config, "guard-interval", &"1/64".into()),
            Err(PropertyError::InvalidValue { .. })
        ));
        assert_eq!(config, SessionConfig::default());
    }

    #[test]
    fn test_validate_config() {
        assert!(validate_config(&SessionConfig::default()).is_ok());

        let mut config = SessionConfig::default();
        config.tuning.orbital_position = 2000;
        assert!(matches!(
            validate_config(&config),
            Err(PropertyError::OutOfRange { name: "orbital-position", .. })
        ));

        let config = SessionConfig {
            buffer_size: 0,
            ..Default::default()
        };
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_parse_text() {
        let frequency = find("frequency").unwrap();
        assert_eq!(frequency.parse(" 474000 "), Ok(PropertyValue::Int(474_000)));
        assert!(matches!(
            frequency.parse("474MHz"),
            Err(PropertyError::TypeMismatch { .. })
        ));

        let west = find("west-position").unwrap();
        assert_eq!(west.parse("yes"), Ok(PropertyValue::Bool(true)));
        assert_eq!(west.parse("0"), Ok(PropertyValue::Bool(false)));
        assert!(west.parse("maybe").is_err());

        let mut config = SessionConfig::default();
        let value = find("polarisation").unwrap().parse("h").unwrap();
        set(&mut config, "polarisation", &value).unwrap();
        assert_eq!(config.tuning.polarisation, Polarisation::LinearH);
    }
}
