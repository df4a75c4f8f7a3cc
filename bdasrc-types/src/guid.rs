//! Device category and topology node identifiers.

use std::fmt;

/// A 128-bit globally unique identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Guid(pub u128);

impl Guid {
    /// Build a GUID from its canonical field layout.
    pub const fn from_fields(data1: u32, data2: u16, data3: u16, data4: [u8; 8]) -> Self {
        let mut value = (data1 as u128) << 96 | (data2 as u128) << 80 | (data3 as u128) << 64;
        let mut i = 0;
        while i < 8 {
            value |= (data4[i] as u128) << (56 - 8 * i);
            i += 1;
        }
        Guid(value)
    }

    /// The zero GUID.
    pub const NULL: Guid = Guid(0);
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = self.0;
        write!(
            f,
            "{{{:08x}-{:04x}-{:04x}-{:04x}-{:012x}}}",
            (v >> 96) as u32,
            (v >> 80) as u16,
            (v >> 64) as u16,
            (v >> 48) as u16,
            v & 0xFFFF_FFFF_FFFF
        )
    }
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Device categories that can be enumerated from the device directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceCategory {
    /// Network tuner devices (the hardware front end).
    NetworkTuner,
    /// Receiver components sitting between a tuner and the capture stage.
    ReceiverComponent,
    /// Transport information stages fed by the demultiplexer.
    TransportInformation,
}

impl DeviceCategory {
    /// Category identifier registered by the driver stack.
    pub const fn guid(self) -> Guid {
        match self {
            DeviceCategory::NetworkTuner => Guid::from_fields(
                0x71985f48,
                0x1ca1,
                0x11d3,
                [0x9c, 0xc8, 0x00, 0xc0, 0x4f, 0x79, 0x71, 0xe0],
            ),
            DeviceCategory::ReceiverComponent => Guid::from_fields(
                0xfd0a5af4,
                0xb41d,
                0x11d2,
                [0x9c, 0x95, 0x00, 0xc0, 0x4f, 0x79, 0x71, 0xe0],
            ),
            DeviceCategory::TransportInformation => Guid::from_fields(
                0xa2e3074f,
                0x6c3d,
                0x11d3,
                [0xb6, 0x53, 0x00, 0xc0, 0x4f, 0x79, 0x49, 0x8e],
            ),
        }
    }

    /// Short name for logging.
    pub fn as_str(self) -> &'static str {
        match self {
            DeviceCategory::NetworkTuner => "network tuner",
            DeviceCategory::ReceiverComponent => "receiver component",
            DeviceCategory::TransportInformation => "transport information",
        }
    }
}

impl fmt::Display for DeviceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Functional node identifiers reported by a tuner device topology.
pub struct NodeFunction;

impl NodeFunction {
    /// QAM demodulator (DVB-C).
    pub const QAM_DEMODULATOR: Guid = Guid::from_fields(
        0x71985f4d,
        0x1ca1,
        0x11d3,
        [0x9c, 0xc8, 0x00, 0xc0, 0x4f, 0x79, 0x71, 0xe0],
    );
    /// QPSK demodulator (DVB-S).
    pub const QPSK_DEMODULATOR: Guid = Guid::from_fields(
        0x6390c905,
        0x27c1,
        0x4d67,
        [0xbd, 0xb7, 0x77, 0xc5, 0x0d, 0x07, 0x93, 0x00],
    );
    /// COFDM demodulator (DVB-T).
    pub const COFDM_DEMODULATOR: Guid = Guid::from_fields(
        0x2dac6e05,
        0xedbe,
        0x4b9c,
        [0xb3, 0x87, 0x1b, 0x6f, 0xad, 0x7d, 0x64, 0x95],
    );
    /// 8VSB demodulator (ATSC).
    pub const VSB8_DEMODULATOR: Guid = Guid::from_fields(
        0x71985f4f,
        0x1ca1,
        0x11d3,
        [0x9c, 0xc8, 0x00, 0xc0, 0x4f, 0x79, 0x71, 0xe0],
    );
}
