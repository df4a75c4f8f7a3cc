//! Tuning parameters to locator mapping.

use bdasrc_types::{
    AtscLocator, DvbCLocator, DvbSLocator, DvbTLocator, FecMethod, FecRate, LocatorDescriptor,
    TunerStandard, TuningParameters,
};
use thiserror::Error;

/// Mapping errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MapError {
    #[error("Unsupported tuner standard: {0}")]
    UnsupportedStandard(TunerStandard),
}

/// Build the locator for `standard` from the fields of `params` that the
/// standard uses.
///
/// FEC settings are left unspecified for ATSC, DVB-C and DVB-T. DVB-S
/// carries the configured inner FEC rate.
pub fn map(
    standard: TunerStandard,
    params: &TuningParameters,
) -> Result<LocatorDescriptor, MapError> {
    let locator = match standard {
        TunerStandard::Unknown => return Err(MapError::UnsupportedStandard(standard)),
        TunerStandard::Atsc => LocatorDescriptor::Atsc(AtscLocator {
            carrier_frequency: params.frequency,
            modulation: params.modulation,
        }),
        TunerStandard::DvbC => LocatorDescriptor::DvbC(DvbCLocator {
            carrier_frequency: params.frequency,
            symbol_rate: params.symbol_rate,
            modulation: params.modulation,
            inner_fec: FecMethod::NotSet,
            inner_fec_rate: FecRate::NotSet,
            outer_fec: FecMethod::NotSet,
            outer_fec_rate: FecRate::NotSet,
        }),
        TunerStandard::DvbT => LocatorDescriptor::DvbT(DvbTLocator {
            carrier_frequency: params.frequency,
            bandwidth: params.bandwidth,
            guard_interval: params.guard_interval,
            transmission_mode: params.transmission_mode,
            modulation: params.modulation,
            hierarchy_alpha: params.hierarchy,
            inner_fec: FecMethod::NotSet,
            inner_fec_rate: FecRate::NotSet,
            lp_inner_fec: FecMethod::NotSet,
            lp_inner_fec_rate: FecRate::NotSet,
        }),
        TunerStandard::DvbS => LocatorDescriptor::DvbS(DvbSLocator {
            carrier_frequency: params.frequency,
            symbol_rate: params.symbol_rate,
            modulation: params.modulation,
            orbital_position: params.orbital_position,
            west_position: params.west_position,
            polarisation: params.polarisation,
            inner_fec: FecMethod::NotSet,
            inner_fec_rate: params.inner_fec_rate,
        }),
    };
    Ok(locator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bdasrc_types::{GuardInterval, HierarchyAlpha, Modulation, Polarisation, TransmissionMode};

    #[test]
    fn test_dvb_c() {
        let params = TuningParameters {
            frequency: 474_000,
            symbol_rate: 6_900,
            modulation: Modulation::Qam64,
            // Ignored for cable.
            inner_fec_rate: FecRate::Rate3_4,
            ..Default::default()
        };

        let locator = map(TunerStandard::DvbC, &params).unwrap();
        assert_eq!(
            locator,
            LocatorDescriptor::DvbC(DvbCLocator {
                carrier_frequency: 474_000,
                symbol_rate: 6_900,
                modulation: Modulation::Qam64,
                inner_fec: FecMethod::NotSet,
                inner_fec_rate: FecRate::NotSet,
                outer_fec: FecMethod::NotSet,
                outer_fec_rate: FecRate::NotSet,
            })
        );
    }

    #[test]
    fn test_dvb_t() {
        let params = TuningParameters {
            frequency: 506_000,
            bandwidth: 7,
            guard_interval: GuardInterval::Guard1_8,
            transmission_mode: TransmissionMode::Mode2K,
            modulation: Modulation::Qam64,
            hierarchy: HierarchyAlpha::Alpha2,
            ..Default::default()
        };

        let LocatorDescriptor::DvbT(locator) = map(TunerStandard::DvbT, &params).unwrap() else {
            panic!("expected a DVB-T locator");
        };
        assert_eq!(locator.carrier_frequency, 506_000);
        assert_eq!(locator.bandwidth, 7);
        assert_eq!(locator.guard_interval, GuardInterval::Guard1_8);
        assert_eq!(locator.transmission_mode, TransmissionMode::Mode2K);
        assert_eq!(locator.hierarchy_alpha, HierarchyAlpha::Alpha2);
        assert_eq!(locator.inner_fec_rate, FecRate::NotSet);
        assert_eq!(locator.lp_inner_fec, FecMethod::NotSet);
        assert_eq!(locator.lp_inner_fec_rate, FecRate::NotSet);
    }

    #[test]
    fn test_dvb_s_keeps_fec_rate() {
        let params = TuningParameters {
            frequency: 11_778_000,
            symbol_rate: 27_500,
            modulation: Modulation::Qpsk,
            orbital_position: 192,
            west_position: false,
            polarisation: Polarisation::LinearV,
            inner_fec_rate: FecRate::Rate3_4,
            ..Default::default()
        };

        let LocatorDescriptor::DvbS(locator) = map(TunerStandard::DvbS, &params).unwrap() else {
            panic!("expected a DVB-S locator");
        };
        assert_eq!(locator.inner_fec_rate, FecRate::Rate3_4);
        assert_eq!(locator.orbital_position, 192);
        assert_eq!(locator.polarisation, Polarisation::LinearV);
        assert_eq!(locator.symbol_rate, 27_500);
    }

    #[test]
    fn test_atsc() {
        let params = TuningParameters {
            frequency: 557_000,
            modulation: Modulation::Vsb8,
            ..Default::default()
        };
        assert_eq!(
            map(TunerStandard::Atsc, &params).unwrap(),
            LocatorDescriptor::Atsc(AtscLocator {
                carrier_frequency: 557_000,
                modulation: Modulation::Vsb8,
            })
        );
    }

    #[test]
    fn test_unknown_standard() {
        assert_eq!(
            map(TunerStandard::Unknown, &TuningParameters::default()),
            Err(MapError::UnsupportedStandard(TunerStandard::Unknown))
        );
    }
}
