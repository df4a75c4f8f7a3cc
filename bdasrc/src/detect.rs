//! Tuner standard detection from the device topology.

use bdasrc_types::{NodeFunction, TunerStandard};
use log::{debug, warn};

use crate::device::DeviceHandle;
use crate::graph::NodeDescriptor;

/// Maximum number of topology nodes inspected.
pub const MAX_TOPOLOGY_NODES: usize = 32;

/// Classify a node list. The first demodulator node found wins.
pub fn classify_descriptors(descriptors: &[NodeDescriptor]) -> TunerStandard {
    descriptors
        .iter()
        .take(MAX_TOPOLOGY_NODES)
        .find_map(|node| match node.function {
            f if f == NodeFunction::QAM_DEMODULATOR => Some(TunerStandard::DvbC),
            f if f == NodeFunction::QPSK_DEMODULATOR => Some(TunerStandard::DvbS),
            f if f == NodeFunction::COFDM_DEMODULATOR => Some(TunerStandard::DvbT),
            f if f == NodeFunction::VSB8_DEMODULATOR => Some(TunerStandard::Atsc),
            _ => None,
        })
        .unwrap_or(TunerStandard::Unknown)
}

/// Determine which standard a bound tuner implements.
///
/// Returns [`TunerStandard::Unknown`] when the device has no topology, the
/// node list cannot be read or no known demodulator is present.
pub fn classify(device: &DeviceHandle) -> TunerStandard {
    let Some(topology) = device.stage().topology() else {
        warn!("[Detect] '{}' exposes no topology", device.name());
        return TunerStandard::Unknown;
    };

    let descriptors = match topology.node_descriptors() {
        Ok(descriptors) => descriptors,
        Err(e) => {
            warn!("[Detect] Unable to read topology of '{}': {}", device.name(), e);
            return TunerStandard::Unknown;
        }
    };

    let standard = classify_descriptors(&descriptors);
    debug!(
        "[Detect] '{}': {} nodes, standard {}",
        device.name(),
        descriptors.len(),
        standard
    );
    standard
}

#[cfg(test)]
mod tests {
    use super::*;
    use bdasrc_types::Guid;

    fn node(function: Guid) -> NodeDescriptor {
        NodeDescriptor {
            node_type: 0,
            function,
            name: Guid::NULL,
        }
    }

    #[test]
    fn test_each_demodulator() {
        let cases = [
            (NodeFunction::QAM_DEMODULATOR, TunerStandard::DvbC),
            (NodeFunction::QPSK_DEMODULATOR, TunerStandard::DvbS),
            (NodeFunction::COFDM_DEMODULATOR, TunerStandard::DvbT),
            (NodeFunction::VSB8_DEMODULATOR, TunerStandard::Atsc),
        ];
        for (function, expected) in cases {
            assert_eq!(classify_descriptors(&[node(function)]), expected);
        }
    }

    #[test]
    fn test_first_match_wins() {
        let nodes = [
            node(Guid(1)),
            node(NodeFunction::COFDM_DEMODULATOR),
            node(NodeFunction::QAM_DEMODULATOR),
        ];
        assert_eq!(classify_descriptors(&nodes), TunerStandard::DvbT);
    }

    #[test]
    fn test_unknown() {
        assert_eq!(classify_descriptors(&[]), TunerStandard::Unknown);
        assert_eq!(
            classify_descriptors(&[node(Guid(7)), node(Guid::NULL)]),
            TunerStandard::Unknown
        );
    }

    #[test]
    fn test_nodes_past_limit_are_ignored() {
        let mut nodes = vec![node(Guid(1)); MAX_TOPOLOGY_NODES];
        nodes.push(node(NodeFunction::QPSK_DEMODULATOR));
        assert_eq!(classify_descriptors(&nodes), TunerStandard::Unknown);

        nodes[MAX_TOPOLOGY_NODES - 1] = node(NodeFunction::QPSK_DEMODULATOR);
        assert_eq!(classify_descriptors(&nodes), TunerStandard::DvbS);
    }
}
