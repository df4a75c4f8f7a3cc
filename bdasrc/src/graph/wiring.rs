//! Pin-level wiring between two stages.

use log::{debug, trace};
use thiserror::Error;

use super::stage::{PinInfo, StageError};
use super::{Connection, ProcessingGraph, StageId};

/// Wiring errors.
#[derive(Debug, Error)]
pub enum WiringError {
    #[error("Stage {0:?} is not part of the graph")]
    UnknownStage(StageId),

    #[error("Unable to enumerate pins of '{stage}': {source}")]
    Enumeration {
        stage: String,
        #[source]
        source: StageError,
    },

    #[error("No compatible pins between '{upstream}' and '{downstream}'")]
    NoCompatiblePins { upstream: String, downstream: String },
}

fn pins_of(graph: &ProcessingGraph, id: StageId) -> Result<Vec<PinInfo>, WiringError> {
    let stage = graph.stage(id).ok_or(WiringError::UnknownStage(id))?;
    stage.pins().map_err(|source| WiringError::Enumeration {
        stage: stage.name().to_string(),
        source,
    })
}

/// Connect the first free output of `upstream` that a free input of
/// `downstream` accepts.
///
/// Every free output/input combination is tried once, in enumeration
/// order. Already connected pins are skipped, so wiring a pair twice only
/// succeeds while some compatible pair is still free.
pub fn connect(
    graph: &mut ProcessingGraph,
    upstream: StageId,
    downstream: StageId,
) -> Result<Connection, WiringError> {
    let up_name = graph
        .name(upstream)
        .ok_or(WiringError::UnknownStage(upstream))?
        .to_string();
    let down_name = graph
        .name(downstream)
        .ok_or(WiringError::UnknownStage(downstream))?
        .to_string();

    for output in pins_of(graph, upstream)? {
        if !output.is_free_output() {
            continue;
        }
        // Downstream pins are re-read for every output: a refused attempt
        // may still have changed the peer's pin set.
        for input in pins_of(graph, downstream)? {
            if !input.is_free_input() {
                continue;
            }
            match graph.connect_pins(upstream, output.id, downstream, input.id) {
                Ok(connection) => {
                    debug!(
                        "[Wiring] '{}'.{} -> '{}'.{}",
                        up_name, output.name, down_name, input.name
                    );
                    return Ok(connection);
                }
                Err(e) => {
                    trace!(
                        "[Wiring] '{}'.{} -> '{}'.{} refused: {}",
                        up_name,
                        output.name,
                        down_name,
                        input.name,
                        e
                    );
                }
            }
        }
    }

    debug!("[Wiring] No compatible pins: '{}' -> '{}'", up_name, down_name);
    Err(WiringError::NoCompatiblePins {
        upstream: up_name,
        downstream: down_name,
    })
}
