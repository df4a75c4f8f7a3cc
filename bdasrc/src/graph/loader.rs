//! Optional stage discovery.

use bdasrc_types::DeviceCategory;
use log::{debug, info, warn};
use thiserror::Error;

use super::wiring::connect;
use super::{ProcessingGraph, StageId};
use crate::device::{DeviceDirectory, DirectoryError};

/// Stages that enumerate under auxiliary categories but never work in a
/// capture graph.
pub const EXCLUDED_STAGE_NAMES: &[&str] = &["BDA MPE Filter", "BDA Slip De-Framer"];

/// Loader errors.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Upstream stage {0:?} is not part of the graph")]
    UnknownStage(StageId),

    #[error("Unable to enumerate {category} stages: {source}")]
    Enumeration {
        category: DeviceCategory,
        #[source]
        source: DirectoryError,
    },

    #[error("No usable {category} stage ({tried} tried)")]
    NotFound {
        category: DeviceCategory,
        tried: usize,
    },
}

/// Add the first stage of `category` that binds and wires to `upstream`.
///
/// Candidates without a readable friendly name, or whose name is in
/// [`EXCLUDED_STAGE_NAMES`], are skipped. Candidates that bind but cannot
/// be wired are removed from the graph again, so at most one stage of the
/// category is left behind.
pub fn load_first_compatible(
    directory: &dyn DeviceDirectory,
    graph: &mut ProcessingGraph,
    category: DeviceCategory,
    upstream: StageId,
) -> Result<StageId, LoadError> {
    if !graph.contains(upstream) {
        return Err(LoadError::UnknownStage(upstream));
    }

    let candidates = directory
        .enumerate(category)
        .map_err(|source| LoadError::Enumeration { category, source })?;

    let mut tried = 0;
    for moniker in &candidates {
        let Some(name) = moniker.friendly_name.as_deref() else {
            debug!("[Loader] Skipping {} without a name", moniker.display_name);
            continue;
        };
        if EXCLUDED_STAGE_NAMES.contains(&name) {
            debug!("[Loader] Skipping excluded stage '{}'", name);
            continue;
        }

        tried += 1;
        let stage = match directory.bind(moniker) {
            Ok(stage) => stage,
            Err(e) => {
                debug!("[Loader] Unable to bind '{}': {}", name, e);
                continue;
            }
        };

        let id = graph.add(stage, name);
        match connect(graph, upstream, id) {
            Ok(_) => {
                info!("[Loader] Using {} stage '{}'", category, name);
                return Ok(id);
            }
            Err(e) => {
                debug!("[Loader] '{}' rejected: {}", name, e);
                if let Err(e) = graph.remove(id) {
                    warn!("[Loader] Unable to remove '{}': {}", name, e);
                }
            }
        }
    }

    Err(LoadError::NotFound { category, tried })
}
