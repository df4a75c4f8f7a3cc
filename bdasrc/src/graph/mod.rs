//! Processing graph assembly.
//!
//! This module provides:
//! - [`ProcessingStage`]: the connectable-pin abstraction every stage implements
//! - [`ProcessingGraph`]: the single owner of all stages of a capture session
//! - [`wiring::connect`]: first-compatible-pair pin wiring between two stages
//! - [`loader::load_first_compatible`]: optional stage discovery by category

pub mod loader;
pub mod stage;
pub mod wiring;

use std::sync::Arc;

use log::{debug, trace, warn};
use thiserror::Error;

pub use loader::{load_first_compatible, LoadError, EXCLUDED_STAGE_NAMES};
pub use stage::{
    Delivery, MediaSample, MediaType, NodeDescriptor, PinDirection, PinId, PinInfo,
    ProcessingStage, SampleCallback, SampleSource, SignalStatistics, StageError, StageState,
    Topology, TuneSink,
};
pub use wiring::{connect, WiringError};

/// Handle of a stage inside a [`ProcessingGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StageId(usize);

/// A pin-to-pin link made through the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connection {
    pub upstream: StageId,
    pub output: PinId,
    pub downstream: StageId,
    pub input: PinId,
}

impl Connection {
    fn involves(&self, id: StageId) -> bool {
        self.upstream == id || self.downstream == id
    }
}

/// Graph-level errors.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Stage {0:?} is not part of the graph")]
    UnknownStage(StageId),

    #[error("Stage '{name}' failed: {source}")]
    Stage {
        name: String,
        #[source]
        source: StageError,
    },
}

struct Node {
    id: StageId,
    name: String,
    stage: Arc<dyn ProcessingStage>,
}

/// Owner of every stage of one capture session.
///
/// Stages are kept in insertion order. Removing a stage breaks every
/// connection it takes part in, on both ends. Dropping the graph tears it
/// down.
pub struct ProcessingGraph {
    nodes: Vec<Node>,
    connections: Vec<Connection>,
    next_id: usize,
    state: StageState,
}

impl ProcessingGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            connections: Vec::new(),
            next_id: 0,
            state: StageState::Stopped,
        }
    }

    /// Add a stage under the given name.
    pub fn add(&mut self, stage: Arc<dyn ProcessingStage>, name: &str) -> StageId {
        let id = StageId(self.next_id);
        self.next_id += 1;
        debug!("[Graph] Added stage '{}' as {:?}", name, id);
        self.nodes.push(Node {
            id,
            name: name.to_string(),
            stage,
        });
        id
    }

    /// Remove a stage, disconnecting it first.
    pub fn remove(&mut self, id: StageId) -> Result<Arc<dyn ProcessingStage>, GraphError> {
        let pos = self
            .nodes
            .iter()
            .position(|node| node.id == id)
            .ok_or(GraphError::UnknownStage(id))?;

        let (involved, kept): (Vec<Connection>, Vec<Connection>) = self
            .connections
            .iter()
            .partition(|connection| connection.involves(id));
        self.connections = kept;

        for connection in involved {
            if let Some(up) = self.stage(connection.upstream) {
                up.disconnect(connection.output);
            }
            if let Some(down) = self.stage(connection.downstream) {
                down.disconnect(connection.input);
            }
        }

        let node = self.nodes.remove(pos);
        if let Err(e) = node.stage.set_state(StageState::Stopped) {
            warn!("[Graph] Stage '{}' did not stop cleanly: {}", node.name, e);
        }
        debug!("[Graph] Removed stage '{}'", node.name);
        Ok(node.stage)
    }

    /// Look up a stage.
    pub fn stage(&self, id: StageId) -> Option<&Arc<dyn ProcessingStage>> {
        self.nodes.iter().find(|node| node.id == id).map(|node| &node.stage)
    }

    /// Name a stage was added under.
    pub fn name(&self, id: StageId) -> Option<&str> {
        self.nodes
            .iter()
            .find(|node| node.id == id)
            .map(|node| node.name.as_str())
    }

    pub fn contains(&self, id: StageId) -> bool {
        self.nodes.iter().any(|node| node.id == id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Stage handles in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = StageId> + '_ {
        self.nodes.iter().map(|node| node.id)
    }

    /// Connections made so far.
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Current run state.
    pub fn state(&self) -> StageState {
        self.state
    }

    /// Connect an output pin of `upstream` to an input pin of `downstream`.
    pub fn connect_pins(
        &mut self,
        upstream: StageId,
        output: PinId,
        downstream: StageId,
        input: PinId,
    ) -> Result<Connection, GraphError> {
        let up = self
            .stage(upstream)
            .cloned()
            .ok_or(GraphError::UnknownStage(upstream))?;
        let down = self
            .stage(downstream)
            .cloned()
            .ok_or(GraphError::UnknownStage(downstream))?;

        up.connect(output, down.as_ref(), input)
            .map_err(|source| GraphError::Stage {
                name: up.name().to_string(),
                source,
            })?;

        let connection = Connection {
            upstream,
            output,
            downstream,
            input,
        };
        trace!(
            "[Graph] Connected '{}'[{}] -> '{}'[{}]",
            up.name(),
            output,
            down.name(),
            input
        );
        self.connections.push(connection);
        Ok(connection)
    }

    /// Run every stage, most downstream first.
    ///
    /// If any stage refuses, the whole graph is stopped again.
    pub fn run(&mut self) -> Result<(), GraphError> {
        let refused = self.nodes.iter().rev().find_map(|node| {
            node.stage
                .set_state(StageState::Running)
                .err()
                .map(|source| (node.name.clone(), source))
        });
        if let Some((name, source)) = refused {
            self.stop();
            return Err(GraphError::Stage { name, source });
        }
        self.state = StageState::Running;
        debug!("[Graph] Running ({} stages)", self.nodes.len());
        Ok(())
    }

    /// Pause every stage.
    pub fn pause(&mut self) {
        for node in self.nodes.iter().rev() {
            if let Err(e) = node.stage.set_state(StageState::Paused) {
                warn!("[Graph] Unable to pause '{}': {}", node.name, e);
            }
        }
        self.state = StageState::Paused;
    }

    /// Stop every stage, most upstream first.
    pub fn stop(&mut self) {
        for node in &self.nodes {
            if let Err(e) = node.stage.set_state(StageState::Stopped) {
                warn!("[Graph] Unable to stop '{}': {}", node.name, e);
            }
        }
        self.state = StageState::Stopped;
    }

    /// Stop the graph and release every stage, last added first.
    pub fn teardown(&mut self) {
        if self.nodes.is_empty() {
            return;
        }
        self.stop();
        while let Some(id) = self.nodes.last().map(|node| node.id) {
            if let Err(e) = self.remove(id) {
                warn!("[Graph] Teardown: {}", e);
                break;
            }
        }
        self.connections.clear();
        debug!("[Graph] Torn down");
    }
}

impl Default for ProcessingGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ProcessingGraph {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::sim::SimStage;

    fn pair() -> (ProcessingGraph, StageId, StageId) {
        let mut graph = ProcessingGraph::new();
        let up = graph.add(
            SimStage::builder("Up").output(MediaType::TRANSPORT).build(),
            "Up",
        );
        let down = graph.add(
            SimStage::builder("Down").input(MediaType::TRANSPORT).build(),
            "Down",
        );
        (graph, up, down)
    }

    #[test]
    fn test_add_and_lookup() {
        let (graph, up, down) = pair();
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.name(up), Some("Up"));
        assert_eq!(graph.name(down), Some("Down"));
        assert_eq!(graph.ids().collect::<Vec<_>>(), vec![up, down]);
    }

    #[test]
    fn test_remove_disconnects_both_ends() {
        let (mut graph, up, down) = pair();
        graph.connect_pins(up, 0, down, 0).unwrap();
        assert!(graph.stage(up).unwrap().pins().unwrap()[0].connected);

        graph.remove(down).unwrap();
        assert!(graph.connections().is_empty());
        assert!(!graph.stage(up).unwrap().pins().unwrap()[0].connected);
        assert!(!graph.contains(down));
    }

    #[test]
    fn test_remove_unknown_stage() {
        let (mut graph, _, down) = pair();
        graph.remove(down).unwrap();
        assert!(matches!(
            graph.remove(down),
            Err(GraphError::UnknownStage(id)) if id == down
        ));
    }

    #[test]
    fn test_run_and_stop() {
        let (mut graph, up, _) = pair();
        graph.run().unwrap();
        assert_eq!(graph.state(), StageState::Running);

        let stage = graph.stage(up).unwrap().clone();
        graph.stop();
        assert_eq!(graph.state(), StageState::Stopped);
        drop(stage);
    }

    #[test]
    fn test_run_failure_stops_graph() {
        let mut graph = ProcessingGraph::new();
        let ok = SimStage::builder("Ok").build();
        graph.add(ok.clone(), "Ok");
        graph.add(SimStage::builder("Broken").fail_run().build(), "Broken");

        assert!(matches!(graph.run(), Err(GraphError::Stage { .. })));
        assert_eq!(ok.state(), StageState::Stopped);
        assert_eq!(graph.state(), StageState::Stopped);
    }

    #[test]
    fn test_teardown_releases_stages() {
        let (mut graph, up, _) = pair();
        let weak = Arc::downgrade(graph.stage(up).unwrap());
        graph.teardown();
        assert!(graph.is_empty());
        assert!(weak.upgrade().is_none());
    }
}
