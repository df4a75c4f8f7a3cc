//! Capture session.
//!
//! A [`Session`] owns everything one capture needs: the bound tuner, the
//! processing graph built around it, and the sample queue the driver fills
//! and the host drains. The host drives it through a small set of
//! lifecycle calls:
//!
//! ```text
//! Idle --create_graph--> GraphBuilt --start_tuning--> Running
//!                                          Running --unlock--> Flushing
//!                                         Flushing --unlock_stop--> Running
//! any --stop--> Idle
//! ```
//!
//! Lifecycle calls must not race each other. [`Session::pull_next_buffer`]
//! only touches the queue and may block on another thread while
//! [`Session::unlock`] is called to release it.

use std::sync::Arc;

use bdasrc_types::{DeviceCategory, TuneRequest, TunerStandard};
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use thiserror::Error;

use crate::bridge::DeliveryBridge;
use crate::config::SessionConfig;
use crate::detect;
use crate::device::{DeviceDirectory, DeviceDiscovery, DeviceHandle, DiscoveryError};
use crate::factory::{StageFactory, StageKind};
use crate::graph::{
    connect, load_first_compatible, GraphError, ProcessingGraph, SignalStatistics, StageError,
    StageId, WiringError,
};
use crate::mapper::{self, MapError};
use crate::properties::{self, PropertyError, PropertyValue};
use crate::queue::{CapturedBuffer, Flushing, QueueStats, SampleQueue};

/// Maximum number of signal statistics nodes read after tuning.
pub const MAX_SIGNAL_NODES: usize = 32;

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    GraphBuilt,
    Running,
    Flushing,
}

/// Signal readings aggregated over every statistics node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrontendStats {
    /// Strongest reading, in mdB.
    pub strength: i32,
    /// Best quality, 0 to 100.
    pub quality: i32,
    /// Any node reports a signal.
    pub present: bool,
    /// Any node reports lock.
    pub locked: bool,
}

impl FrontendStats {
    fn aggregate(nodes: &[SignalStatistics]) -> Self {
        let nodes = &nodes[..nodes.len().min(MAX_SIGNAL_NODES)];
        Self {
            strength: nodes.iter().map(|n| n.strength).max().unwrap_or(0),
            quality: nodes.iter().map(|n| n.quality).max().unwrap_or(0),
            present: nodes.iter().any(|n| n.present),
            locked: nodes.iter().any(|n| n.locked),
        }
    }
}

/// Session errors.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Device discovery failed: {0}")]
    Discovery(#[source] DiscoveryError),

    #[error("Unable to bind tuner: {0}")]
    Bind(#[source] DiscoveryError),

    #[error("Unable to determine the standard of tuner '{device}'")]
    UnknownStandard { device: String },

    #[error("Unable to map tuning parameters: {0}")]
    Map(#[from] MapError),

    #[error("Unable to wire graph: {0}")]
    Wiring(#[from] WiringError),

    #[error("Tune request rejected: {0}")]
    TuneValidation(#[source] StageError),

    #[error("Unable to submit tune request: {0}")]
    TuneSubmit(#[source] StageError),

    #[error("Unable to run graph: {0}")]
    Run(#[from] GraphError),

    #[error("Signal not locked (strength {} mdB, quality {})", .0.strength, .0.quality)]
    SignalNotLocked(FrontendStats),

    #[error("Cannot {operation} while {state:?}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    #[error("Stage error: {0}")]
    Stage(#[from] StageError),
}

impl From<DiscoveryError> for SessionError {
    fn from(e: DiscoveryError) -> Self {
        match e {
            DiscoveryError::Bind(_) => SessionError::Bind(e),
            _ => SessionError::Discovery(e),
        }
    }
}

/// A built graph. Field order is drop order: the graph releases its stages
/// before the device handle goes.
struct Assembly {
    graph: ProcessingGraph,
    provider: StageId,
    capture: StageId,
    tune_request: TuneRequest,
    device: DeviceHandle,
}

struct Lifecycle {
    state: SessionState,
    /// State restored by `unlock_stop`.
    resume: SessionState,
    assembly: Option<Assembly>,
    standard: TunerStandard,
    device_name: String,
    stats: Option<FrontendStats>,
}

/// A live transport stream capture session.
pub struct Session {
    discovery: DeviceDiscovery,
    factory: Arc<dyn StageFactory>,
    config: Mutex<SessionConfig>,
    lifecycle: Mutex<Lifecycle>,
    queue: Arc<SampleQueue>,
}

impl Session {
    /// Create an idle session with default settings.
    pub fn new(directory: Arc<dyn DeviceDirectory>, factory: Arc<dyn StageFactory>) -> Self {
        let config = SessionConfig::default();
        let queue = Arc::new(SampleQueue::new(config.buffer_size));
        // Nothing to pull before a graph is built.
        queue.close();
        Self {
            discovery: DeviceDiscovery::new(directory),
            factory,
            queue,
            config: Mutex::new(config),
            lifecycle: Mutex::new(Lifecycle {
                state: SessionState::Idle,
                resume: SessionState::Idle,
                assembly: None,
                standard: TunerStandard::Unknown,
                device_name: String::new(),
                stats: None,
            }),
        }
    }

    /// Create an idle session from a configuration, checking every value.
    pub fn with_config(
        directory: Arc<dyn DeviceDirectory>,
        factory: Arc<dyn StageFactory>,
        config: SessionConfig,
    ) -> Result<Self, PropertyError> {
        properties::validate_config(&config)?;
        let session = Self::new(directory, factory);
        session.queue.set_capacity(config.buffer_size);
        *session.config.lock() = config;
        Ok(session)
    }

    pub fn state(&self) -> SessionState {
        self.lifecycle.lock().state
    }

    /// Current settings.
    pub fn config(&self) -> SessionConfig {
        self.config.lock().clone()
    }

    /// Standard detected on the last bound tuner.
    pub fn input_type(&self) -> TunerStandard {
        self.lifecycle.lock().standard
    }

    /// Friendly name of the last bound tuner, empty before a graph was built.
    pub fn device_name(&self) -> String {
        self.lifecycle.lock().device_name.clone()
    }

    /// Signal readings of the last `start_tuning`.
    pub fn frontend_stats(&self) -> Option<FrontendStats> {
        self.lifecycle.lock().stats
    }

    pub fn queue_stats(&self) -> QueueStats {
        self.queue.stats()
    }

    /// Buffers captured but not pulled yet.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Live sources cannot seek.
    pub fn is_seekable(&self) -> bool {
        false
    }

    /// Live sources have no size.
    pub fn size(&self) -> Option<u64> {
        None
    }

    /// Build the capture graph. Logs and returns `false` on failure.
    pub fn create_graph(&self) -> bool {
        match self.try_create_graph() {
            Ok(()) => true,
            Err(e) => {
                error!("[Session] Unable to build graph: {}", e);
                false
            }
        }
    }

    /// Bind the configured tuner and build the capture graph around it.
    ///
    /// On failure everything acquired so far is released and the session
    /// stays idle.
    pub fn try_create_graph(&self) -> Result<(), SessionError> {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.state != SessionState::Idle {
            return Err(SessionError::InvalidState {
                operation: "build the graph",
                state: lifecycle.state,
            });
        }

        let config = self.config.lock().clone();
        self.queue.set_capacity(config.buffer_size);

        let (assembly, standard) = self.assemble(&config)?;
        self.queue.reset();
        lifecycle.device_name = assembly.device.name().to_string();
        lifecycle.standard = standard;
        lifecycle.assembly = Some(assembly);
        lifecycle.state = SessionState::GraphBuilt;
        info!(
            "[Session] Graph built for '{}' ({})",
            lifecycle.device_name, standard
        );
        Ok(())
    }

    fn assemble(&self, config: &SessionConfig) -> Result<(Assembly, TunerStandard), SessionError> {
        let device = self
            .discovery
            .bind_at(DeviceCategory::NetworkTuner, config.device_index as usize)?;

        let standard = detect::classify(&device);
        if standard == TunerStandard::Unknown {
            return Err(SessionError::UnknownStandard {
                device: device.name().to_string(),
            });
        }

        let locator = mapper::map(standard, &config.tuning)?;
        let space = standard
            .tuning_space()
            .ok_or(MapError::UnsupportedStandard(standard))?;
        let tune_request = TuneRequest { space, locator };
        debug!("[Session] Tune request: {:?}", tune_request);

        // Declared after `device` so it is dropped first on every early return.
        let mut graph = ProcessingGraph::new();
        let directory = self.discovery.directory().as_ref();

        let provider = self.add_stage(&mut graph, StageKind::NetworkProvider(standard))?;
        let tuner = graph.add(device.stage().clone(), device.moniker().label());
        connect(&mut graph, provider, tuner)?;

        let source = match load_first_compatible(
            directory,
            &mut graph,
            DeviceCategory::ReceiverComponent,
            tuner,
        ) {
            Ok(receiver) => receiver,
            Err(e) => {
                info!("[Session] Capturing from the tuner directly: {}", e);
                tuner
            }
        };

        let capture = self.add_stage(&mut graph, StageKind::SampleCapture)?;
        let demux = self.add_stage(&mut graph, StageKind::Demultiplexer)?;
        connect(&mut graph, source, capture)?;
        connect(&mut graph, capture, demux)?;

        if let Err(e) = load_first_compatible(
            directory,
            &mut graph,
            DeviceCategory::TransportInformation,
            demux,
        ) {
            warn!("[Session] No transport information stage: {}", e);
        }

        let sample_source = graph
            .stage(capture)
            .and_then(|stage| stage.sample_source())
            .ok_or(StageError::Unsupported("sample capture"))?;
        sample_source.set_callback(Some(DeliveryBridge::new(self.queue.clone()).into_callback()))?;

        let assembly = Assembly {
            graph,
            provider,
            capture,
            tune_request,
            device,
        };
        Ok((assembly, standard))
    }

    fn add_stage(
        &self,
        graph: &mut ProcessingGraph,
        kind: StageKind,
    ) -> Result<StageId, SessionError> {
        let stage = self.factory.instantiate(kind)?;
        let name = stage.name().to_string();
        Ok(graph.add(stage, &name))
    }

    /// Tune and run. Logs failures and returns the lock status.
    pub fn start_tuning(&self) -> bool {
        match self.try_start_tuning() {
            Ok(_) => true,
            Err(SessionError::SignalNotLocked(stats)) => {
                warn!(
                    "[Session] Running without signal lock (strength {} mdB, quality {})",
                    stats.strength, stats.quality
                );
                false
            }
            Err(e) => {
                error!("[Session] Unable to start tuning: {}", e);
                false
            }
        }
    }

    /// Submit the tune request, run the graph and read the signal.
    ///
    /// [`SessionError::SignalNotLocked`] leaves the session running; the
    /// call can be repeated.
    pub fn try_start_tuning(&self) -> Result<FrontendStats, SessionError> {
        let mut guard = self.lifecycle.lock();
        let lifecycle = &mut *guard;
        let state = lifecycle.state;
        let assembly = match (state, lifecycle.assembly.as_mut()) {
            (SessionState::GraphBuilt | SessionState::Running, Some(assembly)) => assembly,
            _ => {
                return Err(SessionError::InvalidState {
                    operation: "start tuning",
                    state,
                })
            }
        };

        {
            let sink = assembly
                .graph
                .stage(assembly.provider)
                .and_then(|stage| stage.tune_sink())
                .ok_or(StageError::Unsupported("tune request"))?;
            sink.validate(&assembly.tune_request)
                .map_err(SessionError::TuneValidation)?;
            sink.submit(&assembly.tune_request)
                .map_err(SessionError::TuneSubmit)?;
        }

        if state != SessionState::Running {
            assembly.graph.run()?;
            lifecycle.state = SessionState::Running;
        }

        let stats = read_signal(&assembly.device);
        lifecycle.stats = Some(stats);
        info!(
            "[Session] Signal: strength {} mdB, quality {}, present {}, locked {}",
            stats.strength, stats.quality, stats.present, stats.locked
        );

        if stats.locked {
            Ok(stats)
        } else {
            Err(SessionError::SignalNotLocked(stats))
        }
    }

    /// Stop the graph and release the device. The session returns to idle.
    pub fn stop(&self) {
        let mut lifecycle = self.lifecycle.lock();
        if let Some(mut assembly) = lifecycle.assembly.take() {
            assembly.graph.pause();
            assembly.graph.stop();
            if let Some(source) = assembly
                .graph
                .stage(assembly.capture)
                .and_then(|stage| stage.sample_source())
            {
                if let Err(e) = source.set_callback(None) {
                    warn!("[Session] Unable to clear delivery callback: {}", e);
                }
            }
            assembly.graph.teardown();
            drop(assembly);
            info!("[Session] Stopped, device released");
        }

        // Pulls fail until the next graph is built.
        self.queue.close();
        lifecycle.state = SessionState::Idle;
        lifecycle.resume = SessionState::Idle;
        lifecycle.stats = None;
    }

    /// Begin a flush: pending and future pulls return [`Flushing`] until
    /// [`Session::unlock_stop`].
    ///
    /// Allowed in any state. Called while idle, it blocks `create_graph`
    /// with `InvalidState` until [`Session::unlock_stop`].
    pub fn unlock(&self) {
        let mut lifecycle = self.lifecycle.lock();
        self.queue.begin_flush();
        if lifecycle.state != SessionState::Flushing {
            lifecycle.resume = lifecycle.state;
            lifecycle.state = SessionState::Flushing;
        }
        debug!("[Session] Unlocked");
    }

    /// End a flush. Everything captured until now is discarded.
    pub fn unlock_stop(&self) {
        let mut lifecycle = self.lifecycle.lock();
        self.queue.end_flush();
        if lifecycle.state == SessionState::Flushing {
            lifecycle.state = lifecycle.resume;
        }
        if lifecycle.state == SessionState::Idle {
            self.queue.close();
        }
        debug!("[Session] Unlock stopped");
    }

    /// Next captured buffer, oldest first. Blocks until one is available
    /// or a flush begins.
    pub fn pull_next_buffer(&self) -> Result<CapturedBuffer, Flushing> {
        self.queue.pop()
    }

    /// Set a property. Only allowed while idle.
    pub fn set_property(
        &self,
        name: &str,
        value: impl Into<PropertyValue>,
    ) -> Result<(), PropertyError> {
        let value = value.into();
        let lifecycle = self.lifecycle.lock();
        let spec = properties::find(name).ok_or_else(|| PropertyError::Unknown(name.to_string()))?;
        if spec.writable && lifecycle.state != SessionState::Idle {
            return Err(PropertyError::SessionActive(spec.name));
        }

        let mut config = self.config.lock();
        properties::set(&mut config, name, &value)?;
        if spec.name == "buffer-size" {
            self.queue.set_capacity(config.buffer_size);
        }
        debug!("[Session] {} = {}", spec.name, value);
        Ok(())
    }

    /// Read a property.
    pub fn property(&self, name: &str) -> Result<PropertyValue, PropertyError> {
        let lifecycle = self.lifecycle.lock();
        let config = self.config.lock();
        properties::get(&config, name, &lifecycle.device_name, lifecycle.standard)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.stop();
    }
}

fn read_signal(device: &DeviceHandle) -> FrontendStats {
    let Some(topology) = device.stage().topology() else {
        warn!("[Session] '{}' exposes no signal statistics", device.name());
        return FrontendStats::default();
    };
    match topology.signal_statistics() {
        Ok(nodes) => FrontendStats::aggregate(&nodes),
        Err(e) => {
            warn!("[Session] Unable to read signal statistics: {}", e);
            FrontendStats::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::sim::{SimDirectory, SimFactory, SimSignal, SimStage};
    use crate::graph::{Delivery, MediaType, StageState};
    use bdasrc_types::{LocatorDescriptor, Modulation};
    use std::thread;
    use std::time::Duration;

    struct Rig {
        directory: Arc<SimDirectory>,
        factory: Arc<SimFactory>,
        signal: SimSignal,
        session: Session,
    }

    fn rig(standard: TunerStandard) -> Rig {
        let signal = SimSignal::locked();
        let directory = Arc::new(SimDirectory::new());
        directory.add_device(
            DeviceCategory::NetworkTuner,
            Some("Sim Tuner"),
            SimStage::tuner("Sim Tuner", standard, signal.clone()),
        );
        directory.add_device(
            DeviceCategory::TransportInformation,
            Some("BDA MPE Filter"),
            SimStage::transport_information("BDA MPE Filter"),
        );
        directory.add_device(
            DeviceCategory::TransportInformation,
            Some("Transport Information Filter"),
            SimStage::transport_information("Transport Information Filter"),
        );
        let factory = Arc::new(SimFactory::new());
        let session = Session::new(directory.clone(), factory.clone());
        Rig {
            directory,
            factory,
            signal,
            session,
        }
    }

    fn capture(rig: &Rig) -> Arc<SimStage> {
        rig.factory.stage(StageKind::SampleCapture).unwrap()
    }

    #[test]
    fn test_full_lifecycle() {
        let rig = rig(TunerStandard::DvbC);
        let session = &rig.session;
        session.set_property("frequency", 474_000u32).unwrap();
        session.set_property("symbol-rate", 6_900u32).unwrap();
        session.set_property("modulation", "QAM 64").unwrap();

        assert!(session.create_graph());
        assert_eq!(session.state(), SessionState::GraphBuilt);
        assert_eq!(session.input_type(), TunerStandard::DvbC);
        assert_eq!(session.device_name(), "Sim Tuner");
        assert!(rig.directory.is_bound(DeviceCategory::NetworkTuner, 0));

        assert!(session.start_tuning());
        assert_eq!(session.state(), SessionState::Running);
        assert!(session.frontend_stats().unwrap().locked);

        let requests = rig.factory.tune_log().requests();
        assert_eq!(requests.len(), 1);
        match &requests[0].locator {
            LocatorDescriptor::DvbC(locator) => {
                assert_eq!(locator.carrier_frequency, 474_000);
                assert_eq!(locator.symbol_rate, 6_900);
                assert_eq!(locator.modulation, Modulation::Qam64);
            }
            other => panic!("unexpected locator: {:?}", other),
        }

        let capture = capture(&rig);
        assert_eq!(capture.state(), StageState::Running);
        assert_eq!(capture.deliver(&[0x47; 188]), Some(Delivery::Queued));
        assert_eq!(session.pull_next_buffer().unwrap().len(), 188);

        session.stop();
        assert_eq!(session.state(), SessionState::Idle);
        assert!(!capture.has_callback());
        assert!(!rig.directory.is_bound(DeviceCategory::NetworkTuner, 0));
        drop(capture);
        assert_eq!(rig.factory.live_stages(), 0);
    }

    #[test]
    fn test_transport_information_skips_excluded() {
        let rig = rig(TunerStandard::DvbT);
        rig.session.try_create_graph().unwrap();
        assert!(!rig.directory.is_bound(DeviceCategory::TransportInformation, 0));
        assert!(rig.directory.is_bound(DeviceCategory::TransportInformation, 1));
    }

    #[test]
    fn test_missing_transport_information_is_not_fatal() {
        let signal = SimSignal::locked();
        let directory = Arc::new(SimDirectory::new());
        directory.add_device(
            DeviceCategory::NetworkTuner,
            Some("Sim Tuner"),
            SimStage::tuner("Sim Tuner", TunerStandard::Atsc, signal),
        );
        let session = Session::new(directory, Arc::new(SimFactory::new()));
        session.try_create_graph().unwrap();
        assert_eq!(session.state(), SessionState::GraphBuilt);
    }

    #[test]
    fn test_receiver_component_is_used() {
        let rig = rig(TunerStandard::DvbS);
        let directory = Arc::new(SimDirectory::new());
        directory.add_device(
            DeviceCategory::NetworkTuner,
            Some("Sim Tuner"),
            SimStage::builder("Sim Tuner")
                .input(MediaType::TUNING)
                .output(MediaType::RECEIVER)
                .demodulator(TunerStandard::DvbS, rig.signal.clone()),
        );
        directory.add_device(
            DeviceCategory::ReceiverComponent,
            Some("Sim Receiver"),
            SimStage::receiver("Sim Receiver"),
        );
        let session = Session::new(directory.clone(), rig.factory.clone());

        session.try_create_graph().unwrap();
        assert!(directory.is_bound(DeviceCategory::ReceiverComponent, 0));
        session.stop();
        assert!(!directory.is_bound(DeviceCategory::ReceiverComponent, 0));
    }

    #[test]
    fn test_failed_assembly_releases_everything() {
        let rig = rig(TunerStandard::DvbC);
        rig.factory.fail_kind(Some(StageKind::Demultiplexer));

        assert!(matches!(
            rig.session.try_create_graph(),
            Err(SessionError::Stage(_))
        ));
        assert_eq!(rig.session.state(), SessionState::Idle);
        assert!(!rig.directory.is_bound(DeviceCategory::NetworkTuner, 0));
        assert_eq!(rig.factory.live_stages(), 0);

        rig.factory.fail_kind(None);
        rig.session.try_create_graph().unwrap();
    }

    #[test]
    fn test_unknown_standard() {
        let directory = Arc::new(SimDirectory::new());
        directory.add_device(
            DeviceCategory::NetworkTuner,
            Some("Mystery"),
            SimStage::tuner("Mystery", TunerStandard::Unknown, SimSignal::locked()),
        );
        let session = Session::new(directory.clone(), Arc::new(SimFactory::new()));
        assert!(matches!(
            session.try_create_graph(),
            Err(SessionError::UnknownStandard { .. })
        ));
        assert!(!directory.is_bound(DeviceCategory::NetworkTuner, 0));
    }

    #[test]
    fn test_discovery_errors() {
        let rig = rig(TunerStandard::DvbC);
        rig.session.set_property("device-index", 3).unwrap();
        assert!(matches!(
            rig.session.try_create_graph(),
            Err(SessionError::Discovery(DiscoveryError::NotFound { .. }))
        ));

        rig.session.set_property("device-index", 0).unwrap();
        let monikers = rig.directory.enumerate(DeviceCategory::NetworkTuner).unwrap();
        let _held = rig.directory.bind(&monikers[0]).unwrap();
        assert!(matches!(
            rig.session.try_create_graph(),
            Err(SessionError::Bind(_))
        ));
    }

    #[test]
    fn test_wiring_failure() {
        let directory = Arc::new(SimDirectory::new());
        directory.add_device(
            DeviceCategory::NetworkTuner,
            Some("No Input"),
            SimStage::builder("No Input")
                .output(MediaType::TRANSPORT)
                .demodulator(TunerStandard::DvbC, SimSignal::locked()),
        );
        let session = Session::new(directory.clone(), Arc::new(SimFactory::new()));
        assert!(matches!(
            session.try_create_graph(),
            Err(SessionError::Wiring(WiringError::NoCompatiblePins { .. }))
        ));
        assert!(!directory.is_bound(DeviceCategory::NetworkTuner, 0));
    }

    #[test]
    fn test_tune_rejections() {
        let rig = rig(TunerStandard::DvbT);
        rig.factory.reject_validate(true);
        rig.session.try_create_graph().unwrap();
        assert!(matches!(
            rig.session.try_start_tuning(),
            Err(SessionError::TuneValidation(_))
        ));
        assert_eq!(rig.session.state(), SessionState::GraphBuilt);
        rig.session.stop();

        rig.factory.reject_validate(false);
        rig.factory.reject_submit(true);
        rig.session.try_create_graph().unwrap();
        assert!(matches!(
            rig.session.try_start_tuning(),
            Err(SessionError::TuneSubmit(_))
        ));
        assert!(rig.factory.tune_log().requests().is_empty());
    }

    #[test]
    fn test_no_lock_keeps_running() {
        let rig = rig(TunerStandard::DvbT);
        rig.signal.set_locked(false);
        rig.session.try_create_graph().unwrap();

        assert!(matches!(
            rig.session.try_start_tuning(),
            Err(SessionError::SignalNotLocked(_))
        ));
        assert_eq!(rig.session.state(), SessionState::Running);

        rig.signal.set_locked(true);
        assert!(rig.session.try_start_tuning().unwrap().locked);
        assert_eq!(rig.factory.tune_log().requests().len(), 2);
    }

    #[test]
    fn test_signal_aggregation() {
        let nodes = [
            SignalStatistics {
                strength: -60_000,
                quality: 40,
                present: true,
                locked: false,
            },
            SignalStatistics {
                strength: -45_000,
                quality: 30,
                present: false,
                locked: true,
            },
        ];
        let stats = FrontendStats::aggregate(&nodes);
        assert_eq!(stats.strength, -45_000);
        assert_eq!(stats.quality, 40);
        assert!(stats.present);
        assert!(stats.locked);
        assert_eq!(FrontendStats::aggregate(&[]), FrontendStats::default());
    }

    #[test]
    fn test_unlock_releases_pull() {
        let rig = rig(TunerStandard::DvbC);
        let session = Arc::new(rig.session);
        session.try_create_graph().unwrap();
        session.try_start_tuning().unwrap();

        let consumer = {
            let session = Arc::clone(&session);
            thread::spawn(move || session.pull_next_buffer())
        };
        thread::sleep(Duration::from_millis(50));
        session.unlock();
        assert_eq!(consumer.join().unwrap(), Err(Flushing));
        assert_eq!(session.state(), SessionState::Flushing);

        let capture = rig.factory.stage(StageKind::SampleCapture).unwrap();
        assert_eq!(capture.deliver(&[1; 188]), Some(Delivery::Dropped));

        session.unlock_stop();
        assert_eq!(session.state(), SessionState::Running);
        capture.deliver(&[2; 188]);
        assert_eq!(session.pull_next_buffer().unwrap().as_slice(), &[2; 188][..]);
    }

    #[test]
    fn test_stop_releases_pull() {
        let rig = rig(TunerStandard::DvbC);
        let session = Arc::new(rig.session);
        session.try_create_graph().unwrap();
        session.try_start_tuning().unwrap();

        let consumer = {
            let session = Arc::clone(&session);
            thread::spawn(move || session.pull_next_buffer())
        };
        thread::sleep(Duration::from_millis(50));
        session.stop();
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(consumer.join().unwrap(), Err(Flushing));

        // Nothing to pull from an idle session.
        assert_eq!(session.pull_next_buffer(), Err(Flushing));
        session.unlock();
        session.unlock_stop();
        assert_eq!(session.pull_next_buffer(), Err(Flushing));

        session.try_create_graph().unwrap();
        session.try_start_tuning().unwrap();
        let capture = rig.factory.stage(StageKind::SampleCapture).unwrap();
        capture.deliver(&[3; 188]);
        assert_eq!(session.pull_next_buffer().unwrap().len(), 188);
    }

    #[test]
    fn test_unlock_while_idle_blocks_graph() {
        let rig = rig(TunerStandard::DvbC);
        rig.session.unlock();
        assert_eq!(rig.session.state(), SessionState::Flushing);
        assert!(matches!(
            rig.session.try_create_graph(),
            Err(SessionError::InvalidState { .. })
        ));
        rig.session.unlock_stop();
        assert_eq!(rig.session.state(), SessionState::Idle);
        rig.session.try_create_graph().unwrap();
    }

    #[test]
    fn test_properties_locked_while_active() {
        let rig = rig(TunerStandard::DvbC);
        rig.session.try_create_graph().unwrap();
        assert_eq!(
            rig.session.set_property("frequency", 100u32),
            Err(PropertyError::SessionActive("frequency"))
        );
        assert_eq!(
            rig.session.property("input-type").unwrap().as_str(),
            Some("DVB-C")
        );
        assert_eq!(
            rig.session.property("device-name").unwrap().as_str(),
            Some("Sim Tuner")
        );

        rig.session.stop();
        rig.session.set_property("frequency", 100u32).unwrap();
        assert_eq!(rig.session.config().tuning.frequency, 100);
    }

    #[test]
    fn test_lifecycle_order_is_enforced() {
        let rig = rig(TunerStandard::DvbC);
        assert!(matches!(
            rig.session.try_start_tuning(),
            Err(SessionError::InvalidState { .. })
        ));
        rig.session.try_create_graph().unwrap();
        assert!(matches!(
            rig.session.try_create_graph(),
            Err(SessionError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_live_source() {
        let rig = rig(TunerStandard::DvbC);
        assert!(!rig.session.is_seekable());
        assert_eq!(rig.session.size(), None);
        assert_eq!(rig.session.device_name(), "");
    }

    #[test]
    fn test_with_config_validates() {
        let directory = Arc::new(SimDirectory::new());
        let factory = Arc::new(SimFactory::new());
        let mut config = SessionConfig::default();
        config.tuning.bandwidth = 12;
        assert!(Session::with_config(directory.clone(), factory.clone(), config).is_err());

        let config = SessionConfig {
            buffer_size: 7,
            ..Default::default()
        };
        let session = Session::with_config(directory, factory, config).unwrap();
        assert_eq!(session.property("buffer-size").unwrap(), PropertyValue::Int(7));
    }
}
