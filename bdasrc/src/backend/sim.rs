//! In-process simulated tuner hardware.
//!
//! [`SimDirectory`] hands out [`SimStage`]s built from registered
//! templates and keeps every device exclusive while a bound stage is alive.
//! [`SimFactory`] creates network providers, demultiplexers and capture
//! stages. [`SimDriver`] plays the driver's delivery thread, pushing chunks
//! of a byte source into a capture stage's callback while it runs.

use std::io::{self, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bdasrc_types::{DeviceCategory, Guid, NodeFunction, TuneRequest, TunerStandard};
use log::{debug, info, trace};
use parking_lot::Mutex;

use crate::device::{DeviceDirectory, DeviceMoniker, DirectoryError};
use crate::factory::{StageFactory, StageKind};
use crate::graph::{
    Delivery, MediaType, NodeDescriptor, PinDirection, PinId, PinInfo, ProcessingStage,
    SampleCallback, SampleSource, SignalStatistics, StageError, StageState, Topology, TuneSink,
};

/// Size of one transport stream packet.
pub const TS_PACKET_SIZE: usize = 188;

/// Default number of bytes pushed per sample.
pub const DEFAULT_CHUNK_SIZE: usize = TS_PACKET_SIZE * 348;

const IDLE_POLL: Duration = Duration::from_millis(5);

/// Demodulator node reported by a tuner of the given standard.
pub fn demodulator_function(standard: TunerStandard) -> Option<Guid> {
    match standard {
        TunerStandard::Unknown => None,
        TunerStandard::Atsc => Some(NodeFunction::VSB8_DEMODULATOR),
        TunerStandard::DvbC => Some(NodeFunction::QAM_DEMODULATOR),
        TunerStandard::DvbS => Some(NodeFunction::QPSK_DEMODULATOR),
        TunerStandard::DvbT => Some(NodeFunction::COFDM_DEMODULATOR),
    }
}

/// Signal readings shared between a simulated tuner and its owner.
#[derive(Debug, Clone, Default)]
pub struct SimSignal(Arc<Mutex<Vec<SignalStatistics>>>);

impl SimSignal {
    pub fn new(nodes: Vec<SignalStatistics>) -> Self {
        Self(Arc::new(Mutex::new(nodes)))
    }

    /// One node with a good, locked signal.
    pub fn locked() -> Self {
        Self::new(vec![SignalStatistics {
            strength: -35_000,
            quality: 92,
            present: true,
            locked: true,
        }])
    }

    /// One node without signal.
    pub fn unlocked() -> Self {
        Self::new(vec![SignalStatistics {
            strength: -90_000,
            quality: 0,
            present: false,
            locked: false,
        }])
    }

    /// Replace every node reading.
    pub fn set(&self, nodes: Vec<SignalStatistics>) {
        *self.0.lock() = nodes;
    }

    /// Flip the lock indicator of every node.
    pub fn set_locked(&self, locked: bool) {
        for node in self.0.lock().iter_mut() {
            node.locked = locked;
            node.present = node.present || locked;
        }
    }

    fn read(&self) -> Vec<SignalStatistics> {
        self.0.lock().clone()
    }
}

/// Tune requests accepted by simulated network providers.
#[derive(Debug, Clone, Default)]
pub struct SimTuneLog(Arc<Mutex<Vec<TuneRequest>>>);

impl SimTuneLog {
    pub fn requests(&self) -> Vec<TuneRequest> {
        self.0.lock().clone()
    }

    fn push(&self, request: &TuneRequest) {
        self.0.lock().push(request.clone());
    }
}

#[derive(Debug, Clone)]
struct TuneBehavior {
    log: SimTuneLog,
    standard: Option<TunerStandard>,
    reject_validate: bool,
    reject_submit: bool,
}

#[derive(Debug, Clone)]
struct TopologyBehavior {
    nodes: Vec<NodeDescriptor>,
    signal: SimSignal,
}

struct SimPin {
    name: String,
    direction: PinDirection,
    media: MediaType,
    connected: bool,
}

/// Template for a [`SimStage`].
#[derive(Debug, Clone)]
pub struct SimStageBuilder {
    name: String,
    pins: Vec<(PinDirection, MediaType)>,
    fail_run: bool,
    fail_pins: bool,
    tune: Option<TuneBehavior>,
    topology: Option<TopologyBehavior>,
    capture: bool,
}

impl SimStageBuilder {
    pub fn input(mut self, media: MediaType) -> Self {
        self.pins.push((PinDirection::Input, media));
        self
    }

    pub fn output(mut self, media: MediaType) -> Self {
        self.pins.push((PinDirection::Output, media));
        self
    }

    /// Refuse to enter the running state.
    pub fn fail_run(mut self) -> Self {
        self.fail_run = true;
        self
    }

    /// Fail pin enumeration.
    pub fn fail_pins(mut self) -> Self {
        self.fail_pins = true;
        self
    }

    /// Accept tune requests, recording them in `log`.
    pub fn tune_sink(mut self, log: SimTuneLog) -> Self {
        self.tune = Some(TuneBehavior {
            log,
            standard: None,
            reject_validate: false,
            reject_submit: false,
        });
        self
    }

    /// Expose a topology with the given nodes and signal readings.
    pub fn topology(mut self, nodes: Vec<NodeDescriptor>, signal: SimSignal) -> Self {
        self.topology = Some(TopologyBehavior { nodes, signal });
        self
    }

    /// Expose a topology with the demodulator of `standard`.
    pub fn demodulator(self, standard: TunerStandard, signal: SimSignal) -> Self {
        let nodes = demodulator_function(standard)
            .map(|function| NodeDescriptor {
                node_type: 0,
                function,
                name: Guid::NULL,
            })
            .into_iter()
            .collect();
        self.topology(nodes, signal)
    }

    /// Expose the sample capture capability.
    pub fn capture(mut self) -> Self {
        self.capture = true;
        self
    }

    pub fn build(&self) -> Arc<SimStage> {
        let mut inputs = 0;
        let mut outputs = 0;
        let pins = self
            .pins
            .iter()
            .map(|(direction, media)| {
                let name = match direction {
                    PinDirection::Input => {
                        inputs += 1;
                        format!("Input {}", inputs - 1)
                    }
                    PinDirection::Output => {
                        outputs += 1;
                        format!("Output {}", outputs - 1)
                    }
                };
                SimPin {
                    name,
                    direction: *direction,
                    media: *media,
                    connected: false,
                }
            })
            .collect();

        Arc::new(SimStage {
            name: self.name.clone(),
            pins: Mutex::new(pins),
            state: Mutex::new(StageState::Stopped),
            fail_run: self.fail_run,
            fail_pins: self.fail_pins,
            tune: self.tune.clone(),
            topology: self.topology.clone(),
            capture: self.capture.then(|| Mutex::new(None)),
        })
    }
}

/// A simulated processing stage.
pub struct SimStage {
    name: String,
    pins: Mutex<Vec<SimPin>>,
    state: Mutex<StageState>,
    fail_run: bool,
    fail_pins: bool,
    tune: Option<TuneBehavior>,
    topology: Option<TopologyBehavior>,
    capture: Option<Mutex<Option<SampleCallback>>>,
}

impl SimStage {
    pub fn builder(name: &str) -> SimStageBuilder {
        SimStageBuilder {
            name: name.to_string(),
            pins: Vec::new(),
            fail_run: false,
            fail_pins: false,
            tune: None,
            topology: None,
            capture: false,
        }
    }

    /// Tuner template: tuning input, transport output and the standard's
    /// demodulator.
    pub fn tuner(name: &str, standard: TunerStandard, signal: SimSignal) -> SimStageBuilder {
        Self::builder(name)
            .input(MediaType::TUNING)
            .output(MediaType::TRANSPORT)
            .demodulator(standard, signal)
    }

    /// Receiver component template.
    pub fn receiver(name: &str) -> SimStageBuilder {
        Self::builder(name)
            .input(MediaType::RECEIVER)
            .output(MediaType::TRANSPORT)
    }

    /// Transport information stage template.
    pub fn transport_information(name: &str) -> SimStageBuilder {
        Self::builder(name).input(MediaType::SECTIONS)
    }

    pub fn state(&self) -> StageState {
        *self.state.lock()
    }

    /// Whether a delivery callback is installed.
    pub fn has_callback(&self) -> bool {
        self.capture
            .as_ref()
            .map_or(false, |callback| callback.lock().is_some())
    }

    /// Hand one sample to the installed callback.
    ///
    /// Returns `None` when the stage has no capture capability or no
    /// callback is installed.
    pub fn deliver(&self, data: &[u8]) -> Option<Delivery> {
        let callback = self.capture.as_ref()?.lock().clone()?;
        Some(callback(&data))
    }
}

impl ProcessingStage for SimStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn pins(&self) -> Result<Vec<PinInfo>, StageError> {
        if self.fail_pins {
            return Err(StageError::PinEnumeration(format!(
                "'{}' refused enumeration",
                self.name
            )));
        }
        Ok(self
            .pins
            .lock()
            .iter()
            .enumerate()
            .map(|(id, pin)| PinInfo {
                id,
                name: pin.name.clone(),
                direction: pin.direction,
                media: pin.media,
                connected: pin.connected,
            })
            .collect())
    }

    fn connect(
        &self,
        output: PinId,
        peer: &dyn ProcessingStage,
        input: PinId,
    ) -> Result<(), StageError> {
        let media = {
            let pins = self.pins.lock();
            let pin = pins.get(output).ok_or(StageError::NoSuchPin(output))?;
            if pin.direction != PinDirection::Output {
                return Err(StageError::WrongDirection(output));
            }
            if pin.connected {
                return Err(StageError::AlreadyConnected(output));
            }
            pin.media
        };

        peer.receive_connection(input, media)?;

        if let Some(pin) = self.pins.lock().get_mut(output) {
            pin.connected = true;
        }
        Ok(())
    }

    fn receive_connection(&self, input: PinId, media: MediaType) -> Result<(), StageError> {
        let mut pins = self.pins.lock();
        let pin = pins.get_mut(input).ok_or(StageError::NoSuchPin(input))?;
        if pin.direction != PinDirection::Input {
            return Err(StageError::WrongDirection(input));
        }
        if pin.connected {
            return Err(StageError::AlreadyConnected(input));
        }
        if !pin.media.accepts(media) {
            return Err(StageError::IncompatibleMedia {
                offered: media,
                accepted: pin.media,
            });
        }
        pin.connected = true;
        Ok(())
    }

    fn disconnect(&self, pin: PinId) {
        if let Some(pin) = self.pins.lock().get_mut(pin) {
            pin.connected = false;
        }
    }

    fn set_state(&self, state: StageState) -> Result<(), StageError> {
        if state == StageState::Running && self.fail_run {
            return Err(StageError::StateChange(state, "simulated failure".into()));
        }
        *self.state.lock() = state;
        trace!("[Sim] '{}' -> {:?}", self.name, state);
        Ok(())
    }

    fn tune_sink(&self) -> Option<&dyn TuneSink> {
        self.tune.as_ref().map(|_| self as &dyn TuneSink)
    }

    fn topology(&self) -> Option<&dyn Topology> {
        self.topology.as_ref().map(|_| self as &dyn Topology)
    }

    fn sample_source(&self) -> Option<&dyn SampleSource> {
        self.capture.as_ref().map(|_| self as &dyn SampleSource)
    }
}

impl TuneSink for SimStage {
    fn validate(&self, request: &TuneRequest) -> Result<(), StageError> {
        let tune = self.tune.as_ref().ok_or(StageError::Unsupported("tune request"))?;
        if tune.reject_validate {
            return Err(StageError::Driver("locator rejected".into()));
        }
        match tune.standard {
            Some(standard) if standard != request.standard() => Err(StageError::Driver(format!(
                "{} request sent to a {} provider",
                request.standard(),
                standard
            ))),
            _ => Ok(()),
        }
    }

    fn submit(&self, request: &TuneRequest) -> Result<(), StageError> {
        let tune = self.tune.as_ref().ok_or(StageError::Unsupported("tune request"))?;
        if tune.reject_submit {
            return Err(StageError::Driver("tuner did not accept the request".into()));
        }
        tune.log.push(request);
        debug!(
            "[Sim] '{}' tuned to {} kHz",
            self.name,
            request.locator.carrier_frequency()
        );
        Ok(())
    }
}

impl Topology for SimStage {
    fn node_descriptors(&self) -> Result<Vec<NodeDescriptor>, StageError> {
        self.topology
            .as_ref()
            .map(|topology| topology.nodes.clone())
            .ok_or(StageError::Unsupported("topology"))
    }

    fn signal_statistics(&self) -> Result<Vec<SignalStatistics>, StageError> {
        self.topology
            .as_ref()
            .map(|topology| topology.signal.read())
            .ok_or(StageError::Unsupported("topology"))
    }
}

impl SampleSource for SimStage {
    fn set_callback(&self, callback: Option<SampleCallback>) -> Result<(), StageError> {
        let slot = self
            .capture
            .as_ref()
            .ok_or(StageError::Unsupported("sample capture"))?;
        *slot.lock() = callback;
        Ok(())
    }
}

impl Drop for SimStage {
    fn drop(&mut self) {
        debug!("[Sim] '{}' released", self.name);
    }
}

struct SimDevice {
    category: DeviceCategory,
    friendly_name: Option<String>,
    template: SimStageBuilder,
    bound: Weak<SimStage>,
}

/// Simulated device directory.
///
/// A device stays busy while any stage bound from it is alive.
#[derive(Default)]
pub struct SimDirectory {
    devices: Mutex<Vec<SimDevice>>,
}

impl SimDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a device. `None` as name simulates an unreadable name.
    pub fn add_device(
        &self,
        category: DeviceCategory,
        friendly_name: Option<&str>,
        template: SimStageBuilder,
    ) {
        self.devices.lock().push(SimDevice {
            category,
            friendly_name: friendly_name.map(str::to_string),
            template,
            bound: Weak::new(),
        });
    }

    /// Whether the `index`-th device of a category is currently bound.
    pub fn is_bound(&self, category: DeviceCategory, index: usize) -> bool {
        self.devices
            .lock()
            .iter()
            .filter(|device| device.category == category)
            .nth(index)
            .map_or(false, |device| device.bound.strong_count() > 0)
    }
}

impl DeviceDirectory for SimDirectory {
    fn enumerate(&self, category: DeviceCategory) -> Result<Vec<DeviceMoniker>, DirectoryError> {
        Ok(self
            .devices
            .lock()
            .iter()
            .filter(|device| device.category == category)
            .enumerate()
            .map(|(index, device)| DeviceMoniker {
                category,
                index,
                display_name: format!("@device:sim:{}\\{}", category.guid(), index),
                friendly_name: device.friendly_name.clone(),
            })
            .collect())
    }

    fn bind(&self, moniker: &DeviceMoniker) -> Result<Arc<dyn ProcessingStage>, DirectoryError> {
        let mut devices = self.devices.lock();
        let device = devices
            .iter_mut()
            .filter(|device| device.category == moniker.category)
            .nth(moniker.index)
            .ok_or_else(|| DirectoryError::Bind {
                name: moniker.display_name.clone(),
                reason: "no such device".into(),
            })?;

        if device.bound.strong_count() > 0 {
            return Err(DirectoryError::Busy(moniker.label().to_string()));
        }

        let stage = device.template.build();
        device.bound = Arc::downgrade(&stage);
        Ok(stage)
    }
}

#[derive(Default)]
struct FactoryOptions {
    fail: Option<StageKind>,
    reject_validate: bool,
    reject_submit: bool,
}

/// Simulated stage factory.
#[derive(Default)]
pub struct SimFactory {
    tune_log: SimTuneLog,
    options: Mutex<FactoryOptions>,
    created: Mutex<Vec<(StageKind, Weak<SimStage>)>>,
}

impl SimFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests submitted to any provider from this factory.
    pub fn tune_log(&self) -> SimTuneLog {
        self.tune_log.clone()
    }

    /// Make instantiation of `kind` fail.
    pub fn fail_kind(&self, kind: Option<StageKind>) {
        self.options.lock().fail = kind;
    }

    /// Make new providers refuse validation.
    pub fn reject_validate(&self, reject: bool) {
        self.options.lock().reject_validate = reject;
    }

    /// Make new providers refuse submission.
    pub fn reject_submit(&self, reject: bool) {
        self.options.lock().reject_submit = reject;
    }

    /// The most recent live stage of a kind.
    pub fn stage(&self, kind: StageKind) -> Option<Arc<SimStage>> {
        self.created
            .lock()
            .iter()
            .rev()
            .filter(|(created, _)| *created == kind)
            .find_map(|(_, stage)| stage.upgrade())
    }

    /// Number of stages created so far that are still alive.
    pub fn live_stages(&self) -> usize {
        self.created
            .lock()
            .iter()
            .filter(|(_, stage)| stage.strong_count() > 0)
            .count()
    }
}

impl StageFactory for SimFactory {
    fn instantiate(&self, kind: StageKind) -> Result<Arc<dyn ProcessingStage>, StageError> {
        let options = self.options.lock();
        if options.fail == Some(kind) {
            return Err(StageError::Driver(format!("unable to create {}", kind)));
        }

        let template = match kind {
            StageKind::NetworkProvider(standard) => {
                let mut template = SimStage::builder(&format!("{} Network Provider", standard))
                    .output(MediaType::TUNING)
                    .tune_sink(self.tune_log.clone());
                if let Some(tune) = template.tune.as_mut() {
                    tune.standard = Some(standard);
                    tune.reject_validate = options.reject_validate;
                    tune.reject_submit = options.reject_submit;
                }
                template
            }
            StageKind::Demultiplexer => SimStage::builder("MPEG-2 Demultiplexer")
                .input(MediaType::TRANSPORT)
                .output(MediaType::SECTIONS),
            StageKind::SampleCapture => SimStage::builder("Sample Grabber")
                .input(MediaType::TRANSPORT)
                .output(MediaType::TRANSPORT)
                .capture(),
        };
        drop(options);

        let stage = template.build();
        self.created.lock().push((kind, Arc::downgrade(&stage)));
        Ok(stage)
    }
}

/// Options of a [`SimDriver`].
#[derive(Debug, Clone)]
pub struct DriverOptions {
    /// Bytes per delivered sample.
    pub chunk_size: usize,
    /// Pause between samples.
    pub interval: Duration,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            interval: Duration::ZERO,
        }
    }
}

/// Driver delivery thread feeding a capture stage from a byte source.
///
/// Samples are only pushed while the capture stage is running; the thread
/// ends at end of input or when stopped.
pub struct SimDriver {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<io::Result<u64>>>,
}

impl SimDriver {
    /// Start delivering. `on_finished` runs on the driver thread with the
    /// number of bytes delivered once the source is exhausted or the
    /// driver is stopped.
    pub fn spawn<R, F>(
        capture: Arc<SimStage>,
        source: R,
        options: DriverOptions,
        on_finished: F,
    ) -> io::Result<Self>
    where
        R: Read + Send + 'static,
        F: FnOnce(u64) + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name("sim-driver".into())
            .spawn(move || {
                let result = run_driver(&capture, source, &options, &thread_stop);
                let delivered = result.as_ref().map_or(0, |n| *n);
                on_finished(delivered);
                result
            })?;

        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |handle| handle.is_finished())
    }

    /// Stop the thread and return the number of bytes delivered.
    pub fn stop(mut self) -> io::Result<u64> {
        self.stop.store(true, Ordering::SeqCst);
        self.join()
    }

    fn join(&mut self) -> io::Result<u64> {
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .unwrap_or_else(|_| Err(io::Error::new(io::ErrorKind::Other, "driver thread panicked"))),
            None => Ok(0),
        }
    }
}

impl Drop for SimDriver {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        let _ = self.join();
    }
}

fn run_driver<R: Read>(
    capture: &SimStage,
    mut source: R,
    options: &DriverOptions,
    stop: &AtomicBool,
) -> io::Result<u64> {
    let mut chunk = vec![0u8; options.chunk_size.max(1)];
    let mut delivered = 0u64;

    'outer: while !stop.load(Ordering::SeqCst) {
        while capture.state() != StageState::Running {
            if stop.load(Ordering::SeqCst) {
                break 'outer;
            }
            thread::sleep(IDLE_POLL);
        }

        let len = read_chunk(&mut source, &mut chunk)?;
        if len == 0 {
            info!("[Sim] End of input after {} bytes", delivered);
            break;
        }

        if capture.deliver(&chunk[..len]).is_some() {
            delivered += len as u64;
        }
        if !options.interval.is_zero() {
            thread::sleep(options.interval);
        }
    }

    Ok(delivered)
}

fn read_chunk<R: Read>(source: &mut R, chunk: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < chunk.len() {
        match source.read(&mut chunk[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
