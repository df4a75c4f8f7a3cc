//! Replay capture: a recorded stream played back by the simulated driver
//! and pulled through a capture session.

use std::error::Error;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bdasrc::backend::sim::{SimDirectory, SimDriver, SimFactory, SimSignal, SimStage};
use bdasrc::queue::QueueStats;
use bdasrc::{DeviceCategory, Session, SessionError, SessionState, StageKind};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};

use crate::config::CaptureSettings;

/// How often end of input checks whether the consumer has drained the queue.
const DRAIN_POLL: Duration = Duration::from_millis(10);

/// Outcome of a capture run.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CaptureReport {
    pub written: u64,
    pub delivered: u64,
    pub queue: QueueStats,
}

/// Simulated devices for a replay: one tuner of the requested standard and
/// the transport information stages a real driver stack registers.
fn replay_directory(settings: &CaptureSettings) -> Arc<SimDirectory> {
    let name = format!(
        "Replay {} Tuner ({})",
        settings.standard,
        file_label(&settings.replay)
    );
    let directory = Arc::new(SimDirectory::new());
    directory.add_device(
        DeviceCategory::NetworkTuner,
        Some(&name),
        SimStage::tuner(&name, settings.standard, SimSignal::locked()),
    );
    directory.add_device(
        DeviceCategory::TransportInformation,
        Some("BDA MPE Filter"),
        SimStage::transport_information("BDA MPE Filter"),
    );
    directory.add_device(
        DeviceCategory::TransportInformation,
        Some("BDA MPEG2 Transport Information Filter"),
        SimStage::transport_information("BDA MPEG2 Transport Information Filter"),
    );
    directory
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn open_output(path: Option<&Path>) -> io::Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    })
}

fn progress_bar(enabled: bool) -> Result<ProgressBar, Box<dyn Error>> {
    if !enabled {
        return Ok(ProgressBar::hidden());
    }
    let bar = ProgressBar::new_spinner();
    bar.set_style(ProgressStyle::with_template(
        "{spinner} {elapsed_precise} {bytes} ({bytes_per_sec}) {msg}",
    )?);
    bar.enable_steady_tick(Duration::from_millis(200));
    Ok(bar)
}

/// Run a capture until end of input, the duration elapses or Ctrl-C.
pub(crate) fn run(settings: CaptureSettings) -> Result<CaptureReport, Box<dyn Error>> {
    let source = File::open(&settings.replay)
        .map_err(|e| format!("Failed to open {}: {}", settings.replay.display(), e))?;

    let factory = Arc::new(SimFactory::new());
    let session = Arc::new(Session::with_config(
        replay_directory(&settings),
        factory.clone(),
        settings.session.clone(),
    )?);

    session.try_create_graph()?;
    info!(
        "[Capture] Device '{}' ({})",
        session.device_name(),
        session.input_type()
    );

    let capture = factory
        .stage(StageKind::SampleCapture)
        .ok_or("capture stage missing from the graph")?;
    let driver = {
        let session = Arc::clone(&session);
        SimDriver::spawn(capture, source, settings.driver.clone(), move |delivered| {
            info!("[Capture] End of input after {} bytes", delivered);
            if wait_for_drain(&session) {
                session.unlock();
            }
        })?
    };

    {
        let session = Arc::clone(&session);
        let installed = ctrlc::set_handler(move || {
            info!("[Capture] Interrupted");
            session.unlock();
        });
        if let Err(e) = installed {
            warn!("[Capture] Ctrl-C handler not installed: {}", e);
        }
    }

    if let Some(duration) = settings.duration {
        let session = Arc::clone(&session);
        thread::Builder::new()
            .name("capture-timer".into())
            .spawn(move || {
                thread::sleep(duration);
                info!("[Capture] Duration of {:?} elapsed", duration);
                session.unlock();
            })?;
    }

    match session.try_start_tuning() {
        Ok(stats) => info!(
            "[Capture] Tuned: strength={} quality={} locked={}",
            stats.strength, stats.quality, stats.locked
        ),
        Err(SessionError::SignalNotLocked(stats)) => warn!(
            "[Capture] No signal lock (strength={} quality={}), capturing anyway",
            stats.strength, stats.quality
        ),
        Err(e) => {
            session.stop();
            let _ = driver.stop();
            return Err(e.into());
        }
    }

    let bar = progress_bar(settings.progress)?;
    let written = pump(&session, settings.output.as_deref(), &bar);

    session.unlock_stop();
    let queue = session.queue_stats();
    session.stop();
    let delivered = driver.stop()?;
    bar.finish_and_clear();

    let written = written?;
    if queue.dropped > 0 {
        warn!(
            "[Capture] {} buffers dropped because the output fell behind",
            queue.dropped
        );
    }
    Ok(CaptureReport {
        written,
        delivered,
        queue,
    })
}

/// Wait until the consumer has pulled everything queued.
///
/// Returns `false` without waiting further once the session leaves the
/// running state; whoever moved it has ended the capture already.
fn wait_for_drain(session: &Session) -> bool {
    loop {
        if session.state() != SessionState::Running {
            return false;
        }
        if session.queued() == 0 {
            return true;
        }
        thread::sleep(DRAIN_POLL);
    }
}

/// Pull buffers into the output until the session flushes.
fn pump(session: &Session, output: Option<&Path>, bar: &ProgressBar) -> io::Result<u64> {
    let mut out = match open_output(output) {
        Ok(out) => out,
        Err(e) => {
            error!("[Capture] Failed to open output: {}", e);
            session.unlock();
            return Err(e);
        }
    };

    let mut written = 0u64;
    while let Ok(buffer) = session.pull_next_buffer() {
        if let Err(e) = out.write_all(buffer.as_slice()) {
            session.unlock();
            return Err(e);
        }
        written += buffer.len() as u64;
        bar.set_position(written);
    }
    out.flush()?;
    Ok(written)
}
