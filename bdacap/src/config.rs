//! Configuration file and its merge with the command line.
//!
//! Precedence is command line, then the configuration file, then built-in
//! defaults. Property assignments given with `-p` are applied last.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bdasrc::backend::sim::{DriverOptions, DEFAULT_CHUNK_SIZE};
use bdasrc::properties::{self, PropertyError};
use bdasrc::{SessionConfig, TunerStandard, TuningParameters};
use serde::Deserialize;
use thiserror::Error;

use crate::context::{CaptureArgs, Cli};
use crate::logging::LoggingOptions;

/// Looked up in the working directory when no `--config` is given.
pub(crate) const DEFAULT_CONFIG_FILE: &str = "bdacap.toml";

/// Default pause between replayed samples.
pub(crate) const DEFAULT_INTERVAL_MS: u64 = 20;

/// Default retention of rotated log files.
pub(crate) const DEFAULT_RETENTION_DAYS: u64 = 7;

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("No stream to replay; pass --replay or set `replay` in [capture]")]
    MissingReplay,

    #[error(transparent)]
    Property(#[from] PropertyError),
}

/// Configuration file format.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ConfigFile {
    #[serde(default)]
    pub tuning: TuningParameters,
    #[serde(default)]
    pub capture: CaptureSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct CaptureSection {
    pub replay: Option<PathBuf>,
    pub standard: Option<TunerStandard>,
    pub device_index: Option<u32>,
    pub buffer_size: Option<usize>,
    pub output: Option<PathBuf>,
    pub duration: Option<u64>,
    pub chunk_size: Option<usize>,
    pub interval_ms: Option<u64>,
    pub progress: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct LoggingSection {
    pub log_dir: Option<PathBuf>,
    pub retention_days: Option<u64>,
    pub level: Option<String>,
}

/// Explicit path, else `bdacap.toml` when present.
pub(crate) fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
            default_path.exists().then_some(default_path)
        }
    }
}

pub(crate) fn load(path: &Path) -> Result<ConfigFile, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse(path, &contents)
}

fn parse(path: &Path, contents: &str) -> Result<ConfigFile, ConfigError> {
    toml::from_str(contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn logging_options(cli: &Cli, file: &LoggingSection) -> LoggingOptions {
    LoggingOptions {
        log_dir: cli.log_dir.clone().or_else(|| file.log_dir.clone()),
        retention_days: cli
            .log_retention_days
            .or(file.retention_days)
            .unwrap_or(DEFAULT_RETENTION_DAYS),
        verbose: cli.verbose,
        level: file.level.clone(),
    }
}

/// Everything a capture run needs.
#[derive(Debug, Clone)]
pub(crate) struct CaptureSettings {
    pub replay: PathBuf,
    pub standard: TunerStandard,
    pub session: SessionConfig,
    /// `None` writes to stdout.
    pub output: Option<PathBuf>,
    pub duration: Option<Duration>,
    pub driver: DriverOptions,
    pub progress: bool,
}

impl CaptureSettings {
    pub(crate) fn resolve(args: CaptureArgs, file: ConfigFile) -> Result<Self, ConfigError> {
        let capture = file.capture;
        let replay = args
            .replay
            .or(capture.replay)
            .ok_or(ConfigError::MissingReplay)?;

        let mut session = SessionConfig {
            tuning: file.tuning,
            ..SessionConfig::default()
        };
        if let Some(index) = args.device_index.or(capture.device_index) {
            session.device_index = index;
        }
        if let Some(size) = args.buffer_size.or(capture.buffer_size) {
            session.buffer_size = size;
        }
        let tuning = &mut session.tuning;
        if let Some(frequency) = args.frequency {
            tuning.frequency = frequency;
        }
        if let Some(symbol_rate) = args.symbol_rate {
            tuning.symbol_rate = symbol_rate;
        }
        if let Some(bandwidth) = args.bandwidth {
            tuning.bandwidth = bandwidth;
        }
        if let Some(modulation) = args.modulation {
            tuning.modulation = modulation;
        }

        for (name, text) in &args.properties {
            let spec = properties::find(name).ok_or_else(|| PropertyError::Unknown(name.clone()))?;
            properties::set(&mut session, name, &spec.parse(text)?)?;
        }
        properties::validate_config(&session)?;

        let output = args
            .output
            .or(capture.output)
            .filter(|path| path.as_os_str() != "-");

        Ok(Self {
            replay,
            standard: args
                .standard
                .or(capture.standard)
                .unwrap_or(TunerStandard::DvbT),
            session,
            output,
            duration: args.duration.or(capture.duration).map(Duration::from_secs),
            driver: DriverOptions {
                chunk_size: args
                    .chunk_size
                    .or(capture.chunk_size)
                    .unwrap_or(DEFAULT_CHUNK_SIZE),
                interval: Duration::from_millis(
                    args.interval_ms
                        .or(capture.interval_ms)
                        .unwrap_or(DEFAULT_INTERVAL_MS),
                ),
            },
            progress: !args.no_progress && capture.progress.unwrap_or(true),
        })
    }
}
