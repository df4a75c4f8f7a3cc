use std::path::PathBuf;

use bdasrc::TunerStandard;
use bdasrc_types::Modulation;
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[clap(name = "bdacap")]
#[clap(about = "bdacap captures a live MPEG-2 transport stream through a tuner graph.", long_about = None)]
#[clap(version)]
pub(crate) struct Cli {
    /// Configuration file.{n}
    /// When omitted, `bdacap.toml` in the working directory is used if it exists.
    #[clap(short = 'f', long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable debug logging.
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Directory for rotated log files.{n}
    /// Logs go to stderr only when neither this nor `[logging] log_dir` is set.
    #[clap(long, global = true, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Number of days to keep rotated log files.
    #[clap(long, global = true, value_name = "DAYS")]
    pub log_retention_days: Option<u64>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Commands {
    /// Capture a stream.{n}
    /// A recorded transport stream is played back by a simulated tuner
    /// driver and pulled through a full capture session: device binding,
    /// standard detection, graph assembly, tuning and buffering.{n}
    /// The captured bytes are written to the output file or stdout.
    #[clap(name = "capture")]
    Capture(CaptureArgs),

    /// List the session properties with their ranges and defaults.
    #[clap(name = "properties")]
    Properties,
}

#[derive(Debug, Default, Args)]
pub(crate) struct CaptureArgs {
    /// Recorded transport stream fed to the simulated tuner.
    #[clap(short, long, value_name = "FILE")]
    pub replay: Option<PathBuf>,

    /// Broadcast standard implemented by the simulated tuner.{n}
    /// One of ATSC, DVB-C, DVB-S, DVB-T. Defaults to DVB-T.
    #[clap(short, long, value_name = "STANDARD")]
    pub standard: Option<TunerStandard>,

    /// Ordinal of the tuner device to bind.
    #[clap(short = 'i', long, value_name = "INDEX")]
    pub device_index: Option<u32>,

    /// Carrier frequency in kHz.
    #[clap(long, value_name = "KHZ")]
    pub frequency: Option<u32>,

    /// Symbol rate in kHz (DVB-C, DVB-S).
    #[clap(long, value_name = "KHZ")]
    pub symbol_rate: Option<u32>,

    /// Channel bandwidth in MHz (DVB-T).
    #[clap(long, value_name = "MHZ")]
    pub bandwidth: Option<u8>,

    /// Modulation, e.g. "QAM 64" or "8VSB".
    #[clap(long)]
    pub modulation: Option<Modulation>,

    /// Set any other session property.{n}
    /// May be repeated, e.g. `-p guard-interval=8 -p transmission-mode=2k`.{n}
    /// Run `bdacap properties` for the list.
    #[clap(short = 'p', long = "property", value_name = "NAME=VALUE", value_parser = parse_assignment)]
    pub properties: Vec<(String, String)>,

    /// Number of buffers kept before the oldest is dropped.
    #[clap(short, long, value_name = "BUFFERS")]
    pub buffer_size: Option<usize>,

    /// Output file. `-` or no value writes to stdout.
    #[clap(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Stop after this many seconds.
    #[clap(short, long, value_name = "SECONDS")]
    pub duration: Option<u64>,

    /// Bytes per sample delivered by the driver.
    #[clap(long, value_name = "BYTES")]
    pub chunk_size: Option<usize>,

    /// Milliseconds between samples.{n}
    /// 0 replays as fast as possible; the queue then drops what the
    /// output cannot keep up with.
    #[clap(long, value_name = "MS")]
    pub interval_ms: Option<u64>,

    /// Hide the progress spinner.
    #[clap(long)]
    pub no_progress: bool,
}

fn parse_assignment(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", s))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing property name in '{}'", s));
    }
    Ok((name.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_capture() {
        let cli = Cli::try_parse_from([
            "bdacap",
            "-v",
            "capture",
            "-r",
            "in.ts",
            "-s",
            "dvb-c",
            "--frequency",
            "474000",
            "--modulation",
            "QAM 64",
            "-p",
            "symbol-rate=6900",
            "-p",
            "inner-fec-rate=3/4",
        ])
        .unwrap();

        assert!(cli.verbose);
        let Commands::Capture(args) = cli.command else {
            panic!("expected capture");
        };
        assert_eq!(args.replay, Some(PathBuf::from("in.ts")));
        assert_eq!(args.standard, Some(TunerStandard::DvbC));
        assert_eq!(args.frequency, Some(474_000));
        assert_eq!(args.modulation, Some(Modulation::Qam64));
        assert_eq!(
            args.properties,
            vec![
                ("symbol-rate".to_string(), "6900".to_string()),
                ("inner-fec-rate".to_string(), "3/4".to_string()),
            ]
        );
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(Cli::try_parse_from(["bdacap", "capture", "-s", "ISDB-T"]).is_err());
        assert!(Cli::try_parse_from(["bdacap", "capture", "-p", "frequency"]).is_err());
        assert!(Cli::try_parse_from(["bdacap", "capture", "-p", "=1"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["bdacap", "properties", "--log-dir", "logs"]).unwrap();
        assert!(matches!(cli.command, Commands::Properties));
        assert_eq!(cli.log_dir, Some(PathBuf::from("logs")));
    }
}
