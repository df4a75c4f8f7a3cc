//! bdacap: capture a live MPEG-2 transport stream through a tuner graph.

use clap::Parser;
use log::{error, info};

use bdasrc::properties::{PropertyKind, PROPERTIES};

mod capture;
mod config;
mod context;
mod logging;

use crate::config::{CaptureSettings, ConfigFile};
use crate::context::{Cli, Commands};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Explicit path > auto-detect > defaults
    let file_config = match config::locate(cli.config.as_deref()) {
        Some(path) => {
            let loaded = config::load(&path)?;
            eprintln!("Loaded config from: {}", path.display());
            loaded
        }
        None => ConfigFile::default(),
    };

    logging::init_logging(&config::logging_options(&cli, &file_config.logging))?;

    match cli.command {
        Commands::Properties => {
            print_properties();
            Ok(())
        }
        Commands::Capture(args) => {
            let settings = CaptureSettings::resolve(args, file_config)?;
            info!(
                "[Capture] Replaying {} as {}",
                settings.replay.display(),
                settings.standard
            );
            match capture::run(settings) {
                Ok(report) => {
                    info!(
                        "[Capture] Wrote {} of {} delivered bytes ({} buffers dropped)",
                        report.written, report.delivered, report.queue.dropped
                    );
                    Ok(())
                }
                Err(e) => {
                    error!("[Capture] {}", e);
                    Err(e)
                }
            }
        }
    }
}

fn print_properties() {
    for spec in PROPERTIES {
        let detail = match spec.kind {
            PropertyKind::Int { min, max, default } => {
                format!("integer {}..={}, default {}", min, max, default)
            }
            PropertyKind::Bool { default } => format!("boolean, default {}", default),
            PropertyKind::Enum { nicks, default } => {
                format!("one of {}, default {}", nicks.join(" | "), default)
            }
            PropertyKind::Text => "string".to_string(),
        };
        let access = if spec.writable { "" } else { " (read-only)" };
        println!("{:<18} {}{}", spec.name, spec.blurb, access);
        println!("{:<18} {}", "", detail);
    }
}
