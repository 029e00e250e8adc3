//! Punisher runner.
//!
//! Plays a recorded match through the polling inspector and the punishment
//! controller, logging every intensity command and printing each punishment
//! report as a JSON line on stdout.

mod config;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use punish_controller::{PunishmentController, TracingDevice};
use punish_core::settings::SettingsHandle;
use punish_core::types::InspectionTarget;
use punish_inspector::{PollingInspector, ReplaySource};

/// How often the runner checks whether the replay has ended.
const FINISH_CHECK_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Parser, Debug)]
#[command(
    name = "punisher",
    version,
    about = "Turn fighting-game damage into haptic intensity commands"
)]
struct Args {
    /// Recorded match to play back (JSON lines)
    #[arg(long)]
    replay: PathBuf,

    /// Settings file (TOML). Defaults to <config dir>/punisher/punisher.toml if present
    #[arg(long)]
    config: Option<PathBuf>,

    /// Damage multiplier, 0-100
    #[arg(long)]
    multiplier: Option<f64>,

    /// Intensity cap, 0-200
    #[arg(long)]
    cap: Option<u32>,

    /// Idle intensity, 0-200
    #[arg(long)]
    baseline: Option<u32>,

    /// Combo increment
    #[arg(long)]
    combo: Option<u32>,

    /// Seconds without a qualifying hit before returning to baseline
    #[arg(long)]
    decay_secs: Option<f64>,

    /// Punish damage taken by either fighter
    #[arg(long)]
    punish_all: bool,

    /// Use the local-match seat instead of the networked one
    #[arg(long)]
    local_match: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log output format ("text" or "json")
    #[arg(long, default_value = "text")]
    log_format: String,
}

impl Args {
    /// Apply command-line overrides through the validated setters.
    fn apply_overrides(&self, settings: &SettingsHandle) -> Result<()> {
        if let Some(v) = self.multiplier {
            settings.set_intensity_multiplier(v)?;
        }
        if let Some(v) = self.cap {
            settings.set_intensity_cap(v)?;
        }
        if let Some(v) = self.baseline {
            settings.set_baseline_intensity(v)?;
        }
        if let Some(v) = self.combo {
            settings.set_combo_increment(v);
        }
        if let Some(v) = self.decay_secs {
            settings.set_decay_duration_secs(v)?;
        }
        if self.punish_all {
            settings.set_punish_all_players(true);
        }
        if self.local_match {
            settings.set_local_match(true);
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level, &args.log_format);

    info!("Punisher v{}", env!("CARGO_PKG_VERSION"));

    let loaded = config::load_settings(args.config.as_deref()).context("failed to load settings")?;
    let settings = SettingsHandle::new(loaded)?;
    args.apply_overrides(&settings).context("invalid command-line setting")?;
    info!(settings = ?settings.snapshot(), "settings ready");

    let replay = ReplaySource::load(&args.replay)
        .with_context(|| format!("failed to load replay {}", args.replay.display()))?;
    info!(frames = replay.frames().len(), duration = ?replay.duration(), "replay loaded");

    let inspector = Arc::new(PollingInspector::new(replay));
    let controller = PunishmentController::spawn(
        settings.clone(),
        inspector.clone(),
        Arc::new(TracingDevice),
    );
    let mut reports = controller.subscribe();

    controller
        .start(InspectionTarget::default())
        .await
        .context("failed to start monitoring")?;

    let mut finish_check = tokio::time::interval(FINISH_CHECK_INTERVAL);
    let shutdown_signal = tokio::signal::ctrl_c();
    tokio::pin!(shutdown_signal);

    loop {
        tokio::select! {
            report = reports.recv() => match report {
                Ok(report) => println!("{}", serde_json::to_string(&report)?),
                Err(RecvError::Lagged(n)) => warn!(skipped = n, "lagged behind on punishment reports"),
                Err(RecvError::Closed) => break,
            },
            _ = finish_check.tick() => {
                if inspector.source().finished() && !controller.status().await?.decay_pending {
                    info!("replay finished");
                    break;
                }
            }
            res = &mut shutdown_signal => {
                if let Err(e) = res {
                    warn!(error = %e, "failed to listen for Ctrl+C");
                }
                info!("received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    // Resolves once the final baseline command has reached the device.
    controller.shutdown().await?;
    info!("Punisher shutdown complete");
    Ok(())
}

/// Initialize tracing subscriber with the given log level and output format.
///
/// Pass `format = "json"` for structured JSON output. Any other value
/// defaults to human-readable text.
fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_level(true).with_writer(std::io::stderr))
            .init();
    }
}
