//! RoverIO - Actuator daemon for the GrandRaspberry rover
//!
//! Serves the byte-framed command protocol on one TCP port (8081 by
//! default). One controlling client at a time; a new connection replaces the
//! old one.

use clap::Parser;
use rover_io::devices::create_device;
use rover_io::{ActuatorController, CommandServer, Config, Error, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

const DEFAULT_CONFIG: &str = "/etc/rover-io.toml";

#[derive(Parser, Debug)]
#[command(name = "rover-io", version, about = "Rover actuator daemon")]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

/// Explicit paths must exist; the default path falls back to built-in defaults
fn load_config(explicit: Option<&Path>) -> Result<Config> {
    match explicit {
        Some(path) => Config::load(path),
        None if Path::new(DEFAULT_CONFIG).exists() => Config::load(DEFAULT_CONFIG),
        None => Ok(Config::default()),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    log::info!("RoverIO v{} starting...", env!("CARGO_PKG_VERSION"));
    match &args.config {
        Some(path) => log::info!("Using config: {}", path.display()),
        None => log::info!("Using config: {} (or built-in defaults)", DEFAULT_CONFIG),
    }
    log::info!("Device: {}", config.device.device_type);

    let driver = create_device(&config.device)?;
    let controller = ActuatorController::with_initialized(driver)?.into_shared();

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;

    let mut server = CommandServer::bind(&config.network, Arc::clone(&controller), running)?
        .with_session_config(config.session.clone());
    log::info!("RoverIO running. Press Ctrl-C to stop.");
    server.run()?;

    log::info!("Shutting down...");
    controller.lock().shutdown()?;
    log::info!("RoverIO stopped");
    Ok(())
}
