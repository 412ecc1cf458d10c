//! RoverView - MJPEG stream viewer
//!
//! Connects to the rig camera, keeps the newest frame, and feeds it to the
//! snapshot recorder and frame statistics until Ctrl-C.

use clap::Parser;
use rover_view::{
    Config, Error, FrameStats, HttpSource, LatestFrame, Renderer, Result, SnapshotRecorder,
    StreamViewer, ViewerConfig,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "rover-view", version, about = "Rover camera viewer")]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Stream URL (overrides config)
    #[arg(short, long)]
    url: Option<String>,

    /// Save snapshots into this directory
    #[arg(short, long)]
    snapshot_dir: Option<PathBuf>,

    /// Save every N-th frame
    #[arg(short, long)]
    every: Option<u64>,

    /// Reconnect delay in milliseconds (0 = exit when the stream drops)
    #[arg(long)]
    reconnect_ms: Option<u64>,
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(url) = &args.url {
        config.stream.url = url.clone();
    }
    if let Some(dir) = &args.snapshot_dir {
        config.snapshot.dir = Some(dir.clone());
        if config.snapshot.every == 0 {
            config.snapshot.every = 1;
        }
    }
    if let Some(every) = args.every {
        config.snapshot.every = every;
    }
    if let Some(ms) = args.reconnect_ms {
        config.stream.reconnect_ms = ms;
    }
    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();
    log::info!("RoverView v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut renderers: Vec<Box<dyn Renderer>> = vec![Box::new(FrameStats::default())];
    if let Some(dir) = &config.snapshot.dir
        && config.snapshot.every > 0
    {
        renderers.push(Box::new(SnapshotRecorder::new(dir.clone(), config.snapshot.every)?));
    }

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;

    let source = HttpSource::new(
        config.stream.url.clone(),
        Duration::from_millis(config.stream.connect_timeout_ms),
    )?;
    let slot = Arc::new(LatestFrame::new());
    let (status_tx, status_rx) = crossbeam_channel::unbounded();
    let mut viewer = StreamViewer::spawn(
        Box::new(source),
        ViewerConfig::from_config(&config.stream, &config.scanner),
        Arc::clone(&slot),
        status_tx,
    )?;

    while running.load(Ordering::Relaxed) {
        for status in status_rx.try_iter() {
            log::info!("Camera: {}", status);
        }
        match slot.wait_timeout(Duration::from_millis(200)) {
            Some(frame) => {
                for renderer in renderers.iter_mut() {
                    if let Err(e) = renderer.display_frame(&frame) {
                        log::error!("Renderer failed: {}", e);
                    }
                }
            }
            // Viewer gave up (no reconnect configured)
            None if slot.is_closed() => break,
            None => {}
        }
    }

    log::info!("Shutting down...");
    viewer.stop()?;
    for status in status_rx.try_iter() {
        log::info!("Camera: {}", status);
    }
    let stats = slot.stats();
    log::info!(
        "RoverView stopped: {} frames received, {} skipped",
        stats.published,
        stats.dropped
    );
    Ok(())
}
