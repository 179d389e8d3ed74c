//! Motionscope CLI.
//!
//! Resolves options, wires a Ctrl-C handler to the camera session's quit
//! flag and runs the viewfinder loop until quit, deadline or error.

use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use motionscope::camera::{SyntheticConfig, SyntheticSession};
use motionscope::options::{self, ConfigError, Options, Settings};
use motionscope::viewfinder::{self, LoopError, LoopSummary};

#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Loop(#[from] LoopError),
    #[error("signal handler: {0}")]
    Signal(#[from] ctrlc::Error),
}

fn main() -> ExitCode {
    let options = match Options::try_parse() {
        Ok(options) => options,
        Err(err) => {
            // Help, version and usage problems all print and exit cleanly;
            // the loop is never entered.
            let _ = err.print();
            return ExitCode::SUCCESS;
        }
    };

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(options::log_level(options.verbose).into()),
        )
        .init();

    match run(options) {
        Ok(summary) => {
            info!(
                frames = summary.frames,
                restarts = summary.restarts,
                "viewfinder finished"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(options: Options) -> Result<LoopSummary, AppError> {
    let settings = options.resolve()?;
    if settings.verbose >= 2 {
        println!("{:#?}", settings);
    }
    info!("motionscope v{}", motionscope::VERSION);

    if settings.camera.is_synthetic() {
        run_synthetic(&settings)
    } else {
        run_device(&settings)
    }
}

fn run_synthetic(settings: &Settings) -> Result<LoopSummary, AppError> {
    let config = SyntheticConfig {
        width: settings.camera.width,
        height: settings.camera.height,
        framerate: settings.camera.framerate,
        ..SyntheticConfig::default()
    };
    let mut session = SyntheticSession::new(config);
    install_quit_handler(session.shutdown_handle())?;
    Ok(viewfinder::run(&mut session, settings.deadline)?)
}

#[cfg(feature = "v4l2")]
fn run_device(settings: &Settings) -> Result<LoopSummary, AppError> {
    use motionscope::camera::{V4l2Config, V4l2Session};

    let config = V4l2Config {
        path: settings.camera.device.clone(),
        width: settings.camera.width,
        height: settings.camera.height,
        framerate: settings.camera.framerate,
    };
    let mut session = V4l2Session::new(config);
    install_quit_handler(session.shutdown_handle())?;
    Ok(viewfinder::run(&mut session, settings.deadline)?)
}

#[cfg(not(feature = "v4l2"))]
fn run_device(settings: &Settings) -> Result<LoopSummary, AppError> {
    Err(ConfigError::UnsupportedDevice(settings.camera.device.clone()).into())
}

fn install_quit_handler(flag: Arc<AtomicBool>) -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
}
