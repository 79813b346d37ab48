//! Metaball Viewer
//!
//! Opens a fixed-size window and renders the metaball density field every
//! frame. SPACE switches between the GPU and CPU backends; closing the window
//! quits. An optional first argument names a JSON config file.

mod app;

use std::path::Path;
use std::process::ExitCode;

use kernel::gpu::load_kernel_source;
use kernel::GpuEvaluator;
use orchestrator::{FrameRunner, SystemClock, ViewerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use winit::event_loop::{ControlFlow, EventLoop};

use app::App;

fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "viewer=info,orchestrator=info,kernel=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => {
            tracing::info!("Loading config: {}", path);
            ViewerConfig::load(&path)?
        }
        None => {
            let config = ViewerConfig::default();
            config.validate()?;
            config
        }
    };

    tracing::info!("Starting metaball viewer ({}x{})", config.width, config.height);

    // Device program and GPU backend; any failure here ends the process.
    let source = load_kernel_source(Path::new(&config.kernel_source))?;
    let gpu = GpuEvaluator::new(&source, config.width, config.height, config.n_charges)?;

    let runner = FrameRunner::from_config(&config, Some(Box::new(gpu)), SystemClock);

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(runner, config.width, config.height);
    event_loop.run_app(&mut app)?;
    app.finish()?;

    tracing::info!("Exiting");
    Ok(())
}
