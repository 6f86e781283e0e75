use clap::Parser;

use glint_engine::device::GpuInit;
use glint_engine::logging::{init_logging, LoggingConfig};
use glint_engine::window::Runtime;

mod app;
mod meshes;
mod options;

use app::ViewerApp;
use options::ViewerOptions;

fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::default());

    let options = ViewerOptions::parse();
    log::debug!("{options:?}");

    let app = ViewerApp::from_options(&options)?;
    Runtime::run(options.runtime_config(), GpuInit::default(), app)
}
