use anyhow::Result;
use clap::Parser;
use tracing::info;

use portalwatch::telemetry;
use portalwatch::{BaseConfig, Monitor};

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init();
    info!("Starting portalwatch");

    let config = BaseConfig::parse();
    config.validate()?;
    info!(
        "Configuration: state_dir={:?}, workbook={:?}, timezone={}, window={}-{}",
        config.state_dir,
        config.workbook_path,
        config.timezone,
        config.daily_window_start,
        config.daily_window_end
    );

    let monitor = Monitor::initialize(config)?;
    monitor.run().await?;

    info!("portalwatch shutdown complete");
    Ok(())
}
