use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use super::dispatch::dispatch;
use super::env::CliArgs;
use super::runtime::{init_logging, load_policy_config, LoadedPolicy};

pub fn run() -> Result<()> {
    let cli = CliArgs::parse();

    init_logging(&cli.log_level, cli.debug)?;

    info!("Starting pointa-anchor v{}", env!("CARGO_PKG_VERSION"));

    let LoadedPolicy { policy, path } = load_policy_config(cli.config.as_ref())?;
    if let Some(path) = &path {
        info!("Locator policy loaded from: {}", path.display());
    }

    match dispatch(&cli, &policy) {
        Ok(()) => {
            info!("Command completed successfully");
            Ok(())
        }
        Err(err) => {
            error!("Command failed: {:#}", err);
            Err(err)
        }
    }
}
