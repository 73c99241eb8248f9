use anchor_locator::LocatorPolicy;
use anyhow::Result;

use super::env::CliArgs;
use super::policy::cmd_policy;
use super::resolve::cmd_resolve;
use super::synthesize::cmd_synthesize;
use crate::cli::commands::Commands;

pub fn dispatch(cli: &CliArgs, policy: &LocatorPolicy) -> Result<()> {
    match cli.command.clone() {
        Commands::Synthesize(args) => cmd_synthesize(args, policy, cli.output),
        Commands::Resolve(args) => cmd_resolve(args, policy, cli.output),
        Commands::Policy => cmd_policy(policy, cli.output),
    }
}
