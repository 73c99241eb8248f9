use clap::Subcommand;

use super::resolve::ResolveArgs;
use super::synthesize::SynthesizeArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Build an anchor for one element of a DOM snapshot
    Synthesize(SynthesizeArgs),

    /// Find the element a stored anchor refers to
    Resolve(ResolveArgs),

    /// Show the effective locator policy
    Policy,
}
