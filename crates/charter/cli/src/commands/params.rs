//! `charter params`

use std::path::PathBuf;

use anyhow::Context;
use charter_deployer::LocalEnvironment;
use clap::Args;

#[derive(Args)]
pub struct ParamsArgs {
    /// Write to this file instead of stdout
    #[arg(short, long)]
    out: Option<PathBuf>,
}

/// Print the local environment's parameters with a single placeholder
/// member. Seeding is deterministic, so the addresses stay valid for
/// `charter deploy --params`.
pub fn execute(args: ParamsArgs) -> anyhow::Result<()> {
    let env = LocalEnvironment::new()?;
    let parameters = env
        .parameters()
        .member(charter_types::Address::named("member"))
        .build()?;
    let text = toml::to_string_pretty(&parameters)?;
    match args.out {
        Some(path) => {
            std::fs::write(&path, text).with_context(|| format!("writing {}", path.display()))?
        }
        None => print!("{text}"),
    }
    Ok(())
}
