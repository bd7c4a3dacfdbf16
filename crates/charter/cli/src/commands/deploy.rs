//! `charter deploy`

use std::path::PathBuf;

use anyhow::Context;
use charter_chain::ChainConfig;
use charter_deployer::{DeploymentParameters, LocalEnvironment};
use charter_types::Address;
use clap::builder::RangedU64ValueParser;
use clap::Args;
use tracing::info;

use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct DeployArgs {
    /// Parameters file (TOML); defaults to the local environment's parameters
    #[arg(short, long, env = "CHARTER_PARAMS")]
    params: Option<PathBuf>,

    /// Management DAO member: a 0x address or a name to derive one from
    #[arg(short, long = "member", value_parser = parse_member)]
    members: Vec<Address>,

    /// Approvals the management multisig requires
    #[arg(long)]
    min_approvals: Option<u16>,

    /// Work units the bootstrap may consume
    #[arg(long, env = "CHARTER_MAX_WORK")]
    max_work: Option<u64>,

    /// Actions one routed DAO call may carry
    #[arg(
        long,
        default_value_t = 256,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..)
    )]
    max_actions: usize,

    /// Also print the event log
    #[arg(long)]
    events: bool,
}

pub fn parse_member(value: &str) -> Result<Address, String> {
    if value.starts_with("0x") {
        value.parse().map_err(|e| format!("{e}"))
    } else if value.is_empty() {
        Err("member must not be empty".to_string())
    } else {
        Ok(Address::named(value))
    }
}

pub fn execute(args: DeployArgs, format: OutputFormat) -> anyhow::Result<()> {
    let mut env = LocalEnvironment::with_config(ChainConfig {
        max_work_per_transaction: args.max_work,
        max_actions: args.max_actions,
    })?;

    let mut parameters = match &args.params {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            toml::from_str::<DeploymentParameters>(&text)
                .with_context(|| format!("parsing {}", path.display()))?
        }
        None => env.parameters().build()?,
    };
    if !args.members.is_empty() {
        parameters.management_dao.members = args.members;
    }
    if let Some(min_approvals) = args.min_approvals {
        parameters.management_dao.min_approvals = min_approvals;
    }

    let mut deployer = env.protocol_deployer(parameters)?;
    let logs_before = env.chain.logs().len();
    let deployment = deployer
        .run_bootstrap(&mut env.chain)
        .context("bootstrap failed")?
        .clone();
    info!(
        engine = %deployer.address(),
        work = env.chain.work_used(),
        "Bootstrap complete"
    );

    let events = args.events.then(|| &env.chain.logs()[logs_before..]);
    output::print_deployment(deployer.address(), &deployment, events, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Command {
        #[command(flatten)]
        args: DeployArgs,
    }

    #[test]
    fn max_actions_must_be_positive() {
        assert!(Command::try_parse_from(["deploy", "--max-actions", "0"]).is_err());
        let parsed = Command::try_parse_from(["deploy", "--max-actions", "4"]).unwrap();
        assert_eq!(parsed.args.max_actions, 4);
        let parsed = Command::try_parse_from(["deploy"]).unwrap();
        assert_eq!(parsed.args.max_actions, 256);
    }

    #[test]
    fn members_accept_names_and_hex() {
        let named = parse_member("alice").unwrap();
        assert_eq!(named, Address::named("alice"));
        assert_eq!(parse_member(&named.to_hex()).unwrap(), named);
        assert!(parse_member("0xzz").is_err());
        assert!(parse_member("").is_err());
    }
}
