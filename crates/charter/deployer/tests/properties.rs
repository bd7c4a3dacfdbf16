//! Property tests over whole bootstrap runs.

use charter_deployer::{CorePlugin, DeployerError, Deployment, LocalEnvironment, MULTISIG_PLUGIN};
use charter_types::{Address, VersionTag};
use proptest::prelude::*;

fn members(n: usize) -> Vec<Address> {
    (0..n).map(|i| Address::named(&format!("member-{i}"))).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn padding_reaches_the_target(release in 1u8..4, build in 1u16..8) {
        let mut env = LocalEnvironment::new().unwrap();
        let setup = env.multisig_setup;
        let placeholder = env.implementations.placeholder_setup;
        let params = env
            .parameters()
            .plugin(CorePlugin::new(MULTISIG_PLUGIN, MULTISIG_PLUGIN, setup).at(release, build))
            .members(members(1))
            .build()
            .unwrap();
        let mut deployer = env.protocol_deployer(params).unwrap();
        let deployment = deployer.run_bootstrap(&mut env.chain).unwrap().clone();

        let repo = env.chain.plugin_repo(deployment.plugin_repo(MULTISIG_PLUGIN).unwrap()).unwrap();
        prop_assert_eq!(repo.latest_release(), release);
        prop_assert_eq!(repo.build_count(release), build);
        for r in 1..release {
            prop_assert_eq!(repo.build_count(r), 1);
        }
        for b in 1..build {
            prop_assert_eq!(repo.get_version(VersionTag::new(release, b)).unwrap().plugin_setup, placeholder);
        }
        prop_assert_eq!(repo.get_version(VersionTag::new(release, build)).unwrap().plugin_setup, setup);
    }

    #[test]
    fn second_run_changes_nothing(count in 1usize..6, threshold_seed in 0u16..6) {
        let min_approvals = threshold_seed % count as u16 + 1;
        let mut env = LocalEnvironment::new().unwrap();
        let params = env
            .parameters()
            .members(members(count))
            .min_approvals(min_approvals)
            .build()
            .unwrap();
        let mut deployer = env.protocol_deployer(params).unwrap();
        let first = deployer.run_bootstrap(&mut env.chain).unwrap().clone();
        let logs = env.chain.logs().len();
        let config = serde_json::to_string(deployer.parameters()).unwrap();

        prop_assert_eq!(deployer.run_bootstrap(&mut env.chain).unwrap_err(), DeployerError::AlreadyDeployed);
        prop_assert_eq!(deployer.deployment(), &first);
        prop_assert_eq!(env.chain.logs().len(), logs);
        prop_assert_eq!(serde_json::to_string(deployer.parameters()).unwrap(), config);
        prop_assert!(env.chain.permissions_held_by(deployer.address()).is_empty());
    }

    #[test]
    fn unreachable_threshold_leaves_no_trace(count in 1usize..4, excess in 1u16..4) {
        let mut env = LocalEnvironment::new().unwrap();
        let params = env
            .parameters()
            .members(members(count))
            .min_approvals(count as u16 + excess)
            .build()
            .unwrap();
        let mut deployer = env.protocol_deployer(params).unwrap();
        let accounts = env.chain.accounts().count();
        let logs = env.chain.logs().len();

        prop_assert!(deployer.run_bootstrap(&mut env.chain).is_err());
        prop_assert_eq!(deployer.deployment(), &Deployment::default());
        prop_assert_eq!(env.chain.accounts().count(), accounts);
        prop_assert_eq!(env.chain.logs().len(), logs);
    }

    #[test]
    fn runs_are_deterministic(count in 1usize..4) {
        let run = || {
            let mut env = LocalEnvironment::new().unwrap();
            let params = env.parameters().members(members(count)).build().unwrap();
            let mut deployer = env.protocol_deployer(params).unwrap();
            deployer.run_bootstrap(&mut env.chain).unwrap().clone()
        };
        prop_assert_eq!(run(), run());
    }
}
