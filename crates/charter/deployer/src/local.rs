//! Local environment: a fresh in-memory chain seeded with everything a
//! deployment needs besides the deployer itself.

use charter_chain::{Chain, ChainConfig, ChainError, ComponentKind, PluginSetupKind};
use charter_types::Address;
use tracing::debug;

use crate::config::{
    CorePlugin, DeploymentParameters, DeploymentParametersBuilder, Helpers, Implementations,
};
use crate::engine::ProtocolDeployer;
use crate::error::DeployerResult;
use crate::helpers::{deploy_helper, HelperKind};

/// Name the seeding account's address derives from.
pub const DEFAULT_DEPLOYER: &str = "charter-deployer";

/// Key and subdomain of the multisig core plugin.
pub const MULTISIG_PLUGIN: &str = "multisig";

pub struct LocalEnvironment {
    pub chain: Chain,
    pub deployer: Address,
    pub implementations: Implementations,
    pub helpers: Helpers,
    pub multisig_setup: Address,
}

impl LocalEnvironment {
    pub fn new() -> DeployerResult<Self> {
        Self::with_config(ChainConfig::default())
    }

    /// Seed a chain with base implementations, the placeholder and multisig
    /// setups and one helper of every kind. Seeding is deterministic.
    pub fn with_config(config: ChainConfig) -> DeployerResult<Self> {
        let mut chain = Chain::with_config(ChainConfig {
            max_work_per_transaction: None,
            ..config.clone()
        });
        let deployer = Address::named(DEFAULT_DEPLOYER);

        let (implementations, helpers, multisig_setup) = chain.transact(|c| {
            let implementations = Implementations {
                dao_base: c.deploy_implementation(deployer, ComponentKind::Dao)?,
                dao_registry_base: c.deploy_implementation(deployer, ComponentKind::DaoRegistry)?,
                plugin_repo_registry_base: c
                    .deploy_implementation(deployer, ComponentKind::PluginRepoRegistry)?,
                plugin_repo_base: c.deploy_implementation(deployer, ComponentKind::PluginRepo)?,
                subdomain_registrar_base: c
                    .deploy_implementation(deployer, ComponentKind::SubdomainRegistrar)?,
                placeholder_setup: c.deploy_plugin_setup(deployer, PluginSetupKind::Placeholder)?,
            };
            let multisig_setup = c.deploy_plugin_setup(deployer, PluginSetupKind::Multisig)?;
            let helpers = Helpers {
                naming: deploy_helper(c, deployer, HelperKind::Naming)?,
                dao_factory: deploy_helper(c, deployer, HelperKind::DaoFactory)?,
                plugin_repo_factory: deploy_helper(c, deployer, HelperKind::PluginRepoFactory)?,
                plugin_setup_processor: deploy_helper(c, deployer, HelperKind::PluginSetupProcessor)?,
            };
            Ok::<_, ChainError>((implementations, helpers, multisig_setup))
        })?;

        // The work ceiling applies to the deployment, not to seeding.
        chain.set_config(config);
        debug!(deployer = %deployer, accounts = chain.accounts().count(), "Local environment seeded");

        Ok(Self {
            chain,
            deployer,
            implementations,
            helpers,
            multisig_setup,
        })
    }

    /// Builder pre-filled with the seeded addresses and the multisig plugin
    /// at v1.1. Members are left empty.
    pub fn parameters(&self) -> DeploymentParametersBuilder {
        DeploymentParameters::builder()
            .implementations(self.implementations.clone())
            .helpers(self.helpers.clone())
            .plugin(CorePlugin::new(
                MULTISIG_PLUGIN,
                MULTISIG_PLUGIN,
                self.multisig_setup,
            ))
            .controlling_plugin(MULTISIG_PLUGIN)
    }

    /// Create a deployer for `parameters` on this environment's chain.
    pub fn protocol_deployer(
        &mut self,
        parameters: DeploymentParameters,
    ) -> DeployerResult<ProtocolDeployer> {
        ProtocolDeployer::deploy(&mut self.chain, self.deployer, parameters)
    }
}
