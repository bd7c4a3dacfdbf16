//! The protocol deployer.
//!
//! [`ProtocolDeployer::run_bootstrap`] executes the whole bootstrap as one
//! unit of work:
//!
//! 1. Create the management DAO and let the engine route calls through it
//! 2. Deploy the naming service and the two subdomain registrars
//! 3. Create the registries and the static singletons
//! 4. Wire registry, registrar and factory permissions
//! 5. Create and publish every core plugin repository
//! 6. Register the management DAO and install its multisig
//! 7. Revoke the engine's own rights
//! 8. Emit `ProtocolDeployed`
//!
//! Any failure rolls the unit back; the deployment record stays empty and
//! the run may be retried.

use std::fmt;

use charter_chain::{Action, Call, Chain, Event, MultiTargetPermission};
use charter_types::{Address, Permission};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::DeploymentParameters;
use crate::error::{DeployerError, DeployerResult};
use crate::helpers::{self, NamingSetup};
use crate::management;
use crate::record::{DeployedPluginRepo, Deployment};
use crate::repos::{self, RepoContext};

/// Label of the deployer's own account.
pub const ENGINE_LABEL: &str = "charter:protocol-deployer";

/// Lifecycle of a [`ProtocolDeployer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    /// No successful run yet; a failed run returns here.
    Uninitialized,
    /// A run is in progress.
    Running,
    /// The protocol is deployed; further runs are rejected.
    Completed,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// Step of the bootstrap sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BootstrapStep {
    /// Step 1: management DAO creation.
    ManagementDao,
    /// Step 2: naming service and registrars.
    Naming,
    /// Step 3: registries and static singletons.
    Registries,
    /// Step 4: permission wiring.
    Permissions,
    /// Step 5: plugin repositories.
    PluginRepos,
    /// Step 6: management DAO registration and controlling body.
    FinalizeManagementDao,
    /// Step 7: revocation of the engine's rights.
    RevokeEngineRights,
    /// Step 8: completion event.
    Complete,
}

impl fmt::Display for BootstrapStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ManagementDao => write!(f, "Step 1: Management DAO"),
            Self::Naming => write!(f, "Step 2: Naming"),
            Self::Registries => write!(f, "Step 3: Registries"),
            Self::Permissions => write!(f, "Step 4: Permissions"),
            Self::PluginRepos => write!(f, "Step 5: Plugin Repos"),
            Self::FinalizeManagementDao => write!(f, "Step 6: Finalize Management DAO"),
            Self::RevokeEngineRights => write!(f, "Step 7: Revoke Engine Rights"),
            Self::Complete => write!(f, "Step 8: Complete"),
        }
    }
}

/// Deploys the protocol exactly once.
#[derive(Debug)]
pub struct ProtocolDeployer {
    address: Address,
    parameters: DeploymentParameters,
    deployment: Deployment,
    state: EngineState,
}

impl ProtocolDeployer {
    /// Validate `parameters` and create the deployer's account.
    pub fn deploy(
        chain: &mut Chain,
        deployer: Address,
        parameters: DeploymentParameters,
    ) -> DeployerResult<Self> {
        parameters.validate()?;
        let address = chain.transact(|c| c.deploy_external(deployer, ENGINE_LABEL))?;
        info!(engine = %address, deployer = %deployer, "Protocol deployer created");
        Ok(Self {
            address,
            parameters,
            deployment: Deployment::default(),
            state: EngineState::Uninitialized,
        })
    }

    /// The deployer's own account.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Parameters fixed at creation.
    pub fn parameters(&self) -> &DeploymentParameters {
        &self.parameters
    }

    /// Deployment record; all zero until a run completes.
    pub fn deployment(&self) -> &Deployment {
        &self.deployment
    }

    /// Current lifecycle state.
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Run the bootstrap. Fails with [`DeployerError::AlreadyDeployed`]
    /// without touching `chain` once a run has completed.
    pub fn run_bootstrap(&mut self, chain: &mut Chain) -> DeployerResult<&Deployment> {
        if self.deployment.is_deployed() {
            warn!(engine = %self.address, "Bootstrap already ran");
            return Err(DeployerError::AlreadyDeployed);
        }

        self.state = EngineState::Running;
        let engine = self.address;
        let parameters = &self.parameters;
        match chain.transact(|c| Bootstrap::new(c, engine, parameters).run()) {
            Ok(deployment) => {
                self.deployment = deployment;
                self.state = EngineState::Completed;
                info!(
                    engine = %engine,
                    management_dao = %self.deployment.management_dao,
                    dao_factory = %self.deployment.dao_factory,
                    "Protocol deployed"
                );
                Ok(&self.deployment)
            }
            Err(err) => {
                self.state = EngineState::Uninitialized;
                Err(err)
            }
        }
    }
}

/// One bootstrap run inside an open unit of work.
struct Bootstrap<'a> {
    chain: &'a mut Chain,
    engine: Address,
    params: &'a DeploymentParameters,
    record: Deployment,
    naming: Option<NamingSetup>,
}

impl<'a> Bootstrap<'a> {
    fn new(chain: &'a mut Chain, engine: Address, params: &'a DeploymentParameters) -> Self {
        Self {
            chain,
            engine,
            params,
            record: Deployment::default(),
            naming: None,
        }
    }

    fn run(mut self) -> DeployerResult<Deployment> {
        let steps: [(BootstrapStep, fn(&mut Self) -> DeployerResult<()>); 8] = [
            (BootstrapStep::ManagementDao, Self::create_management_dao),
            (BootstrapStep::Naming, Self::setup_naming),
            (BootstrapStep::Registries, Self::create_registries),
            (BootstrapStep::Permissions, Self::wire_permissions),
            (BootstrapStep::PluginRepos, Self::create_plugin_repos),
            (BootstrapStep::FinalizeManagementDao, Self::finalize_management_dao),
            (BootstrapStep::RevokeEngineRights, Self::revoke_engine_rights),
            (BootstrapStep::Complete, Self::complete),
        ];
        for (step, body) in steps {
            info!(step = %step, "Bootstrap step started");
            if let Err(err) = body(&mut self) {
                warn!(step = %step, error = %err, "Bootstrap step failed");
                return Err(err);
            }
        }
        Ok(self.record)
    }

    fn create_management_dao(&mut self) -> DeployerResult<()> {
        self.record.management_dao = management::create_management_dao(
            self.chain,
            self.engine,
            self.params.implementations.dao_base,
            &self.params.management_dao.metadata_uri,
        )?;
        Ok(())
    }

    fn setup_naming(&mut self) -> DeployerResult<()> {
        let helper = self.params.helpers.naming;
        let dao = self.record.management_dao;
        let naming = helpers::setup_naming(self.chain, helper, &self.params.ens)?;

        let registrar_base = self.params.implementations.subdomain_registrar_base;
        let dao_registrar = self.chain.create_subdomain_registrar(
            self.engine,
            registrar_base,
            dao,
            naming.registry,
            naming.dao_node,
        )?;
        let plugin_registrar = self.chain.create_subdomain_registrar(
            self.engine,
            registrar_base,
            dao,
            naming.registry,
            naming.plugin_node,
        )?;

        // The DAO becomes the node owner, so the approvals must be its own.
        let approvals = [dao_registrar, plugin_registrar]
            .into_iter()
            .map(|operator| {
                Action::new(
                    naming.registry,
                    Call::SetApprovalForAll {
                        operator,
                        approved: true,
                    },
                )
            })
            .collect();
        self.chain.execute(self.engine, dao, 0, approvals)?;

        helpers::transfer_naming(self.chain, helper, &naming, dao)?;

        self.record.ens_registry = naming.registry;
        self.record.public_resolver = naming.resolver;
        self.record.dao_subdomain_registrar = dao_registrar;
        self.record.plugin_subdomain_registrar = plugin_registrar;
        self.naming = Some(naming);
        Ok(())
    }

    fn create_registries(&mut self) -> DeployerResult<()> {
        let i = &self.params.implementations;
        let h = &self.params.helpers;
        let dao = self.record.management_dao;

        let dao_registry = self.chain.create_dao_registry(
            self.engine,
            i.dao_registry_base,
            dao,
            self.record.dao_subdomain_registrar,
        )?;
        let plugin_repo_registry = self.chain.create_plugin_repo_registry(
            self.engine,
            i.plugin_repo_registry_base,
            dao,
            self.record.plugin_subdomain_registrar,
        )?;

        let psp = helpers::deploy_plugin_setup_processor(
            self.chain,
            h.plugin_setup_processor,
            plugin_repo_registry,
        )?;
        let dao_factory =
            helpers::deploy_dao_factory(self.chain, h.dao_factory, dao_registry, psp, i.dao_base)?;
        let plugin_repo_factory = helpers::deploy_plugin_repo_factory(
            self.chain,
            h.plugin_repo_factory,
            plugin_repo_registry,
            i.plugin_repo_base,
        )?;

        self.record.dao_registry = dao_registry;
        self.record.plugin_repo_registry = plugin_repo_registry;
        self.record.plugin_setup_processor = psp;
        self.record.dao_factory = dao_factory;
        self.record.plugin_repo_factory = plugin_repo_factory;
        Ok(())
    }

    fn wire_permissions(&mut self) -> DeployerResult<()> {
        let r = &self.record;
        let dao = r.management_dao;
        let items = [
            MultiTargetPermission::grant(
                r.dao_subdomain_registrar,
                r.dao_registry,
                Permission::RegisterEnsSubdomain,
            ),
            MultiTargetPermission::grant(
                r.plugin_subdomain_registrar,
                r.plugin_repo_registry,
                Permission::RegisterEnsSubdomain,
            ),
            MultiTargetPermission::grant(r.dao_registry, dao, Permission::UpgradeRegistry),
            MultiTargetPermission::grant(r.plugin_repo_registry, dao, Permission::UpgradeRegistry),
            MultiTargetPermission::grant(r.dao_subdomain_registrar, dao, Permission::UpgradeRegistrar),
            MultiTargetPermission::grant(
                r.plugin_subdomain_registrar,
                dao,
                Permission::UpgradeRegistrar,
            ),
            MultiTargetPermission::grant(r.dao_registry, r.dao_factory, Permission::RegisterDao),
            MultiTargetPermission::grant(
                r.plugin_repo_registry,
                r.plugin_repo_factory,
                Permission::RegisterPluginRepo,
            ),
        ];
        self.chain
            .apply_multi_target_permissions(self.engine, dao, &items)?;
        Ok(())
    }

    fn create_plugin_repos(&mut self) -> DeployerResult<()> {
        let ctx = RepoContext {
            engine: self.engine,
            dao: self.record.management_dao,
            plugin_repo_factory: self.record.plugin_repo_factory,
            placeholder_setup: self.params.implementations.placeholder_setup,
        };
        for plugin in &self.params.plugins {
            let plugin_repo = repos::bootstrap_plugin_repo(self.chain, &ctx, plugin)?;
            self.record.plugin_repos.push(DeployedPluginRepo {
                key: plugin.key.clone(),
                plugin_repo,
            });
        }
        Ok(())
    }

    fn finalize_management_dao(&mut self) -> DeployerResult<()> {
        let dao = self.record.management_dao;
        management::register_management_dao(
            self.chain,
            self.engine,
            dao,
            self.record.dao_registry,
            &self.params.ens.management_dao_subdomain,
        )?;

        let key = &self.params.management_dao.controlling_plugin;
        let (plugin, plugin_repo) = self
            .params
            .plugin(key)
            .zip(self.record.plugin_repo(key))
            .ok_or_else(|| {
                DeployerError::InvalidParameters(format!("controlling plugin {key:?} has no repo"))
            })?;
        self.record.management_dao_multisig = management::install_controlling_body(
            self.chain,
            self.engine,
            dao,
            self.record.plugin_setup_processor,
            plugin_repo,
            plugin.tag(),
            &self.params.management_dao,
        )?;
        Ok(())
    }

    fn revoke_engine_rights(&mut self) -> DeployerResult<()> {
        management::revoke_engine_rights(self.chain, self.engine, self.record.management_dao)
    }

    fn complete(&mut self) -> DeployerResult<()> {
        if let Some(naming) = &self.naming {
            info!(
                dao_domain = %self.params.ens.dao_name(),
                plugin_domain = %self.params.ens.plugin_name(),
                registry = %naming.registry,
                "Naming handed to management DAO"
            );
        }
        self.chain.emit(
            self.engine,
            Event::ProtocolDeployed {
                deployer: self.engine,
            },
        )?;
        Ok(())
    }
}
