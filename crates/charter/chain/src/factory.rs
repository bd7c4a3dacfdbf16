//! Non-upgradeable factories for DAOs and plugin repositories.

use charter_types::{Address, Permission};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::account::{Account, ComponentKind};
use crate::chain::Chain;
use crate::error::{ChainError, SetupError};
use crate::event::Event;
use crate::permission::MultiTargetPermission;
use crate::psp::PrepareInstallationParams;

/// Permissions every factory-made DAO grants to itself.
pub const DAO_SELF_PERMISSIONS: [Permission; 4] = [
    Permission::Root,
    Permission::UpgradeDao,
    Permission::SetMetadata,
    Permission::RegisterStandardCallback,
];

/// Permissions the owner of a repository holds on it.
pub const REPO_OWNER_PERMISSIONS: [Permission; 3] = [
    Permission::Root,
    Permission::Maintainer,
    Permission::UpgradeRepo,
];

#[derive(Clone, Debug)]
pub struct DaoFactory {
    pub dao_registry: Address,
    pub psp: Address,
    pub dao_base: Address,
}

#[derive(Clone, Debug)]
pub struct PluginRepoFactory {
    pub plugin_repo_registry: Address,
    pub repo_base: Address,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaoSettings {
    pub metadata_uri: String,
    #[serde(default)]
    pub subdomain: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledPlugin {
    pub plugin: Address,
    pub plugin_repo: Address,
}

impl Chain {
    pub fn create_dao_factory(
        &mut self,
        deployer: Address,
        dao_registry: Address,
        psp: Address,
        dao_base: Address,
    ) -> Result<Address, ChainError> {
        self.dao_registry(dao_registry)?;
        self.plugin_setup_processor(psp)?;
        self.require_implementation(dao_base, ComponentKind::Dao)?;
        self.create(
            deployer,
            Account::DaoFactory(DaoFactory {
                dao_registry,
                psp,
                dao_base,
            }),
        )
    }

    pub fn create_plugin_repo_factory(
        &mut self,
        deployer: Address,
        plugin_repo_registry: Address,
        repo_base: Address,
    ) -> Result<Address, ChainError> {
        self.plugin_repo_registry(plugin_repo_registry)?;
        self.require_implementation(repo_base, ComponentKind::PluginRepo)?;
        self.create(
            deployer,
            Account::PluginRepoFactory(PluginRepoFactory {
                plugin_repo_registry,
                repo_base,
            }),
        )
    }

    /// Create and register a DAO, install `plugins` into it and hand the DAO
    /// its own permissions. The factory keeps nothing.
    pub fn create_dao_with_plugins(
        &mut self,
        sender: Address,
        factory: Address,
        settings: DaoSettings,
        plugins: Vec<PrepareInstallationParams>,
    ) -> Result<(Address, Vec<InstalledPlugin>), ChainError> {
        self.charge()?;
        if plugins.is_empty() {
            return Err(SetupError::NoPluginProvided.into());
        }
        let f = self.dao_factory(factory)?.clone();

        let dao = self.create_dao(factory, f.dao_base, settings.metadata_uri, factory)?;
        self.register_dao(factory, f.dao_registry, dao, sender, &settings.subdomain)?;

        let installed = self.with_temporary_grant(factory, dao, dao, f.psp, Permission::Root, |c| {
            c.with_temporary_grant(
                factory,
                dao,
                f.psp,
                factory,
                Permission::ApplyInstallation,
                |c| {
                    let mut installed = Vec::with_capacity(plugins.len());
                    for params in plugins {
                        let plugin_repo = params.setup_ref.plugin_repo;
                        let prepared = c.prepare_installation(factory, f.psp, dao, params)?;
                        c.apply_installation(factory, f.psp, dao, prepared.setup_id)?;
                        installed.push(InstalledPlugin {
                            plugin: prepared.plugin,
                            plugin_repo,
                        });
                    }
                    Ok::<_, ChainError>(installed)
                },
            )
        })?;

        let mut items: Vec<MultiTargetPermission> = DAO_SELF_PERMISSIONS
            .iter()
            .map(|p| MultiTargetPermission::grant(dao, dao, *p))
            .collect();
        items.push(MultiTargetPermission::revoke(dao, factory, Permission::Root));
        self.apply_multi_target_permissions(factory, dao, &items)?;

        info!(dao = %dao, creator = %sender, plugins = installed.len(), "DAO created by factory");
        self.log(
            factory,
            Event::DaoCreated {
                dao,
                creator: sender,
            },
        );
        Ok((dao, installed))
    }

    /// Create a repository registered under `subdomain` and owned by
    /// `initial_owner`.
    pub fn create_plugin_repo(
        &mut self,
        sender: Address,
        factory: Address,
        subdomain: &str,
        initial_owner: Address,
    ) -> Result<Address, ChainError> {
        self.charge()?;
        let repo = self.create_and_register_repo(factory, subdomain)?;
        self.hand_over_repo(factory, repo, initial_owner)?;
        info!(repo = %repo, subdomain, owner = %initial_owner, sender = %sender, "Plugin repo created");
        Ok(repo)
    }

    /// Like [`Chain::create_plugin_repo`], publishing v1.1 before handing the
    /// repository to `maintainer`.
    #[allow(clippy::too_many_arguments)]
    pub fn create_plugin_repo_with_first_version(
        &mut self,
        sender: Address,
        factory: Address,
        subdomain: &str,
        plugin_setup: Address,
        maintainer: Address,
        release_metadata: &str,
        build_metadata: &str,
    ) -> Result<Address, ChainError> {
        self.charge()?;
        let repo = self.create_and_register_repo(factory, subdomain)?;
        self.create_version(factory, repo, 1, plugin_setup, build_metadata, release_metadata)?;
        self.hand_over_repo(factory, repo, maintainer)?;
        info!(repo = %repo, subdomain, maintainer = %maintainer, sender = %sender, "Plugin repo created with first version");
        Ok(repo)
    }

    fn create_and_register_repo(
        &mut self,
        factory: Address,
        subdomain: &str,
    ) -> Result<Address, ChainError> {
        let f = self.plugin_repo_factory(factory)?.clone();
        let repo = self.create_plugin_repo_proxy(factory, f.repo_base, factory)?;
        self.register_plugin_repo(factory, f.plugin_repo_registry, subdomain, repo)?;
        self.log(
            factory,
            Event::PluginRepoCreated {
                plugin_repo: repo,
                subdomain: subdomain.to_string(),
            },
        );
        Ok(repo)
    }

    fn hand_over_repo(
        &mut self,
        factory: Address,
        repo: Address,
        owner: Address,
    ) -> Result<(), ChainError> {
        let mut items: Vec<MultiTargetPermission> = REPO_OWNER_PERMISSIONS
            .iter()
            .map(|p| MultiTargetPermission::grant(repo, owner, *p))
            .collect();
        items.extend(
            REPO_OWNER_PERMISSIONS
                .iter()
                .map(|p| MultiTargetPermission::revoke(repo, factory, *p)),
        );
        self.apply_multi_target_permissions(factory, repo, &items)
    }
}
