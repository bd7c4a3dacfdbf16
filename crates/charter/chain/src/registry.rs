//! Organization and plugin-repository registries.

use std::collections::BTreeMap;

use charter_types::{Address, Permission};
use tracing::info;

use crate::account::{Account, ComponentKind};
use crate::chain::Chain;
use crate::error::{ChainError, RegistryError};
use crate::event::Event;

/// Subdomains are non-empty and restricted to `[a-z0-9-]`.
pub fn is_subdomain_valid(subdomain: &str) -> bool {
    !subdomain.is_empty()
        && subdomain
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

#[derive(Clone, Debug)]
pub struct DaoRegistry {
    pub implementation: Address,
    /// DAO whose permission manager guards this registry.
    pub dao: Address,
    pub registrar: Address,
    /// Registered DAO -> subdomain (empty when registered without a name).
    entries: BTreeMap<Address, String>,
}

impl DaoRegistry {
    pub fn is_registered(&self, dao: Address) -> bool {
        self.entries.contains_key(&dao)
    }

    pub fn subdomain_of(&self, dao: Address) -> Option<&str> {
        self.entries.get(&dao).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct PluginRepoRegistry {
    pub implementation: Address,
    pub dao: Address,
    pub registrar: Address,
    entries: BTreeMap<Address, String>,
}

impl PluginRepoRegistry {
    pub fn is_registered(&self, repo: Address) -> bool {
        self.entries.contains_key(&repo)
    }

    pub fn subdomain_of(&self, repo: Address) -> Option<&str> {
        self.entries.get(&repo).map(String::as_str)
    }

    pub fn repos(&self) -> impl Iterator<Item = (&Address, &String)> {
        self.entries.iter()
    }
}

impl Chain {
    pub fn create_dao_registry(
        &mut self,
        deployer: Address,
        implementation: Address,
        dao: Address,
        registrar: Address,
    ) -> Result<Address, ChainError> {
        self.require_implementation(implementation, ComponentKind::DaoRegistry)?;
        self.dao(dao)?;
        self.subdomain_registrar(registrar)?;
        self.create(
            deployer,
            Account::DaoRegistry(DaoRegistry {
                implementation,
                dao,
                registrar,
                entries: BTreeMap::new(),
            }),
        )
    }

    pub fn create_plugin_repo_registry(
        &mut self,
        deployer: Address,
        implementation: Address,
        dao: Address,
        registrar: Address,
    ) -> Result<Address, ChainError> {
        self.require_implementation(implementation, ComponentKind::PluginRepoRegistry)?;
        self.dao(dao)?;
        self.subdomain_registrar(registrar)?;
        self.create(
            deployer,
            Account::PluginRepoRegistry(PluginRepoRegistry {
                implementation,
                dao,
                registrar,
                entries: BTreeMap::new(),
            }),
        )
    }

    /// Register `dao`, minting `subdomain` for it unless the subdomain is
    /// empty.
    pub fn register_dao(
        &mut self,
        sender: Address,
        registry: Address,
        dao: Address,
        creator: Address,
        subdomain: &str,
    ) -> Result<(), ChainError> {
        self.charge()?;
        let r = self.dao_registry(registry)?;
        let (managing_dao, registrar) = (r.dao, r.registrar);
        if r.is_registered(dao) {
            return Err(RegistryError::ContractAlreadyRegistered(dao).into());
        }
        self.auth(managing_dao, registry, sender, Permission::RegisterDao)?;
        if !matches!(self.account(dao), Some(Account::Dao(_))) {
            return Err(RegistryError::ContractInterfaceInvalid(dao).into());
        }

        if !subdomain.is_empty() {
            if !is_subdomain_valid(subdomain) {
                return Err(RegistryError::InvalidDaoSubdomain(subdomain.to_string()).into());
            }
            self.register_subnode(registry, registrar, subdomain, dao)?;
        }

        self.dao_registry_mut(registry)?
            .entries
            .insert(dao, subdomain.to_string());
        info!(dao = %dao, creator = %creator, subdomain, "DAO registered");
        self.log(
            registry,
            Event::DaoRegistered {
                dao,
                creator,
                subdomain: subdomain.to_string(),
            },
        );
        Ok(())
    }

    pub fn register_plugin_repo(
        &mut self,
        sender: Address,
        registry: Address,
        subdomain: &str,
        plugin_repo: Address,
    ) -> Result<(), ChainError> {
        self.charge()?;
        let r = self.plugin_repo_registry(registry)?;
        let (managing_dao, registrar) = (r.dao, r.registrar);
        if r.is_registered(plugin_repo) {
            return Err(RegistryError::ContractAlreadyRegistered(plugin_repo).into());
        }
        self.auth(managing_dao, registry, sender, Permission::RegisterPluginRepo)?;
        if !matches!(self.account(plugin_repo), Some(Account::PluginRepo(_))) {
            return Err(RegistryError::ContractInterfaceInvalid(plugin_repo).into());
        }
        if subdomain.is_empty() {
            return Err(RegistryError::EmptyPluginRepoSubdomain.into());
        }
        if !is_subdomain_valid(subdomain) {
            return Err(RegistryError::InvalidPluginSubdomain(subdomain.to_string()).into());
        }

        self.register_subnode(registry, registrar, subdomain, plugin_repo)?;
        self.plugin_repo_registry_mut(registry)?
            .entries
            .insert(plugin_repo, subdomain.to_string());
        info!(repo = %plugin_repo, subdomain, "Plugin repo registered");
        self.log(
            registry,
            Event::PluginRepoRegistered {
                subdomain: subdomain.to_string(),
                plugin_repo,
            },
        );
        Ok(())
    }
}
