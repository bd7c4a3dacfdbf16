//! Account kinds hosted by the execution environment.

use std::fmt;

use charter_types::{Address, Permission};
use serde::{Deserialize, Serialize};

use crate::chain::Chain;
use crate::dao::Dao;
use crate::error::ChainError;
use crate::event::Event;
use crate::factory::{DaoFactory, PluginRepoFactory};
use crate::multisig::Multisig;
use crate::naming::{NameRegistry, PublicResolver, SubdomainRegistrar};
use crate::psp::PluginSetupProcessor;
use crate::registry::{DaoRegistry, PluginRepoRegistry};
use crate::repo::PluginRepo;
use crate::setup::PluginSetup;

/// Kinds of upgradeable components. Each proxy records the base
/// implementation it currently points at, and may only be re-pointed at an
/// implementation of the same kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComponentKind {
    Dao,
    DaoRegistry,
    PluginRepoRegistry,
    SubdomainRegistrar,
    PluginRepo,
    Multisig,
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dao => write!(f, "dao"),
            Self::DaoRegistry => write!(f, "dao-registry"),
            Self::PluginRepoRegistry => write!(f, "plugin-repo-registry"),
            Self::SubdomainRegistrar => write!(f, "subdomain-registrar"),
            Self::PluginRepo => write!(f, "plugin-repo"),
            Self::Multisig => write!(f, "multisig"),
        }
    }
}

/// Code and storage living at an address.
#[derive(Clone, Debug)]
pub enum Account {
    /// Base implementation code for a proxy kind.
    Implementation(ComponentKind),
    /// A program with no behaviour inside this environment (deployers, helpers).
    External { label: String },
    PluginSetup(PluginSetup),
    Dao(Dao),
    NameRegistry(NameRegistry),
    Resolver(PublicResolver),
    SubdomainRegistrar(SubdomainRegistrar),
    DaoRegistry(DaoRegistry),
    PluginRepoRegistry(PluginRepoRegistry),
    PluginRepo(PluginRepo),
    PluginSetupProcessor(PluginSetupProcessor),
    DaoFactory(DaoFactory),
    PluginRepoFactory(PluginRepoFactory),
    Multisig(Multisig),
}

impl Account {
    /// Short human-readable kind name.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Implementation(_) => "implementation",
            Self::External { .. } => "external",
            Self::PluginSetup(_) => "plugin-setup",
            Self::Dao(_) => "dao",
            Self::NameRegistry(_) => "name-registry",
            Self::Resolver(_) => "resolver",
            Self::SubdomainRegistrar(_) => "subdomain-registrar",
            Self::DaoRegistry(_) => "dao-registry",
            Self::PluginRepoRegistry(_) => "plugin-repo-registry",
            Self::PluginRepo(_) => "plugin-repo",
            Self::PluginSetupProcessor(_) => "plugin-setup-processor",
            Self::DaoFactory(_) => "dao-factory",
            Self::PluginRepoFactory(_) => "plugin-repo-factory",
            Self::Multisig(_) => "multisig",
        }
    }

    /// Proxy kind of this account, if it is an upgradeable component.
    pub fn component_kind(&self) -> Option<ComponentKind> {
        match self {
            Self::Dao(_) => Some(ComponentKind::Dao),
            Self::DaoRegistry(_) => Some(ComponentKind::DaoRegistry),
            Self::PluginRepoRegistry(_) => Some(ComponentKind::PluginRepoRegistry),
            Self::SubdomainRegistrar(_) => Some(ComponentKind::SubdomainRegistrar),
            Self::PluginRepo(_) => Some(ComponentKind::PluginRepo),
            Self::Multisig(_) => Some(ComponentKind::Multisig),
            _ => None,
        }
    }

    /// Current base implementation of a proxy.
    pub fn implementation(&self) -> Option<Address> {
        match self {
            Self::Dao(c) => Some(c.implementation),
            Self::DaoRegistry(c) => Some(c.implementation),
            Self::PluginRepoRegistry(c) => Some(c.implementation),
            Self::SubdomainRegistrar(c) => Some(c.implementation),
            Self::PluginRepo(c) => Some(c.implementation),
            Self::Multisig(c) => Some(c.implementation),
            _ => None,
        }
    }

    /// Permission manager and permission guarding upgrades of the proxy at
    /// `address`.
    fn upgrade_guard(&self, address: Address) -> Option<(Address, Permission)> {
        match self {
            Self::Dao(_) => Some((address, Permission::UpgradeDao)),
            Self::DaoRegistry(c) => Some((c.dao, Permission::UpgradeRegistry)),
            Self::PluginRepoRegistry(c) => Some((c.dao, Permission::UpgradeRegistry)),
            Self::SubdomainRegistrar(c) => Some((c.dao, Permission::UpgradeRegistrar)),
            Self::PluginRepo(_) => Some((address, Permission::UpgradeRepo)),
            Self::Multisig(c) => Some((c.dao, Permission::UpgradePlugin)),
            _ => None,
        }
    }

    pub(crate) fn implementation_mut(&mut self) -> Option<&mut Address> {
        match self {
            Self::Dao(c) => Some(&mut c.implementation),
            Self::DaoRegistry(c) => Some(&mut c.implementation),
            Self::PluginRepoRegistry(c) => Some(&mut c.implementation),
            Self::SubdomainRegistrar(c) => Some(&mut c.implementation),
            Self::PluginRepo(c) => Some(&mut c.implementation),
            Self::Multisig(c) => Some(&mut c.implementation),
            _ => None,
        }
    }
}

impl Chain {
    /// Re-point a proxy at another base implementation of the same kind.
    pub fn upgrade_to(
        &mut self,
        sender: Address,
        proxy: Address,
        implementation: Address,
    ) -> Result<(), ChainError> {
        self.charge()?;
        let account = self
            .account(proxy)
            .ok_or(ChainError::AccountNotFound(proxy))?;
        let (kind, (manager, permission)) = account
            .component_kind()
            .zip(account.upgrade_guard(proxy))
            .ok_or(ChainError::UnexpectedAccount {
                address: proxy,
                expected: "proxy",
            })?;

        self.auth(manager, proxy, sender, permission)?;
        self.require_implementation(implementation, kind)?;

        if let Some(slot) = self
            .account_mut(proxy)
            .and_then(Account::implementation_mut)
        {
            *slot = implementation;
        }
        self.log(proxy, Event::Upgraded { implementation });
        Ok(())
    }
}

macro_rules! typed_accessors {
    ($($variant:ident => $ty:ty, $get:ident, $get_mut:ident, $label:literal;)*) => {
        impl Chain {
            $(
                pub fn $get(&self, address: Address) -> Result<&$ty, ChainError> {
                    match self.account(address) {
                        Some(Account::$variant(inner)) => Ok(inner),
                        Some(_) => Err(ChainError::UnexpectedAccount {
                            address,
                            expected: $label,
                        }),
                        None => Err(ChainError::AccountNotFound(address)),
                    }
                }

                #[allow(dead_code)]
                pub(crate) fn $get_mut(&mut self, address: Address) -> Result<&mut $ty, ChainError> {
                    match self.account_mut(address) {
                        Some(Account::$variant(inner)) => Ok(inner),
                        Some(_) => Err(ChainError::UnexpectedAccount {
                            address,
                            expected: $label,
                        }),
                        None => Err(ChainError::AccountNotFound(address)),
                    }
                }
            )*
        }
    };
}

typed_accessors! {
    PluginSetup => PluginSetup, plugin_setup, plugin_setup_mut, "plugin-setup";
    Dao => Dao, dao, dao_mut, "dao";
    NameRegistry => NameRegistry, name_registry, name_registry_mut, "name-registry";
    Resolver => PublicResolver, resolver, resolver_mut, "resolver";
    SubdomainRegistrar => SubdomainRegistrar, subdomain_registrar, subdomain_registrar_mut, "subdomain-registrar";
    DaoRegistry => DaoRegistry, dao_registry, dao_registry_mut, "dao-registry";
    PluginRepoRegistry => PluginRepoRegistry, plugin_repo_registry, plugin_repo_registry_mut, "plugin-repo-registry";
    PluginRepo => PluginRepo, plugin_repo, plugin_repo_mut, "plugin-repo";
    PluginSetupProcessor => PluginSetupProcessor, plugin_setup_processor, plugin_setup_processor_mut, "plugin-setup-processor";
    DaoFactory => DaoFactory, dao_factory, dao_factory_mut, "dao-factory";
    PluginRepoFactory => PluginRepoFactory, plugin_repo_factory, plugin_repo_factory_mut, "plugin-repo-factory";
    Multisig => Multisig, multisig, multisig_mut, "multisig";
}
