//! # charter-chain
//!
//! An in-memory, single-threaded execution environment and the governed
//! components it hosts:
//!
//! - [`Chain`]: atomic units of work, deterministic account creation, a work
//!   ceiling per unit and an event log
//! - permission managers embedded in DAOs and plugin repositories
//! - the name registry, public resolver and subdomain registrars
//! - the DAO and plugin-repository registries
//! - versioned plugin repositories and plugin setups
//! - the plugin setup processor (prepare / apply installations)
//! - the multisig plugin
//! - the DAO and plugin-repository factories
//!
//! All state-changing entry points take the `sender` explicitly and only run
//! inside [`Chain::transact`] (or through [`Chain::send`]). Outside an open
//! unit they fail with [`ChainError::NotInTransaction`] before touching state.

#![deny(unsafe_code)]

pub mod account;
pub mod call;
pub mod chain;
pub mod dao;
pub mod error;
pub mod event;
pub mod factory;
pub mod multisig;
pub mod naming;
pub mod permission;
pub mod psp;
pub mod registry;
pub mod repo;
pub mod setup;

pub use account::{Account, ComponentKind};
pub use call::{Action, Call, CallOutput};
pub use chain::{BlockContext, Chain, ChainConfig};
pub use dao::Dao;
pub use error::{
    ChainError, MultisigError, NamingError, PermissionError, RegistryError, RepoError, SetupError,
};
pub use event::{Event, LogEntry};
pub use factory::{DaoFactory, DaoSettings, InstalledPlugin, PluginRepoFactory};
pub use multisig::{Multisig, MultisigSettings, Proposal, TargetConfig};
pub use naming::{NameRegistry, NodeRecord, PublicResolver, SubdomainRegistrar};
pub use permission::{MultiTargetPermission, PermissionKey, PermissionManager, PermissionOperation};
pub use psp::{
    PluginSetupProcessor, PluginSetupRef, PrepareInstallationParams, PreparedInstallation,
    SetupId, SetupStatus,
};
pub use registry::{is_subdomain_valid, DaoRegistry, PluginRepoRegistry};
pub use repo::{PluginRepo, Version};
pub use setup::{InstallationPayload, PluginSetup, PluginSetupKind, PreparedSetupData};
