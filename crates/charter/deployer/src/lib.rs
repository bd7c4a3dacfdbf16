//! # charter-deployer
//!
//! One-time protocol deployment. A [`ProtocolDeployer`] takes immutable
//! [`DeploymentParameters`] and, in a single atomic run, creates and wires:
//!
//! - the management DAO and its multisig controlling body
//! - the name registry, resolver and two subdomain registrars
//! - the DAO and plugin-repository registries
//! - the plugin setup processor, DAO factory and plugin-repository factory
//! - one versioned repository per core plugin
//!
//! and then drops every right it held. A second run fails with
//! [`DeployerError::AlreadyDeployed`].
//!
//! ```no_run
//! use charter_deployer::LocalEnvironment;
//! use charter_types::Address;
//!
//! let mut env = LocalEnvironment::new()?;
//! let params = env
//!     .parameters()
//!     .member(Address::named("alice"))
//!     .build()?;
//! let mut deployer = env.protocol_deployer(params)?;
//! let deployment = deployer.run_bootstrap(&mut env.chain)?;
//! println!("management DAO at {}", deployment.management_dao);
//! # Ok::<(), charter_deployer::DeployerError>(())
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod engine;
pub mod error;
pub mod helpers;
pub mod local;
pub mod management;
pub mod record;
pub mod repos;

pub use config::{
    CorePlugin, DeploymentParameters, DeploymentParametersBuilder, EnsParameters, Helpers,
    Implementations, ManagementDaoParameters,
};
pub use engine::{BootstrapStep, EngineState, ProtocolDeployer, ENGINE_LABEL};
pub use error::{DeployerError, DeployerResult};
pub use helpers::{HelperKind, NamingSetup};
pub use local::{LocalEnvironment, MULTISIG_PLUGIN};
pub use record::{DeployedPluginRepo, Deployment};
pub use repos::PLACEHOLDER_METADATA;
