use charter_chain::ChainError;
use charter_types::{Address, VersionTag};
use thiserror::Error;

use crate::helpers::HelperKind;

/// Errors from the protocol deployer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeployerError {
    /// The bootstrap already ran on this deployer.
    #[error("protocol already deployed")]
    AlreadyDeployed,

    /// Parameters failed structural validation.
    #[error("invalid deployment parameters: {0}")]
    InvalidParameters(String),

    /// A helper address does not point at a helper of the expected kind.
    #[error("{address} is not a {expected} helper")]
    InvalidHelper { address: Address, expected: HelperKind },

    /// A bootstrapped repository has the wrong build count for its release.
    #[error("plugin repo {key} ended at build {actual} of release {release}, expected {expected}")]
    VersionPaddingMismatch {
        key: String,
        release: u8,
        expected: u16,
        actual: u16,
    },

    /// The target version of a repository points at the wrong setup.
    #[error("plugin repo {key} binds {tag} to {actual}, expected {expected}")]
    ReleasedSetupMismatch {
        key: String,
        tag: VersionTag,
        expected: Address,
        actual: Address,
    },

    /// Failure inside the execution environment.
    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// Result type for deployer operations.
pub type DeployerResult<T> = Result<T, DeployerError>;
