use charter_types::{Address, Node, Permission, VersionTag};
use thiserror::Error;

use crate::account::ComponentKind;
use crate::psp::SetupId;

/// Revert reasons of the execution environment.
///
/// Any error returned inside [`crate::Chain::transact`] rolls back every
/// effect of the enclosing unit of work.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("account not found: {0}")]
    AccountNotFound(Address),

    #[error("account {address} is not a {expected}")]
    UnexpectedAccount {
        address: Address,
        expected: &'static str,
    },

    #[error("{address} is not a {expected} implementation")]
    InvalidImplementation {
        address: Address,
        expected: ComponentKind,
    },

    #[error("address collision at {0}")]
    AddressCollision(Address),

    #[error("call {call} not supported by {to}")]
    UnsupportedCall { to: Address, call: &'static str },

    #[error("state change outside a unit of work")]
    NotInTransaction,

    #[error("work limit exceeded: {limit} units per transaction")]
    WorkLimitExceeded { limit: u64 },

    #[error("too many actions: {count} (max {max})")]
    TooManyActions { count: usize, max: usize },

    #[error(transparent)]
    Permission(#[from] PermissionError),

    #[error(transparent)]
    Naming(#[from] NamingError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Repo(#[from] RepoError),

    #[error(transparent)]
    Setup(#[from] SetupError),

    #[error(transparent)]
    Multisig(#[from] MultisigError),
}

/// Errors from permission managers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PermissionError {
    #[error("unauthorized: {who} lacks {permission} on {where_} (manager {here})")]
    Unauthorized {
        here: Address,
        where_: Address,
        who: Address,
        permission: Permission,
    },

    #[error("the any-address wildcard cannot be used for both where and who")]
    AnyAddressForWhereAndWho,

    #[error("{0} cannot be granted to or on the any-address wildcard")]
    AnyAddressDisallowed(Permission),

    #[error("{0} is not a permission manager")]
    NotAPermissionManager(Address),
}

/// Errors from the naming service, resolvers and registrars.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NamingError {
    #[error("{sender} is not authorised on node {node}")]
    Unauthorised { node: Node, sender: Address },

    #[error("subnode {0} is already owned")]
    SubnodeAlreadyOwned(Node),

    #[error("no resolver attached to node {0}")]
    ResolverNotSet(Node),
}

/// Errors from the organization and repository registries.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("contract already registered: {0}")]
    ContractAlreadyRegistered(Address),

    #[error("contract interface invalid: {0}")]
    ContractInterfaceInvalid(Address),

    #[error("invalid organization subdomain: {0:?}")]
    InvalidDaoSubdomain(String),

    #[error("invalid repository subdomain: {0:?}")]
    InvalidPluginSubdomain(String),

    #[error("repository subdomain must not be empty")]
    EmptyPluginRepoSubdomain,
}

/// Errors from extension repositories.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepoError {
    #[error("release 0 is not allowed")]
    ReleaseZeroNotAllowed,

    #[error("invalid release increment: latest {latest}, requested {release}")]
    InvalidReleaseIncrement { latest: u8, release: u8 },

    #[error("release metadata must not be empty")]
    EmptyReleaseMetadata,

    #[error("release {0} does not exist")]
    ReleaseDoesNotExist(u8),

    #[error("version {0} not found")]
    VersionNotFound(VersionTag),

    #[error("{0} is not a plugin setup")]
    InvalidPluginSetup(Address),

    #[error("build limit reached for release {0}")]
    BuildLimitReached(u8),
}

/// Errors from plugin setups and the setup processor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SetupError {
    #[error("placeholder setups cannot be installed")]
    PlaceholderCannotBeUsed,

    #[error("plugin repository not registered: {0}")]
    PluginRepoNonexistent(Address),

    #[error("installation payload does not match a {expected} setup")]
    PayloadMismatch { expected: &'static str },

    #[error("setup {0} was not prepared")]
    SetupNotPrepared(SetupId),

    #[error("setup {0} was already applied")]
    SetupAlreadyApplied(SetupId),

    #[error("setup prepared for {expected}, applied to {actual}")]
    DaoMismatch { expected: Address, actual: Address },

    #[error("at least one plugin must be provided")]
    NoPluginProvided,
}

/// Errors from the multisig controlling body.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MultisigError {
    #[error("min approvals out of bounds: limit {limit}, actual {actual}")]
    MinApprovalsOutOfBounds { limit: u16, actual: u16 },

    #[error("member list length out of bounds: limit {limit}, actual {actual}")]
    AddresslistLengthOutOfBounds { limit: usize, actual: usize },

    #[error("invalid member list update for {0}")]
    InvalidAddresslistUpdate(Address),

    #[error("{0} may not create proposals")]
    ProposalCreationForbidden(Address),

    #[error("{sender} may not approve proposal {proposal_id}")]
    ApprovalCastForbidden { proposal_id: u64, sender: Address },

    #[error("proposal {0} cannot be executed")]
    ProposalExecutionForbidden(u64),

    #[error("proposal {0} does not exist")]
    NonexistentProposal(u64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_errors_display_transparently() {
        let err: ChainError = RepoError::ReleaseZeroNotAllowed.into();
        assert_eq!(err.to_string(), "release 0 is not allowed");
    }

    #[test]
    fn unauthorized_display() {
        let err = PermissionError::Unauthorized {
            here: Address::named("dao"),
            where_: Address::named("registry"),
            who: Address::named("mallory"),
            permission: Permission::RegisterDao,
        };
        let msg = err.to_string();
        assert!(msg.contains("REGISTER_DAO_PERMISSION"));
        assert!(msg.contains(&Address::named("mallory").to_hex()));
    }

    #[test]
    fn min_approvals_display() {
        let err = MultisigError::MinApprovalsOutOfBounds {
            limit: 1,
            actual: 2,
        };
        assert!(err.to_string().contains("limit 1, actual 2"));
    }
}
