//! Helper programs.
//!
//! The deployer does not create the naming service or the static
//! singletons itself. Each is created by a dedicated helper account so the
//! deployer's own footprint stays small; the helper is the creator of
//! record and the singleton's address derives from the helper's nonce.

use std::fmt;

use charter_chain::{Chain, ChainError};
use charter_types::{Address, Node};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EnsParameters;
use crate::error::{DeployerError, DeployerResult};

/// Kinds of deployment helper, each standing in for one oversized step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HelperKind {
    Naming,
    DaoFactory,
    PluginRepoFactory,
    PluginSetupProcessor,
}

impl HelperKind {
    pub const ALL: [HelperKind; 4] = [
        HelperKind::Naming,
        HelperKind::DaoFactory,
        HelperKind::PluginRepoFactory,
        HelperKind::PluginSetupProcessor,
    ];

    /// Label carried by the helper's external account.
    pub fn label(&self) -> &'static str {
        match self {
            HelperKind::Naming => "charter:naming-helper",
            HelperKind::DaoFactory => "charter:dao-factory-helper",
            HelperKind::PluginRepoFactory => "charter:plugin-repo-factory-helper",
            HelperKind::PluginSetupProcessor => "charter:psp-helper",
        }
    }
}

impl fmt::Display for HelperKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HelperKind::Naming => write!(f, "naming"),
            HelperKind::DaoFactory => write!(f, "dao-factory"),
            HelperKind::PluginRepoFactory => write!(f, "plugin-repo-factory"),
            HelperKind::PluginSetupProcessor => write!(f, "plugin-setup-processor"),
        }
    }
}

/// Deploy a helper account of `kind` from `deployer`.
pub fn deploy_helper(
    chain: &mut Chain,
    deployer: Address,
    kind: HelperKind,
) -> Result<Address, ChainError> {
    chain.deploy_external(deployer, kind.label())
}

/// Check that `address` is a helper of `kind`.
pub fn verify_helper(chain: &Chain, address: Address, kind: HelperKind) -> DeployerResult<()> {
    if chain.external_label(address) == Some(kind.label()) {
        Ok(())
    } else {
        Err(DeployerError::InvalidHelper {
            address,
            expected: kind,
        })
    }
}

// ── Naming ──────────────────────────────────────────────────────────

/// Name registry and the nodes carved out for the protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NamingSetup {
    pub registry: Address,
    pub resolver: Address,
    pub tld_node: Node,
    pub dao_node: Node,
    pub plugin_node: Node,
}

/// Deploy a name registry and public resolver and carve out the DAO and
/// plugin domains. The helper owns every node until
/// [`transfer_naming`] hands them on.
pub fn setup_naming(
    chain: &mut Chain,
    helper: Address,
    ens: &EnsParameters,
) -> DeployerResult<NamingSetup> {
    verify_helper(chain, helper, HelperKind::Naming)?;

    let registry = chain.create_name_registry(helper)?;
    let resolver = chain.create_public_resolver(helper, registry)?;

    let tld_node = chain.set_subnode_owner(helper, registry, Node::ROOT, &ens.tld, helper)?;
    let dao_node = chain.set_subnode_owner(helper, registry, tld_node, &ens.dao_domain, helper)?;
    let plugin_node =
        chain.set_subnode_owner(helper, registry, dao_node, &ens.plugin_subdomain, helper)?;

    chain.set_resolver(helper, registry, dao_node, resolver)?;
    chain.set_resolver(helper, registry, plugin_node, resolver)?;

    debug!(
        registry = %registry,
        dao_domain = %ens.dao_name(),
        plugin_domain = %ens.plugin_name(),
        "Naming service deployed"
    );
    Ok(NamingSetup {
        registry,
        resolver,
        tld_node,
        dao_node,
        plugin_node,
    })
}

/// Transfer every node held by the helper to `owner`, leaves first.
pub fn transfer_naming(
    chain: &mut Chain,
    helper: Address,
    naming: &NamingSetup,
    owner: Address,
) -> DeployerResult<()> {
    for node in [
        naming.plugin_node,
        naming.dao_node,
        naming.tld_node,
        Node::ROOT,
    ] {
        chain.set_owner(helper, naming.registry, node, owner)?;
    }
    debug!(owner = %owner, "Naming nodes handed over");
    Ok(())
}

// ── Static singletons ───────────────────────────────────────────────

/// Deploy the plugin setup processor through its helper.
pub fn deploy_plugin_setup_processor(
    chain: &mut Chain,
    helper: Address,
    plugin_repo_registry: Address,
) -> DeployerResult<Address> {
    verify_helper(chain, helper, HelperKind::PluginSetupProcessor)?;
    Ok(chain.create_plugin_setup_processor(helper, plugin_repo_registry)?)
}

/// Deploy the DAO factory through its helper.
pub fn deploy_dao_factory(
    chain: &mut Chain,
    helper: Address,
    dao_registry: Address,
    psp: Address,
    dao_base: Address,
) -> DeployerResult<Address> {
    verify_helper(chain, helper, HelperKind::DaoFactory)?;
    Ok(chain.create_dao_factory(helper, dao_registry, psp, dao_base)?)
}

/// Deploy the plugin-repo factory through its helper.
pub fn deploy_plugin_repo_factory(
    chain: &mut Chain,
    helper: Address,
    plugin_repo_registry: Address,
    repo_base: Address,
) -> DeployerResult<Address> {
    verify_helper(chain, helper, HelperKind::PluginRepoFactory)?;
    Ok(chain.create_plugin_repo_factory(helper, plugin_repo_registry, repo_base)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_distinct() {
        let labels: std::collections::HashSet<_> =
            HelperKind::ALL.iter().map(|k| k.label()).collect();
        assert_eq!(labels.len(), HelperKind::ALL.len());
    }

    #[test]
    fn helper_must_carry_its_label() {
        let mut chain = Chain::new();
        let deployer = Address::named("deployer");
        let naming = chain
            .transact(|c| deploy_helper(c, deployer, HelperKind::Naming))
            .unwrap();

        assert!(verify_helper(&chain, naming, HelperKind::Naming).is_ok());
        assert_eq!(
            verify_helper(&chain, naming, HelperKind::DaoFactory),
            Err(DeployerError::InvalidHelper {
                address: naming,
                expected: HelperKind::DaoFactory,
            })
        );
        assert!(verify_helper(&chain, Address::named("nobody"), HelperKind::Naming).is_err());
    }

    #[test]
    fn naming_nodes_stay_with_helper_until_transferred() {
        let mut chain = Chain::new();
        let deployer = Address::named("deployer");
        let owner = Address::named("owner");
        let ens = EnsParameters::default();

        let (helper, naming) = chain
            .transact(|c| {
                let helper = deploy_helper(c, deployer, HelperKind::Naming)?;
                let naming = setup_naming(c, helper, &ens)?;
                Ok::<_, DeployerError>((helper, naming))
            })
            .unwrap();

        let registry = chain.name_registry(naming.registry).unwrap();
        assert_eq!(naming.dao_node, ens.dao_node());
        assert_eq!(registry.owner(naming.dao_node), helper);
        assert_eq!(registry.owner(naming.plugin_node), helper);
        assert_eq!(registry.resolver(naming.dao_node), naming.resolver);
        assert_eq!(registry.resolver(naming.plugin_node), naming.resolver);

        chain
            .transact(|c| transfer_naming(c, helper, &naming, owner))
            .unwrap();
        let registry = chain.name_registry(naming.registry).unwrap();
        for node in [Node::ROOT, naming.tld_node, naming.dao_node, naming.plugin_node] {
            assert_eq!(registry.owner(node), owner);
        }
    }

    #[test]
    fn wrong_helper_is_rejected_before_any_creation() {
        let mut chain = Chain::new();
        let deployer = Address::named("deployer");
        let helper = chain
            .transact(|c| deploy_helper(c, deployer, HelperKind::DaoFactory))
            .unwrap();
        let nonce = chain.nonce(helper);
        let err = chain
            .transact(|c| setup_naming(c, helper, &EnsParameters::default()))
            .unwrap_err();
        assert!(matches!(err, DeployerError::InvalidHelper { .. }));
        assert_eq!(chain.nonce(helper), nonce);
    }
}
