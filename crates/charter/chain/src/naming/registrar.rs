use charter_types::{Address, Node, Permission};
use tracing::info;

use crate::account::{Account, ComponentKind};
use crate::chain::Chain;
use crate::error::{ChainError, NamingError};

/// Mints subnames under one node of a name registry.
///
/// The registrar needs operator rights from the node owner, and callers need
/// `RegisterEnsSubdomain` on the registrar in the managing DAO.
#[derive(Clone, Debug)]
pub struct SubdomainRegistrar {
    pub implementation: Address,
    pub dao: Address,
    pub registry: Address,
    pub node: Node,
    pub resolver: Address,
}

impl Chain {
    /// Create a registrar proxy for `node`. The node must already have a
    /// resolver attached.
    pub fn create_subdomain_registrar(
        &mut self,
        deployer: Address,
        implementation: Address,
        dao: Address,
        registry: Address,
        node: Node,
    ) -> Result<Address, ChainError> {
        self.require_implementation(implementation, ComponentKind::SubdomainRegistrar)?;
        self.dao(dao)?;
        let resolver = self.name_registry(registry)?.resolver(node);
        if resolver.is_zero() {
            return Err(NamingError::ResolverNotSet(node).into());
        }
        self.create(
            deployer,
            Account::SubdomainRegistrar(SubdomainRegistrar {
                implementation,
                dao,
                registry,
                node,
                resolver,
            }),
        )
    }

    /// Register `label` under the registrar's node and point it at `target`.
    pub fn register_subnode(
        &mut self,
        sender: Address,
        registrar: Address,
        label: &str,
        target: Address,
    ) -> Result<Node, ChainError> {
        self.charge()?;
        let r = self.subdomain_registrar(registrar)?.clone();
        self.auth(r.dao, registrar, sender, Permission::RegisterEnsSubdomain)?;

        let subnode = r.node.child(label);
        if !self.name_registry(r.registry)?.owner(subnode).is_zero() {
            return Err(NamingError::SubnodeAlreadyOwned(subnode).into());
        }

        self.set_subnode_owner(registrar, r.registry, r.node, label, registrar)?;
        self.set_resolver(registrar, r.registry, subnode, r.resolver)?;
        self.set_addr(registrar, r.resolver, subnode, target)?;
        info!(label, node = %subnode, target = %target, "Subnode registered");
        Ok(subnode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        chain: Chain,
        registry: Address,
        registrar: Address,
        dao: Address,
        node: Node,
    }

    /// DAO owns `dao.eth`, approves the registrar as operator and lets
    /// `caller` register.
    fn fixture(caller: Address) -> Fixture {
        let mut chain = Chain::new();
        let admin = Address::named("admin");
        let (registry, registrar, dao, node) = chain
            .transact(|c| {
                let dao_base = c.deploy_implementation(admin, ComponentKind::Dao)?;
                let registrar_base =
                    c.deploy_implementation(admin, ComponentKind::SubdomainRegistrar)?;
                let dao = c.create_dao(admin, dao_base, "ipfs://dao", admin)?;

                let registry = c.create_name_registry(admin)?;
                let resolver = c.create_public_resolver(admin, registry)?;
                let eth = c.set_subnode_owner(admin, registry, Node::ROOT, "eth", admin)?;
                let node = c.set_subnode_owner(admin, registry, eth, "dao", admin)?;
                c.set_resolver(admin, registry, node, resolver)?;

                let registrar =
                    c.create_subdomain_registrar(admin, registrar_base, dao, registry, node)?;
                c.set_owner(admin, registry, node, dao)?;
                c.set_approval_for_all(dao, registry, registrar, true)?;
                c.grant(admin, dao, registrar, caller, Permission::RegisterEnsSubdomain)?;
                Ok::<_, ChainError>((registry, registrar, dao, node))
            })
            .unwrap();
        Fixture {
            chain,
            registry,
            registrar,
            dao,
            node,
        }
    }

    #[test]
    fn registers_and_resolves() {
        let caller = Address::named("registry-caller");
        let Fixture {
            mut chain,
            registry,
            registrar,
            node,
            ..
        } = fixture(caller);
        let target = Address::named("target");
        let sub = chain
            .transact(|c| c.register_subnode(caller, registrar, "my-dao", target))
            .unwrap();
        assert_eq!(sub, node.child("my-dao"));

        let names = chain.name_registry(registry).unwrap();
        assert_eq!(names.owner(sub), registrar);
        let resolver = names.resolver(sub);
        assert_eq!(chain.resolver(resolver).unwrap().addr(sub), Some(target));
    }

    #[test]
    fn duplicate_labels_fail() {
        let caller = Address::named("registry-caller");
        let Fixture {
            mut chain,
            registrar,
            node,
            ..
        } = fixture(caller);
        let target = Address::named("target");
        chain
            .transact(|c| c.register_subnode(caller, registrar, "taken", target))
            .unwrap();
        assert_eq!(
            chain.transact(|c| c.register_subnode(caller, registrar, "taken", target)),
            Err(NamingError::SubnodeAlreadyOwned(node.child("taken")).into())
        );
    }

    #[test]
    fn registration_requires_permission() {
        let Fixture {
            mut chain,
            registrar,
            dao,
            ..
        } = fixture(Address::named("registry-caller"));
        let err = chain
            .transact(|c| {
                c.register_subnode(Address::named("mallory"), registrar, "x", Address::ZERO)
            })
            .unwrap_err();
        assert!(matches!(
            err,
            ChainError::Permission(crate::error::PermissionError::Unauthorized { here, .. }) if here == dao
        ));
    }

    #[test]
    fn registrar_requires_resolver() {
        let mut chain = Chain::new();
        let admin = Address::named("admin");
        let err = chain
            .transact(|c| {
                let dao_base = c.deploy_implementation(admin, ComponentKind::Dao)?;
                let base = c.deploy_implementation(admin, ComponentKind::SubdomainRegistrar)?;
                let dao = c.create_dao(admin, dao_base, "", admin)?;
                let registry = c.create_name_registry(admin)?;
                c.create_subdomain_registrar(admin, base, dao, registry, Node::ROOT)
            })
            .unwrap_err();
        assert_eq!(err, NamingError::ResolverNotSet(Node::ROOT).into());
    }
}
