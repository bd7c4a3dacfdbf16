use std::collections::HashMap;

use charter_types::{Address, Node};

use crate::account::Account;
use crate::chain::Chain;
use crate::error::{ChainError, NamingError};
use crate::event::Event;

/// Address records for nodes of one name registry. Only parties authorised
/// on a node in that registry may set its record.
#[derive(Clone, Debug)]
pub struct PublicResolver {
    pub registry: Address,
    addrs: HashMap<Node, Address>,
}

impl PublicResolver {
    pub fn addr(&self, node: Node) -> Option<Address> {
        self.addrs.get(&node).copied()
    }
}

impl Chain {
    pub fn create_public_resolver(
        &mut self,
        deployer: Address,
        registry: Address,
    ) -> Result<Address, ChainError> {
        self.name_registry(registry)?;
        self.create(
            deployer,
            Account::Resolver(PublicResolver {
                registry,
                addrs: HashMap::new(),
            }),
        )
    }

    pub fn set_addr(
        &mut self,
        sender: Address,
        resolver: Address,
        node: Node,
        addr: Address,
    ) -> Result<(), ChainError> {
        self.charge()?;
        let registry = self.resolver(resolver)?.registry;
        if !self.name_registry(registry)?.is_authorised(node, sender) {
            return Err(NamingError::Unauthorised { node, sender }.into());
        }
        self.resolver_mut(resolver)?.addrs.insert(node, addr);
        self.log(resolver, Event::AddrChanged { node, addr });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_authorised_parties_set_records() {
        let mut chain = Chain::new();
        let alice = Address::named("alice");
        let (registry, resolver) = chain
            .transact(|c| {
                let registry = c.create_name_registry(alice)?;
                let resolver = c.create_public_resolver(alice, registry)?;
                Ok::<_, ChainError>((registry, resolver))
            })
            .unwrap();

        let target = Address::named("target");
        chain
            .transact(|c| c.set_addr(alice, resolver, Node::ROOT, target))
            .unwrap();
        assert_eq!(chain.resolver(resolver).unwrap().addr(Node::ROOT), Some(target));
        assert_eq!(chain.resolver(resolver).unwrap().registry, registry);

        assert!(chain
            .transact(|c| c.set_addr(Address::named("mallory"), resolver, Node::ROOT, target))
            .is_err());
    }

    #[test]
    fn resolver_needs_a_registry() {
        let mut chain = Chain::new();
        let alice = Address::named("alice");
        let bogus = Address::named("bogus");
        assert_eq!(
            chain.transact(|c| c.create_public_resolver(alice, bogus)),
            Err(ChainError::AccountNotFound(bogus))
        );
    }
}
