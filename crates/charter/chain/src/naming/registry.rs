use std::collections::{BTreeSet, HashMap};

use charter_types::{Address, Node};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::account::Account;
use crate::chain::Chain;
use crate::error::{ChainError, NamingError};
use crate::event::Event;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub owner: Address,
    pub resolver: Address,
}

/// Node ownership and resolver assignments.
#[derive(Clone, Debug, Default)]
pub struct NameRegistry {
    records: HashMap<Node, NodeRecord>,
    /// `(owner, operator)` pairs.
    operators: BTreeSet<(Address, Address)>,
}

impl NameRegistry {
    pub fn owner(&self, node: Node) -> Address {
        self.records.get(&node).map(|r| r.owner).unwrap_or_default()
    }

    pub fn resolver(&self, node: Node) -> Address {
        self.records
            .get(&node)
            .map(|r| r.resolver)
            .unwrap_or_default()
    }

    pub fn is_approved_for_all(&self, owner: Address, operator: Address) -> bool {
        self.operators.contains(&(owner, operator))
    }

    /// The node owner, or an operator approved by the node owner.
    pub fn is_authorised(&self, node: Node, sender: Address) -> bool {
        let owner = self.owner(node);
        owner == sender || self.is_approved_for_all(owner, sender)
    }

    fn record_mut(&mut self, node: Node) -> &mut NodeRecord {
        self.records.entry(node).or_default()
    }
}

impl Chain {
    /// Deploy a name registry whose root node is owned by `deployer`.
    pub fn create_name_registry(&mut self, deployer: Address) -> Result<Address, ChainError> {
        let mut registry = NameRegistry::default();
        registry.record_mut(Node::ROOT).owner = deployer;
        let address = self.create(deployer, Account::NameRegistry(registry))?;
        self.log(
            address,
            Event::Transfer {
                node: Node::ROOT,
                owner: deployer,
            },
        );
        Ok(address)
    }

    fn authorise_node(
        &self,
        registry: Address,
        node: Node,
        sender: Address,
    ) -> Result<(), ChainError> {
        if self.name_registry(registry)?.is_authorised(node, sender) {
            Ok(())
        } else {
            Err(NamingError::Unauthorised { node, sender }.into())
        }
    }

    pub fn set_owner(
        &mut self,
        sender: Address,
        registry: Address,
        node: Node,
        owner: Address,
    ) -> Result<(), ChainError> {
        self.charge()?;
        self.authorise_node(registry, node, sender)?;
        self.name_registry_mut(registry)?.record_mut(node).owner = owner;
        debug!(node = %node, owner = %owner, "Node ownership transferred");
        self.log(registry, Event::Transfer { node, owner });
        Ok(())
    }

    /// Assign `label` under `node` to `owner`, returning the subnode.
    pub fn set_subnode_owner(
        &mut self,
        sender: Address,
        registry: Address,
        node: Node,
        label: &str,
        owner: Address,
    ) -> Result<Node, ChainError> {
        self.charge()?;
        self.authorise_node(registry, node, sender)?;
        let subnode = node.child(label);
        self.name_registry_mut(registry)?.record_mut(subnode).owner = owner;
        debug!(parent = %node, label, owner = %owner, "Subnode assigned");
        self.log(
            registry,
            Event::NewOwner {
                node: subnode,
                owner,
            },
        );
        Ok(subnode)
    }

    pub fn set_resolver(
        &mut self,
        sender: Address,
        registry: Address,
        node: Node,
        resolver: Address,
    ) -> Result<(), ChainError> {
        self.charge()?;
        self.authorise_node(registry, node, sender)?;
        self.name_registry_mut(registry)?.record_mut(node).resolver = resolver;
        self.log(registry, Event::NewResolver { node, resolver });
        Ok(())
    }

    /// Let `operator` manage every node owned by `sender`.
    pub fn set_approval_for_all(
        &mut self,
        sender: Address,
        registry: Address,
        operator: Address,
        approved: bool,
    ) -> Result<(), ChainError> {
        self.charge()?;
        let operators = &mut self.name_registry_mut(registry)?.operators;
        if approved {
            operators.insert((sender, operator));
        } else {
            operators.remove(&(sender, operator));
        }
        self.log(
            registry,
            Event::ApprovalForAll {
                owner: sender,
                operator,
                approved,
            },
        );
        Ok(())
    }
}
