//! Multisig plugin: a member list that creates, approves and executes
//! proposals against a DAO.

use std::collections::{BTreeMap, BTreeSet};

use charter_types::{Address, Permission};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::account::{Account, ComponentKind};
use crate::call::Action;
use crate::chain::Chain;
use crate::error::{ChainError, MultisigError};
use crate::event::Event;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultisigSettings {
    /// Only members may create proposals.
    pub only_listed: bool,
    pub min_approvals: u16,
}

/// Where approved proposals are executed. The zero address means the DAO the
/// plugin is installed in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetConfig {
    pub target: Address,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: u64,
    pub creator: Address,
    pub metadata: String,
    pub actions: Vec<Action>,
    pub min_approvals: u16,
    pub approvers: BTreeSet<Address>,
    pub executed: bool,
    pub created_at: DateTime<Utc>,
    pub created_at_block: u64,
}

#[derive(Clone, Debug)]
pub struct Multisig {
    pub implementation: Address,
    pub dao: Address,
    members: Vec<Address>,
    settings: MultisigSettings,
    target: TargetConfig,
    proposals: BTreeMap<u64, Proposal>,
    proposal_count: u64,
}

impl Multisig {
    pub fn members(&self) -> &[Address] {
        &self.members
    }

    pub fn is_member(&self, who: Address) -> bool {
        self.members.contains(&who)
    }

    pub fn settings(&self) -> MultisigSettings {
        self.settings
    }

    pub fn target(&self) -> TargetConfig {
        self.target
    }

    /// Address proposals are executed on.
    pub fn execution_target(&self) -> Address {
        if self.target.target.is_zero() {
            self.dao
        } else {
            self.target.target
        }
    }

    pub fn proposal(&self, id: u64) -> Option<&Proposal> {
        self.proposals.get(&id)
    }

    pub fn proposal_count(&self) -> u64 {
        self.proposal_count
    }

    pub fn can_approve(&self, id: u64, who: Address) -> bool {
        match self.proposals.get(&id) {
            Some(p) => !p.executed && self.is_member(who) && !p.approvers.contains(&who),
            None => false,
        }
    }

    pub fn can_execute(&self, id: u64) -> bool {
        match self.proposals.get(&id) {
            Some(p) => !p.executed && p.approvers.len() >= usize::from(p.min_approvals),
            None => false,
        }
    }
}

fn validate_settings(member_count: usize, settings: &MultisigSettings) -> Result<(), MultisigError> {
    // member_count is bounded by u16::MAX before we get here
    let limit = u16::try_from(member_count).unwrap_or(u16::MAX);
    if settings.min_approvals > limit {
        return Err(MultisigError::MinApprovalsOutOfBounds {
            limit,
            actual: settings.min_approvals,
        });
    }
    if settings.min_approvals < 1 {
        return Err(MultisigError::MinApprovalsOutOfBounds {
            limit: 1,
            actual: settings.min_approvals,
        });
    }
    Ok(())
}

fn validate_new_members(existing: &[Address], new: &[Address]) -> Result<(), MultisigError> {
    let total = existing.len() + new.len();
    if total > usize::from(u16::MAX) {
        return Err(MultisigError::AddresslistLengthOutOfBounds {
            limit: usize::from(u16::MAX),
            actual: total,
        });
    }
    let mut seen: BTreeSet<Address> = existing.iter().copied().collect();
    for member in new {
        if !seen.insert(*member) {
            return Err(MultisigError::InvalidAddresslistUpdate(*member));
        }
    }
    Ok(())
}

impl Chain {
    pub fn create_multisig(
        &mut self,
        deployer: Address,
        implementation: Address,
        dao: Address,
        members: &[Address],
        settings: MultisigSettings,
        target: TargetConfig,
    ) -> Result<Address, ChainError> {
        self.require_implementation(implementation, ComponentKind::Multisig)?;
        self.dao(dao)?;
        validate_new_members(&[], members)?;
        validate_settings(members.len(), &settings)?;

        let plugin = self.create(
            deployer,
            Account::Multisig(Multisig {
                implementation,
                dao,
                members: members.to_vec(),
                settings,
                target,
                proposals: BTreeMap::new(),
                proposal_count: 0,
            }),
        )?;
        self.log(
            plugin,
            Event::MembersAdded {
                members: members.to_vec(),
            },
        );
        self.log(
            plugin,
            Event::MultisigSettingsUpdated {
                only_listed: settings.only_listed,
                min_approvals: settings.min_approvals,
            },
        );
        self.log(
            plugin,
            Event::TargetSet {
                target: target.target,
            },
        );
        info!(
            plugin = %plugin,
            dao = %dao,
            members = members.len(),
            min_approvals = settings.min_approvals,
            "Multisig created"
        );
        Ok(plugin)
    }

    // ── Proposals ───────────────────────────────────────────────────

    pub fn create_proposal(
        &mut self,
        sender: Address,
        plugin: Address,
        metadata: String,
        actions: Vec<Action>,
        approve: bool,
        try_execution: bool,
    ) -> Result<u64, ChainError> {
        self.charge()?;
        let block = self.block().clone();
        let m = self.multisig_mut(plugin)?;
        if m.settings.only_listed && !m.is_member(sender) {
            return Err(MultisigError::ProposalCreationForbidden(sender).into());
        }

        let id = m.proposal_count;
        m.proposal_count += 1;
        m.proposals.insert(
            id,
            Proposal {
                id,
                creator: sender,
                metadata,
                actions,
                min_approvals: m.settings.min_approvals,
                approvers: BTreeSet::new(),
                executed: false,
                created_at: block.timestamp,
                created_at_block: block.number,
            },
        );
        self.log(
            plugin,
            Event::ProposalCreated {
                proposal_id: id,
                creator: sender,
            },
        );
        info!(plugin = %plugin, proposal = id, creator = %sender, "Proposal created");

        if approve {
            self.approve(sender, plugin, id, try_execution)?;
        }
        Ok(id)
    }

    pub fn approve(
        &mut self,
        sender: Address,
        plugin: Address,
        proposal_id: u64,
        try_execution: bool,
    ) -> Result<(), ChainError> {
        self.charge()?;
        let m = self.multisig_mut(plugin)?;
        if m.proposal(proposal_id).is_none() {
            return Err(MultisigError::NonexistentProposal(proposal_id).into());
        }
        if !m.can_approve(proposal_id, sender) {
            return Err(MultisigError::ApprovalCastForbidden {
                proposal_id,
                sender,
            }
            .into());
        }
        if let Some(p) = m.proposals.get_mut(&proposal_id) {
            p.approvers.insert(sender);
        }
        let ready = m.can_execute(proposal_id);
        self.log(
            plugin,
            Event::Approved {
                proposal_id,
                approver: sender,
            },
        );

        if try_execution && ready {
            self.execute_approved(plugin, proposal_id)?;
        }
        Ok(())
    }

    /// Execute a proposal that reached its approval threshold. Anyone may
    /// trigger execution.
    pub fn execute_proposal(
        &mut self,
        _sender: Address,
        plugin: Address,
        proposal_id: u64,
    ) -> Result<(), ChainError> {
        self.charge()?;
        let m = self.multisig(plugin)?;
        if m.proposal(proposal_id).is_none() {
            return Err(MultisigError::NonexistentProposal(proposal_id).into());
        }
        if !m.can_execute(proposal_id) {
            return Err(MultisigError::ProposalExecutionForbidden(proposal_id).into());
        }
        self.execute_approved(plugin, proposal_id)
    }

    fn execute_approved(&mut self, plugin: Address, proposal_id: u64) -> Result<(), ChainError> {
        let m = self.multisig_mut(plugin)?;
        let target = m.execution_target();
        let actions = match m.proposals.get_mut(&proposal_id) {
            Some(p) => {
                p.executed = true;
                p.actions.clone()
            }
            None => return Err(MultisigError::NonexistentProposal(proposal_id).into()),
        };

        self.execute(plugin, target, proposal_id, actions)?;
        self.log(plugin, Event::ProposalExecuted { proposal_id });
        info!(plugin = %plugin, proposal = proposal_id, target = %target, "Proposal executed");
        Ok(())
    }

    // ── Settings ────────────────────────────────────────────────────

    fn auth_plugin(
        &self,
        plugin: Address,
        sender: Address,
        permission: Permission,
    ) -> Result<(), ChainError> {
        let dao = self.multisig(plugin)?.dao;
        self.auth(dao, plugin, sender, permission)
    }

    pub fn update_multisig_settings(
        &mut self,
        sender: Address,
        plugin: Address,
        settings: MultisigSettings,
    ) -> Result<(), ChainError> {
        self.charge()?;
        self.auth_plugin(plugin, sender, Permission::UpdateMultisigSettings)?;
        let m = self.multisig_mut(plugin)?;
        validate_settings(m.members.len(), &settings)?;
        m.settings = settings;
        self.log(
            plugin,
            Event::MultisigSettingsUpdated {
                only_listed: settings.only_listed,
                min_approvals: settings.min_approvals,
            },
        );
        Ok(())
    }

    pub fn add_members(
        &mut self,
        sender: Address,
        plugin: Address,
        members: &[Address],
    ) -> Result<(), ChainError> {
        self.charge()?;
        self.auth_plugin(plugin, sender, Permission::UpdateMultisigSettings)?;
        let m = self.multisig_mut(plugin)?;
        validate_new_members(&m.members, members)?;
        m.members.extend_from_slice(members);
        self.log(
            plugin,
            Event::MembersAdded {
                members: members.to_vec(),
            },
        );
        Ok(())
    }

    pub fn remove_members(
        &mut self,
        sender: Address,
        plugin: Address,
        members: &[Address],
    ) -> Result<(), ChainError> {
        self.charge()?;
        self.auth_plugin(plugin, sender, Permission::UpdateMultisigSettings)?;
        let m = self.multisig_mut(plugin)?;

        let mut remaining = m.members.clone();
        for member in members {
            let index = remaining
                .iter()
                .position(|a| a == member)
                .ok_or(MultisigError::InvalidAddresslistUpdate(*member))?;
            remaining.remove(index);
        }
        let limit = u16::try_from(remaining.len()).unwrap_or(u16::MAX);
        if m.settings.min_approvals > limit {
            return Err(MultisigError::MinApprovalsOutOfBounds {
                limit,
                actual: m.settings.min_approvals,
            }
            .into());
        }
        m.members = remaining;
        self.log(
            plugin,
            Event::MembersRemoved {
                members: members.to_vec(),
            },
        );
        Ok(())
    }

    pub fn set_target_config(
        &mut self,
        sender: Address,
        plugin: Address,
        config: TargetConfig,
    ) -> Result<(), ChainError> {
        self.charge()?;
        self.auth_plugin(plugin, sender, Permission::SetTargetConfig)?;
        self.multisig_mut(plugin)?.target = config;
        self.log(
            plugin,
            Event::TargetSet {
                target: config.target,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::Call;

    struct Fixture {
        chain: Chain,
        dao: Address,
        plugin: Address,
        members: Vec<Address>,
    }

    /// A DAO with a 2-of-3 multisig wired as its executor.
    fn fixture() -> Fixture {
        let mut chain = Chain::new();
        let admin = Address::named("admin");
        let members: Vec<Address> = ["alice", "bob", "carol"]
            .iter()
            .map(|n| Address::named(n))
            .collect();
        let (dao, plugin) = chain
            .transact(|c| {
                let dao_base = c.deploy_implementation(admin, ComponentKind::Dao)?;
                let ms_base = c.deploy_implementation(admin, ComponentKind::Multisig)?;
                let dao = c.create_dao(admin, dao_base, "ipfs://dao", admin)?;
                let plugin = c.create_multisig(
                    admin,
                    ms_base,
                    dao,
                    &members,
                    MultisigSettings {
                        only_listed: true,
                        min_approvals: 2,
                    },
                    TargetConfig::default(),
                )?;
                c.grant(admin, dao, dao, plugin, Permission::Execute)?;
                c.grant(admin, dao, dao, dao, Permission::SetMetadata)?;
                c.grant(admin, dao, plugin, dao, Permission::UpdateMultisigSettings)?;
                Ok::<_, ChainError>((dao, plugin))
            })
            .unwrap();
        Fixture {
            chain,
            dao,
            plugin,
            members,
        }
    }

    fn set_metadata(dao: Address, uri: &str) -> Vec<Action> {
        vec![Action::new(
            dao,
            Call::SetMetadata {
                metadata_uri: uri.into(),
            },
        )]
    }

    #[test]
    fn initialisation_bounds() {
        let one = [Address::named("solo")];
        assert_eq!(
            validate_settings(
                one.len(),
                &MultisigSettings {
                    only_listed: true,
                    min_approvals: 2
                }
            ),
            Err(MultisigError::MinApprovalsOutOfBounds {
                limit: 1,
                actual: 2
            })
        );
        assert_eq!(
            validate_settings(
                one.len(),
                &MultisigSettings {
                    only_listed: true,
                    min_approvals: 0
                }
            ),
            Err(MultisigError::MinApprovalsOutOfBounds {
                limit: 1,
                actual: 0
            })
        );
        let dup = [one[0], one[0]];
        assert_eq!(
            validate_new_members(&[], &dup),
            Err(MultisigError::InvalidAddresslistUpdate(one[0]))
        );
    }

    #[test]
    fn two_of_three_executes() {
        let Fixture {
            mut chain,
            dao,
            plugin,
            members,
        } = fixture();
        let id = chain
            .transact(|c| {
                c.create_proposal(
                    members[0],
                    plugin,
                    "ipfs://p".into(),
                    set_metadata(dao, "ipfs://new"),
                    true,
                    true,
                )
            })
            .unwrap();
        assert!(!chain.multisig(plugin).unwrap().can_execute(id));
        assert_eq!(chain.dao(dao).unwrap().metadata_uri, "ipfs://dao");

        chain
            .transact(|c| c.approve(members[1], plugin, id, true))
            .unwrap();
        assert_eq!(chain.dao(dao).unwrap().metadata_uri, "ipfs://new");
        let proposal = chain.multisig(plugin).unwrap().proposal(id).unwrap().clone();
        assert!(proposal.executed);
        assert_eq!(proposal.approvers.len(), 2);
    }

    #[test]
    fn outsiders_cannot_propose_or_approve() {
        let Fixture {
            mut chain,
            dao,
            plugin,
            members,
        } = fixture();
        let mallory = Address::named("mallory");
        assert_eq!(
            chain.transact(|c| c.create_proposal(mallory, plugin, String::new(), vec![], false, false)),
            Err(MultisigError::ProposalCreationForbidden(mallory).into())
        );

        let id = chain
            .transact(|c| {
                c.create_proposal(members[0], plugin, String::new(), set_metadata(dao, "x"), true, false)
            })
            .unwrap();
        assert_eq!(
            chain.transact(|c| c.approve(mallory, plugin, id, false)),
            Err(MultisigError::ApprovalCastForbidden {
                proposal_id: id,
                sender: mallory
            }
            .into())
        );
        assert_eq!(
            chain.transact(|c| c.approve(members[0], plugin, id, false)),
            Err(MultisigError::ApprovalCastForbidden {
                proposal_id: id,
                sender: members[0]
            }
            .into())
        );
        assert_eq!(
            chain.transact(|c| c.approve(members[0], plugin, 99, false)),
            Err(MultisigError::NonexistentProposal(99).into())
        );
    }

    #[test]
    fn execution_waits_for_threshold() {
        let Fixture {
            mut chain,
            dao,
            plugin,
            members,
        } = fixture();
        let id = chain
            .transact(|c| {
                c.create_proposal(members[0], plugin, String::new(), set_metadata(dao, "y"), true, false)
            })
            .unwrap();
        assert_eq!(
            chain.transact(|c| c.execute_proposal(members[2], plugin, id)),
            Err(MultisigError::ProposalExecutionForbidden(id).into())
        );
        chain
            .transact(|c| c.approve(members[2], plugin, id, false))
            .unwrap();
        chain
            .transact(|c| c.execute_proposal(Address::named("anyone"), plugin, id))
            .unwrap();
        assert_eq!(chain.dao(dao).unwrap().metadata_uri, "y");
        assert_eq!(
            chain.transact(|c| c.execute_proposal(members[2], plugin, id)),
            Err(MultisigError::ProposalExecutionForbidden(id).into())
        );
    }

    #[test]
    fn membership_updates_go_through_the_dao() {
        let Fixture {
            mut chain,
            plugin,
            members,
            ..
        } = fixture();
        let dave = Address::named("dave");

        // only the DAO holds UpdateMultisigSettings
        assert!(matches!(
            chain.transact(|c| c.add_members(members[0], plugin, &[dave])),
            Err(ChainError::Permission(_))
        ));

        let actions = vec![Action::new(plugin, Call::AddMembers { members: vec![dave] })];
        let id = chain
            .transact(|c| c.create_proposal(members[0], plugin, String::new(), actions, true, false))
            .unwrap();
        chain
            .transact(|c| c.approve(members[1], plugin, id, true))
            .unwrap();
        assert!(chain.multisig(plugin).unwrap().is_member(dave));
        assert_eq!(chain.multisig(plugin).unwrap().members().len(), 4);

        // removing down below the threshold fails
        let actions = vec![Action::new(
            plugin,
            Call::RemoveMembers {
                members: vec![members[0], members[1], members[2]],
            },
        )];
        let id = chain
            .transact(|c| c.create_proposal(members[0], plugin, String::new(), actions, true, false))
            .unwrap();
        let err = chain
            .transact(|c| c.approve(members[1], plugin, id, true))
            .unwrap_err();
        assert_eq!(
            err,
            MultisigError::MinApprovalsOutOfBounds {
                limit: 1,
                actual: 2
            }
            .into()
        );
    }
}
