//! Calls that can be sent to governed components, either directly or as
//! actions executed by a DAO.

use charter_types::{Address, Node, Permission};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::account::Account;
use crate::chain::Chain;
use crate::error::ChainError;
use crate::multisig::{MultisigSettings, TargetConfig};
use crate::permission::MultiTargetPermission;

/// One call inside a DAO action batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub to: Address,
    pub call: Call,
}

impl Action {
    pub fn new(to: Address, call: Call) -> Self {
        Self { to, call }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum Call {
    // permission managers
    Grant {
        #[serde(rename = "where")]
        where_: Address,
        who: Address,
        permission: Permission,
    },
    Revoke {
        #[serde(rename = "where")]
        where_: Address,
        who: Address,
        permission: Permission,
    },
    ApplyMultiTargetPermissions {
        items: Vec<MultiTargetPermission>,
    },

    // organizations
    Execute {
        call_id: u64,
        actions: Vec<Action>,
    },
    SetMetadata {
        metadata_uri: String,
    },
    UpgradeTo {
        implementation: Address,
    },

    // naming
    SetOwner {
        node: Node,
        owner: Address,
    },
    SetSubnodeOwner {
        node: Node,
        label: String,
        owner: Address,
    },
    SetResolver {
        node: Node,
        resolver: Address,
    },
    SetApprovalForAll {
        operator: Address,
        approved: bool,
    },
    SetAddr {
        node: Node,
        addr: Address,
    },
    RegisterSubnode {
        label: String,
        target: Address,
    },

    // registries
    RegisterDao {
        dao: Address,
        creator: Address,
        subdomain: String,
    },
    RegisterPluginRepo {
        subdomain: String,
        plugin_repo: Address,
    },

    // repositories
    CreateVersion {
        release: u8,
        plugin_setup: Address,
        build_metadata: String,
        release_metadata: String,
    },
    UpdateReleaseMetadata {
        release: u8,
        release_metadata: String,
    },

    // multisig
    UpdateMultisigSettings {
        settings: MultisigSettings,
    },
    AddMembers {
        members: Vec<Address>,
    },
    RemoveMembers {
        members: Vec<Address>,
    },
    SetTargetConfig {
        config: TargetConfig,
    },
    CreateProposal {
        metadata: String,
        actions: Vec<Action>,
        approve: bool,
        try_execution: bool,
    },
    Approve {
        proposal_id: u64,
        try_execution: bool,
    },
    ExecuteProposal {
        proposal_id: u64,
    },
}

impl Call {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Grant { .. } => "grant",
            Self::Revoke { .. } => "revoke",
            Self::ApplyMultiTargetPermissions { .. } => "apply_multi_target_permissions",
            Self::Execute { .. } => "execute",
            Self::SetMetadata { .. } => "set_metadata",
            Self::UpgradeTo { .. } => "upgrade_to",
            Self::SetOwner { .. } => "set_owner",
            Self::SetSubnodeOwner { .. } => "set_subnode_owner",
            Self::SetResolver { .. } => "set_resolver",
            Self::SetApprovalForAll { .. } => "set_approval_for_all",
            Self::SetAddr { .. } => "set_addr",
            Self::RegisterSubnode { .. } => "register_subnode",
            Self::RegisterDao { .. } => "register_dao",
            Self::RegisterPluginRepo { .. } => "register_plugin_repo",
            Self::CreateVersion { .. } => "create_version",
            Self::UpdateReleaseMetadata { .. } => "update_release_metadata",
            Self::UpdateMultisigSettings { .. } => "update_multisig_settings",
            Self::AddMembers { .. } => "add_members",
            Self::RemoveMembers { .. } => "remove_members",
            Self::SetTargetConfig { .. } => "set_target_config",
            Self::CreateProposal { .. } => "create_proposal",
            Self::Approve { .. } => "approve",
            Self::ExecuteProposal { .. } => "execute_proposal",
        }
    }

    /// Whether an account of the given kind exposes this call.
    fn accepted_by(&self, account: &Account) -> bool {
        use Account as A;
        match self {
            Self::Grant { .. } | Self::Revoke { .. } | Self::ApplyMultiTargetPermissions { .. } => {
                matches!(account, A::Dao(_) | A::PluginRepo(_))
            }
            Self::Execute { .. } | Self::SetMetadata { .. } => matches!(account, A::Dao(_)),
            Self::UpgradeTo { .. } => account.component_kind().is_some(),
            Self::SetOwner { .. }
            | Self::SetSubnodeOwner { .. }
            | Self::SetResolver { .. }
            | Self::SetApprovalForAll { .. } => matches!(account, A::NameRegistry(_)),
            Self::SetAddr { .. } => matches!(account, A::Resolver(_)),
            Self::RegisterSubnode { .. } => matches!(account, A::SubdomainRegistrar(_)),
            Self::RegisterDao { .. } => matches!(account, A::DaoRegistry(_)),
            Self::RegisterPluginRepo { .. } => matches!(account, A::PluginRepoRegistry(_)),
            Self::CreateVersion { .. } | Self::UpdateReleaseMetadata { .. } => {
                matches!(account, A::PluginRepo(_))
            }
            Self::UpdateMultisigSettings { .. }
            | Self::AddMembers { .. }
            | Self::RemoveMembers { .. }
            | Self::SetTargetConfig { .. }
            | Self::CreateProposal { .. }
            | Self::Approve { .. }
            | Self::ExecuteProposal { .. } => matches!(account, A::Multisig(_)),
        }
    }
}

/// Return value of a dispatched call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CallOutput {
    Unit,
    Address(Address),
    Node(Node),
    Build(u16),
    ProposalId(u64),
    Outputs(Vec<CallOutput>),
}

impl Chain {
    /// Dispatch `call` from `sender` to the account at `to`.
    pub fn call(&mut self, sender: Address, to: Address, call: Call) -> Result<CallOutput, ChainError> {
        let account = self.account(to).ok_or(ChainError::AccountNotFound(to))?;
        if !call.accepted_by(account) {
            return Err(ChainError::UnsupportedCall {
                to,
                call: call.name(),
            });
        }
        trace!(sender = %sender, to = %to, call = call.name(), "Dispatching call");

        let unit = |r: Result<(), ChainError>| r.map(|_| CallOutput::Unit);
        match call {
            Call::Grant {
                where_,
                who,
                permission,
            } => unit(self.grant(sender, to, where_, who, permission)),
            Call::Revoke {
                where_,
                who,
                permission,
            } => unit(self.revoke(sender, to, where_, who, permission)),
            Call::ApplyMultiTargetPermissions { items } => {
                unit(self.apply_multi_target_permissions(sender, to, &items))
            }
            Call::Execute { call_id, actions } => self
                .execute(sender, to, call_id, actions)
                .map(CallOutput::Outputs),
            Call::SetMetadata { metadata_uri } => unit(self.set_metadata(sender, to, metadata_uri)),
            Call::UpgradeTo { implementation } => unit(self.upgrade_to(sender, to, implementation)),
            Call::SetOwner { node, owner } => unit(self.set_owner(sender, to, node, owner)),
            Call::SetSubnodeOwner { node, label, owner } => self
                .set_subnode_owner(sender, to, node, &label, owner)
                .map(CallOutput::Node),
            Call::SetResolver { node, resolver } => {
                unit(self.set_resolver(sender, to, node, resolver))
            }
            Call::SetApprovalForAll { operator, approved } => {
                unit(self.set_approval_for_all(sender, to, operator, approved))
            }
            Call::SetAddr { node, addr } => unit(self.set_addr(sender, to, node, addr)),
            Call::RegisterSubnode { label, target } => self
                .register_subnode(sender, to, &label, target)
                .map(CallOutput::Node),
            Call::RegisterDao {
                dao,
                creator,
                subdomain,
            } => unit(self.register_dao(sender, to, dao, creator, &subdomain)),
            Call::RegisterPluginRepo {
                subdomain,
                plugin_repo,
            } => unit(self.register_plugin_repo(sender, to, &subdomain, plugin_repo)),
            Call::CreateVersion {
                release,
                plugin_setup,
                build_metadata,
                release_metadata,
            } => self
                .create_version(
                    sender,
                    to,
                    release,
                    plugin_setup,
                    &build_metadata,
                    &release_metadata,
                )
                .map(CallOutput::Build),
            Call::UpdateReleaseMetadata {
                release,
                release_metadata,
            } => unit(self.update_release_metadata(sender, to, release, &release_metadata)),
            Call::UpdateMultisigSettings { settings } => {
                unit(self.update_multisig_settings(sender, to, settings))
            }
            Call::AddMembers { members } => unit(self.add_members(sender, to, &members)),
            Call::RemoveMembers { members } => unit(self.remove_members(sender, to, &members)),
            Call::SetTargetConfig { config } => unit(self.set_target_config(sender, to, config)),
            Call::CreateProposal {
                metadata,
                actions,
                approve,
                try_execution,
            } => self
                .create_proposal(sender, to, metadata, actions, approve, try_execution)
                .map(CallOutput::ProposalId),
            Call::Approve {
                proposal_id,
                try_execution,
            } => unit(self.approve(sender, to, proposal_id, try_execution)),
            Call::ExecuteProposal { proposal_id } => {
                unit(self.execute_proposal(sender, to, proposal_id))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_calls_are_rejected() {
        let mut chain = Chain::new();
        let deployer = Address::named("deployer");
        let helper = chain
            .transact(|c| c.deploy_external(deployer, "helper"))
            .unwrap();
        let err = chain
            .send(
                deployer,
                helper,
                Call::SetMetadata {
                    metadata_uri: "ipfs://x".into(),
                },
            )
            .unwrap_err();
        assert_eq!(
            err,
            ChainError::UnsupportedCall {
                to: helper,
                call: "set_metadata"
            }
        );
    }

    #[test]
    fn calls_to_missing_accounts_fail() {
        let mut chain = Chain::new();
        let nobody = Address::named("nobody");
        let err = chain
            .send(
                Address::named("alice"),
                nobody,
                Call::SetApprovalForAll {
                    operator: Address::named("bob"),
                    approved: true,
                },
            )
            .unwrap_err();
        assert_eq!(err, ChainError::AccountNotFound(nobody));
    }

    #[test]
    fn calls_serialize_with_tag() {
        let call = Call::Grant {
            where_: Address::named("a"),
            who: Address::named("b"),
            permission: Permission::Root,
        };
        let json = serde_json::to_value(&call).unwrap();
        assert_eq!(json["call"], "grant");
        assert_eq!(json["permission"], "ROOT");
    }
}
