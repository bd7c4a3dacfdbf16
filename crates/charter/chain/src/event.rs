use charter_types::{Address, Node, Permission, VersionTag};
use serde::{Deserialize, Serialize};

use crate::psp::SetupId;

/// Events emitted by governed components.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    // permission managers
    Granted {
        permission: Permission,
        here: Address,
        #[serde(rename = "where")]
        where_: Address,
        who: Address,
    },
    Revoked {
        permission: Permission,
        here: Address,
        #[serde(rename = "where")]
        where_: Address,
        who: Address,
    },

    // organizations
    Executed {
        actor: Address,
        call_id: u64,
        action_count: usize,
    },
    MetadataSet {
        metadata_uri: String,
    },
    Upgraded {
        implementation: Address,
    },

    // naming
    NewOwner {
        node: Node,
        owner: Address,
    },
    Transfer {
        node: Node,
        owner: Address,
    },
    NewResolver {
        node: Node,
        resolver: Address,
    },
    ApprovalForAll {
        owner: Address,
        operator: Address,
        approved: bool,
    },
    AddrChanged {
        node: Node,
        addr: Address,
    },

    // registries
    DaoRegistered {
        dao: Address,
        creator: Address,
        subdomain: String,
    },
    PluginRepoRegistered {
        subdomain: String,
        plugin_repo: Address,
    },

    // repositories
    VersionCreated {
        release: u8,
        build: u16,
        plugin_setup: Address,
        build_metadata: String,
    },
    ReleaseMetadataUpdated {
        release: u8,
        release_metadata: String,
    },

    // installation
    InstallationPrepared {
        sender: Address,
        dao: Address,
        setup_id: SetupId,
        plugin_repo: Address,
        version: VersionTag,
        plugin: Address,
    },
    InstallationApplied {
        dao: Address,
        plugin: Address,
        setup_id: SetupId,
    },

    // multisig
    MembersAdded {
        members: Vec<Address>,
    },
    MembersRemoved {
        members: Vec<Address>,
    },
    MultisigSettingsUpdated {
        only_listed: bool,
        min_approvals: u16,
    },
    TargetSet {
        target: Address,
    },
    ProposalCreated {
        proposal_id: u64,
        creator: Address,
    },
    Approved {
        proposal_id: u64,
        approver: Address,
    },
    ProposalExecuted {
        proposal_id: u64,
    },

    // factories and deployer
    DaoCreated {
        dao: Address,
        creator: Address,
    },
    PluginRepoCreated {
        plugin_repo: Address,
        subdomain: String,
    },
    ProtocolDeployed {
        deployer: Address,
    },
}

/// An event together with the account that emitted it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub block: u64,
    pub emitter: Address,
    pub event: Event,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_tagged() {
        let event = Event::ProtocolDeployed {
            deployer: Address::named("engine"),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "protocol_deployed");
        assert_eq!(json["deployer"], Address::named("engine").to_hex());
    }

    #[test]
    fn granted_uses_where_key() {
        let event = Event::Granted {
            permission: Permission::Execute,
            here: Address::named("dao"),
            where_: Address::named("dao"),
            who: Address::named("engine"),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert!(json.get("where").is_some());
        assert_eq!(json["permission"], "EXECUTE");
    }
}
