//! The plugin setup processor: two-phase (prepare, apply) installation of
//! plugins into DAOs.
//!
//! Preparing resolves a published version, lets its setup instantiate the
//! plugin and stores the permission delta in a [`PreparedInstallation`].
//! Applying replays that stored delta; nothing is recomputed.

use std::collections::BTreeMap;
use std::fmt;

use charter_types::{Address, Permission, VersionTag};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::info;

use crate::account::Account;
use crate::chain::Chain;
use crate::error::{ChainError, SetupError};
use crate::event::Event;
use crate::setup::{InstallationPayload, PreparedSetupData};

/// Identifier of one installation: hash of the DAO and the plugin instance.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SetupId(pub [u8; 32]);

impl SetupId {
    pub fn compute(dao: Address, plugin: Address) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"charter:setup");
        hasher.update(dao.as_bytes());
        hasher.update(plugin.as_bytes());
        Self(*hasher.finalize().as_bytes())
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    pub fn from_hex(digits: &str) -> Option<Self> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(digits.strip_prefix("0x")?, &mut bytes).ok()?;
        Some(Self(bytes))
    }
}

impl fmt::Debug for SetupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SetupId({}…)", &self.to_hex()[..14])
    }
}

impl fmt::Display for SetupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for SetupId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for SetupId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        SetupId::from_hex(&hex).ok_or_else(|| serde::de::Error::custom("invalid setup id"))
    }
}

/// Points at one published version of a registered repository.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginSetupRef {
    pub version_tag: VersionTag,
    pub plugin_repo: Address,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrepareInstallationParams {
    pub setup_ref: PluginSetupRef,
    pub payload: InstallationPayload,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetupStatus {
    Prepared,
    Applied,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparedInstallation {
    pub setup_id: SetupId,
    pub dao: Address,
    pub setup_ref: PluginSetupRef,
    pub plugin_setup: Address,
    pub plugin: Address,
    pub prepared: PreparedSetupData,
    pub status: SetupStatus,
    pub prepared_at_block: u64,
}

#[derive(Clone, Debug)]
pub struct PluginSetupProcessor {
    pub repo_registry: Address,
    installations: BTreeMap<SetupId, PreparedInstallation>,
}

impl PluginSetupProcessor {
    pub fn installation(&self, setup_id: SetupId) -> Option<&PreparedInstallation> {
        self.installations.get(&setup_id)
    }

    pub fn installations(&self) -> impl Iterator<Item = &PreparedInstallation> {
        self.installations.values()
    }
}

impl Chain {
    pub fn create_plugin_setup_processor(
        &mut self,
        deployer: Address,
        repo_registry: Address,
    ) -> Result<Address, ChainError> {
        self.plugin_repo_registry(repo_registry)?;
        self.create(
            deployer,
            Account::PluginSetupProcessor(PluginSetupProcessor {
                repo_registry,
                installations: BTreeMap::new(),
            }),
        )
    }

    /// Instantiate a plugin for `dao` and record the permissions it needs.
    pub fn prepare_installation(
        &mut self,
        sender: Address,
        psp: Address,
        dao: Address,
        params: PrepareInstallationParams,
    ) -> Result<PreparedInstallation, ChainError> {
        self.charge()?;
        let repo_registry = self.plugin_setup_processor(psp)?.repo_registry;
        let PluginSetupRef {
            version_tag,
            plugin_repo,
        } = params.setup_ref;

        if !self
            .plugin_repo_registry(repo_registry)?
            .is_registered(plugin_repo)
        {
            return Err(SetupError::PluginRepoNonexistent(plugin_repo).into());
        }
        let plugin_setup = self
            .plugin_repo(plugin_repo)?
            .get_version(version_tag)?
            .plugin_setup;

        let (plugin, prepared) = self.prepare_setup(plugin_setup, dao, params.payload)?;
        let setup_id = SetupId::compute(dao, plugin);
        let record = PreparedInstallation {
            setup_id,
            dao,
            setup_ref: params.setup_ref,
            plugin_setup,
            plugin,
            prepared,
            status: SetupStatus::Prepared,
            prepared_at_block: self.block().number,
        };
        self.plugin_setup_processor_mut(psp)?
            .installations
            .insert(setup_id, record.clone());

        info!(
            dao = %dao,
            plugin = %plugin,
            version = %version_tag,
            setup_id = %setup_id,
            "Installation prepared"
        );
        self.log(
            psp,
            Event::InstallationPrepared {
                sender,
                dao,
                setup_id,
                plugin_repo,
                version: version_tag,
                plugin,
            },
        );
        Ok(record)
    }

    /// Apply a prepared installation.
    ///
    /// `sender` needs `ApplyInstallation` on the processor in `dao`, and the
    /// processor needs `Root` on `dao`.
    pub fn apply_installation(
        &mut self,
        sender: Address,
        psp: Address,
        dao: Address,
        setup_id: SetupId,
    ) -> Result<(), ChainError> {
        self.charge()?;
        self.auth(dao, psp, sender, Permission::ApplyInstallation)?;

        let record = self
            .plugin_setup_processor(psp)?
            .installation(setup_id)
            .cloned()
            .ok_or(SetupError::SetupNotPrepared(setup_id))?;
        if record.dao != dao {
            return Err(SetupError::DaoMismatch {
                expected: record.dao,
                actual: dao,
            }
            .into());
        }
        if record.status == SetupStatus::Applied {
            return Err(SetupError::SetupAlreadyApplied(setup_id).into());
        }

        self.apply_multi_target_permissions(psp, dao, &record.prepared.permissions)?;

        if let Some(stored) = self
            .plugin_setup_processor_mut(psp)?
            .installations
            .get_mut(&setup_id)
        {
            stored.status = SetupStatus::Applied;
        }
        info!(dao = %dao, plugin = %record.plugin, setup_id = %setup_id, "Installation applied");
        self.log(
            psp,
            Event::InstallationApplied {
                dao,
                plugin: record.plugin,
                setup_id,
            },
        );
        Ok(())
    }
}
