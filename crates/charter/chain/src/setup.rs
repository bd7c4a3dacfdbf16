//! Plugin setups: the code that knows how to instantiate a plugin for a DAO
//! and which permissions the new instance needs.

use charter_types::{Address, Permission};
use serde::{Deserialize, Serialize};

use crate::account::{Account, ComponentKind};
use crate::chain::Chain;
use crate::error::{ChainError, SetupError};
use crate::multisig::{MultisigSettings, TargetConfig};
use crate::permission::MultiTargetPermission;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginSetupKind {
    /// Fills version slots; refuses every installation.
    Placeholder,
    Multisig,
}

#[derive(Clone, Debug)]
pub struct PluginSetup {
    pub kind: PluginSetupKind,
    /// Base implementation of the plugin this setup instantiates
    /// ([`Address::ZERO`] for placeholders).
    pub implementation: Address,
}

/// Data handed to a setup when preparing an installation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InstallationPayload {
    None,
    Multisig {
        members: Vec<Address>,
        settings: MultisigSettings,
        #[serde(default)]
        target: TargetConfig,
    },
}

/// What a prepared installation will do once applied.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparedSetupData {
    pub helpers: Vec<Address>,
    /// Permission changes to apply in the DAO's permission manager.
    pub permissions: Vec<MultiTargetPermission>,
}

impl Chain {
    /// Deploy a plugin setup. Multisig setups deploy their own base
    /// implementation.
    pub fn deploy_plugin_setup(
        &mut self,
        deployer: Address,
        kind: PluginSetupKind,
    ) -> Result<Address, ChainError> {
        let setup = self.create(
            deployer,
            Account::PluginSetup(PluginSetup {
                kind,
                implementation: Address::ZERO,
            }),
        )?;
        if kind == PluginSetupKind::Multisig {
            let implementation = self.deploy_implementation(setup, ComponentKind::Multisig)?;
            self.plugin_setup_mut(setup)?.implementation = implementation;
        }
        Ok(setup)
    }

    /// Instantiate the plugin for `dao` and compute the permissions it needs.
    pub(crate) fn prepare_setup(
        &mut self,
        setup: Address,
        dao: Address,
        payload: InstallationPayload,
    ) -> Result<(Address, PreparedSetupData), ChainError> {
        let PluginSetup {
            kind,
            implementation,
        } = self.plugin_setup(setup)?.clone();

        match kind {
            PluginSetupKind::Placeholder => Err(SetupError::PlaceholderCannotBeUsed.into()),
            PluginSetupKind::Multisig => {
                let InstallationPayload::Multisig {
                    members,
                    settings,
                    target,
                } = payload
                else {
                    return Err(SetupError::PayloadMismatch {
                        expected: "multisig",
                    }
                    .into());
                };
                let plugin =
                    self.create_multisig(setup, implementation, dao, &members, settings, target)?;
                let permissions = vec![
                    MultiTargetPermission::grant(plugin, dao, Permission::UpdateMultisigSettings),
                    MultiTargetPermission::grant(plugin, dao, Permission::SetTargetConfig),
                    MultiTargetPermission::grant(plugin, dao, Permission::UpgradePlugin),
                    MultiTargetPermission::grant(dao, plugin, Permission::Execute),
                ];
                Ok((
                    plugin,
                    PreparedSetupData {
                        helpers: Vec::new(),
                        permissions,
                    },
                ))
            }
        }
    }
}
