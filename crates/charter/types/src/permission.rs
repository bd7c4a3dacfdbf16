use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Every permission identifier understood by the governed components.
///
/// A permission is always granted on a `(where, who)` pair inside some
/// permission manager; the identifier alone carries no authority.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    /// Manage every permission of a permission manager.
    Root,
    /// Run action batches through a DAO.
    Execute,
    UpgradeDao,
    SetMetadata,
    RegisterStandardCallback,
    /// Register organizations in the organization registry.
    RegisterDao,
    /// Register extension repositories in the repository registry.
    RegisterPluginRepo,
    UpgradeRegistry,
    /// Mint subdomains through a naming registrar.
    RegisterEnsSubdomain,
    UpgradeRegistrar,
    /// Publish versions in an extension repository.
    Maintainer,
    UpgradeRepo,
    /// Apply prepared installations through the setup processor.
    ApplyInstallation,
    UpdateMultisigSettings,
    SetTargetConfig,
    UpgradePlugin,
}

impl Permission {
    pub const ALL: [Permission; 16] = [
        Permission::Root,
        Permission::Execute,
        Permission::UpgradeDao,
        Permission::SetMetadata,
        Permission::RegisterStandardCallback,
        Permission::RegisterDao,
        Permission::RegisterPluginRepo,
        Permission::UpgradeRegistry,
        Permission::RegisterEnsSubdomain,
        Permission::UpgradeRegistrar,
        Permission::Maintainer,
        Permission::UpgradeRepo,
        Permission::ApplyInstallation,
        Permission::UpdateMultisigSettings,
        Permission::SetTargetConfig,
        Permission::UpgradePlugin,
    ];

    /// Canonical name, e.g. `ROOT_PERMISSION`.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Root => "ROOT_PERMISSION",
            Self::Execute => "EXECUTE_PERMISSION",
            Self::UpgradeDao => "UPGRADE_DAO_PERMISSION",
            Self::SetMetadata => "SET_METADATA_PERMISSION",
            Self::RegisterStandardCallback => "REGISTER_STANDARD_CALLBACK_PERMISSION",
            Self::RegisterDao => "REGISTER_DAO_PERMISSION",
            Self::RegisterPluginRepo => "REGISTER_PLUGIN_REPO_PERMISSION",
            Self::UpgradeRegistry => "UPGRADE_REGISTRY_PERMISSION",
            Self::RegisterEnsSubdomain => "REGISTER_ENS_SUBDOMAIN_PERMISSION",
            Self::UpgradeRegistrar => "UPGRADE_REGISTRAR_PERMISSION",
            Self::Maintainer => "MAINTAINER_PERMISSION",
            Self::UpgradeRepo => "UPGRADE_REPO_PERMISSION",
            Self::ApplyInstallation => "APPLY_INSTALLATION_PERMISSION",
            Self::UpdateMultisigSettings => "UPDATE_MULTISIG_SETTINGS_PERMISSION",
            Self::SetTargetConfig => "SET_TARGET_CONFIG_PERMISSION",
            Self::UpgradePlugin => "UPGRADE_PLUGIN_PERMISSION",
        }
    }

    /// 32-byte identifier, the hash of the canonical name.
    pub fn id(&self) -> [u8; 32] {
        *blake3::hash(self.name().as_bytes()).as_bytes()
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Permission {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.name() == s)
            .ok_or_else(|| TypeError::UnknownPermission(s.to_string()))
    }
}
