//! Deployment parameters.
//!
//! Everything the deployer needs is supplied once, at construction, as a tree
//! of plain value records. The deployer only ever hands out shared
//! references to it.

use std::collections::HashSet;

use charter_chain::is_subdomain_valid;
use charter_types::{Address, Node, VersionTag};
use serde::{Deserialize, Serialize};

use crate::error::{DeployerError, DeployerResult};

/// Base implementations the upgradeable components are proxied to.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Implementations {
    pub dao_base: Address,
    pub dao_registry_base: Address,
    pub plugin_repo_registry_base: Address,
    pub plugin_repo_base: Address,
    pub subdomain_registrar_base: Address,
    /// Plugin setup used to fill version slots below a target build.
    pub placeholder_setup: Address,
}

/// Helper programs the deployer delegates singleton creation to.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Helpers {
    pub naming: Address,
    pub dao_factory: Address,
    pub plugin_repo_factory: Address,
    pub plugin_setup_processor: Address,
}

/// Labels of the naming hierarchy.
///
/// DAOs are registered under `<dao_domain>.<tld>`, plugin repositories under
/// `<plugin_subdomain>.<dao_domain>.<tld>`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnsParameters {
    pub tld: String,
    pub dao_domain: String,
    pub plugin_subdomain: String,
    pub management_dao_subdomain: String,
}

impl Default for EnsParameters {
    fn default() -> Self {
        Self {
            tld: "eth".to_string(),
            dao_domain: "dao".to_string(),
            plugin_subdomain: "plugin".to_string(),
            management_dao_subdomain: "management".to_string(),
        }
    }
}

impl EnsParameters {
    pub fn tld_node(&self) -> Node {
        Node::ROOT.child(&self.tld)
    }

    pub fn dao_node(&self) -> Node {
        self.tld_node().child(&self.dao_domain)
    }

    pub fn plugin_node(&self) -> Node {
        self.dao_node().child(&self.plugin_subdomain)
    }

    pub fn dao_name(&self) -> String {
        format!("{}.{}", self.dao_domain, self.tld)
    }

    pub fn plugin_name(&self) -> String {
        format!("{}.{}", self.plugin_subdomain, self.dao_name())
    }
}

/// A plugin shipped with the protocol, published at a fixed version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorePlugin {
    /// Identifies the plugin inside the parameters and the deployment record.
    pub key: String,
    pub plugin_setup: Address,
    pub release: u8,
    pub build: u16,
    pub release_metadata_uri: String,
    pub build_metadata_uri: String,
    /// Label under the plugin domain.
    pub subdomain: String,
}

impl CorePlugin {
    /// A plugin published at v1.1 under `subdomain`.
    pub fn new(key: impl Into<String>, subdomain: impl Into<String>, plugin_setup: Address) -> Self {
        let key = key.into();
        Self {
            release_metadata_uri: format!("charter://{key}/release-metadata"),
            build_metadata_uri: format!("charter://{key}/build-metadata"),
            key,
            plugin_setup,
            release: 1,
            build: 1,
            subdomain: subdomain.into(),
        }
    }

    pub fn at(mut self, release: u8, build: u16) -> Self {
        self.release = release;
        self.build = build;
        self
    }

    pub fn with_metadata(
        mut self,
        release_metadata_uri: impl Into<String>,
        build_metadata_uri: impl Into<String>,
    ) -> Self {
        self.release_metadata_uri = release_metadata_uri.into();
        self.build_metadata_uri = build_metadata_uri.into();
        self
    }

    pub fn tag(&self) -> VersionTag {
        VersionTag::new(self.release, self.build)
    }
}

/// The management DAO and the multisig that controls it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagementDaoParameters {
    pub metadata_uri: String,
    pub members: Vec<Address>,
    pub min_approvals: u16,
    #[serde(default = "default_only_listed")]
    pub only_listed: bool,
    /// Key of the core plugin installed as the controlling body.
    pub controlling_plugin: String,
}

fn default_only_listed() -> bool {
    true
}

impl Default for ManagementDaoParameters {
    fn default() -> Self {
        Self {
            metadata_uri: "charter://management-dao".to_string(),
            members: Vec::new(),
            min_approvals: 1,
            only_listed: true,
            controlling_plugin: "multisig".to_string(),
        }
    }
}

/// Complete input of one protocol deployment.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentParameters {
    pub implementations: Implementations,
    pub helpers: Helpers,
    #[serde(default)]
    pub ens: EnsParameters,
    pub plugins: Vec<CorePlugin>,
    pub management_dao: ManagementDaoParameters,
}

impl DeploymentParameters {
    pub fn builder() -> DeploymentParametersBuilder {
        DeploymentParametersBuilder::default()
    }

    pub fn plugin(&self, key: &str) -> Option<&CorePlugin> {
        self.plugins.iter().find(|p| p.key == key)
    }

    /// Structural checks. Member/threshold consistency is left to the
    /// multisig and surfaces as a failed run.
    pub fn validate(&self) -> DeployerResult<()> {
        let i = &self.implementations;
        for (name, address) in [
            ("dao_base", i.dao_base),
            ("dao_registry_base", i.dao_registry_base),
            ("plugin_repo_registry_base", i.plugin_repo_registry_base),
            ("plugin_repo_base", i.plugin_repo_base),
            ("subdomain_registrar_base", i.subdomain_registrar_base),
            ("placeholder_setup", i.placeholder_setup),
        ] {
            require_address(name, address)?;
        }

        let h = &self.helpers;
        for (name, address) in [
            ("naming helper", h.naming),
            ("dao factory helper", h.dao_factory),
            ("plugin repo factory helper", h.plugin_repo_factory),
            ("plugin setup processor helper", h.plugin_setup_processor),
        ] {
            require_address(name, address)?;
        }

        for (name, label) in [
            ("tld", &self.ens.tld),
            ("dao domain", &self.ens.dao_domain),
            ("plugin subdomain", &self.ens.plugin_subdomain),
            ("management DAO subdomain", &self.ens.management_dao_subdomain),
        ] {
            if !is_subdomain_valid(label) {
                return Err(invalid(format!("{name} label {label:?} is not valid")));
            }
        }

        if self.plugins.is_empty() {
            return Err(invalid("at least one core plugin is required"));
        }
        let mut keys = HashSet::new();
        let mut subdomains = HashSet::new();
        for plugin in &self.plugins {
            if plugin.key.is_empty() {
                return Err(invalid("plugin key must not be empty"));
            }
            if !keys.insert(plugin.key.as_str()) {
                return Err(invalid(format!("duplicate plugin key {:?}", plugin.key)));
            }
            if !is_subdomain_valid(&plugin.subdomain) {
                return Err(invalid(format!(
                    "plugin {} subdomain {:?} is not valid",
                    plugin.key, plugin.subdomain
                )));
            }
            if !subdomains.insert(plugin.subdomain.as_str()) {
                return Err(invalid(format!(
                    "duplicate plugin subdomain {:?}",
                    plugin.subdomain
                )));
            }
            if plugin.release == 0 || plugin.build == 0 {
                return Err(invalid(format!(
                    "plugin {} must target release and build of at least 1",
                    plugin.key
                )));
            }
            if plugin.release_metadata_uri.is_empty() {
                return Err(invalid(format!(
                    "plugin {} has no release metadata",
                    plugin.key
                )));
            }
            require_address("plugin setup", plugin.plugin_setup)?;
        }

        if self.plugin(&self.management_dao.controlling_plugin).is_none() {
            return Err(invalid(format!(
                "controlling plugin {:?} is not a configured plugin",
                self.management_dao.controlling_plugin
            )));
        }
        Ok(())
    }
}

fn require_address(name: &str, address: Address) -> DeployerResult<()> {
    if address.is_zero() {
        Err(invalid(format!("{name} address is not set")))
    } else {
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> DeployerError {
    DeployerError::InvalidParameters(message.into())
}

/// Builder for [`DeploymentParameters`].
#[derive(Clone, Debug, Default)]
pub struct DeploymentParametersBuilder {
    parameters: DeploymentParameters,
}

impl DeploymentParametersBuilder {
    pub fn implementations(mut self, implementations: Implementations) -> Self {
        self.parameters.implementations = implementations;
        self
    }

    pub fn helpers(mut self, helpers: Helpers) -> Self {
        self.parameters.helpers = helpers;
        self
    }

    pub fn ens(mut self, ens: EnsParameters) -> Self {
        self.parameters.ens = ens;
        self
    }

    /// Add a plugin, replacing any plugin with the same key.
    pub fn plugin(mut self, plugin: CorePlugin) -> Self {
        match self.parameters.plugins.iter_mut().find(|p| p.key == plugin.key) {
            Some(existing) => *existing = plugin,
            None => self.parameters.plugins.push(plugin),
        }
        self
    }

    pub fn management_metadata(mut self, metadata_uri: impl Into<String>) -> Self {
        self.parameters.management_dao.metadata_uri = metadata_uri.into();
        self
    }

    pub fn member(mut self, member: Address) -> Self {
        self.parameters.management_dao.members.push(member);
        self
    }

    pub fn members(mut self, members: Vec<Address>) -> Self {
        self.parameters.management_dao.members = members;
        self
    }

    pub fn min_approvals(mut self, min_approvals: u16) -> Self {
        self.parameters.management_dao.min_approvals = min_approvals;
        self
    }

    pub fn controlling_plugin(mut self, key: impl Into<String>) -> Self {
        self.parameters.management_dao.controlling_plugin = key.into();
        self
    }

    pub fn build(self) -> DeployerResult<DeploymentParameters> {
        self.parameters.validate()?;
        Ok(self.parameters)
    }
}
