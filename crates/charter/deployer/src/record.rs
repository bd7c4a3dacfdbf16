use charter_types::Address;
use serde::{Deserialize, Serialize};

/// A plugin repository created by the bootstrap.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployedPluginRepo {
    pub key: String,
    pub plugin_repo: Address,
}

/// Addresses produced by a bootstrap run.
///
/// All fields read as zero until the run commits. `dao_factory` doubles as
/// the "already deployed" sentinel.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    pub dao_factory: Address,
    pub plugin_repo_factory: Address,
    pub plugin_setup_processor: Address,

    pub dao_registry: Address,
    pub plugin_repo_registry: Address,

    pub ens_registry: Address,
    pub public_resolver: Address,
    pub dao_subdomain_registrar: Address,
    pub plugin_subdomain_registrar: Address,

    pub management_dao: Address,
    pub management_dao_multisig: Address,

    pub plugin_repos: Vec<DeployedPluginRepo>,
}

impl Deployment {
    pub fn is_deployed(&self) -> bool {
        !self.dao_factory.is_zero()
    }

    pub fn plugin_repo(&self, key: &str) -> Option<Address> {
        self.plugin_repos
            .iter()
            .find(|r| r.key == key)
            .map(|r| r.plugin_repo)
    }

    /// Every named address, for reporting.
    pub fn addresses(&self) -> Vec<(String, Address)> {
        let mut out: Vec<(String, Address)> = [
            ("dao_factory", self.dao_factory),
            ("plugin_repo_factory", self.plugin_repo_factory),
            ("plugin_setup_processor", self.plugin_setup_processor),
            ("dao_registry", self.dao_registry),
            ("plugin_repo_registry", self.plugin_repo_registry),
            ("ens_registry", self.ens_registry),
            ("public_resolver", self.public_resolver),
            ("dao_subdomain_registrar", self.dao_subdomain_registrar),
            ("plugin_subdomain_registrar", self.plugin_subdomain_registrar),
            ("management_dao", self.management_dao),
            ("management_dao_multisig", self.management_dao_multisig),
        ]
        .into_iter()
        .map(|(name, address)| (name.to_string(), address))
        .collect();
        out.extend(
            self.plugin_repos
                .iter()
                .map(|r| (format!("plugin_repo.{}", r.key), r.plugin_repo)),
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_record_is_not_deployed() {
        let record = Deployment::default();
        assert!(!record.is_deployed());
        assert!(record.addresses().iter().all(|(_, a)| a.is_zero()));
        assert_eq!(record.plugin_repo("multisig"), None);
    }

    #[test]
    fn sentinel_is_the_dao_factory() {
        let record = Deployment {
            management_dao: Address::named("dao"),
            ..Deployment::default()
        };
        assert!(!record.is_deployed());

        let record = Deployment {
            dao_factory: Address::named("factory"),
            plugin_repos: vec![DeployedPluginRepo {
                key: "multisig".into(),
                plugin_repo: Address::named("repo"),
            }],
            ..Deployment::default()
        };
        assert!(record.is_deployed());
        assert_eq!(record.plugin_repo("multisig"), Some(Address::named("repo")));
        assert!(record
            .addresses()
            .contains(&("plugin_repo.multisig".to_string(), Address::named("repo"))));
    }
}
