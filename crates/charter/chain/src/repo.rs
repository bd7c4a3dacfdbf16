//! Versioned plugin repositories.
//!
//! A repository stores `(release, build) -> plugin setup` mappings. Builds
//! are numbered contiguously from 1 within each release, and a new release
//! may only be opened directly after the latest one.

use std::collections::{BTreeMap, HashMap};

use charter_types::{Address, Permission, VersionTag};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::account::{Account, ComponentKind};
use crate::chain::Chain;
use crate::error::{ChainError, RepoError};
use crate::event::Event;
use crate::permission::PermissionManager;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub tag: VersionTag,
    pub plugin_setup: Address,
    pub build_metadata: String,
}

#[derive(Clone, Debug)]
pub struct PluginRepo {
    pub implementation: Address,
    pub permissions: PermissionManager,
    latest_release: u8,
    builds_per_release: BTreeMap<u8, u16>,
    versions: BTreeMap<VersionTag, Version>,
    release_metadata: BTreeMap<u8, String>,
    latest_tag_for_setup: HashMap<Address, VersionTag>,
}

impl PluginRepo {
    fn new(implementation: Address) -> Self {
        Self {
            implementation,
            permissions: PermissionManager::new(),
            latest_release: 0,
            builds_per_release: BTreeMap::new(),
            versions: BTreeMap::new(),
            release_metadata: BTreeMap::new(),
            latest_tag_for_setup: HashMap::new(),
        }
    }

    pub fn latest_release(&self) -> u8 {
        self.latest_release
    }

    pub fn build_count(&self, release: u8) -> u16 {
        self.builds_per_release.get(&release).copied().unwrap_or(0)
    }

    pub fn get_version(&self, tag: VersionTag) -> Result<&Version, RepoError> {
        self.versions.get(&tag).ok_or(RepoError::VersionNotFound(tag))
    }

    pub fn get_latest_version(&self, release: u8) -> Result<&Version, RepoError> {
        self.get_version(VersionTag::new(release, self.build_count(release)))
    }

    /// Most recent tag published for `plugin_setup`.
    pub fn latest_tag_for_setup(&self, plugin_setup: Address) -> Option<VersionTag> {
        self.latest_tag_for_setup.get(&plugin_setup).copied()
    }

    pub fn release_metadata(&self, release: u8) -> Option<&str> {
        self.release_metadata.get(&release).map(String::as_str)
    }

    /// Every published version in `(release, build)` order.
    pub fn versions(&self) -> impl Iterator<Item = &Version> {
        self.versions.values()
    }

    fn publish(
        &mut self,
        release: u8,
        plugin_setup: Address,
        build_metadata: &str,
        release_metadata: &str,
    ) -> Result<VersionTag, RepoError> {
        if release == 0 {
            return Err(RepoError::ReleaseZeroNotAllowed);
        }
        if u16::from(release) > u16::from(self.latest_release) + 1 {
            return Err(RepoError::InvalidReleaseIncrement {
                latest: self.latest_release,
                release,
            });
        }
        if release > self.latest_release && release_metadata.is_empty() {
            return Err(RepoError::EmptyReleaseMetadata);
        }

        let build = self
            .build_count(release)
            .checked_add(1)
            .ok_or(RepoError::BuildLimitReached(release))?;
        let tag = VersionTag::new(release, build);

        if release > self.latest_release {
            self.latest_release = release;
        }
        self.builds_per_release.insert(release, build);
        self.versions.insert(
            tag,
            Version {
                tag,
                plugin_setup,
                build_metadata: build_metadata.to_string(),
            },
        );
        self.latest_tag_for_setup.insert(plugin_setup, tag);
        if !release_metadata.is_empty() {
            self.release_metadata
                .insert(release, release_metadata.to_string());
        }
        Ok(tag)
    }
}

impl Chain {
    /// Create a repository proxy. `initial_owner` receives `Root`,
    /// `Maintainer` and `UpgradeRepo` on it.
    pub fn create_plugin_repo_proxy(
        &mut self,
        deployer: Address,
        implementation: Address,
        initial_owner: Address,
    ) -> Result<Address, ChainError> {
        self.require_implementation(implementation, ComponentKind::PluginRepo)?;
        let repo = self.create(deployer, Account::PluginRepo(PluginRepo::new(implementation)))?;
        for permission in [
            Permission::Root,
            Permission::Maintainer,
            Permission::UpgradeRepo,
        ] {
            self.grant_unchecked(repo, repo, initial_owner, permission)?;
        }
        Ok(repo)
    }

    /// Publish the next build of `release`. Returns the build number.
    pub fn create_version(
        &mut self,
        sender: Address,
        repo: Address,
        release: u8,
        plugin_setup: Address,
        build_metadata: &str,
        release_metadata: &str,
    ) -> Result<u16, ChainError> {
        self.charge()?;
        self.plugin_repo(repo)?;
        self.auth(repo, repo, sender, Permission::Maintainer)?;
        if !matches!(self.account(plugin_setup), Some(Account::PluginSetup(_))) {
            return Err(RepoError::InvalidPluginSetup(plugin_setup).into());
        }

        let tag = self.plugin_repo_mut(repo)?.publish(
            release,
            plugin_setup,
            build_metadata,
            release_metadata,
        )?;
        info!(repo = %repo, version = %tag, setup = %plugin_setup, "Version created");
        self.log(
            repo,
            Event::VersionCreated {
                release,
                build: tag.build,
                plugin_setup,
                build_metadata: build_metadata.to_string(),
            },
        );
        if !release_metadata.is_empty() {
            self.log(
                repo,
                Event::ReleaseMetadataUpdated {
                    release,
                    release_metadata: release_metadata.to_string(),
                },
            );
        }
        Ok(tag.build)
    }

    pub fn update_release_metadata(
        &mut self,
        sender: Address,
        repo: Address,
        release: u8,
        release_metadata: &str,
    ) -> Result<(), ChainError> {
        self.charge()?;
        self.auth(repo, repo, sender, Permission::Maintainer)?;
        let r = self.plugin_repo_mut(repo)?;
        if release == 0 {
            return Err(RepoError::ReleaseZeroNotAllowed.into());
        }
        if release > r.latest_release {
            return Err(RepoError::ReleaseDoesNotExist(release).into());
        }
        if release_metadata.is_empty() {
            return Err(RepoError::EmptyReleaseMetadata.into());
        }
        r.release_metadata
            .insert(release, release_metadata.to_string());
        self.log(
            repo,
            Event::ReleaseMetadataUpdated {
                release,
                release_metadata: release_metadata.to_string(),
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::PluginSetupKind;

    fn setup() -> (Chain, Address, Address, Address) {
        let mut chain = Chain::new();
        let owner = Address::named("maintainer");
        let (repo, plugin_setup) = chain
            .transact(|c| {
                let base = c.deploy_implementation(owner, ComponentKind::PluginRepo)?;
                let repo = c.create_plugin_repo_proxy(owner, base, owner)?;
                let plugin_setup = c.deploy_plugin_setup(owner, PluginSetupKind::Placeholder)?;
                Ok::<_, ChainError>((repo, plugin_setup))
            })
            .unwrap();
        (chain, owner, repo, plugin_setup)
    }

    #[test]
    fn owner_gets_repo_permissions() {
        let (chain, owner, repo, _) = setup();
        for permission in [
            Permission::Root,
            Permission::Maintainer,
            Permission::UpgradeRepo,
        ] {
            assert!(chain.has_permission(repo, repo, owner, permission));
        }
    }

    #[test]
    fn builds_are_contiguous() {
        let (mut chain, owner, repo, setup) = setup();
        let builds: Vec<u16> = chain
            .transact(|c| {
                (0..3)
                    .map(|i| c.create_version(owner, repo, 1, setup, &format!("b{i}"), "r1"))
                    .collect::<Result<Vec<_>, _>>()
            })
            .unwrap();
        assert_eq!(builds, vec![1, 2, 3]);

        let r = chain.plugin_repo(repo).unwrap();
        assert_eq!(r.latest_release(), 1);
        assert_eq!(r.build_count(1), 3);
        assert_eq!(r.get_latest_version(1).unwrap().build_metadata, "b2");
        assert_eq!(r.latest_tag_for_setup(setup), Some(VersionTag::new(1, 3)));
    }

    #[test]
    fn release_rules() {
        let (mut chain, owner, repo, setup) = setup();
        let mut publish = |release: u8, meta: &'static str| {
            chain.transact(|c| c.create_version(owner, repo, release, setup, "b", meta))
        };
        assert_eq!(publish(0, "r"), Err(RepoError::ReleaseZeroNotAllowed.into()));
        assert_eq!(
            publish(2, "r"),
            Err(RepoError::InvalidReleaseIncrement {
                latest: 0,
                release: 2
            }
            .into())
        );
        assert_eq!(publish(1, ""), Err(RepoError::EmptyReleaseMetadata.into()));
        assert_eq!(publish(1, "r1"), Ok(1));
        // existing release accepts empty release metadata
        assert_eq!(publish(1, ""), Ok(2));
        assert_eq!(publish(2, "r2"), Ok(1));
        assert_eq!(publish(1, ""), Ok(3));
    }

    #[test]
    fn publishing_requires_maintainer_and_setup() {
        let (mut chain, owner, repo, setup) = setup();
        let mallory = Address::named("mallory");
        assert!(matches!(
            chain.transact(|c| c.create_version(mallory, repo, 1, setup, "b", "r")),
            Err(ChainError::Permission(_))
        ));
        assert_eq!(
            chain.transact(|c| c.create_version(owner, repo, 1, mallory, "b", "r")),
            Err(RepoError::InvalidPluginSetup(mallory).into())
        );
    }

    #[test]
    fn release_metadata_updates() {
        let (mut chain, owner, repo, setup) = setup();
        chain
            .transact(|c| c.create_version(owner, repo, 1, setup, "b", "first"))
            .unwrap();
        chain
            .transact(|c| c.update_release_metadata(owner, repo, 1, "second"))
            .unwrap();
        assert_eq!(
            chain.plugin_repo(repo).unwrap().release_metadata(1),
            Some("second")
        );
        assert_eq!(
            chain.transact(|c| c.update_release_metadata(owner, repo, 2, "x")),
            Err(RepoError::ReleaseDoesNotExist(2).into())
        );
    }

    #[test]
    fn build_counter_is_capped() {
        let mut repo = PluginRepo::new(Address::ZERO);
        repo.builds_per_release.insert(1, u16::MAX);
        repo.latest_release = 1;
        assert_eq!(
            repo.publish(1, Address::named("s"), "b", ""),
            Err(RepoError::BuildLimitReached(1))
        );
    }
}
