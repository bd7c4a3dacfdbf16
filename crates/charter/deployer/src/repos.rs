//! Plugin repository bootstrap.
//!
//! Every core plugin gets its own repository, owned by the management DAO.
//! Versions are published through the DAO so the DAO is the maintainer of
//! record. When a plugin targets a version above v1.1 the slots below it are
//! filled with the placeholder setup first, keeping numbering identical to
//! networks where the plugin evolved incrementally.

use charter_chain::{Action, Call, Chain};
use charter_types::{Address, VersionTag};
use tracing::{debug, info};

use crate::config::CorePlugin;
use crate::error::{DeployerError, DeployerResult};

/// Build and release metadata written into placeholder slots.
pub const PLACEHOLDER_METADATA: &str = "charter://placeholder";

/// Addresses the repository bootstrap works with.
#[derive(Clone, Copy, Debug)]
pub struct RepoContext {
    /// Account routing calls through the DAO.
    pub engine: Address,
    pub dao: Address,
    pub plugin_repo_factory: Address,
    pub placeholder_setup: Address,
}

/// Versions to publish for `plugin`, in order: one placeholder build for
/// every release below the target, placeholder builds `1..build` of the
/// target release, then the real setup.
pub fn publish_actions(repo: Address, plugin: &CorePlugin, placeholder: Address) -> Vec<Action> {
    let create = |release: u8, plugin_setup: Address, build_metadata: &str, release_metadata: &str| {
        Action::new(
            repo,
            Call::CreateVersion {
                release,
                plugin_setup,
                build_metadata: build_metadata.to_string(),
                release_metadata: release_metadata.to_string(),
            },
        )
    };

    let mut actions = Vec::with_capacity(plugin.release as usize + plugin.build as usize);
    for release in 1..plugin.release {
        actions.push(create(
            release,
            placeholder,
            PLACEHOLDER_METADATA,
            PLACEHOLDER_METADATA,
        ));
    }
    for build in 1..plugin.build {
        let release_metadata = if build == 1 {
            plugin.release_metadata_uri.as_str()
        } else {
            ""
        };
        actions.push(create(
            plugin.release,
            placeholder,
            PLACEHOLDER_METADATA,
            release_metadata,
        ));
    }
    actions.push(create(
        plugin.release,
        plugin.plugin_setup,
        &plugin.build_metadata_uri,
        &plugin.release_metadata_uri,
    ));
    actions
}

/// Create the repository for `plugin`, publish it up to its target version
/// and check the result.
pub fn bootstrap_plugin_repo(
    chain: &mut Chain,
    ctx: &RepoContext,
    plugin: &CorePlugin,
) -> DeployerResult<Address> {
    let repo = chain.create_plugin_repo(
        ctx.engine,
        ctx.plugin_repo_factory,
        &plugin.subdomain,
        ctx.dao,
    )?;

    let actions = publish_actions(repo, plugin, ctx.placeholder_setup);
    let max = chain.config().max_actions.max(1);
    for (batch, chunk) in actions.chunks(max).enumerate() {
        debug!(repo = %repo, batch, actions = chunk.len(), "Publishing versions");
        chain.execute(ctx.engine, ctx.dao, batch as u64, chunk.to_vec())?;
    }

    verify_published(chain, repo, plugin, ctx.placeholder_setup)?;
    info!(
        plugin = %plugin.key,
        repo = %repo,
        version = %plugin.tag(),
        "Plugin repo bootstrapped"
    );
    Ok(repo)
}

fn verify_published(
    chain: &Chain,
    repo: Address,
    plugin: &CorePlugin,
    placeholder: Address,
) -> DeployerResult<()> {
    let r = chain.plugin_repo(repo)?;
    let actual = r.build_count(plugin.release);
    if r.latest_release() != plugin.release || actual != plugin.build {
        return Err(DeployerError::VersionPaddingMismatch {
            key: plugin.key.clone(),
            release: plugin.release,
            expected: plugin.build,
            actual,
        });
    }

    for build in 1..=plugin.build {
        let tag = VersionTag::new(plugin.release, build);
        let expected = if build == plugin.build {
            plugin.plugin_setup
        } else {
            placeholder
        };
        let actual = r.get_version(tag).map(|v| v.plugin_setup).unwrap_or_default();
        if actual != expected {
            return Err(DeployerError::ReleasedSetupMismatch {
                key: plugin.key.clone(),
                tag,
                expected,
                actual,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_of(action: &Action) -> (u8, Address) {
        match &action.call {
            Call::CreateVersion {
                release,
                plugin_setup,
                ..
            } => (*release, *plugin_setup),
            other => panic!("unexpected call {other:?}"),
        }
    }

    #[test]
    fn first_build_needs_a_single_action() {
        let repo = Address::named("repo");
        let setup = Address::named("setup");
        let plugin = CorePlugin::new("multisig", "multisig", setup);
        let actions = publish_actions(repo, &plugin, Address::named("placeholder"));
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].to, repo);
        assert_eq!(setup_of(&actions[0]), (1, setup));
    }

    #[test]
    fn pads_lower_builds_with_placeholder() {
        let setup = Address::named("setup");
        let placeholder = Address::named("placeholder");
        let plugin = CorePlugin::new("multisig", "multisig", setup).at(1, 3);
        let actions = publish_actions(Address::named("repo"), &plugin, placeholder);
        let setups: Vec<_> = actions.iter().map(setup_of).collect();
        assert_eq!(setups, vec![(1, placeholder), (1, placeholder), (1, setup)]);
    }

    #[test]
    fn pads_earlier_releases() {
        let setup = Address::named("setup");
        let placeholder = Address::named("placeholder");
        let plugin = CorePlugin::new("admin", "admin", setup).at(3, 2);
        let actions = publish_actions(Address::named("repo"), &plugin, placeholder);
        let setups: Vec<_> = actions.iter().map(setup_of).collect();
        assert_eq!(
            setups,
            vec![(1, placeholder), (2, placeholder), (3, placeholder), (3, setup)]
        );
    }

    #[test]
    fn new_release_carries_release_metadata() {
        let plugin = CorePlugin::new("multisig", "multisig", Address::named("setup"))
            .at(1, 3)
            .with_metadata("ipfs://release", "ipfs://build");
        let actions = publish_actions(Address::named("repo"), &plugin, Address::named("p"));
        let metadata: Vec<_> = actions
            .iter()
            .map(|a| match &a.call {
                Call::CreateVersion {
                    build_metadata,
                    release_metadata,
                    ..
                } => (build_metadata.as_str(), release_metadata.as_str()),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(
            metadata,
            vec![
                (PLACEHOLDER_METADATA, "ipfs://release"),
                (PLACEHOLDER_METADATA, ""),
                ("ipfs://build", "ipfs://release"),
            ]
        );
    }
}
