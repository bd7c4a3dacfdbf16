//! Management DAO bootstrap: creation, registration and installation of its
//! controlling multisig.

use charter_chain::{
    Chain, InstallationPayload, MultiTargetPermission, MultisigSettings, PluginSetupRef,
    PrepareInstallationParams, TargetConfig,
};
use charter_types::{Address, Permission, VersionTag};
use tracing::info;

use crate::config::ManagementDaoParameters;
use crate::error::DeployerResult;

/// Create the DAO with `engine` as initial owner, let it administer itself
/// and allow `engine` to route calls through it.
pub fn create_management_dao(
    chain: &mut Chain,
    engine: Address,
    dao_base: Address,
    metadata_uri: &str,
) -> DeployerResult<Address> {
    let dao = chain.create_dao(engine, dao_base, metadata_uri, engine)?;
    let items = [
        MultiTargetPermission::grant(dao, dao, Permission::Root),
        MultiTargetPermission::grant(dao, dao, Permission::UpgradeDao),
        MultiTargetPermission::grant(dao, dao, Permission::RegisterStandardCallback),
        MultiTargetPermission::grant(dao, engine, Permission::Execute),
    ];
    chain.apply_multi_target_permissions(engine, dao, &items)?;
    info!(dao = %dao, "Management DAO created");
    Ok(dao)
}

/// Register the DAO under `subdomain` using a one-shot `RegisterDao` grant.
pub fn register_management_dao(
    chain: &mut Chain,
    engine: Address,
    dao: Address,
    dao_registry: Address,
    subdomain: &str,
) -> DeployerResult<()> {
    chain.with_temporary_grant(
        engine,
        dao,
        dao_registry,
        engine,
        Permission::RegisterDao,
        |c| c.register_dao(engine, dao_registry, dao, engine, subdomain),
    )?;
    info!(dao = %dao, subdomain, "Management DAO registered");
    Ok(())
}

/// Prepare and apply the multisig installation.
///
/// The processor holds `Root` on the DAO and the engine holds
/// `ApplyInstallation` only while the installation is applied.
pub fn install_controlling_body(
    chain: &mut Chain,
    engine: Address,
    dao: Address,
    psp: Address,
    plugin_repo: Address,
    version_tag: VersionTag,
    params: &ManagementDaoParameters,
) -> DeployerResult<Address> {
    let prepared = chain.prepare_installation(
        engine,
        psp,
        dao,
        PrepareInstallationParams {
            setup_ref: PluginSetupRef {
                version_tag,
                plugin_repo,
            },
            payload: InstallationPayload::Multisig {
                members: params.members.clone(),
                settings: MultisigSettings {
                    only_listed: params.only_listed,
                    min_approvals: params.min_approvals,
                },
                target: TargetConfig::default(),
            },
        },
    )?;

    chain.with_temporary_grant(engine, dao, dao, psp, Permission::Root, |c| {
        c.with_temporary_grant(engine, dao, psp, engine, Permission::ApplyInstallation, |c| {
            c.apply_installation(engine, psp, dao, prepared.setup_id)
        })
    })?;

    info!(
        dao = %dao,
        plugin = %prepared.plugin,
        members = params.members.len(),
        min_approvals = params.min_approvals,
        "Controlling body installed"
    );
    Ok(prepared.plugin)
}

/// Drop the engine's `Execute` and finally its `Root` on the DAO.
pub fn revoke_engine_rights(chain: &mut Chain, engine: Address, dao: Address) -> DeployerResult<()> {
    let items = [
        MultiTargetPermission::revoke(dao, engine, Permission::Execute),
        MultiTargetPermission::revoke(dao, engine, Permission::Root),
    ];
    chain.apply_multi_target_permissions(engine, dao, &items)?;
    info!(dao = %dao, engine = %engine, "Engine rights revoked");
    Ok(())
}
