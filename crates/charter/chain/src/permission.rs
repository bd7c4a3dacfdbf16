//! Permission managers and the grant primitives built on top of them.
//!
//! Every DAO and every plugin repository embeds a [`PermissionManager`].
//! A grant is a `(where, who, permission)` triple; holding `Root` on the
//! manager itself is required to change any of them.

use std::collections::BTreeSet;

use charter_types::{Address, Permission};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::account::Account;
use crate::chain::Chain;
use crate::error::{ChainError, PermissionError};
use crate::event::Event;

/// A single standing grant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PermissionKey {
    #[serde(rename = "where")]
    pub where_: Address,
    pub who: Address,
    pub permission: Permission,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionOperation {
    Grant,
    Revoke,
}

/// One entry of a bulk permission change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiTargetPermission {
    pub operation: PermissionOperation,
    #[serde(rename = "where")]
    pub where_: Address,
    pub who: Address,
    pub permission: Permission,
}

impl MultiTargetPermission {
    pub fn grant(where_: Address, who: Address, permission: Permission) -> Self {
        Self {
            operation: PermissionOperation::Grant,
            where_,
            who,
            permission,
        }
    }

    pub fn revoke(where_: Address, who: Address, permission: Permission) -> Self {
        Self {
            operation: PermissionOperation::Revoke,
            where_,
            who,
            permission,
        }
    }
}

/// Grant storage of one permission manager.
#[derive(Clone, Debug, Default)]
pub struct PermissionManager {
    grants: BTreeSet<PermissionKey>,
}

impl PermissionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `who` holds `permission` on `where_`, directly or through an
    /// [`Address::ANY`] wildcard.
    pub fn is_granted(&self, where_: Address, who: Address, permission: Permission) -> bool {
        let holds = |where_, who| {
            self.grants.contains(&PermissionKey {
                where_,
                who,
                permission,
            })
        };
        holds(where_, who) || holds(where_, Address::ANY) || holds(Address::ANY, who)
    }

    /// Insert a grant. Returns `false` if it was already present.
    pub fn grant(
        &mut self,
        where_: Address,
        who: Address,
        permission: Permission,
    ) -> Result<bool, PermissionError> {
        if where_ == Address::ANY && who == Address::ANY {
            return Err(PermissionError::AnyAddressForWhereAndWho);
        }
        if permission == Permission::Root && (where_ == Address::ANY || who == Address::ANY) {
            return Err(PermissionError::AnyAddressDisallowed(permission));
        }
        Ok(self.grants.insert(PermissionKey {
            where_,
            who,
            permission,
        }))
    }

    /// Remove a grant. Returns `false` if it was not present.
    pub fn revoke(&mut self, where_: Address, who: Address, permission: Permission) -> bool {
        self.grants.remove(&PermissionKey {
            where_,
            who,
            permission,
        })
    }

    pub fn held_by(&self, who: Address) -> impl Iterator<Item = &PermissionKey> {
        self.grants.iter().filter(move |key| key.who == who)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PermissionKey> {
        self.grants.iter()
    }

    pub fn len(&self) -> usize {
        self.grants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }
}

impl Chain {
    pub fn permission_manager(&self, address: Address) -> Result<&PermissionManager, ChainError> {
        match self.account(address) {
            Some(Account::Dao(dao)) => Ok(&dao.permissions),
            Some(Account::PluginRepo(repo)) => Ok(&repo.permissions),
            Some(_) => Err(PermissionError::NotAPermissionManager(address).into()),
            None => Err(ChainError::AccountNotFound(address)),
        }
    }

    fn permission_manager_mut(
        &mut self,
        address: Address,
    ) -> Result<&mut PermissionManager, ChainError> {
        match self.account_mut(address) {
            Some(Account::Dao(dao)) => Ok(&mut dao.permissions),
            Some(Account::PluginRepo(repo)) => Ok(&mut repo.permissions),
            Some(_) => Err(PermissionError::NotAPermissionManager(address).into()),
            None => Err(ChainError::AccountNotFound(address)),
        }
    }

    /// `false` when `manager` is not a permission manager at all.
    pub fn has_permission(
        &self,
        manager: Address,
        where_: Address,
        who: Address,
        permission: Permission,
    ) -> bool {
        self.permission_manager(manager)
            .map(|pm| pm.is_granted(where_, who, permission))
            .unwrap_or(false)
    }

    /// Fail with `Unauthorized` unless `who` holds `permission` on `where_`
    /// in `manager`.
    pub(crate) fn auth(
        &self,
        manager: Address,
        where_: Address,
        who: Address,
        permission: Permission,
    ) -> Result<(), ChainError> {
        if self.has_permission(manager, where_, who, permission) {
            Ok(())
        } else {
            Err(PermissionError::Unauthorized {
                here: manager,
                where_,
                who,
                permission,
            }
            .into())
        }
    }

    pub fn grant(
        &mut self,
        sender: Address,
        manager: Address,
        where_: Address,
        who: Address,
        permission: Permission,
    ) -> Result<(), ChainError> {
        self.charge()?;
        self.auth(manager, manager, sender, Permission::Root)?;
        self.grant_unchecked(manager, where_, who, permission)
    }

    pub fn revoke(
        &mut self,
        sender: Address,
        manager: Address,
        where_: Address,
        who: Address,
        permission: Permission,
    ) -> Result<(), ChainError> {
        self.charge()?;
        self.auth(manager, manager, sender, Permission::Root)?;
        self.revoke_unchecked(manager, where_, who, permission)
    }

    /// Apply a list of grants and revokes under one `Root` check.
    pub fn apply_multi_target_permissions(
        &mut self,
        sender: Address,
        manager: Address,
        items: &[MultiTargetPermission],
    ) -> Result<(), ChainError> {
        self.charge()?;
        self.auth(manager, manager, sender, Permission::Root)?;
        for item in items {
            match item.operation {
                PermissionOperation::Grant => {
                    self.grant_unchecked(manager, item.where_, item.who, item.permission)?
                }
                PermissionOperation::Revoke => {
                    self.revoke_unchecked(manager, item.where_, item.who, item.permission)?
                }
            }
        }
        Ok(())
    }

    pub(crate) fn grant_unchecked(
        &mut self,
        manager: Address,
        where_: Address,
        who: Address,
        permission: Permission,
    ) -> Result<(), ChainError> {
        let changed = self
            .permission_manager_mut(manager)?
            .grant(where_, who, permission)?;
        if changed {
            info!(
                manager = %manager,
                where_ = %where_,
                who = %who,
                permission = %permission,
                "Permission granted"
            );
            self.log(
                manager,
                Event::Granted {
                    permission,
                    here: manager,
                    where_,
                    who,
                },
            );
        }
        Ok(())
    }

    pub(crate) fn revoke_unchecked(
        &mut self,
        manager: Address,
        where_: Address,
        who: Address,
        permission: Permission,
    ) -> Result<(), ChainError> {
        let changed = self
            .permission_manager_mut(manager)?
            .revoke(where_, who, permission);
        if changed {
            info!(
                manager = %manager,
                where_ = %where_,
                who = %who,
                permission = %permission,
                "Permission revoked"
            );
            self.log(
                manager,
                Event::Revoked {
                    permission,
                    here: manager,
                    where_,
                    who,
                },
            );
        }
        Ok(())
    }

    /// Grant `permission`, run `body`, then revoke it again on every exit
    /// path.
    ///
    /// A grant that already existed before the call is left in place. When
    /// both `body` and the revoke fail, the error from `body` is returned.
    #[allow(clippy::too_many_arguments)]
    pub fn with_temporary_grant<T, E>(
        &mut self,
        sender: Address,
        manager: Address,
        where_: Address,
        who: Address,
        permission: Permission,
        body: impl FnOnce(&mut Chain) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<ChainError>,
    {
        let already_held = self
            .permission_manager(manager)?
            .grants
            .contains(&PermissionKey {
                where_,
                who,
                permission,
            });
        if !already_held {
            self.grant(sender, manager, where_, who, permission)?;
        }

        let result = body(self);

        if already_held {
            return result;
        }
        let revoked = self.revoke(sender, manager, where_, who, permission);
        match (result, revoked) {
            (Err(err), _) => Err(err),
            (Ok(_), Err(err)) => Err(err.into()),
            (Ok(value), Ok(())) => Ok(value),
        }
    }

    /// Every standing grant held by `who`, across all permission managers.
    pub fn permissions_held_by(&self, who: Address) -> Vec<(Address, PermissionKey)> {
        self.accounts()
            .filter_map(|(address, account)| match account {
                Account::Dao(dao) => Some((*address, &dao.permissions)),
                Account::PluginRepo(repo) => Some((*address, &repo.permissions)),
                _ => None,
            })
            .flat_map(|(manager, pm)| pm.held_by(who).map(move |key| (manager, *key)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::ComponentKind;

    struct Fixture {
        chain: Chain,
        owner: Address,
        dao: Address,
    }

    fn fixture() -> Fixture {
        let mut chain = Chain::new();
        let owner = Address::named("owner");
        let dao = chain
            .transact(|c| {
                let base = c.deploy_implementation(owner, ComponentKind::Dao)?;
                c.create_dao(owner, base, "ipfs://dao", owner)
            })
            .unwrap();
        Fixture { chain, owner, dao }
    }

    #[test]
    fn wildcard_rules() {
        let mut pm = PermissionManager::new();
        let a = Address::named("a");
        assert_eq!(
            pm.grant(Address::ANY, Address::ANY, Permission::Execute),
            Err(PermissionError::AnyAddressForWhereAndWho)
        );
        assert_eq!(
            pm.grant(a, Address::ANY, Permission::Root),
            Err(PermissionError::AnyAddressDisallowed(Permission::Root))
        );
        assert_eq!(pm.grant(a, Address::ANY, Permission::Execute), Ok(true));
        assert!(pm.is_granted(a, Address::named("anyone"), Permission::Execute));
        assert!(!pm.is_granted(Address::named("b"), Address::named("anyone"), Permission::Execute));
    }

    #[test]
    fn grant_is_idempotent() {
        let mut pm = PermissionManager::new();
        let a = Address::named("a");
        assert_eq!(pm.grant(a, a, Permission::Execute), Ok(true));
        assert_eq!(pm.grant(a, a, Permission::Execute), Ok(false));
        assert!(pm.revoke(a, a, Permission::Execute));
        assert!(!pm.revoke(a, a, Permission::Execute));
    }

    #[test]
    fn grant_requires_root_on_manager() {
        let Fixture { mut chain, owner, dao } = fixture();
        let mallory = Address::named("mallory");
        let err = chain
            .transact(|c| c.grant(mallory, dao, dao, mallory, Permission::Execute))
            .unwrap_err();
        assert!(matches!(
            err,
            ChainError::Permission(PermissionError::Unauthorized { who, permission: Permission::Root, .. })
                if who == mallory
        ));

        chain
            .transact(|c| c.grant(owner, dao, dao, mallory, Permission::Execute))
            .unwrap();
        assert!(chain.has_permission(dao, dao, mallory, Permission::Execute));
    }

    #[test]
    fn events_only_on_change() {
        let Fixture { mut chain, owner, dao } = fixture();
        let bob = Address::named("bob");
        let before = chain.logs().len();
        chain
            .transact(|c| {
                c.grant(owner, dao, dao, bob, Permission::Execute)?;
                c.grant(owner, dao, dao, bob, Permission::Execute)
            })
            .unwrap();
        assert_eq!(chain.logs().len(), before + 1);
    }

    #[test]
    fn temporary_grant_is_revoked_on_success_and_failure() {
        let Fixture { mut chain, owner, dao } = fixture();
        let helper = Address::named("helper");

        chain
            .transact(|c| {
                c.with_temporary_grant(owner, dao, dao, helper, Permission::Execute, |c| {
                    assert!(c.has_permission(dao, dao, helper, Permission::Execute));
                    Ok::<_, ChainError>(())
                })
            })
            .unwrap();
        assert!(!chain.has_permission(dao, dao, helper, Permission::Execute));

        let result: Result<(), ChainError> = chain.transact(|c| {
            let inner: Result<(), ChainError> =
                c.with_temporary_grant(owner, dao, dao, helper, Permission::Execute, |_| {
                    Err(ChainError::AccountNotFound(Address::ZERO))
                });
            assert!(inner.is_err());
            assert!(!c.has_permission(dao, dao, helper, Permission::Execute));
            Ok(())
        });
        assert!(result.is_ok());
    }

    #[test]
    fn temporary_grant_keeps_existing_grant() {
        let Fixture { mut chain, owner, dao } = fixture();
        chain
            .transact(|c| {
                c.with_temporary_grant(owner, dao, dao, owner, Permission::Root, |_| {
                    Ok::<_, ChainError>(())
                })
            })
            .unwrap();
        assert!(chain.has_permission(dao, dao, owner, Permission::Root));
    }

    #[test]
    fn multi_target_permissions() {
        let Fixture { mut chain, owner, dao } = fixture();
        let a = Address::named("a");
        chain
            .transact(|c| {
                c.apply_multi_target_permissions(
                    owner,
                    dao,
                    &[
                        MultiTargetPermission::grant(dao, a, Permission::Execute),
                        MultiTargetPermission::grant(dao, a, Permission::SetMetadata),
                        MultiTargetPermission::revoke(dao, a, Permission::Execute),
                    ],
                )
            })
            .unwrap();
        assert!(!chain.has_permission(dao, dao, a, Permission::Execute));
        assert!(chain.has_permission(dao, dao, a, Permission::SetMetadata));
        assert_eq!(chain.permissions_held_by(a).len(), 1);
    }

    #[test]
    fn non_managers_hold_nothing() {
        let Fixture { mut chain, owner, .. } = fixture();
        let helper = chain
            .transact(|c| c.deploy_external(owner, "helper"))
            .unwrap();
        assert!(!chain.has_permission(helper, helper, owner, Permission::Root));
        assert_eq!(
            chain.permission_manager(helper).unwrap_err(),
            PermissionError::NotAPermissionManager(helper).into()
        );
    }

    mod temporary_grant_properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn grant_state_is_restored(
                index in 0usize..Permission::ALL.len(),
                held_before in any::<bool>(),
                body_fails in any::<bool>(),
            ) {
                let permission = Permission::ALL[index];
                let Fixture { mut chain, owner, dao } = fixture();
                let helper = Address::named("helper");
                if held_before {
                    chain
                        .transact(|c| c.grant(owner, dao, dao, helper, permission))
                        .unwrap();
                }

                chain
                    .transact(|c| {
                        let inner: Result<(), ChainError> =
                            c.with_temporary_grant(owner, dao, dao, helper, permission, |c| {
                                assert!(c.has_permission(dao, dao, helper, permission));
                                if body_fails {
                                    Err(ChainError::AccountNotFound(Address::ZERO))
                                } else {
                                    Ok(())
                                }
                            });
                        assert_eq!(inner.is_err(), body_fails);
                        Ok::<_, ChainError>(())
                    })
                    .unwrap();

                prop_assert_eq!(chain.has_permission(dao, dao, helper, permission), held_before);
                prop_assert_eq!(chain.permissions_held_by(helper).len(), held_before as usize);
            }
        }
    }
}
