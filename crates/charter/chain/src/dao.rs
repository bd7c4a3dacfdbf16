use charter_types::{Address, Permission};
use tracing::info;

use crate::account::{Account, ComponentKind};
use crate::call::{Action, CallOutput};
use crate::chain::Chain;
use crate::error::ChainError;
use crate::event::Event;
use crate::permission::PermissionManager;

/// A DAO: a permission manager that executes action batches on behalf of
/// whoever holds `Execute` on it.
#[derive(Clone, Debug)]
pub struct Dao {
    pub implementation: Address,
    pub metadata_uri: String,
    pub permissions: PermissionManager,
}

impl Chain {
    /// Create a DAO proxy; `initial_owner` receives `Root` on it.
    pub fn create_dao(
        &mut self,
        deployer: Address,
        implementation: Address,
        metadata_uri: impl Into<String>,
        initial_owner: Address,
    ) -> Result<Address, ChainError> {
        self.require_implementation(implementation, ComponentKind::Dao)?;
        let metadata_uri = metadata_uri.into();
        let dao = self.create(
            deployer,
            Account::Dao(Dao {
                implementation,
                metadata_uri: metadata_uri.clone(),
                permissions: PermissionManager::new(),
            }),
        )?;
        self.grant_unchecked(dao, dao, initial_owner, Permission::Root)?;
        self.log(dao, Event::MetadataSet { metadata_uri });
        info!(dao = %dao, owner = %initial_owner, "DAO created");
        Ok(dao)
    }

    /// Run `actions` with the DAO as sender. Any failing action fails the
    /// whole call.
    pub fn execute(
        &mut self,
        sender: Address,
        dao: Address,
        call_id: u64,
        actions: Vec<Action>,
    ) -> Result<Vec<CallOutput>, ChainError> {
        self.charge()?;
        self.dao(dao)?;
        self.auth(dao, dao, sender, Permission::Execute)?;

        let max = self.config().max_actions;
        if actions.len() > max {
            return Err(ChainError::TooManyActions {
                count: actions.len(),
                max,
            });
        }

        let action_count = actions.len();
        let mut outputs = Vec::with_capacity(action_count);
        for action in actions {
            outputs.push(self.call(dao, action.to, action.call)?);
        }

        self.log(
            dao,
            Event::Executed {
                actor: sender,
                call_id,
                action_count,
            },
        );
        Ok(outputs)
    }

    pub fn set_metadata(
        &mut self,
        sender: Address,
        dao: Address,
        metadata_uri: String,
    ) -> Result<(), ChainError> {
        self.charge()?;
        self.auth(dao, dao, sender, Permission::SetMetadata)?;
        self.dao_mut(dao)?.metadata_uri = metadata_uri.clone();
        self.log(dao, Event::MetadataSet { metadata_uri });
        Ok(())
    }
}
