//! Identity and system registry.

use sharecenter_store::{CenterStore, GroupRecord, SystemRecord, UserRecord};
use sharecenter_types::{Address, CenterError, CenterEvent, GroupId};

use crate::center::{Receipt, ShareCenter};
use crate::ledger::LedgerView;

impl<S: CenterStore> ShareCenter<S> {
    /// Authorize `system` as a caller. Only the registry owner may do this.
    ///
    /// Returns `false` without raising an event if the system was already
    /// added.
    pub fn add_system(&self, caller: &Address, system: Address) -> Result<Receipt<bool>, CenterError> {
        self.mutate("add_system", |txn| {
            if caller != txn.owner() {
                return Err(CenterError::NotOwner(caller.clone()));
            }
            if txn.system(&system).is_some_and(|s| s.active) {
                return Ok(false);
            }
            txn.put_system(SystemRecord {
                address: system.clone(),
                active: true,
                added_at: txn.now,
            });
            txn.emit(CenterEvent::SystemAdded { system });
            Ok(true)
        })
    }

    /// Register `user` under `system` and create the user's personal group.
    pub fn create_user(&self, system: &Address, user: Address) -> Result<Receipt<GroupId>, CenterError> {
        self.mutate("create_user", |txn| {
            if !txn.system(system).is_some_and(|s| s.active) {
                return Err(CenterError::NotARegisteredSystem(system.clone()));
            }
            if txn.user(&user).is_some() {
                return Err(CenterError::UserAlreadyExists(user));
            }
            let group = txn.alloc_group_id();
            txn.put_group(GroupRecord::new(group, user.clone(), true, txn.now));
            txn.put_user(UserRecord::new(user.clone(), system.clone(), group, txn.now));
            txn.emit(CenterEvent::UserCreated {
                user: user.clone(),
                system: system.clone(),
                personal_group: group,
            });
            txn.emit(CenterEvent::GroupCreated { group, owner: user });
            Ok(group)
        })
    }

    pub fn is_added_system(&self, address: &Address) -> bool {
        self.snapshot()
            .systems
            .get(address)
            .is_some_and(|s| s.active)
    }

    pub fn get_personal_group_id(&self, address: &Address) -> Result<GroupId, CenterError> {
        Ok(self.snapshot().require_user(address)?.personal_group)
    }

    pub fn owner(&self) -> Address {
        self.snapshot().owner().clone()
    }

    pub fn get_user(&self, address: &Address) -> Result<UserRecord, CenterError> {
        self.snapshot().require_user(address).cloned()
    }

    /// All added systems, ordered by address.
    pub fn systems(&self) -> Vec<SystemRecord> {
        self.snapshot().systems.values().cloned().collect()
    }
}
