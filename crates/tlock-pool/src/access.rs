//! Role grants of a pool.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tlock_core::error::PoolError;
use tlock_core::types::{AccountId, Role};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleTable {
    grants: BTreeSet<(Role, AccountId)>,
}

impl RoleTable {
    /// Table where `account` holds every role.
    pub fn with_owner(account: AccountId) -> Self {
        let mut table = Self::default();
        for role in [Role::Admin, Role::CurveAuthority, Role::RewardDistributor] {
            table.grants.insert((role, account));
        }
        table
    }

    pub fn has(&self, role: Role, account: &AccountId) -> bool {
        self.grants.contains(&(role, *account))
    }

    /// Fail with [`PoolError::NotAuthorized`] unless `account` holds `role`.
    pub fn require(&self, role: Role, account: &AccountId) -> Result<(), PoolError> {
        if self.has(role, account) {
            Ok(())
        } else {
            Err(PoolError::NotAuthorized {
                role,
                account: *account,
            })
        }
    }

    /// Returns whether the grant is new.
    pub fn grant(&mut self, role: Role, account: AccountId) -> bool {
        self.grants.insert((role, account))
    }

    /// Returns whether a grant was removed.
    pub fn revoke(&mut self, role: Role, account: &AccountId) -> bool {
        self.grants.remove(&(role, *account))
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Role, AccountId)> {
        self.grants.iter()
    }

    pub fn holders(&self, role: Role) -> impl Iterator<Item = &AccountId> {
        self.grants
            .iter()
            .filter(move |(r, _)| *r == role)
            .map(|(_, a)| a)
    }
}

impl FromIterator<(Role, AccountId)> for RoleTable {
    fn from_iter<I: IntoIterator<Item = (Role, AccountId)>>(iter: I) -> Self {
        Self {
            grants: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_holds_every_role() {
        let owner = AccountId::from_label("owner");
        let table = RoleTable::with_owner(owner);
        assert!(table.require(Role::Admin, &owner).is_ok());
        assert!(table.require(Role::CurveAuthority, &owner).is_ok());
        assert!(table.require(Role::RewardDistributor, &owner).is_ok());
    }

    #[test]
    fn stranger_is_not_authorized() {
        let table = RoleTable::with_owner(AccountId::from_label("owner"));
        let mallory = AccountId::from_label("mallory");
        assert_eq!(
            table.require(Role::CurveAuthority, &mallory),
            Err(PoolError::NotAuthorized {
                role: Role::CurveAuthority,
                account: mallory
            })
        );
    }

    #[test]
    fn grant_and_revoke() {
        let mut table = RoleTable::default();
        let bob = AccountId::from_label("bob");
        assert!(table.grant(Role::RewardDistributor, bob));
        assert!(!table.grant(Role::RewardDistributor, bob));
        assert_eq!(table.holders(Role::RewardDistributor).count(), 1);
        assert!(table.revoke(Role::RewardDistributor, &bob));
        assert!(!table.has(Role::RewardDistributor, &bob));
    }
}
