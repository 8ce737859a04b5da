use serde::Deserialize;

use crate::domain::{AssetCategory, Pool};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AccountId(pub u64);

impl core::fmt::Display for AccountId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Admin or controller identity acting on behalf of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OperatorId(u64);

impl OperatorId {
    /// Zero means "no operator"; nothing gets audited for it.
    pub fn new(id: u64) -> Option<Self> {
        (id > 0).then_some(Self(id))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl core::fmt::Display for OperatorId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Balance {
    pub available: u64, // spendable
    pub frozen: u64,    // held back, e.g. pending withdrawal
}

impl Balance {
    pub fn new(available: u64, frozen: u64) -> Self {
        Self { available, frozen }
    }

    pub fn get(&self, pool: Pool) -> u64 {
        match pool {
            Pool::Available => self.available,
            Pool::Frozen => self.frozen,
        }
    }

    /// Sum of both pools, `None` on overflow.
    pub fn total(&self) -> Option<u64> {
        self.available.checked_add(self.frozen)
    }

    /// Applies a signed delta to one pool. `None` if the pool would go
    /// negative or overflow.
    pub fn apply(&self, pool: Pool, delta: i64) -> Option<Self> {
        let current = self.get(pool);
        let next = current.checked_add_signed(delta)?;
        let mut out = *self;
        match pool {
            Pool::Available => out.available = next,
            Pool::Frozen => out.frozen = next,
        }
        Some(out)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    #[default]
    Enabled,
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    pub status: AccountStatus,
    pub score: Balance,  // points
    pub amount: Balance, // currency, minor units
}

impl Account {
    pub fn new(id: AccountId) -> Self {
        Self {
            id,
            status: AccountStatus::Enabled,
            score: Balance::default(),
            amount: Balance::default(),
        }
    }

    pub fn with_balance(mut self, category: AssetCategory, balance: Balance) -> Self {
        *self.balance_mut(category) = balance;
        self
    }

    pub fn balance(&self, category: AssetCategory) -> Balance {
        match category {
            AssetCategory::Score => self.score,
            AssetCategory::Amount => self.amount,
        }
    }

    pub fn balance_mut(&mut self, category: AssetCategory) -> &mut Balance {
        match category {
            AssetCategory::Score => &mut self.score,
            AssetCategory::Amount => &mut self.amount,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.status == AccountStatus::Enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_rejects_negative_and_overflow() {
        let b = Balance::new(10, 5);
        assert_eq!(b.apply(Pool::Available, -10), Some(Balance::new(0, 5)));
        assert_eq!(b.apply(Pool::Frozen, -6), None);
        assert_eq!(Balance::new(u64::MAX, 0).apply(Pool::Available, 1), None);
    }

    #[test]
    fn zero_operator_is_none() {
        assert!(OperatorId::new(0).is_none());
        assert_eq!(OperatorId::new(7).map(|o| o.get()), Some(7));
    }
}
