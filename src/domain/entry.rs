use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::domain::{AccountId, AssetCategory, Balance, OperatorId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SigninId(pub u64);

/// What produced a ledger entry. A transfer is booked as a pair of entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationKind {
    Charge,
    Deduct,
    Shift,
    TransferOut,
    TransferIn,
    Signin,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Charge => "charge",
            OperationKind::Deduct => "deduct",
            OperationKind::Shift => "shift",
            OperationKind::TransferOut => "transfer-out",
            OperationKind::TransferIn => "transfer-in",
            OperationKind::Signin => "signin",
        }
    }
}

impl core::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A ledger entry before the sink has assigned it an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryDraft {
    pub account: AccountId,
    pub counterparty: Option<AccountId>,
    pub category: AssetCategory,
    pub kind: OperationKind,
    pub remark: String,
    pub source: Option<u64>,
    pub available_before: u64,
    pub available_delta: i64,
    pub available_after: u64,
    pub frozen_before: u64,
    pub frozen_delta: i64,
    pub frozen_after: u64,
    pub created_at: DateTime<Utc>,
}

impl EntryDraft {
    /// Builds the before/delta/after triple for both pools from two
    /// snapshots of the same account and category.
    pub fn between(
        account: AccountId,
        category: AssetCategory,
        kind: OperationKind,
        before: Balance,
        after: Balance,
    ) -> Self {
        Self {
            account,
            counterparty: None,
            category,
            kind,
            remark: String::new(),
            source: None,
            available_before: before.available,
            available_delta: signed_diff(before.available, after.available),
            available_after: after.available,
            frozen_before: before.frozen,
            frozen_delta: signed_diff(before.frozen, after.frozen),
            frozen_after: after.frozen,
            created_at: Utc::now(),
        }
    }

    pub fn counterparty(mut self, counterparty: Option<AccountId>) -> Self {
        self.counterparty = counterparty;
        self
    }

    pub fn remark(mut self, remark: impl Into<String>) -> Self {
        self.remark = remark.into();
        self
    }

    pub fn source(mut self, source: Option<u64>) -> Self {
        self.source = source;
        self
    }

    pub fn into_entry(self, id: EntryId) -> LedgerEntry {
        LedgerEntry { id, draft: self }
    }
}

// Deltas are bounded by validated amounts, which fit in i64.
fn signed_diff(before: u64, after: u64) -> i64 {
    if after >= before {
        (after - before) as i64
    } else {
        -((before - after) as i64)
    }
}

/// Immutable record of one committed balance mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub id: EntryId,
    draft: EntryDraft,
}

impl core::ops::Deref for LedgerEntry {
    type Target = EntryDraft;

    fn deref(&self) -> &Self::Target {
        &self.draft
    }
}

impl LedgerEntry {
    pub fn before(&self) -> Balance {
        Balance::new(self.available_before, self.frozen_before)
    }

    pub fn after(&self) -> Balance {
        Balance::new(self.available_after, self.frozen_after)
    }

    /// `after == before + delta` on both pools.
    pub fn is_consistent(&self) -> bool {
        self.available_before.checked_add_signed(self.available_delta)
            == Some(self.available_after)
            && self.frozen_before.checked_add_signed(self.frozen_delta) == Some(self.frozen_after)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRecord {
    pub operator: OperatorId,
    pub module: &'static str,
    pub action: String,
    pub content: String,
    pub subject: u64,
    pub created_at: DateTime<Utc>,
}

impl AuditRecord {
    pub fn new(
        operator: OperatorId,
        action: impl Into<String>,
        content: impl Into<String>,
        subject: u64,
    ) -> Self {
        Self {
            operator,
            module: "ucenter",
            action: action.into(),
            content: content.into(),
            subject,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigninRecord {
    pub id: SigninId,
    pub account: AccountId,
    pub day: NaiveDate,
    pub reward: u64,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_records_signed_deltas() {
        let draft = EntryDraft::between(
            AccountId(1),
            AssetCategory::Score,
            OperationKind::Shift,
            Balance::new(50, 0),
            Balance::new(0, 50),
        );
        assert_eq!(draft.available_delta, -50);
        assert_eq!(draft.frozen_delta, 50);

        let entry = draft.into_entry(EntryId(1));
        assert!(entry.is_consistent());
        assert_eq!(entry.before(), Balance::new(50, 0));
        assert_eq!(entry.after(), Balance::new(0, 50));
    }

    #[test]
    fn kind_renders_kebab_case() {
        assert_eq!(OperationKind::TransferOut.to_string(), "transfer-out");
        assert_eq!(OperationKind::Signin.as_str(), "signin");
    }
}
