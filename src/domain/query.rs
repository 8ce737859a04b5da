use chrono::{DateTime, Utc};

use crate::domain::{AccountId, AssetCategory, LedgerEntry, OperationKind};

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Direction over commit sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Filters for listing the ledger log. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct EntryQuery {
    pub account: Option<AccountId>,
    pub counterparty: Option<AccountId>,
    pub category: Option<AssetCategory>,
    pub kind: Option<OperationKind>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub page: usize,
    pub limit: usize,
    pub order: SortOrder,
}

impl EntryQuery {
    pub fn for_account(account: AccountId) -> Self {
        Self {
            account: Some(account),
            ..Self::default()
        }
    }

    pub fn matches(&self, entry: &LedgerEntry) -> bool {
        self.account.is_none_or(|a| entry.account == a)
            && self.counterparty.is_none_or(|c| entry.counterparty == Some(c))
            && self.category.is_none_or(|c| entry.category == c)
            && self.kind.is_none_or(|k| entry.kind == k)
            && self.since.is_none_or(|t| entry.created_at >= t)
            && self.until.is_none_or(|t| entry.created_at <= t)
    }

    /// 1-based page number.
    pub fn page(&self) -> usize {
        self.page.max(1)
    }

    pub fn limit(&self) -> usize {
        if self.limit == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            self.limit
        }
    }

    pub fn offset(&self) -> usize {
        (self.page() - 1).saturating_mul(self.limit())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
}
