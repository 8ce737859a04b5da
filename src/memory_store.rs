//! In-process [`Storage`] backed by per-account row locks.
//!
//! Every write made through a [`MemoryTransaction`] is staged on the
//! transaction itself and only published by `commit`, while the row guards
//! are still held. Dropping the transaction discards the staged writes.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::debug;

use crate::domain::{
    Account, AccountId, AccountStore, AssetCategory, AuditLog, AuditRecord, EntryDraft, EntryId,
    EntryQuery, Error, LedgerEntry, LedgerSink, Page, Pool, SigninId, SigninRecord, SigninStore,
    SortOrder, Storage, Transaction,
};

/// Steps that can be made to fail on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    Begin,
    AdjustBalance,
    AppendEntry,
    RecordAudit,
    InsertSignin,
    Commit,
}

#[derive(Default)]
struct Shared {
    accounts: RwLock<BTreeMap<AccountId, Arc<Mutex<Account>>>>,
    entries: RwLock<Vec<LedgerEntry>>,
    audit: RwLock<Vec<AuditRecord>>,
    signins: RwLock<Vec<SigninRecord>>,
    next_entry_id: AtomicU64,
    next_signin_id: AtomicU64,
    fail_on: RwLock<HashSet<FailPoint>>,
}

impl Shared {
    async fn check(&self, point: FailPoint) -> Result<(), Error> {
        if self.fail_on.read().await.contains(&point) {
            return Err(Error::Persistence(format!("injected failure at {:?}", point)));
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an account. Registration itself happens elsewhere.
    pub async fn open_account(&self, account: Account) -> Result<(), Error> {
        if account.id.0 == 0 {
            return Err(Error::Validation("account id must be positive".to_string()));
        }
        let mut accounts = self.shared.accounts.write().await;
        if accounts.contains_key(&account.id) {
            return Err(Error::Validation(format!(
                "account {} already exists",
                account.id
            )));
        }
        accounts.insert(account.id, Arc::new(Mutex::new(account)));
        Ok(())
    }

    /// Committed accounts ordered by id.
    pub async fn accounts(&self) -> Vec<Account> {
        let rows: Vec<_> = self.shared.accounts.read().await.values().cloned().collect();
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(row.lock().await.clone());
        }
        out
    }

    /// Every committed entry in commit order.
    pub async fn all_entries(&self) -> Vec<LedgerEntry> {
        self.shared.entries.read().await.clone()
    }

    pub async fn audit_records(&self) -> Vec<AuditRecord> {
        self.shared.audit.read().await.clone()
    }

    pub async fn signins(&self) -> Vec<SigninRecord> {
        self.shared.signins.read().await.clone()
    }

    pub async fn set_fail_on(&self, point: FailPoint, fail: bool) {
        let mut fail_on = self.shared.fail_on.write().await;
        if fail {
            fail_on.insert(point);
        } else {
            fail_on.remove(&point);
        }
    }
}

#[async_trait]
impl Storage for MemoryStore {
    async fn begin(&self, accounts: &[AccountId]) -> Result<Box<dyn Transaction>, Error> {
        self.shared.check(FailPoint::Begin).await?;

        let mut ids = accounts.to_vec();
        ids.sort();
        ids.dedup();

        let mut rows = BTreeMap::new();
        for id in ids {
            let row = self.shared.accounts.read().await.get(&id).cloned();
            if let Some(row) = row {
                let guard = row.lock_owned().await;
                let staged = guard.clone();
                rows.insert(id, Row { guard, staged });
            }
        }

        Ok(Box::new(MemoryTransaction {
            shared: Arc::clone(&self.shared),
            rows,
            entries: Vec::new(),
            audit: Vec::new(),
            signins: Vec::new(),
        }))
    }

    async fn account(&self, id: AccountId) -> Result<Option<Account>, Error> {
        let row = self.shared.accounts.read().await.get(&id).cloned();
        match row {
            Some(row) => Ok(Some(row.lock().await.clone())),
            None => Ok(None),
        }
    }

    async fn entries(&self, query: &EntryQuery) -> Result<Page<LedgerEntry>, Error> {
        // The published log is in commit order. Ids are not: they are handed
        // out at append time, so transactions on disjoint rows can commit in
        // the opposite order to their ids.
        let mut matched: Vec<LedgerEntry> = self
            .shared
            .entries
            .read()
            .await
            .iter()
            .filter(|e| query.matches(e))
            .cloned()
            .collect();

        if query.order == SortOrder::Desc {
            matched.reverse();
        }

        let total = matched.len();
        let items = matched
            .into_iter()
            .skip(query.offset())
            .take(query.limit())
            .collect();

        Ok(Page {
            items,
            total,
            page: query.page(),
            page_size: query.limit(),
        })
    }
}

struct Row {
    guard: OwnedMutexGuard<Account>,
    staged: Account,
}

pub struct MemoryTransaction {
    shared: Arc<Shared>,
    rows: BTreeMap<AccountId, Row>,
    entries: Vec<LedgerEntry>,
    audit: Vec<AuditRecord>,
    signins: Vec<SigninRecord>,
}

impl MemoryTransaction {
    async fn unlocked(&self, id: AccountId) -> Error {
        if self.shared.accounts.read().await.contains_key(&id) {
            Error::Persistence(format!("account {} is not locked by this transaction", id))
        } else {
            Error::AccountNotFound(id)
        }
    }
}

#[async_trait]
impl AccountStore for MemoryTransaction {
    async fn get_account(&mut self, id: AccountId) -> Result<Option<Account>, Error> {
        if let Some(row) = self.rows.get(&id) {
            return Ok(Some(row.staged.clone()));
        }
        match self.unlocked(id).await {
            Error::AccountNotFound(_) => Ok(None),
            e => Err(e),
        }
    }

    async fn adjust_balance(
        &mut self,
        id: AccountId,
        category: AssetCategory,
        pool: Pool,
        delta: i64,
    ) -> Result<(), Error> {
        self.shared.check(FailPoint::AdjustBalance).await?;

        if !self.rows.contains_key(&id) {
            return Err(self.unlocked(id).await);
        }
        let Some(row) = self.rows.get_mut(&id) else {
            return Err(Error::AccountNotFound(id));
        };

        let balance = row.staged.balance_mut(category);
        match balance.apply(pool, delta) {
            Some(next) => {
                *balance = next;
                Ok(())
            }
            None if delta < 0 => Err(Error::InsufficientBalance {
                account: id,
                category,
                pool,
                requested: delta.unsigned_abs(),
                current: balance.get(pool),
            }),
            None => Err(Error::Validation(format!(
                "{} {} balance of account {} would overflow",
                category, pool, id
            ))),
        }
    }
}

#[async_trait]
impl LedgerSink for MemoryTransaction {
    async fn append(&mut self, entry: &EntryDraft) -> Result<EntryId, Error> {
        self.shared.check(FailPoint::AppendEntry).await?;

        let id = EntryId(self.shared.next_entry_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.entries.push(entry.clone().into_entry(id));
        Ok(id)
    }
}

#[async_trait]
impl AuditLog for MemoryTransaction {
    async fn record(&mut self, record: AuditRecord) -> Result<(), Error> {
        self.shared.check(FailPoint::RecordAudit).await?;
        self.audit.push(record);
        Ok(())
    }
}

#[async_trait]
impl SigninStore for MemoryTransaction {
    async fn count_signins(
        &mut self,
        account: AccountId,
        days: &[NaiveDate],
    ) -> Result<usize, Error> {
        let committed = self.shared.signins.read().await;
        let count = committed
            .iter()
            .chain(self.signins.iter())
            .filter(|s| s.account == account && days.contains(&s.day))
            .count();
        Ok(count)
    }

    async fn insert_signin(
        &mut self,
        account: AccountId,
        day: NaiveDate,
        reward: u64,
    ) -> Result<SigninId, Error> {
        self.shared.check(FailPoint::InsertSignin).await?;

        let exists = self
            .shared
            .signins
            .read()
            .await
            .iter()
            .chain(self.signins.iter())
            .any(|s| s.account == account && s.day == day);
        if exists {
            return Err(Error::AlreadyCheckedIn(account, day));
        }

        let id = SigninId(self.shared.next_signin_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.signins.push(SigninRecord {
            id,
            account,
            day,
            reward,
            created_at: Utc::now(),
        });
        Ok(id)
    }
}

#[async_trait]
impl Transaction for MemoryTransaction {
    async fn commit(self: Box<Self>) -> Result<(), Error> {
        self.shared.check(FailPoint::Commit).await?;

        let MemoryTransaction {
            shared,
            rows,
            entries,
            audit,
            signins,
        } = *self;

        // Rows stay locked until the log is published.
        let mut guards = Vec::with_capacity(rows.len());
        for (_, mut row) in rows {
            *row.guard = row.staged;
            guards.push(row.guard);
        }
        shared.entries.write().await.extend(entries);
        shared.audit.write().await.extend(audit);
        shared.signins.write().await.extend(signins);
        drop(guards);

        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), Error> {
        debug!(
            staged_entries = self.entries.len(),
            "rolling back memory transaction"
        );
        Ok(())
    }
}
