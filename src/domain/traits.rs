use async_trait::async_trait;
use chrono::NaiveDate;
use futures::Stream;

use crate::domain::{
    Account, AccountId, AssetCategory, AuditRecord, EntryDraft, EntryId, EntryQuery, Error,
    LedgerEntry, Page, Pool, Request, SigninId,
};

pub trait RequestStream {
    type ReqStream: Stream<Item = Result<Request, Error>> + Send + Unpin + 'static;
    fn stream(&mut self) -> Self::ReqStream;
}

pub trait DeadLetterQueue {
    fn report(&self, request: Option<&Request>, error: &Error);
}

/// Current balances, read and written inside an open transaction.
#[async_trait]
pub trait AccountStore: Send {
    async fn get_account(&mut self, id: AccountId) -> Result<Option<Account>, Error>;

    async fn adjust_balance(
        &mut self,
        id: AccountId,
        category: AssetCategory,
        pool: Pool,
        delta: i64,
    ) -> Result<(), Error>;
}

/// Append-only ledger log.
#[async_trait]
pub trait LedgerSink: Send {
    /// Ids are unique and increase per account; across accounts they need not
    /// follow commit order.
    async fn append(&mut self, entry: &EntryDraft) -> Result<EntryId, Error>;
}

/// Operator action log.
#[async_trait]
pub trait AuditLog: Send {
    async fn record(&mut self, record: AuditRecord) -> Result<(), Error>;
}

/// Daily check-in records.
#[async_trait]
pub trait SigninStore: Send {
    async fn count_signins(
        &mut self,
        account: AccountId,
        days: &[NaiveDate],
    ) -> Result<usize, Error>;

    /// Fails with `AlreadyCheckedIn` when `(account, day)` exists.
    async fn insert_signin(
        &mut self,
        account: AccountId,
        day: NaiveDate,
        reward: u64,
    ) -> Result<SigninId, Error>;
}

/// One atomic unit. Dropping it without `commit` discards every write.
#[async_trait]
pub trait Transaction: AccountStore + LedgerSink + AuditLog + SigninStore {
    async fn commit(self: Box<Self>) -> Result<(), Error>;
    async fn rollback(self: Box<Self>) -> Result<(), Error>;
}

#[async_trait]
pub trait Storage: Send + Sync {
    /// Opens a transaction holding exclusive access to `accounts`. Rows are
    /// acquired in ascending id order whatever the order given.
    async fn begin(&self, accounts: &[AccountId]) -> Result<Box<dyn Transaction>, Error>;

    /// Last committed state of an account.
    async fn account(&self, id: AccountId) -> Result<Option<Account>, Error>;

    /// Committed entries matching `query`, ordered by commit sequence.
    async fn entries(&self, query: &EntryQuery) -> Result<Page<LedgerEntry>, Error>;
}
