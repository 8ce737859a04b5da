//! Balance mutations with an exact-diff audit trail.
//!
//! Every operation runs as one storage transaction: the touched rows are
//! locked, re-read, mutated, and the matching ledger entries appended before
//! `commit`. Any failure drops the transaction, so balances and log never
//! diverge.

use tracing::{error, info, warn};

use crate::config::{AuditPolicy, Config};
use crate::domain::{
    Account, AccountId, Adjustment, AssetCategory, AuditRecord, Balance, EntryDraft, EntryQuery,
    Error, LedgerEntry, OperationKind, OperatorId, Page, Pool, Shift, Storage, Transaction,
    Transfer,
};

/// Both halves of a committed transfer.
#[derive(Debug, Clone)]
pub struct TransferReceipt {
    pub outgoing: LedgerEntry,
    pub incoming: LedgerEntry,
}

pub struct Ledger<S> {
    storage: S,
    config: Config,
}

impl<S: Storage> Ledger<S> {
    pub fn new(storage: S, config: Config) -> Self {
        Self { storage, config }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Increases the selected pool by `amount`.
    pub async fn charge(
        &self,
        req: &Adjustment,
        operator: Option<OperatorId>,
    ) -> Result<LedgerEntry, Error> {
        let delta = self.validate_adjustment(req)?;
        info!(
            account = %req.account,
            category = %req.category,
            pool = %req.pool,
            amount = req.amount,
            "charge user assets"
        );

        let mut tx = self.storage.begin(&[req.account]).await?;
        let result = self
            .adjust_in(tx.as_mut(), req, delta, OperationKind::Charge, operator)
            .await;
        match result {
            Ok(entry) => {
                commit(tx, "charge").await?;
                Ok(entry)
            }
            Err(e) => Err(abort(tx, "charge", e).await),
        }
    }

    /// Decreases the selected pool by `amount`; the pool must cover it.
    pub async fn deduct(
        &self,
        req: &Adjustment,
        operator: Option<OperatorId>,
    ) -> Result<LedgerEntry, Error> {
        let delta = self.validate_adjustment(req)?;
        info!(
            account = %req.account,
            category = %req.category,
            pool = %req.pool,
            amount = req.amount,
            "deduct user assets"
        );

        let mut tx = self.storage.begin(&[req.account]).await?;
        let result = self
            .adjust_in(tx.as_mut(), req, -delta, OperationKind::Deduct, operator)
            .await;
        match result {
            Ok(entry) => {
                commit(tx, "deduct").await?;
                Ok(entry)
            }
            Err(e) => Err(abort(tx, "deduct", e).await),
        }
    }

    /// Moves `amount` between the available and frozen pools of one account.
    pub async fn shift(
        &self,
        req: &Shift,
        operator: Option<OperatorId>,
    ) -> Result<LedgerEntry, Error> {
        validate_account(req.account)?;
        let delta = validate_amount(req.amount)?;
        self.validate_remark(&req.remark)?;
        info!(
            account = %req.account,
            category = %req.category,
            to = %req.direction.destination(),
            amount = req.amount,
            "shift user assets"
        );

        let mut tx = self.storage.begin(&[req.account]).await?;
        let result = self.shift_in(tx.as_mut(), req, delta, operator).await;
        match result {
            Ok(entry) => {
                commit(tx, "shift").await?;
                Ok(entry)
            }
            Err(e) => Err(abort(tx, "shift", e).await),
        }
    }

    /// Moves `amount` of one pool from `req.from` to the same pool of `req.to`.
    pub async fn transfer(
        &self,
        req: &Transfer,
        operator: Option<OperatorId>,
    ) -> Result<TransferReceipt, Error> {
        validate_account(req.from)?;
        validate_account(req.to)?;
        if req.from == req.to {
            return Err(Error::Validation(
                "cannot transfer to the same account".to_string(),
            ));
        }
        let delta = validate_amount(req.amount)?;
        self.validate_remark(&req.remark)?;
        info!(
            from = %req.from,
            to = %req.to,
            category = %req.category,
            pool = %req.pool,
            amount = req.amount,
            "transfer user assets"
        );

        let mut tx = self.storage.begin(&[req.from, req.to]).await?;
        let result = self.transfer_in(tx.as_mut(), req, delta, operator).await;
        match result {
            Ok(receipt) => {
                commit(tx, "transfer").await?;
                Ok(receipt)
            }
            Err(e) => Err(abort(tx, "transfer", e).await),
        }
    }

    /// Last committed balance of one category.
    pub async fn balance(
        &self,
        account: AccountId,
        category: AssetCategory,
    ) -> Result<Balance, Error> {
        self.storage
            .account(account)
            .await?
            .map(|a| a.balance(category))
            .ok_or(Error::AccountNotFound(account))
    }

    pub async fn entries(&self, query: &EntryQuery) -> Result<Page<LedgerEntry>, Error> {
        self.storage.entries(query).await
    }

    async fn adjust_in(
        &self,
        tx: &mut dyn Transaction,
        req: &Adjustment,
        delta: i64,
        kind: OperationKind,
        operator: Option<OperatorId>,
    ) -> Result<LedgerEntry, Error> {
        let before = load(tx, req.account).await?.balance(req.category);
        let after = plan(req.account, req.category, before, req.pool, delta)?;

        tx.adjust_balance(req.account, req.category, req.pool, delta)
            .await?;
        let entry = append(
            tx,
            EntryDraft::between(req.account, req.category, kind, before, after)
                .counterparty(req.counterparty)
                .remark(req.remark.as_str()),
        )
        .await?;

        self.audit(
            tx,
            operator,
            "update user assets",
            format!("update user assets [{}]", kind),
            req.account.0,
        )
        .await?;

        Ok(entry)
    }

    async fn shift_in(
        &self,
        tx: &mut dyn Transaction,
        req: &Shift,
        delta: i64,
        operator: Option<OperatorId>,
    ) -> Result<LedgerEntry, Error> {
        let source = req.direction.source();
        let destination = req.direction.destination();

        let before = load(tx, req.account).await?.balance(req.category);
        let drained = plan(req.account, req.category, before, source, -delta)?;
        let after = plan(req.account, req.category, drained, destination, delta)?;

        tx.adjust_balance(req.account, req.category, source, -delta)
            .await?;
        tx.adjust_balance(req.account, req.category, destination, delta)
            .await?;
        let entry = append(
            tx,
            EntryDraft::between(
                req.account,
                req.category,
                OperationKind::Shift,
                before,
                after,
            )
            .remark(req.remark.as_str()),
        )
        .await?;

        self.audit(
            tx,
            operator,
            "update user assets",
            format!("update user assets [{}]", OperationKind::Shift),
            req.account.0,
        )
        .await?;

        Ok(entry)
    }

    async fn transfer_in(
        &self,
        tx: &mut dyn Transaction,
        req: &Transfer,
        delta: i64,
        operator: Option<OperatorId>,
    ) -> Result<TransferReceipt, Error> {
        let source_before = load(tx, req.from).await?.balance(req.category);
        let dest_before = load(tx, req.to).await?.balance(req.category);
        let source_after = plan(req.from, req.category, source_before, req.pool, -delta)?;
        let dest_after = plan(req.to, req.category, dest_before, req.pool, delta)?;

        tx.adjust_balance(req.from, req.category, req.pool, -delta)
            .await?;
        tx.adjust_balance(req.to, req.category, req.pool, delta)
            .await?;

        let outgoing = append(
            tx,
            EntryDraft::between(
                req.from,
                req.category,
                OperationKind::TransferOut,
                source_before,
                source_after,
            )
            .counterparty(Some(req.to))
            .remark(req.remark.as_str()),
        )
        .await?;
        let incoming = append(
            tx,
            EntryDraft::between(
                req.to,
                req.category,
                OperationKind::TransferIn,
                dest_before,
                dest_after,
            )
            .counterparty(Some(req.from))
            .remark(req.remark.as_str()),
        )
        .await?;

        self.audit(
            tx,
            operator,
            "transfer user assets",
            format!("transfer user assets, from: {}, to: {}", req.from, req.to),
            req.from.0,
        )
        .await?;

        Ok(TransferReceipt { outgoing, incoming })
    }

    /// Writes the operator audit record, if there is an operator. A failed
    /// write aborts the unit only under `AuditPolicy::FailClosed`.
    pub(crate) async fn audit(
        &self,
        tx: &mut dyn Transaction,
        operator: Option<OperatorId>,
        action: &str,
        content: String,
        subject: u64,
    ) -> Result<(), Error> {
        let Some(operator) = operator else {
            return Ok(());
        };

        match tx
            .record(AuditRecord::new(operator, action, content, subject))
            .await
        {
            Ok(()) => Ok(()),
            Err(e) => match self.config.ledger.audit_policy {
                AuditPolicy::FailClosed => Err(e),
                AuditPolicy::BestEffort => {
                    warn!(%operator, subject, error = %e, "audit record dropped");
                    Ok(())
                }
            },
        }
    }

    fn validate_adjustment(&self, req: &Adjustment) -> Result<i64, Error> {
        validate_account(req.account)?;
        if req.counterparty.is_some_and(|c| c.0 == 0) {
            return Err(Error::Validation("counterparty id must be positive".to_string()));
        }
        self.validate_remark(&req.remark)?;
        validate_amount(req.amount)
    }

    pub(crate) fn validate_remark(&self, remark: &str) -> Result<(), Error> {
        let max = self.config.ledger.remark_max_len;
        if remark.chars().count() > max {
            return Err(Error::Validation(format!(
                "remark longer than {} characters",
                max
            )));
        }
        Ok(())
    }
}

pub(crate) fn validate_account(id: AccountId) -> Result<(), Error> {
    if id.0 == 0 {
        return Err(Error::Validation("account id must be positive".to_string()));
    }
    Ok(())
}

/// Amounts must be positive and usable as a signed delta.
pub(crate) fn validate_amount(amount: u64) -> Result<i64, Error> {
    match i64::try_from(amount) {
        Ok(delta) if delta > 0 => Ok(delta),
        Ok(_) => Err(Error::Validation(
            "amount must be a positive integer".to_string(),
        )),
        Err(_) => Err(Error::Validation(format!("amount {} is too large", amount))),
    }
}

pub(crate) async fn load(tx: &mut dyn Transaction, id: AccountId) -> Result<Account, Error> {
    tx.get_account(id)
        .await?
        .ok_or(Error::AccountNotFound(id))
}

/// Balance after applying `delta` to `pool`, or the reason it can't be.
pub(crate) fn plan(
    account: AccountId,
    category: AssetCategory,
    before: Balance,
    pool: Pool,
    delta: i64,
) -> Result<Balance, Error> {
    match before.apply(pool, delta) {
        Some(after) => Ok(after),
        None if delta < 0 => Err(Error::InsufficientBalance {
            account,
            category,
            pool,
            requested: delta.unsigned_abs(),
            current: before.get(pool),
        }),
        None => Err(Error::Validation(format!(
            "{} {} balance of account {} would overflow",
            category, pool, account
        ))),
    }
}

pub(crate) async fn append(
    tx: &mut dyn Transaction,
    draft: EntryDraft,
) -> Result<LedgerEntry, Error> {
    let id = tx.append(&draft).await?;
    Ok(draft.into_entry(id))
}

pub(crate) async fn commit(tx: Box<dyn Transaction>, op: &'static str) -> Result<(), Error> {
    tx.commit().await.inspect_err(|e| {
        error!(op, error = %e, "commit failed, user assets unchanged");
    })
}

/// Rolls the unit back and hands the original error back to the caller.
pub(crate) async fn abort(tx: Box<dyn Transaction>, op: &'static str, cause: Error) -> Error {
    if cause.is_persistence() {
        error!(op, error = %cause, "user assets exception, rolling back");
    } else {
        warn!(op, error = %cause, "user assets rejected");
    }
    if let Err(e) = tx.rollback().await {
        warn!(op, error = %e, "rollback reported an error");
    }
    cause
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerConfig;
    use crate::domain::{EntryId, ShiftDirection};
    use crate::memory_store::{FailPoint, MemoryStore};

    const A: AccountId = AccountId(1);
    const B: AccountId = AccountId(2);

    async fn ledger_with(config: Config, accounts: &[(AccountId, Balance)]) -> Ledger<MemoryStore> {
        let store = MemoryStore::new();
        for (id, balance) in accounts {
            store
                .open_account(Account::new(*id).with_balance(AssetCategory::Score, *balance))
                .await
                .unwrap();
        }
        Ledger::new(store, config)
    }

    async fn ledger(accounts: &[(AccountId, Balance)]) -> Ledger<MemoryStore> {
        ledger_with(Config::default(), accounts).await
    }

    fn score(account: AccountId, pool: Pool, amount: u64) -> Adjustment {
        Adjustment::new(account, AssetCategory::Score, pool, amount)
    }

    #[tokio::test]
    async fn charge_credits_selected_pool_and_logs_it() {
        let ledger = ledger(&[(A, Balance::new(10, 3))]).await;

        let entry = ledger
            .charge(&score(A, Pool::Frozen, 7).remark("promo"), None)
            .await
            .unwrap();

        assert_eq!(entry.id, EntryId(1));
        assert_eq!(entry.kind, OperationKind::Charge);
        assert_eq!(entry.before(), Balance::new(10, 3));
        assert_eq!(entry.after(), Balance::new(10, 10));
        assert_eq!(entry.available_delta, 0);
        assert_eq!(entry.frozen_delta, 7);
        assert_eq!(entry.remark, "promo");
        assert_eq!(
            ledger.balance(A, AssetCategory::Score).await.unwrap(),
            Balance::new(10, 10)
        );
    }

    #[tokio::test]
    async fn charge_unknown_account_fails() {
        let ledger = ledger(&[]).await;
        let err = ledger
            .charge(&score(A, Pool::Available, 1), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AccountNotFound(A)));
        assert!(ledger.storage().all_entries().await.is_empty());
    }

    #[tokio::test]
    async fn invalid_input_is_rejected_before_storage() {
        let ledger = ledger(&[(A, Balance::new(10, 0))]).await;
        ledger.storage().set_fail_on(FailPoint::Begin, true).await;

        for req in [
            score(A, Pool::Available, 0),
            score(AccountId(0), Pool::Available, 1),
            score(A, Pool::Available, u64::MAX),
            score(A, Pool::Available, 1).remark("x".repeat(251)),
        ] {
            let err = ledger.charge(&req, None).await.unwrap_err();
            assert!(matches!(err, Error::Validation(_)), "{:?}", err);
        }
    }

    #[tokio::test]
    async fn deduct_more_than_pool_changes_nothing() {
        let ledger = ledger(&[(A, Balance::new(50, 100))]).await;

        let err = ledger
            .deduct(&score(A, Pool::Available, 51), None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::InsufficientBalance {
                requested: 51,
                current: 50,
                ..
            }
        ));
        assert_eq!(
            ledger.balance(A, AssetCategory::Score).await.unwrap(),
            Balance::new(50, 100)
        );
        assert!(ledger.storage().all_entries().await.is_empty());
    }

    #[tokio::test]
    async fn deduct_records_negative_delta() {
        let ledger = ledger(&[(A, Balance::new(50, 0))]).await;

        let entry = ledger
            .deduct(&score(A, Pool::Available, 20), None)
            .await
            .unwrap();

        assert_eq!(entry.kind, OperationKind::Deduct);
        assert_eq!(entry.available_delta, -20);
        assert_eq!(entry.after(), Balance::new(30, 0));
        assert!(entry.is_consistent());
    }

    #[tokio::test]
    async fn shift_available_to_frozen() {
        let ledger = ledger(&[(A, Balance::new(50, 0))]).await;

        let entry = ledger
            .shift(
                &Shift::new(A, AssetCategory::Score, ShiftDirection::ToFrozen, 50),
                None,
            )
            .await
            .unwrap();

        assert_eq!(entry.kind, OperationKind::Shift);
        assert_eq!(entry.available_delta, -50);
        assert_eq!(entry.frozen_delta, 50);
        assert_eq!(
            ledger.balance(A, AssetCategory::Score).await.unwrap(),
            Balance::new(0, 50)
        );
    }

    #[tokio::test]
    async fn shift_needs_source_balance() {
        let ledger = ledger(&[(A, Balance::new(500, 10))]).await;

        let err = ledger
            .shift(
                &Shift::new(A, AssetCategory::Score, ShiftDirection::ToAvailable, 11),
                None,
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::InsufficientBalance {
                pool: Pool::Frozen,
                ..
            }
        ));
        assert_eq!(
            ledger.balance(A, AssetCategory::Score).await.unwrap(),
            Balance::new(500, 10)
        );
    }

    #[tokio::test]
    async fn transfer_books_paired_entries() {
        let ledger = ledger(&[(A, Balance::new(150, 0)), (B, Balance::new(5, 0))]).await;

        let receipt = ledger
            .transfer(
                &Transfer::new(A, B, AssetCategory::Score, Pool::Available, 100),
                None,
            )
            .await
            .unwrap();

        assert_eq!(receipt.outgoing.account, A);
        assert_eq!(receipt.outgoing.counterparty, Some(B));
        assert_eq!(receipt.outgoing.kind, OperationKind::TransferOut);
        assert_eq!(receipt.outgoing.available_delta, -100);
        assert_eq!(receipt.incoming.account, B);
        assert_eq!(receipt.incoming.counterparty, Some(A));
        assert_eq!(receipt.incoming.kind, OperationKind::TransferIn);
        assert_eq!(receipt.incoming.available_delta, 100);

        assert_eq!(
            ledger.balance(A, AssetCategory::Score).await.unwrap(),
            Balance::new(50, 0)
        );
        assert_eq!(
            ledger.balance(B, AssetCategory::Score).await.unwrap(),
            Balance::new(105, 0)
        );
        assert_eq!(ledger.storage().all_entries().await.len(), 2);
    }

    #[tokio::test]
    async fn transfer_checks_both_accounts() {
        let ledger = ledger(&[(A, Balance::new(150, 0))]).await;

        let err = ledger
            .transfer(
                &Transfer::new(A, B, AssetCategory::Score, Pool::Available, 1),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AccountNotFound(B)));

        let err = ledger
            .transfer(
                &Transfer::new(A, A, AssetCategory::Score, Pool::Available, 1),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(
            ledger.balance(A, AssetCategory::Score).await.unwrap(),
            Balance::new(150, 0)
        );
    }

    #[tokio::test]
    async fn failed_append_rolls_back_whole_transfer() {
        let ledger = ledger(&[(A, Balance::new(150, 0)), (B, Balance::new(0, 0))]).await;
        ledger.storage().set_fail_on(FailPoint::AppendEntry, true).await;

        let err = ledger
            .transfer(
                &Transfer::new(A, B, AssetCategory::Score, Pool::Available, 100),
                None,
            )
            .await
            .unwrap_err();

        assert!(err.is_persistence());
        assert_eq!(
            ledger.balance(A, AssetCategory::Score).await.unwrap(),
            Balance::new(150, 0)
        );
        assert_eq!(
            ledger.balance(B, AssetCategory::Score).await.unwrap(),
            Balance::new(0, 0)
        );
        assert!(ledger.storage().all_entries().await.is_empty());
    }

    #[tokio::test]
    async fn operator_actions_are_audited() {
        let ledger = ledger(&[(A, Balance::new(0, 0))]).await;

        ledger
            .charge(&score(A, Pool::Available, 5), OperatorId::new(9))
            .await
            .unwrap();
        ledger
            .charge(&score(A, Pool::Available, 5), OperatorId::new(0))
            .await
            .unwrap();

        let audit = ledger.storage().audit_records().await;
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].operator.get(), 9);
        assert_eq!(audit[0].subject, 1);
        assert_eq!(audit[0].module, "ucenter");
    }

    #[tokio::test]
    async fn audit_failure_is_fatal_when_fail_closed() {
        let ledger = ledger(&[(A, Balance::new(0, 0))]).await;
        ledger.storage().set_fail_on(FailPoint::RecordAudit, true).await;

        let err = ledger
            .charge(&score(A, Pool::Available, 5), OperatorId::new(9))
            .await
            .unwrap_err();

        assert!(err.is_persistence());
        assert_eq!(
            ledger.balance(A, AssetCategory::Score).await.unwrap(),
            Balance::new(0, 0)
        );
        assert!(ledger.storage().all_entries().await.is_empty());
    }

    #[tokio::test]
    async fn audit_failure_is_tolerated_when_best_effort() {
        let config = Config {
            ledger: LedgerConfig {
                audit_policy: AuditPolicy::BestEffort,
                ..LedgerConfig::default()
            },
            ..Config::default()
        };
        let ledger = ledger_with(config, &[(A, Balance::new(0, 0))]).await;
        ledger.storage().set_fail_on(FailPoint::RecordAudit, true).await;

        ledger
            .charge(&score(A, Pool::Available, 5), OperatorId::new(9))
            .await
            .unwrap();

        assert_eq!(
            ledger.balance(A, AssetCategory::Score).await.unwrap(),
            Balance::new(5, 0)
        );
        assert!(ledger.storage().audit_records().await.is_empty());
        assert_eq!(ledger.storage().all_entries().await.len(), 1);
    }

    #[tokio::test]
    async fn entries_chain_before_and_after() {
        let ledger = ledger(&[(A, Balance::new(100, 0))]).await;

        ledger
            .charge(&score(A, Pool::Available, 30), None)
            .await
            .unwrap();
        ledger
            .shift(
                &Shift::new(A, AssetCategory::Score, ShiftDirection::ToFrozen, 60),
                None,
            )
            .await
            .unwrap();
        ledger
            .deduct(&score(A, Pool::Frozen, 10), None)
            .await
            .unwrap();

        let entries = ledger.storage().all_entries().await;
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].before(), Balance::new(100, 0));
        for pair in entries.windows(2) {
            assert_eq!(pair[0].after(), pair[1].before());
        }
        assert_eq!(entries[2].after(), Balance::new(70, 50));
    }
}
