use std::io::Write;

use serde::Serialize;

use crate::domain::{Account, AssetCategory, Error, LedgerEntry, OperationKind};

#[derive(Serialize)]
struct BalanceRow {
    account: u64,
    score: u64,
    freeze_score: u64,
    amount: u64,
    freeze_amount: u64,
}

#[derive(Serialize)]
struct EntryRow<'a> {
    id: u64,
    account: u64,
    counterparty: u64,
    category: AssetCategory,
    kind: OperationKind,
    source: u64,
    available_before: u64,
    available_delta: i64,
    available_after: u64,
    frozen_before: u64,
    frozen_delta: i64,
    frozen_after: u64,
    created_at: String,
    remark: &'a str,
}

/// One row per account, header `account,score,freeze_score,amount,freeze_amount`.
pub fn write_balances<W: Write>(accounts: &[Account], out: W) -> Result<(), Error> {
    let mut writer = csv::Writer::from_writer(out);
    for account in accounts {
        writer.serialize(BalanceRow {
            account: account.id.0,
            score: account.score.available,
            freeze_score: account.score.frozen,
            amount: account.amount.available,
            freeze_amount: account.amount.frozen,
        })?;
    }
    writer.flush()?;
    Ok(())
}

/// Ledger log export; missing counterparty and source are written as 0.
pub fn write_entries<W: Write>(entries: &[LedgerEntry], out: W) -> Result<(), Error> {
    let mut writer = csv::Writer::from_writer(out);
    for entry in entries {
        writer.serialize(EntryRow {
            id: entry.id.0,
            account: entry.account.0,
            counterparty: entry.counterparty.map_or(0, |c| c.0),
            category: entry.category,
            kind: entry.kind,
            source: entry.source.unwrap_or(0),
            available_before: entry.available_before,
            available_delta: entry.available_delta,
            available_after: entry.available_after,
            frozen_before: entry.frozen_before,
            frozen_delta: entry.frozen_delta,
            frozen_after: entry.frozen_after,
            created_at: entry.created_at.to_rfc3339(),
            remark: &entry.remark,
        })?;
    }
    writer.flush()?;
    Ok(())
}
