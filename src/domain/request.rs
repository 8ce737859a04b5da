use chrono::NaiveDate;

use crate::domain::{AccountId, AssetCategory, OperatorId, Pool, ShiftDirection};

/// Input of `charge` and `deduct`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Adjustment {
    pub account: AccountId,
    pub category: AssetCategory,
    pub pool: Pool,
    pub amount: u64,
    pub remark: String,
    pub counterparty: Option<AccountId>,
}

impl Adjustment {
    pub fn new(account: AccountId, category: AssetCategory, pool: Pool, amount: u64) -> Self {
        Self {
            account,
            category,
            pool,
            amount,
            remark: String::new(),
            counterparty: None,
        }
    }

    pub fn remark(mut self, remark: impl Into<String>) -> Self {
        self.remark = remark.into();
        self
    }

    pub fn counterparty(mut self, counterparty: AccountId) -> Self {
        self.counterparty = Some(counterparty);
        self
    }
}

/// Moves value between the pools of one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shift {
    pub account: AccountId,
    pub category: AssetCategory,
    pub direction: ShiftDirection,
    pub amount: u64,
    pub remark: String,
}

impl Shift {
    pub fn new(
        account: AccountId,
        category: AssetCategory,
        direction: ShiftDirection,
        amount: u64,
    ) -> Self {
        Self {
            account,
            category,
            direction,
            amount,
            remark: String::new(),
        }
    }

    pub fn remark(mut self, remark: impl Into<String>) -> Self {
        self.remark = remark.into();
        self
    }
}

/// Moves one pool's value from `from` to the same pool of `to`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub from: AccountId,
    pub to: AccountId,
    pub category: AssetCategory,
    pub pool: Pool,
    pub amount: u64,
    pub remark: String,
}

impl Transfer {
    pub fn new(
        from: AccountId,
        to: AccountId,
        category: AssetCategory,
        pool: Pool,
        amount: u64,
    ) -> Self {
        Self {
            from,
            to,
            category,
            pool,
            amount,
            remark: String::new(),
        }
    }

    pub fn remark(mut self, remark: impl Into<String>) -> Self {
        self.remark = remark.into();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckIn {
    pub account: AccountId,
    pub day: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestKind {
    Charge(Adjustment),
    Deduct(Adjustment),
    Shift(Shift),
    Transfer(Transfer),
    CheckIn(CheckIn),
}

/// One unit of work for the batch engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub kind: RequestKind,
    pub operator: Option<OperatorId>,
}

impl core::fmt::Display for Request {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match &self.kind {
            RequestKind::Charge(a) | RequestKind::Deduct(a) => {
                let op = if matches!(self.kind, RequestKind::Charge(_)) {
                    "charge"
                } else {
                    "deduct"
                };
                write!(
                    f,
                    "{},account={},category={},pool={},amount={}",
                    op, a.account, a.category, a.pool, a.amount
                )
            }
            RequestKind::Shift(s) => write!(
                f,
                "shift,account={},category={},to={},amount={}",
                s.account,
                s.category,
                s.direction.destination(),
                s.amount
            ),
            RequestKind::Transfer(t) => write!(
                f,
                "transfer,from={},to={},category={},pool={},amount={}",
                t.from, t.to, t.category, t.pool, t.amount
            ),
            RequestKind::CheckIn(c) => write!(f, "signin,account={},day={}", c.account, c.day),
        }
    }
}
