//! Daily check-in rewards, credited to the score pool through the same
//! transaction protocol as every other ledger mutation.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use tracing::info;

use crate::domain::{
    AssetCategory, CheckIn, EntryDraft, Error, LedgerEntry, OperationKind, OperatorId,
    Pool, SigninId, Storage, Transaction,
};
use crate::ledger::{Ledger, abort, append, commit, load, plan, validate_account, validate_amount};

pub const DAILY_REMARK: &str = "daily check-in";
pub const WEEKLY_REMARK: &str = "weekly check-in streak";

#[derive(Debug, Clone)]
pub struct CheckInReceipt {
    pub signin: SigninId,
    pub reward: u64,
    /// Daily credit first, weekly bonus second; empty when nothing is credited.
    pub entries: Vec<LedgerEntry>,
}

/// Monday..Saturday preceding `day`, when `day` is a Sunday.
pub fn streak_days(day: NaiveDate) -> Option<Vec<NaiveDate>> {
    if day.weekday() != Weekday::Sun {
        return None;
    }
    (1..=6u64)
        .rev()
        .map(|n| day.checked_sub_days(Days::new(n)))
        .collect()
}

impl<S: Storage> Ledger<S> {
    pub async fn check_in(
        &self,
        req: &CheckIn,
        operator: Option<OperatorId>,
    ) -> Result<CheckInReceipt, Error> {
        validate_account(req.account)?;
        info!(account = %req.account, day = %req.day, "user signin");

        let mut tx = self.storage().begin(&[req.account]).await?;
        let result = self.check_in_in(tx.as_mut(), req, operator).await;
        match result {
            Ok(receipt) => {
                commit(tx, "signin").await?;
                Ok(receipt)
            }
            Err(e) => Err(abort(tx, "signin", e).await),
        }
    }

    async fn check_in_in(
        &self,
        tx: &mut dyn Transaction,
        req: &CheckIn,
        operator: Option<OperatorId>,
    ) -> Result<CheckInReceipt, Error> {
        let account = load(tx, req.account).await?;
        if !account.is_enabled() {
            return Err(Error::AccountDisabled(req.account));
        }

        let rewards = &self.config().signin;
        let mut week_reward = 0;
        if rewards.week_reward > 0 {
            if let Some(days) = streak_days(req.day) {
                if tx.count_signins(req.account, &days).await? == days.len() {
                    week_reward = rewards.week_reward;
                }
            }
        }
        let reward = rewards
            .day_reward
            .checked_add(week_reward)
            .ok_or_else(|| Error::Validation("check-in reward overflows".to_string()))?;

        let signin = tx.insert_signin(req.account, req.day, reward).await?;

        let mut entries = Vec::new();
        let mut balance = account.balance(AssetCategory::Score);
        for (amount, remark) in [
            (rewards.day_reward, DAILY_REMARK),
            (week_reward, WEEKLY_REMARK),
        ] {
            if amount == 0 {
                continue;
            }
            let delta = validate_amount(amount)?;
            let after = plan(
                req.account,
                AssetCategory::Score,
                balance,
                Pool::Available,
                delta,
            )?;
            tx.adjust_balance(req.account, AssetCategory::Score, Pool::Available, delta)
                .await?;
            entries.push(
                append(
                    tx,
                    EntryDraft::between(
                        req.account,
                        AssetCategory::Score,
                        OperationKind::Signin,
                        balance,
                        after,
                    )
                    .remark(remark)
                    .source(Some(signin.0)),
                )
                .await?,
            );
            balance = after;
        }

        self.audit(
            tx,
            operator,
            "add user check-in",
            format!("add user check-in: {}", req.day),
            signin.0,
        )
        .await?;

        Ok(CheckInReceipt {
            signin,
            reward,
            entries,
        })
    }
}
