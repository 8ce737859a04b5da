use std::io::Read;
use std::pin::Pin;

use chrono::NaiveDate;
use futures::stream::{self, Stream};
use serde::Deserialize;

use crate::domain::traits::RequestStream;
use crate::domain::{
    Account, AccountId, AccountStatus, Adjustment, AssetCategory, Balance, CheckIn, Error,
    OperatorId, Pool, Request, RequestKind, Shift, ShiftDirection, Transfer,
};

pub struct CsvReader<R: Read> {
    reader: Option<csv::Reader<R>>,
}

impl<R: Read> CsvReader<R> {
    pub fn new(reader: R) -> Result<Self, Error> {
        Ok(Self {
            reader: Some(csv_reader(reader)),
        })
    }
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader)
}

/// Internal shape used only for CSV deserialization.
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "type")]
    kind: String,
    account: u64,
    counterparty: Option<u64>,
    category: Option<String>,
    pool: Option<String>,
    amount: Option<u64>,
    operator: Option<u64>,
    day: Option<NaiveDate>,
    remark: Option<String>,
}

impl CsvRow {
    fn category(&self) -> Result<AssetCategory, Error> {
        match self.category.as_deref() {
            Some(c) if !c.is_empty() => c.parse(),
            _ => Err(Error::Validation("missing asset category".to_string())),
        }
    }

    /// Defaults to the available pool when the column is empty.
    fn pool(&self) -> Result<Pool, Error> {
        match self.pool.as_deref() {
            Some(p) if !p.is_empty() => p.parse(),
            _ => Ok(Pool::Available),
        }
    }

    fn amount(&self) -> Result<u64, Error> {
        self.amount
            .ok_or_else(|| Error::Validation("missing amount".to_string()))
    }

    fn remark(&self) -> String {
        self.remark.clone().unwrap_or_default()
    }

    fn adjustment(&self) -> Result<Adjustment, Error> {
        let mut adjustment = Adjustment::new(
            AccountId(self.account),
            self.category()?,
            self.pool()?,
            self.amount()?,
        )
        .remark(self.remark());
        if let Some(counterparty) = self.counterparty.filter(|c| *c > 0) {
            adjustment = adjustment.counterparty(AccountId(counterparty));
        }
        Ok(adjustment)
    }
}

impl TryFrom<CsvRow> for Request {
    type Error = Error;

    fn try_from(row: CsvRow) -> Result<Self, Self::Error> {
        let kind = match row.kind.trim().to_ascii_lowercase().as_str() {
            "charge" => RequestKind::Charge(row.adjustment()?),
            "deduct" | "deduction" => RequestKind::Deduct(row.adjustment()?),
            "shift" => {
                let destination = match row.pool.as_deref() {
                    Some(p) if !p.is_empty() => p.parse()?,
                    _ => {
                        return Err(Error::Validation(
                            "shift needs a destination pool".to_string(),
                        ));
                    }
                };
                RequestKind::Shift(
                    Shift::new(
                        AccountId(row.account),
                        row.category()?,
                        ShiftDirection::into_pool(destination),
                        row.amount()?,
                    )
                    .remark(row.remark()),
                )
            }
            "transfer" => {
                let to = row
                    .counterparty
                    .ok_or_else(|| Error::Validation("transfer needs a counterparty".to_string()))?;
                RequestKind::Transfer(
                    Transfer::new(
                        AccountId(row.account),
                        AccountId(to),
                        row.category()?,
                        row.pool()?,
                        row.amount()?,
                    )
                    .remark(row.remark()),
                )
            }
            "signin" => RequestKind::CheckIn(CheckIn {
                account: AccountId(row.account),
                day: row
                    .day
                    .ok_or_else(|| Error::Validation("signin needs a day".to_string()))?,
            }),
            other => {
                return Err(Error::Ingestion(format!(
                    "Invalid request type: {}",
                    other
                )));
            }
        };

        Ok(Request {
            kind,
            operator: row.operator.and_then(OperatorId::new),
        })
    }
}

impl<R: Read + Send + 'static> RequestStream for CsvReader<R> {
    type ReqStream = Pin<Box<dyn Stream<Item = Result<Request, Error>> + Send>>;

    fn stream(&mut self) -> Self::ReqStream {
        // Take ownership of the reader so the iterator we build owns all data and is 'static.
        let reader = match self.reader.take() {
            Some(r) => r,
            None => {
                // Already consumed; return an empty stream.
                return Box::pin(stream::iter(Vec::<Result<Request, Error>>::new()));
            }
        };

        let iter = reader
            .into_deserialize::<CsvRow>()
            .map(|row_res| match row_res {
                Ok(row) => Request::try_from(row),
                Err(e) => Err(Error::Ingestion(format!(
                    "CSV deserialization error: {}",
                    e
                ))),
            });

        Box::pin(stream::iter(iter))
    }
}

#[derive(Debug, Deserialize)]
struct AccountRow {
    id: u64,
    status: Option<AccountStatus>,
    score: Option<u64>,
    freeze_score: Option<u64>,
    amount: Option<u64>,
    freeze_amount: Option<u64>,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        let mut account = Account::new(AccountId(row.id))
            .with_balance(
                AssetCategory::Score,
                Balance::new(row.score.unwrap_or(0), row.freeze_score.unwrap_or(0)),
            )
            .with_balance(
                AssetCategory::Amount,
                Balance::new(row.amount.unwrap_or(0), row.freeze_amount.unwrap_or(0)),
            );
        account.status = row.status.unwrap_or_default();
        account
    }
}

/// Reads the account seed file: `id,status,score,freeze_score,amount,freeze_amount`.
pub fn read_accounts<R: Read>(reader: R) -> Result<Vec<Account>, Error> {
    csv_reader(reader)
        .into_deserialize::<AccountRow>()
        .map(|row| {
            row.map(Account::from)
                .map_err(|e| Error::Ingestion(format!("Invalid account row: {}", e)))
        })
        .collect()
}
