//! Asset ledger of the user center: score and amount balances, split into
//! available and frozen pools, mutated only together with an append-only
//! ledger log.

pub mod config;
pub mod dlq;
pub mod domain;
pub mod engine;
pub mod ingestion;
pub mod ledger;
pub mod memory_store;
pub mod output;
pub mod signin;
pub mod telemetry;

pub use ledger::{Ledger, TransferReceipt};
pub use memory_store::{FailPoint, MemoryStore};
pub use signin::CheckInReceipt;
