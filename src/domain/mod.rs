pub mod account;
pub mod asset;
pub mod entry;
pub mod error;
pub mod query;
pub mod request;
pub mod traits;

pub use account::{Account, AccountId, AccountStatus, Balance, OperatorId};
pub use asset::{AssetCategory, Pool, ShiftDirection};
pub use entry::{
    AuditRecord, EntryDraft, EntryId, LedgerEntry, OperationKind, SigninId, SigninRecord,
};
pub use error::Error;
pub use query::{EntryQuery, Page, SortOrder};
pub use request::{Adjustment, CheckIn, Request, RequestKind, Shift, Transfer};
pub use traits::{
    AccountStore, AuditLog, DeadLetterQueue, LedgerSink, RequestStream, SigninStore, Storage,
    Transaction,
};
