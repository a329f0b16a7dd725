//! txnet-data crate
//!
//! Typed account and transfer records plus the delimited-text loader that
//! produces them.

pub mod loader;
pub mod types;

pub use loader::{load_accounts, load_transfers, parse_accounts, parse_transfers, RecordError};
pub use types::{AccountRecord, Table, TransferRecord};
