//! Record types consumed by graph construction.

use serde::{Deserialize, Serialize};

/// One row of the accounts table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    /// Account address (opaque, case-sensitive).
    pub address: String,
    /// Balance in the ledger's atomic unit (e.g. Wei).
    pub balance_atomic: u128,
}

impl AccountRecord {
    pub fn new(address: impl Into<String>, balance_atomic: u128) -> Self {
        Self {
            address: address.into(),
            balance_atomic,
        }
    }
}

/// One row of the transfers table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    /// Sequence number as recorded by the source table.
    pub sequence: u64,
    /// Sending address.
    pub from_address: String,
    /// Receiving address.
    pub to_address: String,
    /// Amount in the ledger's atomic unit.
    pub amount_atomic: u128,
}

impl TransferRecord {
    pub fn new(
        sequence: u64,
        from_address: impl Into<String>,
        to_address: impl Into<String>,
        amount_atomic: u128,
    ) -> Self {
        Self {
            sequence,
            from_address: from_address.into(),
            to_address: to_address.into(),
            amount_atomic,
        }
    }

    /// Whether the transfer sends funds back to its own sender.
    pub fn is_self_transfer(&self) -> bool {
        self.from_address == self.to_address
    }
}

/// Which input table a record came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Table {
    Accounts,
    Transfers,
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Table::Accounts => f.write_str("accounts"),
            Table::Transfers => f.write_str("transfers"),
        }
    }
}
