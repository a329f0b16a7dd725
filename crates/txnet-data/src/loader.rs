//! Delimited-text loader for the accounts and transfers tables.
//!
//! Both tables are comma-separated with a header row. Accounts carry
//! `balance,address`; transfers carry `sequence,from,to,value` followed by
//! any number of auxiliary columns, which are ignored.
//!
//! Loading is all-or-nothing: the first malformed row aborts the whole table
//! with its line number, so no partially parsed table reaches the graph
//! builder.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::types::{AccountRecord, Table, TransferRecord};

const ACCOUNT_COLUMNS: usize = 2;
const TRANSFER_COLUMNS: usize = 4;

/// Errors raised while reading record tables.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("malformed {table} record at line {line}: {reason}")]
    Malformed {
        table: Table,
        line: usize,
        reason: String,
    },
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Reads and parses the accounts table at `path`.
pub fn load_accounts(path: &Path) -> Result<Vec<AccountRecord>, RecordError> {
    let content = read_table(path)?;
    parse_accounts(&content)
}

/// Reads and parses the transfers table at `path`.
pub fn load_transfers(path: &Path) -> Result<Vec<TransferRecord>, RecordError> {
    let content = read_table(path)?;
    parse_transfers(&content)
}

fn read_table(path: &Path) -> Result<String, RecordError> {
    std::fs::read_to_string(path).map_err(|source| RecordError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Parses accounts table text (`balance,address` with a header row).
pub fn parse_accounts(content: &str) -> Result<Vec<AccountRecord>, RecordError> {
    let mut records = Vec::new();

    for (line, fields) in data_rows(content) {
        let row = Row {
            table: Table::Accounts,
            line,
            fields: &fields,
        };
        row.require_columns(ACCOUNT_COLUMNS)?;

        let balance_atomic = row.atomic(0, "balance")?;
        let address = row.address(1, "address")?;
        records.push(AccountRecord {
            address,
            balance_atomic,
        });
    }

    debug!(records = records.len(), "parsed accounts table");
    Ok(records)
}

/// Parses transfers table text (`sequence,from,to,value,...` with a header row).
pub fn parse_transfers(content: &str) -> Result<Vec<TransferRecord>, RecordError> {
    let mut records = Vec::new();

    for (line, fields) in data_rows(content) {
        let row = Row {
            table: Table::Transfers,
            line,
            fields: &fields,
        };
        row.require_columns(TRANSFER_COLUMNS)?;

        let sequence = row.field(0, "sequence")?.parse::<u64>().map_err(|err| {
            row.malformed(format!("sequence {:?} is not an integer: {err}", fields[0]))
        })?;
        let from_address = row.address(1, "from_address")?;
        let to_address = row.address(2, "to_address")?;
        let amount_atomic = row.atomic(3, "value")?;

        records.push(TransferRecord {
            sequence,
            from_address,
            to_address,
            amount_atomic,
        });
    }

    debug!(records = records.len(), "parsed transfers table");
    Ok(records)
}

/// Yields `(line_number, fields)` for every non-blank row after the header.
fn data_rows(content: &str) -> impl Iterator<Item = (usize, Vec<&str>)> + '_ {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .skip(1)
        .map(|(index, line)| (index + 1, line.trim().split(',').map(clean_field).collect()))
}

fn clean_field(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(trimmed)
        .trim()
}

struct Row<'a> {
    table: Table,
    line: usize,
    fields: &'a [&'a str],
}

impl Row<'_> {
    fn malformed(&self, reason: impl Into<String>) -> RecordError {
        RecordError::Malformed {
            table: self.table,
            line: self.line,
            reason: reason.into(),
        }
    }

    fn require_columns(&self, expected: usize) -> Result<(), RecordError> {
        if self.fields.len() < expected {
            return Err(self.malformed(format!(
                "expected at least {expected} columns, found {}",
                self.fields.len()
            )));
        }
        Ok(())
    }

    fn field(&self, index: usize, name: &str) -> Result<&str, RecordError> {
        match self.fields.get(index) {
            Some(value) if !value.is_empty() => Ok(*value),
            _ => Err(self.malformed(format!("missing {name}"))),
        }
    }

    fn address(&self, index: usize, name: &str) -> Result<String, RecordError> {
        self.field(index, name).map(str::to_string)
    }

    fn atomic(&self, index: usize, name: &str) -> Result<u128, RecordError> {
        let value = self.field(index, name)?;
        parse_atomic(value).ok_or_else(|| {
            self.malformed(format!(
                "{name} {value:?} is not a non-negative integer amount"
            ))
        })
    }
}

/// Parses an atomic-unit amount written as decimal or `0x`-prefixed hex.
pub fn parse_atomic(value: &str) -> Option<u128> {
    let trimmed = value.trim();
    if let Some(hex) = trimmed.strip_prefix("0x") {
        if hex.is_empty() {
            return None;
        }
        return u128::from_str_radix(hex, 16).ok();
    }
    trimmed.parse::<u128>().ok()
}
