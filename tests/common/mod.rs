//! Shared test helpers and utilities.
//!
//! Factory functions for account and transfer records, plus a few small
//! graphs with known structure.

#![allow(dead_code)]

use txnet_analysis::TransactionGraph;
use txnet_data::{AccountRecord, TransferRecord};

/// Atomic units in one base unit at the default scale.
pub const ONE: u128 = 1_000_000_000_000_000_000;

/// A checksum-free 20-byte hex address derived from `n`.
pub fn addr(n: u32) -> String {
    format!("0x{n:040x}")
}

/// Accounts with the given base-unit balances, addressed `addr(0..)`.
pub fn accounts_with_balances(balances: &[u128]) -> Vec<AccountRecord> {
    balances
        .iter()
        .enumerate()
        .map(|(i, balance)| AccountRecord::new(addr(i as u32), balance * ONE))
        .collect()
}

/// One transfer of 1 base unit per `(from, to)` pair, sequenced in order.
pub fn transfers(pairs: &[(u32, u32)]) -> Vec<TransferRecord> {
    pairs
        .iter()
        .enumerate()
        .map(|(seq, &(from, to))| TransferRecord::new(seq as u64, addr(from), addr(to), ONE))
        .collect()
}

/// Graph over `n` zero-balance accounts with the given edges.
///
/// # Panics
/// Panics if an edge references an account outside `0..n`.
pub fn graph(n: u32, pairs: &[(u32, u32)]) -> TransactionGraph {
    let accounts = accounts_with_balances(&vec![0; n as usize]);
    TransactionGraph::from_records(&accounts, &transfers(pairs)).expect("fixture graph builds")
}

/// 0 -> 1 -> 2 -> 3 -> 0
pub fn four_ring() -> TransactionGraph {
    graph(4, &[(0, 1), (1, 2), (2, 3), (3, 0)])
}

/// Two rings joined by a one-way bridge, plus an isolated account.
///
/// Ring A: 0 -> 1 -> 2 -> 0. Ring B: 3 -> 4 -> 5 -> 6 -> 3. Bridge 2 -> 3.
pub fn bridged_rings() -> TransactionGraph {
    graph(
        8,
        &[
            (0, 1),
            (1, 2),
            (2, 0),
            (3, 4),
            (4, 5),
            (5, 6),
            (6, 3),
            (2, 3),
        ],
    )
}
