//! Balance statistics and high-balance affinity.
//!
//! An account is "high balance" when its balance is strictly greater than a
//! threshold, usually the population average. Affinity measures whether
//! high-balance accounts trade preferentially with each other: for each
//! high-balance account, the share of its neighbours that are also high
//! balance, averaged over those accounts.

use petgraph::graph::NodeIndex;
use petgraph::Direction;
use serde::Serialize;
use tracing::debug;

use crate::error::GraphError;
use crate::graph::{AccountNode, TransactionGraph};

/// Population summary for one threshold.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BalanceProfile {
    pub accounts: usize,
    pub average_balance: f64,
    /// Balance an account must exceed to count as high balance.
    pub threshold: f64,
    pub high_balance_accounts: usize,
    /// `high_balance_accounts / accounts`.
    pub high_balance_fraction: f64,
    /// See [`high_balance_affinity`].
    pub affinity: f64,
}

/// Accounts listed in the accounts table. Implicit vertices carry no
/// recorded balance and are left out of every balance statistic.
fn recorded(graph: &TransactionGraph) -> impl Iterator<Item = &AccountNode> {
    graph.nodes().filter(|node| !node.implicit)
}

/// Mean balance over every recorded account, in base units.
pub fn average_balance(graph: &TransactionGraph) -> Result<f64, GraphError> {
    let (count, total) = recorded(graph).fold((0usize, 0.0), |(count, total), node| {
        (count + 1, total + node.balance)
    });
    if count == 0 {
        return Err(GraphError::EmptyGraph);
    }
    Ok(total / count as f64)
}

/// The subset of `addresses` whose balance is strictly above `threshold`.
///
/// Implicit accounts never qualify. Input order is kept and repeated addresses are reported once.
pub fn high_balance_accounts<S: AsRef<str>>(
    graph: &TransactionGraph,
    addresses: &[S],
    threshold: f64,
) -> Result<Vec<String>, GraphError> {
    let mut high = Vec::new();
    for address in addresses {
        let address = address.as_ref();
        let node = graph.account(address)?;
        if !node.implicit && node.balance > threshold && !high.iter().any(|h| h == address) {
            high.push(address.to_string());
        }
    }
    Ok(high)
}

fn is_high(graph: &TransactionGraph, ix: NodeIndex, threshold: f64) -> bool {
    let node = &graph.graph[ix];
    !node.implicit && node.balance > threshold
}

/// Mean share of high-balance neighbours across high-balance accounts.
///
/// Neighbours are the distinct successors followed by the distinct
/// predecessors, so an account that both sent to and received from the
/// same partner counts that partner twice. Accounts without neighbours are
/// skipped; returns 0.0 when no high-balance account has any.
pub fn high_balance_affinity(graph: &TransactionGraph, threshold: f64) -> f64 {
    let mut proportions = Vec::new();

    for ix in graph.graph.node_indices() {
        if !is_high(graph, ix, threshold) {
            continue;
        }

        let successors = graph.neighbor_indices(ix, Direction::Outgoing);
        let predecessors = graph.neighbor_indices(ix, Direction::Incoming);
        let total = successors.len() + predecessors.len();
        if total == 0 {
            continue;
        }

        let high_neighbors = successors
            .iter()
            .chain(predecessors.iter())
            .filter(|&&neighbor| is_high(graph, neighbor, threshold))
            .count();
        proportions.push(high_neighbors as f64 / total as f64);
    }

    if proportions.is_empty() {
        return 0.0;
    }
    proportions.iter().sum::<f64>() / proportions.len() as f64
}

/// Average, high-balance split and affinity in one pass.
///
/// `threshold` defaults to the average balance.
pub fn balance_profile(
    graph: &TransactionGraph,
    threshold: Option<f64>,
) -> Result<BalanceProfile, GraphError> {
    let average_balance = average_balance(graph)?;
    let threshold = threshold.unwrap_or(average_balance);
    let accounts = recorded(graph).count();
    let high_balance_accounts = recorded(graph)
        .filter(|node| node.balance > threshold)
        .count();
    let affinity = high_balance_affinity(graph, threshold);

    debug!(
        accounts,
        average_balance, threshold, high_balance_accounts, affinity, "balance profile"
    );

    Ok(BalanceProfile {
        accounts,
        average_balance,
        threshold,
        high_balance_accounts,
        high_balance_fraction: high_balance_accounts as f64 / accounts as f64,
        affinity,
    })
}
