//! Transaction graph construction from account and transfer records.
//!
//! Builds a directed multi-edge graph where nodes are account addresses and
//! edges are individual transfers. This is the single long-lived artifact
//! that every analysis in this crate reads.
//!
//! ## Design
//!
//! Parallel edges are intentional: two accounts that transacted five times
//! are joined by five edges, so [`TransactionGraph::degree`] counts
//! transaction volume rather than distinct partners. Edges are added with
//! `add_edge` (never `update_edge`) and are never merged.
//!
//! Construction is all-or-nothing. Any record that violates the configured
//! [`BuildOptions`] aborts the build and no partial graph is returned.

use std::collections::{HashMap, HashSet};

use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use txnet_data::{AccountRecord, TransferRecord};

use crate::error::GraphError;
use crate::units::{atomic_to_base, display_size, DEFAULT_UNIT_SCALE};

/// What to do with a transfer whose endpoint is not in the accounts table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndpointPolicy {
    /// Fail the build with [`GraphError::MalformedRecord`].
    #[default]
    Reject,
    /// Skip the transfer and count it in [`BuildStats::transfers_dropped`].
    Drop,
    /// Create an implicit zero-balance vertex for the missing address.
    CreateVertex,
}

/// What to do when the accounts table lists one address more than once
/// with different balances. Identical duplicates always collapse silently.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DuplicatePolicy {
    /// Fail the build with [`GraphError::MalformedRecord`].
    #[default]
    Reject,
    /// Keep the balance from the last row seen.
    LastWriteWins,
}

/// Graph construction settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildOptions {
    /// Atomic units per base unit.
    pub unit_scale: u128,
    pub endpoint_policy: EndpointPolicy,
    pub duplicate_policy: DuplicatePolicy,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            unit_scale: DEFAULT_UNIT_SCALE,
            endpoint_policy: EndpointPolicy::default(),
            duplicate_policy: DuplicatePolicy::default(),
        }
    }
}

impl BuildOptions {
    pub fn with_unit_scale(mut self, unit_scale: u128) -> Self {
        self.unit_scale = unit_scale;
        self
    }

    pub fn with_endpoint_policy(mut self, policy: EndpointPolicy) -> Self {
        self.endpoint_policy = policy;
        self
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }
}

/// Counters collected while building a graph.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStats {
    /// Account rows consumed.
    pub accounts_read: usize,
    /// Account rows that collapsed into an existing vertex.
    pub duplicate_accounts: usize,
    /// Transfer rows consumed.
    pub transfers_read: usize,
    /// Transfers skipped under [`EndpointPolicy::Drop`].
    pub transfers_dropped: usize,
    /// Vertices created under [`EndpointPolicy::CreateVertex`].
    pub implicit_vertices: usize,
    /// Transfers whose source and destination are the same account.
    pub self_transfers: usize,
}

/// Vertex weight: one account.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccountNode {
    /// Account address.
    pub address: String,
    /// Balance in base units.
    pub balance: f64,
    /// Balance in atomic units, as recorded.
    pub balance_atomic: u128,
    /// Rendering size derived from `balance`.
    pub display_size: u32,
    /// True when the vertex exists only because a transfer referenced it.
    pub implicit: bool,
}

/// Edge weight: one transfer between two accounts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransferEdge {
    /// Sequence number from the transfers table.
    pub sequence: u64,
    /// Amount in base units.
    pub amount: f64,
    /// Amount in atomic units, as recorded.
    pub amount_atomic: u128,
}

/// Borrowed view of one edge with its endpoint addresses.
#[derive(Clone, Copy, Debug)]
pub struct TransferRef<'a> {
    pub source: &'a str,
    pub target: &'a str,
    pub transfer: &'a TransferEdge,
}

/// Directed multigraph of accounts and transfers.
///
/// Immutable after [`TransactionGraph::build`]; every analysis takes `&self`.
#[derive(Clone, Debug, Default)]
pub struct TransactionGraph {
    pub(crate) graph: DiGraph<AccountNode, TransferEdge>,
    pub(crate) addr_to_ix: HashMap<String, NodeIndex>,
}

impl TransactionGraph {
    /// Build a graph from account and transfer records.
    pub fn build(
        accounts: &[AccountRecord],
        transfers: &[TransferRecord],
        options: &BuildOptions,
    ) -> Result<(Self, BuildStats), GraphError> {
        if options.unit_scale == 0 {
            return Err(GraphError::malformed("unit scale must be non-zero"));
        }

        let mut tx_graph = TransactionGraph::default();
        let mut stats = BuildStats::default();

        for (row, account) in accounts.iter().enumerate() {
            stats.accounts_read += 1;
            tx_graph.insert_account(row, account, options, &mut stats)?;
        }

        for transfer in transfers {
            stats.transfers_read += 1;
            tx_graph.insert_transfer(transfer, options, &mut stats)?;
        }

        info!(
            nodes = tx_graph.node_count(),
            edges = tx_graph.edge_count(),
            duplicate_accounts = stats.duplicate_accounts,
            transfers_dropped = stats.transfers_dropped,
            implicit_vertices = stats.implicit_vertices,
            self_transfers = stats.self_transfers,
            "transaction graph built"
        );

        Ok((tx_graph, stats))
    }

    /// Build with [`BuildOptions::default`], discarding the stats.
    pub fn from_records(
        accounts: &[AccountRecord],
        transfers: &[TransferRecord],
    ) -> Result<Self, GraphError> {
        Self::build(accounts, transfers, &BuildOptions::default()).map(|(graph, _)| graph)
    }

    fn insert_account(
        &mut self,
        row: usize,
        account: &AccountRecord,
        options: &BuildOptions,
        stats: &mut BuildStats,
    ) -> Result<(), GraphError> {
        if account.address.is_empty() {
            return Err(GraphError::malformed(format!(
                "account row {row} has an empty address"
            )));
        }

        let balance = atomic_to_base(account.balance_atomic, options.unit_scale);

        if let Some(&ix) = self.addr_to_ix.get(&account.address) {
            stats.duplicate_accounts += 1;
            let node = &mut self.graph[ix];
            if node.balance_atomic == account.balance_atomic {
                return Ok(());
            }
            match options.duplicate_policy {
                DuplicatePolicy::Reject => {
                    return Err(GraphError::malformed(format!(
                        "account {} listed with conflicting balances {} and {}",
                        account.address, node.balance_atomic, account.balance_atomic
                    )));
                }
                DuplicatePolicy::LastWriteWins => {
                    debug!(address = %account.address, "duplicate account overwritten");
                    node.balance_atomic = account.balance_atomic;
                    node.balance = balance;
                    node.display_size = display_size(balance);
                }
            }
            return Ok(());
        }

        let ix = self.graph.add_node(AccountNode {
            address: account.address.clone(),
            balance,
            balance_atomic: account.balance_atomic,
            display_size: display_size(balance),
            implicit: false,
        });
        self.addr_to_ix.insert(account.address.clone(), ix);
        Ok(())
    }

    fn insert_transfer(
        &mut self,
        transfer: &TransferRecord,
        options: &BuildOptions,
        stats: &mut BuildStats,
    ) -> Result<(), GraphError> {
        if transfer.from_address.is_empty() || transfer.to_address.is_empty() {
            return Err(GraphError::malformed(format!(
                "transfer {} has an empty endpoint address",
                transfer.sequence
            )));
        }

        let from_ix = self.resolve_endpoint(&transfer.from_address, transfer, options, stats)?;
        let to_ix = self.resolve_endpoint(&transfer.to_address, transfer, options, stats)?;
        let (Some(from_ix), Some(to_ix)) = (from_ix, to_ix) else {
            stats.transfers_dropped += 1;
            warn!(
                sequence = transfer.sequence,
                from = %transfer.from_address,
                to = %transfer.to_address,
                "dropping transfer with unknown endpoint"
            );
            return Ok(());
        };

        if transfer.is_self_transfer() {
            stats.self_transfers += 1;
        }

        self.graph.add_edge(
            from_ix,
            to_ix,
            TransferEdge {
                sequence: transfer.sequence,
                amount: atomic_to_base(transfer.amount_atomic, options.unit_scale),
                amount_atomic: transfer.amount_atomic,
            },
        );
        Ok(())
    }

    /// Map an endpoint address to a node according to the endpoint policy.
    ///
    /// `Ok(None)` means the transfer should be dropped.
    fn resolve_endpoint(
        &mut self,
        address: &str,
        transfer: &TransferRecord,
        options: &BuildOptions,
        stats: &mut BuildStats,
    ) -> Result<Option<NodeIndex>, GraphError> {
        if let Some(&ix) = self.addr_to_ix.get(address) {
            return Ok(Some(ix));
        }

        match options.endpoint_policy {
            EndpointPolicy::Reject => Err(GraphError::malformed(format!(
                "transfer {} references unknown account {address}",
                transfer.sequence
            ))),
            EndpointPolicy::Drop => Ok(None),
            EndpointPolicy::CreateVertex => {
                let ix = self.graph.add_node(AccountNode {
                    address: address.to_string(),
                    balance: 0.0,
                    balance_atomic: 0,
                    display_size: display_size(0.0),
                    implicit: true,
                });
                self.addr_to_ix.insert(address.to_string(), ix);
                stats.implicit_vertices += 1;
                Ok(Some(ix))
            }
        }
    }

    /// Number of accounts.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of transfers.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn contains(&self, address: &str) -> bool {
        self.addr_to_ix.contains_key(address)
    }

    /// Look up one account.
    pub fn account(&self, address: &str) -> Result<&AccountNode, GraphError> {
        self.index_of(address).map(|ix| &self.graph[ix])
    }

    /// All accounts, in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &AccountNode> {
        self.graph.node_weights()
    }

    /// All transfers, in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = TransferRef<'_>> {
        self.graph.edge_references().map(|edge| TransferRef {
            source: &self.graph[edge.source()].address,
            target: &self.graph[edge.target()].address,
            transfer: edge.weight(),
        })
    }

    /// Distinct recipients of transfers sent by `address`, ordered by first transfer.
    pub fn successors(&self, address: &str) -> Result<Vec<&str>, GraphError> {
        let ix = self.index_of(address)?;
        Ok(self.addresses(&self.neighbor_indices(ix, Direction::Outgoing)))
    }

    /// Distinct senders of transfers received by `address`, ordered by first transfer.
    pub fn predecessors(&self, address: &str) -> Result<Vec<&str>, GraphError> {
        let ix = self.index_of(address)?;
        Ok(self.addresses(&self.neighbor_indices(ix, Direction::Incoming)))
    }

    /// In-degree plus out-degree, counting every parallel transfer.
    pub fn degree(&self, address: &str) -> Result<usize, GraphError> {
        self.index_of(address).map(|ix| self.degree_of(ix))
    }

    pub(crate) fn index_of(&self, address: &str) -> Result<NodeIndex, GraphError> {
        self.addr_to_ix
            .get(address)
            .copied()
            .ok_or_else(|| GraphError::unknown(address))
    }

    pub(crate) fn address_of(&self, ix: NodeIndex) -> &str {
        &self.graph[ix].address
    }

    fn addresses(&self, indices: &[NodeIndex]) -> Vec<&str> {
        indices.iter().map(|&ix| self.address_of(ix)).collect()
    }

    pub(crate) fn degree_of(&self, ix: NodeIndex) -> usize {
        self.graph.edges_directed(ix, Direction::Outgoing).count()
            + self.graph.edges_directed(ix, Direction::Incoming).count()
    }

    /// Distinct neighbours in one direction, ordered by their first connecting edge.
    ///
    /// petgraph walks a node's edge list newest-first, so edges are re-sorted
    /// by index to recover insertion order.
    pub(crate) fn neighbor_indices(&self, ix: NodeIndex, direction: Direction) -> Vec<NodeIndex> {
        let mut edges: Vec<(EdgeIndex, NodeIndex)> = self
            .graph
            .edges_directed(ix, direction)
            .map(|edge| {
                let other = match direction {
                    Direction::Outgoing => edge.target(),
                    Direction::Incoming => edge.source(),
                };
                (edge.id(), other)
            })
            .collect();
        edges.sort_by_key(|(edge_ix, _)| *edge_ix);

        let mut seen = HashSet::new();
        edges
            .into_iter()
            .filter_map(|(_, other)| seen.insert(other).then_some(other))
            .collect()
    }

    /// Successor and predecessor sets merged, without duplicates.
    pub(crate) fn neighbor_set(&self, ix: NodeIndex) -> HashSet<NodeIndex> {
        self.graph
            .neighbors_directed(ix, Direction::Outgoing)
            .chain(self.graph.neighbors_directed(ix, Direction::Incoming))
            .collect()
    }

    /// Whether the account both sent and received at least one transfer.
    pub(crate) fn is_seed(&self, ix: NodeIndex) -> bool {
        self.graph
            .edges_directed(ix, Direction::Outgoing)
            .next()
            .is_some()
            && self
                .graph
                .edges_directed(ix, Direction::Incoming)
                .next()
                .is_some()
    }

    /// Accounts eligible to anchor a cycle or subnetwork search, in insertion order.
    pub(crate) fn seed_indices(&self) -> Vec<NodeIndex> {
        self.graph
            .node_indices()
            .filter(|&ix| self.is_seed(ix))
            .collect()
    }

    /// Seed addresses, in insertion order.
    pub fn seed_accounts(&self) -> Vec<&str> {
        self.addresses(&self.seed_indices())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ETH: u128 = 1_000_000_000_000_000_000;

    fn account(address: &str, ether: u128) -> AccountRecord {
        AccountRecord::new(address, ether * ETH)
    }

    fn transfer(sequence: u64, from: &str, to: &str, ether: u128) -> TransferRecord {
        TransferRecord::new(sequence, from, to, ether * ETH)
    }

    #[test]
    fn builds_vertices_and_parallel_edges() {
        let accounts = vec![account("a", 1), account("b", 20), account("c", 0)];
        let transfers = vec![
            transfer(1, "a", "b", 1),
            transfer(2, "a", "b", 2),
            transfer(3, "b", "c", 3),
        ];

        let graph = TransactionGraph::from_records(&accounts, &transfers).unwrap();
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 3); // parallel edges preserved
        assert_eq!(graph.degree("a").unwrap(), 2);
        assert_eq!(graph.degree("b").unwrap(), 3);
        assert_eq!(graph.successors("a").unwrap(), vec!["b"]);
        assert_eq!(graph.predecessors("c").unwrap(), vec!["b"]);
        assert_eq!(graph.account("b").unwrap().balance, 20.0);
        assert_eq!(graph.account("b").unwrap().display_size, 2);
    }

    #[test]
    fn neighbours_follow_first_transfer_order() {
        let accounts = vec![account("hub", 1), account("x", 1), account("y", 1), account("z", 1)];
        let transfers = vec![
            transfer(1, "hub", "y", 1),
            transfer(2, "hub", "x", 1),
            transfer(3, "hub", "y", 1),
            transfer(4, "hub", "z", 1),
        ];

        let graph = TransactionGraph::from_records(&accounts, &transfers).unwrap();
        assert_eq!(graph.successors("hub").unwrap(), vec!["y", "x", "z"]);
    }

    #[test]
    fn dangling_endpoint_rejected_by_default() {
        let accounts = vec![account("a", 1)];
        let transfers = vec![transfer(9, "a", "ghost", 1)];

        let err = TransactionGraph::from_records(&accounts, &transfers).unwrap_err();
        assert!(matches!(err, GraphError::MalformedRecord { .. }));
    }

    #[test]
    fn dangling_endpoint_dropped_when_configured() {
        let accounts = vec![account("a", 1), account("b", 1)];
        let transfers = vec![transfer(1, "a", "ghost", 1), transfer(2, "a", "b", 1)];
        let options = BuildOptions::default().with_endpoint_policy(EndpointPolicy::Drop);

        let (graph, stats) = TransactionGraph::build(&accounts, &transfers, &options).unwrap();
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(stats.transfers_dropped, 1);
        assert!(!graph.contains("ghost"));
    }

    #[test]
    fn dangling_endpoint_creates_implicit_vertex() {
        let accounts = vec![account("a", 1)];
        let transfers = vec![transfer(1, "ghost", "a", 1)];
        let options = BuildOptions::default().with_endpoint_policy(EndpointPolicy::CreateVertex);

        let (graph, stats) = TransactionGraph::build(&accounts, &transfers, &options).unwrap();
        let ghost = graph.account("ghost").unwrap();
        assert!(ghost.implicit);
        assert_eq!(ghost.balance, 0.0);
        assert_eq!(stats.implicit_vertices, 1);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn conflicting_duplicate_rejected_by_default() {
        let accounts = vec![account("a", 1), account("a", 2)];
        let err = TransactionGraph::from_records(&accounts, &[]).unwrap_err();
        assert!(matches!(err, GraphError::MalformedRecord { .. }));
    }

    #[test]
    fn identical_duplicate_collapses() {
        let accounts = vec![account("a", 3), account("a", 3)];
        let (graph, stats) =
            TransactionGraph::build(&accounts, &[], &BuildOptions::default()).unwrap();
        assert_eq!(graph.node_count(), 1);
        assert_eq!(stats.duplicate_accounts, 1);
    }

    #[test]
    fn last_write_wins_overwrites_balance() {
        let accounts = vec![account("a", 1), account("a", 500)];
        let options =
            BuildOptions::default().with_duplicate_policy(DuplicatePolicy::LastWriteWins);

        let (graph, _) = TransactionGraph::build(&accounts, &[], &options).unwrap();
        let node = graph.account("a").unwrap();
        assert_eq!(node.balance, 500.0);
        assert_eq!(node.display_size, 3);
    }

    #[test]
    fn empty_address_is_malformed() {
        let accounts = vec![account("", 1)];
        assert!(matches!(
            TransactionGraph::from_records(&accounts, &[]),
            Err(GraphError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn zero_unit_scale_is_rejected() {
        let options = BuildOptions::default().with_unit_scale(0);
        assert!(TransactionGraph::build(&[], &[], &options).is_err());
    }

    #[test]
    fn self_transfer_counts_toward_degree_and_seed() {
        let accounts = vec![account("a", 1)];
        let transfers = vec![transfer(1, "a", "a", 1)];

        let (graph, stats) =
            TransactionGraph::build(&accounts, &transfers, &BuildOptions::default()).unwrap();
        assert_eq!(stats.self_transfers, 1);
        assert_eq!(graph.degree("a").unwrap(), 2);
        assert_eq!(graph.seed_accounts(), vec!["a"]);
    }

    #[test]
    fn unknown_address_query_fails() {
        let graph = TransactionGraph::from_records(&[account("a", 1)], &[]).unwrap();
        assert_eq!(
            graph.degree("zzz").unwrap_err(),
            GraphError::UnknownAddress {
                address: "zzz".to_string()
            }
        );
    }

    #[test]
    fn empty_input_builds_empty_graph() {
        let graph = TransactionGraph::from_records(&[], &[]).unwrap();
        assert!(graph.is_empty());
        assert_eq!(graph.edge_count(), 0);
    }
}
