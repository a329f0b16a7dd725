//! Subnetwork discovery and future-partner ranking.
//!
//! A seed's transaction network is the union of its forward closure
//! (everything reachable by following outgoing transfers) and its backward
//! closure (everything reachable by following incoming transfers). The
//! largest network over all seeds approximates the biggest weakly connected
//! group anchored at a hub; because closures depend on edge direction, two
//! seeds in the same component can produce networks of different sizes.
//!
//! Partners are ranked by how many neighbours they share with the network's
//! central account, a common-neighbour similarity score.

use std::collections::HashSet;

use petgraph::graph::NodeIndex;
use petgraph::Direction;
use serde::Serialize;
use tracing::debug;

use crate::error::GraphError;
use crate::graph::TransactionGraph;

/// Ordered set of accounts; the first member is the central account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Subnetwork {
    members: Vec<String>,
}

impl Subnetwork {
    /// Wrap an ordered member list. Returns `None` when `members` is empty.
    pub fn from_members(members: Vec<String>) -> Option<Self> {
        if members.is_empty() {
            return None;
        }
        Some(Self { members })
    }

    /// The account the network was grown from.
    pub fn center(&self) -> &str {
        &self.members[0]
    }

    pub fn members(&self) -> &[String] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, address: &str) -> bool {
        self.members.iter().any(|member| member == address)
    }
}

/// One ranked subnetwork member.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PartnerScore {
    pub address: String,
    /// Neighbours this member has in common with the central account.
    pub shared_neighbors: usize,
}

/// Accounts reachable from `ix` along `direction`, in depth-first preorder.
///
/// Each account is visited at most once.
fn closure(graph: &TransactionGraph, ix: NodeIndex, direction: Direction) -> Vec<NodeIndex> {
    let mut visited: HashSet<NodeIndex> = HashSet::new();
    let mut order = Vec::new();
    let mut stack = vec![ix];

    while let Some(node) = stack.pop() {
        if !visited.insert(node) {
            continue;
        }
        order.push(node);

        // Reversed so the first neighbour is explored first.
        for next in graph.neighbor_indices(node, direction).into_iter().rev() {
            if !visited.contains(&next) {
                stack.push(next);
            }
        }
    }

    order
}

fn network_of(graph: &TransactionGraph, ix: NodeIndex) -> Vec<NodeIndex> {
    let mut members = closure(graph, ix, Direction::Outgoing);
    let mut seen: HashSet<NodeIndex> = members.iter().copied().collect();

    for node in closure(graph, ix, Direction::Incoming) {
        if seen.insert(node) {
            members.push(node);
        }
    }

    members
}

fn to_subnetwork(graph: &TransactionGraph, members: &[NodeIndex]) -> Subnetwork {
    Subnetwork {
        members: members
            .iter()
            .map(|&ix| graph.address_of(ix).to_string())
            .collect(),
    }
}

/// Forward closure followed by backward-only members, seeded at `address`.
pub fn transaction_network(
    graph: &TransactionGraph,
    address: &str,
) -> Result<Subnetwork, GraphError> {
    let ix = graph.index_of(address)?;
    Ok(to_subnetwork(graph, &network_of(graph, ix)))
}

/// Largest transaction network over all seed accounts.
///
/// Ties keep the first seed found in insertion order.
pub fn largest_subnetwork(graph: &TransactionGraph) -> Result<Subnetwork, GraphError> {
    let seeds = graph.seed_indices();
    if seeds.is_empty() {
        return Err(GraphError::NoCandidateSeed);
    }

    let mut best: Vec<NodeIndex> = Vec::new();
    for seed in seeds {
        let network = network_of(graph, seed);
        debug!(seed = %graph.address_of(seed), size = network.len(), "seed network");
        if network.len() > best.len() {
            best = network;
        }
    }

    Ok(to_subnetwork(graph, &best))
}

/// Rank every non-central member by neighbours shared with the center.
///
/// Sorted by shared count, descending; ties keep subnetwork order. Members
/// with no shared neighbours stay in the list with a count of 0.
pub fn rank_future_partners(
    graph: &TransactionGraph,
    subnetwork: &Subnetwork,
) -> Result<Vec<PartnerScore>, GraphError> {
    let center_ix = graph.index_of(subnetwork.center())?;
    let center_neighbors = graph.neighbor_set(center_ix);

    let mut ranked = subnetwork.members()[1..]
        .iter()
        .map(|address| {
            let ix = graph.index_of(address)?;
            let shared_neighbors = graph
                .neighbor_set(ix)
                .intersection(&center_neighbors)
                .count();
            Ok(PartnerScore {
                address: address.clone(),
                shared_neighbors,
            })
        })
        .collect::<Result<Vec<_>, GraphError>>()?;

    ranked.sort_by(|a, b| b.shared_neighbors.cmp(&a.shared_neighbors));
    Ok(ranked)
}

/// Ranked partners with at least one shared neighbour.
pub fn future_partners(
    graph: &TransactionGraph,
    subnetwork: &Subnetwork,
) -> Result<Vec<PartnerScore>, GraphError> {
    let mut ranked = rank_future_partners(graph, subnetwork)?;
    ranked.retain(|partner| partner.shared_neighbors > 0);
    Ok(ranked)
}
