//! Render-ready view of the graph.
//!
//! Carries exactly what a layout component needs to place, size and colour
//! nodes: per-account balance, display size and degree, and per-transfer
//! weight. No other graph internals leak out.

use serde::Serialize;

use crate::graph::TransactionGraph;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NodeView {
    pub address: String,
    pub balance: f64,
    pub display_size: u32,
    pub degree: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EdgeView {
    pub source: String,
    pub target: String,
    pub weight: f64,
    pub sequence: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GraphExport {
    pub nodes: Vec<NodeView>,
    pub edges: Vec<EdgeView>,
}

impl GraphExport {
    pub fn from_graph(graph: &TransactionGraph) -> Self {
        let nodes = graph
            .graph
            .node_indices()
            .map(|ix| {
                let node = &graph.graph[ix];
                NodeView {
                    address: node.address.clone(),
                    balance: node.balance,
                    display_size: node.display_size,
                    degree: graph.degree_of(ix),
                }
            })
            .collect();

        let edges = graph
            .edges()
            .map(|edge| EdgeView {
                source: edge.source.to_string(),
                target: edge.target.to_string(),
                weight: edge.transfer.amount,
                sequence: edge.transfer.sequence,
            })
            .collect();

        Self { nodes, edges }
    }
}
