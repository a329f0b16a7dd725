//! txnet-analysis crate
//!
//! Transaction-graph construction and the analyses that run over it:
//! return-cycle search, subnetwork discovery with partner ranking,
//! balance classification, degree/balance regression and export for
//! rendering.

pub mod balance;
pub mod cycles;
pub mod error;
pub mod export;
pub mod graph;
pub mod regression;
pub mod subnetwork;
pub mod units;

pub use error::GraphError;
pub use graph::{
    AccountNode, BuildOptions, BuildStats, DuplicatePolicy, EndpointPolicy, TransactionGraph,
    TransferEdge,
};
