//! Error taxonomy for graph construction and analysis.
//!
//! "Analysis ran and found nothing" is never an error: those outcomes are
//! `Ok(None)` or an empty collection. The variants here mean the analysis
//! could not run at all.

use thiserror::Error;
use txnet_data::RecordError;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GraphError {
    /// A record was missing a field, failed to parse, or violated a build policy.
    #[error("malformed record: {reason}")]
    MalformedRecord { reason: String },

    /// Statistics were requested on a graph without vertices.
    #[error("graph has no accounts")]
    EmptyGraph,

    /// No vertex has both an incoming and an outgoing transfer.
    #[error("no applicable accounts: none has both incoming and outgoing transfers")]
    NoCandidateSeed,

    /// A query named an address that is not a vertex of the graph.
    #[error("unknown address {address}")]
    UnknownAddress { address: String },

    /// Too few usable samples to fit a model.
    #[error("insufficient samples: need at least {needed}, found {found}")]
    InsufficientSamples { needed: usize, found: usize },
}

impl GraphError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        GraphError::MalformedRecord {
            reason: reason.into(),
        }
    }

    pub(crate) fn unknown(address: &str) -> Self {
        GraphError::UnknownAddress {
            address: address.to_string(),
        }
    }
}

impl From<RecordError> for GraphError {
    fn from(err: RecordError) -> Self {
        GraphError::malformed(err.to_string())
    }
}
