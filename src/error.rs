//! Error taxonomy for order construction and submission
//!
//! Compose-time failures abort the whole batch and surface as [`OrderError`].
//! Submission-time failures never propagate as errors: they are recorded as a
//! [`StepFailure`] inside the failed step so the caller can resume it.

use thiserror::Error;

use crate::types::ChainType;

/// Boxed cause carried by capability failures
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while building orders and composing batches
#[derive(Debug, Error)]
pub enum OrderError {
    /// The intent's base amount is zero
    #[error("Invalid amount: base amount must be greater than zero")]
    InvalidAmount,

    /// No dispatch arm exists for the chain pair
    #[error("Unsupported chain pair: {source_chain} -> {destination_chain}")]
    UnsupportedChainPair {
        source_chain: ChainType,
        destination_chain: ChainType,
    },

    /// Reading token metadata on the source chain failed
    #[error("Failed to resolve metadata for token {token}")]
    MetadataResolution {
        token: String,
        #[source]
        cause: BoxError,
    },

    /// Predicting the wrapped token on the destination chain failed
    #[error("Failed to predict quote token for {token}")]
    QuotePrediction {
        token: String,
        #[source]
        cause: BoxError,
    },

    /// An intent address does not parse for its chain family
    #[error("Invalid {chain} address {address}: {reason}")]
    InvalidAddress {
        chain: ChainType,
        address: String,
        reason: String,
    },

    /// A base token identifier cannot be canonicalized
    #[error("Invalid {chain} token {token}: {reason}")]
    InvalidToken {
        chain: ChainType,
        token: String,
        reason: String,
    },

    /// The channel's port ids cannot be mapped to contract addresses
    #[error("Invalid channel: {0}")]
    InvalidChannel(String),

    /// A capability was bound to the wrong chain family
    #[error("Capability mismatch: expected {expected} client, got {actual}")]
    CapabilityMismatch {
        expected: ChainType,
        actual: ChainType,
    },
}

impl OrderError {
    /// Whether retrying the same request can succeed
    ///
    /// Read failures may be transient; everything else is a property of the
    /// request or of the dispatch table.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            OrderError::MetadataResolution { .. } | OrderError::QuotePrediction { .. }
        )
    }
}

/// Reason a submission step failed, kept in the step's `Failed` state
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{step} failed: {reason}")]
pub struct StepFailure {
    pub step: &'static str,
    pub reason: String,
}

impl StepFailure {
    pub fn new(step: &'static str, reason: impl Into<String>) -> Self {
        Self {
            step,
            reason: reason.into(),
        }
    }

    /// Capture an eyre report with its full context chain
    pub fn from_report(step: &'static str, report: &eyre::Report) -> Self {
        Self::new(step, format!("{:#}", report))
    }
}
