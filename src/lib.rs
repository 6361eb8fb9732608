//! zkgm-rs: Cross-Chain Fungible Asset Transfers over zkgm
//!
//! This crate turns user transfer intents into zkgm instructions and drives
//! them on-chain:
//!
//! - **Types** - Chain families, typed intents, channels, token metadata
//! - **Order Building** - Token metadata resolution and quote token prediction
//! - **Batch Composition** - Dispatch over source/destination chain families
//! - **Instruction Codec** - ABI envelope encoding with a lossless decode
//! - **Submission** - Resumable per-step state machine with an observer
//! - **EVM Module** - alloy-backed reader and signer
//! - **Cosmos Module** - LCD-backed reader and cosmrs signer
//! - **Testing Module** - In-memory chain fakes
//!
//! ## Feature Flags
//!
//! - `evm` - Enable EVM chain support (default)
//! - `cosmos` - Enable Cosmos chain support (default)
//! - `testing` - Enable in-memory chain fakes
//! - `full` - Enable all features

// Core modules (always available)
pub mod address_codec;
pub mod batch;
pub mod capability;
pub mod config;
pub mod error;
pub mod hash;
pub mod instruction;
pub mod order;
pub mod redact;
pub mod submission;
pub mod types;

// Chain-specific modules (feature-gated)
#[cfg(feature = "evm")]
pub mod evm;

#[cfg(feature = "cosmos")]
pub mod cosmos;

// Testing utilities (feature-gated)
#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export commonly used items at the crate root
pub use batch::{compose_batch, strategy_for, BatchRequest, Route, Strategy, DISPATCH_TABLE};
pub use capability::{ChainReader, ChainWriter, Funds, SendRequest};
pub use config::{Config, CosmosConfig, EvmConfig};
pub use error::{OrderError, StepFailure};
pub use instruction::{decode, encode, Batch, DecodeError, FungibleAssetOrder, Instruction};
pub use order::{build_order, predict_quote_token, resolve_token_metadata};
pub use submission::{
    advance, CosmosSubmission, EvmSubmission, StepState, SubmissionArgs, TransferState,
};
pub use types::{
    ChainAddress, ChainType, Channel, ChannelEndpoint, CosmosAddress, RawTransferIntent, Receipt,
    TokenMetadata, TransferIntent, TxHash,
};

#[cfg(feature = "evm")]
pub use evm::{EvmReader, EvmWriter};

#[cfg(feature = "cosmos")]
pub use cosmos::{CosmosReader, CosmosWriter};
