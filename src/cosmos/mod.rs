//! Cosmos chain adapters
//!
//! LCD-backed implementations of the chain capabilities for CosmWasm chains
//! hosting a zkgm contract.
//!
//! ## Submodules
//!
//! - `contracts`: zkgm and CW20 JSON messages
//! - `reader`: CW20 metadata and wrapped-token prediction
//! - `writer`: mnemonic signer submitting `send` with attached funds

pub mod contracts;
pub mod reader;
pub mod writer;

pub use reader::CosmosReader;
pub use writer::CosmosWriter;
