//! EVM Chain Module
//!
//! Capability implementations for EVM chains backed by alloy.
//!
//! ## Submodules
//!
//! - `contracts` - ERC20 ABI bindings
//! - `reader` - Read capability: ERC20 metadata and zkgm wrapped-token prediction
//! - `writer` - Write capability: approvals, `send`, receipt polling

pub mod contracts;
pub mod reader;
pub mod writer;

pub use reader::EvmReader;
pub use writer::EvmWriter;
