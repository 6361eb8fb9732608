//! Chain capabilities consumed by the core
//!
//! Order building only reads from chains; submission writes to one. Both are
//! passed in explicitly per call so tests can substitute in-memory fakes.

use alloy::primitives::{Bytes, B256, U256};
use async_trait::async_trait;
use eyre::{eyre, Result};
use serde::{Deserialize, Serialize};

use crate::types::{ChainType, ChannelEndpoint, Receipt, TokenMetadata, TxHash};

/// Read-only access to one chain
#[async_trait]
pub trait ChainReader: Send + Sync {
    fn chain_type(&self) -> ChainType;

    /// Hardcoded metadata for the chain's native fee tokens
    fn native_token_metadata(&self, _token: &str) -> Option<TokenMetadata> {
        None
    }

    /// Read symbol/name/decimals from the token contract
    async fn read_token_metadata(&self, token: &str) -> Result<TokenMetadata>;

    /// Identifier the wrapped form of `base_token` will have on this chain
    ///
    /// `base_token` is the canonical zkgm bytes on the source chain and
    /// `endpoint` is this chain's side of the channel.
    async fn predict_quote_token(&self, endpoint: &ChannelEndpoint, base_token: &[u8])
        -> Result<Bytes>;
}

/// Native coins attached to a `send`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Funds {
    pub denom: String,
    pub amount: u128,
}

/// Everything a writer needs to submit one encoded instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendRequest {
    /// ABI envelope produced by `instruction::encode`
    pub instruction: Bytes,
    /// Source side of the channel
    pub endpoint: ChannelEndpoint,
    pub salt: B256,
    pub funds: Vec<Funds>,
}

/// Signing access to one chain
#[async_trait]
pub trait ChainWriter: Send + Sync {
    fn chain_type(&self) -> ChainType;

    /// Ensure the signer is connected to the configured chain
    async fn switch_chain(&self) -> Result<()>;

    async fn allowance(&self, _token: &str, _spender: &str) -> Result<U256> {
        Err(eyre!("{} chains have no allowance model", self.chain_type()))
    }

    async fn approve_allowance(&self, _token: &str, _spender: &str, _amount: U256) -> Result<TxHash> {
        Err(eyre!("{} chains have no allowance model", self.chain_type()))
    }

    async fn submit(&self, request: &SendRequest) -> Result<TxHash>;

    /// Wait for inclusion; fails if the transaction reverted or timed out
    async fn await_receipt(&self, tx_hash: &TxHash) -> Result<Receipt>;
}
