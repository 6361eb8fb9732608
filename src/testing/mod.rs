//! In-memory chain capabilities for tests
//!
//! [`MockChainReader`] and [`MockChainWriter`] implement the capability traits
//! from scripted data and record every call, so tests can assert which chain
//! interactions happened and in what order.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use alloy::primitives::{Bytes, B256, U256};
use async_trait::async_trait;
use eyre::{eyre, Result};

use crate::capability::{ChainReader, ChainWriter, SendRequest};
use crate::types::{ChainType, ChannelEndpoint, Receipt, TokenMetadata, TxHash};

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ============================================================================
// Reader
// ============================================================================

/// Scripted [`ChainReader`]
///
/// Unknown tokens fail metadata reads; predictions fail unless a quote was
/// registered for the token or a default quote is set.
pub struct MockChainReader {
    chain_type: ChainType,
    tokens: HashMap<String, TokenMetadata>,
    native_denoms: Vec<String>,
    quotes: HashMap<Vec<u8>, Bytes>,
    default_quote: Option<Bytes>,
    metadata_delays: HashMap<String, Duration>,
    calls: AtomicUsize,
    predictions: Mutex<Vec<(u32, Vec<u8>)>>,
}

impl MockChainReader {
    pub fn new(chain_type: ChainType) -> Self {
        Self {
            chain_type,
            tokens: HashMap::new(),
            native_denoms: Vec::new(),
            quotes: HashMap::new(),
            default_quote: None,
            metadata_delays: HashMap::new(),
            calls: AtomicUsize::new(0),
            predictions: Mutex::new(Vec::new()),
        }
    }

    pub fn with_token(mut self, token: &str, metadata: TokenMetadata) -> Self {
        self.tokens.insert(token.to_string(), metadata);
        self
    }

    pub fn with_native_denom(mut self, denom: &str) -> Self {
        self.native_denoms.push(denom.to_string());
        self
    }

    pub fn with_quote(mut self, base_token: &[u8], quote: &[u8]) -> Self {
        self.quotes
            .insert(base_token.to_vec(), Bytes::copy_from_slice(quote));
        self
    }

    pub fn with_default_quote(mut self, quote: &[u8]) -> Self {
        self.default_quote = Some(Bytes::copy_from_slice(quote));
        self
    }

    /// Delay the metadata read of one token
    pub fn with_metadata_delay(mut self, token: &str, delay: Duration) -> Self {
        self.metadata_delays.insert(token.to_string(), delay);
        self
    }

    /// Number of chain queries issued (native bypasses excluded)
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// `(channel_id, base_token)` of every prediction request
    pub fn prediction_log(&self) -> Vec<(u32, Vec<u8>)> {
        lock(&self.predictions).clone()
    }
}

#[async_trait]
impl ChainReader for MockChainReader {
    fn chain_type(&self) -> ChainType {
        self.chain_type
    }

    fn native_token_metadata(&self, token: &str) -> Option<TokenMetadata> {
        self.native_denoms
            .iter()
            .any(|d| d == token)
            .then(|| TokenMetadata::native(token))
    }

    async fn read_token_metadata(&self, token: &str) -> Result<TokenMetadata> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.metadata_delays.get(token) {
            tokio::time::sleep(*delay).await;
        }
        self.tokens
            .get(token)
            .cloned()
            .ok_or_else(|| eyre!("token {} not found", token))
    }

    async fn predict_quote_token(
        &self,
        endpoint: &ChannelEndpoint,
        base_token: &[u8],
    ) -> Result<Bytes> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.predictions).push((endpoint.channel_id, base_token.to_vec()));
        self.quotes
            .get(base_token)
            .or(self.default_quote.as_ref())
            .cloned()
            .ok_or_else(|| eyre!("no wrapped token for 0x{}", hex::encode(base_token)))
    }
}

// ============================================================================
// Writer
// ============================================================================

/// Chain interactions recorded by [`MockChainWriter`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WriterCall {
    SwitchChain,
    Allowance { token: String },
    Approve { token: String, amount: U256 },
    Submit { salt: B256 },
    AwaitReceipt { tx_hash: TxHash },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriterOp {
    SwitchChain,
    Allowance,
    Approve,
    Submit,
    AwaitReceipt,
}

/// Scripted [`ChainWriter`]
///
/// Approvals set the allowance they grant. Hashes are sequential.
pub struct MockChainWriter {
    chain_type: ChainType,
    allowances: Mutex<HashMap<String, U256>>,
    failures: Mutex<HashMap<WriterOp, usize>>,
    calls: Mutex<Vec<WriterCall>>,
    submitted: Mutex<Vec<SendRequest>>,
    next_hash: AtomicU64,
}

impl MockChainWriter {
    pub fn new(chain_type: ChainType) -> Self {
        Self {
            chain_type,
            allowances: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            submitted: Mutex::new(Vec::new()),
            next_hash: AtomicU64::new(1),
        }
    }

    pub fn with_allowance(self, token: &str, amount: U256) -> Self {
        lock(&self.allowances).insert(token.to_string(), amount);
        self
    }

    /// Make the next `times` calls of `op` fail
    pub fn fail_next(&self, op: WriterOp, times: usize) {
        lock(&self.failures).insert(op, times);
    }

    pub fn calls(&self) -> Vec<WriterCall> {
        lock(&self.calls).clone()
    }

    pub fn submitted(&self) -> Vec<SendRequest> {
        lock(&self.submitted).clone()
    }

    fn record(&self, op: WriterOp, call: WriterCall) -> Result<()> {
        lock(&self.calls).push(call);
        let mut failures = lock(&self.failures);
        match failures.get_mut(&op) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                Err(eyre!("scripted {:?} failure", op))
            }
            _ => Ok(()),
        }
    }

    fn fresh_hash(&self) -> TxHash {
        let n = self.next_hash.fetch_add(1, Ordering::SeqCst);
        TxHash(format!("0x{:064x}", n))
    }
}

#[async_trait]
impl ChainWriter for MockChainWriter {
    fn chain_type(&self) -> ChainType {
        self.chain_type
    }

    async fn switch_chain(&self) -> Result<()> {
        self.record(WriterOp::SwitchChain, WriterCall::SwitchChain)
    }

    async fn allowance(&self, token: &str, _spender: &str) -> Result<U256> {
        self.record(
            WriterOp::Allowance,
            WriterCall::Allowance {
                token: token.to_string(),
            },
        )?;
        Ok(lock(&self.allowances)
            .get(token)
            .copied()
            .unwrap_or(U256::ZERO))
    }

    async fn approve_allowance(&self, token: &str, _spender: &str, amount: U256) -> Result<TxHash> {
        self.record(
            WriterOp::Approve,
            WriterCall::Approve {
                token: token.to_string(),
                amount,
            },
        )?;
        lock(&self.allowances).insert(token.to_string(), amount);
        Ok(self.fresh_hash())
    }

    async fn submit(&self, request: &SendRequest) -> Result<TxHash> {
        self.record(
            WriterOp::Submit,
            WriterCall::Submit {
                salt: request.salt,
            },
        )?;
        lock(&self.submitted).push(request.clone());
        Ok(self.fresh_hash())
    }

    async fn await_receipt(&self, tx_hash: &TxHash) -> Result<Receipt> {
        self.record(
            WriterOp::AwaitReceipt,
            WriterCall::AwaitReceipt {
                tx_hash: tx_hash.clone(),
            },
        )?;
        Ok(Receipt {
            tx_hash: tx_hash.clone(),
            height: Some(100),
        })
    }
}
