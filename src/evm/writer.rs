//! EVM write capability
//!
//! Signs with a local private key. Nonce, gas price and gas limit are filled
//! explicitly before each send; receipts are polled separately so a
//! submission can record the hash before waiting.

use std::sync::Arc;
use std::time::{Duration, Instant};

use alloy::{
    network::{Ethereum, EthereumWallet, TransactionBuilder},
    primitives::{Address, Bytes, B256, U256},
    providers::{
        fillers::{FillProvider, JoinFill, WalletFiller},
        Identity, Provider, ProviderBuilder, RootProvider,
    },
    rpc::types::TransactionRequest,
    signers::local::PrivateKeySigner,
    sol_types::SolCall,
    transports::http::{Client, Http},
};
use async_trait::async_trait;
use eyre::{eyre, Result, WrapErr};
use tracing::{debug, info};

use crate::address_codec::parse_evm_address;
use crate::capability::{ChainWriter, SendRequest};
use crate::config::EvmConfig;
use crate::evm::contracts::ERC20;
use crate::instruction::{abi::IZkgm, decode_envelope};
use crate::types::{ChainType, Receipt, TxHash};

type SignerProvider = FillProvider<
    JoinFill<Identity, WalletFiller<EthereumWallet>>,
    RootProvider<Http<Client>>,
    Http<Client>,
    Ethereum,
>;

const RECEIPT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Signing EVM client
pub struct EvmWriter {
    provider: Arc<SignerProvider>,
    address: Address,
    chain_id: u64,
    receipt_timeout: Duration,
    timeout_height: u64,
    timeout_timestamp: u64,
}

impl EvmWriter {
    pub fn new(config: &EvmConfig) -> Result<Self> {
        let private_key = config
            .private_key
            .as_ref()
            .ok_or_else(|| eyre!("EVM_PRIVATE_KEY is required for the EVM writer"))?;
        let signer: PrivateKeySigner = private_key
            .expose()
            .parse()
            .map_err(|e| eyre!("Invalid private key: {}", e))?;

        let address = signer.address();
        let wallet = EthereumWallet::from(signer);

        let provider = ProviderBuilder::new().wallet(wallet).on_http(
            config
                .rpc_url
                .parse()
                .map_err(|e| eyre!("Invalid RPC URL: {}", e))?,
        );

        info!(
            address = %address,
            chain_id = config.chain_id,
            "EVM writer initialized"
        );

        Ok(Self {
            provider: Arc::new(provider),
            address,
            chain_id: config.chain_id,
            receipt_timeout: config.receipt_timeout,
            timeout_height: config.timeout_height,
            timeout_timestamp: config.timeout_timestamp,
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Fill and send a contract call, returning as soon as it is accepted
    async fn send_call(&self, to: Address, data: Vec<u8>) -> Result<TxHash> {
        let nonce = self
            .provider
            .get_transaction_count(self.address)
            .await
            .wrap_err("Failed to get nonce")?;
        let gas_price = self
            .provider
            .get_gas_price()
            .await
            .wrap_err("Failed to get gas price")?;

        let tx = build_call(self.address, to, data, nonce, gas_price, self.chain_id);

        let gas = self
            .provider
            .estimate_gas(&tx)
            .await
            .wrap_err("Failed to estimate gas")?;
        let tx = tx.with_gas_limit(gas);

        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .wrap_err("Failed to send transaction")?;

        let hash = pending.tx_hash().to_string();
        debug!(tx_hash = %hash, to = %to, nonce = nonce, "Transaction sent");
        Ok(TxHash(hash))
    }
}

/// Unsigned call with everything but the gas limit filled
fn build_call(
    from: Address,
    to: Address,
    data: Vec<u8>,
    nonce: u64,
    gas_price: u128,
    chain_id: u64,
) -> TransactionRequest {
    TransactionRequest::default()
        .with_from(from)
        .with_to(to)
        .with_input(Bytes::from(data))
        .with_nonce(nonce)
        .with_gas_price(gas_price)
        .with_chain_id(chain_id)
}

#[async_trait]
impl ChainWriter for EvmWriter {
    fn chain_type(&self) -> ChainType {
        ChainType::Evm
    }

    async fn switch_chain(&self) -> Result<()> {
        let remote = self
            .provider
            .get_chain_id()
            .await
            .wrap_err("Failed to get chain ID")?;
        if remote != self.chain_id {
            return Err(eyre!(
                "Signer RPC is on chain {}, expected {}",
                remote,
                self.chain_id
            ));
        }
        Ok(())
    }

    async fn allowance(&self, token: &str, spender: &str) -> Result<U256> {
        let token = Address::from(parse_evm_address(token)?);
        let spender = Address::from(parse_evm_address(spender)?);
        let contract = ERC20::new(token, self.provider.clone());
        let allowance = contract
            .allowance(self.address, spender)
            .call()
            .await
            .map_err(|e| eyre!("Failed to get allowance: {}", e))?;
        Ok(allowance._0)
    }

    async fn approve_allowance(&self, token: &str, spender: &str, amount: U256) -> Result<TxHash> {
        let token_address = Address::from(parse_evm_address(token)?);
        let spender = Address::from(parse_evm_address(spender)?);
        let data = ERC20::approveCall { spender, amount }.abi_encode();

        let hash = self.send_call(token_address, data).await?;
        info!(token = %token_address, spender = %spender, amount = %amount, tx_hash = %hash, "Approval sent");
        Ok(hash)
    }

    async fn submit(&self, request: &SendRequest) -> Result<TxHash> {
        if !request.funds.is_empty() {
            return Err(eyre!("EVM sends do not attach native funds"));
        }
        let zkgm = Address::from(
            parse_evm_address(&request.endpoint.contract)
                .wrap_err("Invalid zkgm contract address")?,
        );
        let instruction = decode_envelope(&request.instruction)
            .map_err(|e| eyre!("Invalid instruction envelope: {}", e))?;

        let data = IZkgm::sendCall {
            channelId: request.endpoint.channel_id,
            timeoutHeight: self.timeout_height,
            timeoutTimestamp: self.timeout_timestamp,
            salt: request.salt,
            instruction,
        }
        .abi_encode();

        let hash = self.send_call(zkgm, data).await?;
        info!(
            zkgm = %zkgm,
            channel_id = request.endpoint.channel_id,
            tx_hash = %hash,
            "Instruction sent"
        );
        Ok(hash)
    }

    async fn await_receipt(&self, tx_hash: &TxHash) -> Result<Receipt> {
        let hash: B256 = tx_hash
            .0
            .parse()
            .map_err(|e| eyre!("Invalid transaction hash {}: {}", tx_hash, e))?;
        let start = Instant::now();

        while start.elapsed() < self.receipt_timeout {
            if let Some(receipt) = self
                .provider
                .get_transaction_receipt(hash)
                .await
                .wrap_err("Failed to get transaction receipt")?
            {
                if !receipt.status() {
                    return Err(eyre!("Transaction {} reverted", tx_hash));
                }
                debug!(tx_hash = %tx_hash, block = ?receipt.block_number, "Transaction confirmed");
                return Ok(Receipt {
                    tx_hash: tx_hash.clone(),
                    height: receipt.block_number,
                });
            }
            tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
        }

        Err(eyre!(
            "Transaction {} not confirmed after {:?}",
            tx_hash,
            self.receipt_timeout
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::redact::Redacted;

    fn config(private_key: Option<&str>) -> EvmConfig {
        EvmConfig {
            rpc_url: "http://127.0.0.1:8545".to_string(),
            chain_id: 31337,
            private_key: private_key.map(|k| Redacted(k.to_string())),
            receipt_timeout: Duration::from_secs(1),
            timeout_height: 0,
            timeout_timestamp: 1_000_000_000_000,
        }
    }

    #[test]
    fn test_writer_derives_signer_address() {
        let writer = EvmWriter::new(&config(Some(
            "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
        )))
        .unwrap();
        assert_eq!(
            writer.address(),
            Address::from(parse_evm_address("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266").unwrap())
        );
    }

    #[test]
    fn test_build_call_fills_fields() {
        let from = Address::repeat_byte(0x11);
        let to = Address::repeat_byte(0x22);
        let tx = build_call(from, to, vec![0xde, 0xad], 7, 1_000_000_000, 31337);

        assert_eq!(tx.from, Some(from));
        assert_eq!(tx.to, Some(to.into()));
        assert_eq!(tx.input.input(), Some(&Bytes::from(vec![0xde, 0xad])));
        assert_eq!(tx.nonce, Some(7));
        assert_eq!(tx.gas_price, Some(1_000_000_000));
        assert_eq!(tx.chain_id, Some(31337));
        assert_eq!(tx.gas, None);
    }

    #[test]
    fn test_writer_requires_private_key() {
        let err = EvmWriter::new(&config(None)).err().unwrap();
        assert!(err.to_string().contains("EVM_PRIVATE_KEY"));
    }
}
