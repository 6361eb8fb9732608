//! EVM read capability
//!
//! Reads ERC20 metadata from the source chain and asks a destination zkgm
//! contract which wrapped token a base token maps to.

use std::sync::Arc;

use alloy::{
    primitives::{Address, Bytes, U256},
    providers::{ProviderBuilder, RootProvider},
    transports::http::{Client, Http},
};
use async_trait::async_trait;
use eyre::{eyre, Result, WrapErr};
use tracing::{debug, info};

use crate::address_codec::parse_evm_address;
use crate::capability::ChainReader;
use crate::config::EvmConfig;
use crate::evm::contracts::ERC20;
use crate::instruction::abi::IZkgm;
use crate::types::{ChainType, ChannelEndpoint, TokenMetadata};

/// Read-only EVM client
pub struct EvmReader {
    provider: Arc<RootProvider<Http<Client>>>,
}

impl EvmReader {
    /// Create a new read-only EVM client
    pub fn new(rpc_url: &str) -> Result<Self> {
        let provider = ProviderBuilder::new().on_http(
            rpc_url
                .parse()
                .map_err(|e| eyre!("Invalid RPC URL: {}", e))?,
        );

        info!(rpc_url = %rpc_url, "Created EVM reader");

        Ok(Self {
            provider: Arc::new(provider),
        })
    }

    pub fn from_config(config: &EvmConfig) -> Result<Self> {
        Self::new(&config.rpc_url)
    }
}

#[async_trait]
impl ChainReader for EvmReader {
    fn chain_type(&self) -> ChainType {
        ChainType::Evm
    }

    async fn read_token_metadata(&self, token: &str) -> Result<TokenMetadata> {
        let token_address = Address::from(parse_evm_address(token)?);
        let contract = ERC20::new(token_address, self.provider.clone());

        let (name, symbol, decimals) = tokio::try_join!(
            async {
                contract
                    .name()
                    .call()
                    .await
                    .map(|r| r._0)
                    .map_err(|e| eyre!("Failed to get name: {}", e))
            },
            async {
                contract
                    .symbol()
                    .call()
                    .await
                    .map(|r| r._0)
                    .map_err(|e| eyre!("Failed to get symbol: {}", e))
            },
            async {
                contract
                    .decimals()
                    .call()
                    .await
                    .map(|r| r._0)
                    .map_err(|e| eyre!("Failed to get decimals: {}", e))
            }
        )?;

        debug!(token = %token_address, symbol = %symbol, decimals = decimals, "Read ERC20 metadata");

        Ok(TokenMetadata {
            symbol,
            name,
            decimals,
        })
    }

    async fn predict_quote_token(
        &self,
        endpoint: &ChannelEndpoint,
        base_token: &[u8],
    ) -> Result<Bytes> {
        let zkgm = Address::from(
            parse_evm_address(&endpoint.contract).wrap_err("Invalid zkgm contract address")?,
        );
        let contract = IZkgm::new(zkgm, self.provider.clone());

        let predicted = contract
            .predictWrappedToken(
                U256::ZERO,
                endpoint.channel_id,
                Bytes::copy_from_slice(base_token),
            )
            .call()
            .await
            .map_err(|e| eyre!("Failed to predict wrapped token: {}", e))?;

        debug!(
            channel_id = endpoint.channel_id,
            wrapped = %predicted._0,
            "Predicted wrapped token"
        );

        Ok(Bytes::copy_from_slice(predicted._0.as_slice()))
    }
}
