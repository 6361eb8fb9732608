//! Cosmos read capability over the LCD REST API

use std::time::Duration;

use alloy::primitives::Bytes;
use async_trait::async_trait;
use eyre::{eyre, Result, WrapErr};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::address_codec::decode_bech32_address;
use crate::capability::ChainReader;
use crate::config::CosmosConfig;
use crate::cosmos::contracts::{
    Cw20QueryMsg, PredictWrappedTokenResponse, TokenInfoResponse, ZkgmQueryMsg,
};
use crate::types::{ChainType, ChannelEndpoint, TokenMetadata};

/// Read-only Cosmos client
pub struct CosmosReader {
    lcd_url: String,
    client: Client,
    native_denoms: Vec<String>,
}

impl CosmosReader {
    pub fn new(lcd_url: &str, native_denoms: Vec<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .wrap_err("Failed to create HTTP client")?;

        Ok(Self {
            lcd_url: lcd_url.trim_end_matches('/').to_string(),
            client,
            native_denoms,
        })
    }

    pub fn from_config(config: &CosmosConfig) -> Result<Self> {
        Self::new(&config.lcd_url, config.native_denoms.clone())
    }

    /// Generic smart contract query
    pub async fn query_contract<Q: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        contract_address: &str,
        query_msg: &Q,
    ) -> Result<R> {
        let query_json = serde_json::to_string(query_msg)?;
        let query_b64 =
            base64::Engine::encode(&base64::engine::general_purpose::STANDARD, query_json);

        let url = format!(
            "{}/cosmwasm/wasm/v1/contract/{}/smart/{}",
            self.lcd_url, contract_address, query_b64
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .wrap_err("Failed to query contract")?;

        if !response.status().is_success() {
            return Err(eyre!(
                "Query failed: {} - {}",
                response.status(),
                response.text().await.unwrap_or_default()
            ));
        }

        let data: serde_json::Value = response.json().await?;
        let query_data = data
            .get("data")
            .ok_or_else(|| eyre!("Missing 'data' field in response"))?;

        serde_json::from_value(query_data.clone()).wrap_err("Failed to parse query response")
    }
}

#[async_trait]
impl ChainReader for CosmosReader {
    fn chain_type(&self) -> ChainType {
        ChainType::Cosmos
    }

    fn native_token_metadata(&self, token: &str) -> Option<TokenMetadata> {
        self.native_denoms
            .iter()
            .any(|d| d == token)
            .then(|| TokenMetadata::native(token))
    }

    async fn read_token_metadata(&self, token: &str) -> Result<TokenMetadata> {
        decode_bech32_address(token)
            .wrap_err_with(|| format!("{} is neither a native denom nor a CW20 contract", token))?;

        let info: TokenInfoResponse = self
            .query_contract(token, &Cw20QueryMsg::TokenInfo {})
            .await
            .wrap_err("Failed to query CW20 token info")?;

        debug!(token = %token, symbol = %info.symbol, decimals = info.decimals, "Read CW20 metadata");

        Ok(TokenMetadata {
            symbol: info.symbol,
            name: info.name,
            decimals: info.decimals,
        })
    }

    async fn predict_quote_token(
        &self,
        endpoint: &ChannelEndpoint,
        base_token: &[u8],
    ) -> Result<Bytes> {
        let response: PredictWrappedTokenResponse = self
            .query_contract(
                &endpoint.contract,
                &ZkgmQueryMsg::predict_wrapped_token(endpoint.channel_id, base_token),
            )
            .await
            .wrap_err("Failed to predict wrapped token")?;

        let wrapped = response.wrapped_token_bytes()?;
        debug!(
            channel_id = endpoint.channel_id,
            wrapped = %String::from_utf8_lossy(&wrapped),
            "Predicted wrapped token"
        );
        Ok(Bytes::from(wrapped))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader() -> CosmosReader {
        CosmosReader::new("http://127.0.0.1:1317/", vec!["ubbn".to_string()]).unwrap()
    }

    #[test]
    fn test_native_denoms_bypass_lookup() {
        let reader = reader();
        let meta = reader.native_token_metadata("ubbn").unwrap();
        assert_eq!(meta.symbol, "ubbn");
        assert_eq!(meta.decimals, 0);
        assert!(reader.native_token_metadata("uatom").is_none());
    }

    #[test]
    fn test_lcd_url_trailing_slash_trimmed() {
        assert_eq!(reader().lcd_url, "http://127.0.0.1:1317");
    }

    #[tokio::test]
    async fn test_non_contract_token_fails_before_query() {
        let err = reader().read_token_metadata("uatom").await.unwrap_err();
        assert!(err.to_string().contains("neither a native denom nor a CW20 contract"));
    }
}
