//! CosmWasm message definitions
//!
//! JSON shapes of the zkgm contract's `send` / `predict_wrapped_token` entry
//! points and the CW20 `token_info` query.

use eyre::{eyre, Result};
use serde::{Deserialize, Serialize};

// ============================================================================
// zkgm
// ============================================================================

/// Execute messages for the zkgm contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZkgmExecuteMsg {
    Send {
        channel_id: u32,
        timeout_height: u64,
        /// Nanoseconds; zero disables the timestamp timeout
        timeout_timestamp: u64,
        /// 0x-prefixed 32 byte hex
        salt: String,
        /// 0x-prefixed ABI envelope hex
        instruction: String,
    },
}

/// Query messages for the zkgm contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZkgmQueryMsg {
    PredictWrappedToken {
        /// Decimal string of the channel path; "0" for a direct hop
        path: String,
        channel: u32,
        /// Canonical base token bytes, 0x-prefixed hex
        token: String,
    },
}

impl ZkgmQueryMsg {
    pub fn predict_wrapped_token(channel: u32, base_token: &[u8]) -> Self {
        ZkgmQueryMsg::PredictWrappedToken {
            path: "0".to_string(),
            channel,
            token: format!("0x{}", hex::encode(base_token)),
        }
    }
}

/// Response to `predict_wrapped_token`
#[derive(Debug, Clone, Deserialize)]
pub struct PredictWrappedTokenResponse {
    /// UTF-8 denom of the wrapped token, 0x-prefixed hex
    pub wrapped_token: String,
}

impl PredictWrappedTokenResponse {
    pub fn wrapped_token_bytes(&self) -> Result<Vec<u8>> {
        let raw = self
            .wrapped_token
            .strip_prefix("0x")
            .ok_or_else(|| eyre!("wrapped_token is not 0x-prefixed: {}", self.wrapped_token))?;
        hex::decode(raw).map_err(|e| eyre!("Invalid hex in wrapped_token: {}", e))
    }
}

// ============================================================================
// CW20
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cw20QueryMsg {
    TokenInfo {},
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenInfoResponse {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    #[serde(default)]
    pub total_supply: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::{decode_hex, encode_hex, Batch, FungibleAssetOrder, Instruction};
    use alloy::primitives::{Bytes, U256};

    #[test]
    fn test_send_msg_json_shape() {
        let msg = ZkgmExecuteMsg::Send {
            channel_id: 7,
            timeout_height: 10_000_000,
            timeout_timestamp: 0,
            salt: format!("0x{}", "11".repeat(32)),
            instruction: "0x00".to_string(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["send"]["channel_id"], 7);
        assert_eq!(json["send"]["timeout_height"], 10_000_000);
        assert_eq!(json["send"]["timeout_timestamp"], 0);
        assert!(json["send"]["salt"].as_str().unwrap().starts_with("0x"));
    }

    #[test]
    fn test_send_msg_carries_decodable_instruction() {
        let instruction: Instruction = Batch::new(vec![FungibleAssetOrder {
            sender: Bytes::copy_from_slice(b"union1sender"),
            receiver: Bytes::from_static(&[0x22; 20]),
            base_token: Bytes::copy_from_slice(b"muno"),
            base_amount: U256::from(10u64),
            base_token_symbol: "muno".to_string(),
            base_token_name: "muno".to_string(),
            base_token_decimals: 0,
            source_channel_id: U256::ZERO,
            quote_token: Bytes::from_static(&[0x33; 20]),
            quote_amount: U256::from(10u64),
        }
        .into()])
        .into();

        let msg = ZkgmExecuteMsg::Send {
            channel_id: 1,
            timeout_height: 0,
            timeout_timestamp: 0,
            salt: format!("0x{}", "00".repeat(32)),
            instruction: encode_hex(&instruction),
        };
        let json = serde_json::to_string(&msg).unwrap();
        let parsed: ZkgmExecuteMsg = serde_json::from_str(&json).unwrap();

        let ZkgmExecuteMsg::Send { instruction: hex, .. } = parsed;
        assert_eq!(decode_hex(&hex).unwrap(), instruction);
    }

    #[test]
    fn test_predict_query_json_shape() {
        let msg = ZkgmQueryMsg::predict_wrapped_token(3, &[0xde, 0xad]);
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["predict_wrapped_token"]["path"], "0");
        assert_eq!(json["predict_wrapped_token"]["channel"], 3);
        assert_eq!(json["predict_wrapped_token"]["token"], "0xdead");

        let denom = ZkgmQueryMsg::predict_wrapped_token(3, b"muno");
        let json = serde_json::to_value(&denom).unwrap();
        assert_eq!(json["predict_wrapped_token"]["token"], "0x6d756e6f");
    }

    #[test]
    fn test_predict_response_decodes_denom() {
        let response: PredictWrappedTokenResponse =
            serde_json::from_str(r#"{"wrapped_token":"0x756e696f6e31616263"}"#).unwrap();
        assert_eq!(response.wrapped_token_bytes().unwrap(), b"union1abc".to_vec());

        let bad: PredictWrappedTokenResponse =
            serde_json::from_str(r#"{"wrapped_token":"0xzz"}"#).unwrap();
        assert!(bad.wrapped_token_bytes().is_err());

        // base64 of the same denom must not be accepted as bytes
        let unprefixed: PredictWrappedTokenResponse =
            serde_json::from_str(r#"{"wrapped_token":"dW5pb24xYWJj"}"#).unwrap();
        assert!(unprefixed.wrapped_token_bytes().is_err());
    }

    #[test]
    fn test_token_info_query_json() {
        let json = serde_json::to_string(&Cw20QueryMsg::TokenInfo {}).unwrap();
        assert_eq!(json, r#"{"token_info":{}}"#);

        let response: TokenInfoResponse = serde_json::from_str(
            r#"{"name":"Muno","symbol":"MUNO","decimals":6,"total_supply":"1000"}"#,
        )
        .unwrap();
        assert_eq!(response.decimals, 6);
        assert_eq!(response.symbol, "MUNO");
    }
}
