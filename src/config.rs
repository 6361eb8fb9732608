//! Client configuration
//!
//! Loaded from environment variables, optionally seeded from a `.env` file.
//! Each chain section is optional and enabled by its endpoint variable
//! (`EVM_RPC_URL`, `COSMOS_LCD_URL`). Signer secrets are optional so a
//! read-only deployment can compose batches without them.

use std::env;
use std::path::Path;
use std::time::Duration;

use eyre::{eyre, Result, WrapErr};
use tracing::warn;

use crate::address_codec::validate_cosmos_token;
use crate::redact::Redacted;

pub const DEFAULT_COSMOS_DERIVATION_PATH: &str = "m/44'/118'/0'/0/0";

/// EVM chain configuration
#[derive(Debug, Clone)]
pub struct EvmConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    pub private_key: Option<Redacted<String>>,
    pub receipt_timeout: Duration,
    /// `timeoutHeight` passed to `send`
    pub timeout_height: u64,
    /// `timeoutTimestamp` passed to `send`, in nanoseconds
    pub timeout_timestamp: u64,
}

/// Cosmos chain configuration
#[derive(Debug, Clone)]
pub struct CosmosConfig {
    pub lcd_url: String,
    pub chain_id: String,
    pub mnemonic: Option<Redacted<String>>,
    pub bech32_prefix: String,
    pub derivation_path: String,
    pub fee_denom: String,
    pub gas_price: f64,
    pub gas_limit: u64,
    /// Denoms whose metadata is hardcoded and which travel as attached funds
    pub native_denoms: Vec<String>,
    pub timeout_height: u64,
    pub timeout_timestamp: u64,
    pub receipt_timeout: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub evm: Option<EvmConfig>,
    pub cosmos: Option<CosmosConfig>,
}

fn default_receipt_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_native_denoms() -> Vec<String> {
    vec!["ubbn".to_string(), "muno".to_string()]
}

impl Config {
    /// Load configuration from environment variables
    /// Loads .env file if present, then reads from environment
    pub fn load() -> Result<Self> {
        Self::load_from_file(".env")
    }

    /// Load from a specific .env file path
    pub fn load_from_file(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            dotenvy::from_filename(path)
                .wrap_err_with(|| format!("Failed to load .env file from {}", path))?;
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup
    pub fn from_lookup<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let parse_u64 = |key: &str| -> Result<Option<u64>> {
            get(key)
                .map(|v| {
                    v.trim()
                        .parse::<u64>()
                        .wrap_err_with(|| format!("{} must be a valid u64", key))
                })
                .transpose()
        };

        let evm = match get("EVM_RPC_URL") {
            None => None,
            Some(rpc_url) => Some(EvmConfig {
                rpc_url,
                chain_id: parse_u64("EVM_CHAIN_ID")?
                    .ok_or_else(|| eyre!("EVM_CHAIN_ID environment variable is required"))?,
                private_key: get("EVM_PRIVATE_KEY").map(Redacted),
                receipt_timeout: parse_u64("EVM_RECEIPT_TIMEOUT_SECS")?
                    .map(Duration::from_secs)
                    .unwrap_or_else(default_receipt_timeout),
                timeout_height: parse_u64("EVM_TIMEOUT_HEIGHT")?.unwrap_or(0),
                timeout_timestamp: parse_u64("EVM_TIMEOUT_TIMESTAMP")?
                    .unwrap_or(1_000_000_000_000),
            }),
        };

        let cosmos = match get("COSMOS_LCD_URL") {
            None => None,
            Some(lcd_url) => Some(CosmosConfig {
                lcd_url: lcd_url.trim_end_matches('/').to_string(),
                chain_id: get("COSMOS_CHAIN_ID")
                    .ok_or_else(|| eyre!("COSMOS_CHAIN_ID environment variable is required"))?,
                mnemonic: get("COSMOS_MNEMONIC").map(Redacted),
                bech32_prefix: get("COSMOS_BECH32_PREFIX").unwrap_or_else(|| "union".to_string()),
                derivation_path: get("COSMOS_DERIVATION_PATH")
                    .unwrap_or_else(|| DEFAULT_COSMOS_DERIVATION_PATH.to_string()),
                fee_denom: get("COSMOS_FEE_DENOM").unwrap_or_else(|| "muno".to_string()),
                gas_price: get("COSMOS_GAS_PRICE")
                    .map(|v| {
                        v.trim()
                            .parse::<f64>()
                            .wrap_err("COSMOS_GAS_PRICE must be a number")
                    })
                    .transpose()?
                    .unwrap_or(0.025),
                gas_limit: parse_u64("COSMOS_GAS_LIMIT")?.unwrap_or(500_000),
                native_denoms: get("COSMOS_NATIVE_DENOMS")
                    .map(|v| {
                        v.split(',')
                            .map(str::trim)
                            .filter(|d| !d.is_empty())
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_else(default_native_denoms),
                timeout_height: parse_u64("COSMOS_TIMEOUT_HEIGHT")?.unwrap_or(10_000_000),
                timeout_timestamp: parse_u64("COSMOS_TIMEOUT_TIMESTAMP")?.unwrap_or(0),
                receipt_timeout: parse_u64("COSMOS_RECEIPT_TIMEOUT_SECS")?
                    .map(Duration::from_secs)
                    .unwrap_or_else(default_receipt_timeout),
            }),
        };

        let config = Config { evm, cosmos };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if let Some(evm) = &self.evm {
            validate_rpc_url(&evm.rpc_url, "EVM_RPC_URL")?;
            if evm.chain_id == 0 {
                return Err(eyre!("EVM_CHAIN_ID cannot be 0"));
            }
            if let Some(key) = &evm.private_key {
                let key = key.expose();
                if key.len() != 66 || !key.starts_with("0x") {
                    return Err(eyre!("EVM_PRIVATE_KEY must be 66 chars (0x + 64 hex chars)"));
                }
            }
            if evm.timeout_height == 0 && evm.timeout_timestamp == 0 {
                return Err(eyre!("EVM send needs a timeout height or timestamp"));
            }
        }

        if let Some(cosmos) = &self.cosmos {
            validate_rpc_url(&cosmos.lcd_url, "COSMOS_LCD_URL")?;
            if cosmos.chain_id.is_empty() {
                return Err(eyre!("COSMOS_CHAIN_ID cannot be empty"));
            }
            if let Some(mnemonic) = &cosmos.mnemonic {
                if mnemonic.expose().split_whitespace().count() < 12 {
                    return Err(eyre!("COSMOS_MNEMONIC must have at least 12 words"));
                }
            }
            if cosmos.bech32_prefix.is_empty() {
                return Err(eyre!("COSMOS_BECH32_PREFIX cannot be empty"));
            }
            if !(cosmos.gas_price.is_finite() && cosmos.gas_price > 0.0) {
                return Err(eyre!("COSMOS_GAS_PRICE must be positive"));
            }
            validate_cosmos_token(&cosmos.fee_denom).wrap_err("Invalid COSMOS_FEE_DENOM")?;
            for denom in &cosmos.native_denoms {
                validate_cosmos_token(denom)
                    .wrap_err_with(|| format!("Invalid entry in COSMOS_NATIVE_DENOMS: {}", denom))?;
            }
            if cosmos.timeout_height == 0 && cosmos.timeout_timestamp == 0 {
                return Err(eyre!("Cosmos send needs a timeout height or timestamp"));
            }
        }

        Ok(())
    }
}

/// Validate that an endpoint URL is well-formed http(s)
pub fn validate_rpc_url(url_str: &str, name: &str) -> Result<()> {
    let parsed =
        url::Url::parse(url_str).map_err(|e| eyre!("{} must be a valid URL: {}", name, e))?;

    let scheme = parsed.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(eyre!(
            "{} must use http:// or https:// scheme, got {}",
            name,
            scheme
        ));
    }

    if parsed.host_str().is_none() {
        return Err(eyre!("{} must have a host component", name));
    }

    if scheme == "http" {
        warn!("{} uses unencrypted http://, use https:// in production", name);
    }

    Ok(())
}
