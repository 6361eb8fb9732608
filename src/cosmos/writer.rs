//! Cosmos write capability
//!
//! Signs `MsgExecuteContract` with a mnemonic-derived secp256k1 key and
//! broadcasts through the LCD in sync mode. Inclusion is polled separately
//! by [`ChainWriter::await_receipt`].
//!
//! Sequence mismatches surface as step failures; there is no automatic retry.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use bip39::Mnemonic;
use cosmrs::{
    bip32::DerivationPath,
    crypto::secp256k1::SigningKey,
    tx::{self, Fee, Msg, SignDoc, SignerInfo},
    AccountId, Coin,
};
use eyre::{eyre, Result, WrapErr};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::capability::{ChainWriter, SendRequest};
use crate::config::CosmosConfig;
use crate::cosmos::contracts::ZkgmExecuteMsg;
use crate::hash::bytes32_to_hex;
use crate::types::{ChainType, Receipt, TxHash};

/// Account info from LCD (sequence = nonce)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    pub sequence: u64,
    pub account_number: u64,
}

/// `tx_response` object returned by broadcast and tx lookups
#[derive(Debug, Clone, Deserialize)]
struct TxResponse {
    #[serde(default)]
    txhash: String,
    #[serde(default)]
    code: u32,
    #[serde(default)]
    height: String,
    #[serde(default)]
    raw_log: String,
}

/// Signing Cosmos client
pub struct CosmosWriter {
    signing_key: SigningKey,
    address: AccountId,
    lcd_url: String,
    chain_id: String,
    client: Client,
    fee_denom: String,
    gas_price: f64,
    gas_limit: u64,
    timeout_height: u64,
    timeout_timestamp: u64,
    receipt_timeout: Duration,
}

impl CosmosWriter {
    pub fn new(config: &CosmosConfig) -> Result<Self> {
        let mnemonic = config
            .mnemonic
            .as_ref()
            .ok_or_else(|| eyre!("COSMOS_MNEMONIC is required for the Cosmos writer"))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .wrap_err("Failed to create HTTP client")?;

        let mnemonic =
            Mnemonic::parse(mnemonic.expose()).map_err(|e| eyre!("Invalid mnemonic: {}", e))?;
        let seed = mnemonic.to_seed("");
        let path: DerivationPath = config
            .derivation_path
            .parse()
            .map_err(|e| eyre!("Invalid derivation path: {:?}", e))?;

        let signing_key = SigningKey::derive_from_path(seed, &path)
            .map_err(|e| eyre!("Failed to derive signing key: {}", e))?;

        let address = signing_key
            .public_key()
            .account_id(&config.bech32_prefix)
            .map_err(|e| eyre!("Failed to get account ID: {}", e))?;

        info!(
            address = %address,
            chain_id = %config.chain_id,
            gas_limit = config.gas_limit,
            "Cosmos writer initialized"
        );

        Ok(Self {
            signing_key,
            address,
            lcd_url: config.lcd_url.trim_end_matches('/').to_string(),
            chain_id: config.chain_id.clone(),
            client,
            fee_denom: config.fee_denom.clone(),
            gas_price: config.gas_price,
            gas_limit: config.gas_limit,
            timeout_height: config.timeout_height,
            timeout_timestamp: config.timeout_timestamp,
            receipt_timeout: config.receipt_timeout,
        })
    }

    pub fn address(&self) -> &AccountId {
        &self.address
    }

    fn fee_amount(&self) -> u128 {
        fee_amount(self.gas_limit, self.gas_price)
    }

    async fn get_json(&self, url: &str, what: &str) -> Result<serde_json::Value> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .wrap_err_with(|| format!("Failed to query {}", what))?;

        if !response.status().is_success() {
            return Err(eyre!(
                "{} query failed: {} - {}",
                what,
                response.status(),
                response.text().await.unwrap_or_default()
            ));
        }
        Ok(response.json().await?)
    }

    pub async fn get_account_info(&self) -> Result<AccountInfo> {
        let url = format!(
            "{}/cosmos/auth/v1beta1/accounts/{}",
            self.lcd_url, self.address
        );
        let data = self.get_json(&url, "account").await?;
        parse_account_info(&data)
    }

    // =========================================================================
    // Signing and Broadcasting
    // =========================================================================

    /// Sign and broadcast a CosmWasm execute message, returning the tx hash
    async fn sign_and_broadcast_execute(
        &self,
        contract_address: &str,
        msg: &impl Serialize,
        funds: &[(String, u128)],
    ) -> Result<TxHash> {
        let account_info = self.get_account_info().await?;
        let fee_amount = self.fee_amount();

        debug!(
            sequence = account_info.sequence,
            account_number = account_info.account_number,
            gas_limit = self.gas_limit,
            fee = fee_amount,
            "Signing Cosmos transaction"
        );

        let coins: Vec<Coin> = funds
            .iter()
            .map(|(denom, amount)| {
                let denom_parsed = denom
                    .parse()
                    .map_err(|e| eyre!("Invalid coin denom '{}': {}", denom, e))?;
                Ok::<_, eyre::Report>(Coin {
                    denom: denom_parsed,
                    amount: *amount,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let execute_msg = cosmrs::cosmwasm::MsgExecuteContract {
            sender: self.address.clone(),
            contract: contract_address
                .parse()
                .map_err(|e| eyre!("Invalid contract address: {:?}", e))?,
            msg: serde_json::to_vec(msg)?,
            funds: coins,
        };

        let body = tx::Body::new(
            vec![execute_msg
                .to_any()
                .map_err(|e| eyre!("Failed to convert message: {}", e))?],
            "",
            0u32,
        );

        let signer_info =
            SignerInfo::single_direct(Some(self.signing_key.public_key()), account_info.sequence);

        let fee = Fee::from_amount_and_gas(
            Coin {
                denom: self
                    .fee_denom
                    .parse()
                    .map_err(|e| eyre!("Invalid fee denom '{}': {}", self.fee_denom, e))?,
                amount: fee_amount,
            },
            self.gas_limit,
        );

        let auth_info = signer_info.auth_info(fee);

        let chain_id = self
            .chain_id
            .parse()
            .map_err(|_| eyre!("Invalid chain ID"))?;

        let sign_doc = SignDoc::new(&body, &auth_info, &chain_id, account_info.account_number)
            .map_err(|e| eyre!("Failed to create sign doc: {}", e))?;

        let tx_raw = sign_doc
            .sign(&self.signing_key)
            .map_err(|e| eyre!("Failed to sign transaction: {}", e))?;

        let tx_bytes = tx_raw
            .to_bytes()
            .map_err(|e| eyre!("Failed to serialize transaction: {}", e))?;

        self.broadcast(&tx_bytes).await
    }

    async fn broadcast(&self, tx_bytes: &[u8]) -> Result<TxHash> {
        let tx_b64 = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, tx_bytes);

        let broadcast_request = serde_json::json!({
            "tx_bytes": tx_b64,
            "mode": "BROADCAST_MODE_SYNC"
        });

        let broadcast_url = format!("{}/cosmos/tx/v1beta1/txs", self.lcd_url);

        let response = self
            .client
            .post(&broadcast_url)
            .json(&broadcast_request)
            .send()
            .await
            .wrap_err("Failed to broadcast transaction")?;

        let status = response.status();
        let body: serde_json::Value = response
            .json()
            .await
            .unwrap_or_else(|_| serde_json::json!({"error": "Failed to parse response"}));

        if !status.is_success() {
            return Err(eyre!("Broadcast failed (HTTP {}): {}", status, body));
        }

        let tx_response = parse_tx_response(&body)
            .ok_or_else(|| eyre!("Missing tx_response in broadcast result: {}", body))?;

        if tx_response.code != 0 {
            return Err(eyre!(
                "Transaction rejected (code {}): {}",
                tx_response.code,
                tx_response.raw_log
            ));
        }
        if tx_response.txhash.is_empty() {
            return Err(eyre!("Broadcast result has no txhash: {}", body));
        }

        info!(txhash = %tx_response.txhash, "Transaction broadcast");
        Ok(TxHash(tx_response.txhash))
    }
}

#[async_trait]
impl ChainWriter for CosmosWriter {
    fn chain_type(&self) -> ChainType {
        ChainType::Cosmos
    }

    async fn switch_chain(&self) -> Result<()> {
        let url = format!("{}/cosmos/base/tendermint/v1beta1/node_info", self.lcd_url);
        let data = self.get_json(&url, "node info").await?;
        let network = data
            .get("default_node_info")
            .and_then(|n| n.get("network"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| eyre!("Missing network in node info"))?;

        if network != self.chain_id {
            return Err(eyre!(
                "LCD serves chain {}, expected {}",
                network,
                self.chain_id
            ));
        }
        Ok(())
    }

    async fn submit(&self, request: &SendRequest) -> Result<TxHash> {
        let msg = ZkgmExecuteMsg::Send {
            channel_id: request.endpoint.channel_id,
            timeout_height: self.timeout_height,
            timeout_timestamp: self.timeout_timestamp,
            salt: bytes32_to_hex(&request.salt.0),
            instruction: format!("0x{}", hex::encode(&request.instruction)),
        };
        let funds: Vec<(String, u128)> = request
            .funds
            .iter()
            .map(|f| (f.denom.clone(), f.amount))
            .collect();

        let hash = self
            .sign_and_broadcast_execute(&request.endpoint.contract, &msg, &funds)
            .await?;

        info!(
            zkgm = %request.endpoint.contract,
            channel_id = request.endpoint.channel_id,
            tx_hash = %hash,
            "Instruction sent"
        );
        Ok(hash)
    }

    async fn await_receipt(&self, tx_hash: &TxHash) -> Result<Receipt> {
        let initial_delay = Duration::from_millis(500);
        let max_delay = Duration::from_secs(3);

        let start = Instant::now();
        let mut delay = initial_delay;
        let tx_url = format!("{}/cosmos/tx/v1beta1/txs/{}", self.lcd_url, tx_hash);

        while start.elapsed() < self.receipt_timeout {
            tokio::time::sleep(delay).await;

            let response = self
                .client
                .get(&tx_url)
                .send()
                .await
                .wrap_err("Failed to query transaction status")?;

            if response.status().is_success() {
                let body: serde_json::Value = response.json().await?;
                if let Some(tx_response) = parse_tx_response(&body) {
                    if tx_response.code != 0 {
                        return Err(eyre!(
                            "Transaction {} failed (code {}): {}",
                            tx_hash,
                            tx_response.code,
                            tx_response.raw_log
                        ));
                    }
                    let height = tx_response.height.parse().ok();
                    debug!(txhash = %tx_hash, height = ?height, "Transaction confirmed");
                    return Ok(Receipt {
                        tx_hash: tx_hash.clone(),
                        height,
                    });
                }
            } else if response.status().as_u16() == 404 {
                debug!(txhash = %tx_hash, "Transaction not yet in block, waiting...");
            } else {
                return Err(eyre!(
                    "Transaction query failed: {}",
                    response.status()
                ));
            }

            delay = std::cmp::min(delay * 2, max_delay);
        }

        Err(eyre!(
            "Timeout waiting for transaction {} to be confirmed",
            tx_hash
        ))
    }
}

fn fee_amount(gas_limit: u64, gas_price: f64) -> u128 {
    ((gas_limit as f64) * gas_price).ceil() as u128
}

fn parse_tx_response(body: &serde_json::Value) -> Option<TxResponse> {
    serde_json::from_value(body.get("tx_response")?.clone()).ok()
}

/// Extract sequence and account number; vesting accounts nest them under
/// `base_account`
fn parse_account_info(data: &serde_json::Value) -> Result<AccountInfo> {
    let account = data
        .get("account")
        .ok_or_else(|| eyre!("Missing 'account' field in response"))?;

    let field = |name: &str| -> Result<u64> {
        account
            .get(name)
            .or_else(|| account.get("base_account").and_then(|b| b.get(name)))
            .and_then(|v| v.as_str())
            .unwrap_or("0")
            .parse()
            .map_err(|e| eyre!("Invalid {} in account response: {}", name, e))
    };

    Ok(AccountInfo {
        sequence: field("sequence")?,
        account_number: field("account_number")?,
    })
}
