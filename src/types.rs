//! Shared types for zkgm transfers
//!
//! Chain family tags, typed chain addresses, transfer intents, token metadata,
//! channels and transaction handles.

use std::fmt;
use std::str::FromStr;

use alloy::primitives::{Address, Bytes, U256};
use eyre::{eyre, Result};
use serde::{Deserialize, Serialize};

use crate::address_codec::{
    decode_bech32_address, decode_hex_bytes, decode_hex_utf8, parse_evm_address,
    validate_cosmos_token,
};
use crate::error::OrderError;

// ============================================================================
// Chain Families
// ============================================================================

/// Execution/addressing family of a chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainType {
    /// Account-based EVM chains
    Evm,
    /// CosmWasm chains queried through LCD smart queries
    Cosmos,
    /// Resource-model chains (no dispatch arm yet)
    Aptos,
}

impl ChainType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChainType::Evm => "evm",
            ChainType::Cosmos => "cosmos",
            ChainType::Aptos => "aptos",
        }
    }

    /// Canonical zkgm bytes of a token identifier on this chain family
    pub fn canonical_token(&self, token: &str) -> Result<Bytes> {
        match self {
            ChainType::Evm => Ok(Bytes::copy_from_slice(&parse_evm_address(token)?)),
            ChainType::Cosmos => {
                validate_cosmos_token(token)?;
                Ok(Bytes::copy_from_slice(token.as_bytes()))
            }
            ChainType::Aptos => Ok(decode_hex_bytes(token)?.into()),
        }
    }
}

impl fmt::Display for ChainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChainType {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "evm" => Ok(ChainType::Evm),
            "cosmos" => Ok(ChainType::Cosmos),
            "aptos" => Ok(ChainType::Aptos),
            other => Err(eyre!("Unknown chain type: {}", other)),
        }
    }
}

// ============================================================================
// Addresses
// ============================================================================

/// A chain-native address with a fixed family and a zkgm wire encoding
pub trait ChainAddress: Clone + fmt::Debug + fmt::Display + Send + Sync + 'static {
    const CHAIN_TYPE: ChainType;

    fn parse(raw: &str) -> Result<Self>;

    /// Bytes placed in the `sender`/`receiver` fields of an order
    fn wire_bytes(&self) -> Bytes;
}

impl ChainAddress for Address {
    const CHAIN_TYPE: ChainType = ChainType::Evm;

    fn parse(raw: &str) -> Result<Self> {
        Ok(Address::from(parse_evm_address(raw)?))
    }

    fn wire_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(self.as_slice())
    }
}

/// Bech32 address on a Cosmos chain
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CosmosAddress {
    bech32: String,
    hrp: String,
}

impl CosmosAddress {
    pub fn hrp(&self) -> &str {
        &self.hrp
    }

    pub fn as_str(&self) -> &str {
        &self.bech32
    }
}

impl ChainAddress for CosmosAddress {
    const CHAIN_TYPE: ChainType = ChainType::Cosmos;

    fn parse(raw: &str) -> Result<Self> {
        let (_, hrp) = decode_bech32_address(raw)?;
        Ok(Self {
            bech32: raw.to_string(),
            hrp,
        })
    }

    fn wire_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(self.bech32.as_bytes())
    }
}

impl fmt::Display for CosmosAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.bech32)
    }
}

impl TryFrom<String> for CosmosAddress {
    type Error = eyre::Report;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<CosmosAddress> for String {
    fn from(value: CosmosAddress) -> Self {
        value.bech32
    }
}

// ============================================================================
// Transfer Intents
// ============================================================================

/// One leg of a transfer, typed by the source and destination address families
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferIntent<S: ChainAddress, D: ChainAddress> {
    pub sender: S,
    pub receiver: D,
    /// Source-chain token identifier as the user supplied it
    pub base_token: String,
    pub base_amount: U256,
    /// Amount the receiver is guaranteed on the destination side
    pub quote_amount: U256,
}

/// Untyped intent as it arrives from the orchestration layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTransferIntent {
    pub sender: String,
    pub receiver: String,
    pub base_token: String,
    pub base_amount: U256,
    pub quote_amount: U256,
}

impl RawTransferIntent {
    /// Parse the addresses for a concrete source/destination family pair
    pub fn typed<S: ChainAddress, D: ChainAddress>(
        &self,
    ) -> std::result::Result<TransferIntent<S, D>, OrderError> {
        let sender = S::parse(&self.sender).map_err(|e| OrderError::InvalidAddress {
            chain: S::CHAIN_TYPE,
            address: self.sender.clone(),
            reason: e.to_string(),
        })?;
        let receiver = D::parse(&self.receiver).map_err(|e| OrderError::InvalidAddress {
            chain: D::CHAIN_TYPE,
            address: self.receiver.clone(),
            reason: e.to_string(),
        })?;

        Ok(TransferIntent {
            sender,
            receiver,
            base_token: self.base_token.clone(),
            base_amount: self.base_amount,
            quote_amount: self.quote_amount,
        })
    }
}

// ============================================================================
// Token Metadata
// ============================================================================

/// Metadata pinned into an order at build time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
}

impl TokenMetadata {
    /// Metadata used for a chain's native fee denom
    pub fn native(denom: &str) -> Self {
        Self {
            symbol: denom.to_string(),
            name: denom.to_string(),
            decimals: 0,
        }
    }
}

// ============================================================================
// Channels
// ============================================================================

/// Registered bridge path between two chains
///
/// Port ids are hex strings as published by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub source_channel_id: u32,
    pub destination_channel_id: u32,
    pub source_port_id: String,
    pub destination_port_id: String,
}

/// One side of a channel: the channel id and the zkgm contract serving it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelEndpoint {
    pub channel_id: u32,
    /// Chain-native address of the zkgm contract
    pub contract: String,
}

impl Channel {
    pub fn source_endpoint(&self, chain: ChainType) -> Result<ChannelEndpoint> {
        Ok(ChannelEndpoint {
            channel_id: self.source_channel_id,
            contract: port_to_contract(chain, &self.source_port_id)?,
        })
    }

    pub fn destination_endpoint(&self, chain: ChainType) -> Result<ChannelEndpoint> {
        Ok(ChannelEndpoint {
            channel_id: self.destination_channel_id,
            contract: port_to_contract(chain, &self.destination_port_id)?,
        })
    }
}

fn port_to_contract(chain: ChainType, port_id: &str) -> Result<String> {
    match chain {
        ChainType::Evm => {
            let raw = decode_hex_bytes(port_id)?;
            if raw.len() != 20 {
                return Err(eyre!(
                    "EVM port id must be a 20-byte address, got {} bytes",
                    raw.len()
                ));
            }
            Ok(Address::from_slice(&raw).to_checksum(None))
        }
        ChainType::Cosmos => {
            let contract = decode_hex_utf8(port_id)?;
            decode_bech32_address(&contract)?;
            Ok(contract)
        }
        ChainType::Aptos => Ok(format!("0x{}", hex::encode(decode_hex_bytes(port_id)?))),
    }
}

// ============================================================================
// Transactions
// ============================================================================

/// Transaction hash as reported by the chain client
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxHash(pub String);

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TxHash {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Confirmation of a successful transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub height: Option<u64>,
}
