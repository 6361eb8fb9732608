//! Address and identifier codecs shared by the chain families
//!
//! zkgm carries every address and token identifier as opaque `bytes`. Each
//! chain family has its own rule for producing those bytes:
//!
//! - EVM: the raw 20 address bytes
//! - Cosmos: the UTF-8 bytes of the bech32 address or denom string
//! - Resource-model chains: the hex-decoded identifier
//!
//! This module holds the string-level parsing those rules rely on.

use bech32::{self, FromBase32};
use eyre::{eyre, Result};

// ============================================================================
// EVM
// ============================================================================

/// Parse a 0x-prefixed hex EVM address to 20 bytes
pub fn parse_evm_address(addr: &str) -> Result<[u8; 20]> {
    let hex_str = addr.strip_prefix("0x").unwrap_or(addr);

    if hex_str.len() != 40 {
        return Err(eyre!(
            "Invalid EVM address length: expected 40 hex chars, got {}",
            hex_str.len()
        ));
    }

    let bytes = hex::decode(hex_str).map_err(|e| eyre!("Invalid EVM address hex: {}", e))?;

    let mut result = [0u8; 20];
    result.copy_from_slice(&bytes);
    Ok(result)
}

// ============================================================================
// Cosmos
// ============================================================================

/// Decode a bech32 address to its raw payload
///
/// Accepts both 20-byte account addresses and 32-byte contract addresses.
/// Returns (raw_bytes, hrp).
pub fn decode_bech32_address(addr: &str) -> Result<(Vec<u8>, String)> {
    let (hrp, data, _variant) =
        bech32::decode(addr).map_err(|e| eyre!("Invalid bech32 address: {}", e))?;

    let bytes = Vec::<u8>::from_base32(&data).map_err(|e| eyre!("Invalid base32 data: {}", e))?;

    if bytes.len() != 20 && bytes.len() != 32 {
        return Err(eyre!(
            "Invalid address length: expected 20 or 32 bytes, got {}",
            bytes.len()
        ));
    }

    Ok((bytes, hrp))
}

/// Check that a string is usable as a Cosmos bank denom or CW20 address
///
/// Mirrors the SDK denom grammar loosely: 3 to 128 chars, starting with a
/// letter, followed by alphanumerics or `/ : . _ -`.
pub fn validate_cosmos_token(token: &str) -> Result<()> {
    let len = token.len();
    if !(3..=128).contains(&len) {
        return Err(eyre!(
            "Invalid Cosmos token length: expected 3-128 chars, got {}",
            len
        ));
    }
    let mut chars = token.chars();
    if !chars.next().is_some_and(|c| c.is_ascii_alphabetic()) {
        return Err(eyre!("Cosmos token must start with a letter: {}", token));
    }
    if let Some(bad) = chars.find(|c| !(c.is_ascii_alphanumeric() || "/:._-".contains(*c))) {
        return Err(eyre!("Invalid character '{}' in Cosmos token {}", bad, token));
    }
    Ok(())
}

// ============================================================================
// Hex identifiers
// ============================================================================

/// Decode an optionally 0x-prefixed hex string
pub fn decode_hex_bytes(value: &str) -> Result<Vec<u8>> {
    let hex_str = value.strip_prefix("0x").unwrap_or(value);
    if hex_str.is_empty() {
        return Err(eyre!("Empty hex identifier"));
    }
    hex::decode(hex_str).map_err(|e| eyre!("Invalid hex identifier {}: {}", value, e))
}

/// Decode a hex string whose payload is UTF-8 text
///
/// Registries publish Cosmos port ids this way: the hex of the contract's
/// bech32 address.
pub fn decode_hex_utf8(value: &str) -> Result<String> {
    let bytes = decode_hex_bytes(value)?;
    String::from_utf8(bytes).map_err(|e| eyre!("Hex payload is not UTF-8: {}", e))
}
