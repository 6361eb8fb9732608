//! Order Builder
//!
//! Turns one typed transfer intent into a [`FungibleAssetOrder`]:
//!
//! 1. reject a zero base amount before touching any chain
//! 2. canonicalize the base token for the source family
//! 3. resolve token metadata on the source chain (native denoms bypass the query)
//! 4. predict the wrapped quote token on the destination chain
//!
//! Steps 3 and 4 are the only I/O and run concurrently. Nothing is mutated.

use alloy::primitives::{Bytes, U256};
use tracing::{debug, warn};

use crate::capability::ChainReader;
use crate::error::OrderError;
use crate::instruction::FungibleAssetOrder;
use crate::types::{ChainAddress, ChainType, ChannelEndpoint, TokenMetadata, TransferIntent};

/// Resolve symbol/name/decimals for a source-chain token
pub async fn resolve_token_metadata(
    reader: &dyn ChainReader,
    token: &str,
) -> Result<TokenMetadata, OrderError> {
    if let Some(metadata) = reader.native_token_metadata(token) {
        debug!(token = %token, chain = %reader.chain_type(), "Using native token metadata");
        return Ok(metadata);
    }

    reader.read_token_metadata(token).await.map_err(|e| {
        warn!(token = %token, chain = %reader.chain_type(), error = %e, "Token metadata query failed");
        OrderError::MetadataResolution {
            token: token.to_string(),
            cause: e.into(),
        }
    })
}

/// Predict the destination-side identifier of a canonical base token
pub async fn predict_quote_token(
    reader: &dyn ChainReader,
    endpoint: &ChannelEndpoint,
    base_token: &[u8],
) -> Result<Bytes, OrderError> {
    reader
        .predict_quote_token(endpoint, base_token)
        .await
        .map_err(|e| {
            let token = format!("0x{}", hex::encode(base_token));
            warn!(token = %token, chain = %reader.chain_type(), error = %e, "Quote token prediction failed");
            OrderError::QuotePrediction {
                token,
                cause: e.into(),
            }
        })
}

/// Build a single order from a typed intent
///
/// `destination_endpoint` is the destination side of the channel the order
/// travels through.
pub async fn build_order<S: ChainAddress, D: ChainAddress>(
    intent: &TransferIntent<S, D>,
    source: &dyn ChainReader,
    destination: &dyn ChainReader,
    destination_endpoint: &ChannelEndpoint,
) -> Result<FungibleAssetOrder, OrderError> {
    if intent.base_amount.is_zero() {
        return Err(OrderError::InvalidAmount);
    }
    ensure_family(source, S::CHAIN_TYPE)?;
    ensure_family(destination, D::CHAIN_TYPE)?;

    let base_token = S::CHAIN_TYPE
        .canonical_token(&intent.base_token)
        .map_err(|e| OrderError::InvalidToken {
            chain: S::CHAIN_TYPE,
            token: intent.base_token.clone(),
            reason: e.to_string(),
        })?;

    let (metadata, quote_token) = tokio::try_join!(
        resolve_token_metadata(source, &intent.base_token),
        predict_quote_token(destination, destination_endpoint, &base_token),
    )?;

    debug!(
        sender = %intent.sender,
        receiver = %intent.receiver,
        base_token = %intent.base_token,
        symbol = %metadata.symbol,
        quote_token = %hex::encode(&quote_token),
        "Built fungible asset order"
    );

    Ok(FungibleAssetOrder {
        sender: intent.sender.wire_bytes(),
        receiver: intent.receiver.wire_bytes(),
        base_token,
        base_amount: intent.base_amount,
        base_token_symbol: metadata.symbol,
        base_token_name: metadata.name,
        base_token_decimals: metadata.decimals,
        source_channel_id: U256::ZERO,
        quote_token,
        quote_amount: intent.quote_amount,
    })
}

fn ensure_family(reader: &dyn ChainReader, expected: ChainType) -> Result<(), OrderError> {
    let actual = reader.chain_type();
    if actual != expected {
        return Err(OrderError::CapabilityMismatch { expected, actual });
    }
    Ok(())
}
