//! Instruction encoding and decoding
//!
//! EVM targets receive the envelope as a `send` call argument; CosmWasm
//! targets receive the same envelope bytes hex-encoded inside the JSON
//! `send` message. Both start from [`encode`].

use alloy::primitives::Bytes;
use alloy::sol_types::{SolType, SolValue};
use thiserror::Error;

use super::{
    abi, Batch, FungibleAssetOrder, Instruction, INSTR_VERSION_0, INSTR_VERSION_1,
    MAX_BATCH_DEPTH, OP_BATCH, OP_FUNGIBLE_ASSET_ORDER,
};

/// Failure to turn wire bytes back into an [`Instruction`]
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Malformed ABI data: {0}")]
    Abi(#[from] alloy::sol_types::Error),

    #[error("Unknown opcode {0:#04x}")]
    UnknownOpcode(u8),

    #[error("Unsupported version {version} for opcode {opcode:#04x}")]
    UnsupportedVersion { opcode: u8, version: u8 },

    #[error("Batch nesting exceeds {0} levels")]
    NestingTooDeep(usize),

    #[error("Invalid hex payload: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

// ============================================================================
// Encoding
// ============================================================================

/// Encode an instruction tree to its ABI parameter envelope
pub fn encode(instruction: &Instruction) -> Bytes {
    to_wire(instruction).abi_encode_params().into()
}

/// Encode an instruction tree as 0x-prefixed hex, the CosmWasm wire form
pub fn encode_hex(instruction: &Instruction) -> String {
    format!("0x{}", hex::encode(encode(instruction)))
}

/// Build the wire envelope for an instruction, encoding children first
pub fn to_wire(instruction: &Instruction) -> abi::Instruction {
    let operand = match instruction {
        Instruction::FungibleAssetOrder(order) => order_to_wire(order).abi_encode_params(),
        Instruction::Batch(batch) => abi::Batch {
            instructions: batch.instructions.iter().map(to_wire).collect(),
        }
        .abi_encode_params(),
    };

    abi::Instruction {
        version: instruction.version(),
        opcode: instruction.opcode(),
        operand: operand.into(),
    }
}

fn order_to_wire(order: &FungibleAssetOrder) -> abi::FungibleAssetOrder {
    abi::FungibleAssetOrder {
        sender: order.sender.clone(),
        receiver: order.receiver.clone(),
        baseToken: order.base_token.clone(),
        baseAmount: order.base_amount,
        baseTokenSymbol: order.base_token_symbol.clone(),
        baseTokenName: order.base_token_name.clone(),
        baseTokenDecimals: order.base_token_decimals,
        baseTokenPath: order.source_channel_id,
        quoteToken: order.quote_token.clone(),
        quoteAmount: order.quote_amount,
    }
}

// ============================================================================
// Decoding
// ============================================================================

/// Decode an ABI parameter envelope into an instruction tree
pub fn decode(data: &[u8]) -> Result<Instruction, DecodeError> {
    from_wire(decode_envelope(data)?, 0)
}

/// Decode the 0x-prefixed hex form produced by [`encode_hex`]
pub fn decode_hex(data: &str) -> Result<Instruction, DecodeError> {
    let bytes = hex::decode(data.strip_prefix("0x").unwrap_or(data))?;
    decode(&bytes)
}

/// Decode only the outer envelope, leaving the operand opaque
pub fn decode_envelope(data: &[u8]) -> Result<abi::Instruction, DecodeError> {
    Ok(<abi::Instruction as SolType>::abi_decode_params(data, true)?)
}

fn from_wire(wire: abi::Instruction, depth: usize) -> Result<Instruction, DecodeError> {
    match wire.opcode {
        OP_FUNGIBLE_ASSET_ORDER => {
            if wire.version > INSTR_VERSION_1 {
                return Err(DecodeError::UnsupportedVersion {
                    opcode: wire.opcode,
                    version: wire.version,
                });
            }
            let order =
                <abi::FungibleAssetOrder as SolType>::abi_decode_params(&wire.operand, true)?;
            Ok(Instruction::FungibleAssetOrder(FungibleAssetOrder {
                sender: order.sender,
                receiver: order.receiver,
                base_token: order.baseToken,
                base_amount: order.baseAmount,
                base_token_symbol: order.baseTokenSymbol,
                base_token_name: order.baseTokenName,
                base_token_decimals: order.baseTokenDecimals,
                source_channel_id: order.baseTokenPath,
                quote_token: order.quoteToken,
                quote_amount: order.quoteAmount,
            }))
        }
        OP_BATCH => {
            if wire.version != INSTR_VERSION_0 {
                return Err(DecodeError::UnsupportedVersion {
                    opcode: wire.opcode,
                    version: wire.version,
                });
            }
            if depth >= MAX_BATCH_DEPTH {
                return Err(DecodeError::NestingTooDeep(MAX_BATCH_DEPTH));
            }
            let batch = <abi::Batch as SolType>::abi_decode_params(&wire.operand, true)?;
            let instructions = batch
                .instructions
                .into_iter()
                .map(|child| from_wire(child, depth + 1))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Instruction::Batch(Batch::new(instructions)))
        }
        other => Err(DecodeError::UnknownOpcode(other)),
    }
}
