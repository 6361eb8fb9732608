//! zkgm Instruction Tree
//!
//! Chain-agnostic representation of the instructions a transfer sends.
//!
//! ## Submodules
//!
//! - `abi` - Solidity ABI definitions of the wire envelope and operands
//! - `codec` - Encoding/decoding between [`Instruction`] and wire bytes
//!
//! Every instruction is tagged on the wire by an `(opcode, version)` pair so
//! a decoder can dispatch without external type hints.

pub mod abi;
pub mod codec;

use alloy::primitives::{Bytes, U256};

pub use codec::{decode, decode_envelope, decode_hex, encode, encode_hex, DecodeError};

// ============================================================================
// Opcodes and Versions
// ============================================================================

pub const OP_MULTIPLEX: u8 = 0x01;
pub const OP_BATCH: u8 = 0x02;
pub const OP_FUNGIBLE_ASSET_ORDER: u8 = 0x03;

pub const INSTR_VERSION_0: u8 = 0x00;
pub const INSTR_VERSION_1: u8 = 0x01;

/// Deepest batch nesting the decoder accepts
pub const MAX_BATCH_DEPTH: usize = 8;

// ============================================================================
// Instructions
// ============================================================================

/// Order moving `base_amount` of `base_token` from `sender` to `receiver`
///
/// Addresses and tokens are the chain-native zkgm bytes of their family.
/// Symbol, name and decimals are pinned at build time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FungibleAssetOrder {
    pub sender: Bytes,
    pub receiver: Bytes,
    pub base_token: Bytes,
    pub base_amount: U256,
    pub base_token_symbol: String,
    pub base_token_name: String,
    pub base_token_decimals: u8,
    /// Zero unless the order unwraps a previously wrapped asset
    pub source_channel_id: U256,
    pub quote_token: Bytes,
    pub quote_amount: U256,
}

/// Ordered sequence of instructions executed one after another on-chain
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    pub instructions: Vec<Instruction>,
}

impl Batch {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    FungibleAssetOrder(FungibleAssetOrder),
    Batch(Batch),
}

impl Instruction {
    pub fn opcode(&self) -> u8 {
        match self {
            Instruction::FungibleAssetOrder(_) => OP_FUNGIBLE_ASSET_ORDER,
            Instruction::Batch(_) => OP_BATCH,
        }
    }

    pub fn version(&self) -> u8 {
        match self {
            Instruction::FungibleAssetOrder(_) => INSTR_VERSION_1,
            Instruction::Batch(_) => INSTR_VERSION_0,
        }
    }

    /// All orders in the tree, depth-first in execution order
    pub fn orders(&self) -> Vec<&FungibleAssetOrder> {
        let mut out = Vec::new();
        self.collect_orders(&mut out);
        out
    }

    fn collect_orders<'a>(&'a self, out: &mut Vec<&'a FungibleAssetOrder>) {
        match self {
            Instruction::FungibleAssetOrder(order) => out.push(order),
            Instruction::Batch(batch) => {
                for child in &batch.instructions {
                    child.collect_orders(out);
                }
            }
        }
    }
}

impl From<FungibleAssetOrder> for Instruction {
    fn from(order: FungibleAssetOrder) -> Self {
        Instruction::FungibleAssetOrder(order)
    }
}

impl From<Batch> for Instruction {
    fn from(batch: Batch) -> Self {
        Instruction::Batch(batch)
    }
}
