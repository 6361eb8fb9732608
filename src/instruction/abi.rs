//! zkgm wire ABI
//!
//! Uses alloy's sol! macro for the instruction envelope, the operand structs
//! and the zkgm contract entry points used by the EVM client.

#![allow(clippy::too_many_arguments)]

use alloy::sol;

sol! {
    /// Envelope around every instruction: `(version, opcode, operand)`
    #[derive(Debug, PartialEq, Eq)]
    struct Instruction {
        uint8 version;
        uint8 opcode;
        bytes operand;
    }

    /// Operand of `OP_FUNGIBLE_ASSET_ORDER`
    #[derive(Debug, PartialEq, Eq)]
    struct FungibleAssetOrder {
        bytes sender;
        bytes receiver;
        bytes baseToken;
        uint256 baseAmount;
        string baseTokenSymbol;
        string baseTokenName;
        uint8 baseTokenDecimals;
        uint256 baseTokenPath;
        bytes quoteToken;
        uint256 quoteAmount;
    }

    /// Operand of `OP_BATCH`
    #[derive(Debug, PartialEq, Eq)]
    struct Batch {
        Instruction[] instructions;
    }

    /// zkgm (ucs03) application contract
    #[sol(rpc)]
    interface IZkgm {
        function send(
            uint32 channelId,
            uint64 timeoutHeight,
            uint64 timeoutTimestamp,
            bytes32 salt,
            Instruction calldata instruction
        ) external payable;

        function predictWrappedToken(
            uint256 path,
            uint32 channel,
            bytes calldata token
        ) external view returns (address, bytes32);
    }
}
