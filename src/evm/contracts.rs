//! ERC20 ABI definitions
//!
//! The zkgm contract bindings live with the instruction ABI in
//! `instruction::abi`.

use alloy::sol;

sol! {
    /// ERC20 subset used for metadata reads and approvals
    #[sol(rpc)]
    contract ERC20 {
        function name() external view returns (string);
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }
}
