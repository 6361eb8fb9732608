//! Salt helpers for zkgm submissions

use alloy::primitives::B256;
use rand::Rng;

/// Generate a fresh random 32-byte salt for a `send` call
///
/// The contract derives the packet hash from the salt, so two distinct
/// transfers must never share one. A retried send reuses the salt of the
/// attempt it retries.
pub fn generate_salt() -> B256 {
    B256::from(rand::thread_rng().gen::<[u8; 32]>())
}

/// Format a 32-byte value as 0x-prefixed hex
pub fn bytes32_to_hex(bytes: &[u8; 32]) -> String {
    format!("0x{}", hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_salts_are_unique() {
        let a = generate_salt();
        let b = generate_salt();
        assert_ne!(a, b);
        assert_ne!(a, B256::ZERO);
    }

    #[test]
    fn test_bytes32_to_hex() {
        let mut bytes = [0u8; 32];
        bytes[31] = 0xab;
        assert_eq!(bytes32_to_hex(&bytes), format!("0x{}ab", "00".repeat(31)));
    }
}
