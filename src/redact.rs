//! Secret redaction for signer material.
//!
//! Private keys and mnemonics pass through config structs that get logged
//! with `{:?}`. Wrapping them in [`Redacted`] keeps them out of `Debug`,
//! `Display` and serialized output.

use std::fmt::{self, Debug, Display};

/// Wrapper that prints `<redacted>` in place of its inner value.
///
/// ```ignore
/// use zkgm_rs::redact::Redacted;
///
/// tracing::debug!(mnemonic = %Redacted(&mnemonic), "Deriving signer");
/// ```
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct Redacted<T>(pub T);

impl<T> Redacted<T> {
    /// Borrow the secret. Callers must not log the result.
    pub fn expose(&self) -> &T {
        &self.0
    }
}

impl<T> Debug for Redacted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

impl<T> Display for Redacted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

impl<T> serde::Serialize for Redacted<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        "<redacted>".serialize(serializer)
    }
}

impl<T> From<T> for Redacted<T> {
    fn from(value: T) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_never_formatted() {
        let key = Redacted("0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80");
        assert_eq!(format!("{:?}", key), "<redacted>");
        assert_eq!(format!("{}", key), "<redacted>");
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"<redacted>\"");
        assert!(key.expose().starts_with("0xac09"));
    }
}
