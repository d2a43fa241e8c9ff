//! Process-wide secret key provisioning.

use std::fmt;

use rand::RngCore;
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::error::SecretKeyError;

/// Length of the secret key in bytes.
pub const KEY_LEN: usize = 32;

/// Where a key came from. A random key does not survive a restart, so every
/// outstanding signed URL and session cookie dies with the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Fixed,
    Random,
}

/// The 32-byte key behind every signed URL and session cookie.
#[derive(Clone)]
pub struct SecretKey {
    bytes: [u8; KEY_LEN],
    source: KeySource,
}

impl SecretKey {
    /// Decodes the configured hex key, or generates a random one when the
    /// configuration is empty.
    ///
    /// Does not reject an all-zero key; see [`SecretKey::provision`].
    pub fn from_config(hex_key: &str) -> Result<Self, SecretKeyError> {
        if hex_key.is_empty() {
            return Ok(Self::random());
        }
        if hex_key.len() != KEY_LEN * 2 {
            return Err(SecretKeyError::WrongLength(hex_key.len()));
        }
        let mut bytes = [0u8; KEY_LEN];
        hex::decode_to_slice(hex_key, &mut bytes)?;
        Ok(Self {
            bytes,
            source: KeySource::Fixed,
        })
    }

    /// Startup entry point: decode or generate, then reject all-zero keys.
    pub fn provision(hex_key: &str) -> Result<Self, SecretKeyError> {
        if hex_key.is_empty() {
            warn!("No secret key provided, generating random secret key. Sessions won't persist across restarts");
        }
        Self::from_config(hex_key)?.ensure_nonzero()
    }

    /// A freshly generated key. Never all zero.
    pub fn random() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        let mut rng = rand::thread_rng();
        loop {
            rng.fill_bytes(&mut bytes);
            if bytes.iter().any(|b| *b != 0) {
                break;
            }
        }
        Self {
            bytes,
            source: KeySource::Random,
        }
    }

    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self {
            bytes,
            source: KeySource::Fixed,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.bytes.iter().all(|b| *b == 0)
    }

    pub fn ensure_nonzero(self) -> Result<Self, SecretKeyError> {
        if self.is_zero() {
            Err(SecretKeyError::AllZero)
        } else {
            Ok(self)
        }
    }

    pub fn source(&self) -> KeySource {
        self.source
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl PartialEq for SecretKey {
    fn eq(&self, other: &Self) -> bool {
        self.bytes[..].ct_eq(&other.bytes[..]).into()
    }
}

impl Eq for SecretKey {}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretKey")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const HEX_KEY: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

    #[test]
    fn test_empty_config_generates_random_key() {
        let first = SecretKey::from_config("").unwrap();
        let second = SecretKey::from_config("").unwrap();
        assert!(!first.is_zero());
        assert!(!second.is_zero());
        assert_ne!(first.as_bytes(), second.as_bytes());
        assert_eq!(first.source(), KeySource::Random);
    }

    #[test]
    fn test_hex_config_decodes_exact_bytes() {
        let key = SecretKey::from_config(HEX_KEY).unwrap();
        let expected: Vec<u8> = (0u8..32).collect();
        assert_eq!(key.as_bytes(), expected.as_slice());
        assert_eq!(key.source(), KeySource::Fixed);
        assert_eq!(key, SecretKey::from_config(HEX_KEY).unwrap());
        assert_ne!(key, SecretKey::from_bytes([0x01; KEY_LEN]));
    }

    #[rstest]
    #[case(63)]
    #[case(65)]
    #[case(32)]
    fn test_wrong_length_rejected(#[case] len: usize) {
        let input = "a".repeat(len);
        match SecretKey::from_config(&input) {
            Err(SecretKeyError::WrongLength(n)) => assert_eq!(n, len),
            other => panic!("expected WrongLength, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_hex_rejected() {
        let input = "z".repeat(64);
        assert!(matches!(
            SecretKey::from_config(&input),
            Err(SecretKeyError::InvalidHex(_))
        ));
    }

    #[test]
    fn test_all_zero_key_rejected_at_provisioning() {
        let zeros = "0".repeat(64);
        assert!(SecretKey::from_config(&zeros).unwrap().is_zero());
        assert!(matches!(
            SecretKey::provision(&zeros),
            Err(SecretKeyError::AllZero)
        ));
        assert!(SecretKey::provision(HEX_KEY).is_ok());
        assert!(SecretKey::provision("").is_ok());
    }

    #[test]
    fn test_debug_redacts_key() {
        let key = SecretKey::from_config(HEX_KEY).unwrap();
        let rendered = format!("{:?}", key);
        assert!(!rendered.contains("0a0b"));
        assert!(rendered.contains("Fixed"));
    }
}
