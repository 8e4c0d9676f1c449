//! `HS*` algorithms based on HMACs.

use anyhow::ensure;
use hmac::{Hmac, Mac};
use rand_core::{CryptoRng, RngCore};
use sha2::{Sha256, Sha384, Sha512};
use smallvec::SmallVec;

use core::fmt;

use super::{HashAlg, SecretBytes};

macro_rules! keyed_mac {
    ($digest:ty, $key:expr, $message:expr) => {{
        let mut mac =
            Hmac::<$digest>::new_from_slice($key).expect("HMACs work with any key size");
        mac.update($message);
        mac
    }};
}

/// Shared secret for `HS*` algorithms. The secret is zeroized on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct HmacKey(SecretBytes);

impl fmt::Debug for HmacKey {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_tuple("HmacKey").field(&"_").finish()
    }
}

impl HmacKey {
    /// Creates a key from the specified `secret` bytes.
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self(SecretBytes::new(secret.as_ref()))
    }

    /// Generates a random key of `len` bytes using a cryptographically secure RNG.
    pub fn generate<R: CryptoRng + RngCore>(rng: &mut R, len: usize) -> Self {
        let mut bytes = vec![0_u8; len];
        rng.fill_bytes(&mut bytes);
        Self(SecretBytes::from(bytes))
    }

    /// Returns the secret length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Checks whether the secret is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn sign(&self, hash: HashAlg, message: &[u8]) -> SmallVec<[u8; 64]> {
        match hash {
            HashAlg::Sha256 => {
                let mac = keyed_mac!(Sha256, &self.0, message);
                SmallVec::from_slice(&mac.finalize().into_bytes())
            }
            HashAlg::Sha384 => {
                let mac = keyed_mac!(Sha384, &self.0, message);
                SmallVec::from_slice(&mac.finalize().into_bytes())
            }
            HashAlg::Sha512 => {
                let mac = keyed_mac!(Sha512, &self.0, message);
                SmallVec::from_slice(&mac.finalize().into_bytes())
            }
        }
    }

    /// Verifies the MAC in constant time. Returns an error if the MAC has an incorrect length.
    pub(crate) fn verify(
        &self,
        hash: HashAlg,
        message: &[u8],
        signature: &[u8],
    ) -> anyhow::Result<bool> {
        ensure!(
            signature.len() == hash.output_len(),
            "invalid HMAC length: expected {} bytes, got {}",
            hash.output_len(),
            signature.len()
        );
        Ok(match hash {
            HashAlg::Sha256 => keyed_mac!(Sha256, &self.0, message)
                .verify_slice(signature)
                .is_ok(),
            HashAlg::Sha384 => keyed_mac!(Sha384, &self.0, message)
                .verify_slice(signature)
                .is_ok(),
            HashAlg::Sha512 => keyed_mac!(Sha512, &self.0, message)
                .verify_slice(signature)
                .is_ok(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc4231_test_case_2() {
        let key = HmacKey::new(b"Jefe");
        let mac = key.sign(HashAlg::Sha256, b"what do ya want for nothing?");
        let expected = [
            0x5b, 0xdc, 0xc1, 0x46, 0xbf, 0x60, 0x75, 0x4e, 0x6a, 0x04, 0x24, 0x26, 0x08, 0x95,
            0x75, 0xc7, 0x5a, 0x00, 0x3f, 0x08, 0x9d, 0x27, 0x39, 0x83, 0x9d, 0xec, 0x58, 0xb9,
            0x64, 0xec, 0x38, 0x43,
        ];
        assert_eq!(mac.as_slice(), expected);
    }

    #[test]
    fn mac_widths() {
        let key = HmacKey::new(b"secret");
        for hash in [HashAlg::Sha256, HashAlg::Sha384, HashAlg::Sha512] {
            let mac = key.sign(hash, b"message");
            assert_eq!(mac.len(), hash.output_len());
            assert!(key.verify(hash, b"message", &mac).unwrap());
            assert!(!key.verify(hash, b"other message", &mac).unwrap());
        }
    }

    #[test]
    fn wrong_length_is_an_error() {
        let key = HmacKey::new(b"secret");
        let mac = key.sign(HashAlg::Sha384, b"message");
        assert!(key.verify(HashAlg::Sha256, b"message", &mac).is_err());
        assert!(key.verify(HashAlg::Sha384, b"message", &mac[1..]).is_err());
    }

    #[test]
    fn generated_keys_differ() {
        let mut rng = rand::thread_rng();
        let first = HmacKey::generate(&mut rng, 64);
        let second = HmacKey::generate(&mut rng, 64);
        assert_eq!(first.len(), 64);
        assert_ne!(first, second);
    }
}
