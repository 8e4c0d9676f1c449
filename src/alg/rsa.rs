//! RSA-based schemes: `RS*` (PKCS#1 v1.5 padding) and `PS*` (PSS padding).

use anyhow::ensure;
use rand_core::{CryptoRng, OsRng, RngCore};
use rsa::{traits::PublicKeyParts, Pkcs1v15Sign, Pss, RsaPrivateKey, RsaPublicKey};
use sha2::{Sha256, Sha384, Sha512};

use super::HashAlg;
use crate::error::KeyError;

/// Minimum supported RSA modulus size in bits.
pub const MIN_MODULUS_BITS: usize = 1_024;

/// RSA signature padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Padding {
    Pkcs1v15,
    Pss,
}

impl HashAlg {
    fn pkcs1v15(self) -> Pkcs1v15Sign {
        match self {
            Self::Sha256 => Pkcs1v15Sign::new::<Sha256>(),
            Self::Sha384 => Pkcs1v15Sign::new::<Sha384>(),
            Self::Sha512 => Pkcs1v15Sign::new::<Sha512>(),
        }
    }

    /// PSS with MGF1 over the same hash and salt as long as the digest.
    fn pss(self) -> Pss {
        let salt_len = self.output_len();
        match self {
            Self::Sha256 => Pss::new_with_salt::<Sha256>(salt_len),
            Self::Sha384 => Pss::new_with_salt::<Sha384>(salt_len),
            Self::Sha512 => Pss::new_with_salt::<Sha512>(salt_len),
        }
    }
}

/// Generates a private key with the specified modulus size.
pub(crate) fn generate<R: CryptoRng + RngCore>(
    rng: &mut R,
    modulus_bits: usize,
) -> Result<RsaPrivateKey, KeyError> {
    if modulus_bits < MIN_MODULUS_BITS {
        return Err(KeyError::WeakKeySize {
            bits: modulus_bits,
            min_bits: MIN_MODULUS_BITS,
        });
    }
    RsaPrivateKey::new(rng, modulus_bits).map_err(KeyError::Generation)
}

/// Checks that a loaded key is not weaker than the supported minimum.
pub(crate) fn check_modulus(key: &RsaPublicKey) -> Result<(), KeyError> {
    let bits = key.n().bits();
    if bits < MIN_MODULUS_BITS {
        return Err(KeyError::WeakKeySize {
            bits,
            min_bits: MIN_MODULUS_BITS,
        });
    }
    Ok(())
}

pub(crate) fn sign(
    key: &RsaPrivateKey,
    hash: HashAlg,
    padding: Padding,
    message: &[u8],
) -> Result<Vec<u8>, KeyError> {
    let digest = hash.digest(message);
    let signature = match padding {
        Padding::Pkcs1v15 => key.sign_with_rng(&mut OsRng, hash.pkcs1v15(), &digest),
        Padding::Pss => key.sign_with_rng(&mut OsRng, hash.pss(), &digest),
    };
    signature.map_err(|err| KeyError::Signing(err.into()))
}

/// Verifies a signature. Returns an error if the signature length differs from the modulus size.
pub(crate) fn verify(
    key: &RsaPublicKey,
    hash: HashAlg,
    padding: Padding,
    message: &[u8],
    signature: &[u8],
) -> anyhow::Result<bool> {
    ensure!(
        signature.len() == key.size(),
        "invalid RSA signature length: expected {} bytes, got {}",
        key.size(),
        signature.len()
    );
    let digest = hash.digest(message);
    let result = match padding {
        Padding::Pkcs1v15 => key.verify(hash.pkcs1v15(), &digest, signature),
        Padding::Pss => key.verify(hash.pss(), &digest, signature),
    };
    Ok(result.is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    use assert_matches::assert_matches;

    #[test]
    fn weak_modulus_is_rejected_before_generation() {
        let err = generate(&mut rand::thread_rng(), 512).unwrap_err();
        assert_matches!(
            err,
            KeyError::WeakKeySize {
                bits: 512,
                min_bits: 1_024
            }
        );
    }

    #[test]
    fn pkcs1v15_signatures_are_deterministic() {
        let key = generate(&mut rand::thread_rng(), 1_024).unwrap();
        let public = key.to_public_key();
        let first = sign(&key, HashAlg::Sha256, Padding::Pkcs1v15, b"message").unwrap();
        let second = sign(&key, HashAlg::Sha256, Padding::Pkcs1v15, b"message").unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 128);
        assert!(verify(&public, HashAlg::Sha256, Padding::Pkcs1v15, b"message", &first).unwrap());
        assert!(!verify(&public, HashAlg::Sha384, Padding::Pkcs1v15, b"message", &first).unwrap());
        assert!(!verify(&public, HashAlg::Sha256, Padding::Pss, b"message", &first).unwrap());
    }

    #[test]
    fn pss_signatures() {
        let key = generate(&mut rand::thread_rng(), 1_024).unwrap();
        let public = key.to_public_key();
        let signature = sign(&key, HashAlg::Sha384, Padding::Pss, b"message").unwrap();
        assert!(verify(&public, HashAlg::Sha384, Padding::Pss, b"message", &signature).unwrap());
        assert!(!verify(&public, HashAlg::Sha384, Padding::Pss, b"massage", &signature).unwrap());
        assert!(verify(&public, HashAlg::Sha384, Padding::Pss, b"message", &signature[1..]).is_err());
    }
}
