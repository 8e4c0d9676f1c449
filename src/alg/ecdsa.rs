//! `ES*` algorithms based on ECDSA over NIST curves.

use anyhow::Context as _;
use p256::ecdsa::signature::{Signer, Verifier};
use rand_core::{CryptoRng, RngCore};
use smallvec::SmallVec;

use core::fmt;

use crate::error::KeyError;

/// Elliptic curve used by an `ES*` algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Curve {
    /// NIST P-256 (`secp256r1`).
    P256,
    /// NIST P-384 (`secp384r1`).
    P384,
    /// NIST P-521 (`secp521r1`). Recognized by the registry, but keys on this curve
    /// are not supported by the crypto backend.
    P521,
}

impl fmt::Display for Curve {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::P256 => "P-256",
            Self::P384 => "P-384",
            Self::P521 => "P-521",
        })
    }
}

/// Private ECDSA key.
#[derive(Clone)]
#[non_exhaustive]
pub enum EcSigningKey {
    /// Key on the P-256 curve.
    P256(p256::ecdsa::SigningKey),
    /// Key on the P-384 curve.
    P384(p384::ecdsa::SigningKey),
}

impl fmt::Debug for EcSigningKey {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("EcSigningKey")
            .field("curve", &self.curve())
            .finish_non_exhaustive()
    }
}

impl EcSigningKey {
    /// Generates a random key on the specified curve.
    pub fn generate<R: CryptoRng + RngCore>(rng: &mut R, curve: Curve) -> Result<Self, KeyError> {
        match curve {
            Curve::P256 => Ok(Self::P256(p256::ecdsa::SigningKey::random(rng))),
            Curve::P384 => Ok(Self::P384(p384::ecdsa::SigningKey::random(rng))),
            Curve::P521 => Err(KeyError::UnsupportedKey(format!("ECDSA key on {curve}"))),
        }
    }

    /// Returns the curve of this key.
    pub fn curve(&self) -> Curve {
        match self {
            Self::P256(_) => Curve::P256,
            Self::P384(_) => Curve::P384,
        }
    }

    /// Returns the public counterpart of this key.
    pub fn verifying_key(&self) -> EcVerifyingKey {
        match self {
            Self::P256(key) => EcVerifyingKey::P256(key.verifying_key().clone()),
            Self::P384(key) => EcVerifyingKey::P384(key.verifying_key().clone()),
        }
    }
}

/// Public ECDSA key.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EcVerifyingKey {
    /// Key on the P-256 curve.
    P256(p256::ecdsa::VerifyingKey),
    /// Key on the P-384 curve.
    P384(p384::ecdsa::VerifyingKey),
}

impl EcVerifyingKey {
    /// Returns the curve of this key.
    pub fn curve(&self) -> Curve {
        match self {
            Self::P256(_) => Curve::P256,
            Self::P384(_) => Curve::P384,
        }
    }
}

/// Signs `message` and returns the signature in the fixed-width `r || s` form.
pub(crate) fn sign(key: &EcSigningKey, message: &[u8]) -> Result<SmallVec<[u8; 96]>, KeyError> {
    match key {
        EcSigningKey::P256(key) => {
            let signature: p256::ecdsa::Signature = key
                .try_sign(message)
                .map_err(|err| KeyError::Signing(err.into()))?;
            Ok(SmallVec::from_slice(&signature.to_bytes()))
        }
        EcSigningKey::P384(key) => {
            let signature: p384::ecdsa::Signature = key
                .try_sign(message)
                .map_err(|err| KeyError::Signing(err.into()))?;
            Ok(SmallVec::from_slice(&signature.to_bytes()))
        }
    }
}

/// Verifies a fixed-width `r || s` signature. Returns an error if the signature
/// cannot be a valid signature on the key curve.
pub(crate) fn verify(
    key: &EcVerifyingKey,
    message: &[u8],
    signature: &[u8],
) -> anyhow::Result<bool> {
    Ok(match key {
        EcVerifyingKey::P256(key) => {
            let signature = p256::ecdsa::Signature::from_slice(signature)
                .context("malformed P-256 signature")?;
            key.verify(message, &signature).is_ok()
        }
        EcVerifyingKey::P384(key) => {
            let signature = p384::ecdsa::Signature::from_slice(signature)
                .context("malformed P-384 signature")?;
            key.verify(message, &signature).is_ok()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use assert_matches::assert_matches;

    #[test]
    fn signature_widths() {
        let mut rng = rand::thread_rng();
        for (curve, width) in [(Curve::P256, 64), (Curve::P384, 96)] {
            let key = EcSigningKey::generate(&mut rng, curve).unwrap();
            assert_eq!(key.curve(), curve);
            let signature = sign(&key, b"message").unwrap();
            assert_eq!(signature.len(), width);

            let public = key.verifying_key();
            assert_eq!(public.curve(), curve);
            assert!(verify(&public, b"message", &signature).unwrap());
            assert!(!verify(&public, b"other", &signature).unwrap());
            assert!(verify(&public, b"message", &signature[1..]).is_err());
        }
    }

    #[test]
    fn p521_keys_are_unsupported() {
        let err = EcSigningKey::generate(&mut rand::thread_rng(), Curve::P521).unwrap_err();
        assert_matches!(err, KeyError::UnsupportedKey(kind) if kind.contains("P-521"));
    }

    #[test]
    fn debug_output_hides_scalar() {
        let key = EcSigningKey::generate(&mut rand::thread_rng(), Curve::P256).unwrap();
        assert_eq!(format!("{key:?}"), "EcSigningKey { curve: P256, .. }");
    }
}
