//! Concrete key material for every supported key family.

use rand_core::{CryptoRng, RngCore};
use rsa::{traits::PublicKeyParts, RsaPrivateKey, RsaPublicKey};

use core::fmt;

use crate::{
    alg::{self, Algorithm, Curve, EcSigningKey, EcVerifyingKey, HmacKey, KeyFamily},
    error::KeyError,
};

/// Key usable with one of the [`KeyFamily`]s.
///
/// Private keys (and HMAC secrets) can both sign and verify; public keys can only verify.
/// Key bytes never appear in the `Debug` output.
#[derive(Clone)]
#[non_exhaustive]
pub enum KeyMaterial {
    /// Shared secret for `HS*` algorithms.
    Hmac(HmacKey),
    /// RSA private key for `RS*` / `PS*` algorithms.
    RsaPrivate(RsaPrivateKey),
    /// RSA public key for `RS*` / `PS*` algorithms.
    RsaPublic(RsaPublicKey),
    /// ECDSA private key for `ES*` algorithms.
    EcPrivate(EcSigningKey),
    /// ECDSA public key for `ES*` algorithms.
    EcPublic(EcVerifyingKey),
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hmac(key) => formatter.debug_tuple("Hmac").field(key).finish(),
            Self::RsaPrivate(key) => formatter
                .debug_struct("RsaPrivate")
                .field("modulus_bits", &key.n().bits())
                .finish_non_exhaustive(),
            Self::RsaPublic(key) => formatter
                .debug_struct("RsaPublic")
                .field("modulus_bits", &key.n().bits())
                .finish_non_exhaustive(),
            Self::EcPrivate(key) => formatter.debug_tuple("EcPrivate").field(key).finish(),
            Self::EcPublic(key) => formatter.debug_tuple("EcPublic").field(key).finish(),
        }
    }
}

impl KeyMaterial {
    /// Wraps an HMAC secret.
    pub fn hmac(secret: impl AsRef<[u8]>) -> Self {
        Self::Hmac(HmacKey::new(secret))
    }

    /// Generates an RSA private key with the specified modulus size.
    ///
    /// # Errors
    ///
    /// Fails with [`KeyError::WeakKeySize`] if `modulus_bits` is less than
    /// [`MIN_MODULUS_BITS`](crate::alg::MIN_MODULUS_BITS).
    pub fn generate_rsa<R: CryptoRng + RngCore>(
        rng: &mut R,
        modulus_bits: usize,
    ) -> Result<Self, KeyError> {
        alg::generate_rsa(rng, modulus_bits).map(Self::RsaPrivate)
    }

    /// Generates an HMAC secret for `algorithm`; the secret is as long as the hash block.
    pub fn generate_hmac<R: CryptoRng + RngCore>(
        rng: &mut R,
        algorithm: Algorithm,
    ) -> Result<Self, KeyError> {
        let block_len = match algorithm {
            Algorithm::Hs256 => 64,
            Algorithm::Hs384 | Algorithm::Hs512 => 128,
            _ => {
                return Err(KeyError::AlgorithmKeyMismatch {
                    algorithm,
                    key_family: KeyFamily::Hmac,
                    key_curve: None,
                })
            }
        };
        Ok(Self::Hmac(HmacKey::generate(rng, block_len)))
    }

    /// Generates an ECDSA private key on the specified curve.
    pub fn generate_ec<R: CryptoRng + RngCore>(rng: &mut R, curve: Curve) -> Result<Self, KeyError> {
        EcSigningKey::generate(rng, curve).map(Self::EcPrivate)
    }

    /// Returns the key family.
    pub fn family(&self) -> KeyFamily {
        match self {
            Self::Hmac(_) => KeyFamily::Hmac,
            Self::RsaPrivate(_) | Self::RsaPublic(_) => KeyFamily::Rsa,
            Self::EcPrivate(_) | Self::EcPublic(_) => KeyFamily::Ec,
        }
    }

    /// Returns the curve for EC keys.
    pub fn curve(&self) -> Option<Curve> {
        match self {
            Self::EcPrivate(key) => Some(key.curve()),
            Self::EcPublic(key) => Some(key.curve()),
            _ => None,
        }
    }

    /// Returns the RSA modulus size in bits for RSA keys.
    pub fn modulus_bits(&self) -> Option<usize> {
        match self {
            Self::RsaPrivate(key) => Some(key.n().bits()),
            Self::RsaPublic(key) => Some(key.n().bits()),
            _ => None,
        }
    }

    /// Checks whether this key can produce signatures.
    pub fn can_sign(&self) -> bool {
        matches!(self, Self::Hmac(_) | Self::RsaPrivate(_) | Self::EcPrivate(_))
    }

    /// Returns the verify-only counterpart of this key. Public keys are returned as is;
    /// HMAC secrets are symmetric, so the secret itself is returned.
    pub fn to_verifying(&self) -> Self {
        match self {
            Self::RsaPrivate(key) => Self::RsaPublic(key.to_public_key()),
            Self::EcPrivate(key) => Self::EcPublic(key.verifying_key()),
            other => other.clone(),
        }
    }
}

impl From<HmacKey> for KeyMaterial {
    fn from(key: HmacKey) -> Self {
        Self::Hmac(key)
    }
}

impl From<RsaPrivateKey> for KeyMaterial {
    fn from(key: RsaPrivateKey) -> Self {
        Self::RsaPrivate(key)
    }
}

impl From<RsaPublicKey> for KeyMaterial {
    fn from(key: RsaPublicKey) -> Self {
        Self::RsaPublic(key)
    }
}

impl From<EcSigningKey> for KeyMaterial {
    fn from(key: EcSigningKey) -> Self {
        Self::EcPrivate(key)
    }
}

impl From<EcVerifyingKey> for KeyMaterial {
    fn from(key: EcVerifyingKey) -> Self {
        Self::EcPublic(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use assert_matches::assert_matches;

    #[test]
    fn rsa_generation_enforces_minimum_size() {
        let mut rng = rand::thread_rng();
        let err = KeyMaterial::generate_rsa(&mut rng, 1_023).unwrap_err();
        assert_matches!(err, KeyError::WeakKeySize { bits: 1_023, .. });

        let key = KeyMaterial::generate_rsa(&mut rng, 1_024).unwrap();
        assert_eq!(key.family(), KeyFamily::Rsa);
        assert_eq!(key.modulus_bits(), Some(1_024));
        assert!(key.can_sign());

        let public = key.to_verifying();
        assert_matches!(public, KeyMaterial::RsaPublic(_));
        assert!(!public.can_sign());
        assert_eq!(public.modulus_bits(), Some(1_024));
    }

    #[test]
    fn hmac_generation() {
        let mut rng = rand::thread_rng();
        let key = KeyMaterial::generate_hmac(&mut rng, Algorithm::Hs384).unwrap();
        assert_matches!(&key, KeyMaterial::Hmac(secret) if secret.len() == 128);
        assert_matches!(key.to_verifying(), KeyMaterial::Hmac(_));
        assert!(key.to_verifying().can_sign());

        let err = KeyMaterial::generate_hmac(&mut rng, Algorithm::Rs256).unwrap_err();
        assert_matches!(err, KeyError::AlgorithmKeyMismatch { .. });
    }

    #[test]
    fn ec_key_attributes() {
        let key = KeyMaterial::generate_ec(&mut rand::thread_rng(), Curve::P384).unwrap();
        assert_eq!(key.family(), KeyFamily::Ec);
        assert_eq!(key.curve(), Some(Curve::P384));
        assert_eq!(key.modulus_bits(), None);
        let public = key.to_verifying();
        assert_eq!(public.curve(), Some(Curve::P384));
        assert!(!public.can_sign());
    }

    #[test]
    fn debug_output_has_no_secrets() {
        let key = KeyMaterial::hmac(b"very-secret");
        let debug = format!("{key:?}");
        assert!(!debug.contains("very"), "{debug}");
    }
}
