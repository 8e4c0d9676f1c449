//! Association of a key with the single algorithm it may be used with.

use std::sync::Arc;

use crate::{
    alg::{self, Algorithm, KeyFamily},
    error::KeyError,
    key::KeyMaterial,
};

/// Key bound to one [`Algorithm`].
///
/// A binding is the only way to sign or verify: the key family (and the curve for
/// `ES*` algorithms) is checked once on construction, so a binding can never apply
/// a key with an algorithm of another family. Bindings are immutable; the key is shared
/// via [`Arc`], so several bindings may use the same key.
///
/// # Examples
///
/// ```
/// use jws_bearer::{Algorithm, Binding, KeyMaterial};
///
/// let key = KeyMaterial::hmac(b"super_secret_key_donut_steel");
/// let binding = Binding::new(Algorithm::Hs256, key)?.with_key_id("main");
/// let signature = binding.sign(b"message")?;
/// assert!(binding.verify(b"message", &signature)?);
/// assert!(!binding.verify(b"other message", &signature)?);
/// # Ok::<_, jws_bearer::KeyError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Binding {
    algorithm: Algorithm,
    key: Arc<KeyMaterial>,
    key_id: Option<String>,
}

impl Binding {
    /// Binds `key` to `algorithm`.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::AlgorithmKeyMismatch`] if the key family or curve does not fit
    /// the algorithm, and [`KeyError::WeakKeySize`] if an RSA modulus is shorter than
    /// [`MIN_MODULUS_BITS`](crate::alg::MIN_MODULUS_BITS).
    pub fn new(algorithm: Algorithm, key: impl Into<Arc<KeyMaterial>>) -> Result<Self, KeyError> {
        let key = key.into();
        if !is_compatible(algorithm, &key) {
            tracing::warn!(
                %algorithm,
                key_family = %key.family(),
                "rejected incompatible key"
            );
            return Err(KeyError::AlgorithmKeyMismatch {
                algorithm,
                key_family: key.family(),
                key_curve: key.curve(),
            });
        }
        match &*key {
            KeyMaterial::RsaPrivate(private_key) => {
                alg::check_modulus(&private_key.to_public_key())?;
            }
            KeyMaterial::RsaPublic(public_key) => alg::check_modulus(public_key)?,
            _ => {}
        }
        tracing::debug!(%algorithm, can_sign = key.can_sign(), "bound key");
        Ok(Self {
            algorithm,
            key,
            key_id: None,
        })
    }

    /// Sets the key identifier, which is copied into the `kid` header field of signed tokens.
    #[must_use]
    pub fn with_key_id(mut self, key_id: impl Into<String>) -> Self {
        self.key_id = Some(key_id.into());
        self
    }

    /// Returns the bound algorithm.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Returns the bound key.
    pub fn key(&self) -> &KeyMaterial {
        &self.key
    }

    /// Returns the key identifier, if any.
    pub fn key_id(&self) -> Option<&str> {
        self.key_id.as_deref()
    }

    /// Checks whether this binding can produce signatures.
    pub fn can_sign(&self) -> bool {
        self.key.can_sign()
    }

    /// Returns a binding of the same algorithm and key id to the verify-only counterpart
    /// of the key.
    #[must_use]
    pub fn to_verifying(&self) -> Self {
        Self {
            algorithm: self.algorithm,
            key: Arc::new(self.key.to_verifying()),
            key_id: self.key_id.clone(),
        }
    }

    /// Signs `message`.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::VerifyOnlyKey`] if the key is public.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, KeyError> {
        let hash = self.algorithm.hash_alg();
        match &*self.key {
            KeyMaterial::Hmac(key) => Ok(key.sign(hash, message).to_vec()),
            KeyMaterial::RsaPrivate(key) => {
                let padding = self.rsa_padding()?;
                alg::rsa_sign(key, hash, padding, message)
            }
            KeyMaterial::EcPrivate(key) => alg::ec_sign(key, message).map(|sig| sig.to_vec()),
            KeyMaterial::RsaPublic(_) | KeyMaterial::EcPublic(_) => Err(KeyError::VerifyOnlyKey),
        }
    }

    /// Verifies `signature` over `message`. Returns `Ok(false)` if the signature does not match.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::MalformedSignature`] if the signature is structurally invalid
    /// for the algorithm (e.g., has an incorrect length).
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<bool, KeyError> {
        let hash = self.algorithm.hash_alg();
        let result = match &*self.key {
            KeyMaterial::Hmac(key) => key.verify(hash, message, signature),
            KeyMaterial::RsaPrivate(key) => {
                let padding = self.rsa_padding()?;
                alg::rsa_verify(&key.to_public_key(), hash, padding, message, signature)
            }
            KeyMaterial::RsaPublic(key) => {
                let padding = self.rsa_padding()?;
                alg::rsa_verify(key, hash, padding, message, signature)
            }
            KeyMaterial::EcPrivate(key) => alg::ec_verify(&key.verifying_key(), message, signature),
            KeyMaterial::EcPublic(key) => alg::ec_verify(key, message, signature),
        };
        result.map_err(KeyError::MalformedSignature)
    }

    fn rsa_padding(&self) -> Result<alg::Padding, KeyError> {
        self.algorithm
            .rsa_padding()
            .ok_or_else(|| self.mismatch_error())
    }

    fn mismatch_error(&self) -> KeyError {
        KeyError::AlgorithmKeyMismatch {
            algorithm: self.algorithm,
            key_family: self.key.family(),
            key_curve: self.key.curve(),
        }
    }
}

fn is_compatible(algorithm: Algorithm, key: &KeyMaterial) -> bool {
    match (algorithm.key_family(), key) {
        (KeyFamily::Hmac, KeyMaterial::Hmac(_))
        | (KeyFamily::Rsa, KeyMaterial::RsaPrivate(_) | KeyMaterial::RsaPublic(_)) => true,
        (KeyFamily::Ec, KeyMaterial::EcPrivate(_) | KeyMaterial::EcPublic(_)) => {
            algorithm.curve() == key.curve()
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alg::Curve;

    use assert_matches::assert_matches;

    #[test]
    fn hmac_binding() {
        let key = KeyMaterial::hmac(b"secret");
        for alg in [Algorithm::Hs256, Algorithm::Hs384, Algorithm::Hs512] {
            let binding = Binding::new(alg, key.clone()).unwrap();
            let signature = binding.sign(b"message").unwrap();
            assert_eq!(signature.len() * 8, alg.digest_bits());
            assert!(binding.verify(b"message", &signature).unwrap());
        }

        for alg in [Algorithm::Rs256, Algorithm::Ps256, Algorithm::Es256] {
            let err = Binding::new(alg, key.clone()).unwrap_err();
            assert_matches!(
                err,
                KeyError::AlgorithmKeyMismatch { algorithm, key_family: KeyFamily::Hmac, .. }
                    if algorithm == alg
            );
        }
    }

    #[test]
    fn ec_binding_checks_curve() {
        let key = Arc::new(KeyMaterial::generate_ec(&mut rand::thread_rng(), Curve::P256).unwrap());
        Binding::new(Algorithm::Es256, Arc::clone(&key)).unwrap();

        for alg in [Algorithm::Es384, Algorithm::Es512] {
            let err = Binding::new(alg, Arc::clone(&key)).unwrap_err();
            assert_matches!(
                err,
                KeyError::AlgorithmKeyMismatch {
                    key_family: KeyFamily::Ec,
                    key_curve: Some(Curve::P256),
                    ..
                }
            );
        }
        assert_matches!(
            Binding::new(Algorithm::Hs256, key).unwrap_err(),
            KeyError::AlgorithmKeyMismatch { .. }
        );
    }

    #[test]
    fn bindings_share_key() {
        let key = Arc::new(KeyMaterial::hmac(b"secret"));
        let first = Binding::new(Algorithm::Hs256, Arc::clone(&key)).unwrap();
        let second = Binding::new(Algorithm::Hs512, Arc::clone(&key)).unwrap();
        assert_eq!(Arc::strong_count(&key), 3);
        assert!(first.sign(b"test").unwrap().len() < second.sign(b"test").unwrap().len());
    }

    #[test]
    fn verifying_binding_cannot_sign() {
        let key = KeyMaterial::generate_ec(&mut rand::thread_rng(), Curve::P384).unwrap();
        let binding = Binding::new(Algorithm::Es384, key)
            .unwrap()
            .with_key_id("ec");
        let signature = binding.sign(b"message").unwrap();

        let verifying = binding.to_verifying();
        assert_eq!(verifying.algorithm(), Algorithm::Es384);
        assert_eq!(verifying.key_id(), Some("ec"));
        assert!(!verifying.can_sign());
        assert_matches!(verifying.sign(b"message").unwrap_err(), KeyError::VerifyOnlyKey);
        assert!(verifying.verify(b"message", &signature).unwrap());
    }

    #[test]
    fn weak_rsa_keys_cannot_be_bound() {
        let weak_key = rsa::RsaPrivateKey::new(&mut rand::thread_rng(), 512).unwrap();
        let public_key = weak_key.to_public_key();

        let err = Binding::new(Algorithm::Rs256, KeyMaterial::from(weak_key)).unwrap_err();
        assert_matches!(
            err,
            KeyError::WeakKeySize {
                bits: 512,
                min_bits: 1_024
            }
        );
        let err = Binding::new(Algorithm::Ps256, KeyMaterial::from(public_key)).unwrap_err();
        assert_matches!(err, KeyError::WeakKeySize { bits: 512, .. });
    }

    #[test]
    fn malformed_signatures() {
        let binding = Binding::new(Algorithm::Hs256, KeyMaterial::hmac(b"secret")).unwrap();
        let err = binding.verify(b"message", &[0; 31]).unwrap_err();
        assert_matches!(err, KeyError::MalformedSignature(_));
        assert!(!binding.verify(b"message", &[0; 32]).unwrap());
    }
}
