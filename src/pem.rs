//! Loading keys from PEM files.
//!
//! Supported PEM labels:
//!
//! - `PRIVATE KEY` (PKCS#8) with an RSA, P-256 or P-384 key
//! - `ENCRYPTED PRIVATE KEY` (PKCS#8 with PBES2); requires a passphrase
//! - `RSA PRIVATE KEY` (PKCS#1)
//! - `PUBLIC KEY` (SPKI) with an RSA, P-256 or P-384 key
//! - `RSA PUBLIC KEY` (PKCS#1)

use pkcs8::{
    spki::SubjectPublicKeyInfoRef, DecodePrivateKey, DecodePublicKey, EncryptedPrivateKeyInfo,
    ObjectIdentifier, PrivateKeyInfo, SecretDocument,
};
use rsa::{
    pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey},
    RsaPrivateKey, RsaPublicKey,
};
use zeroize::Zeroizing;

use core::fmt;
use std::{fs, path::Path};

use crate::{
    alg::{self, EcSigningKey, EcVerifyingKey, SecretBytes},
    error::KeyError,
    key::KeyMaterial,
};

const RSA_ENCRYPTION: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");
const EC_PUBLIC_KEY: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");
const SECP256R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.3.1.7");
const SECP384R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.34");

/// Header line of PEM blocks encrypted in the legacy OpenSSL format.
const LEGACY_ENCRYPTION_MARKER: &str = "Proc-Type: 4,ENCRYPTED";

/// Buffer for a passphrase, filled by the supplier of a [`KeyLoader`].
/// The contents are zeroized on drop.
#[derive(Default)]
pub struct Passphrase(SecretBytes);

impl fmt::Debug for Passphrase {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_tuple("Passphrase").field(&"_").finish()
    }
}

impl Passphrase {
    /// Replaces the passphrase.
    pub fn set(&mut self, passphrase: impl AsRef<[u8]>) {
        self.0.replace(passphrase.as_ref());
    }

    /// Checks whether the passphrase is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

type PassphraseFn<'a> = Box<dyn FnOnce(&mut Passphrase) + 'a>;

/// Loader of PEM-encoded keys.
///
/// Encrypted keys require a passphrase supplier ([`Self::with_passphrase()`]). The supplier
/// is invoked synchronously, at most once, and only if the key is actually encrypted.
///
/// # Examples
///
/// ```no_run
/// use jws_bearer::{pem::KeyLoader, Algorithm, Binding};
///
/// let key = KeyLoader::new()
///     .with_passphrase(|passphrase| passphrase.set("12345"))
///     .load_file("keys/private.pem")?;
/// let binding = Binding::new(Algorithm::Rs256, key)?;
/// # Ok::<_, jws_bearer::KeyError>(())
/// ```
#[derive(Default)]
pub struct KeyLoader<'a> {
    passphrase_fn: Option<PassphraseFn<'a>>,
}

impl fmt::Debug for KeyLoader<'_> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("KeyLoader")
            .field("has_passphrase", &self.passphrase_fn.is_some())
            .finish()
    }
}

impl<'a> KeyLoader<'a> {
    /// Creates a loader without a passphrase supplier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the passphrase supplier.
    #[must_use]
    pub fn with_passphrase<F>(mut self, supplier: F) -> Self
    where
        F: FnOnce(&mut Passphrase) + 'a,
    {
        self.passphrase_fn = Some(Box::new(supplier));
        self
    }

    /// Reads and decodes a PEM file.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::Io`] if the file cannot be read, and other errors as per
    /// [`Self::load_pem()`].
    pub fn load_file(self, path: impl AsRef<Path>) -> Result<KeyMaterial, KeyError> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "loading key file");
        let pem = Zeroizing::new(fs::read_to_string(path).map_err(KeyError::Io)?);
        self.load_pem(&pem)
    }

    /// Decodes a PEM-encoded key.
    ///
    /// # Errors
    ///
    /// - [`KeyError::PassphraseRequired`] if the key is encrypted and no supplier is set
    /// - [`KeyError::Decrypt`] if the key cannot be decrypted with the supplied passphrase
    /// - [`KeyError::UnsupportedKey`] for unknown PEM labels and key algorithms
    /// - [`KeyError::MalformedKey`] if the key cannot be decoded
    pub fn load_pem(self, pem: &str) -> Result<KeyMaterial, KeyError> {
        let pem = pem.trim();
        if pem.contains(LEGACY_ENCRYPTION_MARKER) {
            tracing::debug!("PEM block uses legacy OpenSSL encryption");
            return Err(if self.passphrase_fn.is_some() {
                KeyError::UnsupportedKey("legacy OpenSSL-encrypted PEM; use PKCS#8".to_owned())
            } else {
                KeyError::PassphraseRequired
            });
        }

        let (label, der) =
            SecretDocument::from_pem(pem).map_err(|err| KeyError::MalformedKey(err.into()))?;
        tracing::debug!(label, "decoding PEM block");

        match label {
            "ENCRYPTED PRIVATE KEY" => {
                let supplier = self.passphrase_fn.ok_or(KeyError::PassphraseRequired)?;
                let mut passphrase = Passphrase::default();
                supplier(&mut passphrase);

                let info = EncryptedPrivateKeyInfo::try_from(der.as_bytes())
                    .map_err(|err| KeyError::MalformedKey(err.into()))?;
                let document = info
                    .decrypt(passphrase.as_bytes())
                    .map_err(KeyError::Decrypt)?;
                private_key_from_pkcs8(document.as_bytes())
            }
            "PRIVATE KEY" => private_key_from_pkcs8(der.as_bytes()),
            "RSA PRIVATE KEY" => {
                let key = RsaPrivateKey::from_pkcs1_der(der.as_bytes())
                    .map_err(|err| KeyError::MalformedKey(err.into()))?;
                checked_rsa_private(key)
            }
            "PUBLIC KEY" => public_key_from_spki(der.as_bytes()),
            "RSA PUBLIC KEY" => {
                let key = RsaPublicKey::from_pkcs1_der(der.as_bytes())
                    .map_err(|err| KeyError::MalformedKey(err.into()))?;
                alg::check_modulus(&key)?;
                Ok(key.into())
            }
            other => Err(KeyError::UnsupportedKey(format!("PEM label `{other}`"))),
        }
    }
}

fn malformed(err: pkcs8::Error) -> KeyError {
    KeyError::MalformedKey(err.into())
}

fn checked_rsa_private(key: RsaPrivateKey) -> Result<KeyMaterial, KeyError> {
    key.validate()
        .map_err(|err| KeyError::MalformedKey(err.into()))?;
    alg::check_modulus(&key.to_public_key())?;
    Ok(key.into())
}

fn private_key_from_pkcs8(der: &[u8]) -> Result<KeyMaterial, KeyError> {
    let info = PrivateKeyInfo::try_from(der).map_err(|err| KeyError::MalformedKey(err.into()))?;
    let oid = info.algorithm.oid;
    if oid == RSA_ENCRYPTION {
        let key = RsaPrivateKey::from_pkcs8_der(der).map_err(malformed)?;
        checked_rsa_private(key)
    } else if oid == EC_PUBLIC_KEY {
        let curve = info
            .algorithm
            .parameters_oid()
            .map_err(|err| KeyError::MalformedKey(err.into()))?;
        let key = if curve == SECP256R1 {
            EcSigningKey::P256(p256::ecdsa::SigningKey::from_pkcs8_der(der).map_err(malformed)?)
        } else if curve == SECP384R1 {
            EcSigningKey::P384(p384::ecdsa::SigningKey::from_pkcs8_der(der).map_err(malformed)?)
        } else {
            return Err(KeyError::UnsupportedKey(format!("EC curve {curve}")));
        };
        Ok(key.into())
    } else {
        Err(KeyError::UnsupportedKey(format!("key algorithm {oid}")))
    }
}

fn public_key_from_spki(der: &[u8]) -> Result<KeyMaterial, KeyError> {
    let info =
        SubjectPublicKeyInfoRef::try_from(der).map_err(|err| KeyError::MalformedKey(err.into()))?;
    let oid = info.algorithm.oid;
    if oid == RSA_ENCRYPTION {
        let key = RsaPublicKey::from_public_key_der(der)
            .map_err(|err| KeyError::MalformedKey(err.into()))?;
        alg::check_modulus(&key)?;
        Ok(key.into())
    } else if oid == EC_PUBLIC_KEY {
        let curve = info
            .algorithm
            .parameters_oid()
            .map_err(|err| KeyError::MalformedKey(err.into()))?;
        let key = if curve == SECP256R1 {
            let key = p256::ecdsa::VerifyingKey::from_public_key_der(der)
                .map_err(|err| KeyError::MalformedKey(err.into()))?;
            EcVerifyingKey::P256(key)
        } else if curve == SECP384R1 {
            let key = p384::ecdsa::VerifyingKey::from_public_key_der(der)
                .map_err(|err| KeyError::MalformedKey(err.into()))?;
            EcVerifyingKey::P384(key)
        } else {
            return Err(KeyError::UnsupportedKey(format!("EC curve {curve}")));
        };
        Ok(key.into())
    } else {
        Err(KeyError::UnsupportedKey(format!("key algorithm {oid}")))
    }
}
