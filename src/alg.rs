//! Registry of supported signature algorithms together with their crypto backends.
//!
//! The set of algorithms is closed: every [`Algorithm`] maps to exactly one [`KeyFamily`]
//! and one digest width, and the canonical header name round-trips via
//! [`FromStr`](core::str::FromStr) / [`Display`](fmt::Display).
//!
//! | Algorithm | Family | Digest | Padding / curve |
//! |-----------|--------|--------|-----------------|
//! | `HS256`, `HS384`, `HS512` | HMAC | SHA-2 | – |
//! | `RS256`, `RS384`, `RS512` | RSA | SHA-2 | PKCS#1 v1.5 |
//! | `PS256`, `PS384`, `PS512` | RSA | SHA-2 | PSS |
//! | `ES256`, `ES384`, `ES512` | EC | SHA-2 | P-256, P-384, P-521 |

use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256, Sha384, Sha512};
use smallvec::SmallVec;

use core::{fmt, str::FromStr};

mod ecdsa;
mod generic;
mod hmacs;
mod rsa;

pub use self::{
    ecdsa::{Curve, EcSigningKey, EcVerifyingKey},
    generic::SecretBytes,
    hmacs::HmacKey,
    rsa::MIN_MODULUS_BITS,
};
pub(crate) use self::{
    ecdsa::{sign as ec_sign, verify as ec_verify},
    rsa::{
        check_modulus, generate as generate_rsa, sign as rsa_sign, verify as rsa_verify, Padding,
    },
};

use crate::error::UnknownAlgorithm;

/// Family of keys an [`Algorithm`] can be used with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyFamily {
    /// Shared secret for HMAC algorithms.
    Hmac,
    /// RSA key pair.
    Rsa,
    /// Elliptic curve key pair.
    Ec,
}

impl fmt::Display for KeyFamily {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Hmac => "HMAC",
            Self::Rsa => "RSA",
            Self::Ec => "EC",
        })
    }
}

/// Supported JWS signature algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    /// HMAC with SHA-256.
    Hs256,
    /// HMAC with SHA-384.
    Hs384,
    /// HMAC with SHA-512.
    Hs512,
    /// RSASSA-PKCS1-v1_5 with SHA-256.
    Rs256,
    /// RSASSA-PKCS1-v1_5 with SHA-384.
    Rs384,
    /// RSASSA-PKCS1-v1_5 with SHA-512.
    Rs512,
    /// RSASSA-PSS with SHA-256 and MGF1 with SHA-256.
    Ps256,
    /// RSASSA-PSS with SHA-384 and MGF1 with SHA-384.
    Ps384,
    /// RSASSA-PSS with SHA-512 and MGF1 with SHA-512.
    Ps512,
    /// ECDSA on the P-256 curve with SHA-256.
    Es256,
    /// ECDSA on the P-384 curve with SHA-384.
    Es384,
    /// ECDSA on the P-521 curve with SHA-512.
    Es512,
}

impl Algorithm {
    /// All supported algorithms.
    pub const ALL: [Self; 12] = [
        Self::Hs256,
        Self::Hs384,
        Self::Hs512,
        Self::Rs256,
        Self::Rs384,
        Self::Rs512,
        Self::Ps256,
        Self::Ps384,
        Self::Ps512,
        Self::Es256,
        Self::Es384,
        Self::Es512,
    ];

    /// Returns the name of this algorithm, as mentioned in the `alg` field of the JWT header.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Hs256 => "HS256",
            Self::Hs384 => "HS384",
            Self::Hs512 => "HS512",
            Self::Rs256 => "RS256",
            Self::Rs384 => "RS384",
            Self::Rs512 => "RS512",
            Self::Ps256 => "PS256",
            Self::Ps384 => "PS384",
            Self::Ps512 => "PS512",
            Self::Es256 => "ES256",
            Self::Es384 => "ES384",
            Self::Es512 => "ES512",
        }
    }

    /// Returns the key family this algorithm requires.
    pub const fn key_family(self) -> KeyFamily {
        match self {
            Self::Hs256 | Self::Hs384 | Self::Hs512 => KeyFamily::Hmac,
            Self::Rs256 | Self::Rs384 | Self::Rs512 | Self::Ps256 | Self::Ps384 | Self::Ps512 => {
                KeyFamily::Rsa
            }
            Self::Es256 | Self::Es384 | Self::Es512 => KeyFamily::Ec,
        }
    }

    /// Returns the digest width in bits.
    pub const fn digest_bits(self) -> usize {
        match self.hash_alg() {
            HashAlg::Sha256 => 256,
            HashAlg::Sha384 => 384,
            HashAlg::Sha512 => 512,
        }
    }

    /// Returns the curve required by an ECDSA algorithm, or `None` for other families.
    pub const fn curve(self) -> Option<Curve> {
        match self {
            Self::Es256 => Some(Curve::P256),
            Self::Es384 => Some(Curve::P384),
            Self::Es512 => Some(Curve::P521),
            _ => None,
        }
    }

    pub(crate) const fn hash_alg(self) -> HashAlg {
        match self {
            Self::Hs256 | Self::Rs256 | Self::Ps256 | Self::Es256 => HashAlg::Sha256,
            Self::Hs384 | Self::Rs384 | Self::Ps384 | Self::Es384 => HashAlg::Sha384,
            Self::Hs512 | Self::Rs512 | Self::Ps512 | Self::Es512 => HashAlg::Sha512,
        }
    }

    pub(crate) const fn rsa_padding(self) -> Option<Padding> {
        match self {
            Self::Rs256 | Self::Rs384 | Self::Rs512 => Some(Padding::Pkcs1v15),
            Self::Ps256 | Self::Ps384 | Self::Ps512 => Some(Padding::Pss),
            _ => None,
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = UnknownAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|alg| alg.name() == s)
            .ok_or_else(|| UnknownAlgorithm(s.to_owned()))
    }
}

impl Serialize for Algorithm {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// Hash function used by an algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HashAlg {
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlg {
    /// Digest size in bytes.
    pub(crate) const fn output_len(self) -> usize {
        match self {
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }

    pub(crate) fn digest(self, message: &[u8]) -> SmallVec<[u8; 64]> {
        match self {
            Self::Sha256 => SmallVec::from_slice(Sha256::digest(message).as_slice()),
            Self::Sha384 => SmallVec::from_slice(Sha384::digest(message).as_slice()),
            Self::Sha512 => SmallVec::from_slice(Sha512::digest(message).as_slice()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for alg in Algorithm::ALL {
            let parsed: Algorithm = alg.name().parse().unwrap();
            assert_eq!(parsed, alg);
            assert_eq!(alg.to_string(), alg.name());
        }
    }

    #[test]
    fn resolution_is_case_sensitive() {
        let err = "hs256".parse::<Algorithm>().unwrap_err();
        assert_eq!(err.name(), "hs256");
        assert!("RS256 ".parse::<Algorithm>().is_err());
        assert!("none".parse::<Algorithm>().is_err());
        assert!("".parse::<Algorithm>().is_err());
    }

    #[test]
    fn attributes_are_consistent() {
        for alg in Algorithm::ALL {
            let suffix: usize = alg.name()[2..].parse().unwrap();
            assert_eq!(alg.digest_bits(), suffix);
            assert_eq!(alg.hash_alg().output_len() * 8, suffix);
            assert_eq!(alg.curve().is_some(), alg.key_family() == KeyFamily::Ec);
            assert_eq!(
                alg.rsa_padding().is_some(),
                alg.key_family() == KeyFamily::Rsa
            );
        }
        assert_eq!(Algorithm::Es384.curve(), Some(Curve::P384));
        assert_eq!(Algorithm::Ps512.rsa_padding(), Some(Padding::Pss));
    }

    #[test]
    fn digest_widths_match_hash() {
        for hash in [HashAlg::Sha256, HashAlg::Sha384, HashAlg::Sha512] {
            assert_eq!(hash.digest(b"abc").len(), hash.output_len());
        }
    }

    #[test]
    fn algorithm_serializes_as_name() {
        let json = serde_json::to_string(&Algorithm::Es256).unwrap();
        assert_eq!(json, "\"ES256\"");
    }
}
