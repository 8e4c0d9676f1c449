//! Error handling.

use core::fmt;

use crate::alg::{Algorithm, Curve, KeyFamily};

/// Algorithm name that does not name any entry of the [`Algorithm`] registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAlgorithm(pub(crate) String);

impl UnknownAlgorithm {
    /// Returns the unrecognized name.
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnknownAlgorithm {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "unknown signature algorithm `{}`", self.0)
    }
}

impl std::error::Error for UnknownAlgorithm {}

/// Errors that may occur when decoding a token header.
#[derive(Debug)]
#[non_exhaustive]
pub enum HeaderError {
    /// Header is not a JSON object.
    MalformedJson(serde_json::Error),
    /// The `typ` field is absent or is not exactly `"JWT"`.
    InvalidOrMissingTyp,
    /// The `alg` field is absent.
    MissingAlg,
    /// The `alg` field is not a string naming a supported algorithm.
    UnknownAlgorithm(UnknownAlgorithm),
    /// The `kid` field is present, but is not a string.
    InvalidKeyId,
}

impl fmt::Display for HeaderError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedJson(e) => write!(formatter, "header is not a JSON object: {e}"),
            Self::InvalidOrMissingTyp => {
                formatter.write_str("header `typ` field is missing or differs from `JWT`")
            }
            Self::MissingAlg => formatter.write_str("header `alg` field is missing"),
            Self::UnknownAlgorithm(e) => write!(formatter, "header `alg` field: {e}"),
            Self::InvalidKeyId => formatter.write_str("header `kid` field is not a string"),
        }
    }
}

impl std::error::Error for HeaderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::MalformedJson(e) => Some(e),
            Self::UnknownAlgorithm(e) => Some(e),
            _ => None,
        }
    }
}

/// Errors related to key material: generation, loading, and binding to an algorithm.
#[derive(Debug)]
#[non_exhaustive]
pub enum KeyError {
    /// RSA modulus is shorter than the supported minimum.
    WeakKeySize {
        /// Requested / actual modulus size in bits.
        bits: usize,
        /// Minimum supported modulus size in bits.
        min_bits: usize,
    },
    /// Key family (or curve) does not fit the algorithm.
    AlgorithmKeyMismatch {
        /// Algorithm the key was bound to.
        algorithm: Algorithm,
        /// Family of the supplied key.
        key_family: KeyFamily,
        /// Curve of the supplied key, for EC keys.
        key_curve: Option<Curve>,
    },
    /// Key is encrypted, but no passphrase supplier was configured.
    PassphraseRequired,
    /// Signing was requested from a key that can only verify.
    VerifyOnlyKey,
    /// Signature is structurally malformed for the algorithm (e.g., has an incorrect length).
    MalformedSignature(anyhow::Error),
    /// Signature could not be produced by the crypto backend.
    Signing(anyhow::Error),
    /// Key file cannot be read.
    Io(std::io::Error),
    /// Encrypted key cannot be decrypted (wrong passphrase or corrupted ciphertext).
    Decrypt(pkcs8::Error),
    /// Key format or key algorithm is not supported.
    UnsupportedKey(String),
    /// Key is encoded incorrectly.
    MalformedKey(anyhow::Error),
    /// Key generation has failed.
    Generation(rsa::Error),
}

impl fmt::Display for KeyError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WeakKeySize { bits, min_bits } => write!(
                formatter,
                "RSA modulus has {bits} bits, while at least {min_bits} bits are required"
            ),
            Self::AlgorithmKeyMismatch {
                algorithm,
                key_family,
                key_curve: Some(curve),
            } => write!(
                formatter,
                "algorithm {algorithm} cannot be used with {key_family} key on curve {curve}"
            ),
            Self::AlgorithmKeyMismatch {
                algorithm,
                key_family,
                key_curve: None,
            } => write!(
                formatter,
                "algorithm {algorithm} cannot be used with {key_family} key"
            ),
            Self::PassphraseRequired => {
                formatter.write_str("key is encrypted, but no passphrase was supplied")
            }
            Self::VerifyOnlyKey => formatter.write_str("key can only be used for verification"),
            Self::MalformedSignature(e) => write!(formatter, "malformed signature: {e}"),
            Self::Signing(e) => write!(formatter, "cannot create signature: {e}"),
            Self::Io(e) => write!(formatter, "cannot read key: {e}"),
            Self::Decrypt(e) => write!(formatter, "cannot decrypt key: {e}"),
            Self::UnsupportedKey(kind) => write!(formatter, "unsupported key: {kind}"),
            Self::MalformedKey(e) => write!(formatter, "malformed key: {e}"),
            Self::Generation(e) => write!(formatter, "cannot generate key: {e}"),
        }
    }
}

impl std::error::Error for KeyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::MalformedSignature(e) | Self::Signing(e) | Self::MalformedKey(e) => {
                Some(e.as_ref())
            }
            Self::Io(e) => Some(e),
            Self::Decrypt(e) => Some(e),
            Self::Generation(e) => Some(e),
            _ => None,
        }
    }
}

/// Segment of the compact token serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    /// Header (the first segment).
    Header,
    /// Claims (the second segment).
    Claims,
}

impl fmt::Display for Segment {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Header => "header",
            Self::Claims => "claims",
        })
    }
}

/// Errors that may occur during token parsing.
#[derive(Debug)]
#[non_exhaustive]
pub enum ParseError {
    /// Token does not start with `Bearer `, or nothing follows the prefix.
    MissingBearerPrefix,
    /// Token has invalid structure.
    ///
    /// Valid tokens must consist of 3 non-empty base64url-encoded parts
    /// (header, claims, and signature) separated by periods.
    MalformedCompactSerialization,
    /// Cannot decode base64 in the header or claims segment.
    Base64 {
        /// Segment that failed decoding.
        segment: Segment,
        /// Decoding error.
        error: base64ct::Error,
    },
    /// Token header cannot be decoded.
    Header(HeaderError),
    /// Token claims are not a JSON object.
    MalformedClaims(serde_json::Error),
    /// Signature segment is not valid base64url.
    MalformedSignature(base64ct::Error),
}

impl fmt::Display for ParseError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingBearerPrefix => formatter.write_str("token lacks `Bearer ` prefix"),
            Self::MalformedCompactSerialization => formatter.write_str("invalid token structure"),
            Self::Base64 { segment, error } => {
                write!(formatter, "base64 decoding error in {segment}: {error}")
            }
            Self::Header(e) => write!(formatter, "malformed token header: {e}"),
            Self::MalformedClaims(e) => write!(formatter, "cannot deserialize claims: {e}"),
            Self::MalformedSignature(e) => write!(formatter, "malformed signature encoding: {e}"),
        }
    }
}

impl From<HeaderError> for ParseError {
    fn from(error: HeaderError) -> Self {
        Self::Header(error)
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Base64 { error, .. } | Self::MalformedSignature(error) => Some(error),
            Self::Header(e) => Some(e),
            Self::MalformedClaims(e) => Some(e),
            _ => None,
        }
    }
}

/// Identifier of a claim in [`Claims`](crate::Claims).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Claim {
    /// `iss` claim (issuer).
    Issuer,
    /// `sub` claim (subject).
    Subject,
    /// `aud` claim (audience).
    Audience,
    /// `exp` claim (expiration time).
    Expiration,
    /// `nbf` claim (valid not before).
    NotBefore,
    /// `iat` claim (issued at).
    IssuedAt,
    /// `jti` claim (token identifier).
    JwtId,
    /// Any other claim.
    Custom(String),
}

impl Claim {
    /// Resolves a claim name, mapping registered names onto dedicated variants.
    pub fn from_name(name: &str) -> Self {
        match name {
            "iss" => Self::Issuer,
            "sub" => Self::Subject,
            "aud" => Self::Audience,
            "exp" => Self::Expiration,
            "nbf" => Self::NotBefore,
            "iat" => Self::IssuedAt,
            "jti" => Self::JwtId,
            other => Self::Custom(other.to_owned()),
        }
    }

    /// Returns the claim name as it appears in the token claims.
    pub fn name(&self) -> &str {
        match self {
            Self::Issuer => "iss",
            Self::Subject => "sub",
            Self::Audience => "aud",
            Self::Expiration => "exp",
            Self::NotBefore => "nbf",
            Self::IssuedAt => "iat",
            Self::JwtId => "jti",
            Self::Custom(name) => name,
        }
    }
}

impl fmt::Display for Claim {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.name())
    }
}

/// Failed claim check.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ClaimsError {
    /// Claim requested during validation is not present in the token.
    Missing(Claim),
    /// Claim value differs from the expected one.
    Mismatch(Claim),
    /// Claim has an unexpected type (e.g., a non-numeric timestamp).
    Malformed(Claim),
    /// Token has expired.
    Expired,
    /// Token is not yet valid as per `nbf` claim.
    NotMature,
}

impl fmt::Display for ClaimsError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing(claim) => write!(
                formatter,
                "claim `{claim}` requested during validation is not present in the token"
            ),
            Self::Mismatch(claim) => write!(formatter, "claim `{claim}` has unexpected value"),
            Self::Malformed(claim) => write!(formatter, "claim `{claim}` has unexpected type"),
            Self::Expired => formatter.write_str("token has expired"),
            Self::NotMature => formatter.write_str("token is not yet ready"),
        }
    }
}

impl std::error::Error for ClaimsError {}

/// Errors that can occur during token verification.
#[derive(Debug)]
#[non_exhaustive]
pub enum VerificationError {
    /// Algorithm mentioned in the token header differs from the binding one.
    AlgorithmMismatch {
        /// Algorithm of the verifying binding.
        expected: Algorithm,
        /// Actual algorithm in the token.
        actual: Algorithm,
    },
    /// Claims validator has failed.
    Claims(ClaimsError),
}

impl fmt::Display for VerificationError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlgorithmMismatch { expected, actual } => write!(
                formatter,
                "token algorithm ({actual}) differs from expected ({expected})"
            ),
            Self::Claims(e) => write!(formatter, "claims validation failed: {e}"),
        }
    }
}

impl From<ClaimsError> for VerificationError {
    fn from(error: ClaimsError) -> Self {
        Self::Claims(error)
    }
}

impl std::error::Error for VerificationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Claims(e) => Some(e),
            Self::AlgorithmMismatch { .. } => None,
        }
    }
}

/// Errors that can occur during token creation.
#[derive(Debug)]
#[non_exhaustive]
pub enum CreationError {
    /// Token header cannot be serialized.
    Header(serde_json::Error),
    /// Token claims cannot be serialized into JSON.
    Claims(serde_json::Error),
    /// Signature cannot be produced with the binding.
    Signing(KeyError),
}

impl fmt::Display for CreationError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Header(e) => write!(formatter, "cannot serialize header: {e}"),
            Self::Claims(e) => write!(formatter, "cannot serialize claims: {e}"),
            Self::Signing(e) => write!(formatter, "cannot sign token: {e}"),
        }
    }
}

impl From<KeyError> for CreationError {
    fn from(error: KeyError) -> Self {
        Self::Signing(error)
    }
}

impl std::error::Error for CreationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Header(e) | Self::Claims(e) => Some(e),
            Self::Signing(e) => Some(e),
        }
    }
}
