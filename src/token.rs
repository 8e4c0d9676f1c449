//! Compact JWS serialization: signing, parsing and verification of bearer tokens.

use base64ct::{Base64UrlUnpadded, Encoding};
use smallvec::{smallvec, SmallVec};

use core::str::FromStr;

use crate::{
    alg::Algorithm,
    binding::Binding,
    claims::Claims,
    error::{ClaimsError, CreationError, ParseError, Segment, VerificationError},
    header::Header,
};

/// Prefix of bearer tokens (note the trailing space).
pub const BEARER_PREFIX: &str = "Bearer ";

/// Maximum "reasonable" signature size in bytes; larger signatures spill to the heap.
const SIGNATURE_SIZE: usize = 128;

/// Signs `claims` with `binding` and returns the bearer token,
/// `Bearer <header>.<claims>.<signature>`.
///
/// The header contains the binding algorithm, `"typ":"JWT"` and the binding key id, if any.
///
/// # Errors
///
/// Fails if the binding key cannot sign (e.g., it is a public key).
pub fn sign_bearer(claims: &Claims, binding: &Binding) -> Result<String, CreationError> {
    let compact = sign_compact(claims, binding)?;
    Ok(format!("{BEARER_PREFIX}{compact}"))
}

/// Signs `claims` with `binding` and returns the compact serialization without the bearer
/// prefix.
///
/// # Errors
///
/// Fails if the binding key cannot sign (e.g., it is a public key).
pub fn sign_compact(claims: &Claims, binding: &Binding) -> Result<String, CreationError> {
    let mut header = Header::new(binding.algorithm());
    if let Some(key_id) = binding.key_id() {
        header = header.with_key_id(key_id);
    }
    let header = header.encode().map_err(CreationError::Header)?;
    let mut buffer = Base64UrlUnpadded::encode_string(header.as_bytes());

    buffer.push('.');
    let claims = serde_json::to_string(claims).map_err(CreationError::Claims)?;
    buffer.push_str(&Base64UrlUnpadded::encode_string(claims.as_bytes()));

    let signature = binding.sign(buffer.as_bytes())?;
    buffer.push('.');
    buffer.push_str(&Base64UrlUnpadded::encode_string(&signature));
    Ok(buffer)
}

/// Parsed, not yet verified JWS token.
///
/// A token is obtained via [`Self::parse()`] (bearer form) or [`Self::from_compact()`];
/// parsing involves no cryptography. The token keeps the original signed bytes, so
/// verification never re-serializes the header or claims.
///
/// # Examples
///
/// ```
/// use jws_bearer::{sign_bearer, Algorithm, Binding, Claims, JwsToken, KeyMaterial};
///
/// let binding = Binding::new(Algorithm::Hs256, KeyMaterial::hmac(b"secret"))?;
/// let claims = Claims::new().with_subject("alice");
/// let bearer = sign_bearer(&claims, &binding)?;
///
/// let token = JwsToken::parse(&bearer)?;
/// assert_eq!(token.algorithm(), Algorithm::Hs256);
/// assert_eq!(token.claims().subject(), Some("alice"));
/// assert!(token.verify(&binding)?);
/// assert!(!token.verify_with(&binding, |claims| Ok(claims.subject() == Some("bob")))?);
/// # Ok::<_, Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct JwsToken {
    compact: String,
    signed_len: usize,
    header: Header,
    claims: Claims,
    signature: SmallVec<[u8; SIGNATURE_SIZE]>,
}

impl JwsToken {
    /// Parses a bearer token (`Bearer <compact>`).
    ///
    /// # Errors
    ///
    /// Fails if the prefix is missing, or if the remainder is not a well-formed
    /// compact serialization (see [`Self::from_compact()`]).
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        match raw.strip_prefix(BEARER_PREFIX) {
            Some(compact) if !compact.is_empty() => Self::from_compact(compact),
            _ => Err(ParseError::MissingBearerPrefix),
        }
    }

    /// Parses a compact serialization, `<header>.<claims>.<signature>`.
    ///
    /// # Errors
    ///
    /// Fails if the token does not consist of 3 non-empty segments, if a segment is not
    /// valid base64url, if the header is invalid or if the claims are not a JSON object.
    pub fn from_compact(compact: &str) -> Result<Self, ParseError> {
        let token_parts: Vec<_> = compact.splitn(4, '.').collect();
        let [header, claims, signature] = token_parts[..] else {
            return Err(ParseError::MalformedCompactSerialization);
        };
        if header.is_empty() || claims.is_empty() || signature.is_empty() {
            return Err(ParseError::MalformedCompactSerialization);
        }

        let header_bytes = decode_segment(header, Segment::Header)?;
        let header = Header::decode_slice(&header_bytes)?;

        let claims_bytes = decode_segment(claims, Segment::Claims)?;
        let claims: Claims =
            serde_json::from_slice(&claims_bytes).map_err(ParseError::MalformedClaims)?;

        let mut decoded_signature = smallvec![0; 3 * (signature.len() + 3) / 4];
        let signature_len = Base64UrlUnpadded::decode(signature, &mut decoded_signature[..])
            .map_err(ParseError::MalformedSignature)?
            .len();
        decoded_signature.truncate(signature_len);

        let signed_len = compact.len() - signature.len() - 1;
        Ok(Self {
            compact: compact.to_owned(),
            signed_len,
            header,
            claims,
            signature: decoded_signature,
        })
    }

    /// Returns the compact serialization of this token (without the bearer prefix).
    pub fn compact(&self) -> &str {
        &self.compact
    }

    /// Returns the token header.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Returns the algorithm declared in the token header.
    pub fn algorithm(&self) -> Algorithm {
        self.header.algorithm()
    }

    /// Returns the token claims.
    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    /// Returns the decoded signature bytes.
    pub fn signature_bytes(&self) -> &[u8] {
        &self.signature
    }

    /// Returns the signed bytes: the original `<header>.<claims>` segments.
    pub fn signed_data(&self) -> &[u8] {
        &self.compact.as_bytes()[..self.signed_len]
    }

    /// Verifies the token signature with `binding`.
    ///
    /// Returns `Ok(false)` if the signature is invalid.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationError::AlgorithmMismatch`] if the token algorithm differs
    /// from the binding one. The check precedes any cryptographic work.
    pub fn verify(&self, binding: &Binding) -> Result<bool, VerificationError> {
        self.verify_with(binding, |_| Ok(true))
    }

    /// Verifies the token signature with `binding` and then applies `validator` to the claims.
    ///
    /// The result is `true` only if both the signature and the validator succeed. The validator
    /// is not invoked if the signature is invalid.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationError::AlgorithmMismatch`] if the token algorithm differs
    /// from the binding one (the validator is not invoked in this case), and
    /// [`VerificationError::Claims`] if the validator fails.
    pub fn verify_with<F>(&self, binding: &Binding, validator: F) -> Result<bool, VerificationError>
    where
        F: FnOnce(&Claims) -> Result<bool, ClaimsError>,
    {
        let expected = binding.algorithm();
        let actual = self.algorithm();
        if expected != actual {
            tracing::warn!(%expected, %actual, "token algorithm differs from binding");
            return Err(VerificationError::AlgorithmMismatch { expected, actual });
        }

        let is_valid = match binding.verify(self.signed_data(), &self.signature) {
            Ok(is_valid) => is_valid,
            Err(err) => {
                tracing::debug!(%err, "malformed token signature");
                false
            }
        };
        if !is_valid {
            tracing::debug!(algorithm = %actual, "token signature verification failed");
            return Ok(false);
        }
        validator(&self.claims).map_err(VerificationError::Claims)
    }
}

impl FromStr for JwsToken {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn decode_segment(segment: &str, kind: Segment) -> Result<Vec<u8>, ParseError> {
    Base64UrlUnpadded::decode_vec(segment).map_err(|error| ParseError::Base64 {
        segment: kind,
        error,
    })
}
