//! JOSE header of a compact JWS.

use serde::Serialize;
use serde_json::{Map, Value};

use core::str::FromStr;

use crate::{alg::Algorithm, error::HeaderError};

/// The only accepted value of the `typ` header field.
pub const TOKEN_TYPE: &str = "JWT";

/// JWS header.
///
/// The header is strict: `typ` must be exactly `"JWT"` and `alg` must name an entry
/// of the [`Algorithm`] registry. Other fields except for `kid` are ignored on decoding.
///
/// # Examples
///
/// ```
/// use jws_bearer::{Algorithm, Header};
///
/// let header: Header = r#"{"alg":"RS256","typ":"JWT"}"#.parse()?;
/// assert_eq!(header.algorithm(), Algorithm::Rs256);
/// assert_eq!(header.key_id(), None);
///
/// let header = Header::new(Algorithm::Es256).with_key_id("k1");
/// assert_eq!(header.encode()?, r#"{"alg":"ES256","kid":"k1","typ":"JWT"}"#);
/// # Ok::<_, Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    algorithm: Algorithm,
    key_id: Option<String>,
}

/// Serialized form of [`Header`]; field order defines the JSON key order.
#[derive(Serialize)]
struct RawHeader<'a> {
    alg: Algorithm,
    #[serde(skip_serializing_if = "Option::is_none")]
    kid: Option<&'a str>,
    typ: &'static str,
}

impl Header {
    /// Creates a header for the specified algorithm.
    pub fn new(algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            key_id: None,
        }
    }

    /// Sets the key identifier (the `kid` field).
    #[must_use]
    pub fn with_key_id(mut self, key_id: impl Into<String>) -> Self {
        self.key_id = Some(key_id.into());
        self
    }

    /// Returns the signature algorithm (the `alg` field).
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Returns the key identifier (the `kid` field).
    pub fn key_id(&self) -> Option<&str> {
        self.key_id.as_deref()
    }

    /// Returns the token type (the `typ` field), which is always `"JWT"`.
    pub fn token_type(&self) -> &'static str {
        TOKEN_TYPE
    }

    /// Decodes a header from its JSON text.
    ///
    /// # Errors
    ///
    /// Fails if the text is not a JSON object, `typ` is missing or differs from `"JWT"`,
    /// or `alg` is missing or does not name a supported algorithm.
    pub fn decode(json: &str) -> Result<Self, HeaderError> {
        Self::decode_slice(json.as_bytes())
    }

    pub(crate) fn decode_slice(json: &[u8]) -> Result<Self, HeaderError> {
        let fields: Map<String, Value> =
            serde_json::from_slice(json).map_err(HeaderError::MalformedJson)?;

        match fields.get("typ") {
            Some(Value::String(typ)) if typ == TOKEN_TYPE => {}
            _ => return Err(HeaderError::InvalidOrMissingTyp),
        }

        let algorithm = match fields.get("alg") {
            None => return Err(HeaderError::MissingAlg),
            Some(Value::String(name)) => name.parse().map_err(HeaderError::UnknownAlgorithm)?,
            Some(other) => {
                let err = crate::error::UnknownAlgorithm(other.to_string());
                return Err(HeaderError::UnknownAlgorithm(err));
            }
        };

        let key_id = match fields.get("kid") {
            None => None,
            Some(Value::String(kid)) => Some(kid.clone()),
            Some(_) => return Err(HeaderError::InvalidKeyId),
        };

        Ok(Self { algorithm, key_id })
    }

    /// Encodes this header into JSON with stable field order (`alg`, `kid`, `typ`).
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&RawHeader {
            alg: self.algorithm,
            kid: self.key_id.as_deref(),
            typ: TOKEN_TYPE,
        })
    }
}

impl FromStr for Header {
    type Err = HeaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use assert_matches::assert_matches;

    #[test]
    fn decoding_valid_headers() {
        let header = Header::decode(r#"{"typ":"JWT","alg":"HS256"}"#).unwrap();
        assert_eq!(header, Header::new(Algorithm::Hs256));
        assert_eq!(header.token_type(), "JWT");

        let header = Header::decode(r#"{"alg":"ES384","typ":"JWT","kid":"k","cty":"x"}"#).unwrap();
        assert_eq!(header.algorithm(), Algorithm::Es384);
        assert_eq!(header.key_id(), Some("k"));
    }

    #[test]
    fn typ_must_be_exactly_jwt() {
        for json in [
            r#"{"alg":"HS256"}"#,
            r#"{"alg":"HS256","typ":"jwt"}"#,
            r#"{"alg":"HS256","typ":"JWT "}"#,
            r#"{"alg":"HS256","typ":null}"#,
            r#"{"alg":"HS256","typ":["JWT"]}"#,
        ] {
            let err = Header::decode(json).unwrap_err();
            assert_matches!(err, HeaderError::InvalidOrMissingTyp, "{json}");
        }
    }

    #[test]
    fn alg_must_be_known() {
        let err = Header::decode(r#"{"typ":"JWT"}"#).unwrap_err();
        assert_matches!(err, HeaderError::MissingAlg);

        let err = Header::decode(r#"{"typ":"JWT","alg":"none"}"#).unwrap_err();
        assert_matches!(err, HeaderError::UnknownAlgorithm(e) if e.name() == "none");

        let err = Header::decode(r#"{"typ":"JWT","alg":256}"#).unwrap_err();
        assert_matches!(err, HeaderError::UnknownAlgorithm(_));
    }

    #[test]
    fn non_objects_are_malformed() {
        for json in ["", "[]", "\"JWT\"", "{\"typ\":\"JWT\"", "null"] {
            let err = Header::decode(json).unwrap_err();
            assert_matches!(err, HeaderError::MalformedJson(_), "{json}");
        }
    }

    #[test]
    fn key_id_must_be_string() {
        let err = Header::decode(r#"{"typ":"JWT","alg":"HS256","kid":1}"#).unwrap_err();
        assert_matches!(err, HeaderError::InvalidKeyId);
    }

    #[test]
    fn encoding_has_stable_order() {
        let header = Header::new(Algorithm::Ps256);
        let json = header.encode().unwrap();
        assert_eq!(json, r#"{"alg":"PS256","typ":"JWT"}"#);
        assert_eq!(Header::decode(&json).unwrap(), header);
    }
}
