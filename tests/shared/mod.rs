//! Functionality shared by `algorithms` and `rsa` tests.

use assert_matches::assert_matches;
use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::{Duration, TimeZone, Utc};
use jws_bearer::{sign_bearer, Binding, Claims, JwsToken, KeyError, ParseError};
use rand::{seq::index::sample as sample_indexes, thread_rng};

pub fn create_claims() -> Claims {
    let now = Utc.with_ymd_and_hms(2020, 9, 1, 10, 0, 0).single().unwrap();
    Claims::new()
        .with_subject("1234567890")
        .with_claim("name", "John Doe")
        .with_issued_at(now)
        .with_expiration(now + Duration::days(7))
}

/// Checks that tokens signed with `signing` verify with `verifying`, and that mangling
/// the signature, header or claims is detected.
pub fn test_binding(signing: &Binding, verifying: &Binding) {
    // Maximum number of signature bits mangled.
    const MAX_MANGLED_BITS: usize = 128;

    let claims = create_claims();

    // Successful case.
    let bearer = sign_bearer(&claims, signing).unwrap();
    let token = JwsToken::parse(&bearer).unwrap();
    assert_eq!(token.algorithm(), signing.algorithm());
    assert_eq!(*token.claims(), claims);
    assert!(token.verify(verifying).unwrap());
    // Verification is idempotent.
    assert!(token.verify(verifying).unwrap());
    assert!(token.verify(signing).unwrap());

    // Mutate signature bits.
    let token_string = token.compact().to_owned();
    let signature_start = token_string.rfind('.').unwrap() + 1;
    let signature = token.signature_bytes().to_vec();
    let signature_bits = signature.len() * 8;

    let mangled_bits: Box<dyn Iterator<Item = usize>> = if signature_bits <= MAX_MANGLED_BITS {
        Box::new(0..signature_bits)
    } else {
        let indexes = sample_indexes(&mut thread_rng(), signature_bits, MAX_MANGLED_BITS);
        Box::new(indexes.into_iter())
    };

    for i in mangled_bits {
        let mut mangled_signature = signature.clone();
        mangled_signature[i / 8] ^= 1 << (i % 8);
        let mangled_signature = Base64UrlUnpadded::encode_string(&mangled_signature);

        let mut mangled_str = token_string.clone();
        mangled_str.replace_range(signature_start.., &mangled_signature);
        let token = JwsToken::from_compact(&mangled_str).unwrap();
        assert!(!token.verify(verifying).unwrap(), "mangled bit {i}");
    }

    // Mutate header: same fields in a different order.
    let mangled_header = format!(r#"{{"typ":"JWT","alg":"{}"}}"#, signing.algorithm());
    let mangled_header = Base64UrlUnpadded::encode_string(mangled_header.as_bytes());
    let header_end = token_string.find('.').unwrap();
    assert_ne!(mangled_header, &token_string[..header_end]);
    let mut mangled_str = token_string.clone();
    mangled_str.replace_range(..header_end, &mangled_header);
    let token = JwsToken::from_compact(&mangled_str).unwrap();
    assert!(!token.verify(verifying).unwrap());

    // Mutate claims.
    let issued_at = claims.issued_at().unwrap();
    let mangled_claims = claims.with_issued_at(issued_at + Duration::seconds(1));
    let claims_string =
        Base64UrlUnpadded::encode_string(&serde_json::to_vec(&mangled_claims).unwrap());
    assert_ne!(
        claims_string,
        token_string[(header_end + 1)..(signature_start - 1)]
    );
    let mut mangled_str = token_string.clone();
    mangled_str.replace_range((header_end + 1)..(signature_start - 1), &claims_string);
    let token = JwsToken::from_compact(&mangled_str).unwrap();
    assert!(!token.verify(verifying).unwrap());

    // Signing with the verifying binding is only possible for symmetric keys.
    if !verifying.can_sign() {
        let err = sign_bearer(&mangled_claims, verifying).unwrap_err();
        assert_matches!(err, jws_bearer::CreationError::Signing(KeyError::VerifyOnlyKey));
    }

    // Bearer prefix is required.
    let err = JwsToken::parse(&token_string).unwrap_err();
    assert_matches!(err, ParseError::MissingBearerPrefix);
}
