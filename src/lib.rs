//! Compact [JSON Web Signature][JWS] engine for bearer tokens, with strict binding
//! of keys to algorithms.
//!
//! # Design choices
//!
//! - Signature algorithms form a closed registry ([`Algorithm`]). Each algorithm belongs
//!   to a single key family, and a key can only be used through a [`Binding`], which is checked
//!   once on construction. A binding can never apply an RSA key with an HMAC algorithm
//!   or vice versa.
//! - Verification compares the `alg` field of the [JWT header] with the binding algorithm
//!   before doing anything else. A mismatch is an error rather than a failed verification,
//!   which eliminates [algorithm switching attacks][switching].
//! - The signature is verified over the original header and claims segments; parsed tokens
//!   are never re-serialized.
//! - Secrets (HMAC keys, passphrases, decrypted key documents) are zeroized on drop.
//!
//! ## Supported algorithms
//!
//! | Algorithm(s) | Key | Backend |
//! |--------------|-----|---------|
//! | `HS256`, `HS384`, `HS512` | shared secret | [`hmac`] + [`sha2`] |
//! | `RS256`, `RS384`, `RS512` | RSA, at least 1024 bits | [`rsa`] (PKCS#1 v1.5, blinded) |
//! | `PS256`, `PS384`, `PS512` | RSA, at least 1024 bits | [`rsa`] (PSS) |
//! | `ES256`, `ES384` | P-256, P-384 | [`p256`], [`p384`] |
//!
//! `ES512` is recognized in token headers, but no key can be bound to it.
//!
//! [JWS]: https://tools.ietf.org/html/rfc7515
//! [switching]: https://auth0.com/blog/critical-vulnerabilities-in-json-web-token-libraries/
//! [JWT header]: https://tools.ietf.org/html/rfc7519#section-5
//! [`hmac`]: https://docs.rs/hmac/
//! [`sha2`]: https://docs.rs/sha2/
//! [`rsa`]: https://docs.rs/rsa/
//! [`p256`]: https://docs.rs/p256/
//! [`p384`]: https://docs.rs/p384/
//!
//! # Logging
//!
//! The crate emits [`tracing`] events: key loading and binding construction are logged
//! on the `DEBUG` level, algorithm mismatches and rejected bindings on the `WARN` level.
//! Key material is never logged.
//!
//! [`tracing`]: https://docs.rs/tracing/
//!
//! # Examples
//!
//! Basic token lifecycle:
//!
//! ```
//! use chrono::Duration;
//! use jws_bearer::prelude::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! // Choose time-related options for token creation / validation.
//! let time_options = TimeOptions::default();
//! // Bind a symmetric HMAC key, which will be used both to create and verify tokens.
//! let key = KeyMaterial::hmac(b"super_secret_key_donut_steel");
//! let binding = Binding::new(Algorithm::Hs256, key)?.with_key_id("my-key");
//!
//! // Create a token.
//! let claims = Claims::new()
//!     .with_subject("alice")
//!     .set_duration_and_issuance(&time_options, Duration::days(7));
//! let bearer = sign_bearer(&claims, &binding)?;
//! assert!(bearer.starts_with("Bearer "));
//!
//! // Parse the token.
//! let token = JwsToken::parse(&bearer)?;
//! // Before verifying the token, we might find the key which has signed the token
//! // using the `kid` header field.
//! assert_eq!(token.header().key_id(), Some("my-key"));
//! // Verify the token integrity and claims.
//! let is_valid = token.verify_with(&binding, |claims| {
//!     claims
//!         .check()
//!         .subject("alice")
//!         .expiration(&time_options)
//!         .maturity(&time_options)
//!         .into_result()
//!         .map(|()| true)
//! })?;
//! assert!(is_valid);
//! # Ok(())
//! # } // end main()
//! ```
//!
//! Tokens signed with one algorithm are rejected by bindings of another:
//!
//! ```
//! # use jws_bearer::prelude::*;
//! # use assert_matches::assert_matches;
//! # fn main() -> anyhow::Result<()> {
//! let key = KeyMaterial::hmac(b"super_secret_key_donut_steel");
//! let hs256 = Binding::new(Algorithm::Hs256, key.clone())?;
//! let hs512 = Binding::new(Algorithm::Hs512, key)?;
//! let token = JwsToken::parse(&sign_bearer(&Claims::new(), &hs256)?)?;
//! assert_matches!(
//!     token.verify(&hs512),
//!     Err(VerificationError::AlgorithmMismatch { .. })
//! );
//! # Ok(())
//! # } // end main()
//! ```

#![doc(html_root_url = "https://docs.rs/jws-bearer/0.1.0")]
#![warn(missing_debug_implementations, missing_docs, bare_trait_objects)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::module_name_repetitions
)]

pub mod alg;
mod binding;
mod claims;
mod error;
mod header;
mod key;
pub mod pem;
mod token;

/// Prelude to neatly import all necessary stuff from the crate.
pub mod prelude {
    pub use crate::{
        sign_bearer, Algorithm, Binding, Claims, JwsToken, KeyMaterial, TimeOptions,
        VerificationError,
    };
}

pub use crate::{
    alg::{Algorithm, KeyFamily},
    binding::Binding,
    claims::{CheckOutcome, Checker, Claims, TimeOptions},
    error::{
        Claim, ClaimsError, CreationError, HeaderError, KeyError, ParseError, Segment,
        UnknownAlgorithm, VerificationError,
    },
    header::{Header, TOKEN_TYPE},
    key::KeyMaterial,
    token::{sign_bearer, sign_compact, JwsToken, BEARER_PREFIX},
};
