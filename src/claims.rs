//! JWT claims and their validation.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Claim, ClaimsError};

/// Time-related validation options.
#[derive(Debug, Clone, Copy)]
#[non_exhaustive]
pub struct TimeOptions<F = fn() -> DateTime<Utc>> {
    /// Leeway to use during validation.
    pub leeway: Duration,
    /// Source of the current timestamps.
    pub clock_fn: F,
}

impl<F: Fn() -> DateTime<Utc>> TimeOptions<F> {
    /// Creates options based on the specified time leeway and clock function.
    pub fn new(leeway: Duration, clock_fn: F) -> Self {
        Self { leeway, clock_fn }
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock_fn)()
    }
}

impl TimeOptions {
    /// Creates options based on the specified time leeway. The clock source is [`Utc::now()`].
    pub fn from_leeway(leeway: Duration) -> Self {
        Self {
            leeway,
            clock_fn: Utc::now,
        }
    }
}

impl Default for TimeOptions {
    fn default() -> Self {
        Self::from_leeway(Duration::seconds(60))
    }
}

/// Claims encoded in a token: a JSON object mapping claim names to arbitrary values.
///
/// Registered claims (`iss`, `sub`, `aud`, `exp`, `nbf`, `iat`, `jti`) have typed getters
/// and builder methods. Claims are kept sorted by name, so serialization is deterministic.
/// Time claims are stored as numeric Unix timestamps (in seconds).
///
/// # Examples
///
/// ```
/// use chrono::{Duration, TimeZone, Utc};
/// use jws_bearer::Claims;
///
/// let claims = Claims::new()
///     .with_issuer("me")
///     .with_audiences(["api", "admin"])
///     .with_expiration(Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap())
///     .with_claim("role", "reader");
/// assert_eq!(claims.issuer(), Some("me"));
/// assert_eq!(claims.audiences(), ["api", "admin"]);
/// assert_eq!(
///     serde_json::to_string(&claims)?,
///     r#"{"aud":["api","admin"],"exp":1893456000,"iss":"me","role":"reader"}"#
/// );
/// # Ok::<_, serde_json::Error>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims {
    fields: Map<String, Value>,
}

impl From<Map<String, Value>> for Claims {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

impl Claims {
    /// Creates an empty claims instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the raw value of a claim.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Checks whether the claim is present.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Iterates over claims in the order of their names.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Returns the number of claims.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Checks whether there are no claims.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Inserts a claim, returning the previous value if any.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(name.into(), value.into())
    }

    /// Removes a claim, returning its value if it was present.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.fields.remove(name)
    }

    /// Sets a claim.
    #[must_use]
    pub fn with_claim(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Sets the issuer (`iss` claim).
    #[must_use]
    pub fn with_issuer(self, issuer: impl Into<String>) -> Self {
        self.with_claim(Claim::Issuer.name(), Value::String(issuer.into()))
    }

    /// Sets the subject (`sub` claim).
    #[must_use]
    pub fn with_subject(self, subject: impl Into<String>) -> Self {
        self.with_claim(Claim::Subject.name(), Value::String(subject.into()))
    }

    /// Sets a single audience (`aud` claim represented as a string).
    #[must_use]
    pub fn with_audience(self, audience: impl Into<String>) -> Self {
        self.with_claim(Claim::Audience.name(), Value::String(audience.into()))
    }

    /// Sets multiple audiences (`aud` claim represented as an array of strings).
    #[must_use]
    pub fn with_audiences<I>(self, audiences: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let audiences: Vec<Value> = audiences
            .into_iter()
            .map(|aud| Value::String(aud.into()))
            .collect();
        self.with_claim(Claim::Audience.name(), audiences)
    }

    /// Sets the token identifier (`jti` claim).
    #[must_use]
    pub fn with_jwt_id(self, id: impl Into<String>) -> Self {
        self.with_claim(Claim::JwtId.name(), Value::String(id.into()))
    }

    /// Sets the expiration time (`exp` claim).
    #[must_use]
    pub fn with_expiration(self, moment: DateTime<Utc>) -> Self {
        self.with_claim(Claim::Expiration.name(), moment.timestamp())
    }

    /// Sets the maturity time (`nbf` claim).
    #[must_use]
    pub fn with_not_before(self, moment: DateTime<Utc>) -> Self {
        self.with_claim(Claim::NotBefore.name(), moment.timestamp())
    }

    /// Sets the issuance time (`iat` claim).
    #[must_use]
    pub fn with_issued_at(self, moment: DateTime<Utc>) -> Self {
        self.with_claim(Claim::IssuedAt.name(), moment.timestamp())
    }

    /// Atomically sets `iat` and `exp` claims: first to the current time (as per
    /// the `options` clock), and the second to match the specified `duration` of the token.
    #[must_use]
    pub fn set_duration_and_issuance<F>(self, options: &TimeOptions<F>, duration: Duration) -> Self
    where
        F: Fn() -> DateTime<Utc>,
    {
        let issued_at = options.now();
        self.with_issued_at(issued_at)
            .with_expiration(issued_at + duration)
    }

    /// Returns the issuer (`iss` claim) if it is a string.
    pub fn issuer(&self) -> Option<&str> {
        self.string(&Claim::Issuer)
    }

    /// Returns the subject (`sub` claim) if it is a string.
    pub fn subject(&self) -> Option<&str> {
        self.string(&Claim::Subject)
    }

    /// Returns the token identifier (`jti` claim) if it is a string.
    pub fn jwt_id(&self) -> Option<&str> {
        self.string(&Claim::JwtId)
    }

    /// Returns audiences from the `aud` claim, which may be either a string or an array
    /// of strings. Non-string entries are skipped.
    pub fn audiences(&self) -> Vec<&str> {
        match self.get(Claim::Audience.name()) {
            Some(Value::String(aud)) => vec![aud.as_str()],
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            _ => vec![],
        }
    }

    /// Returns the expiration time (`exp` claim) if it is a valid timestamp.
    pub fn expiration(&self) -> Option<DateTime<Utc>> {
        self.get(Claim::Expiration.name()).and_then(timestamp)
    }

    /// Returns the maturity time (`nbf` claim) if it is a valid timestamp.
    pub fn not_before(&self) -> Option<DateTime<Utc>> {
        self.get(Claim::NotBefore.name()).and_then(timestamp)
    }

    /// Returns the issuance time (`iat` claim) if it is a valid timestamp.
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.get(Claim::IssuedAt.name()).and_then(timestamp)
    }

    /// Starts a chain of claim checks.
    pub fn check(&self) -> Checker<'_> {
        Checker {
            claims: self,
            outcomes: Vec::new(),
        }
    }

    fn string(&self, claim: &Claim) -> Option<&str> {
        self.get(claim.name()).and_then(Value::as_str)
    }
}

/// Parses a NumericDate; fractional seconds are truncated.
#[allow(clippy::cast_possible_truncation)]
fn timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let secs = match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|secs| secs.floor() as i64))?,
        _ => return None,
    };
    DateTime::from_timestamp(secs, 0)
}

/// Outcome of a single check in a [`Checker`] chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// Check has passed.
    Passed,
    /// Claim is absent.
    Missing,
    /// Claim has a value different from the expected one.
    Mismatch,
    /// Claim has an unexpected type.
    Malformed,
    /// Token has expired.
    Expired,
    /// Token is not yet valid.
    NotMature,
}

/// Chain of claim checks borrowed from [`Claims`].
///
/// Every method records the outcome of its check; the chain as a whole passes if all checks
/// pass. String comparisons are exact. Absent time claims pass the time checks, while
/// absent claims fail the equality checks.
///
/// # Examples
///
/// ```
/// use chrono::{Duration, Utc};
/// use jws_bearer::{Claim, Claims, ClaimsError, TimeOptions};
///
/// let options = TimeOptions::default();
/// let claims = Claims::new()
///     .with_issuer("me")
///     .with_audience("api")
///     .set_duration_and_issuance(&options, Duration::minutes(5));
///
/// let checker = claims
///     .check()
///     .issuer("me")
///     .audience("api")
///     .expiration(&options)
///     .maturity(&options);
/// assert!(checker.passed());
///
/// let err = claims.check().issuer("me").subject("alice").into_result().unwrap_err();
/// assert_eq!(err, ClaimsError::Missing(Claim::Subject));
/// ```
#[derive(Debug, Clone)]
#[must_use = "checks have no effect unless their outcome is inspected"]
pub struct Checker<'a> {
    claims: &'a Claims,
    outcomes: Vec<(Claim, CheckOutcome)>,
}

impl Checker<'_> {
    /// Checks that the issuer (`iss` claim) equals `expected`.
    pub fn issuer(self, expected: &str) -> Self {
        self.string_equals(Claim::Issuer, expected)
    }

    /// Checks that the subject (`sub` claim) equals `expected`.
    pub fn subject(self, expected: &str) -> Self {
        self.string_equals(Claim::Subject, expected)
    }

    /// Checks that the token identifier (`jti` claim) equals `expected`.
    pub fn jwt_id(self, expected: &str) -> Self {
        self.string_equals(Claim::JwtId, expected)
    }

    /// Checks that `expected` is among the token audiences (`aud` claim).
    pub fn audience(self, expected: &str) -> Self {
        let outcome = match self.claims.get(Claim::Audience.name()) {
            None => CheckOutcome::Missing,
            Some(Value::String(aud)) if aud == expected => CheckOutcome::Passed,
            Some(Value::String(_)) => CheckOutcome::Mismatch,
            Some(Value::Array(items)) => {
                if items.iter().any(|aud| aud.as_str() == Some(expected)) {
                    CheckOutcome::Passed
                } else if items.iter().all(Value::is_string) {
                    CheckOutcome::Mismatch
                } else {
                    CheckOutcome::Malformed
                }
            }
            Some(_) => CheckOutcome::Malformed,
        };
        self.record(Claim::Audience, outcome)
    }

    /// Checks that the claim `name` equals `expected` (using JSON equality).
    pub fn claim(self, name: &str, expected: &Value) -> Self {
        let outcome = match self.claims.get(name) {
            None => CheckOutcome::Missing,
            Some(actual) if actual == expected => CheckOutcome::Passed,
            Some(_) => CheckOutcome::Mismatch,
        };
        self.record(Claim::from_name(name), outcome)
    }

    /// Checks that the claim `name` is present.
    pub fn present(self, name: &str) -> Self {
        let outcome = if self.claims.contains(name) {
            CheckOutcome::Passed
        } else {
            CheckOutcome::Missing
        };
        self.record(Claim::from_name(name), outcome)
    }

    /// Checks that the token has not expired (`exp` claim), subject to the provided `options`.
    /// Passes if the claim is absent.
    pub fn expiration<F>(self, options: &TimeOptions<F>) -> Self
    where
        F: Fn() -> DateTime<Utc>,
    {
        let outcome = match self.claims.get(Claim::Expiration.name()).map(timestamp) {
            None => CheckOutcome::Passed,
            Some(None) => CheckOutcome::Malformed,
            Some(Some(expiration)) => {
                let expired = expiration
                    .checked_add_signed(options.leeway)
                    .map_or(false, |limit| options.now() > limit);
                if expired {
                    CheckOutcome::Expired
                } else {
                    CheckOutcome::Passed
                }
            }
        };
        self.record(Claim::Expiration, outcome)
    }

    /// Checks that the token is mature (`nbf` claim), subject to the provided `options`.
    /// Passes if the claim is absent.
    pub fn maturity<F>(self, options: &TimeOptions<F>) -> Self
    where
        F: Fn() -> DateTime<Utc>,
    {
        let outcome = match self.claims.get(Claim::NotBefore.name()).map(timestamp) {
            None => CheckOutcome::Passed,
            Some(None) => CheckOutcome::Malformed,
            Some(Some(not_before)) => {
                let immature = not_before
                    .checked_sub_signed(options.leeway)
                    .map_or(false, |limit| options.now() < limit);
                if immature {
                    CheckOutcome::NotMature
                } else {
                    CheckOutcome::Passed
                }
            }
        };
        self.record(Claim::NotBefore, outcome)
    }

    /// Returns `true` if all invoked checks have passed (and for an empty chain).
    pub fn passed(&self) -> bool {
        self.outcomes
            .iter()
            .all(|(_, outcome)| *outcome == CheckOutcome::Passed)
    }

    /// Returns outcomes of all invoked checks in the invocation order.
    pub fn outcomes(&self) -> &[(Claim, CheckOutcome)] {
        &self.outcomes
    }

    /// Converts the chain into a `Result` carrying the first failed check.
    pub fn into_result(self) -> Result<(), ClaimsError> {
        self.outcomes
            .into_iter()
            .find_map(|(claim, outcome)| failure(claim, outcome))
            .map_or(Ok(()), Err)
    }

    fn string_equals(self, claim: Claim, expected: &str) -> Self {
        let outcome = match self.claims.get(claim.name()) {
            None => CheckOutcome::Missing,
            Some(Value::String(actual)) if actual == expected => CheckOutcome::Passed,
            Some(Value::String(_)) => CheckOutcome::Mismatch,
            Some(_) => CheckOutcome::Malformed,
        };
        self.record(claim, outcome)
    }

    fn record(mut self, claim: Claim, outcome: CheckOutcome) -> Self {
        self.outcomes.push((claim, outcome));
        self
    }
}

fn failure(claim: Claim, outcome: CheckOutcome) -> Option<ClaimsError> {
    Some(match outcome {
        CheckOutcome::Passed => return None,
        CheckOutcome::Missing => ClaimsError::Missing(claim),
        CheckOutcome::Mismatch => ClaimsError::Mismatch(claim),
        CheckOutcome::Malformed => ClaimsError::Malformed(claim),
        CheckOutcome::Expired => ClaimsError::Expired,
        CheckOutcome::NotMature => ClaimsError::NotMature,
    })
}
