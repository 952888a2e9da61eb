//! `private_key_jwt` client authentication (RFC 7523 §2.2).

// self
use crate::{
	_prelude::*,
	auth::Client,
	clock::Clock,
	keys::{self, KeyError},
	proof::{Audience, MalformedJwt, ReplayCache, codec_rejection, decode_claims_unverified},
	store::{ClientRegistry, StoreError},
};

/// `client_assertion_type` for JWT bearer assertions.
pub const JWT_BEARER_ASSERTION_TYPE: &str =
	"urn:ietf:params:oauth:client-assertion-type:jwt-bearer";
/// Longest remaining lifetime (`exp - now`) an assertion may carry by default.
pub const DEFAULT_ASSERTION_MAX_LIFETIME: Duration = Duration::minutes(10);

/// Client-assertion failures.
#[derive(Debug, ThisError)]
pub enum AssertionError {
	/// `client_assertion_type` is not the JWT bearer URN.
	#[error("Unsupported client assertion type.")]
	UnsupportedType,
	/// `client_assertion` is empty.
	#[error("Client assertion is missing.")]
	MissingAssertion,
	/// The assertion is not a decodable compact JWS.
	#[error("Client assertion is malformed.")]
	Malformed(#[from] MalformedJwt),
	/// A required claim is absent or empty.
	#[error("Client assertion is missing the {claim} claim.")]
	MissingClaim {
		/// Claim name.
		claim: &'static str,
	},
	/// `iss` and `sub` differ.
	#[error("Client assertion must be self-issued.")]
	NotSelfIssued,
	/// `exp` has passed.
	#[error("Client assertion has expired.")]
	Expired,
	/// `exp` lies further ahead than the verifier accepts.
	#[error("Client assertion lifetime is too long.")]
	LifetimeTooLong,
	/// `aud` does not name this token endpoint.
	#[error("Client assertion is not addressed to this server.")]
	AudienceMismatch,
	/// `iss` names no registered client.
	#[error("Client assertion issuer is not a registered client.")]
	UnknownClient,
	/// The client has no key set to verify against.
	#[error("Client has no registered key set.")]
	MissingKeySet,
	/// The client key set document is malformed.
	#[error("Client key set is malformed.")]
	KeySet(#[source] KeyError),
	/// No signing key of the client verified the assertion.
	#[error("Client assertion signature is invalid.")]
	Signature(#[source] KeyError),
	/// The assertion `jti` was already used.
	#[error("Client assertion was replayed.")]
	Replayed,
	/// Registry or replay cache failure.
	#[error(transparent)]
	Storage(#[from] StoreError),
}
impl AssertionError {
	/// Wire error code for this failure.
	pub fn kind(&self) -> ErrorKind {
		match self {
			AssertionError::UnsupportedType
			| AssertionError::MissingAssertion
			| AssertionError::Malformed(_)
			| AssertionError::MissingClaim { .. }
			| AssertionError::NotSelfIssued => ErrorKind::InvalidRequest,
			AssertionError::Storage(_) => ErrorKind::ServerError,
			_ => ErrorKind::InvalidClient,
		}
	}
}
impl From<AssertionError> for Rejection {
	fn from(e: AssertionError) -> Self {
		codec_rejection(e.kind(), "Client authentication failed.", e)
	}
}

/// Assertion parameters presented at the token endpoint.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientAssertion {
	/// Must equal [`JWT_BEARER_ASSERTION_TYPE`].
	pub client_assertion_type: String,
	/// Signed JWT.
	pub client_assertion: String,
}
impl ClientAssertion {
	/// Wraps a JWT bearer assertion.
	pub fn jwt_bearer(assertion: impl Into<String>) -> Self {
		Self {
			client_assertion_type: JWT_BEARER_ASSERTION_TYPE.to_owned(),
			client_assertion: assertion.into(),
		}
	}
}

#[derive(Debug, Deserialize)]
struct AssertionClaims {
	#[serde(default)]
	iss: String,
	#[serde(default)]
	sub: String,
	#[serde(default)]
	jti: String,
	aud: Option<Audience>,
	#[serde(default)]
	exp: i64,
}

/// Authenticates clients from signed assertions.
#[derive(Clone)]
pub struct ClientAssertionVerifier {
	clients: Arc<dyn ClientRegistry>,
	clock: Arc<dyn Clock>,
	audience: Option<String>,
	max_lifetime: Duration,
	replay: Option<Arc<dyn ReplayCache>>,
}
impl ClientAssertionVerifier {
	/// Builds a verifier resolving clients (and their key sets) from `clients`.
	pub fn new(clients: Arc<dyn ClientRegistry>, clock: Arc<dyn Clock>) -> Self {
		Self {
			clients,
			clock,
			audience: None,
			max_lifetime: DEFAULT_ASSERTION_MAX_LIFETIME,
			replay: None,
		}
	}

	/// Requires `aud` to contain this value (usually the token endpoint URL).
	pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
		self.audience = Some(audience.into());

		self
	}

	/// Rejects assertions expiring more than `max_lifetime` from now.
	///
	/// This also bounds how long a replay cache has to remember each `jti`.
	pub fn with_max_lifetime(mut self, max_lifetime: Duration) -> Self {
		self.max_lifetime = max_lifetime;

		self
	}

	/// Rejects assertions whose `jti` was already presented.
	pub fn with_replay_cache(mut self, cache: Arc<dyn ReplayCache>) -> Self {
		self.replay = Some(cache);

		self
	}

	/// Verifies the assertion and returns the client it authenticates.
	pub async fn authenticate(&self, request: &ClientAssertion) -> Result<Client, AssertionError> {
		if request.client_assertion_type != JWT_BEARER_ASSERTION_TYPE {
			return Err(AssertionError::UnsupportedType);
		}
		if request.client_assertion.is_empty() {
			return Err(AssertionError::MissingAssertion);
		}

		let claims: AssertionClaims = decode_claims_unverified(&request.client_assertion)?;

		for (claim, value) in [("iss", &claims.iss), ("sub", &claims.sub), ("jti", &claims.jti)] {
			if value.is_empty() {
				return Err(AssertionError::MissingClaim { claim });
			}
		}

		let audience = claims
			.aud
			.filter(|aud| !aud.is_empty())
			.ok_or(AssertionError::MissingClaim { claim: "aud" })?;

		if claims.exp == 0 {
			return Err(AssertionError::MissingClaim { claim: "exp" });
		}
		if claims.iss != claims.sub {
			return Err(AssertionError::NotSelfIssued);
		}

		let now = self.clock.now();

		if now.unix_timestamp() >= claims.exp {
			return Err(AssertionError::Expired);
		}
		if claims.exp > (now + self.max_lifetime).unix_timestamp() {
			return Err(AssertionError::LifetimeTooLong);
		}
		if self.audience.as_deref().is_some_and(|expected| !audience.contains(expected)) {
			return Err(AssertionError::AudienceMismatch);
		}

		let client = self.clients.get(&claims.iss).await?.ok_or(AssertionError::UnknownClient)?;
		let document = client
			.jwks
			.as_deref()
			.filter(|doc| !doc.trim().is_empty())
			.ok_or(AssertionError::MissingKeySet)?;
		let set = keys::parse_key_set(document).map_err(AssertionError::KeySet)?;

		if set.keys.is_empty() {
			return Err(AssertionError::MissingKeySet);
		}

		keys::verify_with_key_set::<serde_json::Value>(&request.client_assertion, &set)
			.map_err(AssertionError::Signature)?;

		if let Some(cache) = &self.replay {
			let expires_at = OffsetDateTime::from_unix_timestamp(claims.exp)
				.map_err(|_| AssertionError::MissingClaim { claim: "exp" })?;
			let key = format!("assertion:{}:{}", claims.iss, claims.jti);

			if !cache.insert_unique(&key, expires_at, now).await? {
				return Err(AssertionError::Replayed);
			}
		}

		Ok(client)
	}
}
impl Debug for ClientAssertionVerifier {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientAssertionVerifier")
			.field("audience", &self.audience)
			.field("max_lifetime", &self.max_lifetime)
			.field("replay", &self.replay.is_some())
			.finish_non_exhaustive()
	}
}
