//! JWT-secured authorization responses (JARM).

// self
use crate::{
	_prelude::*,
	auth::AuthorizationCodeResponse,
	clock::Clock,
	keys::{self, KeyError, KeyProvider, KeySetProvider},
	proof::{Audience, codec_rejection},
};

/// JOSE `typ` of authorization response tokens.
pub const JARM_JWT_TYPE: &str = "JWT";

/// Authorization-response token failures.
#[derive(Debug, ThisError)]
pub enum JarmError {
	/// Key material could not be loaded.
	#[error("Response key material is unavailable.")]
	Key(#[source] KeyError),
	/// The signature did not verify against the issuer's key set.
	#[error("Authorization response signature is invalid.")]
	Signature(#[source] KeyError),
	/// Signing failed.
	#[error("Authorization response could not be signed.")]
	Signing(#[source] jsonwebtoken::errors::Error),
	/// `iss` is not the expected authorization server.
	#[error("Authorization response was issued by {actual}, not the expected issuer.")]
	IssuerMismatch {
		/// Issuer found in the response.
		actual: String,
	},
	/// `aud` does not name the requesting client.
	#[error("Authorization response is not addressed to this client.")]
	AudienceMismatch,
	/// `exp` has passed.
	#[error("Authorization response has expired.")]
	Expired,
	/// The payload carries neither a code nor an error.
	#[error("Authorization response carries neither a code nor an error.")]
	EmptyResponse,
}
impl JarmError {
	/// Wire error code for this failure.
	pub fn kind(&self) -> ErrorKind {
		match self {
			JarmError::Key(_) | JarmError::Signing(_) => ErrorKind::ServerError,
			_ => ErrorKind::InvalidRequest,
		}
	}
}
impl From<JarmError> for Rejection {
	fn from(e: JarmError) -> Self {
		codec_rejection(e.kind(), "Invalid authorization response.", e)
	}
}

#[derive(Debug, Serialize, Deserialize)]
struct ResponseClaims {
	iss: String,
	aud: Audience,
	exp: i64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	code: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	state: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	error: Option<ErrorKind>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	error_description: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	error_uri: Option<Url>,
}

/// Signs authorization responses with the server key.
#[derive(Clone)]
pub struct JarmEncoder {
	keys: Arc<dyn KeyProvider>,
	clock: Arc<dyn Clock>,
	issuer: String,
	ttl: Duration,
}
impl JarmEncoder {
	/// Builds an encoder issuing as `issuer` with responses valid for `ttl`.
	pub fn new(
		keys: Arc<dyn KeyProvider>,
		clock: Arc<dyn Clock>,
		issuer: impl Into<String>,
		ttl: Duration,
	) -> Self {
		Self { keys, clock, issuer: issuer.into(), ttl }
	}

	/// Signs `response` for delivery to `client_id`.
	pub async fn encode(
		&self,
		client_id: &str,
		response: &AuthorizationCodeResponse,
	) -> Result<String, JarmError> {
		let key = self.keys.signing_key().await.map_err(JarmError::Key)?;
		let mut claims = ResponseClaims {
			iss: self.issuer.clone(),
			aud: Audience::One(client_id.to_owned()),
			exp: (self.clock.now() + self.ttl).unix_timestamp(),
			code: None,
			state: None,
			error: None,
			error_description: None,
			error_uri: None,
		};

		match response {
			AuthorizationCodeResponse::Success { code, state } => {
				claims.code = Some(code.clone());
				claims.state = Some(state.clone()).filter(|s| !s.is_empty());
			},
			AuthorizationCodeResponse::Error(error) => {
				claims.error = Some(error.kind);
				claims.error_description = error.description.clone();
				claims.error_uri = error.uri.clone();
				claims.state = error.state.clone();
			},
		}

		jsonwebtoken::encode(&key.header(JARM_JWT_TYPE), &claims, &key.key)
			.map_err(JarmError::Signing)
	}
}
impl Debug for JarmEncoder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("JarmEncoder")
			.field("issuer", &self.issuer)
			.field("ttl", &self.ttl)
			.finish_non_exhaustive()
	}
}

/// Verifies authorization responses on behalf of a client.
#[derive(Clone)]
pub struct JarmDecoder {
	keys: Arc<dyn KeySetProvider>,
	clock: Arc<dyn Clock>,
	issuer: String,
}
impl JarmDecoder {
	/// Builds a decoder that expects responses from `issuer`, verified with its key set.
	pub fn new(
		keys: Arc<dyn KeySetProvider>,
		clock: Arc<dyn Clock>,
		issuer: impl Into<String>,
	) -> Self {
		Self { keys, clock, issuer: issuer.into() }
	}

	/// Verifies `token` for `client_id` and returns the response it carries.
	pub async fn decode(
		&self,
		client_id: &str,
		token: &str,
	) -> Result<AuthorizationCodeResponse, JarmError> {
		let set = self.keys.key_set(&self.issuer).await.map_err(JarmError::Key)?;
		let claims = keys::verify_with_key_set::<ResponseClaims>(token, &set)
			.map_err(JarmError::Signature)?
			.claims;

		if claims.iss != self.issuer {
			return Err(JarmError::IssuerMismatch { actual: claims.iss });
		}
		if !claims.aud.contains(client_id) {
			return Err(JarmError::AudienceMismatch);
		}
		if self.clock.now().unix_timestamp() >= claims.exp {
			return Err(JarmError::Expired);
		}

		match (claims.code, claims.error) {
			(Some(code), None) =>
				Ok(AuthorizationCodeResponse::Success { code, state: claims.state.unwrap_or_default() }),
			(None, Some(kind)) => {
				let mut error = OAuthError::new(kind);

				error.description = claims.error_description;
				error.uri = claims.error_uri;
				error.state = claims.state;

				Ok(AuthorizationCodeResponse::Error(error))
			},
			_ => Err(JarmError::EmptyResponse),
		}
	}
}
impl Debug for JarmDecoder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("JarmDecoder").field("issuer", &self.issuer).finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::{
		clock::ManualClock,
		keys::{StaticKeyProvider, StaticKeySet},
		testkit,
	};

	const ISSUER: &str = "https://as.example.com";

	struct Fixture {
		clock: Arc<ManualClock>,
		encoder: JarmEncoder,
		decoder: JarmDecoder,
	}

	fn fixture() -> Fixture {
		let key = testkit::key(31, "as-1");
		let clock = Arc::new(ManualClock::new(macros::datetime!(2025-01-01 00:00 UTC)));
		let encoder = JarmEncoder::new(
			Arc::new(StaticKeyProvider::new(key.signing_key())),
			clock.clone(),
			ISSUER,
			Duration::minutes(5),
		);
		let decoder = JarmDecoder::new(
			Arc::new(StaticKeySet::new(testkit::key_set(&[&key]))),
			clock.clone(),
			ISSUER,
		);

		Fixture { clock, encoder, decoder }
	}

	#[tokio::test]
	async fn success_and_error_responses_round_trip() {
		let fixture = fixture();
		let success = AuthorizationCodeResponse::Success {
			code: "SplxlOBeZQQYbYS6WxSbIA".into(),
			state: "xyz".into(),
		};
		let failure = AuthorizationCodeResponse::Error(
			OAuthError::invalid_request("redirect_uri is required.").with_state("xyz"),
		);

		for response in [success, failure] {
			let token =
				fixture.encoder.encode("s6BhdRkqt3", &response).await.expect("Response should sign.");
			let decoded = fixture
				.decoder
				.decode("s6BhdRkqt3", &token)
				.await
				.expect("Response should verify.");

			assert_eq!(decoded, response);
		}
	}

	#[tokio::test]
	async fn audience_issuer_and_expiry_are_enforced() {
		let fixture = fixture();
		let response = AuthorizationCodeResponse::Success { code: "c".into(), state: String::new() };
		let token = fixture.encoder.encode("s6BhdRkqt3", &response).await.expect("Should sign.");

		assert!(matches!(
			fixture.decoder.decode("other-client", &token).await,
			Err(JarmError::AudienceMismatch)
		));

		let foreign = JarmDecoder::new(
			Arc::new(StaticKeySet::new(testkit::key_set(&[&testkit::key(31, "as-1")]))),
			fixture.clock.clone(),
			"https://other.example.com",
		);

		assert!(matches!(
			foreign.decode("s6BhdRkqt3", &token).await,
			Err(JarmError::IssuerMismatch { .. })
		));

		fixture.clock.advance(Duration::minutes(6));

		assert!(matches!(
			fixture.decoder.decode("s6BhdRkqt3", &token).await,
			Err(JarmError::Expired)
		));
	}
}
