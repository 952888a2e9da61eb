//! JWT-secured authorization requests (RFC 9101).

// self
use crate::{
	_prelude::*,
	auth::AuthorizationRequest,
	clock::Clock,
	keys::{self, KeyError, KeySetProvider, SigningKey},
	proof::{MalformedJwt, codec_rejection, decode_claims_unverified},
};

/// JOSE `typ` stamped on request objects.
pub const JAR_JWT_TYPE: &str = "oauth.authz.req+jwt";
/// RFC 9101 media-type spelling of the request-object `typ`, accepted on decode.
pub const JAR_JWT_MEDIA_TYPE: &str = "oauth-authz-req+jwt";

/// Request-object failures.
#[derive(Debug, ThisError)]
pub enum JarError {
	/// The request object is not a compact JWS.
	#[error("Request object is malformed.")]
	Malformed(#[from] MalformedJwt),
	/// The JOSE header cannot be decoded.
	#[error("Request object header is invalid.")]
	Header(#[source] jsonwebtoken::errors::Error),
	/// `typ` names something other than a request object.
	#[error("Request object has the wrong typ.")]
	Type,
	/// The client's key set could not be loaded.
	#[error("Client key set is unavailable.")]
	KeySet(#[source] KeyError),
	/// No signing key of the client verified the request object.
	#[error("Request object signature is invalid.")]
	Signature(#[source] KeyError),
	/// The verified payload does not match the request-object schema.
	#[error("Request object payload is invalid.")]
	Schema(#[source] serde_path_to_error::Error<serde_json::Error>),
	/// `iss` or `client_id` names a different client.
	#[error("Request object was issued by another client.")]
	ClientMismatch,
	/// `exp` has passed.
	#[error("Request object has expired.")]
	Expired,
	/// Request objects cannot reference pushed requests.
	#[error("Request object cannot carry request_uri.")]
	NestedReference,
	/// Signing failed.
	#[error("Request object could not be signed.")]
	Signing(#[source] jsonwebtoken::errors::Error),
}
impl JarError {
	/// Wire error code for this failure.
	pub fn kind(&self) -> ErrorKind {
		match self {
			JarError::KeySet(KeyError::Unavailable { .. }) | JarError::Signing(_) =>
				ErrorKind::ServerError,
			_ => ErrorKind::InvalidRequest,
		}
	}
}
impl From<JarError> for Rejection {
	fn from(e: JarError) -> Self {
		codec_rejection(e.kind(), "Invalid request object.", e)
	}
}

// Request-object payload: registered JWT claims plus authorization parameters, nothing else.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct RequestObject {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	iss: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	aud: Option<serde_json::Value>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	exp: Option<i64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	iat: Option<i64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	nbf: Option<i64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	jti: Option<String>,
	#[serde(default)]
	response_type: String,
	#[serde(default)]
	client_id: String,
	#[serde(default)]
	scope: String,
	#[serde(default)]
	state: String,
	#[serde(default)]
	redirect_uri: String,
	#[serde(default)]
	code_challenge: String,
	#[serde(default)]
	code_challenge_method: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	audience: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	nonce: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	prompt: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	response_mode: Option<String>,
}
impl RequestObject {
	fn into_request(self) -> AuthorizationRequest {
		AuthorizationRequest {
			response_type: self.response_type,
			client_id: self.client_id,
			scope: self.scope,
			state: self.state,
			redirect_uri: self.redirect_uri,
			code_challenge: self.code_challenge,
			code_challenge_method: self.code_challenge_method,
			audience: self.audience,
			nonce: self.nonce,
			prompt: self.prompt,
			response_mode: self.response_mode,
			request_uri: None,
		}
	}
}

/// Verifies request objects against the sending client's key set.
#[derive(Clone)]
pub struct JarDecoder {
	keys: Arc<dyn KeySetProvider>,
	clock: Arc<dyn Clock>,
}
impl JarDecoder {
	/// Builds a decoder that resolves key sets by client id.
	pub fn new(keys: Arc<dyn KeySetProvider>, clock: Arc<dyn Clock>) -> Self {
		Self { keys, clock }
	}

	/// Verifies `request_object` as sent by `client_id` and returns the request it carries.
	///
	/// The outer `client_id` parameter wins; a payload `client_id` or `iss` naming anyone else is
	/// rejected. An absent `typ` is tolerated; a present one must name a request object.
	pub async fn decode(
		&self,
		client_id: &str,
		request_object: &str,
	) -> Result<AuthorizationRequest, JarError> {
		// Shape check before any key-set I/O.
		decode_claims_unverified::<serde_json::Value>(request_object)?;

		let header = jsonwebtoken::decode_header(request_object).map_err(JarError::Header)?;

		if header
			.typ
			.as_deref()
			.is_some_and(|typ| typ != JAR_JWT_TYPE && typ != JAR_JWT_MEDIA_TYPE)
		{
			return Err(JarError::Type);
		}

		let set = self.keys.key_set(client_id).await.map_err(JarError::KeySet)?;
		let payload = keys::verify_with_key_set::<serde_json::Value>(request_object, &set)
			.map_err(JarError::Signature)?
			.claims;
		let mut object: RequestObject =
			serde_path_to_error::deserialize(payload).map_err(JarError::Schema)?;

		if object.iss.as_deref().is_some_and(|iss| iss != client_id) {
			return Err(JarError::ClientMismatch);
		}
		if object.client_id.is_empty() {
			object.client_id = client_id.to_owned();
		} else if object.client_id != client_id {
			return Err(JarError::ClientMismatch);
		}
		if object.exp.is_some_and(|exp| self.clock.now().unix_timestamp() >= exp) {
			return Err(JarError::Expired);
		}

		Ok(object.into_request())
	}
}
impl Debug for JarDecoder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("JarDecoder(..)")
	}
}

/// Signs authorization requests as request objects.
#[derive(Clone, Debug)]
pub struct JarEncoder {
	key: SigningKey,
	audience: Option<String>,
}
impl JarEncoder {
	/// Uses the client's signing key.
	pub fn new(key: SigningKey) -> Self {
		Self { key, audience: None }
	}

	/// Addresses request objects to the given authorization server issuer.
	pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
		self.audience = Some(audience.into());

		self
	}

	/// Signs `request`; `iss` is the request's `client_id`.
	pub fn encode(&self, request: &AuthorizationRequest) -> Result<String, JarError> {
		if request.pushed_reference().is_some() {
			return Err(JarError::NestedReference);
		}

		let object = RequestObject {
			iss: Some(request.client_id.clone()).filter(|id| !id.is_empty()),
			aud: self.audience.clone().map(serde_json::Value::String),
			response_type: request.response_type.clone(),
			client_id: request.client_id.clone(),
			scope: request.scope.clone(),
			state: request.state.clone(),
			redirect_uri: request.redirect_uri.clone(),
			code_challenge: request.code_challenge.clone(),
			code_challenge_method: request.code_challenge_method.clone(),
			audience: request.audience.clone(),
			nonce: request.nonce.clone(),
			prompt: request.prompt.clone(),
			response_mode: request.response_mode.clone(),
			..Default::default()
		};

		jsonwebtoken::encode(&self.key.header(JAR_JWT_TYPE), &object, &self.key.key)
			.map_err(JarError::Signing)
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	use time::macros;
	// self
	use super::*;
	use crate::{clock::ManualClock, keys::StaticKeySet, testkit};

	fn request() -> AuthorizationRequest {
		AuthorizationRequest {
			response_type: "code".into(),
			client_id: "s6BhdRkqt3".into(),
			scope: "openid profile".into(),
			state: "af0ifjsldkj".into(),
			redirect_uri: "https://client.example.org/cb".into(),
			code_challenge: "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM".into(),
			code_challenge_method: "S256".into(),
			nonce: Some("n-0S6_WzA2Mj".into()),
			..Default::default()
		}
	}

	fn decoder(keys: &[&testkit::TestKey]) -> JarDecoder {
		JarDecoder::new(
			Arc::new(StaticKeySet::new(testkit::key_set(keys))),
			Arc::new(ManualClock::new(macros::datetime!(2025-01-01 00:00 UTC))),
		)
	}

	#[tokio::test]
	async fn signed_request_round_trips_through_client_keys() {
		let key = testkit::key(21, "client");
		let token = JarEncoder::new(key.signing_key())
			.with_audience("https://as.example.com")
			.encode(&request())
			.expect("Request object should sign.");
		let header = jsonwebtoken::decode_header(&token).expect("Header should decode.");
		let decoded =
			decoder(&[&key]).decode("s6BhdRkqt3", &token).await.expect("Request should verify.");

		assert_eq!(header.typ.as_deref(), Some("oauth.authz.req+jwt"));
		assert_eq!(decoded, request());
	}

	#[tokio::test]
	async fn request_object_typ_must_name_a_request_object() {
		let key = testkit::key(27, "client");
		let signing = key.signing_key();
		let sign = |typ: &str| {
			jsonwebtoken::encode(
				&signing.header(typ),
				&json!({ "client_id": "s6BhdRkqt3", "response_type": "code" }),
				&signing.key,
			)
			.expect("Fixture should sign.")
		};
		let decoder = decoder(&[&key]);

		decoder
			.decode("s6BhdRkqt3", &sign(JAR_JWT_MEDIA_TYPE))
			.await
			.expect("The RFC 9101 media type should be accepted.");

		let err = decoder
			.decode("s6BhdRkqt3", &sign("dpop+jwt"))
			.await
			.expect_err("Other token types must be rejected.");

		assert!(matches!(err, JarError::Type));
		assert_eq!(Rejection::from(err).kind(), ErrorKind::InvalidRequest);
	}

	#[tokio::test]
	async fn foreign_signatures_and_clients_are_rejected() {
		let key = testkit::key(22, "client");
		let token =
			JarEncoder::new(key.signing_key()).encode(&request()).expect("Request should sign.");

		assert!(matches!(
			decoder(&[&testkit::key(23, "other")]).decode("s6BhdRkqt3", &token).await,
			Err(JarError::Signature(_))
		));
		assert!(matches!(
			decoder(&[&key]).decode("another-client", &token).await,
			Err(JarError::ClientMismatch)
		));
	}

	#[tokio::test]
	async fn unknown_payload_fields_are_rejected_with_their_path() {
		let key = testkit::key(24, "client");
		let signing = key.signing_key();
		let token = jsonwebtoken::encode(
			&signing.header(JAR_JWT_TYPE),
			&json!({ "client_id": "s6BhdRkqt3", "response_type": "code", "max_age": 30 }),
			&signing.key,
		)
		.expect("Fixture should sign.");
		let err = decoder(&[&key])
			.decode("s6BhdRkqt3", &token)
			.await
			.expect_err("Unknown fields must be rejected.");

		assert!(matches!(err, JarError::Schema(_)));
		assert_eq!(Rejection::from(err).kind(), ErrorKind::InvalidRequest);
	}

	#[tokio::test]
	async fn expired_request_objects_are_rejected() {
		let key = testkit::key(25, "client");
		let signing = key.signing_key();
		let token = jsonwebtoken::encode(
			&signing.header(JAR_JWT_TYPE),
			&json!({
				"client_id": "s6BhdRkqt3",
				"exp": macros::datetime!(2024-12-31 23:59 UTC).unix_timestamp(),
			}),
			&signing.key,
		)
		.expect("Fixture should sign.");

		assert!(matches!(
			decoder(&[&key]).decode("s6BhdRkqt3", &token).await,
			Err(JarError::Expired)
		));
	}

	#[test]
	fn pushed_references_cannot_be_signed() {
		let request =
			AuthorizationRequest { request_uri: Some("urn:x".into()), ..Default::default() };

		assert!(matches!(
			JarEncoder::new(testkit::key(26, "c").signing_key()).encode(&request),
			Err(JarError::NestedReference)
		));
	}
}
