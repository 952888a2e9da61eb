//! Front-channel authorization requests and the sessions they become once registered.

// self
use crate::{
	_prelude::*,
	auth::{ClientId, Subject},
	rfc::OAuthError,
};

/// Prefix of pushed authorization request references (RFC 9126).
pub const REQUEST_URI_PREFIX: &str = "urn:ietf:params:oauth:request_uri:";

/// Authorization request parameters as decoded by the transport layer.
///
/// Fields mirror the wire parameters; empty strings stand for absent parameters so that the
/// validator, not the decoder, decides which omissions are errors.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorizationRequest {
	/// Requested response type (`code`).
	pub response_type: String,
	/// Client identifier.
	pub client_id: String,
	/// Space-delimited scope.
	pub scope: String,
	/// Opaque client state echoed back in the response.
	pub state: String,
	/// Redirect URI.
	pub redirect_uri: String,
	/// PKCE challenge.
	pub code_challenge: String,
	/// PKCE challenge method.
	pub code_challenge_method: String,
	/// Requested audience.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub audience: Option<String>,
	/// OIDC nonce.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub nonce: Option<String>,
	/// OIDC prompt.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub prompt: Option<String>,
	/// Response mode (`jwt` selects JARM).
	#[serde(skip_serializing_if = "Option::is_none")]
	pub response_mode: Option<String>,
	/// Reference to a pushed request.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub request_uri: Option<String>,
}
impl AuthorizationRequest {
	/// Returns the pushed-request reference when the request is a PAR redemption.
	pub fn pushed_reference(&self) -> Option<&str> {
		self.request_uri.as_deref().filter(|uri| !uri.is_empty())
	}
}

/// Authorization-code session: the registered request plus the authenticated subject.
///
/// Stored under the authorization code and consumed exactly once at token time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
	/// Client the code was issued to.
	pub client_id: ClientId,
	/// Original authorization request.
	pub request: AuthorizationRequest,
	/// Authenticated end-user.
	pub subject: Subject,
	/// Issue instant.
	pub issued_at: OffsetDateTime,
	/// Expiry instant.
	pub expires_at: OffsetDateTime,
}
impl Session {
	/// Returns true once the code lifetime has elapsed.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at
	}
}

/// Pushed authorization request awaiting redemption by `request_uri`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushedRequest {
	/// Client that pushed the request.
	pub client_id: ClientId,
	/// Validated request parameters.
	pub request: AuthorizationRequest,
	/// Push instant.
	pub issued_at: OffsetDateTime,
	/// Expiry instant of the reference.
	pub expires_at: OffsetDateTime,
}
impl PushedRequest {
	/// Returns true once the reference lifetime has elapsed.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at
	}
}

/// Successful authorization response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationResponse {
	/// Issued authorization code.
	pub code: String,
	/// Echoed state.
	pub state: String,
	/// Issuer identifier (RFC 9207).
	pub iss: String,
	/// Redirect URI the response is delivered to.
	#[serde(skip)]
	pub redirect_uri: String,
	/// Requested response mode.
	#[serde(skip)]
	pub response_mode: Option<String>,
}

/// Authorization-endpoint outcome carried by JARM: the success parameters or the error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthorizationCodeResponse {
	/// Code issued.
	Success {
		/// Authorization code.
		code: String,
		/// Echoed state.
		state: String,
	},
	/// Request rejected.
	Error(OAuthError),
}

/// Pushed authorization response (RFC 9126).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushedAuthorizationResponse {
	/// Reference to redeem at the authorization endpoint.
	pub request_uri: String,
	/// Seconds until the reference expires.
	pub expires_in: i64,
}
