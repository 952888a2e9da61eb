//! Wire-safe OAuth 2.0 error taxonomy (RFC 6749, RFC 7636, RFC 8628, RFC 8693, RFC 7591).
//!
//! [`OAuthError`] is the only error value that may be serialized back to a client. Diagnostic
//! detail lives in [`crate::error::Error`] and never crosses this boundary.

// self
use crate::_prelude::*;

/// Machine-readable `error` codes understood by the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
	/// Malformed or incomplete request.
	InvalidRequest,
	/// Client authentication failed or the client is unknown.
	InvalidClient,
	/// The grant (code, refresh token, verifier) is invalid, expired, or bound elsewhere.
	InvalidGrant,
	/// The client may not use the requested grant.
	UnsupportedGrantType,
	/// Requested scope is malformed or exceeds what is allowed.
	InvalidScope,
	/// Requested audience/resource is unknown (RFC 8693).
	InvalidTarget,
	/// Backend failure; details are never exposed.
	ServerError,
	/// Device authorization has not been confirmed yet (RFC 8628); the client keeps polling.
	AuthorizationPending,
	/// Device code expired (RFC 8628).
	ExpiredToken,
	/// Token is unknown, revoked, or unusable.
	InvalidToken,
	/// Redirect URI metadata is invalid (RFC 7591).
	InvalidRedirectUri,
	/// Client metadata is invalid (RFC 7591).
	InvalidClientMetadata,
}
impl ErrorKind {
	/// Returns the RFC identifier for the error code.
	pub const fn as_str(self) -> &'static str {
		match self {
			ErrorKind::InvalidRequest => "invalid_request",
			ErrorKind::InvalidClient => "invalid_client",
			ErrorKind::InvalidGrant => "invalid_grant",
			ErrorKind::UnsupportedGrantType => "unsupported_grant_type",
			ErrorKind::InvalidScope => "invalid_scope",
			ErrorKind::InvalidTarget => "invalid_target",
			ErrorKind::ServerError => "server_error",
			ErrorKind::AuthorizationPending => "authorization_pending",
			ErrorKind::ExpiredToken => "expired_token",
			ErrorKind::InvalidToken => "invalid_token",
			ErrorKind::InvalidRedirectUri => "invalid_redirect_uri",
			ErrorKind::InvalidClientMetadata => "invalid_client_metadata",
		}
	}
}
impl Display for ErrorKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Standardized OAuth error value attached to every failed response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthError {
	/// Error code.
	#[serde(rename = "error")]
	pub kind: ErrorKind,
	/// Human-readable description safe to show to the client developer.
	#[serde(rename = "error_description", skip_serializing_if = "Option::is_none", default)]
	pub description: Option<String>,
	/// Link to documentation about the error.
	#[serde(rename = "error_uri", skip_serializing_if = "Option::is_none", default)]
	pub uri: Option<Url>,
	/// Echo of the authorization request `state`.
	#[serde(skip_serializing_if = "Option::is_none", default)]
	pub state: Option<String>,
}
impl OAuthError {
	/// Creates an error with no description.
	pub fn new(kind: ErrorKind) -> Self {
		Self { kind, description: None, uri: None, state: None }
	}

	/// Attaches a description.
	pub fn with_description(mut self, description: impl Into<String>) -> Self {
		self.description = Some(description.into());

		self
	}

	/// Attaches a documentation URI.
	pub fn with_uri(mut self, uri: Url) -> Self {
		self.uri = Some(uri);

		self
	}

	/// Echoes the caller's `state`; empty values are ignored.
	pub fn with_state(mut self, state: impl Into<String>) -> Self {
		let state = state.into();

		if !state.is_empty() {
			self.state = Some(state);
		}

		self
	}

	/// `invalid_request` with a description.
	pub fn invalid_request(description: impl Into<String>) -> Self {
		Self::new(ErrorKind::InvalidRequest).with_description(description)
	}

	/// `invalid_client` with a description.
	pub fn invalid_client(description: impl Into<String>) -> Self {
		Self::new(ErrorKind::InvalidClient).with_description(description)
	}

	/// `invalid_grant` with a description.
	pub fn invalid_grant(description: impl Into<String>) -> Self {
		Self::new(ErrorKind::InvalidGrant).with_description(description)
	}

	/// `unsupported_grant_type` with a description.
	pub fn unsupported_grant_type(description: impl Into<String>) -> Self {
		Self::new(ErrorKind::UnsupportedGrantType).with_description(description)
	}

	/// `invalid_scope` with a description.
	pub fn invalid_scope(description: impl Into<String>) -> Self {
		Self::new(ErrorKind::InvalidScope).with_description(description)
	}

	/// `invalid_target` with a description.
	pub fn invalid_target(description: impl Into<String>) -> Self {
		Self::new(ErrorKind::InvalidTarget).with_description(description)
	}

	/// `server_error` with a fixed, non-revealing description.
	pub fn server_error() -> Self {
		Self::new(ErrorKind::ServerError)
			.with_description("The authorization server encountered an unexpected condition.")
	}

	/// `authorization_pending` for device-code polling.
	pub fn authorization_pending() -> Self {
		Self::new(ErrorKind::AuthorizationPending)
			.with_description("The authorization request is still pending.")
	}

	/// `expired_token` for device codes past their lifetime.
	pub fn expired_token() -> Self {
		Self::new(ErrorKind::ExpiredToken).with_description("The device code has expired.")
	}

	/// `invalid_token` with a description.
	pub fn invalid_token(description: impl Into<String>) -> Self {
		Self::new(ErrorKind::InvalidToken).with_description(description)
	}

	/// `invalid_request` raised when `state` is absent, so nothing can be echoed back.
	pub fn missing_state() -> Self {
		Self::invalid_request("The state parameter is required.")
	}

	/// Returns `true` for the distinguished missing-state rejection.
	pub fn is_missing_state(&self) -> bool {
		self.kind == ErrorKind::InvalidRequest
			&& self.state.is_none()
			&& self.description.as_deref() == Some("The state parameter is required.")
	}
}
impl Display for OAuthError {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match &self.description {
			Some(description) => write!(f, "{}: {description}", self.kind),
			None => Display::fmt(&self.kind, f),
		}
	}
}
