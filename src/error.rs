//! Engine-level diagnostic errors and the [`Rejection`] envelope returned by every service call.
//!
//! A rejection pairs the wire-safe [`OAuthError`] with the diagnostic [`Error`] that caused it.
//! Transport layers serialize [`Rejection::oauth`] and log [`Rejection::cause`]; the cause must
//! never be sent to a client.

// self
use crate::{
	_prelude::*,
	auth::{IdentifierError, ScopeValidationError, TokenBuilderError, TransitionError, pkce::PkceError},
	keys::KeyError,
	proof::{AssertionError, DpopError, JarError, JarmError},
	reactor::DispatchError,
	store::StoreError,
};

/// Engine-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Diagnostic error carried alongside wire-safe rejections.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Key or key-set provider failure.
	#[error(transparent)]
	Key(#[from] KeyError),
	/// Reactor dispatch failure.
	#[error(transparent)]
	Dispatch(#[from] DispatchError),
	/// Illegal lifecycle transition.
	#[error(transparent)]
	Transition(#[from] TransitionError),
	/// DPoP proof verification failure.
	#[error(transparent)]
	Dpop(#[from] DpopError),
	/// Signed authorization request failure.
	#[error(transparent)]
	Jar(#[from] JarError),
	/// Signed authorization response failure.
	#[error(transparent)]
	Jarm(#[from] JarmError),
	/// Client assertion failure.
	#[error(transparent)]
	Assertion(#[from] AssertionError),
	/// Malformed identifier.
	#[error(transparent)]
	Identifier(#[from] IdentifierError),
	/// Malformed scope parameter.
	#[error(transparent)]
	Scope(#[from] ScopeValidationError),
	/// PKCE verification failure.
	#[error(transparent)]
	Pkce(#[from] PkceError),
	/// Token record could not be assembled.
	#[error(transparent)]
	TokenBuilder(#[from] TokenBuilderError),
	/// JWT encoding failure while minting a token.
	#[error("Token signing failed.")]
	Signing(#[source] jsonwebtoken::errors::Error),

	/// A referenced entity does not exist.
	#[error("{entity} was not found.")]
	NotFound {
		/// Entity label (client, session, token, ...).
		entity: &'static str,
	},
	/// The request failed protocol validation.
	#[error("Request validation failed: {reason}.")]
	Validation {
		/// Validation failure summary.
		reason: String,
	},
}

/// Configuration failures raised while building the engine.
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum ConfigError {
	/// Issuer must be an absolute https URL.
	#[error("Issuer must use HTTPS: {url}.")]
	InsecureIssuer {
		/// Offending issuer.
		url: String,
	},
	/// A lifetime or interval was zero or negative.
	#[error("The {field} duration must be positive.")]
	NonPositiveDuration {
		/// Name of the offending setting.
		field: &'static str,
	},
	/// JWT access tokens were requested without a signing key provider.
	#[error("JWT access tokens require a signing key provider.")]
	MissingKeyProvider,
}

/// Failed service call: wire-safe error plus diagnostic cause.
#[derive(Debug, ThisError)]
#[error("{oauth}")]
pub struct Rejection {
	oauth: OAuthError,
	#[source]
	cause: Error,
}
impl Rejection {
	/// Pairs a wire error with its diagnostic cause.
	pub fn new(oauth: OAuthError, cause: impl Into<Error>) -> Self {
		Self { oauth, cause: cause.into() }
	}

	/// Builds a rejection whose cause is the validation failure itself.
	pub fn validation(oauth: OAuthError) -> Self {
		let reason = oauth.description.clone().unwrap_or_else(|| oauth.kind.as_str().to_owned());

		Self { oauth, cause: Error::Validation { reason } }
	}

	/// Escalates a backend fault to `server_error`, keeping the fault for diagnostics only.
	pub fn server_error(cause: impl Into<Error>) -> Self {
		Self { oauth: OAuthError::server_error(), cause: cause.into() }
	}

	/// Wire-safe error value.
	pub fn oauth(&self) -> &OAuthError {
		&self.oauth
	}

	/// Error code of the wire value.
	pub fn kind(&self) -> ErrorKind {
		self.oauth.kind
	}

	/// Diagnostic cause; never serialize this to a client.
	pub fn cause(&self) -> &Error {
		&self.cause
	}

	/// Splits the rejection into its wire and diagnostic halves.
	pub fn into_parts(self) -> (OAuthError, Error) {
		(self.oauth, self.cause)
	}

	/// Echoes the authorization request `state` on the wire value.
	pub fn with_state(mut self, state: impl Into<String>) -> Self {
		self.oauth = self.oauth.with_state(state);

		self
	}

	/// Returns `true` when the rejection reports an unknown or foreign token.
	pub fn is_unknown_token(&self) -> bool {
		self.oauth.kind == ErrorKind::InvalidToken
			&& matches!(self.cause, Error::NotFound { entity: "token" })
	}
}
impl From<OAuthError> for Rejection {
	fn from(oauth: OAuthError) -> Self {
		Self::validation(oauth)
	}
}
