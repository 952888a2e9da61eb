//! Token records, lifecycle status, and builders.

// self
use crate::{
	_prelude::*,
	auth::{ClientId, ScopeSet, Subject, TokenId, TransitionError, token::secret::TokenSecret},
};

/// RFC 8693 token type identifier for access tokens.
pub const ACCESS_TOKEN_TYPE_URN: &str = "urn:ietf:params:oauth:token-type:access_token";
/// RFC 8693 token type identifier for refresh tokens.
pub const REFRESH_TOKEN_TYPE_URN: &str = "urn:ietf:params:oauth:token-type:refresh_token";

/// Kind of issued token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
	/// Access token.
	Access,
	/// Refresh token.
	Refresh,
}
impl TokenType {
	/// RFC 8693 token type URN.
	pub const fn urn(self) -> &'static str {
		match self {
			TokenType::Access => ACCESS_TOKEN_TYPE_URN,
			TokenType::Refresh => REFRESH_TOKEN_TYPE_URN,
		}
	}
}

/// Stored lifecycle status of a token.
///
/// Revocation is a status change, not a deletion. Once a token leaves `Active` it never returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenStatus {
	/// Usable until `expires_at`.
	Active,
	/// Revoked by the client or by rotation.
	Revoked,
	/// Unknown or otherwise unusable.
	Invalid,
}
impl TokenStatus {
	/// Stable label for diagnostics.
	pub const fn as_str(self) -> &'static str {
		match self {
			TokenStatus::Active => "active",
			TokenStatus::Revoked => "revoked",
			TokenStatus::Invalid => "invalid",
		}
	}

	/// Applies a transition; revoking twice is allowed, reactivation is not.
	pub fn transition(self, next: TokenStatus) -> Result<TokenStatus, TransitionError> {
		match (self, next) {
			(TokenStatus::Active, TokenStatus::Revoked | TokenStatus::Invalid)
			| (TokenStatus::Revoked | TokenStatus::Invalid, TokenStatus::Revoked) => Ok(next),
			_ => Err(TransitionError { entity: "token", from: self.as_str(), to: next.as_str() }),
		}
	}
}

/// DPoP key binding (`cnf.jkt`, RFC 9449).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenConfirmation {
	/// Base64url SHA-256 JWK thumbprint (RFC 7638).
	pub jkt: String,
}

/// Claims describing who a token was issued to and for how long.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
	/// Issuer identifier.
	pub issuer: String,
	/// Subject the token represents.
	pub subject: Subject,
	/// Client the token was issued to.
	pub client_id: ClientId,
	/// Granted scope.
	pub scope: ScopeSet,
	/// Intended audience.
	pub audience: Option<String>,
	/// Issue instant.
	pub issued_at: OffsetDateTime,
	/// Expiry instant.
	pub expires_at: OffsetDateTime,
}

/// Errors produced by [`TokenBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum TokenBuilderError {
	/// Issued when no token value was provided.
	#[error("Token value is required.")]
	MissingValue,
	/// Expiry precedes the issue instant.
	#[error("Token expiry must follow its issue instant.")]
	ExpiryBeforeIssue,
}

/// Issued access or refresh token as held by the token store.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
	/// Store identifier.
	pub token_id: TokenId,
	/// Access or refresh.
	pub token_type: TokenType,
	/// Lifecycle status.
	pub status: TokenStatus,
	/// Token value presented by clients.
	pub value: TokenSecret,
	/// Issuance claims; absent only for malformed records.
	pub metadata: Option<TokenMetadata>,
	/// DPoP binding, if any.
	pub confirmation: Option<TokenConfirmation>,
}
impl Token {
	/// Returns a builder for a token of the given type.
	pub fn builder(token_type: TokenType, metadata: TokenMetadata) -> TokenBuilder {
		TokenBuilder::new(token_type, metadata)
	}

	/// Returns true if the stored status is `Active`.
	pub fn is_active(&self) -> bool {
		self.status == TokenStatus::Active
	}

	/// Returns true if the token has expired at the provided instant (or lacks metadata).
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		self.metadata.as_ref().is_none_or(|metadata| instant >= metadata.expires_at)
	}

	/// Returns true if the token is active and unexpired at the provided instant.
	pub fn is_usable_at(&self, instant: OffsetDateTime) -> bool {
		self.is_active() && !self.is_expired_at(instant)
	}

	/// Moves the token to `Revoked`.
	pub fn revoke(&mut self) -> Result<(), TransitionError> {
		self.status = self.status.transition(TokenStatus::Revoked)?;

		Ok(())
	}
}
impl Debug for Token {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Token")
			.field("token_id", &self.token_id)
			.field("token_type", &self.token_type)
			.field("status", &self.status)
			.field("value", &"<redacted>")
			.field("metadata", &self.metadata)
			.field("confirmation", &self.confirmation)
			.finish()
	}
}

/// Builder for [`Token`].
#[derive(Clone, Debug)]
pub struct TokenBuilder {
	token_type: TokenType,
	metadata: TokenMetadata,
	token_id: Option<TokenId>,
	value: Option<TokenSecret>,
	confirmation: Option<TokenConfirmation>,
}
impl TokenBuilder {
	fn new(token_type: TokenType, metadata: TokenMetadata) -> Self {
		Self { token_type, metadata, token_id: None, value: None, confirmation: None }
	}

	/// Uses a caller-chosen identifier instead of a generated one.
	pub fn token_id(mut self, token_id: TokenId) -> Self {
		self.token_id = Some(token_id);

		self
	}

	/// Provides the token value.
	pub fn value(mut self, value: impl Into<String>) -> Self {
		self.value = Some(TokenSecret::new(value));

		self
	}

	/// Binds the token to a DPoP key.
	pub fn confirmation(mut self, confirmation: Option<TokenConfirmation>) -> Self {
		self.confirmation = confirmation;

		self
	}

	/// Consumes the builder and produces an `Active` [`Token`].
	pub fn build(self) -> Result<Token, TokenBuilderError> {
		let value = self.value.ok_or(TokenBuilderError::MissingValue)?;

		if self.metadata.expires_at < self.metadata.issued_at {
			return Err(TokenBuilderError::ExpiryBeforeIssue);
		}

		Ok(Token {
			token_id: self.token_id.unwrap_or_else(TokenId::generate),
			token_type: self.token_type,
			status: TokenStatus::Active,
			value,
			metadata: Some(self.metadata),
			confirmation: self.confirmation,
		})
	}
}
