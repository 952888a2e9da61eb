//! Token introspection (RFC 7662) and revocation (RFC 7009).

// self
use crate::{
	_prelude::*,
	auth::{Client, Token, TokenConfirmation, TokenStatus, TokenType},
	flows::{
		Engine,
		common::{self, reject},
	},
	obs::FlowKind,
	store::TokenStore,
};

/// Introspection or revocation request from an authenticated client.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenLookupRequest {
	/// Authenticated caller; `None` when authentication did not happen.
	#[serde(default)]
	pub client_id: Option<String>,
	/// Token value.
	#[serde(default)]
	pub token: String,
}
impl TokenLookupRequest {
	/// Creates a request from an authenticated `client_id`.
	pub fn new(client_id: impl Into<String>, token: impl Into<String>) -> Self {
		Self { client_id: Some(client_id.into()), token: token.into() }
	}
}
impl Debug for TokenLookupRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenLookupRequest")
			.field("client_id", &self.client_id)
			.field("token", &"<redacted>")
			.finish()
	}
}

/// Introspection outcome.
///
/// Unknown tokens are not an error: they report `status = invalid`. Claims are only disclosed
/// while the token is active.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntrospectionResponse {
	/// True only for stored, active, unexpired tokens.
	pub active: bool,
	/// Effective lifecycle status.
	pub status: TokenStatus,
	/// Access or refresh.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub token_type: Option<TokenType>,
	/// Granted scope.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub scope: Option<String>,
	/// Client the token was issued to.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub client_id: Option<String>,
	/// Subject.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub sub: Option<String>,
	/// Audience.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub aud: Option<String>,
	/// Issuer.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub iss: Option<String>,
	/// Expiry (Unix seconds).
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub exp: Option<i64>,
	/// Issue instant (Unix seconds).
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub iat: Option<i64>,
	/// DPoP binding.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub cnf: Option<TokenConfirmation>,
}
impl IntrospectionResponse {
	/// Inactive outcome with the given status and no claims.
	pub fn inactive(status: TokenStatus) -> Self {
		Self {
			active: false,
			status,
			token_type: None,
			scope: None,
			client_id: None,
			sub: None,
			aud: None,
			iss: None,
			exp: None,
			iat: None,
			cnf: None,
		}
	}

	fn describe(token: Token, now: OffsetDateTime) -> Self {
		let status = match token.status {
			TokenStatus::Active if token.is_expired_at(now) => TokenStatus::Invalid,
			status => status,
		};

		if status != TokenStatus::Active {
			return Self::inactive(status);
		}

		let Some(metadata) = token.metadata else {
			return Self::inactive(TokenStatus::Invalid);
		};

		Self {
			active: true,
			status,
			token_type: Some(token.token_type),
			scope: Some(metadata.scope.to_param()).filter(|scope| !scope.is_empty()),
			client_id: Some(metadata.client_id.into()),
			sub: Some(metadata.subject.into()),
			aud: metadata.audience,
			iss: Some(metadata.issuer),
			exp: Some(metadata.expires_at.unix_timestamp()),
			iat: Some(metadata.issued_at.unix_timestamp()),
			cnf: token.confirmation,
		}
	}
}

impl Engine {
	/// Reports the state of a token to an authenticated client.
	pub async fn introspect(
		&self,
		request: TokenLookupRequest,
	) -> Result<IntrospectionResponse, Rejection> {
		common::observe(FlowKind::Introspection, "introspect", async move {
			self.authenticate_lookup(&request).await?;

			let token = TokenStore::get_by_value(self.tokens.as_ref(), &request.token)
				.await
				.map_err(Rejection::server_error)?;

			Ok(match token {
				Some(token) => IntrospectionResponse::describe(token, self.clock.now()),
				None => IntrospectionResponse::inactive(TokenStatus::Invalid),
			})
		})
		.await
	}

	/// Revokes a token issued to the calling client and returns its new status.
	///
	/// Unknown tokens and tokens of other clients are both reported as `invalid_token` with a
	/// not-found cause; see [`Rejection::is_unknown_token`] for callers that treat that as success.
	pub async fn revoke(&self, request: TokenLookupRequest) -> Result<TokenStatus, Rejection> {
		common::observe(FlowKind::Revocation, "revoke", async move {
			let client = self.authenticate_lookup(&request).await?;
			let unknown = || {
				Rejection::new(
					OAuthError::invalid_token("token is unknown"),
					Error::NotFound { entity: "token" },
				)
			};
			let token = TokenStore::get_by_value(self.tokens.as_ref(), &request.token)
				.await
				.map_err(Rejection::server_error)?
				.ok_or_else(unknown)?;

			if token.metadata.as_ref().is_none_or(|metadata| metadata.client_id != client.client_id) {
				return Err(unknown());
			}

			let revoked = self
				.tokens
				.revoke(&token.token_id)
				.await
				.map_err(Rejection::server_error)?
				.ok_or_else(unknown)?;

			Ok(revoked.status)
		})
		.await
	}

	async fn authenticate_lookup(&self, request: &TokenLookupRequest) -> Result<Client, Rejection> {
		let client_id = request
			.client_id
			.as_deref()
			.filter(|id| !id.is_empty())
			.ok_or_else(|| reject(ErrorKind::InvalidClient, "client authentication is required"))?;

		common::require("token", &request.token)?;

		self.load_client(client_id, ErrorKind::InvalidClient).await
	}
}
