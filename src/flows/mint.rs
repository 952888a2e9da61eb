//! Token minting: opaque or `at+jwt` access tokens and opaque refresh tokens, persisted on issue.

// self
use crate::{
	_prelude::*,
	auth::{
		ClientId, ScopeSet, Subject, Token, TokenConfirmation, TokenId, TokenMetadata, TokenType,
		random_secret,
	},
	config::AccessTokenFormat,
	error::ConfigError,
	flows::{Engine, TokenResponse},
};

/// JOSE `typ` of JWT access tokens (RFC 9068).
pub const ACCESS_TOKEN_JWT_TYPE: &str = "at+jwt";

/// Who a token is minted for.
#[derive(Clone, Debug)]
pub(crate) struct Grantee {
	pub issuer: String,
	pub subject: Subject,
	pub client_id: ClientId,
	pub scope: ScopeSet,
	pub audience: Option<String>,
	pub confirmation: Option<TokenConfirmation>,
}

#[derive(Serialize)]
struct AccessTokenClaims<'a> {
	iss: &'a str,
	sub: &'a str,
	aud: &'a str,
	client_id: &'a str,
	#[serde(skip_serializing_if = "Option::is_none")]
	scope: Option<String>,
	iat: i64,
	exp: i64,
	jti: &'a str,
	#[serde(skip_serializing_if = "Option::is_none")]
	cnf: Option<&'a TokenConfirmation>,
}

impl Engine {
	/// Mints and stores a token of `token_type` valid for `ttl`.
	pub(crate) async fn mint(
		&self,
		token_type: TokenType,
		grantee: &Grantee,
		ttl: Duration,
	) -> Result<Token, Rejection> {
		let issued_at = self.clock.now();
		let metadata = TokenMetadata {
			issuer: grantee.issuer.clone(),
			subject: grantee.subject.clone(),
			client_id: grantee.client_id.clone(),
			scope: grantee.scope.clone(),
			audience: grantee.audience.clone(),
			issued_at,
			expires_at: issued_at + ttl,
		};
		let token_id = TokenId::generate();
		let value = match (token_type, self.config.access_token_format) {
			(TokenType::Access, AccessTokenFormat::Jwt) =>
				self.sign_access_token(&token_id, &metadata, grantee.confirmation.as_ref()).await?,
			_ => random_secret(),
		};
		let token = Token::builder(token_type, metadata)
			.token_id(token_id)
			.value(value)
			.confirmation(grantee.confirmation.clone())
			.build()
			.map_err(Rejection::server_error)?;

		self.tokens.create(token.clone()).await.map_err(Rejection::server_error)?;

		Ok(token)
	}

	async fn sign_access_token(
		&self,
		token_id: &TokenId,
		metadata: &TokenMetadata,
		confirmation: Option<&TokenConfirmation>,
	) -> Result<String, Rejection> {
		let keys = self
			.keys
			.as_ref()
			.ok_or_else(|| Rejection::server_error(ConfigError::MissingKeyProvider))?;
		let key = keys.signing_key().await.map_err(Rejection::server_error)?;
		let claims = AccessTokenClaims {
			iss: &metadata.issuer,
			sub: metadata.subject.as_ref(),
			aud: metadata.audience.as_deref().unwrap_or(metadata.client_id.as_ref()),
			client_id: metadata.client_id.as_ref(),
			scope: Some(metadata.scope.to_param()).filter(|scope| !scope.is_empty()),
			iat: metadata.issued_at.unix_timestamp(),
			exp: metadata.expires_at.unix_timestamp(),
			jti: token_id.as_ref(),
			cnf: confirmation,
		};

		jsonwebtoken::encode(&key.header(ACCESS_TOKEN_JWT_TYPE), &claims, &key.key)
			.map_err(|e| Rejection::server_error(Error::Signing(e)))
	}
}

impl TokenResponse {
	/// Builds the wire response for a freshly minted access (and optional refresh) token.
	pub(crate) fn issued(access: &Token, refresh: Option<&Token>) -> Self {
		let (expires_in, scope) = access
			.metadata
			.as_ref()
			.map(|metadata| {
				(
					(metadata.expires_at - metadata.issued_at).whole_seconds(),
					Some(metadata.scope.to_param()).filter(|scope| !scope.is_empty()),
				)
			})
			.unwrap_or_default();

		Self {
			access_token: access.value.expose().to_owned(),
			token_type: String::from(if access.confirmation.is_some() { "DPoP" } else { "Bearer" }),
			expires_in,
			refresh_token: refresh.map(|token| token.value.expose().to_owned()),
			scope,
			issued_token_type: None,
		}
	}
}
