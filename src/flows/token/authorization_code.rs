//! `authorization_code` redemption with PKCE.

// self
use crate::{
	_prelude::*,
	auth::{
		Client, GrantType, OFFLINE_ACCESS, OPENID, TokenConfirmation, TokenType,
		pkce::{self, VERIFIER_MAX_LEN, VERIFIER_MIN_LEN},
	},
	flows::{
		Engine, TokenResponse,
		common::{self, reject},
		mint::Grantee,
	},
	store::SessionStore,
};

const CODE_MAX_LEN: usize = 1_024;

impl Engine {
	pub(super) async fn authorization_code(
		&self,
		client: &Client,
		code: &str,
		code_verifier: &str,
		redirect_uri: &str,
		confirmation: Option<TokenConfirmation>,
	) -> Result<TokenResponse, Rejection> {
		common::require_grant(client, GrantType::AuthorizationCode)?;
		common::require("code", code)?;
		common::require("code_verifier", code_verifier)?;
		common::require("redirect_uri", redirect_uri)?;

		if code.len() > CODE_MAX_LEN {
			return Err(reject(ErrorKind::InvalidRequest, "code is too long"));
		}
		if !(VERIFIER_MIN_LEN..=VERIFIER_MAX_LEN).contains(&code_verifier.len()) {
			return Err(reject(
				ErrorKind::InvalidRequest,
				"code_verifier must be between 43 and 128 characters",
			));
		}

		let unknown = || {
			Rejection::new(
				OAuthError::invalid_grant("authorization code is invalid"),
				Error::NotFound { entity: "session" },
			)
		};
		let session = SessionStore::get(self.sessions.as_ref(), code)
			.await
			.map_err(Rejection::server_error)?
			.ok_or_else(unknown)?;

		// Only the caller that removes the session proceeds.
		if !SessionStore::delete(self.sessions.as_ref(), code).await.map_err(Rejection::server_error)? {
			return Err(unknown());
		}

		let state = session.request.state.as_str();
		let invalid_grant = |description: &str| {
			Rejection::validation(OAuthError::invalid_grant(description)).with_state(state)
		};

		if session.is_expired_at(self.clock.now()) {
			return Err(invalid_grant("authorization code has expired"));
		}
		if session.client_id != client.client_id {
			return Err(invalid_grant("authorization code was issued to another client"));
		}
		if session.request.redirect_uri != redirect_uri || !client.has_redirect_uri(redirect_uri) {
			return Err(invalid_grant("redirect_uri does not match the authorization request"));
		}

		pkce::verify(
			code_verifier,
			&session.request.code_challenge,
			&session.request.code_challenge_method,
		)
		.map_err(|e| {
			Rejection::new(OAuthError::invalid_grant("code_verifier is invalid").with_state(state), e)
		})?;

		let scope = common::parse_scope(&session.request.scope)?;
		let grantee = Grantee {
			issuer: self.config.issuer.as_str().to_owned(),
			subject: session.subject.clone(),
			client_id: client.client_id.clone(),
			scope: scope.clone(),
			audience: session.request.audience.clone().filter(|audience| !audience.is_empty()),
			confirmation,
		};
		let access = self.mint(TokenType::Access, &grantee, self.config.access_token_ttl).await?;
		let refresh = if scope.contains(OPENID) && scope.contains(OFFLINE_ACCESS) {
			Some(self.mint(TokenType::Refresh, &grantee, self.config.refresh_token_ttl).await?)
		} else {
			None
		};

		Ok(TokenResponse::issued(&access, refresh.as_ref()))
	}
}
