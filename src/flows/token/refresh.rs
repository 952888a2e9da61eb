//! `refresh_token` redemption with rotation-on-refresh.
//!
//! A refresh token keeps minting access tokens until an access token would outlive it. At that
//! point the grant also mints a replacement refresh token and revokes the presented one, so the
//! old value fails on any later use. Concurrent redemptions of the same refresh token are
//! serialized by a per-token singleflight guard, so exactly one of them performs the rotation.

// self
use crate::{
	_prelude::*,
	auth::{Client, GrantType, TokenConfirmation, TokenType},
	flows::{
		Engine, TokenResponse,
		common::{self, reject},
		mint::Grantee,
	},
	proof,
	store::TokenStore,
};

impl Engine {
	pub(super) async fn refresh(
		&self,
		client: &Client,
		issuer: &str,
		refresh_token: &str,
		scope: Option<&str>,
		confirmation: Option<TokenConfirmation>,
	) -> Result<TokenResponse, Rejection> {
		common::require_issuer(issuer)?;
		common::require("refresh_token", refresh_token)?;
		common::require_grant(client, GrantType::RefreshToken)?;

		let guard = self.refresh_guard(refresh_token);
		let result = {
			let _singleflight = guard.lock().await;

			self.redeem_refresh(client, issuer, refresh_token, scope, confirmation).await
		};

		drop(guard);
		self.prune_refresh_guards();

		result
	}

	async fn redeem_refresh(
		&self,
		client: &Client,
		issuer: &str,
		refresh_token: &str,
		scope: Option<&str>,
		confirmation: Option<TokenConfirmation>,
	) -> Result<TokenResponse, Rejection> {
		let invalid = |description: &str| reject(ErrorKind::InvalidRequest, description);
		let token = TokenStore::get_by_value(self.tokens.as_ref(), refresh_token)
			.await
			.map_err(Rejection::server_error)?
			.ok_or_else(|| {
				Rejection::new(
					OAuthError::invalid_request("refresh_token is invalid"),
					Error::NotFound { entity: "token" },
				)
			})?;

		if !token.is_active() {
			return Err(invalid("refresh_token is not active"));
		}
		if token.token_type != TokenType::Refresh {
			return Err(invalid("token is not a refresh token"));
		}

		let Some(metadata) = token.metadata.as_ref() else {
			return Err(invalid("refresh_token carries no metadata"));
		};
		let now = self.clock.now();

		if now >= metadata.expires_at {
			return Err(invalid("refresh_token has expired"));
		}
		if metadata.client_id != client.client_id {
			return Err(invalid("refresh_token was issued to another client"));
		}

		proof::ensure_binding(token.confirmation.as_ref(), confirmation.as_ref())?;

		let granted = match scope.filter(|raw| !raw.trim().is_empty()) {
			Some(raw) => {
				let narrowed = common::parse_scope(raw)?;

				if !narrowed.is_subset_of(&metadata.scope) {
					return Err(reject(ErrorKind::InvalidScope, "scope exceeds the original grant"));
				}

				narrowed
			},
			None => metadata.scope.clone(),
		};
		let grantee = Grantee {
			issuer: issuer.to_owned(),
			subject: metadata.subject.clone(),
			client_id: client.client_id.clone(),
			scope: granted,
			audience: metadata.audience.clone(),
			confirmation: token.confirmation.clone().or(confirmation),
		};
		let access = self.mint(TokenType::Access, &grantee, self.config.access_token_ttl).await?;
		let replacement = if now + self.config.access_token_ttl > metadata.expires_at {
			let grantee = Grantee { scope: metadata.scope.clone(), ..grantee };
			let replacement =
				self.mint(TokenType::Refresh, &grantee, self.config.refresh_token_ttl).await?;

			self.tokens.revoke(&token.token_id).await.map_err(Rejection::server_error)?;

			Some(replacement)
		} else {
			None
		};

		Ok(TokenResponse::issued(&access, replacement.as_ref()))
	}
}
