//! Token exchange (RFC 8693) of an access token for a short-lived, optionally re-targeted one.

// self
use crate::{
	_prelude::*,
	auth::{ACCESS_TOKEN_TYPE_URN, Client, GrantType, TokenConfirmation, TokenType},
	flows::{
		Engine, TokenResponse,
		common::{self, reject},
		mint::Grantee,
	},
	proof,
	store::TokenStore,
};

pub(super) struct ExchangeParams<'a> {
	pub issuer: &'a str,
	pub subject_token: &'a str,
	pub subject_token_type: &'a str,
	pub audience: Option<&'a str>,
	pub scope: Option<&'a str>,
}

impl Engine {
	pub(super) async fn exchange(
		&self,
		client: &Client,
		params: ExchangeParams<'_>,
		confirmation: Option<TokenConfirmation>,
	) -> Result<TokenResponse, Rejection> {
		common::require_issuer(params.issuer)?;
		common::require("subject_token", params.subject_token)?;
		common::require("subject_token_type", params.subject_token_type)?;
		common::require_grant(client, GrantType::TokenExchange)?;

		if params.subject_token_type != ACCESS_TOKEN_TYPE_URN {
			return Err(reject(ErrorKind::InvalidRequest, "subject_token_type is not supported"));
		}

		let invalid = |description: &str| reject(ErrorKind::InvalidRequest, description);
		let subject_token = TokenStore::get_by_value(self.tokens.as_ref(), params.subject_token)
			.await
			.map_err(Rejection::server_error)?
			.ok_or_else(|| {
				Rejection::new(
					OAuthError::invalid_request("subject_token is invalid"),
					Error::NotFound { entity: "token" },
				)
			})?;

		if !subject_token.is_active() {
			return Err(invalid("subject_token is not active"));
		}
		if subject_token.token_type != TokenType::Access {
			return Err(invalid("subject_token is not an access token"));
		}

		let Some(metadata) = subject_token.metadata.as_ref() else {
			return Err(invalid("subject_token carries no metadata"));
		};

		if subject_token.is_expired_at(self.clock.now()) {
			return Err(invalid("subject_token has expired"));
		}

		proof::ensure_binding(subject_token.confirmation.as_ref(), confirmation.as_ref())?;

		let resource = match params.audience.filter(|audience| !audience.is_empty()) {
			Some(audience) => Some(
				self.resources
					.get_by_uri(audience)
					.await
					.map_err(Rejection::server_error)?
					.ok_or_else(|| {
						Rejection::new(
							OAuthError::invalid_target("audience is not a known resource"),
							Error::NotFound { entity: "resource" },
						)
					})?,
			),
			None => None,
		};
		let scope = match params.scope.filter(|raw| !raw.trim().is_empty()) {
			Some(raw) => {
				let requested = common::parse_scope(raw)?;

				if !requested.is_subset_of(&metadata.scope) {
					return Err(reject(ErrorKind::InvalidScope, "scope exceeds the subject token"));
				}

				requested
			},
			None => metadata.scope.clone(),
		};

		if resource.as_ref().is_some_and(|resource| !resource.accepts(&scope)) {
			return Err(reject(ErrorKind::InvalidScope, "scope is not offered by the audience"));
		}

		let scope_changed = scope != metadata.scope;
		let grantee = Grantee {
			issuer: metadata.issuer.clone(),
			subject: metadata.subject.clone(),
			client_id: client.client_id.clone(),
			scope,
			audience: resource.map(|resource| resource.uri).or_else(|| metadata.audience.clone()),
			confirmation: subject_token.confirmation.clone(),
		};
		let access = self.mint(TokenType::Access, &grantee, self.config.exchanged_token_ttl).await?;
		let mut response = TokenResponse::issued(&access, None);

		response.issued_token_type = Some(ACCESS_TOKEN_TYPE_URN.to_owned());

		if !scope_changed {
			response.scope = None;
		}

		Ok(response)
	}
}
