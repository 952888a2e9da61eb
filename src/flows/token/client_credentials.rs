//! `client_credentials`: stateless issuance to the client itself.

// self
use crate::{
	_prelude::*,
	auth::{Client, GrantType, Subject, TokenConfirmation, TokenType},
	flows::{Engine, TokenResponse, common, mint::Grantee},
};

impl Engine {
	pub(super) async fn client_credentials(
		&self,
		client: &Client,
		issuer: &str,
		scope: &str,
		audience: Option<String>,
		confirmation: Option<TokenConfirmation>,
	) -> Result<TokenResponse, Rejection> {
		common::require_issuer(issuer)?;
		common::require_grant(client, GrantType::ClientCredentials)?;

		let scope = common::parse_scope(scope)?;
		let subject = Subject::new(&client.client_id).map_err(Rejection::server_error)?;
		let grantee = Grantee {
			issuer: issuer.to_owned(),
			subject,
			client_id: client.client_id.clone(),
			scope,
			audience: audience.filter(|audience| !audience.is_empty()),
			confirmation,
		};
		let access = self.mint(TokenType::Access, &grantee, self.config.access_token_ttl).await?;

		Ok(TokenResponse::issued(&access, None))
	}
}
