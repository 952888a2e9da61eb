//! Device-code polling (RFC 8628 §3.4).

// self
use crate::{
	_prelude::*,
	auth::{Client, DeviceCodeStatus, GrantType, TokenConfirmation, TokenType},
	flows::{
		Engine, TokenResponse,
		common::{self, reject},
		mint::Grantee,
	},
	store::{CompareAndSwapOutcome, DeviceSessionStore},
};

impl Engine {
	pub(super) async fn device_code(
		&self,
		client: &Client,
		device_code: &str,
		confirmation: Option<TokenConfirmation>,
	) -> Result<TokenResponse, Rejection> {
		common::require("device_code", device_code)?;
		common::require_grant(client, GrantType::DeviceCode)?;

		let session = DeviceSessionStore::get(self.devices.as_ref(), device_code)
			.await
			.map_err(Rejection::server_error)?
			.ok_or_else(|| {
				Rejection::new(
					OAuthError::invalid_request("device_code is unknown"),
					Error::NotFound { entity: "device session" },
				)
			})?;

		if session.client_id != client.client_id {
			return Err(reject(ErrorKind::InvalidRequest, "device_code was issued to another client"));
		}
		if session.is_expired_at(self.clock.now()) {
			return Err(Rejection::validation(OAuthError::expired_token()));
		}

		let subject = match &session.status {
			DeviceCodeStatus::AuthorizationPending =>
				return Err(Rejection::validation(OAuthError::authorization_pending())),
			DeviceCodeStatus::Validated { subject } => subject.clone(),
			DeviceCodeStatus::Expired =>
				return Err(reject(ErrorKind::InvalidToken, "device_code is no longer usable")),
		};

		// Consume before issuing so a device code yields tokens once.
		match self
			.devices
			.compare_and_swap_status(device_code, &session.status, DeviceCodeStatus::Expired)
			.await
			.map_err(Rejection::server_error)?
		{
			CompareAndSwapOutcome::Updated => (),
			CompareAndSwapOutcome::Mismatch | CompareAndSwapOutcome::Missing =>
				return Err(reject(ErrorKind::InvalidToken, "device_code is no longer usable")),
		}

		let grantee = Grantee {
			issuer: self.config.issuer.as_str().to_owned(),
			subject,
			client_id: client.client_id.clone(),
			scope: session.scope,
			audience: session.audience,
			confirmation,
		};
		let access = self.mint(TokenType::Access, &grantee, self.config.access_token_ttl).await?;

		Ok(TokenResponse::issued(&access, None))
	}
}
