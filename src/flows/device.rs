//! Device authorization (RFC 8628): code issuance and end-user confirmation.

// self
use crate::{
	_prelude::*,
	auth::{
		DeviceAuthorizationRequest, DeviceAuthorizationResponse, DeviceCodeSession,
		DeviceCodeStatus, GrantType, Subject, UserCodeValidation,
	},
	flows::{
		Engine,
		common::{self, reject},
	},
	obs::FlowKind,
	store::{CompareAndSwapOutcome, DeviceSessionStore},
};

impl Engine {
	/// Starts a device flow and returns the polling and user codes.
	pub async fn device_authorize(
		&self,
		request: DeviceAuthorizationRequest,
	) -> Result<DeviceAuthorizationResponse, Rejection> {
		common::observe(FlowKind::DeviceAuthorization, "device_authorize", async move {
			common::require("client_id", &request.client_id)?;

			let client = self.load_client(&request.client_id, ErrorKind::InvalidRequest).await?;

			common::require_grant(&client, GrantType::DeviceCode)?;

			let scope = common::parse_scope(&request.scope)?;
			let now = self.clock.now();
			let ttl = self.config.device_code_ttl;
			let session = DeviceCodeSession {
				client_id: client.client_id,
				scope,
				audience: request.audience.filter(|audience| !audience.is_empty()),
				status: DeviceCodeStatus::AuthorizationPending,
				issued_at: now,
				expires_at: now + ttl,
			};
			let codes = DeviceSessionStore::register(self.devices.as_ref(), session)
				.await
				.map_err(Rejection::server_error)?;
			let verification_uri = self.config.device_verification_uri.clone();
			let verification_uri_complete = verification_uri.clone().map(|mut uri| {
				uri.query_pairs_mut().append_pair("user_code", &codes.user_code);

				uri.to_string()
			});

			Ok(DeviceAuthorizationResponse {
				device_code: codes.device_code,
				user_code: codes.user_code,
				verification_uri: verification_uri.map(String::from),
				verification_uri_complete,
				expires_in: ttl.whole_seconds(),
				interval: self.config.device_poll_interval.whole_seconds(),
			})
		})
		.await
	}

	/// Binds `subject` to the pending session behind `user_code`.
	pub async fn validate_user_code(
		&self,
		subject: Subject,
		user_code: &str,
	) -> Result<UserCodeValidation, Rejection> {
		common::observe(FlowKind::UserCodeValidation, "validate_user_code", async move {
			common::require("user_code", user_code)?;

			let stored = self
				.devices
				.get_by_user_code(user_code)
				.await
				.map_err(Rejection::server_error)?
				.ok_or_else(|| {
					Rejection::new(
						OAuthError::invalid_request("user_code is unknown"),
						Error::NotFound { entity: "device session" },
					)
				})?;
			let session = stored.session;

			if session.is_expired_at(self.clock.now()) {
				// Best effort; a concurrent winner already moved it forward.
				self.devices
					.compare_and_swap_status(
						&stored.device_code,
						&session.status,
						DeviceCodeStatus::Expired,
					)
					.await
					.map_err(Rejection::server_error)?;

				return Err(Rejection::validation(OAuthError::expired_token()));
			}

			let validated = session
				.status
				.transition(DeviceCodeStatus::Validated { subject: subject.clone() })
				.map_err(|e| {
					Rejection::new(OAuthError::invalid_request("user_code was already used"), e)
				})?;

			match self
				.devices
				.compare_and_swap_status(&stored.device_code, &session.status, validated)
				.await
				.map_err(Rejection::server_error)?
			{
				CompareAndSwapOutcome::Updated => Ok(UserCodeValidation {
					client_id: session.client_id,
					scope: session.scope,
					subject,
				}),
				CompareAndSwapOutcome::Mismatch | CompareAndSwapOutcome::Missing =>
					Err(reject(ErrorKind::InvalidRequest, "user_code was already used")),
			}
		})
		.await
	}
}
