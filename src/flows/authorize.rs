//! Authorization endpoint: request validation, code issuance, and pushed authorization requests.
//!
//! [`Engine::validate`] checks a request fail-fast in a fixed order so that the first violation
//! decides the error. Once `state` is known every rejection echoes it. [`Engine::authorize`]
//! registers the validated request as a code session for the authenticated end-user, and
//! [`Engine::register`] parks a request under a short-lived `request_uri` (RFC 9126) that
//! `authorize` later redeems exactly once.

// self
use crate::{
	_prelude::*,
	auth::{
		AuthorizationCodeResponse, AuthorizationRequest, AuthorizationResponse, Client, GrantType,
		PushedAuthorizationResponse, PushedRequest, ResponseType, Session, Subject,
		pkce::CodeChallengeMethod,
	},
	flows::{
		Engine,
		common::{self, reject},
	},
	keys::{ClientKeySet, KeyProvider},
	obs::FlowKind,
	proof::{JarDecoder, JarmEncoder},
	store::SessionStore,
};

impl Engine {
	/// Validates an authorization request without side effects and returns the requesting client.
	pub async fn validate(&self, request: &AuthorizationRequest) -> Result<Client, Rejection> {
		if request.state.is_empty() {
			return Err(Rejection::validation(OAuthError::missing_state()));
		}

		let state = request.state.as_str();
		let invalid =
			|description: &str| reject(ErrorKind::InvalidRequest, description).with_state(state);

		for (name, value) in [
			("scope", &request.scope),
			("response_type", &request.response_type),
			("client_id", &request.client_id),
			("redirect_uri", &request.redirect_uri),
		] {
			if value.is_empty() {
				return Err(invalid(&format!("{name} is required")));
			}
		}

		if Url::parse(&request.redirect_uri).is_err() {
			return Err(invalid("redirect_uri must be an absolute URI"));
		}

		let client = self
			.load_client(&request.client_id, ErrorKind::InvalidRequest)
			.await
			.map_err(|e| e.with_state(state))?;

		common::require_grant(&client, GrantType::AuthorizationCode).map_err(|e| e.with_state(state))?;

		if !ResponseType::from_str(&request.response_type)
			.is_ok_and(|response_type| client.supports_response_type(response_type))
		{
			return Err(invalid("response_type is not allowed for this client"));
		}
		if !client.has_redirect_uri(&request.redirect_uri) {
			return Err(invalid("redirect_uri is not registered for this client"));
		}
		if request.code_challenge.is_empty() || request.code_challenge_method.is_empty() {
			return Err(invalid("code_challenge and code_challenge_method are required"));
		}
		if CodeChallengeMethod::parse(&request.code_challenge_method).is_none() {
			return Err(invalid("code_challenge_method is not supported"));
		}

		common::parse_scope(&request.scope).map_err(|e| e.with_state(state))?;

		Ok(client)
	}

	/// Issues an authorization code to `subject` for a direct or pushed request.
	pub async fn authorize(
		&self,
		request: AuthorizationRequest,
		subject: Subject,
	) -> Result<AuthorizationResponse, Rejection> {
		common::observe(FlowKind::Authorize, "authorize", async move {
			let request = if let Some(request_uri) = request.pushed_reference().map(str::to_owned) {
				self.redeem_pushed(&request.client_id, &request_uri).await?
			} else {
				request
			};
			let client = self.validate(&request).await?;
			let state = request.state.clone();
			let redirect_uri = request.redirect_uri.clone();
			let response_mode = request.response_mode.clone();
			let now = self.clock.now();
			let session = Session {
				client_id: client.client_id,
				request,
				subject,
				issued_at: now,
				expires_at: now + self.config.authorization_code_ttl,
			};
			let code = SessionStore::register(self.sessions.as_ref(), session)
				.await
				.map_err(|e| Rejection::server_error(e).with_state(&state))?;

			Ok(AuthorizationResponse {
				code,
				state,
				iss: self.config.issuer.as_str().to_owned(),
				redirect_uri,
				response_mode,
			})
		})
		.await
	}

	/// Stores a request pushed by `client_id` and returns its `request_uri`.
	pub async fn register(
		&self,
		client_id: &str,
		request: AuthorizationRequest,
	) -> Result<PushedAuthorizationResponse, Rejection> {
		common::observe(FlowKind::PushedAuthorization, "register", async move {
			common::require("client_id", client_id)?;

			let client = self.load_client(client_id, ErrorKind::InvalidRequest).await?;
			let mut request = request;

			if request.pushed_reference().is_some() {
				return Err(reject(ErrorKind::InvalidRequest, "request_uri cannot be pushed"));
			}
			if request.client_id.is_empty() {
				request.client_id = client_id.to_owned();
			} else if request.client_id != client_id {
				return Err(reject(
					ErrorKind::InvalidRequest,
					"client_id does not match the authenticated client",
				));
			}

			self.validate(&request).await?;

			let ttl = self.config.pushed_request_ttl;
			let now = self.clock.now();
			let pushed = PushedRequest {
				client_id: client.client_id,
				request,
				issued_at: now,
				expires_at: now + ttl,
			};
			let request_uri = self.sessions.push(pushed).await.map_err(Rejection::server_error)?;

			Ok(PushedAuthorizationResponse { request_uri, expires_in: ttl.whole_seconds() })
		})
		.await
	}

	/// Returns a request-object decoder resolving key sets from the client registry.
	pub fn jar_decoder(&self) -> JarDecoder {
		JarDecoder::new(Arc::new(ClientKeySet::new(self.clients.clone())), self.clock.clone())
	}

	/// Returns a JARM encoder signing with `keys` as this issuer.
	pub fn jarm_encoder(&self, keys: Arc<dyn KeyProvider>) -> JarmEncoder {
		JarmEncoder::new(keys, self.clock.clone(), self.config.issuer.as_str(), self.config.jarm_ttl)
	}

	// Loads, binds, and consumes a pushed request. The reference is burned even when it turns
	// out to be expired.
	async fn redeem_pushed(
		&self,
		client_id: &str,
		request_uri: &str,
	) -> Result<AuthorizationRequest, Rejection> {
		common::require("client_id", client_id)?;

		let unknown = || {
			Rejection::new(
				OAuthError::invalid_request("request_uri is unknown or expired"),
				Error::NotFound { entity: "pushed request" },
			)
		};
		let pushed = self
			.sessions
			.get_pushed(request_uri)
			.await
			.map_err(Rejection::server_error)?
			.ok_or_else(unknown)?;

		if pushed.client_id.as_ref() != client_id {
			return Err(reject(ErrorKind::InvalidRequest, "request_uri was pushed by another client"));
		}
		if !self.sessions.delete_pushed(request_uri).await.map_err(Rejection::server_error)? {
			return Err(unknown());
		}
		if pushed.is_expired_at(self.clock.now()) {
			return Err(unknown());
		}

		Ok(pushed.request)
	}
}

impl From<&AuthorizationResponse> for AuthorizationCodeResponse {
	fn from(response: &AuthorizationResponse) -> Self {
		AuthorizationCodeResponse::Success {
			code: response.code.clone(),
			state: response.state.clone(),
		}
	}
}
