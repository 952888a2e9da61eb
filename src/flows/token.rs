//! Token endpoint: request shapes, the grant dispatcher, and the wire response.
//!
//! [`Engine::token`] checks that the caller was authenticated, loads its client record, and hands
//! the grant payload to one handler per grant type. Every handler re-checks that the client may
//! use its grant before touching any store.

mod authorization_code;
mod client_credentials;
mod device_code;
mod exchange;
mod refresh;

// self
use crate::{
	_prelude::*,
	auth::{GrantType, TokenConfirmation},
	flows::{
		Engine,
		common::{self, reject},
	},
	obs::FlowKind,
	proof::{ClientAssertionVerifier, DpopVerifier},
};

/// Grant-specific token request parameters.
///
/// Missing wire parameters decode as empty strings and are rejected by the grant handler.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "grant_type")]
pub enum Grant {
	/// `authorization_code` redemption with its PKCE verifier.
	#[serde(rename = "authorization_code")]
	AuthorizationCode {
		/// Authorization code.
		#[serde(default)]
		code: String,
		/// PKCE verifier.
		#[serde(default)]
		code_verifier: String,
		/// Redirect URI used at the authorization endpoint.
		#[serde(default)]
		redirect_uri: String,
	},
	/// `client_credentials`.
	#[serde(rename = "client_credentials")]
	ClientCredentials {
		/// Issuer the token is minted for.
		#[serde(default)]
		issuer: String,
		/// Requested scope.
		#[serde(default)]
		scope: String,
		/// Requested audience.
		#[serde(default)]
		audience: Option<String>,
	},
	/// Device-code polling.
	#[serde(rename = "urn:ietf:params:oauth:grant-type:device_code")]
	DeviceCode {
		/// Polling secret from the device authorization response.
		#[serde(default)]
		device_code: String,
	},
	/// `refresh_token`.
	#[serde(rename = "refresh_token")]
	RefreshToken {
		/// Issuer the token is minted for.
		#[serde(default)]
		issuer: String,
		/// Refresh token value.
		#[serde(default)]
		refresh_token: String,
		/// Optional narrower scope.
		#[serde(default)]
		scope: Option<String>,
	},
	/// Token exchange (RFC 8693).
	#[serde(rename = "urn:ietf:params:oauth:grant-type:token-exchange")]
	TokenExchange {
		/// Issuer the token is minted for.
		#[serde(default)]
		issuer: String,
		/// Token being exchanged.
		#[serde(default)]
		subject_token: String,
		/// Type URN of `subject_token`.
		#[serde(default)]
		subject_token_type: String,
		/// Target resource.
		#[serde(default)]
		audience: Option<String>,
		/// Optional narrower scope.
		#[serde(default)]
		scope: Option<String>,
	},
}
impl Grant {
	/// Grant type this payload belongs to.
	pub const fn grant_type(&self) -> GrantType {
		match self {
			Grant::AuthorizationCode { .. } => GrantType::AuthorizationCode,
			Grant::ClientCredentials { .. } => GrantType::ClientCredentials,
			Grant::DeviceCode { .. } => GrantType::DeviceCode,
			Grant::RefreshToken { .. } => GrantType::RefreshToken,
			Grant::TokenExchange { .. } => GrantType::TokenExchange,
		}
	}

	const fn flow_kind(&self) -> FlowKind {
		match self {
			Grant::AuthorizationCode { .. } => FlowKind::AuthorizationCode,
			Grant::ClientCredentials { .. } => FlowKind::ClientCredentials,
			Grant::DeviceCode { .. } => FlowKind::DeviceCode,
			Grant::RefreshToken { .. } => FlowKind::RefreshToken,
			Grant::TokenExchange { .. } => FlowKind::TokenExchange,
		}
	}
}
impl Debug for Grant {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Grant")
			.field("grant_type", &self.grant_type().as_str())
			.finish_non_exhaustive()
	}
}

/// Token request after client authentication (and, when present, DPoP verification).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRequest {
	/// Authenticated caller; `None` when authentication did not happen.
	pub client_id: Option<String>,
	/// Grant payload.
	#[serde(flatten)]
	pub grant: Grant,
	/// Key binding established by a verified DPoP proof.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub confirmation: Option<TokenConfirmation>,
}
impl TokenRequest {
	/// Creates a request from an authenticated `client_id`.
	pub fn new(client_id: impl Into<String>, grant: Grant) -> Self {
		Self { client_id: Some(client_id.into()), grant, confirmation: None }
	}

	/// Binds issued tokens to a verified DPoP key.
	pub fn with_confirmation(mut self, confirmation: TokenConfirmation) -> Self {
		self.confirmation = Some(confirmation);

		self
	}
}

/// Successful token response (RFC 6749 §5.1, RFC 8693 §2.2.1).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
	/// Issued access token.
	pub access_token: String,
	/// `Bearer`, or `DPoP` for key-bound tokens.
	pub token_type: String,
	/// Access-token lifetime in seconds.
	pub expires_in: i64,
	/// Issued refresh token.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub refresh_token: Option<String>,
	/// Granted scope.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub scope: Option<String>,
	/// Type URN of the issued token (token exchange only).
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub issued_token_type: Option<String>,
}
impl Debug for TokenResponse {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenResponse")
			.field("token_type", &self.token_type)
			.field("expires_in", &self.expires_in)
			.field("refresh_token_set", &self.refresh_token.is_some())
			.field("scope", &self.scope)
			.field("issued_token_type", &self.issued_token_type)
			.finish_non_exhaustive()
	}
}

impl Engine {
	/// Issues tokens for an authenticated client.
	pub async fn token(&self, request: TokenRequest) -> Result<TokenResponse, Rejection> {
		let TokenRequest { client_id, grant, confirmation } = request;

		common::observe(grant.flow_kind(), "token", async move {
			let client_id = client_id.filter(|id| !id.is_empty()).ok_or_else(|| {
				reject(ErrorKind::InvalidClient, "client authentication is required")
			})?;
			let client = self.load_client(&client_id, ErrorKind::InvalidClient).await?;

			match grant {
				Grant::AuthorizationCode { code, code_verifier, redirect_uri } =>
					self.authorization_code(&client, &code, &code_verifier, &redirect_uri, confirmation)
						.await,
				Grant::ClientCredentials { issuer, scope, audience } =>
					self.client_credentials(&client, &issuer, &scope, audience, confirmation).await,
				Grant::DeviceCode { device_code } =>
					self.device_code(&client, &device_code, confirmation).await,
				Grant::RefreshToken { issuer, refresh_token, scope } =>
					self.refresh(&client, &issuer, &refresh_token, scope.as_deref(), confirmation).await,
				Grant::TokenExchange { issuer, subject_token, subject_token_type, audience, scope } =>
					self.exchange(
						&client,
						exchange::ExchangeParams {
							issuer: &issuer,
							subject_token: &subject_token,
							subject_token_type: &subject_token_type,
							audience: audience.as_deref(),
							scope: scope.as_deref(),
						},
						confirmation,
					)
					.await,
			}
		})
		.await
	}

	/// Returns a DPoP verifier using this engine's proof window and clock.
	pub fn dpop_verifier(&self) -> DpopVerifier {
		DpopVerifier::new(&self.config, self.clock.clone())
	}

	/// Returns a `private_key_jwt` verifier over this engine's client registry.
	pub fn client_assertion_verifier(&self) -> ClientAssertionVerifier {
		ClientAssertionVerifier::new(self.clients.clone(), self.clock.clone())
	}
}
