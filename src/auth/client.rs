//! Registered client records and their declared capabilities.

// self
use crate::{
	_prelude::*,
	auth::{ClientId, ScopeSet},
};

/// OAuth 2.0 grant types handled by the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GrantType {
	/// Authorization Code grant (PKCE required).
	#[serde(rename = "authorization_code")]
	AuthorizationCode,
	/// Client Credentials grant.
	#[serde(rename = "client_credentials")]
	ClientCredentials,
	/// Device Authorization grant (RFC 8628).
	#[serde(rename = "urn:ietf:params:oauth:grant-type:device_code")]
	DeviceCode,
	/// Refresh Token grant.
	#[serde(rename = "refresh_token")]
	RefreshToken,
	/// Token Exchange grant (RFC 8693).
	#[serde(rename = "urn:ietf:params:oauth:grant-type:token-exchange")]
	TokenExchange,
}
impl GrantType {
	/// Returns the wire identifier for the grant type.
	pub const fn as_str(self) -> &'static str {
		match self {
			GrantType::AuthorizationCode => "authorization_code",
			GrantType::ClientCredentials => "client_credentials",
			GrantType::DeviceCode => "urn:ietf:params:oauth:grant-type:device_code",
			GrantType::RefreshToken => "refresh_token",
			GrantType::TokenExchange => "urn:ietf:params:oauth:grant-type:token-exchange",
		}
	}
}
impl Display for GrantType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for GrantType {
	type Err = UnknownValue;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		[
			GrantType::AuthorizationCode,
			GrantType::ClientCredentials,
			GrantType::DeviceCode,
			GrantType::RefreshToken,
			GrantType::TokenExchange,
		]
		.into_iter()
		.find(|grant| grant.as_str() == s)
		.ok_or_else(|| UnknownValue { kind: "grant_type", value: s.to_owned() })
	}
}

/// Authorization-endpoint response types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
	/// Authorization code.
	Code,
}
impl ResponseType {
	/// Returns the wire identifier for the response type.
	pub const fn as_str(self) -> &'static str {
		match self {
			ResponseType::Code => "code",
		}
	}
}
impl FromStr for ResponseType {
	type Err = UnknownValue;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"code" => Ok(ResponseType::Code),
			_ => Err(UnknownValue { kind: "response_type", value: s.to_owned() }),
		}
	}
}

/// Token-endpoint client authentication methods.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
	#[default]
	/// HTTP Basic with `client_id`/`client_secret`.
	ClientSecretBasic,
	/// Form POST body parameters for `client_id`/`client_secret`.
	ClientSecretPost,
	/// Signed JWT assertion verified against the client's JWK set (RFC 7523).
	PrivateKeyJwt,
	/// Public client; possession is proven via PKCE.
	None,
}

/// Raised when a wire identifier does not name a known enum value.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Unknown {kind}: {value}.")]
pub struct UnknownValue {
	/// Parameter name.
	pub kind: &'static str,
	/// Rejected value.
	pub value: String,
}

/// Client identity record owned by the client registry; read-only to the engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
	/// Client identifier.
	pub client_id: ClientId,
	/// Grants the client may use.
	pub grant_types: Vec<GrantType>,
	/// Response types the client may request.
	pub response_types: Vec<ResponseType>,
	/// Registered redirect URIs, compared by exact string match.
	pub redirect_uris: Vec<String>,
	/// Token-endpoint authentication method.
	pub token_endpoint_auth_method: ClientAuthMethod,
	/// Raw JWK set document used to verify assertions and request objects.
	pub jwks: Option<String>,
}
impl Client {
	/// Creates a client with no capabilities.
	pub fn new(client_id: ClientId) -> Self {
		Self {
			client_id,
			grant_types: Vec::new(),
			response_types: Vec::new(),
			redirect_uris: Vec::new(),
			token_endpoint_auth_method: ClientAuthMethod::default(),
			jwks: None,
		}
	}

	/// Adds grant capabilities.
	pub fn with_grants<I>(mut self, grants: I) -> Self
	where
		I: IntoIterator<Item = GrantType>,
	{
		self.grant_types.extend(grants);

		self
	}

	/// Adds a response type.
	pub fn with_response_type(mut self, response_type: ResponseType) -> Self {
		self.response_types.push(response_type);

		self
	}

	/// Registers a redirect URI.
	pub fn with_redirect_uri(mut self, uri: impl Into<String>) -> Self {
		self.redirect_uris.push(uri.into());

		self
	}

	/// Sets the token-endpoint authentication method.
	pub fn with_auth_method(mut self, method: ClientAuthMethod) -> Self {
		self.token_endpoint_auth_method = method;

		self
	}

	/// Attaches a JWK set document.
	pub fn with_jwks(mut self, jwks: impl Into<String>) -> Self {
		self.jwks = Some(jwks.into());

		self
	}

	/// Returns true if the client may use the grant.
	pub fn supports_grant(&self, grant: GrantType) -> bool {
		self.grant_types.contains(&grant)
	}

	/// Returns true if the client may request the response type.
	pub fn supports_response_type(&self, response_type: ResponseType) -> bool {
		self.response_types.contains(&response_type)
	}

	/// Returns true if the URI is registered verbatim.
	pub fn has_redirect_uri(&self, uri: &str) -> bool {
		self.redirect_uris.iter().any(|registered| registered == uri)
	}
}

/// Protected resource that token exchange may target as an `audience`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
	/// Resource identifier (absolute URI).
	pub uri: String,
	/// Scopes the resource accepts; empty means unrestricted.
	#[serde(default)]
	pub scope: ScopeSet,
}
impl Resource {
	/// Creates an unrestricted resource.
	pub fn new(uri: impl Into<String>) -> Self {
		Self { uri: uri.into(), scope: ScopeSet::default() }
	}

	/// Restricts the scopes that may be exchanged for this resource.
	pub fn with_scope(mut self, scope: ScopeSet) -> Self {
		self.scope = scope;

		self
	}

	/// Returns true if the resource accepts every requested scope.
	pub fn accepts(&self, requested: &ScopeSet) -> bool {
		self.scope.is_empty() || requested.is_subset_of(&self.scope)
	}
}
