//! Engine tunables and the validating builder that produces them.

// self
use crate::{_prelude::*, error::ConfigError};

/// Encoding used for access-token values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessTokenFormat {
	#[default]
	/// Random opaque strings; only the token store can resolve them.
	Opaque,
	/// Signed `at+jwt` values (RFC 9068) minted with the engine's key provider.
	Jwt,
}

/// Validated engine configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
	/// Authorization-server issuer identifier.
	pub issuer: Url,
	/// Access-token lifetime.
	pub access_token_ttl: Duration,
	/// Refresh-token lifetime.
	pub refresh_token_ttl: Duration,
	/// Lifetime of tokens minted by the token-exchange grant.
	pub exchanged_token_ttl: Duration,
	/// Authorization-code lifetime.
	pub authorization_code_ttl: Duration,
	/// Lifetime of pushed authorization request URIs.
	pub pushed_request_ttl: Duration,
	/// Device-code lifetime.
	pub device_code_ttl: Duration,
	/// Minimum polling interval advertised to device clients.
	pub device_poll_interval: Duration,
	/// Optional end-user verification page for the device flow.
	pub device_verification_uri: Option<Url>,
	/// Maximum accepted DPoP proof age.
	pub dpop_max_age: Duration,
	/// Tolerated clock skew for proofs issued in the future.
	pub dpop_clock_skew: Duration,
	/// Lifetime of JWT-secured authorization responses.
	pub jarm_ttl: Duration,
	/// Encoding used for access-token values.
	pub access_token_format: AccessTokenFormat,
}
impl EngineConfig {
	/// Returns a builder seeded with the default lifetimes.
	pub fn builder(issuer: Url) -> EngineConfigBuilder {
		EngineConfigBuilder::new(issuer)
	}

	fn validate(&self, allow_insecure_issuer: bool) -> Result<(), ConfigError> {
		if self.issuer.scheme() != "https" && !allow_insecure_issuer {
			return Err(ConfigError::InsecureIssuer { url: self.issuer.to_string() });
		}

		for (field, value) in [
			("access_token_ttl", self.access_token_ttl),
			("refresh_token_ttl", self.refresh_token_ttl),
			("exchanged_token_ttl", self.exchanged_token_ttl),
			("authorization_code_ttl", self.authorization_code_ttl),
			("pushed_request_ttl", self.pushed_request_ttl),
			("device_code_ttl", self.device_code_ttl),
			("device_poll_interval", self.device_poll_interval),
			("dpop_max_age", self.dpop_max_age),
			("jarm_ttl", self.jarm_ttl),
		] {
			if !value.is_positive() {
				return Err(ConfigError::NonPositiveDuration { field });
			}
		}

		if self.dpop_clock_skew.is_negative() {
			return Err(ConfigError::NonPositiveDuration { field: "dpop_clock_skew" });
		}

		Ok(())
	}
}

/// Builder for [`EngineConfig`].
#[derive(Clone, Debug)]
pub struct EngineConfigBuilder {
	config: EngineConfig,
	allow_insecure_issuer: bool,
}
impl EngineConfigBuilder {
	const ACCESS_TOKEN_TTL: Duration = Duration::hours(1);
	const AUTHORIZATION_CODE_TTL: Duration = Duration::minutes(10);
	const DEVICE_CODE_TTL: Duration = Duration::minutes(10);
	const DEVICE_POLL_INTERVAL: Duration = Duration::seconds(5);
	const DPOP_CLOCK_SKEW: Duration = Duration::seconds(5);
	const DPOP_MAX_AGE: Duration = Duration::seconds(60);
	const EXCHANGED_TOKEN_TTL: Duration = Duration::minutes(1);
	const JARM_TTL: Duration = Duration::minutes(5);
	const PUSHED_REQUEST_TTL: Duration = Duration::seconds(60);
	const REFRESH_TOKEN_TTL: Duration = Duration::days(7);

	/// Creates a builder with default lifetimes for the provided issuer.
	pub fn new(issuer: Url) -> Self {
		Self {
			config: EngineConfig {
				issuer,
				access_token_ttl: Self::ACCESS_TOKEN_TTL,
				refresh_token_ttl: Self::REFRESH_TOKEN_TTL,
				exchanged_token_ttl: Self::EXCHANGED_TOKEN_TTL,
				authorization_code_ttl: Self::AUTHORIZATION_CODE_TTL,
				pushed_request_ttl: Self::PUSHED_REQUEST_TTL,
				device_code_ttl: Self::DEVICE_CODE_TTL,
				device_poll_interval: Self::DEVICE_POLL_INTERVAL,
				device_verification_uri: None,
				dpop_max_age: Self::DPOP_MAX_AGE,
				dpop_clock_skew: Self::DPOP_CLOCK_SKEW,
				jarm_ttl: Self::JARM_TTL,
				access_token_format: AccessTokenFormat::default(),
			},
			allow_insecure_issuer: false,
		}
	}

	/// Overrides the access-token lifetime.
	pub fn access_token_ttl(mut self, ttl: Duration) -> Self {
		self.config.access_token_ttl = ttl;

		self
	}

	/// Overrides the refresh-token lifetime.
	pub fn refresh_token_ttl(mut self, ttl: Duration) -> Self {
		self.config.refresh_token_ttl = ttl;

		self
	}

	/// Overrides the token-exchange lifetime.
	pub fn exchanged_token_ttl(mut self, ttl: Duration) -> Self {
		self.config.exchanged_token_ttl = ttl;

		self
	}

	/// Overrides the authorization-code lifetime.
	pub fn authorization_code_ttl(mut self, ttl: Duration) -> Self {
		self.config.authorization_code_ttl = ttl;

		self
	}

	/// Overrides the pushed-request lifetime.
	pub fn pushed_request_ttl(mut self, ttl: Duration) -> Self {
		self.config.pushed_request_ttl = ttl;

		self
	}

	/// Overrides the device-code lifetime.
	pub fn device_code_ttl(mut self, ttl: Duration) -> Self {
		self.config.device_code_ttl = ttl;

		self
	}

	/// Overrides the device polling interval.
	pub fn device_poll_interval(mut self, interval: Duration) -> Self {
		self.config.device_poll_interval = interval;

		self
	}

	/// Sets the end-user verification page advertised by the device flow.
	pub fn device_verification_uri(mut self, uri: Url) -> Self {
		self.config.device_verification_uri = Some(uri);

		self
	}

	/// Overrides the DPoP proof age limit and clock-skew allowance.
	pub fn dpop_window(mut self, max_age: Duration, clock_skew: Duration) -> Self {
		self.config.dpop_max_age = max_age;
		self.config.dpop_clock_skew = clock_skew;

		self
	}

	/// Overrides the JARM response lifetime.
	pub fn jarm_ttl(mut self, ttl: Duration) -> Self {
		self.config.jarm_ttl = ttl;

		self
	}

	/// Selects the access-token encoding.
	pub fn access_token_format(mut self, format: AccessTokenFormat) -> Self {
		self.config.access_token_format = format;

		self
	}

	/// Permits a non-https issuer (local development only).
	pub fn allow_insecure_issuer(mut self) -> Self {
		self.allow_insecure_issuer = true;

		self
	}

	/// Validates and returns the configuration.
	pub fn build(self) -> Result<EngineConfig, ConfigError> {
		self.config.validate(self.allow_insecure_issuer)?;

		Ok(self.config)
	}
}
