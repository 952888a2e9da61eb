//! Engine services: authorization, device authorization, token issuance, introspection and
//! revocation.

pub mod authorize;
pub mod device;
pub mod introspect;
pub mod token;

mod common;
mod mint;

pub use introspect::*;
pub use mint::ACCESS_TOKEN_JWT_TYPE;
pub use token::*;

// self
use crate::{
	_prelude::*,
	clock::{Clock, SystemClock},
	config::{AccessTokenFormat, EngineConfig},
	error::ConfigError,
	keys::KeyProvider,
	store::{ClientRegistry, DeviceSessionStore, ResourceRegistry, SessionStore, TokenStore},
};

/// Capability handles the engine reads and writes through.
#[derive(Clone)]
pub struct EngineStores {
	/// Registered clients.
	pub clients: Arc<dyn ClientRegistry>,
	/// Authorization-code sessions and pushed requests.
	pub sessions: Arc<dyn SessionStore>,
	/// Device-code sessions.
	pub devices: Arc<dyn DeviceSessionStore>,
	/// Issued tokens.
	pub tokens: Arc<dyn TokenStore>,
	/// Token-exchange audiences.
	pub resources: Arc<dyn ResourceRegistry>,
}
impl EngineStores {
	/// Uses one backend for every capability.
	pub fn shared<S>(store: Arc<S>) -> Self
	where
		S: 'static
			+ ClientRegistry
			+ SessionStore
			+ DeviceSessionStore
			+ TokenStore
			+ ResourceRegistry,
	{
		Self {
			clients: store.clone(),
			sessions: store.clone(),
			devices: store.clone(),
			tokens: store.clone(),
			resources: store,
		}
	}
}
impl Debug for EngineStores {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("EngineStores(..)")
	}
}

/// Authorization-server protocol engine.
///
/// The engine owns no protocol state of its own: sessions, device codes, and tokens live in the
/// stores it was built with, and time comes from the injected [`Clock`]. Every service method
/// returns `Result<_, Rejection>`; the rejection's wire half is safe to serialize and its cause is
/// for logs only.
#[derive(Clone)]
pub struct Engine {
	/// Validated tunables.
	pub config: Arc<EngineConfig>,
	/// Registered clients.
	pub clients: Arc<dyn ClientRegistry>,
	/// Authorization-code sessions and pushed requests.
	pub sessions: Arc<dyn SessionStore>,
	/// Device-code sessions.
	pub devices: Arc<dyn DeviceSessionStore>,
	/// Issued tokens.
	pub tokens: Arc<dyn TokenStore>,
	/// Token-exchange audiences.
	pub resources: Arc<dyn ResourceRegistry>,
	/// Time source for every expiry decision.
	pub clock: Arc<dyn Clock>,
	/// Signing key for JWT access tokens.
	pub keys: Option<Arc<dyn KeyProvider>>,
	refresh_guards: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}
impl Engine {
	/// Creates an engine over `stores` using the system clock and opaque access tokens.
	pub fn new(config: EngineConfig, stores: EngineStores) -> Self {
		Self {
			config: Arc::new(config),
			clients: stores.clients,
			sessions: stores.sessions,
			devices: stores.devices,
			tokens: stores.tokens,
			resources: stores.resources,
			clock: Arc::new(SystemClock),
			keys: None,
			refresh_guards: Default::default(),
		}
	}

	/// Replaces the time source.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Sets the key provider used to sign JWT access tokens.
	pub fn with_key_provider(mut self, keys: Arc<dyn KeyProvider>) -> Self {
		self.keys = Some(keys);

		self
	}

	/// Confirms the configuration can be served with the attached capabilities.
	pub fn check(&self) -> Result<(), ConfigError> {
		if self.config.access_token_format == AccessTokenFormat::Jwt && self.keys.is_none() {
			return Err(ConfigError::MissingKeyProvider);
		}

		Ok(())
	}
}
impl Debug for Engine {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Engine")
			.field("issuer", &self.config.issuer.as_str())
			.field("access_token_format", &self.config.access_token_format)
			.field("keys_set", &self.keys.is_some())
			.finish()
	}
}
