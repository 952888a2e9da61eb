//! Capability contracts for the registries and stores the engine is wired to.
//!
//! Every lookup reports a semantic miss as `Ok(None)`; `Err` is reserved for backend faults,
//! which the flows escalate to `server_error`. Single-use guarantees (code redemption, device
//! status changes, revocation) are the store's obligation and are expressed as operations that
//! report whether they actually took effect.

pub mod memory;

pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{
		Client, DeviceCodeSession, DeviceCodeStatus, DeviceCodes, PushedRequest, Resource,
		Session, Token, TokenId,
	},
};

/// Boxed future returned by every store operation.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Read-only client registry.
pub trait ClientRegistry
where
	Self: Send + Sync,
{
	/// Fetches the client registered under `client_id`.
	fn get<'a>(&'a self, client_id: &'a str) -> StoreFuture<'a, Option<Client>>;
}

/// Authorization-code sessions and pushed authorization requests.
pub trait SessionStore
where
	Self: Send + Sync,
{
	/// Stores the session and returns the newly allocated authorization code.
	fn register(&self, session: Session) -> StoreFuture<'_, String>;

	/// Fetches the session stored under `code`.
	fn get<'a>(&'a self, code: &'a str) -> StoreFuture<'a, Option<Session>>;

	/// Deletes the session; returns `false` if it was already gone.
	///
	/// Implementations must make this the single-use guard: of two concurrent deletes for the same
	/// code exactly one returns `true`.
	fn delete<'a>(&'a self, code: &'a str) -> StoreFuture<'a, bool>;

	/// Stores a pushed request and returns its `request_uri` reference.
	fn push(&self, request: PushedRequest) -> StoreFuture<'_, String>;

	/// Fetches the pushed request stored under `request_uri`.
	fn get_pushed<'a>(&'a self, request_uri: &'a str) -> StoreFuture<'a, Option<PushedRequest>>;

	/// Deletes a pushed request; returns `false` if it was already consumed.
	fn delete_pushed<'a>(&'a self, request_uri: &'a str) -> StoreFuture<'a, bool>;
}

/// Device-code sessions keyed by device code, discoverable by user code.
pub trait DeviceSessionStore
where
	Self: Send + Sync,
{
	/// Stores the session and allocates its device code and user code.
	fn register(&self, session: DeviceCodeSession) -> StoreFuture<'_, DeviceCodes>;

	/// Fetches the session stored under `device_code`.
	fn get<'a>(&'a self, device_code: &'a str) -> StoreFuture<'a, Option<DeviceCodeSession>>;

	/// Fetches the session (and its device code) by the user-facing code.
	fn get_by_user_code<'a>(
		&'a self,
		user_code: &'a str,
	) -> StoreFuture<'a, Option<StoredDeviceSession>>;

	/// Replaces the session status only if it still equals `expected`.
	fn compare_and_swap_status<'a>(
		&'a self,
		device_code: &'a str,
		expected: &'a DeviceCodeStatus,
		replacement: DeviceCodeStatus,
	) -> StoreFuture<'a, CompareAndSwapOutcome>;
}

/// Issued access and refresh tokens.
pub trait TokenStore
where
	Self: Send + Sync,
{
	/// Persists a newly minted token.
	fn create(&self, token: Token) -> StoreFuture<'_, ()>;

	/// Fetches a token by store identifier.
	fn get<'a>(&'a self, token_id: &'a TokenId) -> StoreFuture<'a, Option<Token>>;

	/// Fetches a token by the value clients present.
	fn get_by_value<'a>(&'a self, value: &'a str) -> StoreFuture<'a, Option<Token>>;

	/// Moves the token to `revoked` and returns the updated record.
	fn revoke<'a>(&'a self, token_id: &'a TokenId) -> StoreFuture<'a, Option<Token>>;

	/// Removes a token; returns `false` if it did not exist.
	fn delete<'a>(&'a self, token_id: &'a TokenId) -> StoreFuture<'a, bool>;
}

/// Registry of protected resources addressable as token-exchange audiences.
pub trait ResourceRegistry
where
	Self: Send + Sync,
{
	/// Fetches the resource identified by `uri`.
	fn get_by_uri<'a>(&'a self, uri: &'a str) -> StoreFuture<'a, Option<Resource>>;
}

/// Device session together with the device code it is stored under.
#[derive(Clone, PartialEq, Eq)]
pub struct StoredDeviceSession {
	/// Polling secret keying the session.
	pub device_code: String,
	/// Stored session.
	pub session: DeviceCodeSession,
}
impl Debug for StoredDeviceSession {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("StoredDeviceSession")
			.field("device_code", &"<redacted>")
			.field("session", &self.session)
			.finish()
	}
}

/// Result of a compare-and-swap attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareAndSwapOutcome {
	/// The current value matched and was replaced.
	Updated,
	/// The record exists but its current value did not match.
	Mismatch,
	/// No record matched the key.
	Missing,
}

/// Error type produced by store implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
