//! Single-use `jti` tracking shared by DPoP proofs and client assertions.

// self
use crate::{
	_prelude::*,
	store::{StoreError, StoreFuture},
};

/// Remembers proof identifiers until they expire.
pub trait ReplayCache
where
	Self: Send + Sync,
{
	/// Records `jti`; returns `false` if it was already recorded and has not yet expired.
	///
	/// Must be atomic: of two concurrent calls with the same `jti` exactly one returns `true`.
	fn insert_unique<'a>(
		&'a self,
		jti: &'a str,
		expires_at: OffsetDateTime,
		now: OffsetDateTime,
	) -> StoreFuture<'a, bool>;
}

/// In-process replay cache; expired entries are pruned on insert.
#[derive(Clone, Debug, Default)]
pub struct MemoryReplayCache(Arc<Mutex<HashMap<String, OffsetDateTime>>>);
impl MemoryReplayCache {
	fn insert_unique_now(
		&self,
		jti: &str,
		expires_at: OffsetDateTime,
		now: OffsetDateTime,
	) -> Result<bool, StoreError> {
		let mut seen = self.0.lock();

		seen.retain(|_, expiry| *expiry > now);

		if seen.contains_key(jti) {
			return Ok(false);
		}

		seen.insert(jti.to_owned(), expires_at);

		Ok(true)
	}
}
impl ReplayCache for MemoryReplayCache {
	fn insert_unique<'a>(
		&'a self,
		jti: &'a str,
		expires_at: OffsetDateTime,
		now: OffsetDateTime,
	) -> StoreFuture<'a, bool> {
		Box::pin(async move { self.insert_unique_now(jti, expires_at, now) })
	}
}
