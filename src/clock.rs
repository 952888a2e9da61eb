//! Injected time source.

// self
use crate::_prelude::*;

/// Source of the current instant, injected into every component that checks lifetimes.
pub trait Clock
where
	Self: Send + Sync,
{
	/// Current UTC instant.
	fn now(&self) -> OffsetDateTime;
}

/// Wall clock backed by the system time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;
impl Clock for SystemClock {
	fn now(&self) -> OffsetDateTime {
		OffsetDateTime::now_utc()
	}
}

/// Manually driven clock for tests and simulations.
#[derive(Debug)]
pub struct ManualClock(Mutex<OffsetDateTime>);
impl ManualClock {
	/// Creates a clock frozen at the provided instant.
	pub fn new(instant: OffsetDateTime) -> Self {
		Self(Mutex::new(instant))
	}

	/// Moves the clock forward (or backward, for negative durations).
	pub fn advance(&self, delta: Duration) {
		*self.0.lock() += delta;
	}

	/// Jumps to an absolute instant.
	pub fn set(&self, instant: OffsetDateTime) {
		*self.0.lock() = instant;
	}
}
impl Clock for ManualClock {
	fn now(&self) -> OffsetDateTime {
		*self.0.lock()
	}
}
