//! Optional observability helpers for engine operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `oauth2_engine.flow` with the `flow`
//!   (operation) and `stage` (call site) fields, plus a debug event for every rejection.
//! - Enable `metrics` to increment the `oauth2_engine_flow_total` counter for every
//!   attempt/success/failure, labeled by `flow` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Engine operations observed by spans and counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Front-channel authorization request.
	Authorize,
	/// Pushed authorization request registration.
	PushedAuthorization,
	/// Device authorization request.
	DeviceAuthorization,
	/// End-user confirmation of a device user code.
	UserCodeValidation,
	/// `authorization_code` grant.
	AuthorizationCode,
	/// `client_credentials` grant.
	ClientCredentials,
	/// `device_code` grant.
	DeviceCode,
	/// `refresh_token` grant.
	RefreshToken,
	/// Token exchange grant.
	TokenExchange,
	/// Token introspection.
	Introspection,
	/// Token revocation.
	Revocation,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::Authorize => "authorize",
			FlowKind::PushedAuthorization => "pushed_authorization",
			FlowKind::DeviceAuthorization => "device_authorization",
			FlowKind::UserCodeValidation => "user_code_validation",
			FlowKind::AuthorizationCode => "authorization_code",
			FlowKind::ClientCredentials => "client_credentials",
			FlowKind::DeviceCode => "device_code",
			FlowKind::RefreshToken => "refresh_token",
			FlowKind::TokenExchange => "token_exchange",
			FlowKind::Introspection => "introspection",
			FlowKind::Revocation => "revocation",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to an engine operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
