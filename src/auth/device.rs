//! Device authorization sessions (RFC 8628) and their status machine.

// self
use crate::{
	_prelude::*,
	auth::{ClientId, ScopeSet, Subject, TransitionError},
};

/// Authorization status of a device-code session.
///
/// Transitions only move forward: `AuthorizationPending → Validated`,
/// `AuthorizationPending → Expired`, or `Validated → Expired`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeviceCodeStatus {
	/// Waiting for the end-user to enter the user code.
	AuthorizationPending,
	/// Confirmed by the end-user.
	Validated {
		/// End-user who confirmed the code.
		subject: Subject,
	},
	/// Expired, consumed, or otherwise unusable.
	Expired,
}
impl DeviceCodeStatus {
	/// Stable label for diagnostics.
	pub const fn as_str(&self) -> &'static str {
		match self {
			DeviceCodeStatus::AuthorizationPending => "authorization_pending",
			DeviceCodeStatus::Validated { .. } => "validated",
			DeviceCodeStatus::Expired => "expired",
		}
	}

	/// Applies a transition, rejecting anything that is not forward progress.
	pub fn transition(&self, next: DeviceCodeStatus) -> Result<DeviceCodeStatus, TransitionError> {
		match (self, &next) {
			(DeviceCodeStatus::AuthorizationPending, DeviceCodeStatus::Validated { .. })
			| (DeviceCodeStatus::AuthorizationPending, DeviceCodeStatus::Expired)
			| (DeviceCodeStatus::Validated { .. }, DeviceCodeStatus::Expired) => Ok(next),
			_ => Err(TransitionError { entity: "device code", from: self.as_str(), to: next.as_str() }),
		}
	}
}

/// Device-code session created at device authorization time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceCodeSession {
	/// Requesting client.
	pub client_id: ClientId,
	/// Requested scope.
	pub scope: ScopeSet,
	/// Requested audience.
	pub audience: Option<String>,
	/// Current status.
	pub status: DeviceCodeStatus,
	/// Issue instant.
	pub issued_at: OffsetDateTime,
	/// Expiry instant.
	pub expires_at: OffsetDateTime,
}
impl DeviceCodeSession {
	/// Returns true once the device code lifetime has elapsed.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at
	}
}

/// Codes allocated by the device session store.
#[derive(Clone, PartialEq, Eq)]
pub struct DeviceCodes {
	/// High-entropy polling secret; never shown to the user.
	pub device_code: String,
	/// Short code typed by the user.
	pub user_code: String,
}
impl Debug for DeviceCodes {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("DeviceCodes")
			.field("device_code", &"<redacted>")
			.field("user_code", &self.user_code)
			.finish()
	}
}

/// Device authorization request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceAuthorizationRequest {
	/// Client identifier.
	pub client_id: String,
	/// Space-delimited scope.
	pub scope: String,
	/// Requested audience.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub audience: Option<String>,
}

/// Device authorization response (RFC 8628 §3.2).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceAuthorizationResponse {
	/// Polling secret.
	pub device_code: String,
	/// Code the user types.
	pub user_code: String,
	/// Page where the user enters the code.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub verification_uri: Option<String>,
	/// Verification page with the user code pre-filled.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub verification_uri_complete: Option<String>,
	/// Seconds until the codes expire.
	pub expires_in: i64,
	/// Minimum seconds between polls.
	pub interval: i64,
}

/// Result of a successful user-code confirmation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCodeValidation {
	/// Client that started the flow.
	pub client_id: ClientId,
	/// Scope the user approved.
	pub scope: ScopeSet,
	/// Subject now bound to the session.
	pub subject: Subject,
}
