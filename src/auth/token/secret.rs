//! Redacting wrapper for token values, codes, and other bearer secrets.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
// self
use crate::_prelude::*;

const SECRET_BYTES: usize = 32;

/// Returns a fresh base64url-encoded random value with 256 bits of entropy.
pub fn random_secret() -> String {
	let mut bytes = [0_u8; SECRET_BYTES];

	rand::rng().fill_bytes(&mut bytes);

	URL_SAFE_NO_PAD.encode(bytes)
}

/// Bearer secret whose `Debug`/`Display` never reveal the value.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Generates a random secret value.
	pub fn generate() -> Self {
		Self(random_secret())
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl AsRef<str> for TokenSecret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl From<String> for TokenSecret {
	fn from(value: String) -> Self {
		Self(value)
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenSecret").field(&"<redacted>").finish()
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}
