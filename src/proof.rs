//! Cryptographic pre-validation codecs: DPoP proofs, signed authorization requests (JAR),
//! signed authorization responses (JARM), and `private_key_jwt` client assertions.
//!
//! Each codec has its own error type exposing the wire [`ErrorKind`] it maps to, and converts
//! into a [`Rejection`] so transport code can treat codec failures like any other service
//! failure.

pub mod assertion;
pub mod dpop;
pub mod jar;
pub mod jarm;
pub mod replay;

pub use assertion::*;
pub use dpop::*;
pub use jar::*;
pub use jarm::*;
pub use replay::*;

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::de::DeserializeOwned;
// self
use crate::_prelude::*;

/// Compact JWT that could not be split or decoded.
#[derive(Debug, ThisError)]
pub enum MalformedJwt {
	/// Not three dot-separated segments.
	#[error("Token is not a compact JWS.")]
	Segments,
	/// A segment is not base64url.
	#[error("Token segment is not base64url.")]
	Encoding(#[from] base64::DecodeError),
	/// A segment is not the expected JSON.
	#[error("Token segment is not valid JSON.")]
	Json(#[from] serde_json::Error),
}

/// JWT `aud` claim: a single string or an array of strings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
	/// Single audience.
	One(String),
	/// Several audiences.
	Many(Vec<String>),
}
impl Audience {
	/// Returns true if `value` is one of the audiences.
	pub fn contains(&self, value: &str) -> bool {
		match self {
			Audience::One(aud) => aud == value,
			Audience::Many(auds) => auds.iter().any(|aud| aud == value),
		}
	}

	/// Returns true if no non-empty audience is present.
	pub fn is_empty(&self) -> bool {
		match self {
			Audience::One(aud) => aud.is_empty(),
			Audience::Many(auds) => auds.iter().all(String::is_empty),
		}
	}
}

/// Decodes the payload of a compact JWS without verifying its signature.
///
/// Only for routing decisions (which client, which key set) that precede verification.
pub(crate) fn decode_claims_unverified<T>(token: &str) -> Result<T, MalformedJwt>
where
	T: DeserializeOwned,
{
	let mut segments = token.split('.');
	let (Some(_), Some(payload), Some(_), None) =
		(segments.next(), segments.next(), segments.next(), segments.next())
	else {
		return Err(MalformedJwt::Segments);
	};
	let bytes = URL_SAFE_NO_PAD.decode(payload)?;

	Ok(serde_json::from_slice(&bytes)?)
}

// Codec failures share one description per codec; the diagnostic cause carries the detail.
pub(crate) fn codec_rejection(
	kind: ErrorKind,
	description: &'static str,
	cause: impl Into<Error>,
) -> Rejection {
	let oauth = match kind {
		ErrorKind::ServerError => OAuthError::server_error(),
		kind => OAuthError::new(kind).with_description(description),
	};

	Rejection::new(oauth, cause)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn unverified_decode_rejects_non_jws_shapes() {
		assert!(matches!(
			decode_claims_unverified::<serde_json::Value>("a.b"),
			Err(MalformedJwt::Segments)
		));
		assert!(matches!(
			decode_claims_unverified::<serde_json::Value>("a.b.c.d"),
			Err(MalformedJwt::Segments)
		));
		assert!(matches!(
			decode_claims_unverified::<serde_json::Value>("e30.!!!.sig"),
			Err(MalformedJwt::Encoding(_))
		));

		let claims: serde_json::Value = decode_claims_unverified(&format!(
			"e30.{}.sig",
			URL_SAFE_NO_PAD.encode(r#"{"iss":"s6BhdRkqt3"}"#)
		))
		.expect("Well-formed payload should decode.");

		assert_eq!(claims["iss"], "s6BhdRkqt3");
	}

	#[test]
	fn audience_accepts_string_or_array() {
		let one: Audience = serde_json::from_str(r#""https://as.example.com/token""#)
			.expect("String audience should decode.");
		let many: Audience = serde_json::from_str(r#"["a", "https://as.example.com/token"]"#)
			.expect("Array audience should decode.");

		assert!(one.contains("https://as.example.com/token"));
		assert!(many.contains("https://as.example.com/token"));
		assert!(!many.contains("b"));
		assert!(Audience::Many(Vec::new()).is_empty());
	}
}
