//! Deterministic P-256 key fixtures for unit tests.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::jwk::{Jwk, JwkSet};
use p256::{
	SecretKey,
	elliptic_curve::sec1::ToEncodedPoint,
	pkcs8::{EncodePrivateKey, LineEnding},
};
use serde_json::{Value, json};
// self
use crate::keys::SigningKey;

pub(crate) struct TestKey {
	pub(crate) kid: String,
	pub(crate) pem: String,
	pub(crate) x: String,
	pub(crate) y: String,
}
impl TestKey {
	pub(crate) fn public_jwk_value(&self) -> Value {
		json!({
			"kty": "EC",
			"crv": "P-256",
			"x": self.x,
			"y": self.y,
			"kid": self.kid,
			"alg": "ES256",
		})
	}

	pub(crate) fn public_jwk(&self) -> Jwk {
		serde_json::from_value(self.public_jwk_value()).expect("Fixture JWK should deserialize.")
	}

	pub(crate) fn signing_key(&self) -> SigningKey {
		SigningKey::es256_from_pem(self.pem.as_bytes())
			.expect("Fixture PEM should load as an ES256 key.")
			.with_kid(self.kid.clone())
	}
}

/// Builds a key whose scalar is `[seed; 32]`.
pub(crate) fn key(seed: u8, kid: &str) -> TestKey {
	let secret = SecretKey::from_slice(&[seed; 32]).expect("Seeded scalar should be valid.");
	let pem = secret.to_pkcs8_pem(LineEnding::LF).expect("Fixture key should encode as PEM.");
	let point = secret.public_key().to_encoded_point(false);
	let x = point.x().expect("Uncompressed point should carry x.");
	let y = point.y().expect("Uncompressed point should carry y.");

	TestKey {
		kid: kid.to_owned(),
		pem: pem.as_str().to_owned(),
		x: URL_SAFE_NO_PAD.encode(x),
		y: URL_SAFE_NO_PAD.encode(y),
	}
}

pub(crate) fn key_set(keys: &[&TestKey]) -> JwkSet {
	serde_json::from_str(&key_set_document(keys)).expect("Fixture key set should deserialize.")
}

pub(crate) fn key_set_document(keys: &[&TestKey]) -> String {
	json!({ "keys": keys.iter().map(|key| key.public_jwk_value()).collect::<Vec<_>>() })
		.to_string()
}
