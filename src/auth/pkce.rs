//! PKCE (RFC 7636) challenge verification.

// crates.io
use oauth2::{PkceCodeChallenge, PkceCodeVerifier};
// self
use crate::_prelude::*;

/// Minimum `code_verifier` length.
pub const VERIFIER_MIN_LEN: usize = 43;
/// Maximum `code_verifier` length.
pub const VERIFIER_MAX_LEN: usize = 128;

/// Supported PKCE challenge methods.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CodeChallengeMethod {
	/// SHA-256 based PKCE (RFC 7636 S256).
	S256,
}
impl CodeChallengeMethod {
	/// Returns the RFC 7636 identifier for the challenge method.
	pub const fn as_str(self) -> &'static str {
		match self {
			CodeChallengeMethod::S256 => "S256",
		}
	}

	/// Parses a method name; `plain` and unknown values are unsupported.
	pub fn parse(value: &str) -> Option<Self> {
		match value {
			"S256" => Some(CodeChallengeMethod::S256),
			_ => None,
		}
	}
}

/// PKCE verification failures.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum PkceError {
	/// Verifier length is outside 43..=128.
	#[error("The code_verifier must be between 43 and 128 characters.")]
	VerifierLength,
	/// Verifier contains characters outside the unreserved set.
	#[error("The code_verifier contains invalid characters.")]
	VerifierCharset,
	/// Stored challenge method is not supported.
	#[error("Unsupported code_challenge_method: {method}.")]
	UnsupportedMethod {
		/// Rejected method.
		method: String,
	},
	/// Recomputed challenge does not match.
	#[error("The code_verifier does not match the code_challenge.")]
	Mismatch,
}

/// Checks the verifier's length and character set.
pub fn validate_verifier(verifier: &str) -> Result<(), PkceError> {
	if !(VERIFIER_MIN_LEN..=VERIFIER_MAX_LEN).contains(&verifier.len()) {
		return Err(PkceError::VerifierLength);
	}
	if !verifier.bytes().all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~'))
	{
		return Err(PkceError::VerifierCharset);
	}

	Ok(())
}

/// Derives the S256 challenge, `base64url(sha256(verifier))`.
pub fn s256_challenge(verifier: &str) -> String {
	let verifier = PkceCodeVerifier::new(verifier.to_owned());

	PkceCodeChallenge::from_code_verifier_sha256(&verifier).as_str().to_owned()
}

/// Verifies a `code_verifier` against the stored challenge and method.
pub fn verify(verifier: &str, challenge: &str, method: &str) -> Result<(), PkceError> {
	validate_verifier(verifier)?;

	let computed = match CodeChallengeMethod::parse(method) {
		Some(CodeChallengeMethod::S256) => s256_challenge(verifier),
		None => return Err(PkceError::UnsupportedMethod { method: method.to_owned() }),
	};

	if computed == challenge { Ok(()) } else { Err(PkceError::Mismatch) }
}
