//! DPoP proof verification (RFC 9449).

// crates.io
use jsonwebtoken::Algorithm;
// self
use crate::{
	_prelude::*,
	auth::TokenConfirmation,
	clock::Clock,
	config::EngineConfig,
	keys::{self, KeyError},
	proof::{ReplayCache, codec_rejection},
	store::StoreError,
};

/// JOSE `typ` of DPoP proofs.
pub const DPOP_JWT_TYPE: &str = "dpop+jwt";

/// DPoP proof failures.
#[derive(Debug, ThisError)]
pub enum DpopError {
	/// The proof header could not be parsed.
	#[error("DPoP proof header is malformed.")]
	Malformed(#[source] jsonwebtoken::errors::Error),
	/// `typ` is not `dpop+jwt`.
	#[error("DPoP proof has the wrong typ.")]
	WrongType,
	/// Symmetric algorithms cannot prove possession of a public key.
	#[error("DPoP proof uses a symmetric algorithm.")]
	SymmetricAlgorithm,
	/// The header carries no `jwk`.
	#[error("DPoP proof does not embed a public key.")]
	MissingKey,
	/// The signature did not verify against the embedded key.
	#[error("DPoP proof signature is invalid.")]
	Signature(#[source] KeyError),
	/// The embedded key cannot be thumbprinted.
	#[error("DPoP proof key is unsupported.")]
	Thumbprint(#[source] KeyError),
	/// A required claim is absent or empty.
	#[error("DPoP proof is missing the {claim} claim.")]
	MissingClaim {
		/// Claim name.
		claim: &'static str,
	},
	/// `htm` does not match the request method.
	#[error("DPoP proof method {actual} does not match {expected}.")]
	MethodMismatch {
		/// Request method.
		expected: String,
		/// Claimed method.
		actual: String,
	},
	/// `htu` does not match the request URL.
	#[error("DPoP proof target does not match the request URL.")]
	TargetMismatch,
	/// `htu` or the request URL is not an absolute URL.
	#[error("DPoP proof target is not a valid URL.")]
	InvalidTarget,
	/// `iat` is older than the accepted window.
	#[error("DPoP proof is too old.")]
	Stale,
	/// `iat` lies further in the future than the tolerated skew.
	#[error("DPoP proof was issued in the future.")]
	FromFuture,
	/// The proof `jti` was already seen.
	#[error("DPoP proof was replayed.")]
	Replayed,
	/// Presented proof key differs from the key the token is bound to.
	#[error("DPoP key does not match the token binding.")]
	BindingMismatch,
	/// The replay cache failed.
	#[error(transparent)]
	ReplayCache(#[from] StoreError),
}
impl DpopError {
	/// Wire error code for this failure.
	pub fn kind(&self) -> ErrorKind {
		match self {
			DpopError::ReplayCache(_) => ErrorKind::ServerError,
			_ => ErrorKind::InvalidRequest,
		}
	}
}
impl From<DpopError> for Rejection {
	fn from(e: DpopError) -> Self {
		codec_rejection(e.kind(), "Invalid DPoP proof.", e)
	}
}

#[derive(Debug, Deserialize)]
struct DpopClaims {
	#[serde(default)]
	jti: String,
	#[serde(default)]
	htm: String,
	#[serde(default)]
	htu: String,
	iat: Option<i64>,
}

/// Verifies DPoP proofs and yields the key binding they establish.
#[derive(Clone)]
pub struct DpopVerifier {
	clock: Arc<dyn Clock>,
	max_age: Duration,
	clock_skew: Duration,
	replay: Option<Arc<dyn ReplayCache>>,
}
impl DpopVerifier {
	/// Builds a verifier using the proof window from `config`.
	pub fn new(config: &EngineConfig, clock: Arc<dyn Clock>) -> Self {
		Self { clock, max_age: config.dpop_max_age, clock_skew: config.dpop_clock_skew, replay: None }
	}

	/// Rejects proofs whose `jti` was already presented.
	pub fn with_replay_cache(mut self, cache: Arc<dyn ReplayCache>) -> Self {
		self.replay = Some(cache);

		self
	}

	/// Verifies `proof` for a request to `method url` and returns the `cnf.jkt` binding.
	pub async fn verify(
		&self,
		method: &str,
		url: &str,
		proof: &str,
	) -> Result<TokenConfirmation, DpopError> {
		let header = jsonwebtoken::decode_header(proof).map_err(DpopError::Malformed)?;

		if header.typ.as_deref() != Some(DPOP_JWT_TYPE) {
			return Err(DpopError::WrongType);
		}
		if matches!(header.alg, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
			return Err(DpopError::SymmetricAlgorithm);
		}

		let jwk = header.jwk.ok_or(DpopError::MissingKey)?;
		let claims =
			keys::verify_with_key::<DpopClaims>(proof, &jwk).map_err(DpopError::Signature)?.claims;

		if claims.jti.is_empty() {
			return Err(DpopError::MissingClaim { claim: "jti" });
		}
		if claims.htm.is_empty() {
			return Err(DpopError::MissingClaim { claim: "htm" });
		}
		if claims.htu.is_empty() {
			return Err(DpopError::MissingClaim { claim: "htu" });
		}
		if claims.htm != method {
			return Err(DpopError::MethodMismatch {
				expected: method.to_owned(),
				actual: claims.htm,
			});
		}
		if normalize_target(&claims.htu)? != normalize_target(url)? {
			return Err(DpopError::TargetMismatch);
		}

		let iat = claims.iat.ok_or(DpopError::MissingClaim { claim: "iat" })?;
		let issued_at =
			OffsetDateTime::from_unix_timestamp(iat).map_err(|_| DpopError::MissingClaim {
				claim: "iat",
			})?;
		let now = self.clock.now();

		if issued_at > now + self.clock_skew {
			return Err(DpopError::FromFuture);
		}
		if now - issued_at > self.max_age {
			return Err(DpopError::Stale);
		}

		let jkt = keys::thumbprint(&jwk).map_err(DpopError::Thumbprint)?;

		if let Some(cache) = &self.replay {
			let key = format!("dpop:{jkt}:{}", claims.jti);

			if !cache.insert_unique(&key, issued_at + self.max_age + self.clock_skew, now).await? {
				return Err(DpopError::Replayed);
			}
		}

		Ok(TokenConfirmation { jkt })
	}
}
impl Debug for DpopVerifier {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("DpopVerifier")
			.field("max_age", &self.max_age)
			.field("clock_skew", &self.clock_skew)
			.field("replay", &self.replay.is_some())
			.finish()
	}
}

/// Fails unless `presented` carries the same key binding as `bound`.
///
/// Unbound tokens accept any (or no) proof; bound tokens require the matching proof.
pub fn ensure_binding(
	bound: Option<&TokenConfirmation>,
	presented: Option<&TokenConfirmation>,
) -> Result<(), DpopError> {
	match (bound, presented) {
		(None, _) => Ok(()),
		(Some(bound), Some(presented)) if bound.jkt == presented.jkt => Ok(()),
		_ => Err(DpopError::BindingMismatch),
	}
}

// RFC 9449 §4.3: compare without query and fragment.
fn normalize_target(raw: &str) -> Result<String, DpopError> {
	let mut url = Url::parse(raw).map_err(|_| DpopError::InvalidTarget)?;

	url.set_query(None);
	url.set_fragment(None);

	Ok(url.into())
}
