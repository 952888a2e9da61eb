//! Shared helpers for engine services (instrumentation, client lookup, guards, parameter checks).

// self
use crate::{
	_prelude::*,
	auth::{Client, GrantType, ScopeSet},
	flows::Engine,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Runs one service call inside its flow span and records attempt/success/failure.
pub(crate) async fn observe<T, Fut>(
	kind: FlowKind,
	stage: &'static str,
	fut: Fut,
) -> Result<T, Rejection>
where
	Fut: Future<Output = Result<T, Rejection>>,
{
	let span = FlowSpan::new(kind, stage);

	obs::record_flow_outcome(kind, FlowOutcome::Attempt);

	let result = span.instrument(fut).await;

	match &result {
		Ok(_) => obs::record_flow_outcome(kind, FlowOutcome::Success),
		Err(rejection) => {
			obs::trace_rejection(kind, rejection);
			obs::record_flow_outcome(kind, FlowOutcome::Failure);
		},
	}

	result
}

/// Validation rejection with a description.
pub(crate) fn reject(kind: ErrorKind, description: impl Into<String>) -> Rejection {
	Rejection::validation(OAuthError::new(kind).with_description(description))
}

/// Fails with `invalid_request` when a required parameter is blank.
pub(crate) fn require(name: &str, value: &str) -> Result<(), Rejection> {
	if value.trim().is_empty() {
		return Err(reject(ErrorKind::InvalidRequest, format!("{name} is required")));
	}

	Ok(())
}

/// Requires a non-blank, absolute issuer URL.
pub(crate) fn require_issuer(issuer: &str) -> Result<(), Rejection> {
	require("issuer", issuer)?;

	Url::parse(issuer)
		.map(|_| ())
		.map_err(|_| reject(ErrorKind::InvalidRequest, "issuer must be a valid URL"))
}

/// Parses a scope parameter, mapping syntax errors to `invalid_scope`.
pub(crate) fn parse_scope(raw: &str) -> Result<ScopeSet, Rejection> {
	ScopeSet::from_param(raw).map_err(|e| {
		Rejection::new(OAuthError::invalid_scope("scope is malformed"), e)
	})
}

/// Fails with `unsupported_grant_type` unless the client may use `grant`.
pub(crate) fn require_grant(client: &Client, grant: GrantType) -> Result<(), Rejection> {
	if client.supports_grant(grant) {
		Ok(())
	} else {
		Err(reject(
			ErrorKind::UnsupportedGrantType,
			format!("client is not allowed to use {}", grant.as_str()),
		))
	}
}

impl Engine {
	/// Loads a client; an unknown id maps to `unknown`, a store fault to `server_error`.
	pub(crate) async fn load_client(
		&self,
		client_id: &str,
		unknown: ErrorKind,
	) -> Result<Client, Rejection> {
		match self.clients.get(client_id).await {
			Ok(Some(client)) => Ok(client),
			Ok(None) => Err(Rejection::new(
				OAuthError::new(unknown).with_description("unknown client"),
				Error::NotFound { entity: "client" },
			)),
			Err(e) => Err(Rejection::server_error(e)),
		}
	}

	/// Returns (and creates on demand) the singleflight guard for a refresh token value.
	pub(crate) fn refresh_guard(&self, key: &str) -> Arc<AsyncMutex<()>> {
		let mut guards = self.refresh_guards.lock();

		guards.entry(key.to_owned()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
	}

	/// Drops guards nobody holds any more.
	pub(crate) fn prune_refresh_guards(&self) {
		self.refresh_guards.lock().retain(|_, guard| Arc::strong_count(guard) > 1);
	}
}
