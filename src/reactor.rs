//! Typed request dispatch.
//!
//! Requests form a closed [`Request`] union, so a handler can never receive a payload of the wrong
//! shape. Handlers are registered per [`RequestKind`]. Registration is serialized by a mutex while
//! dispatch reads an immutable snapshot of the table, so registrations never block in-flight
//! dispatches and dispatches never block each other.
//!
//! [`Reactor::dispatch`] runs the handler on the caller's task. [`Reactor::send`] runs it on a
//! spawned tokio task and hands the outcome to a callback; it imposes no ordering between sends and
//! no bound on how many run at once.

// crates.io
use arc_swap::ArcSwap;
use tokio::{runtime::Handle, task::JoinHandle};
// self
use crate::{
	_prelude::*,
	auth::{
		AuthorizationRequest, AuthorizationResponse, DeviceAuthorizationRequest,
		DeviceAuthorizationResponse, PushedAuthorizationResponse, Subject, TokenStatus,
		UserCodeValidation,
	},
	flows::{Engine, IntrospectionResponse, TokenLookupRequest, TokenRequest, TokenResponse},
};

/// Boxed future returned by handlers.
pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = Result<Response, Rejection>> + 'a + Send>>;

type HandlerTable = HashMap<RequestKind, Arc<dyn Handler>>;

/// Serves one or more request kinds.
pub trait Handler
where
	Self: Send + Sync,
{
	/// Handles a request routed to this handler.
	fn handle(&self, request: Request) -> HandlerFuture<'_>;
}

/// Engine operations the reactor can route.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Request {
	/// Front-channel authorization for an authenticated end-user.
	Authorize {
		/// Authorization request (direct or `request_uri` redemption).
		request: AuthorizationRequest,
		/// Authenticated end-user.
		subject: Subject,
	},
	/// Pushed authorization request.
	PushAuthorization {
		/// Authenticated caller.
		client_id: String,
		/// Pushed request.
		request: AuthorizationRequest,
	},
	/// Device authorization request.
	DeviceAuthorize(DeviceAuthorizationRequest),
	/// End-user confirmation of a user code.
	ValidateUserCode {
		/// Authenticated end-user.
		subject: Subject,
		/// Code the user typed.
		user_code: String,
	},
	/// Token request.
	Token(TokenRequest),
	/// Token introspection.
	Introspect(TokenLookupRequest),
	/// Token revocation.
	Revoke(TokenLookupRequest),
}
impl Request {
	/// Routing key of the request.
	pub const fn kind(&self) -> RequestKind {
		match self {
			Request::Authorize { .. } => RequestKind::Authorize,
			Request::PushAuthorization { .. } => RequestKind::PushAuthorization,
			Request::DeviceAuthorize(_) => RequestKind::DeviceAuthorize,
			Request::ValidateUserCode { .. } => RequestKind::ValidateUserCode,
			Request::Token(_) => RequestKind::Token,
			Request::Introspect(_) => RequestKind::Introspect,
			Request::Revoke(_) => RequestKind::Revoke,
		}
	}
}

/// Handler outcome, one variant per [`Request`] variant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Response {
	/// Authorization code issued.
	Authorization(AuthorizationResponse),
	/// Pushed request stored.
	PushedAuthorization(PushedAuthorizationResponse),
	/// Device codes issued.
	DeviceAuthorization(DeviceAuthorizationResponse),
	/// User code confirmed.
	UserCode(UserCodeValidation),
	/// Tokens issued.
	Token(TokenResponse),
	/// Introspection result.
	Introspection(IntrospectionResponse),
	/// Status of the revoked token.
	Revocation(TokenStatus),
}

/// Routing key of a [`Request`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestKind {
	/// [`Request::Authorize`].
	Authorize,
	/// [`Request::PushAuthorization`].
	PushAuthorization,
	/// [`Request::DeviceAuthorize`].
	DeviceAuthorize,
	/// [`Request::ValidateUserCode`].
	ValidateUserCode,
	/// [`Request::Token`].
	Token,
	/// [`Request::Introspect`].
	Introspect,
	/// [`Request::Revoke`].
	Revoke,
}
impl RequestKind {
	/// Every request kind.
	pub const ALL: [RequestKind; 7] = [
		RequestKind::Authorize,
		RequestKind::PushAuthorization,
		RequestKind::DeviceAuthorize,
		RequestKind::ValidateUserCode,
		RequestKind::Token,
		RequestKind::Introspect,
		RequestKind::Revoke,
	];

	/// Stable label for diagnostics.
	pub const fn as_str(self) -> &'static str {
		match self {
			RequestKind::Authorize => "authorize",
			RequestKind::PushAuthorization => "push_authorization",
			RequestKind::DeviceAuthorize => "device_authorize",
			RequestKind::ValidateUserCode => "validate_user_code",
			RequestKind::Token => "token",
			RequestKind::Introspect => "introspect",
			RequestKind::Revoke => "revoke",
		}
	}
}
impl Display for RequestKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Routing failures.
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum DispatchError {
	/// Nothing is registered for the request kind.
	#[error("No handler is registered for {kind} requests.")]
	NoHandler {
		/// Unrouted request kind.
		kind: RequestKind,
	},
	/// `send` was called outside a tokio runtime.
	#[error("Requests can only be sent from within a tokio runtime.")]
	NoRuntime,
}

/// Request router with a copy-on-write handler table.
#[derive(Clone, Default)]
pub struct Reactor {
	handlers: Arc<ArcSwap<HandlerTable>>,
	registration: Arc<Mutex<()>>,
}
impl Reactor {
	/// Builds a reactor routing every request kind to `engine`.
	pub fn for_engine(engine: Arc<Engine>) -> Self {
		let reactor = Self::default();

		for kind in RequestKind::ALL {
			reactor.register(kind, engine.clone());
		}

		reactor
	}

	/// Registers (or replaces) the handler for `kind`.
	pub fn register(&self, kind: RequestKind, handler: Arc<dyn Handler>) {
		let _registration = self.registration.lock();
		let mut table = HandlerTable::clone(&self.handlers.load());

		table.insert(kind, handler);

		self.handlers.store(Arc::new(table));
	}

	/// Runs the handler for `request` and returns its outcome.
	pub async fn dispatch(&self, request: Request) -> Result<Response, Rejection> {
		let handler = self.route(request.kind())?;

		handler.handle(request).await
	}

	/// Runs the handler for `request` on a spawned task and passes its outcome to `callback`.
	///
	/// Routing happens before spawning; an unrouted request, or a call made outside a tokio
	/// runtime, fails here and `callback` never runs.
	pub fn send<F>(&self, request: Request, callback: F) -> Result<JoinHandle<()>, Rejection>
	where
		F: 'static + Send + FnOnce(Result<Response, Rejection>),
	{
		let handler = self.route(request.kind())?;
		let runtime =
			Handle::try_current().map_err(|_| Rejection::server_error(DispatchError::NoRuntime))?;

		Ok(runtime.spawn(async move {
			let outcome = handler.handle(request).await;

			callback(outcome);
		}))
	}

	fn route(&self, kind: RequestKind) -> Result<Arc<dyn Handler>, Rejection> {
		self.handlers
			.load()
			.get(&kind)
			.cloned()
			.ok_or_else(|| Rejection::server_error(DispatchError::NoHandler { kind }))
	}
}
impl Debug for Reactor {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let table = self.handlers.load();
		let mut kinds = table.keys().map(|kind| kind.as_str()).collect::<Vec<_>>();

		kinds.sort_unstable();

		f.debug_struct("Reactor").field("kinds", &kinds).finish()
	}
}

impl Handler for Engine {
	fn handle(&self, request: Request) -> HandlerFuture<'_> {
		Box::pin(async move {
			match request {
				Request::Authorize { request, subject } =>
					self.authorize(request, subject).await.map(Response::Authorization),
				Request::PushAuthorization { client_id, request } =>
					self.register(&client_id, request).await.map(Response::PushedAuthorization),
				Request::DeviceAuthorize(request) =>
					self.device_authorize(request).await.map(Response::DeviceAuthorization),
				Request::ValidateUserCode { subject, user_code } =>
					self.validate_user_code(subject, &user_code).await.map(Response::UserCode),
				Request::Token(request) => self.token(request).await.map(Response::Token),
				Request::Introspect(request) =>
					self.introspect(request).await.map(Response::Introspection),
				Request::Revoke(request) => self.revoke(request).await.map(Response::Revocation),
			}
		})
	}
}
