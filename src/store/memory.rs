//! Thread-safe in-memory implementation of every store contract, for tests and embedding demos.

// crates.io
use rand::Rng;
// self
use crate::{
	_prelude::*,
	auth::{
		Client, DeviceCodeSession, DeviceCodeStatus, DeviceCodes, PushedRequest,
		REQUEST_URI_PREFIX, Resource, Session, Token, TokenId, random_secret,
	},
	store::{
		ClientRegistry, CompareAndSwapOutcome, DeviceSessionStore, ResourceRegistry,
		SessionStore, StoreError, StoreFuture, StoredDeviceSession, TokenStore,
	},
};

// RFC 8628 §6.1 base-20 consonant alphabet.
const USER_CODE_ALPHABET: &[u8] = b"BCDFGHJKLMNPQRSTVWXZ";
const USER_CODE_HALF: usize = 4;

#[derive(Debug, Default)]
struct MemoryState {
	clients: RwLock<HashMap<String, Client>>,
	resources: RwLock<HashMap<String, Resource>>,
	sessions: RwLock<HashMap<String, Session>>,
	pushed: RwLock<HashMap<String, PushedRequest>>,
	devices: RwLock<DeviceTable>,
	tokens: RwLock<TokenTable>,
}

#[derive(Debug, Default)]
struct DeviceTable {
	by_device_code: HashMap<String, DeviceCodeSession>,
	by_user_code: HashMap<String, String>,
}

#[derive(Debug, Default)]
struct TokenTable {
	by_id: HashMap<TokenId, Token>,
	by_value: HashMap<String, TokenId>,
}

/// In-process store; clones share the same state.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Arc<MemoryState>);
impl MemoryStore {
	/// Registers or replaces a client record.
	pub fn insert_client(&self, client: Client) {
		self.0.clients.write().insert(client.client_id.to_string(), client);
	}

	/// Registers or replaces a protected resource.
	pub fn insert_resource(&self, resource: Resource) {
		self.0.resources.write().insert(resource.uri.clone(), resource);
	}

	/// Number of authorization-code sessions still stored.
	pub fn session_count(&self) -> usize {
		self.0.sessions.read().len()
	}

	/// Number of pushed authorization requests still stored.
	pub fn pushed_count(&self) -> usize {
		self.0.pushed.read().len()
	}

	/// Number of issued tokens still stored.
	pub fn token_count(&self) -> usize {
		self.0.tokens.read().by_id.len()
	}

	/// Number of device-code sessions still stored.
	pub fn device_count(&self) -> usize {
		self.0.devices.read().by_device_code.len()
	}

	fn register_session_now(state: &MemoryState, session: Session) -> String {
		let mut sessions = state.sessions.write();

		sessions.retain(|_, stored| !stored.is_expired_at(session.issued_at));

		let code = unique_key(|candidate| sessions.contains_key(candidate), random_secret);

		sessions.insert(code.clone(), session);

		code
	}

	fn push_now(state: &MemoryState, request: PushedRequest) -> String {
		let mut pushed = state.pushed.write();

		pushed.retain(|_, stored| !stored.is_expired_at(request.issued_at));

		let request_uri = unique_key(
			|candidate| pushed.contains_key(candidate),
			|| format!("{REQUEST_URI_PREFIX}{}", random_secret()),
		);

		pushed.insert(request_uri.clone(), request);

		request_uri
	}

	fn register_device_now(state: &MemoryState, session: DeviceCodeSession) -> DeviceCodes {
		let mut devices = state.devices.write();
		let DeviceTable { by_device_code, by_user_code } = &mut *devices;

		by_device_code.retain(|_, stored| !stored.is_expired_at(session.issued_at));
		by_user_code.retain(|_, device_code| by_device_code.contains_key(device_code));

		let device_code =
			unique_key(|candidate| devices.by_device_code.contains_key(candidate), random_secret);
		// User codes stay unique for as long as their session is stored, terminal or not.
		let user_code =
			unique_key(|candidate| devices.by_user_code.contains_key(candidate), random_user_code);

		devices.by_device_code.insert(device_code.clone(), session);
		devices.by_user_code.insert(user_code.clone(), device_code.clone());

		DeviceCodes { device_code, user_code }
	}

	fn device_by_user_code_now(state: &MemoryState, user_code: &str) -> Option<StoredDeviceSession> {
		let devices = state.devices.read();
		let device_code = devices.by_user_code.get(&normalize_user_code(user_code))?;

		devices.by_device_code.get(device_code).map(|session| StoredDeviceSession {
			device_code: device_code.clone(),
			session: session.clone(),
		})
	}

	fn device_cas_now(
		state: &MemoryState,
		device_code: &str,
		expected: &DeviceCodeStatus,
		replacement: DeviceCodeStatus,
	) -> CompareAndSwapOutcome {
		let mut devices = state.devices.write();

		match devices.by_device_code.get_mut(device_code) {
			Some(session) if &session.status == expected => {
				session.status = replacement;

				CompareAndSwapOutcome::Updated
			},
			Some(_) => CompareAndSwapOutcome::Mismatch,
			None => CompareAndSwapOutcome::Missing,
		}
	}

	fn create_token_now(state: &MemoryState, token: Token) -> Result<(), StoreError> {
		let mut tokens = state.tokens.write();
		let value = token.value.expose().to_owned();

		if tokens.by_value.contains_key(&value) || tokens.by_id.contains_key(&token.token_id) {
			return Err(StoreError::Backend { message: "duplicate token".into() });
		}

		tokens.by_value.insert(value, token.token_id.clone());
		tokens.by_id.insert(token.token_id.clone(), token);

		Ok(())
	}

	fn token_by_value_now(state: &MemoryState, value: &str) -> Option<Token> {
		let tokens = state.tokens.read();

		tokens.by_value.get(value).and_then(|id| tokens.by_id.get(id)).cloned()
	}

	fn revoke_token_now(state: &MemoryState, token_id: &TokenId) -> Result<Option<Token>, StoreError> {
		let mut tokens = state.tokens.write();
		let Some(token) = tokens.by_id.get_mut(token_id) else {
			return Ok(None);
		};

		token.revoke().map_err(|e| StoreError::Backend { message: e.to_string() })?;

		Ok(Some(token.clone()))
	}

	fn delete_token_now(state: &MemoryState, token_id: &TokenId) -> bool {
		let mut tokens = state.tokens.write();

		match tokens.by_id.remove(token_id) {
			Some(token) => {
				tokens.by_value.remove(token.value.expose());

				true
			},
			None => false,
		}
	}
}
impl ClientRegistry for MemoryStore {
	fn get<'a>(&'a self, client_id: &'a str) -> StoreFuture<'a, Option<Client>> {
		Box::pin(async move { Ok(self.0.clients.read().get(client_id).cloned()) })
	}
}
impl ResourceRegistry for MemoryStore {
	fn get_by_uri<'a>(&'a self, uri: &'a str) -> StoreFuture<'a, Option<Resource>> {
		Box::pin(async move { Ok(self.0.resources.read().get(uri).cloned()) })
	}
}
impl SessionStore for MemoryStore {
	fn register(&self, session: Session) -> StoreFuture<'_, String> {
		Box::pin(async move { Ok(Self::register_session_now(&self.0, session)) })
	}

	fn get<'a>(&'a self, code: &'a str) -> StoreFuture<'a, Option<Session>> {
		Box::pin(async move { Ok(self.0.sessions.read().get(code).cloned()) })
	}

	fn delete<'a>(&'a self, code: &'a str) -> StoreFuture<'a, bool> {
		Box::pin(async move { Ok(self.0.sessions.write().remove(code).is_some()) })
	}

	fn push(&self, request: PushedRequest) -> StoreFuture<'_, String> {
		Box::pin(async move { Ok(Self::push_now(&self.0, request)) })
	}

	fn get_pushed<'a>(&'a self, request_uri: &'a str) -> StoreFuture<'a, Option<PushedRequest>> {
		Box::pin(async move { Ok(self.0.pushed.read().get(request_uri).cloned()) })
	}

	fn delete_pushed<'a>(&'a self, request_uri: &'a str) -> StoreFuture<'a, bool> {
		Box::pin(async move { Ok(self.0.pushed.write().remove(request_uri).is_some()) })
	}
}
impl DeviceSessionStore for MemoryStore {
	fn register(&self, session: DeviceCodeSession) -> StoreFuture<'_, DeviceCodes> {
		Box::pin(async move { Ok(Self::register_device_now(&self.0, session)) })
	}

	fn get<'a>(&'a self, device_code: &'a str) -> StoreFuture<'a, Option<DeviceCodeSession>> {
		Box::pin(async move { Ok(self.0.devices.read().by_device_code.get(device_code).cloned()) })
	}

	fn get_by_user_code<'a>(
		&'a self,
		user_code: &'a str,
	) -> StoreFuture<'a, Option<StoredDeviceSession>> {
		Box::pin(async move { Ok(Self::device_by_user_code_now(&self.0, user_code)) })
	}

	fn compare_and_swap_status<'a>(
		&'a self,
		device_code: &'a str,
		expected: &'a DeviceCodeStatus,
		replacement: DeviceCodeStatus,
	) -> StoreFuture<'a, CompareAndSwapOutcome> {
		Box::pin(async move { Ok(Self::device_cas_now(&self.0, device_code, expected, replacement)) })
	}
}
impl TokenStore for MemoryStore {
	fn create(&self, token: Token) -> StoreFuture<'_, ()> {
		Box::pin(async move { Self::create_token_now(&self.0, token) })
	}

	fn get<'a>(&'a self, token_id: &'a TokenId) -> StoreFuture<'a, Option<Token>> {
		Box::pin(async move { Ok(self.0.tokens.read().by_id.get(token_id).cloned()) })
	}

	fn get_by_value<'a>(&'a self, value: &'a str) -> StoreFuture<'a, Option<Token>> {
		Box::pin(async move { Ok(Self::token_by_value_now(&self.0, value)) })
	}

	fn revoke<'a>(&'a self, token_id: &'a TokenId) -> StoreFuture<'a, Option<Token>> {
		Box::pin(async move { Self::revoke_token_now(&self.0, token_id) })
	}

	fn delete<'a>(&'a self, token_id: &'a TokenId) -> StoreFuture<'a, bool> {
		Box::pin(async move { Ok(Self::delete_token_now(&self.0, token_id)) })
	}
}

fn unique_key<F, G>(taken: F, mut generate: G) -> String
where
	F: Fn(&str) -> bool,
	G: FnMut() -> String,
{
	loop {
		let candidate = generate();

		if !taken(&candidate) {
			return candidate;
		}
	}
}

fn random_user_code() -> String {
	let mut rng = rand::rng();
	let mut code = String::with_capacity(USER_CODE_HALF * 2 + 1);

	for i in 0..USER_CODE_HALF * 2 {
		if i == USER_CODE_HALF {
			code.push('-');
		}

		code.push(char::from(USER_CODE_ALPHABET[rng.random_range(0..USER_CODE_ALPHABET.len())]));
	}

	code
}

// Users may type the code in lower case or without the separator.
fn normalize_user_code(input: &str) -> String {
	let compact = input
		.chars()
		.filter(char::is_ascii_alphanumeric)
		.map(|c| c.to_ascii_uppercase())
		.collect::<String>();

	if compact.len() == USER_CODE_HALF * 2 {
		format!("{}-{}", &compact[..USER_CODE_HALF], &compact[USER_CODE_HALF..])
	} else {
		compact
	}
}
