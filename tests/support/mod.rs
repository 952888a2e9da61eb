//! Shared fixtures for the integration tests: an in-memory engine on a manual clock, a store
//! wrapper that injects backend faults, and deterministic P-256 keys.

#![allow(dead_code)]

// std
use std::{collections::HashSet, sync::Arc};
// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use p256::{
	SecretKey,
	elliptic_curve::sec1::ToEncodedPoint,
	pkcs8::{EncodePrivateKey, LineEnding},
};
use parking_lot::Mutex;
use serde_json::{Value, json};
use time::{OffsetDateTime, macros};
// self
use oauth2_engine::{
	auth::{
		AuthorizationRequest, Client, ClientId, DeviceCodeSession, DeviceCodeStatus, DeviceCodes,
		GrantType, PushedRequest, Resource, ResponseType, ScopeSet, Session, Subject, Token,
		TokenId,
	},
	clock::ManualClock,
	config::{EngineConfig, EngineConfigBuilder},
	flows::{Engine, EngineStores, Grant, TokenRequest, TokenResponse},
	jsonwebtoken::{self, Algorithm, EncodingKey, Header, jwk::Jwk},
	keys::SigningKey,
	store::{
		ClientRegistry, CompareAndSwapOutcome, DeviceSessionStore, MemoryStore, ResourceRegistry,
		SessionStore, StoreError, StoreFuture, StoredDeviceSession, TokenStore,
	},
	url::Url,
};

pub const ISSUER: &str = "https://as.example.com";
pub const CLIENT_ID: &str = "s6BhdRkqt3";
pub const SERVICE_ID: &str = "svc";
pub const REDIRECT_URI: &str = "https://client.example.org/cb";
pub const RESOURCE: &str = "https://api.example.com";
pub const TOKEN_ENDPOINT: &str = "https://as.example.com/token";
// RFC 7636 appendix B.
pub const CODE_VERIFIER: &str = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
pub const CODE_CHALLENGE: &str = "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM";

pub const START: OffsetDateTime = macros::datetime!(2025-01-01 00:00 UTC);

pub struct Fixture {
	pub engine: Arc<Engine>,
	pub store: Arc<MemoryStore>,
	pub clock: Arc<ManualClock>,
}

pub fn fixture() -> Fixture {
	fixture_with(|builder| builder)
}

pub fn fixture_with<F>(configure: F) -> Fixture
where
	F: FnOnce(EngineConfigBuilder) -> EngineConfigBuilder,
{
	let store = seeded_store();

	build_fixture(configure, EngineStores::shared(store.clone()), store)
}

/// Engine whose stores fail on demand; the wrapped [`MemoryStore`] is seeded like [`fixture`].
pub fn faulty_fixture() -> (Fixture, Arc<FaultyStore>) {
	let store = seeded_store();
	let faulty = Arc::new(FaultyStore::new(MemoryStore::clone(&store)));
	let fixture = build_fixture(|builder| builder, EngineStores::shared(faulty.clone()), store);

	(fixture, faulty)
}

fn seeded_store() -> Arc<MemoryStore> {
	let store = Arc::new(MemoryStore::default());

	store.insert_client(
		Client::new(client_id(CLIENT_ID))
			.with_grants([
				GrantType::AuthorizationCode,
				GrantType::RefreshToken,
				GrantType::DeviceCode,
				GrantType::TokenExchange,
			])
			.with_response_type(ResponseType::Code)
			.with_redirect_uri(REDIRECT_URI),
	);
	store.insert_client(
		Client::new(client_id(SERVICE_ID))
			.with_grants([GrantType::ClientCredentials, GrantType::TokenExchange]),
	);
	store.insert_resource(Resource::new(RESOURCE).with_scope(scope("openid profile read")));

	store
}

fn build_fixture<F>(configure: F, stores: EngineStores, store: Arc<MemoryStore>) -> Fixture
where
	F: FnOnce(EngineConfigBuilder) -> EngineConfigBuilder,
{
	let clock = Arc::new(ManualClock::new(START));
	let issuer = Url::parse(ISSUER).expect("Issuer fixture should parse.");
	let config =
		configure(EngineConfig::builder(issuer)).build().expect("Config fixture should build.");
	let engine = Engine::new(config, stores).with_clock(clock.clone());

	Fixture { engine: Arc::new(engine), store, clock }
}

/// Store operations [`FaultyStore`] can be told to fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Fault {
	ClientLookup,
	SessionDelete,
	DeviceLookup,
	UserCodeLookup,
	TokenLookup,
}

/// Delegates to a [`MemoryStore`] unless the called operation has been set to fail.
pub struct FaultyStore {
	inner: MemoryStore,
	faults: Mutex<HashSet<Fault>>,
}
impl FaultyStore {
	pub fn new(inner: MemoryStore) -> Self {
		Self { inner, faults: Mutex::new(HashSet::new()) }
	}

	pub fn fail(&self, fault: Fault) {
		self.faults.lock().insert(fault);
	}

	pub fn heal(&self) {
		self.faults.lock().clear();
	}

	fn check(&self, fault: Fault) -> Result<(), StoreError> {
		if self.faults.lock().contains(&fault) {
			return Err(StoreError::Backend { message: format!("{fault:?} unavailable") });
		}

		Ok(())
	}
}
impl ClientRegistry for FaultyStore {
	fn get<'a>(&'a self, client_id: &'a str) -> StoreFuture<'a, Option<Client>> {
		Box::pin(async move {
			self.check(Fault::ClientLookup)?;

			ClientRegistry::get(&self.inner, client_id).await
		})
	}
}
impl ResourceRegistry for FaultyStore {
	fn get_by_uri<'a>(&'a self, uri: &'a str) -> StoreFuture<'a, Option<Resource>> {
		self.inner.get_by_uri(uri)
	}
}
impl SessionStore for FaultyStore {
	fn register(&self, session: Session) -> StoreFuture<'_, String> {
		SessionStore::register(&self.inner, session)
	}

	fn get<'a>(&'a self, code: &'a str) -> StoreFuture<'a, Option<Session>> {
		SessionStore::get(&self.inner, code)
	}

	fn delete<'a>(&'a self, code: &'a str) -> StoreFuture<'a, bool> {
		Box::pin(async move {
			self.check(Fault::SessionDelete)?;

			SessionStore::delete(&self.inner, code).await
		})
	}

	fn push(&self, request: PushedRequest) -> StoreFuture<'_, String> {
		self.inner.push(request)
	}

	fn get_pushed<'a>(&'a self, request_uri: &'a str) -> StoreFuture<'a, Option<PushedRequest>> {
		self.inner.get_pushed(request_uri)
	}

	fn delete_pushed<'a>(&'a self, request_uri: &'a str) -> StoreFuture<'a, bool> {
		self.inner.delete_pushed(request_uri)
	}
}
impl DeviceSessionStore for FaultyStore {
	fn register(&self, session: DeviceCodeSession) -> StoreFuture<'_, DeviceCodes> {
		DeviceSessionStore::register(&self.inner, session)
	}

	fn get<'a>(&'a self, device_code: &'a str) -> StoreFuture<'a, Option<DeviceCodeSession>> {
		Box::pin(async move {
			self.check(Fault::DeviceLookup)?;

			DeviceSessionStore::get(&self.inner, device_code).await
		})
	}

	fn get_by_user_code<'a>(
		&'a self,
		user_code: &'a str,
	) -> StoreFuture<'a, Option<StoredDeviceSession>> {
		Box::pin(async move {
			self.check(Fault::UserCodeLookup)?;

			self.inner.get_by_user_code(user_code).await
		})
	}

	fn compare_and_swap_status<'a>(
		&'a self,
		device_code: &'a str,
		expected: &'a DeviceCodeStatus,
		replacement: DeviceCodeStatus,
	) -> StoreFuture<'a, CompareAndSwapOutcome> {
		self.inner.compare_and_swap_status(device_code, expected, replacement)
	}
}
impl TokenStore for FaultyStore {
	fn create(&self, token: Token) -> StoreFuture<'_, ()> {
		self.inner.create(token)
	}

	fn get<'a>(&'a self, token_id: &'a TokenId) -> StoreFuture<'a, Option<Token>> {
		TokenStore::get(&self.inner, token_id)
	}

	fn get_by_value<'a>(&'a self, value: &'a str) -> StoreFuture<'a, Option<Token>> {
		Box::pin(async move {
			self.check(Fault::TokenLookup)?;

			self.inner.get_by_value(value).await
		})
	}

	fn revoke<'a>(&'a self, token_id: &'a TokenId) -> StoreFuture<'a, Option<Token>> {
		self.inner.revoke(token_id)
	}

	fn delete<'a>(&'a self, token_id: &'a TokenId) -> StoreFuture<'a, bool> {
		TokenStore::delete(&self.inner, token_id)
	}
}

pub fn client_id(value: &str) -> ClientId {
	ClientId::new(value).expect("Client identifier fixture should be valid.")
}

pub fn subject() -> Subject {
	Subject::new("alice").expect("Subject fixture should be valid.")
}

pub fn scope(raw: &str) -> ScopeSet {
	ScopeSet::from_param(raw).expect("Scope fixture should be valid.")
}

pub fn authorization_request(scope: &str) -> AuthorizationRequest {
	AuthorizationRequest {
		response_type: "code".into(),
		client_id: CLIENT_ID.into(),
		scope: scope.into(),
		state: "xyz".into(),
		redirect_uri: REDIRECT_URI.into(),
		code_challenge: CODE_CHALLENGE.into(),
		code_challenge_method: "S256".into(),
		..Default::default()
	}
}

pub fn code_grant(code: &str) -> Grant {
	Grant::AuthorizationCode {
		code: code.into(),
		code_verifier: CODE_VERIFIER.into(),
		redirect_uri: REDIRECT_URI.into(),
	}
}

pub fn refresh_grant(refresh_token: &str) -> Grant {
	Grant::RefreshToken { issuer: ISSUER.into(), refresh_token: refresh_token.into(), scope: None }
}

/// Runs authorize then redeems the code, returning the token response.
pub async fn sign_in(fixture: &Fixture, scope: &str) -> TokenResponse {
	let code = fixture
		.engine
		.authorize(authorization_request(scope), subject())
		.await
		.expect("Authorization should succeed.")
		.code;

	fixture
		.engine
		.token(TokenRequest::new(CLIENT_ID, code_grant(&code)))
		.await
		.expect("Code redemption should succeed.")
}

pub struct TestKey {
	pub kid: String,
	pub pem: String,
	pub x: String,
	pub y: String,
}
impl TestKey {
	pub fn public_jwk_value(&self) -> Value {
		json!({
			"kty": "EC",
			"crv": "P-256",
			"x": self.x,
			"y": self.y,
			"kid": self.kid,
			"alg": "ES256",
		})
	}

	pub fn public_jwk(&self) -> Jwk {
		serde_json::from_value(self.public_jwk_value()).expect("Fixture JWK should deserialize.")
	}

	pub fn key_set_document(&self) -> String {
		json!({ "keys": [self.public_jwk_value()] }).to_string()
	}

	pub fn signing_key(&self) -> SigningKey {
		SigningKey::es256_from_pem(self.pem.as_bytes())
			.expect("Fixture PEM should load as an ES256 key.")
			.with_kid(self.kid.clone())
	}

	/// Signs a DPoP proof for `method url` issued at `iat`.
	pub fn dpop_proof(&self, method: &str, url: &str, jti: &str, iat: OffsetDateTime) -> String {
		let mut header = Header::new(Algorithm::ES256);

		header.typ = Some("dpop+jwt".into());
		header.jwk = Some(self.public_jwk());

		let claims = json!({
			"jti": jti,
			"htm": method,
			"htu": url,
			"iat": iat.unix_timestamp(),
		});
		let key = EncodingKey::from_ec_pem(self.pem.as_bytes())
			.expect("Fixture PEM should load as an encoding key.");

		jsonwebtoken::encode(&header, &claims, &key).expect("DPoP proof should sign.")
	}
}

/// Builds a key whose scalar is `[seed; 32]`.
pub fn key(seed: u8, kid: &str) -> TestKey {
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
