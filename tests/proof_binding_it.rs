mod support;

// std
use std::sync::Arc;
// crates.io
use serde_json::Value;
use time::Duration;
// self
use oauth2_engine::{
	auth::{
		AuthorizationCodeResponse, Client, ClientAuthMethod, GrantType, ResponseType,
		TokenConfirmation,
	},
	config::AccessTokenFormat,
	flows::{ACCESS_TOKEN_JWT_TYPE, Engine, TokenLookupRequest, TokenRequest},
	jsonwebtoken::{self, Algorithm, EncodingKey, Header},
	keys::{self, StaticKeyProvider, StaticKeySet},
	proof::{ClientAssertion, DpopError, JarEncoder, JarmDecoder, MemoryReplayCache},
	rfc::ErrorKind,
};
use support::*;

async fn confirm(fixture: &Fixture, key: &TestKey, jti: &str) -> TokenConfirmation {
	let proof = key.dpop_proof("POST", TOKEN_ENDPOINT, jti, START);

	fixture
		.engine
		.dpop_verifier()
		.verify("POST", TOKEN_ENDPOINT, &proof)
		.await
		.expect("DPoP proof should verify.")
}

fn keyed_client(key: &TestKey) -> Client {
	Client::new(client_id(CLIENT_ID))
		.with_grants([GrantType::AuthorizationCode, GrantType::RefreshToken])
		.with_response_type(ResponseType::Code)
		.with_redirect_uri(REDIRECT_URI)
		.with_auth_method(ClientAuthMethod::PrivateKeyJwt)
		.with_jwks(key.key_set_document())
}

#[tokio::test]
async fn dpop_bound_refresh_tokens_require_the_same_key() {
	let fixture = fixture();
	let holder = key(7, "holder");
	let intruder = key(9, "intruder");
	let confirmation = confirm(&fixture, &holder, "proof-1").await;
	let code = fixture
		.engine
		.authorize(authorization_request("openid offline_access"), subject())
		.await
		.expect("Authorization should succeed.")
		.code;
	let bound =
		TokenRequest::new(CLIENT_ID, code_grant(&code)).with_confirmation(confirmation.clone());
	let issued = fixture.engine.token(bound).await.expect("Bound code redemption should succeed.");

	assert_eq!(issued.token_type, "DPoP");

	let refresh = issued.refresh_token.expect("Offline sign-in should issue a refresh token.");
	let unproven = fixture
		.engine
		.token(TokenRequest::new(CLIENT_ID, refresh_grant(&refresh)))
		.await
		.expect_err("Bound refresh tokens need a proof.");
	let foreign = confirm(&fixture, &intruder, "proof-2").await;
	let mismatched = fixture
		.engine
		.token(TokenRequest::new(CLIENT_ID, refresh_grant(&refresh)).with_confirmation(foreign))
		.await
		.expect_err("Bound refresh tokens need the bound key.");

	assert_eq!(unproven.kind(), ErrorKind::InvalidRequest);
	assert_eq!(mismatched.kind(), ErrorKind::InvalidRequest);

	let proven =
		TokenRequest::new(CLIENT_ID, refresh_grant(&refresh)).with_confirmation(confirmation.clone());
	let refreshed = fixture.engine.token(proven).await.expect("The bound key should refresh.");

	assert_eq!(refreshed.token_type, "DPoP");

	let introspection = fixture
		.engine
		.introspect(TokenLookupRequest::new(CLIENT_ID, refreshed.access_token))
		.await
		.expect("Introspection should succeed.");

	assert_eq!(introspection.cnf, Some(confirmation));
}

#[tokio::test]
async fn dpop_proofs_are_checked_for_freshness_and_replay() {
	let fixture = fixture();
	let holder = key(7, "holder");
	let verifier =
		fixture.engine.dpop_verifier().with_replay_cache(Arc::new(MemoryReplayCache::default()));
	let stale = holder.dpop_proof("POST", TOKEN_ENDPOINT, "stale", START - Duration::minutes(2));
	let fresh = holder.dpop_proof("POST", TOKEN_ENDPOINT, "fresh", START);

	assert!(matches!(
		verifier.verify("POST", TOKEN_ENDPOINT, &stale).await,
		Err(DpopError::Stale)
	));
	assert!(matches!(
		verifier.verify("GET", TOKEN_ENDPOINT, &fresh).await,
		Err(DpopError::MethodMismatch { .. })
	));

	verifier.verify("POST", TOKEN_ENDPOINT, &fresh).await.expect("Fresh proof should verify.");

	assert!(matches!(
		verifier.verify("POST", TOKEN_ENDPOINT, &fresh).await,
		Err(DpopError::Replayed)
	));
}

#[tokio::test]
async fn jwt_access_tokens_verify_with_the_server_key_and_stay_introspectable() {
	let fixture = fixture_with(|builder| builder.access_token_format(AccessTokenFormat::Jwt));
	let server = key(3, "server");
	let engine = Engine::clone(&fixture.engine)
		.with_key_provider(Arc::new(StaticKeyProvider::new(server.signing_key())));

	engine.check().expect("JWT engine with keys should pass the check.");

	let code = engine
		.authorize(authorization_request("openid profile"), subject())
		.await
		.expect("Authorization should succeed.")
		.code;
	let access = engine
		.token(TokenRequest::new(CLIENT_ID, code_grant(&code)))
		.await
		.expect("Code redemption should succeed.")
		.access_token;
	let header = jsonwebtoken::decode_header(&access).expect("Access token should be a JWT.");
	let set = keys::parse_key_set(&server.key_set_document()).expect("Key set should parse.");
	let claims = keys::verify_with_key_set::<Value>(&access, &set)
		.expect("Access token should verify.")
		.claims;

	assert_eq!(header.typ.as_deref(), Some(ACCESS_TOKEN_JWT_TYPE));
	assert_eq!(header.kid.as_deref(), Some("server"));
	assert_eq!(claims["sub"], "alice");
	assert_eq!(claims["client_id"], CLIENT_ID);
	assert_eq!(claims["scope"], "openid profile");

	let introspection = engine
		.introspect(TokenLookupRequest::new(CLIENT_ID, access))
		.await
		.expect("Introspection should succeed.");

	assert!(introspection.active);
}

#[tokio::test]
async fn signed_requests_and_responses_round_trip_through_authorize() {
	let fixture = fixture();
	let client_key = key(5, "client");
	let server = key(3, "server");

	fixture.store.insert_client(keyed_client(&client_key));

	let request_object = JarEncoder::new(client_key.signing_key())
		.with_audience(ISSUER)
		.encode(&authorization_request("openid"))
		.expect("Request object should sign.");
	let request = fixture
		.engine
		.jar_decoder()
		.decode(CLIENT_ID, &request_object)
		.await
		.expect("Request object should verify.");

	assert_eq!(request.code_challenge, CODE_CHALLENGE);

	let authorization =
		fixture.engine.authorize(request, subject()).await.expect("Authorization should succeed.");
	let response = fixture
		.engine
		.jarm_encoder(Arc::new(StaticKeyProvider::new(server.signing_key())))
		.encode(CLIENT_ID, &AuthorizationCodeResponse::from(&authorization))
		.await
		.expect("Response should sign.");
	let set = keys::parse_key_set(&server.key_set_document()).expect("Key set should parse.");
	let decoded = JarmDecoder::new(
		Arc::new(StaticKeySet::new(set)),
		fixture.clock.clone(),
		"https://as.example.com/",
	)
	.decode(CLIENT_ID, &response)
	.await
	.expect("Response should verify.");

	assert_eq!(
		decoded,
		AuthorizationCodeResponse::Success { code: authorization.code, state: "xyz".into() }
	);

	let forged = JarEncoder::new(key(6, "forger").signing_key())
		.encode(&authorization_request("openid"))
		.expect("Request object should sign.");
	let err = fixture
		.engine
		.jar_decoder()
		.decode(CLIENT_ID, &forged)
		.await
		.expect_err("Request objects signed with unknown keys should fail.");

	assert_eq!(err.kind(), ErrorKind::InvalidRequest);
}

#[tokio::test]
async fn private_key_jwt_assertions_authenticate_the_client_once() {
	let fixture = fixture();
	let client_key = key(5, "client");

	fixture.store.insert_client(keyed_client(&client_key));

	let mut header = Header::new(Algorithm::ES256);

	header.kid = Some(client_key.kid.clone());

	let exp = START + Duration::minutes(5);
	let claims = serde_json::json!({
		"iss": CLIENT_ID,
		"sub": CLIENT_ID,
		"aud": TOKEN_ENDPOINT,
		"jti": "assertion-1",
		"exp": exp.unix_timestamp(),
	});
	let assertion = jsonwebtoken::encode(
		&header,
		&claims,
		&EncodingKey::from_ec_pem(client_key.pem.as_bytes()).expect("Fixture PEM should load."),
	)
	.expect("Assertion should sign.");
	let verifier = fixture
		.engine
		.client_assertion_verifier()
		.with_audience(TOKEN_ENDPOINT)
		.with_replay_cache(Arc::new(MemoryReplayCache::default()));
	let request = ClientAssertion::jwt_bearer(assertion);
	let client = verifier.authenticate(&request).await.expect("Assertion should authenticate.");

	assert_eq!(client.client_id.to_string(), CLIENT_ID);

	let replay = verifier.authenticate(&request).await.expect_err("Assertions are single use.");

	assert_eq!(replay.kind(), ErrorKind::InvalidClient);
}
