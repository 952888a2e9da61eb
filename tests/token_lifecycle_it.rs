mod support;

// crates.io
use time::Duration;
// self
use oauth2_engine::{
	auth::{TokenStatus, TokenType},
	flows::{IntrospectionResponse, TokenLookupRequest},
	rfc::ErrorKind,
};
use support::*;

#[tokio::test]
async fn introspection_tracks_the_token_lifecycle() {
	let fixture = fixture();
	let access = sign_in(&fixture, "openid profile").await.access_token;
	let active = fixture
		.engine
		.introspect(TokenLookupRequest::new(CLIENT_ID, access.clone()))
		.await
		.expect("Introspection should succeed.");

	assert!(active.active);
	assert_eq!(active.token_type, Some(TokenType::Access));
	assert_eq!(active.scope.as_deref(), Some("openid profile"));
	assert_eq!(active.exp, Some((START + Duration::hours(1)).unix_timestamp()));

	let status = fixture
		.engine
		.revoke(TokenLookupRequest::new(CLIENT_ID, access.clone()))
		.await
		.expect("Owner should revoke its token.");

	assert_eq!(status, TokenStatus::Revoked);

	let revoked = fixture
		.engine
		.introspect(TokenLookupRequest::new(CLIENT_ID, access))
		.await
		.expect("Introspection should succeed.");

	assert_eq!(revoked, IntrospectionResponse::inactive(TokenStatus::Revoked));
}

#[tokio::test]
async fn unknown_and_expired_tokens_introspect_as_invalid() {
	let fixture = fixture();
	let access = sign_in(&fixture, "openid").await.access_token;
	let unknown = fixture
		.engine
		.introspect(TokenLookupRequest::new(CLIENT_ID, "unknown"))
		.await
		.expect("Unknown tokens are not an error.");

	assert_eq!(unknown, IntrospectionResponse::inactive(TokenStatus::Invalid));

	fixture.clock.advance(Duration::hours(1));

	let expired = fixture
		.engine
		.introspect(TokenLookupRequest::new(CLIENT_ID, access))
		.await
		.expect("Introspection should succeed.");

	assert!(!expired.active);
	assert_eq!(expired.status, TokenStatus::Invalid);
	assert!(expired.sub.is_none());
}

#[tokio::test]
async fn clients_can_only_revoke_their_own_tokens() {
	let fixture = fixture();
	let access = sign_in(&fixture, "openid").await.access_token;
	let foreign = fixture
		.engine
		.revoke(TokenLookupRequest::new(SERVICE_ID, access.clone()))
		.await
		.expect_err("Foreign tokens should not be revocable.");
	let unknown = fixture
		.engine
		.revoke(TokenLookupRequest::new(CLIENT_ID, "unknown"))
		.await
		.expect_err("Unknown tokens should be reported.");

	assert!(foreign.is_unknown_token());
	assert!(unknown.is_unknown_token());

	let still_active = fixture
		.engine
		.introspect(TokenLookupRequest::new(CLIENT_ID, access))
		.await
		.expect("Introspection should succeed.");

	assert!(still_active.active);
}

#[tokio::test]
async fn lookups_require_an_authenticated_client_and_a_token() {
	let fixture = fixture();
	let anonymous = fixture
		.engine
		.introspect(TokenLookupRequest { client_id: None, token: "anything".into() })
		.await
		.expect_err("Anonymous introspection should fail.");
	let blank = fixture
		.engine
		.revoke(TokenLookupRequest::new(CLIENT_ID, ""))
		.await
		.expect_err("Blank tokens should fail.");

	assert_eq!(anonymous.kind(), ErrorKind::InvalidClient);
	assert_eq!(blank.kind(), ErrorKind::InvalidRequest);
}
