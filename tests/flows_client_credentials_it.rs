mod support;

// self
use oauth2_engine::{
	auth::TokenStatus,
	flows::{Grant, TokenLookupRequest, TokenRequest},
	rfc::ErrorKind,
};
use support::*;

fn credentials(issuer: &str, scope: &str) -> Grant {
	Grant::ClientCredentials {
		issuer: issuer.into(),
		scope: scope.into(),
		audience: Some(RESOURCE.into()),
	}
}

#[tokio::test]
async fn client_credentials_issue_tokens_to_the_client_itself() {
	let fixture = fixture();
	let response = fixture
		.engine
		.token(TokenRequest::new(SERVICE_ID, credentials(ISSUER, "read")))
		.await
		.expect("Client credentials should succeed.");

	assert_eq!(response.token_type, "Bearer");
	assert!(response.refresh_token.is_none());

	let introspection = fixture
		.engine
		.introspect(TokenLookupRequest::new(SERVICE_ID, response.access_token))
		.await
		.expect("Introspection should succeed.");

	assert!(introspection.active);
	assert_eq!(introspection.status, TokenStatus::Active);
	assert_eq!(introspection.sub.as_deref(), Some(SERVICE_ID));
	assert_eq!(introspection.client_id.as_deref(), Some(SERVICE_ID));
	assert_eq!(introspection.iss.as_deref(), Some(ISSUER));
	assert_eq!(introspection.aud.as_deref(), Some(RESOURCE));
}

#[tokio::test]
async fn client_credentials_validate_issuer_scope_and_grant() {
	let fixture = fixture();
	let cases = [
		(SERVICE_ID, credentials("", "read"), ErrorKind::InvalidRequest),
		(SERVICE_ID, credentials("not a url", "read"), ErrorKind::InvalidRequest),
		(SERVICE_ID, credentials(ISSUER, "read\"write"), ErrorKind::InvalidScope),
		(CLIENT_ID, credentials(ISSUER, "read"), ErrorKind::UnsupportedGrantType),
		("unknown", credentials(ISSUER, "read"), ErrorKind::InvalidClient),
	];

	for (client_id, grant, expected) in cases {
		let err = fixture
			.engine
			.token(TokenRequest::new(client_id, grant))
			.await
			.expect_err("Invalid client credentials requests should fail.");

		assert_eq!(err.kind(), expected, "client {client_id}");
	}
}

#[tokio::test]
async fn unauthenticated_token_requests_are_rejected() {
	let fixture = fixture();
	let request = TokenRequest {
		client_id: None,
		..TokenRequest::new(SERVICE_ID, credentials(ISSUER, "read"))
	};
	let err = fixture
		.engine
		.token(request)
		.await
		.expect_err("Token requests without a client should fail.");

	assert_eq!(err.kind(), ErrorKind::InvalidClient);
}
