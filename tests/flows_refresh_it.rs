mod support;

// crates.io
use time::Duration;
// self
use oauth2_engine::{
	flows::{Grant, TokenRequest},
	rfc::ErrorKind,
};
use support::*;

const OFFLINE: &str = "openid offline_access profile";

async fn refresh_token(fixture: &Fixture) -> String {
	sign_in(fixture, OFFLINE)
		.await
		.refresh_token
		.expect("Offline sign-in should issue a refresh token.")
}

#[tokio::test]
async fn refresh_keeps_the_token_until_an_access_token_would_outlive_it() {
	let fixture = fixture();
	let refresh = refresh_token(&fixture).await;
	let response = fixture
		.engine
		.token(TokenRequest::new(CLIENT_ID, refresh_grant(&refresh)))
		.await
		.expect("Refresh should succeed.");

	assert_eq!(response.expires_in, 3600);
	assert!(response.refresh_token.is_none());

	fixture.clock.set(START + Duration::days(7) - Duration::minutes(30));

	let rotated = fixture
		.engine
		.token(TokenRequest::new(CLIENT_ID, refresh_grant(&refresh)))
		.await
		.expect("Refresh near expiry should rotate.");
	let replacement = rotated.refresh_token.expect("Rotation should return a new refresh token.");

	assert_ne!(replacement, refresh);

	let stale = fixture
		.engine
		.token(TokenRequest::new(CLIENT_ID, refresh_grant(&refresh)))
		.await
		.expect_err("Rotated refresh tokens should stop working.");

	assert_eq!(stale.kind(), ErrorKind::InvalidRequest);

	fixture
		.engine
		.token(TokenRequest::new(CLIENT_ID, refresh_grant(&replacement)))
		.await
		.expect("Replacement refresh token should work.");
}

#[tokio::test]
async fn concurrent_rotations_yield_a_single_replacement() {
	let fixture = fixture();
	let refresh = refresh_token(&fixture).await;

	fixture.clock.set(START + Duration::days(7) - Duration::minutes(30));

	let first = fixture.engine.token(TokenRequest::new(CLIENT_ID, refresh_grant(&refresh)));
	let second = fixture.engine.token(TokenRequest::new(CLIENT_ID, refresh_grant(&refresh)));
	let (first, second) = tokio::join!(first, second);
	let rotated = [first, second]
		.into_iter()
		.filter_map(Result::ok)
		.filter(|response| response.refresh_token.is_some())
		.count();

	assert_eq!(rotated, 1);
}

#[tokio::test]
async fn refresh_can_narrow_but_not_widen_scope() {
	let fixture = fixture();
	let refresh = refresh_token(&fixture).await;
	let narrowed = fixture
		.engine
		.token(TokenRequest::new(
			CLIENT_ID,
			Grant::RefreshToken {
				issuer: ISSUER.into(),
				refresh_token: refresh.clone(),
				scope: Some("openid".into()),
			},
		))
		.await
		.expect("Narrowed refresh should succeed.");

	assert_eq!(narrowed.scope.as_deref(), Some("openid"));

	let err = fixture
		.engine
		.token(TokenRequest::new(
			CLIENT_ID,
			Grant::RefreshToken {
				issuer: ISSUER.into(),
				refresh_token: refresh,
				scope: Some("openid email".into()),
			},
		))
		.await
		.expect_err("Widened refresh should fail.");

	assert_eq!(err.kind(), ErrorKind::InvalidScope);
}

#[tokio::test]
async fn access_tokens_cannot_be_used_as_refresh_tokens() {
	let fixture = fixture();
	let access = sign_in(&fixture, OFFLINE).await.access_token;
	let err = fixture
		.engine
		.token(TokenRequest::new(CLIENT_ID, refresh_grant(&access)))
		.await
		.expect_err("Access tokens should not refresh.");

	assert_eq!(err.kind(), ErrorKind::InvalidRequest);

	let blank_issuer = fixture
		.engine
		.token(TokenRequest::new(
			CLIENT_ID,
			Grant::RefreshToken { issuer: String::new(), refresh_token: access, scope: None },
		))
		.await
		.expect_err("A blank issuer should be rejected.");

	assert_eq!(blank_issuer.kind(), ErrorKind::InvalidRequest);
}
