mod support;

// crates.io
use time::Duration;
// self
use oauth2_engine::{
	auth::DeviceAuthorizationRequest,
	flows::{Grant, TokenRequest},
	rfc::ErrorKind,
};
use support::*;

fn poll(device_code: &str) -> TokenRequest {
	TokenRequest::new(CLIENT_ID, Grant::DeviceCode { device_code: device_code.into() })
}

fn device_request() -> DeviceAuthorizationRequest {
	DeviceAuthorizationRequest {
		client_id: CLIENT_ID.into(),
		scope: "openid profile".into(),
		..Default::default()
	}
}

#[tokio::test]
async fn device_flow_moves_from_pending_to_a_single_token() {
	let fixture = fixture();
	let codes = fixture
		.engine
		.device_authorize(device_request())
		.await
		.expect("Device authorization should succeed.");

	assert_eq!(codes.interval, 5);

	let pending = fixture
		.engine
		.token(poll(&codes.device_code))
		.await
		.expect_err("Polling before validation should be pending.");

	assert_eq!(pending.kind(), ErrorKind::AuthorizationPending);

	let validation = fixture
		.engine
		.validate_user_code(subject(), &codes.user_code)
		.await
		.expect("User code should validate.");

	assert_eq!(validation.subject, subject());
	assert_eq!(validation.scope, scope("openid profile"));

	let response = fixture
		.engine
		.token(poll(&codes.device_code))
		.await
		.expect("Validated device codes should redeem.");

	assert_eq!(response.token_type, "Bearer");
	assert_eq!(response.scope.as_deref(), Some("openid profile"));
	assert!(response.refresh_token.is_none());

	let reuse = fixture
		.engine
		.token(poll(&codes.device_code))
		.await
		.expect_err("Device codes should redeem once.");

	assert_eq!(reuse.kind(), ErrorKind::InvalidToken);
}

#[tokio::test]
async fn user_codes_validate_once() {
	let fixture = fixture();
	let codes = fixture
		.engine
		.device_authorize(device_request())
		.await
		.expect("Device authorization should succeed.");

	fixture
		.engine
		.validate_user_code(subject(), &codes.user_code)
		.await
		.expect("First validation should succeed.");

	let err = fixture
		.engine
		.validate_user_code(subject(), &codes.user_code)
		.await
		.expect_err("Second validation should fail.");

	assert_eq!(err.kind(), ErrorKind::InvalidRequest);
}

#[tokio::test]
async fn expired_device_codes_report_expired_token() {
	let fixture = fixture();
	let codes = fixture
		.engine
		.device_authorize(device_request())
		.await
		.expect("Device authorization should succeed.");

	fixture.clock.advance(Duration::minutes(10));

	let poll_err = fixture
		.engine
		.token(poll(&codes.device_code))
		.await
		.expect_err("Expired device codes should not redeem.");
	let validate_err = fixture
		.engine
		.validate_user_code(subject(), &codes.user_code)
		.await
		.expect_err("Expired user codes should not validate.");

	assert_eq!(poll_err.kind(), ErrorKind::ExpiredToken);
	assert_eq!(validate_err.kind(), ErrorKind::ExpiredToken);
}

#[tokio::test]
async fn device_codes_are_bound_to_their_client() {
	let fixture = fixture();
	let codes = fixture
		.engine
		.device_authorize(device_request())
		.await
		.expect("Device authorization should succeed.");
	let err = fixture
		.engine
		.token(TokenRequest::new(
			SERVICE_ID,
			Grant::DeviceCode { device_code: codes.device_code.clone() },
		))
		.await
		.expect_err("Clients without the device grant should be refused.");

	assert_eq!(err.kind(), ErrorKind::UnsupportedGrantType);

	let unknown = fixture
		.engine
		.token(poll("not-a-device-code"))
		.await
		.expect_err("Unknown device codes should be rejected.");

	assert_eq!(unknown.kind(), ErrorKind::InvalidRequest);
}
