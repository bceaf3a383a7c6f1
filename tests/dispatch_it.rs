#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
// self
use ledger_auth::{
	_preludet::*,
	auth::CredentialPair,
	request::{ApiEnvelope, ApiRequest},
	store::CredentialStore,
};

#[derive(Debug, Deserialize)]
struct Record {
	id: String,
}

#[tokio::test]
async fn concurrent_unauthorized_requests_trigger_one_refresh() {
	let server = MockServer::start_async().await;
	let (session, store) = build_reqwest_test_session(test_config(&server.base_url()));
	let expired = server
		.mock_async(|when, then| {
			when.method(GET).path_prefix("/records/").header("authorization", "Bearer T1");
			then.status(401).json_body(serde_json::json!({ "success": false, "message": "Expired." }));
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/auth/refresh")
				.json_body(serde_json::json!({ "refreshToken": "R1" }));
			then.status(200)
				.delay(std::time::Duration::from_millis(300))
				.json_body(serde_json::json!({ "success": true, "data": { "accessToken": "T2" } }));
		})
		.await;
	let first = server
		.mock_async(|when, then| {
			when.method(GET).path("/records/a").header("authorization", "Bearer T2");
			then.status(200).json_body(serde_json::json!({ "success": true, "data": { "id": "a" } }));
		})
		.await;
	let second = server
		.mock_async(|when, then| {
			when.method(GET).path("/records/b").header("authorization", "Bearer T2");
			then.status(200).json_body(serde_json::json!({ "success": true, "data": { "id": "b" } }));
		})
		.await;

	store.persist(CredentialPair::new("T1", "R1")).expect("Seeding the store should succeed.");

	let (a, b): (Result<ApiEnvelope<Record>>, Result<ApiEnvelope<Record>>) = tokio::join!(
		session.request(ApiRequest::get("/records/a")),
		session.request(ApiRequest::get("/records/b")),
	);

	assert_eq!(a.expect("Request A should be replayed.").data.id, "a");
	assert_eq!(b.expect("Request B should be replayed.").data.id, "b");

	expired.assert_calls_async(2).await;
	refresh.assert_calls_async(1).await;
	first.assert_calls_async(1).await;
	second.assert_calls_async(1).await;

	// The refresh response did not rotate the refresh credential.
	assert_eq!(store.snapshot(), Some(CredentialPair::new("T2", "R1")));
	assert_eq!(session.refresh_metrics().attempts(), 1);
}

#[tokio::test]
async fn rotated_refresh_credential_replaces_stored_one() {
	let server = MockServer::start_async().await;
	let (session, store) = build_reqwest_test_session(test_config(&server.base_url()));

	server
		.mock_async(|when, then| {
			when.method(GET).path("/records").header("authorization", "Bearer T1");
			then.status(401);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(200).json_body(serde_json::json!({
				"success": true,
				"data": { "accessToken": "T2", "refreshToken": "R2" }
			}));
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/records").header("authorization", "Bearer T2");
			then.status(200).json_body(serde_json::json!({ "success": true, "data": [] }));
		})
		.await;

	store.persist(CredentialPair::new("T1", "R1")).expect("Seeding the store should succeed.");
	session
		.request::<Vec<serde_json::Value>>(ApiRequest::get("/records"))
		.await
		.expect("Replay should succeed.");

	assert_eq!(store.snapshot(), Some(CredentialPair::new("T2", "R2")));
}

#[tokio::test]
async fn replayed_unauthorized_is_not_retried_again() {
	let server = MockServer::start_async().await;
	let (session, store) = build_reqwest_test_session(test_config(&server.base_url()));
	let records = server
		.mock_async(|when, then| {
			when.method(GET).path("/records");
			then.status(401).json_body(serde_json::json!({ "success": false, "message": "Nope." }));
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(200)
				.json_body(serde_json::json!({ "success": true, "data": { "accessToken": "T2" } }));
		})
		.await;

	store.persist(CredentialPair::new("T1", "R1")).expect("Seeding the store should succeed.");

	let err = session
		.request::<serde_json::Value>(ApiRequest::get("/records"))
		.await
		.expect_err("Second 401 should be terminal.");

	records.assert_calls_async(2).await;
	refresh.assert_calls_async(1).await;

	assert!(err.requires_login());
	assert_eq!(err.status(), Some(401));
}

#[tokio::test]
async fn server_errors_pass_through_with_retry_hint() {
	let server = MockServer::start_async().await;
	let (session, store) = build_reqwest_test_session(test_config(&server.base_url()));
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/records");
			then.status(503).header("retry-after", "7").body("upstream down");
		})
		.await;

	store.persist(CredentialPair::new("T1", "R1")).expect("Seeding the store should succeed.");

	let err = session
		.request::<serde_json::Value>(
			ApiRequest::post("/records")
				.json(&serde_json::json!({ "amount": 12 }))
				.expect("Body should serialize."),
		)
		.await
		.expect_err("503 should surface.");

	mock.assert_calls_async(1).await;

	match err {
		Error::Api { status, message, retry_after } => {
			assert_eq!(status, 503);
			assert_eq!(message, "Request failed with status 503.");
			assert_eq!(retry_after, Some(Duration::seconds(7)));
		},
		other => panic!("Unexpected error variant: {other:?}."),
	}
}
