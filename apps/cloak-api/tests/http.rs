use std::sync::Arc;

use axum::{
	Router,
	body::{self, Body},
	http::{Request, StatusCode},
};
use serde_json::{Value, json};
use tower::util::ServiceExt;
use uuid::Uuid;

use cloak_api::{routes, state::AppState};
use cloak_service::{CloakService, Providers};
use cloak_testkit::{
	FakeEmbedder, ScriptedCompleter, StaticBackend, encoded_root, plain_hit, sample_config,
	sealed_hit, test_key, test_service,
};

fn test_app(backend: StaticBackend) -> Router {
	let providers = Providers::new(
		Arc::new(FakeEmbedder::new()),
		Arc::new(ScriptedCompleter::new("Grounded answer.")),
	);
	let service = test_service(Arc::new(backend), providers);

	routes::router(AppState::with_service(service))
}

async fn post_json(app: Router, uri: &str, payload: Value) -> (StatusCode, Value) {
	let request = Request::builder()
		.method("POST")
		.uri(uri)
		.header("content-type", "application/json")
		.body(Body::from(payload.to_string()))
		.unwrap();
	let response = app.oneshot(request).await.unwrap();
	let status = response.status();
	let bytes = body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
	let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

	(status, value)
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
	let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
	let response = app.oneshot(request).await.unwrap();
	let status = response.status();
	let bytes = body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
	let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

	(status, value)
}

#[tokio::test]
async fn health_answers_without_a_token() {
	let app = test_app(StaticBackend::new(Vec::new(), Vec::new()));
	let (status, _) = get_json(app, "/health").await;

	assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn unlock_search_and_ask_flow_over_http() {
	let key = test_key().unwrap();
	let encrypted = vec![sealed_hit(&key, "The launch is planned for March.", 0.9, 0).unwrap()];
	let plaintext = vec![plain_hit("Older planning notes.", 0.6, 0)];
	let app = test_app(StaticBackend::new(encrypted, plaintext));
	let (status, unlocked) =
		post_json(app.clone(), "/v1/session/unlock", json!({ "root": encoded_root() })).await;

	assert_eq!(status, StatusCode::OK);
	assert!(unlocked["fingerprint"].is_string());

	let session_id = unlocked["session_id"].clone();
	let (status, searched) = post_json(
		app.clone(),
		"/v1/search",
		json!({ "session_id": session_id, "query": "when is the launch" }),
	)
	.await;

	assert_eq!(status, StatusCode::OK);

	let results = searched["results"].as_array().unwrap();

	assert_eq!(results.len(), 2);
	assert_eq!(results[0]["chunk"]["payload"]["content"], "The launch is planned for March.");
	assert_eq!(results[0]["is_decrypted"], true);
	assert_eq!(searched["sources"]["encrypted"], "ok");
	assert_eq!(searched["sources"]["plaintext"], "ok");

	let (status, chat) =
		post_json(app.clone(), "/v1/chat/create", json!({ "model_id": "chat-test" })).await;

	assert_eq!(status, StatusCode::OK);

	let chat_id = chat["id"].as_str().unwrap().to_string();
	let (status, answered) = post_json(
		app.clone(),
		"/v1/ask",
		json!({
			"session_id": session_id,
			"chat_id": chat_id,
			"question": "When is the launch?",
		}),
	)
	.await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(answered["answer"], "Grounded answer.");
	assert_eq!(answered["context"]["total_chunks"], 2);

	let (status, stored) = get_json(app, &format!("/v1/chat/{chat_id}")).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(stored["messages"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn searching_without_a_key_maps_to_unauthorized() {
	let app = test_app(StaticBackend::new(Vec::new(), Vec::new()));
	let (status, body) = post_json(
		app,
		"/v1/search",
		json!({ "session_id": Uuid::new_v4(), "query": "anything" }),
	)
	.await;

	assert_eq!(status, StatusCode::UNAUTHORIZED);
	assert_eq!(body["error_code"], "key_unavailable");
}

#[tokio::test]
async fn a_blank_query_maps_to_unprocessable() {
	let app = test_app(StaticBackend::new(Vec::new(), Vec::new()));
	let (status, body) = post_json(
		app,
		"/v1/search",
		json!({ "session_id": Uuid::new_v4(), "query": "   " }),
	)
	.await;

	assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
	assert_eq!(body["error_code"], "invalid_request");
}

#[tokio::test]
async fn a_configured_api_token_gates_the_v1_surface() {
	let mut cfg = sample_config();

	cfg.security.api_auth_token = Some("sekrit".to_string());

	let providers = Providers::new(
		Arc::new(FakeEmbedder::new()),
		Arc::new(ScriptedCompleter::new("unused")),
	);
	let service = CloakService::with_providers(
		cfg,
		Arc::new(StaticBackend::new(Vec::new(), Vec::new())),
		providers,
	);
	let app = routes::router(AppState::with_service(service));
	let (status, body) = post_json(app.clone(), "/v1/session/unlock", json!({})).await;

	assert_eq!(status, StatusCode::UNAUTHORIZED);
	assert_eq!(body["error_code"], "unauthorized");

	let (status, _) = get_json(app.clone(), "/health").await;

	assert_eq!(status, StatusCode::OK);

	let request = Request::builder()
		.method("POST")
		.uri("/v1/session/unlock")
		.header("content-type", "application/json")
		.header("authorization", "Bearer sekrit")
		.body(Body::from(json!({}).to_string()))
		.unwrap();
	let response = app.oneshot(request).await.unwrap();

	assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn ingest_returns_only_sealed_fields() {
	let app = test_app(StaticBackend::new(Vec::new(), Vec::new()));
	let (_, unlocked) =
		post_json(app.clone(), "/v1/session/unlock", json!({ "root": encoded_root() })).await;
	let session_id = unlocked["session_id"].clone();
	let (status, sealed) = post_json(
		app,
		"/v1/ingest/encrypt",
		json!({
			"session_id": session_id,
			"document_id": Uuid::new_v4(),
			"chunks": [{
				"content": "Plans for the quarter.",
				"metadata": { "kind": "page", "number": 1 },
			}],
		}),
	)
	.await;

	assert_eq!(status, StatusCode::OK);

	let chunk = &sealed["chunks"][0];

	assert_eq!(chunk["chunk_number"], 0);
	assert!(chunk["encrypted_metadata"].is_string());

	let key = test_key().unwrap();
	let opened = cloak_keyring::text::decrypt_text(
		&key,
		&chunk["encrypted_content"].as_str().unwrap().into(),
	)
	.unwrap();

	assert_eq!(opened, "Plans for the quarter.");
}
