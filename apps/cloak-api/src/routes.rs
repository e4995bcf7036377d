use axum::{
	Json, Router,
	extract::{Path, Request, State},
	http::{StatusCode, header},
	middleware::{self, Next},
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use cloak_domain::ChatState;
use cloak_service::{
	AskRequest, AskResponse, CreateChatRequest, IngestRequest, IngestResponse, SearchRequest,
	SearchResponse, SelectionRequest, ServiceError, UnlockRequest, UnlockResponse,
};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/v1/session/unlock", post(unlock_session))
		.route("/v1/session/lock", post(lock_session))
		.route("/v1/chat/create", post(create_chat))
		.route("/v1/chat/select", post(select_scope))
		.route("/v1/chat/{chat_id}", get(chat_state))
		.route("/v1/search", post(search))
		.route("/v1/ask", post(ask))
		.route("/v1/ingest/encrypt", post(ingest_encrypt))
		.layer(middleware::from_fn_with_state(state.clone(), require_auth))
		.route("/health", get(health))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

/// Bearer-token gate for the /v1 surface, active only when a token is
/// configured. /health stays open either way.
async fn require_auth(
	State(state): State<AppState>,
	request: Request,
	next: Next,
) -> Result<Response, ApiError> {
	let Some(expected) = state.service.cfg.security.api_auth_token.as_deref() else {
		return Ok(next.run(request).await);
	};
	let presented = request
		.headers()
		.get(header::AUTHORIZATION)
		.and_then(|value| value.to_str().ok())
		.and_then(|value| value.strip_prefix("Bearer "));

	if presented != Some(expected) {
		return Err(json_error(
			StatusCode::UNAUTHORIZED,
			"unauthorized",
			"Missing or invalid API token.",
			None,
		));
	}

	Ok(next.run(request).await)
}

#[derive(Debug, Deserialize)]
pub struct LockRequest {
	pub session_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct LockResponse {
	pub locked: bool,
}

async fn unlock_session(
	State(state): State<AppState>,
	Json(payload): Json<UnlockRequest>,
) -> Result<Json<UnlockResponse>, ApiError> {
	let response = state.service.unlock_session(payload).await?;

	Ok(Json(response))
}

async fn lock_session(
	State(state): State<AppState>,
	Json(payload): Json<LockRequest>,
) -> Result<Json<LockResponse>, ApiError> {
	let locked = state.service.lock_session(payload.session_id).await?;

	Ok(Json(LockResponse { locked }))
}

async fn create_chat(
	State(state): State<AppState>,
	Json(payload): Json<CreateChatRequest>,
) -> Result<Json<ChatState>, ApiError> {
	let response = state.service.create_chat(payload).await?;

	Ok(Json(response))
}

async fn select_scope(
	State(state): State<AppState>,
	Json(payload): Json<SelectionRequest>,
) -> Result<Json<ChatState>, ApiError> {
	let response = state.service.select_scope(payload).await?;

	Ok(Json(response))
}

async fn chat_state(
	State(state): State<AppState>,
	Path(chat_id): Path<Uuid>,
) -> Result<Json<ChatState>, ApiError> {
	let response = state.service.chat_state(chat_id).await?;

	Ok(Json(response))
}

async fn search(
	State(state): State<AppState>,
	Json(payload): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
	let response = state.service.search(payload, &CancellationToken::new()).await?;

	Ok(Json(response))
}

async fn ask(
	State(state): State<AppState>,
	Json(payload): Json<AskRequest>,
) -> Result<Json<AskResponse>, ApiError> {
	let response = state.service.ask(payload, &CancellationToken::new()).await?;

	Ok(Json(response))
}

async fn ingest_encrypt(
	State(state): State<AppState>,
	Json(payload): Json<IngestRequest>,
) -> Result<Json<IngestResponse>, ApiError> {
	let response = state.service.encrypt_for_ingest(payload, &CancellationToken::new()).await?;

	Ok(Json(response))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}

impl ApiError {
	fn new(
		status: StatusCode,
		error_code: impl Into<String>,
		message: impl Into<String>,
		fields: Option<Vec<String>>,
	) -> Self {
		Self { status, error_code: error_code.into(), message: message.into(), fields }
	}
}

pub fn json_error(
	status: StatusCode,
	code: &str,
	message: impl Into<String>,
	fields: Option<Vec<String>>,
) -> ApiError {
	ApiError::new(status, code, message, fields)
}

impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		let message = err.to_string();

		match err {
			ServiceError::InvalidRequest { .. } =>
				json_error(StatusCode::UNPROCESSABLE_ENTITY, "invalid_request", message, None),
			ServiceError::KeyUnavailable { .. } =>
				json_error(StatusCode::UNAUTHORIZED, "key_unavailable", message, None),
			ServiceError::Embedding { .. } =>
				json_error(StatusCode::BAD_GATEWAY, "embedding_failed", message, None),
			ServiceError::Provider { .. } =>
				json_error(StatusCode::BAD_GATEWAY, "provider_failed", message, None),
			ServiceError::Crypto { .. } =>
				json_error(StatusCode::INTERNAL_SERVER_ERROR, "crypto_failed", message, None),
			ServiceError::Cancelled =>
				json_error(StatusCode::REQUEST_TIMEOUT, "cancelled", message, None),
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody {
			error_code: self.error_code,
			message: self.message,
			fields: self.fields,
		};

		(self.status, Json(body)).into_response()
	}
}
