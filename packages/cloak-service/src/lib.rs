pub mod ask;
pub mod decrypt;
pub mod ingest;
pub mod redact;
pub mod search;
pub mod session;

use std::{future::Future, pin::Pin, sync::Arc};

use serde_json::Value;
use uuid::Uuid;

pub use ask::{AskRequest, AskResponse};
use cloak_backend::{BackendClient, SearchHit};
use cloak_config::{CompletionProviderConfig, Config, EmbeddingProviderConfig};
pub use decrypt::DecryptOutcome;
pub use ingest::{IngestChunk, IngestRequest, IngestResponse, SealedChunk};
pub use search::{SearchRequest, SearchResponse, SourceReport, SourceStatus};
pub use session::{
	ChatStore, CreateChatRequest, KeyStore, SelectionRequest, UnlockRequest, UnlockResponse,
};

pub type ServiceResult<T> = Result<T, ServiceError>;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, cloak_providers::Result<Vec<Vec<f32>>>>;
}

pub trait CompletionProvider
where
	Self: Send + Sync,
{
	fn complete<'a>(
		&'a self,
		cfg: &'a CompletionProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, cloak_providers::Result<String>>;
}

pub trait SearchBackend
where
	Self: Send + Sync,
{
	fn search<'a>(
		&'a self,
		request: &'a cloak_backend::SearchRequest,
	) -> BoxFuture<'a, cloak_backend::Result<Vec<SearchHit>>>;

	fn validate_ownership<'a>(
		&'a self,
		chunk_ids: &'a [Uuid],
		encrypted_contents: &'a [String],
	) -> BoxFuture<'a, cloak_backend::Result<Vec<Uuid>>>;
}

#[derive(Debug)]
pub enum ServiceError {
	InvalidRequest { message: String },
	KeyUnavailable { message: String },
	Embedding { message: String },
	Provider { message: String },
	Crypto { message: String },
	Cancelled,
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub completion: Arc<dyn CompletionProvider>,
}

pub struct CloakService {
	pub cfg: Config,
	pub backend: Arc<dyn SearchBackend>,
	pub providers: Providers,
	pub keys: KeyStore,
	pub chats: ChatStore,
}

struct DefaultProviders;

impl std::fmt::Display for ServiceError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::InvalidRequest { message } => write!(f, "Invalid request: {message}"),
			Self::KeyUnavailable { message } => write!(f, "Key unavailable: {message}"),
			Self::Embedding { message } => write!(f, "Embedding error: {message}"),
			Self::Provider { message } => write!(f, "Provider error: {message}"),
			Self::Crypto { message } => write!(f, "Crypto error: {message}"),
			Self::Cancelled => write!(f, "Cancelled before completion."),
		}
	}
}

impl std::error::Error for ServiceError {}

impl From<cloak_keyring::Error> for ServiceError {
	fn from(err: cloak_keyring::Error) -> Self {
		match err {
			cloak_keyring::Error::InvalidKey { message } => Self::InvalidRequest { message },
			cloak_keyring::Error::Decryption { message }
			| cloak_keyring::Error::Encryption { message } => Self::Crypto { message },
		}
	}
}

impl From<cloak_providers::Error> for ServiceError {
	fn from(err: cloak_providers::Error) -> Self {
		Self::Provider { message: err.to_string() }
	}
}

impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, cloak_providers::Result<Vec<Vec<f32>>>> {
		Box::pin(cloak_providers::embedding::embed(cfg, texts))
	}
}

impl CompletionProvider for DefaultProviders {
	fn complete<'a>(
		&'a self,
		cfg: &'a CompletionProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, cloak_providers::Result<String>> {
		Box::pin(cloak_providers::completion::complete(cfg, messages))
	}
}

impl SearchBackend for BackendClient {
	fn search<'a>(
		&'a self,
		request: &'a cloak_backend::SearchRequest,
	) -> BoxFuture<'a, cloak_backend::Result<Vec<SearchHit>>> {
		Box::pin(BackendClient::search(self, request))
	}

	fn validate_ownership<'a>(
		&'a self,
		chunk_ids: &'a [Uuid],
		encrypted_contents: &'a [String],
	) -> BoxFuture<'a, cloak_backend::Result<Vec<Uuid>>> {
		Box::pin(BackendClient::validate_ownership(self, chunk_ids, encrypted_contents))
	}
}

impl Providers {
	pub fn new(
		embedding: Arc<dyn EmbeddingProvider>,
		completion: Arc<dyn CompletionProvider>,
	) -> Self {
		Self { embedding, completion }
	}
}

impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { embedding: provider.clone(), completion: provider }
	}
}

impl CloakService {
	pub fn new(cfg: Config, backend: Arc<dyn SearchBackend>) -> Self {
		Self::with_providers(cfg, backend, Providers::default())
	}

	pub fn with_providers(
		cfg: Config,
		backend: Arc<dyn SearchBackend>,
		providers: Providers,
	) -> Self {
		let keys = KeyStore::new(&cfg.keyring);
		let chats = ChatStore::new(cfg.history.max_sessions);

		Self { cfg, backend, providers, keys, chats }
	}
}

pub(crate) async fn embed_query(
	cfg: &Config,
	providers: &Providers,
	text: &str,
) -> ServiceResult<Vec<f32>> {
	let embeddings = providers
		.embedding
		.embed(&cfg.providers.embedding, &[text.to_string()])
		.await
		.map_err(|err| ServiceError::Embedding { message: err.to_string() })?;
	let Some(vector) = embeddings.into_iter().next() else {
		return Err(ServiceError::Embedding {
			message: "Embedding provider returned no vectors.".to_string(),
		});
	};

	Ok(vector)
}
