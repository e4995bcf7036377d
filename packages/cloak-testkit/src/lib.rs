use std::sync::{Arc, Mutex};

use serde_json::Value;
use uuid::Uuid;

use cloak_backend::SearchHit;
use cloak_config::{CompletionProviderConfig, Config, EmbeddingProviderConfig};
use cloak_domain::{Chunk, ChunkPayload, DocumentKind, Provenance};
use cloak_keyring::{KeyMaterial, metadata, text, wire};
use cloak_service::{
	BoxFuture, CloakService, CompletionProvider, EmbeddingProvider, Providers, SearchBackend,
};

/// Root key shared by every test session; [`encoded_root`] is its base64 form.
pub const TEST_ROOT: [u8; 32] = [42; 32];

type CorpusOutcome = Result<Vec<SearchHit>, String>;

/// Embedding provider double: deterministic vectors, or a scripted failure.
pub struct FakeEmbedder {
	failure: Option<String>,
}

/// Completion provider double that returns a fixed answer and records every
/// message list it was called with.
pub struct ScriptedCompleter {
	answer: String,
	failure: Option<String>,
	calls: Mutex<Vec<Vec<Value>>>,
}

/// Search backend double with a fixed outcome per corpus.
///
/// Requests are recorded for assertions. Failures are scripted as messages
/// rather than stored errors, since backend errors do not clone.
pub struct StaticBackend {
	encrypted: CorpusOutcome,
	plaintext: CorpusOutcome,
	owned_ids: Option<Vec<Uuid>>,
	ownership_failure: Option<String>,
	requests: Mutex<Vec<cloak_backend::SearchRequest>>,
}

pub fn encoded_root() -> String {
	wire::encode(&TEST_ROOT)
}

pub fn test_key() -> cloak_keyring::Result<KeyMaterial> {
	KeyMaterial::from_root(&TEST_ROOT)
}

/// Deterministic stand-in embedding: same text, same vector.
pub fn fake_embedding(text: &str, dimensions: usize) -> Vec<f32> {
	let mut reader = blake3::Hasher::new().update(text.as_bytes()).finalize_xof();
	let mut bytes = vec![0_u8; dimensions * 4];

	reader.fill(&mut bytes);

	bytes
		.chunks_exact(4)
		.map(|word| {
			let raw = u32::from_le_bytes([word[0], word[1], word[2], word[3]]);

			(raw as f32 / u32::MAX as f32) * 2.0 - 1.0
		})
		.collect()
}

/// A full configuration wired for tests: local addresses, tiny limits, no
/// real credentials.
pub fn sample_config() -> Config {
	Config {
		service: cloak_config::Service {
			http_bind: "127.0.0.1:8787".to_string(),
			log_level: "info".to_string(),
		},
		keyring: cloak_config::Keyring { session_ttl_minutes: 30, max_sessions: 8 },
		providers: cloak_config::Providers {
			embedding: EmbeddingProviderConfig {
				provider_id: "test-embedding".to_string(),
				api_base: "http://127.0.0.1:9".to_string(),
				api_key: "test-embedding-credential".to_string(),
				path: "/v1/embeddings".to_string(),
				model: "text-embedding-test".to_string(),
				dimensions: 32,
				max_batch: 4,
				timeout_ms: 2_000,
				default_headers: serde_json::Map::new(),
			},
			completion: CompletionProviderConfig {
				provider_id: "test-completion".to_string(),
				api_base: "http://127.0.0.1:9".to_string(),
				api_key: "test-completion-credential".to_string(),
				path: "/v1/chat/completions".to_string(),
				model: "chat-test".to_string(),
				temperature: 0.2,
				timeout_ms: 2_000,
				default_headers: serde_json::Map::new(),
			},
		},
		backend: cloak_config::Backend {
			api_base: "http://127.0.0.1:9".to_string(),
			api_key: "test-backend-credential".to_string(),
			search_path: "/v1/search".to_string(),
			ownership_path: "/v1/ownership/validate".to_string(),
			validate_ownership: false,
			timeout_ms: 2_000,
			default_headers: serde_json::Map::new(),
		},
		search: cloak_config::Search { match_threshold: 0.2, match_count: 10, batch_size: 2 },
		context: cloak_config::Context { min_similarity: 0.5, max_chunks: 6 },
		history: cloak_config::History {
			max_tokens: 2_000,
			reserved_generation_budget: 500,
			max_sessions: 8,
		},
		security: cloak_config::Security {
			bind_localhost_only: true,
			redact_secrets_in_logs: true,
			api_auth_token: None,
		},
	}
}

/// A service wired entirely with test doubles and [`sample_config`].
pub fn test_service(backend: Arc<dyn SearchBackend>, providers: Providers) -> CloakService {
	CloakService::with_providers(sample_config(), backend, providers)
}

/// Unlocks the shared test root on a fresh session and returns its id.
pub async fn unlock_test_session(service: &CloakService) -> cloak_service::ServiceResult<Uuid> {
	let unlocked = service
		.unlock_session(cloak_service::UnlockRequest {
			session_id: None,
			root: Some(encoded_root()),
		})
		.await?;

	Ok(unlocked.session_id)
}

/// An encrypted-corpus hit sealed under `key`, with page provenance.
pub fn sealed_hit(
	key: &KeyMaterial,
	content: &str,
	similarity: f32,
	chunk_number: u32,
) -> cloak_keyring::Result<SearchHit> {
	let provenance = Provenance::Page { number: chunk_number + 1 };
	let json = serde_json::to_string(&provenance).map_err(|err| cloak_keyring::Error::Encryption {
		message: format!("Provenance did not serialize: {err}."),
	})?;
	let chunk = Chunk {
		id: Uuid::new_v4(),
		document_id: Uuid::new_v4(),
		document_name: "quarterly-report".to_string(),
		document_kind: DocumentKind::Document,
		chunk_number,
		payload: ChunkPayload::Sealed {
			encrypted_content: text::encrypt_text(key, content)?,
			encrypted_metadata: Some(metadata::encrypt_metadata(key, &json)?),
		},
	};

	Ok(SearchHit { chunk, similarity })
}

/// A plaintext-corpus hit.
pub fn plain_hit(content: &str, similarity: f32, chunk_number: u32) -> SearchHit {
	let chunk = Chunk {
		id: Uuid::new_v4(),
		document_id: Uuid::new_v4(),
		document_name: "field-notes".to_string(),
		document_kind: DocumentKind::Document,
		chunk_number,
		payload: ChunkPayload::Plain {
			content: content.to_string(),
			metadata: Some(Provenance::Page { number: chunk_number + 1 }),
		},
	};

	SearchHit { chunk, similarity }
}

impl FakeEmbedder {
	pub fn new() -> Self {
		Self { failure: None }
	}

	pub fn failing(message: &str) -> Self {
		Self { failure: Some(message.to_string()) }
	}
}

impl Default for FakeEmbedder {
	fn default() -> Self {
		Self::new()
	}
}

impl EmbeddingProvider for FakeEmbedder {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, cloak_providers::Result<Vec<Vec<f32>>>> {
		Box::pin(async move {
			if let Some(message) = &self.failure {
				return Err(cloak_providers::Error::InvalidResponse { message: message.clone() });
			}

			Ok(texts.iter().map(|text| fake_embedding(text, cfg.dimensions as usize)).collect())
		})
	}
}

impl ScriptedCompleter {
	pub fn new(answer: &str) -> Self {
		Self { answer: answer.to_string(), failure: None, calls: Mutex::new(Vec::new()) }
	}

	pub fn failing(message: &str) -> Self {
		Self {
			answer: String::new(),
			failure: Some(message.to_string()),
			calls: Mutex::new(Vec::new()),
		}
	}

	pub fn last_messages(&self) -> Option<Vec<Value>> {
		self.calls.lock().unwrap_or_else(|err| err.into_inner()).last().cloned()
	}

	pub fn call_count(&self) -> usize {
		self.calls.lock().unwrap_or_else(|err| err.into_inner()).len()
	}
}

impl CompletionProvider for ScriptedCompleter {
	fn complete<'a>(
		&'a self,
		_cfg: &'a CompletionProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, cloak_providers::Result<String>> {
		Box::pin(async move {
			self.calls.lock().unwrap_or_else(|err| err.into_inner()).push(messages.to_vec());

			if let Some(message) = &self.failure {
				return Err(cloak_providers::Error::InvalidResponse { message: message.clone() });
			}

			Ok(self.answer.clone())
		})
	}
}

impl StaticBackend {
	pub fn new(encrypted: Vec<SearchHit>, plaintext: Vec<SearchHit>) -> Self {
		Self::from_outcomes(Ok(encrypted), Ok(plaintext))
	}

	pub fn failing_encrypted(message: &str, plaintext: Vec<SearchHit>) -> Self {
		Self::from_outcomes(Err(message.to_string()), Ok(plaintext))
	}

	pub fn failing_plaintext(encrypted: Vec<SearchHit>, message: &str) -> Self {
		Self::from_outcomes(Ok(encrypted), Err(message.to_string()))
	}

	/// Restrict ownership validation to these chunk ids.
	pub fn with_owned(mut self, ids: Vec<Uuid>) -> Self {
		self.owned_ids = Some(ids);

		self
	}

	pub fn with_ownership_failure(mut self, message: &str) -> Self {
		self.ownership_failure = Some(message.to_string());

		self
	}

	pub fn recorded_requests(&self) -> Vec<cloak_backend::SearchRequest> {
		self.requests.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}

	fn from_outcomes(encrypted: CorpusOutcome, plaintext: CorpusOutcome) -> Self {
		Self {
			encrypted,
			plaintext,
			owned_ids: None,
			ownership_failure: None,
			requests: Mutex::new(Vec::new()),
		}
	}
}

impl SearchBackend for StaticBackend {
	fn search<'a>(
		&'a self,
		request: &'a cloak_backend::SearchRequest,
	) -> BoxFuture<'a, cloak_backend::Result<Vec<SearchHit>>> {
		Box::pin(async move {
			self.requests.lock().unwrap_or_else(|err| err.into_inner()).push(request.clone());

			let outcome = if request.encrypted { &self.encrypted } else { &self.plaintext };

			match outcome {
				Ok(hits) => Ok(hits.clone()),
				Err(message) =>
					Err(cloak_backend::Error::InvalidResponse { message: message.clone() }),
			}
		})
	}

	fn validate_ownership<'a>(
		&'a self,
		chunk_ids: &'a [Uuid],
		_encrypted_contents: &'a [String],
	) -> BoxFuture<'a, cloak_backend::Result<Vec<Uuid>>> {
		Box::pin(async move {
			if let Some(message) = &self.ownership_failure {
				return Err(cloak_backend::Error::InvalidResponse { message: message.clone() });
			}

			match &self.owned_ids {
				Some(owned) =>
					Ok(chunk_ids.iter().filter(|id| owned.contains(id)).copied().collect()),
				None => Ok(chunk_ids.to_vec()),
			}
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn fake_embeddings_are_deterministic_and_sized() {
		let first = fake_embedding("the same text", 32);
		let second = fake_embedding("the same text", 32);
		let other = fake_embedding("different text", 32);

		assert_eq!(first.len(), 32);
		assert_eq!(first, second);
		assert_ne!(first, other);
		assert!(first.iter().all(|value| (-1.0..=1.0).contains(value)));
	}

	#[test]
	fn sealed_hits_open_under_the_test_key() {
		let key = test_key().unwrap();
		let hit = sealed_hit(&key, "hidden body", 0.8, 2).unwrap();
		let ChunkPayload::Sealed { encrypted_content, .. } = &hit.chunk.payload else {
			panic!("sealed_hit built a plaintext payload");
		};
		let opened = text::decrypt_text(&key, &encrypted_content.as_str().into()).unwrap();

		assert_eq!(opened, "hidden body");
	}
}
