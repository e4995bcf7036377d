use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub keyring: Keyring,
	pub providers: Providers,
	pub backend: Backend,
	pub search: Search,
	pub context: Context,
	pub history: History,
	pub security: Security,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Keyring {
	/// Minutes an unlocked session's key material stays resident before
	/// eviction.
	pub session_ttl_minutes: i64,
	pub max_sessions: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub completion: CompletionProviderConfig,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	/// Upper bound on texts per provider request; longer inputs are split
	/// into ordered sub-batches.
	pub max_batch: u32,
	pub timeout_ms: u64,
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct CompletionProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct Backend {
	pub api_base: String,
	pub api_key: String,
	pub search_path: String,
	pub ownership_path: String,
	/// When true, encrypted hits are round-tripped through the
	/// ownership-validation endpoint before decryption.
	#[serde(default)]
	pub validate_ownership: bool,
	pub timeout_ms: u64,
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct Search {
	pub match_threshold: f32,
	pub match_count: u32,
	pub batch_size: u32,
}

#[derive(Debug, Deserialize)]
pub struct Context {
	pub min_similarity: f32,
	pub max_chunks: u32,
}

#[derive(Debug, Deserialize)]
pub struct History {
	pub max_tokens: u32,
	pub reserved_generation_budget: u32,
	pub max_sessions: u32,
}

#[derive(Debug, Deserialize)]
pub struct Security {
	pub bind_localhost_only: bool,
	pub redact_secrets_in_logs: bool,
	pub api_auth_token: Option<String>,
}
