use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
	Document,
	WebPage,
	Transcript,
}
impl DocumentKind {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Document => "document",
			Self::WebPage => "web_page",
			Self::Transcript => "transcript",
		}
	}
}

/// Source attribution carried alongside a chunk's text. Serialized compactly
/// and sealed with the deterministic metadata cipher on the encrypted corpus.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Provenance {
	Page { number: u32 },
	Web { url: String, title: Option<String> },
	Transcript { timestamp: String },
}

/// A chunk from the plaintext corpus never carries ciphertext fields, and an
/// encrypted-corpus chunk never carries cleartext ones; the two states are
/// therefore separate variants rather than optional fields.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum ChunkPayload {
	Plain {
		content: String,
		metadata: Option<Provenance>,
	},
	/// Ciphertext fields in the canonical wire encoding (base64 text).
	Sealed {
		encrypted_content: String,
		encrypted_metadata: Option<String>,
	},
}
impl ChunkPayload {
	pub fn is_sealed(&self) -> bool {
		matches!(self, Self::Sealed { .. })
	}

	pub fn content(&self) -> Option<&str> {
		match self {
			Self::Plain { content, .. } => Some(content),
			Self::Sealed { .. } => None,
		}
	}

	pub fn metadata(&self) -> Option<&Provenance> {
		match self {
			Self::Plain { metadata, .. } => metadata.as_ref(),
			Self::Sealed { .. } => None,
		}
	}
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Chunk {
	pub id: Uuid,
	pub document_id: Uuid,
	pub document_name: String,
	pub document_kind: DocumentKind,
	pub chunk_number: u32,
	pub payload: ChunkPayload,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SearchResult {
	pub chunk: Chunk,
	pub similarity: f32,
	pub is_decrypted: bool,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ContextChunk {
	pub chunk_number: u32,
	pub text: String,
	pub similarity: f32,
	pub provenance: Option<Provenance>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ContextDocument {
	pub document_id: Uuid,
	pub name: String,
	pub kind: DocumentKind,
	pub chunks: Vec<ContextChunk>,
}

/// Built once per query and discarded after the completion call.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct RetrievedContext {
	pub query: String,
	pub documents: Vec<ContextDocument>,
	pub total_chunks: u32,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
	User,
	Assistant,
	System,
}
impl Role {
	pub fn is_system(self) -> bool {
		matches!(self, Self::System)
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::User => "user",
			Self::Assistant => "assistant",
			Self::System => "system",
		}
	}
}

/// Immutable once created; history trimming works on copies and never
/// rewrites stored messages.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ChatMessage {
	pub id: Uuid,
	pub role: Role,
	pub content: String,
	#[serde(with = "crate::time_serde")]
	pub timestamp: OffsetDateTime,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ChatState {
	pub id: Uuid,
	pub messages: Vec<ChatMessage>,
	pub model_id: String,
	pub settings: serde_json::Value,
	pub selected_document_ids: Vec<Uuid>,
	pub selected_project_ids: Vec<Uuid>,
}
impl ChatState {
	pub fn new(id: Uuid, model_id: impl Into<String>) -> Self {
		Self {
			id,
			messages: Vec::new(),
			model_id: model_id.into(),
			settings: serde_json::Value::Null,
			selected_document_ids: Vec::new(),
			selected_project_ids: Vec::new(),
		}
	}
}
