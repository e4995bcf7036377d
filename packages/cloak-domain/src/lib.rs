pub mod context;
pub mod history;
pub mod model;
pub mod ranking;
pub mod time_serde;

pub use context::{ContextOptions, EMPTY_CONTEXT_MARKER, assemble_context};
pub use history::{HistoryBudget, approximate_tokens, limit_messages_by_tokens};
pub use model::{
	ChatMessage, ChatState, Chunk, ChunkPayload, ContextChunk, ContextDocument, DocumentKind,
	Provenance, RetrievedContext, Role, SearchResult,
};
pub use ranking::{SearchConfig, merge_results};
