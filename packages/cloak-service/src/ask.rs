use serde_json::Value;
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use cloak_domain::{
	ChatMessage, ContextOptions, HistoryBudget, RetrievedContext, Role, SearchConfig,
	assemble_context, limit_messages_by_tokens,
};

use crate::{CloakService, ServiceError, ServiceResult, SourceReport, search::SearchRequest};

const SYSTEM_PROMPT: &str = "You are a careful assistant for a private document collection. \
Answer using only the provided context. When the context does not cover the question, say so \
plainly instead of guessing.";

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AskRequest {
	pub session_id: Uuid,
	pub chat_id: Uuid,
	pub question: String,
	#[serde(default)]
	pub config: Option<SearchConfig>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AskResponse {
	pub answer: String,
	pub context: RetrievedContext,
	pub sources: SourceReport,
	pub dropped_chunks: u32,
}

impl CloakService {
	/// Answers a question against the caller's documents: search, assemble a
	/// context block, trim the chat history to budget, and complete.
	///
	/// When nothing relevant survives the similarity floor, the model still
	/// gets an explicit no-information marker rather than an absent section.
	pub async fn ask(
		&self,
		req: AskRequest,
		cancel: &CancellationToken,
	) -> ServiceResult<AskResponse> {
		let question = req.question.trim().to_string();

		if question.is_empty() {
			return Err(ServiceError::InvalidRequest {
				message: "Question must not be empty.".to_string(),
			});
		}

		let chat = self.chat_state(req.chat_id).await?;
		let search_req = SearchRequest {
			session_id: req.session_id,
			query: question.clone(),
			config: req.config,
			document_ids: chat.selected_document_ids.clone(),
			project_ids: chat.selected_project_ids.clone(),
		};
		let searched = self.search(search_req, cancel).await?;
		let context = assemble_context(&question, &searched.results, ContextOptions {
			min_similarity: self.cfg.context.min_similarity,
			max_chunks: self.cfg.context.max_chunks,
		});
		let now = OffsetDateTime::now_utc();
		let system = ChatMessage {
			id: Uuid::new_v4(),
			role: Role::System,
			content: format!("{SYSTEM_PROMPT}\n\nContext:\n{}", context.to_prompt_block()),
			timestamp: now,
		};
		let user = ChatMessage {
			id: Uuid::new_v4(),
			role: Role::User,
			content: question,
			timestamp: now,
		};
		let mut transcript = Vec::with_capacity(chat.messages.len() + 2);

		transcript.push(system);
		transcript.extend(chat.messages.iter().cloned());
		transcript.push(user.clone());

		let budget = HistoryBudget {
			max_tokens: self.cfg.history.max_tokens,
			reserved_generation_budget: self.cfg.history.reserved_generation_budget,
		};
		let messages = limit_messages_by_tokens(&transcript, budget)
			.iter()
			.map(|message| {
				serde_json::json!({
					"role": message.role.as_str(),
					"content": message.content,
				})
			})
			.collect::<Vec<Value>>();

		if cancel.is_cancelled() {
			return Err(ServiceError::Cancelled);
		}

		let answer = self
			.providers
			.completion
			.complete(&self.cfg.providers.completion, &messages)
			.await?;
		let assistant = ChatMessage {
			id: Uuid::new_v4(),
			role: Role::Assistant,
			content: answer.clone(),
			timestamp: OffsetDateTime::now_utc(),
		};

		self.chats
			.update(req.chat_id, |state| {
				state.messages.push(user);
				state.messages.push(assistant);
			})
			.await;

		Ok(AskResponse {
			answer,
			context,
			sources: searched.sources,
			dropped_chunks: searched.dropped_chunks,
		})
	}
}
