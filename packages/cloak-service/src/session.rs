use std::{
	collections::VecDeque,
	sync::Arc,
	time::{Duration, Instant},
};

use ahash::AHashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use cloak_domain::ChatState;
use cloak_keyring::KeyMaterial;

use crate::{CloakService, ServiceError, ServiceResult};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct UnlockRequest {
	/// Reuse an existing session id, or omit to mint a fresh one.
	#[serde(default)]
	pub session_id: Option<Uuid>,
	/// Base64-encoded caller-held root key. Omit to generate a new root.
	#[serde(default)]
	pub root: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct UnlockResponse {
	pub session_id: Uuid,
	pub fingerprint: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CreateChatRequest {
	pub model_id: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SelectionRequest {
	pub chat_id: Uuid,
	#[serde(default)]
	pub document_ids: Vec<Uuid>,
	#[serde(default)]
	pub project_ids: Vec<Uuid>,
}

/// In-memory table of unlocked session keys.
///
/// Keys live only in process memory, expire after the configured TTL, and the
/// oldest session is evicted once the table is full. Nothing here is ever
/// persisted.
pub struct KeyStore {
	ttl: Duration,
	capacity: usize,
	inner: Mutex<KeyStoreInner>,
}

struct KeyStoreInner {
	keys: AHashMap<Uuid, StoredKey>,
	order: VecDeque<Uuid>,
}

struct StoredKey {
	material: Arc<KeyMaterial>,
	unlocked_at: Instant,
}

/// In-memory table of chat sessions, bounded the same way as [`KeyStore`].
pub struct ChatStore {
	capacity: usize,
	inner: Mutex<ChatStoreInner>,
}

struct ChatStoreInner {
	chats: AHashMap<Uuid, ChatState>,
	order: VecDeque<Uuid>,
}

impl KeyStore {
	pub fn new(cfg: &cloak_config::Keyring) -> Self {
		Self {
			ttl: Duration::from_secs(cfg.session_ttl_minutes.max(0) as u64 * 60),
			capacity: cfg.max_sessions.max(1) as usize,
			inner: Mutex::new(KeyStoreInner { keys: AHashMap::new(), order: VecDeque::new() }),
		}
	}

	pub async fn insert(&self, session_id: Uuid, material: KeyMaterial) {
		let mut inner = self.inner.lock().await;
		let stored = StoredKey { material: Arc::new(material), unlocked_at: Instant::now() };

		if inner.keys.insert(session_id, stored).is_none() {
			inner.order.push_back(session_id);
		}
		while inner.keys.len() > self.capacity {
			let Some(oldest) = inner.order.pop_front() else {
				break;
			};

			inner.keys.remove(&oldest);
		}
	}

	pub async fn material(&self, session_id: Uuid) -> Option<Arc<KeyMaterial>> {
		let mut inner = self.inner.lock().await;
		let expired = inner
			.keys
			.get(&session_id)
			.map(|stored| stored.unlocked_at.elapsed() > self.ttl)
			.unwrap_or(false);

		if expired {
			inner.keys.remove(&session_id);
			inner.order.retain(|id| id != &session_id);

			return None;
		}

		inner.keys.get(&session_id).map(|stored| stored.material.clone())
	}

	pub async fn remove(&self, session_id: Uuid) -> bool {
		let mut inner = self.inner.lock().await;

		inner.order.retain(|id| id != &session_id);

		inner.keys.remove(&session_id).is_some()
	}

	pub async fn len(&self) -> usize {
		self.inner.lock().await.keys.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.len().await == 0
	}
}

impl ChatStore {
	pub fn new(capacity: u32) -> Self {
		Self {
			capacity: capacity.max(1) as usize,
			inner: Mutex::new(ChatStoreInner { chats: AHashMap::new(), order: VecDeque::new() }),
		}
	}

	pub async fn insert(&self, state: ChatState) {
		let mut inner = self.inner.lock().await;
		let chat_id = state.id;

		if inner.chats.insert(chat_id, state).is_none() {
			inner.order.push_back(chat_id);
		}
		while inner.chats.len() > self.capacity {
			let Some(oldest) = inner.order.pop_front() else {
				break;
			};

			inner.chats.remove(&oldest);
		}
	}

	pub async fn get(&self, chat_id: Uuid) -> Option<ChatState> {
		self.inner.lock().await.chats.get(&chat_id).cloned()
	}

	pub async fn update<F>(&self, chat_id: Uuid, apply: F) -> bool
	where
		F: FnOnce(&mut ChatState),
	{
		let mut inner = self.inner.lock().await;
		let Some(state) = inner.chats.get_mut(&chat_id) else {
			return false;
		};

		apply(state);

		true
	}

	pub async fn remove(&self, chat_id: Uuid) -> bool {
		let mut inner = self.inner.lock().await;

		inner.order.retain(|id| id != &chat_id);

		inner.chats.remove(&chat_id).is_some()
	}
}

impl CloakService {
	/// Derives session key material and stores it under a session id.
	///
	/// The root never leaves this call: it is decoded, stretched into the
	/// per-purpose keys, and zeroized. Only a fingerprint goes back out.
	pub async fn unlock_session(&self, req: UnlockRequest) -> ServiceResult<UnlockResponse> {
		let material = match req.root.as_deref() {
			Some(encoded) => KeyMaterial::from_encoded_root(encoded)?,
			None => KeyMaterial::generate()?,
		};
		let session_id = req.session_id.unwrap_or_else(Uuid::new_v4);
		let fingerprint = material.fingerprint();

		self.keys.insert(session_id, material).await;

		Ok(UnlockResponse { session_id, fingerprint })
	}

	/// Drops a session's key material. Returns whether a key was present.
	pub async fn lock_session(&self, session_id: Uuid) -> ServiceResult<bool> {
		Ok(self.keys.remove(session_id).await)
	}

	pub async fn create_chat(&self, req: CreateChatRequest) -> ServiceResult<ChatState> {
		let model_id = req.model_id.trim();

		if model_id.is_empty() {
			return Err(ServiceError::InvalidRequest {
				message: "model_id must not be empty.".to_string(),
			});
		}

		let state = ChatState::new(Uuid::new_v4(), model_id);

		self.chats.insert(state.clone()).await;

		Ok(state)
	}

	pub async fn chat_state(&self, chat_id: Uuid) -> ServiceResult<ChatState> {
		self.chats.get(chat_id).await.ok_or_else(|| ServiceError::InvalidRequest {
			message: "Unknown chat session.".to_string(),
		})
	}

	/// Pins the document and project scope used by later asks on this chat.
	pub async fn select_scope(&self, req: SelectionRequest) -> ServiceResult<ChatState> {
		let SelectionRequest { chat_id, document_ids, project_ids } = req;
		let updated = self
			.chats
			.update(chat_id, |state| {
				state.selected_document_ids = document_ids;
				state.selected_project_ids = project_ids;
			})
			.await;

		if !updated {
			return Err(ServiceError::InvalidRequest {
				message: "Unknown chat session.".to_string(),
			});
		}

		self.chat_state(chat_id).await
	}
}
