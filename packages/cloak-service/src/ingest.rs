use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use cloak_domain::Provenance;
use cloak_keyring::{metadata, text, vector};

use crate::{CloakService, ServiceError, ServiceResult};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct IngestChunk {
	pub content: String,
	#[serde(default)]
	pub metadata: Option<Provenance>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct IngestRequest {
	pub session_id: Uuid,
	pub document_id: Uuid,
	pub chunks: Vec<IngestChunk>,
}

/// One chunk ready for the encrypted corpus: ciphertext fields plus the
/// transformed embedding. No plaintext survives into this value.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SealedChunk {
	pub id: Uuid,
	pub chunk_number: u32,
	pub encrypted_content: String,
	pub encrypted_metadata: Option<String>,
	pub encrypted_embedding: Vec<f32>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct IngestResponse {
	pub document_id: Uuid,
	pub chunks: Vec<SealedChunk>,
}

impl CloakService {
	/// Seals document chunks for storage: content and provenance are
	/// encrypted and embeddings transformed, all under the session key, so
	/// the store only ever receives opaque bytes.
	pub async fn encrypt_for_ingest(
		&self,
		req: IngestRequest,
		cancel: &CancellationToken,
	) -> ServiceResult<IngestResponse> {
		if req.chunks.is_empty() {
			return Err(ServiceError::InvalidRequest {
				message: "Ingest request contains no chunks.".to_string(),
			});
		}
		if req.chunks.iter().any(|chunk| chunk.content.trim().is_empty()) {
			return Err(ServiceError::InvalidRequest {
				message: "Ingest chunks must not be empty.".to_string(),
			});
		}

		let Some(key) = self.keys.material(req.session_id).await else {
			return Err(ServiceError::KeyUnavailable {
				message: "No key is unlocked for this session.".to_string(),
			});
		};

		if cancel.is_cancelled() {
			return Err(ServiceError::Cancelled);
		}

		let texts = req.chunks.iter().map(|chunk| chunk.content.clone()).collect::<Vec<_>>();
		let embeddings = self
			.providers
			.embedding
			.embed(&self.cfg.providers.embedding, &texts)
			.await
			.map_err(|err| ServiceError::Embedding { message: err.to_string() })?;

		if embeddings.len() != req.chunks.len() {
			return Err(ServiceError::Embedding {
				message: format!(
					"Embedding provider returned {} vectors for {} chunks.",
					embeddings.len(),
					req.chunks.len()
				),
			});
		}

		let mut sealed = Vec::with_capacity(req.chunks.len());

		for (number, (chunk, embedding)) in req.chunks.into_iter().zip(embeddings).enumerate() {
			let encrypted_metadata = match &chunk.metadata {
				Some(provenance) => {
					let json = serde_json::to_string(provenance).map_err(|err| {
						ServiceError::InvalidRequest {
							message: format!("Chunk metadata is not serializable: {err}."),
						}
					})?;

					Some(metadata::encrypt_metadata(&key, &json)?)
				},
				None => None,
			};

			sealed.push(SealedChunk {
				id: Uuid::new_v4(),
				chunk_number: number as u32,
				encrypted_content: text::encrypt_text(&key, &chunk.content)?,
				encrypted_metadata,
				encrypted_embedding: vector::encrypt_vector(&key, &embedding),
			});
		}

		Ok(IngestResponse { document_id: req.document_id, chunks: sealed })
	}
}
