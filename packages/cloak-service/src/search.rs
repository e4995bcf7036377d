use ahash::AHashSet;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use cloak_domain::{ChunkPayload, SearchConfig, SearchResult, merge_results};
use cloak_keyring::vector;

use crate::{CloakService, ServiceError, ServiceResult, decrypt, redact};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SearchRequest {
	pub session_id: Uuid,
	pub query: String,
	/// Overrides the configured thresholds; out-of-range values are clamped.
	#[serde(default)]
	pub config: Option<SearchConfig>,
	#[serde(default)]
	pub document_ids: Vec<Uuid>,
	#[serde(default)]
	pub project_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
	Ok,
	Failed,
}

/// Per-corpus outcome of a search, so callers can tell a thin result set from
/// a half-blind one.
#[derive(Debug, Clone, Copy, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SourceReport {
	pub encrypted: SourceStatus,
	pub plaintext: SourceStatus,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SearchResponse {
	pub results: Vec<SearchResult>,
	pub sources: SourceReport,
	pub dropped_chunks: u32,
}

impl CloakService {
	/// Embeds the query, runs both corpus searches concurrently, then merges,
	/// ranks, and opens the hits.
	///
	/// A corpus that fails contributes no hits and is flagged in `sources`;
	/// the other corpus still answers. Chunks that fail to open are dropped
	/// and counted in `dropped_chunks`.
	pub async fn search(
		&self,
		req: SearchRequest,
		cancel: &CancellationToken,
	) -> ServiceResult<SearchResponse> {
		let query = req.query.trim();

		if query.is_empty() {
			return Err(ServiceError::InvalidRequest {
				message: "Search query must not be empty.".to_string(),
			});
		}

		let Some(key) = self.keys.material(req.session_id).await else {
			return Err(ServiceError::KeyUnavailable {
				message: "No key is unlocked for this session.".to_string(),
			});
		};
		let search_cfg = req.config.unwrap_or_else(|| search_defaults(&self.cfg.search)).clamped();

		if cancel.is_cancelled() {
			return Err(ServiceError::Cancelled);
		}

		let query_vector = crate::embed_query(&self.cfg, &self.providers, query).await?;
		let sealed_vector = vector::encrypt_vector(&key, &query_vector);

		if cancel.is_cancelled() {
			return Err(ServiceError::Cancelled);
		}

		let encrypted_request = cloak_backend::SearchRequest {
			query_vector: sealed_vector,
			match_threshold: search_cfg.match_threshold,
			match_count: search_cfg.match_count,
			encrypted: true,
			document_ids: req.document_ids.clone(),
			project_ids: req.project_ids.clone(),
		};
		let plaintext_request = cloak_backend::SearchRequest {
			query_vector,
			match_threshold: search_cfg.match_threshold,
			match_count: search_cfg.match_count,
			encrypted: false,
			document_ids: req.document_ids,
			project_ids: req.project_ids,
		};
		let (encrypted_outcome, plaintext_outcome) = tokio::join!(
			self.backend.search(&encrypted_request),
			self.backend.search(&plaintext_request),
		);
		let redact_logs = self.cfg.security.redact_secrets_in_logs;
		let (encrypted_hits, encrypted_status) =
			settle_corpus("encrypted", encrypted_outcome, redact_logs);
		let (plaintext_hits, plaintext_status) =
			settle_corpus("plaintext", plaintext_outcome, redact_logs);
		let sources = SourceReport { encrypted: encrypted_status, plaintext: plaintext_status };
		let merged = merge_results(encrypted_hits, plaintext_hits, search_cfg.match_count);
		let merged = if self.cfg.backend.validate_ownership {
			self.drop_unverified(merged).await
		} else {
			merged
		};
		let outcome = decrypt::decrypt_results(&key, merged, search_cfg.batch_size, cancel).await?;

		Ok(SearchResponse { results: outcome.results, sources, dropped_chunks: outcome.dropped })
	}

	/// Echo-checks sealed hits against the backend and keeps only verified
	/// ones. A failed check drops every sealed hit rather than passing
	/// unverified ciphertext on to decryption.
	async fn drop_unverified(&self, results: Vec<SearchResult>) -> Vec<SearchResult> {
		let (chunk_ids, contents): (Vec<Uuid>, Vec<String>) = results
			.iter()
			.filter_map(|result| match &result.chunk.payload {
				ChunkPayload::Sealed { encrypted_content, .. } =>
					Some((result.chunk.id, encrypted_content.clone())),
				ChunkPayload::Plain { .. } => None,
			})
			.unzip();

		if chunk_ids.is_empty() {
			return results;
		}

		match self.backend.validate_ownership(&chunk_ids, &contents).await {
			Ok(verified) => {
				let verified = verified.into_iter().collect::<AHashSet<_>>();
				let before = results.len();
				let kept = results
					.into_iter()
					.filter(|result| {
						!result.chunk.payload.is_sealed() || verified.contains(&result.chunk.id)
					})
					.collect::<Vec<_>>();

				if kept.len() < before {
					tracing::warn!(
						dropped = before - kept.len(),
						"Dropped sealed hits that failed ownership validation."
					);
				}

				kept
			},
			Err(err) => {
				tracing::warn!(
					error = %redact::error_text(
						&err.to_string(),
						self.cfg.security.redact_secrets_in_logs,
					),
					"Ownership validation failed; dropping every sealed hit."
				);

				results.into_iter().filter(|result| !result.chunk.payload.is_sealed()).collect()
			},
		}
	}
}

pub(crate) fn search_defaults(search: &cloak_config::Search) -> SearchConfig {
	SearchConfig {
		match_threshold: search.match_threshold,
		match_count: search.match_count,
		batch_size: search.batch_size,
	}
}

fn settle_corpus(
	corpus: &'static str,
	outcome: cloak_backend::Result<Vec<cloak_backend::SearchHit>>,
	redact_logs: bool,
) -> (Vec<SearchResult>, SourceStatus) {
	match outcome {
		Ok(hits) => {
			let results = hits
				.into_iter()
				.map(|hit| SearchResult {
					chunk: hit.chunk,
					similarity: hit.similarity,
					is_decrypted: false,
				})
				.collect();

			(results, SourceStatus::Ok)
		},
		Err(err) => {
			tracing::warn!(
				corpus,
				error = %redact::error_text(&err.to_string(), redact_logs),
				"A search corpus failed; continuing with the other one."
			);

			(Vec::new(), SourceStatus::Failed)
		},
	}
}

#[cfg(test)]
mod tests {
	use uuid::Uuid;

	use cloak_domain::{Chunk, DocumentKind};

	use super::*;

	fn hit(similarity: f32) -> cloak_backend::SearchHit {
		let chunk = Chunk {
			id: Uuid::new_v4(),
			document_id: Uuid::new_v4(),
			document_name: "notes".to_string(),
			document_kind: DocumentKind::Document,
			chunk_number: 0,
			payload: ChunkPayload::Plain { content: "text".to_string(), metadata: None },
		};

		cloak_backend::SearchHit { chunk, similarity }
	}

	#[test]
	fn a_healthy_corpus_maps_hits_to_undecrypted_results() {
		let (results, status) = settle_corpus("plaintext", Ok(vec![hit(0.8), hit(0.5)]), true);

		assert_eq!(status, SourceStatus::Ok);
		assert_eq!(results.len(), 2);
		assert!(results.iter().all(|result| !result.is_decrypted));
	}

	#[test]
	fn a_failed_corpus_becomes_an_empty_flagged_source() {
		let outcome = Err(cloak_backend::Error::InvalidResponse {
			message: "backend returned 503".to_string(),
		});
		let (results, status) = settle_corpus("encrypted", outcome, true);

		assert_eq!(status, SourceStatus::Failed);
		assert!(results.is_empty());
	}

	#[test]
	fn defaults_come_from_configuration() {
		let search = cloak_config::Search { match_threshold: 0.25, match_count: 10, batch_size: 5 };
		let defaults = search_defaults(&search);

		assert_eq!(defaults.match_threshold, 0.25);
		assert_eq!(defaults.match_count, 10);
		assert_eq!(defaults.batch_size, 5);
	}
}
