use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cloak_domain::Chunk;

use crate::{BackendClient, Error, Result};

#[derive(Clone, Debug, Serialize)]
pub struct SearchRequest {
	pub query_vector: Vec<f32>,
	pub match_threshold: f32,
	pub match_count: u32,
	/// Which corpus to rank against: sealed chunks or the plaintext ones.
	pub encrypted: bool,
	pub document_ids: Vec<Uuid>,
	pub project_ids: Vec<Uuid>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SearchHit {
	#[serde(flatten)]
	pub chunk: Chunk,
	pub similarity: f32,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
	results: Vec<SearchHit>,
}

impl BackendClient {
	pub async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>> {
		let res = self
			.client
			.post(&self.search_url)
			.headers(self.headers.clone())
			.json(request)
			.send()
			.await?;
		let response: SearchResponse = res.error_for_status()?.json().await?;

		if response.results.len() > request.match_count as usize {
			return Err(Error::InvalidResponse {
				message: format!(
					"Backend returned {} hits for a match_count of {}.",
					response.results.len(),
					request.match_count,
				),
			});
		}

		Ok(response.results)
	}
}

#[cfg(test)]
mod tests {
	use cloak_domain::{ChunkPayload, DocumentKind};

	use super::*;

	#[test]
	fn hit_deserializes_with_flattened_chunk_fields() {
		let json = serde_json::json!({
			"id": "0192f7a2-6f45-7bb0-9c1e-3d8a5b21c901",
			"document_id": "0192f7a2-6f45-7bb0-9c1e-3d8a5b21c902",
			"document_name": "report.pdf",
			"document_kind": "document",
			"chunk_number": 4,
			"payload": {
				"state": "sealed",
				"encrypted_content": "AAECAwQF",
				"encrypted_metadata": null
			},
			"similarity": 0.87
		});
		let hit: SearchHit = serde_json::from_value(json).expect("parse failed");

		assert_eq!(hit.chunk.chunk_number, 4);
		assert!(hit.chunk.payload.is_sealed());
		assert!((hit.similarity - 0.87).abs() < f32::EPSILON);
	}

	#[test]
	fn plaintext_hit_carries_content_inline() {
		let json = serde_json::json!({
			"id": "0192f7a2-6f45-7bb0-9c1e-3d8a5b21c903",
			"document_id": "0192f7a2-6f45-7bb0-9c1e-3d8a5b21c904",
			"document_name": "notes.md",
			"document_kind": "web_page",
			"chunk_number": 0,
			"payload": { "state": "plain", "content": "hello", "metadata": null },
			"similarity": 0.5
		});
		let hit: SearchHit = serde_json::from_value(json).expect("parse failed");

		assert_eq!(hit.chunk.document_kind, DocumentKind::WebPage);
		assert!(
			matches!(&hit.chunk.payload, ChunkPayload::Plain { content, .. } if content == "hello")
		);
	}

	#[test]
	fn request_serializes_the_corpus_flag() {
		let request = SearchRequest {
			query_vector: vec![0.1, 0.2],
			match_threshold: 0.3,
			match_count: 10,
			encrypted: true,
			document_ids: vec![],
			project_ids: vec![],
		};
		let value = serde_json::to_value(&request).expect("serialize failed");

		assert_eq!(value["encrypted"], true);
		assert_eq!(value["match_count"], 10);
	}
}
