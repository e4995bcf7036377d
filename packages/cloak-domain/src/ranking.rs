use serde::{Deserialize, Serialize};

use crate::model::SearchResult;

pub const MATCH_THRESHOLD_MAX: f32 = 0.99;
pub const MATCH_COUNT_MAX: u32 = 50;
pub const BATCH_SIZE_MAX: u32 = 20;

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct SearchConfig {
	pub match_threshold: f32,
	pub match_count: u32,
	pub batch_size: u32,
}
impl SearchConfig {
	/// Callers may hand in anything; out-of-range values are pulled back to
	/// the safe ranges instead of rejected.
	pub fn clamped(self) -> Self {
		let match_threshold = if self.match_threshold.is_finite() {
			self.match_threshold.clamp(0.0, MATCH_THRESHOLD_MAX)
		} else {
			0.0
		};

		Self {
			match_threshold,
			match_count: self.match_count.clamp(1, MATCH_COUNT_MAX),
			batch_size: self.batch_size.clamp(1, BATCH_SIZE_MAX),
		}
	}
}

/// Combines the two corpus result sets into a single ranked list.
///
/// Encrypted-source hits are tagged `is_decrypted = false` and placed ahead
/// of plaintext-source hits before sorting; `sort_by` is stable, so equal
/// similarities keep that concatenation order.
pub fn merge_results(
	encrypted: Vec<SearchResult>,
	plaintext: Vec<SearchResult>,
	match_count: u32,
) -> Vec<SearchResult> {
	let mut combined = Vec::with_capacity(encrypted.len() + plaintext.len());

	combined.extend(
		encrypted.into_iter().map(|result| SearchResult { is_decrypted: false, ..result }),
	);
	combined
		.extend(plaintext.into_iter().map(|result| SearchResult { is_decrypted: true, ..result }));

	combined.sort_by(|a, b| {
		b.similarity.partial_cmp(&a.similarity).unwrap_or(std::cmp::Ordering::Equal)
	});
	combined.truncate(match_count as usize);

	combined
}

#[cfg(test)]
mod tests {
	use uuid::Uuid;

	use super::*;
	use crate::model::{Chunk, ChunkPayload, DocumentKind};

	fn plain_result(similarity: f32, content: &str) -> SearchResult {
		SearchResult {
			chunk: Chunk {
				id: Uuid::new_v4(),
				document_id: Uuid::new_v4(),
				document_name: "doc".to_string(),
				document_kind: DocumentKind::Document,
				chunk_number: 0,
				payload: ChunkPayload::Plain { content: content.to_string(), metadata: None },
			},
			similarity,
			is_decrypted: true,
		}
	}

	#[test]
	fn merges_sources_descending_by_similarity() {
		let encrypted = vec![plain_result(0.4, "a"), plain_result(0.9, "b")];
		let plaintext = vec![plain_result(0.7, "c")];
		let merged = merge_results(encrypted, plaintext, 10);
		let similarities: Vec<f32> = merged.iter().map(|result| result.similarity).collect();

		assert_eq!(similarities, vec![0.9, 0.7, 0.4]);
		assert!(!merged[0].is_decrypted);
		assert!(merged[1].is_decrypted);
		assert!(!merged[2].is_decrypted);
	}

	#[test]
	fn equal_similarity_keeps_encrypted_entries_first() {
		let encrypted = vec![plain_result(0.5, "enc")];
		let plaintext = vec![plain_result(0.5, "plain")];
		let merged = merge_results(encrypted, plaintext, 10);

		assert_eq!(merged[0].chunk.payload.content(), Some("enc"));
		assert_eq!(merged[1].chunk.payload.content(), Some("plain"));
	}

	#[test]
	fn truncates_to_match_count() {
		let encrypted = vec![plain_result(0.9, "a"), plain_result(0.8, "b")];
		let plaintext = vec![plain_result(0.7, "c"), plain_result(0.6, "d")];
		let merged = merge_results(encrypted, plaintext, 2);

		assert_eq!(merged.len(), 2);
		assert_eq!(merged[0].similarity, 0.9);
		assert_eq!(merged[1].similarity, 0.8);
	}

	#[test]
	fn clamps_out_of_range_config() {
		let cfg = SearchConfig { match_threshold: 1.7, match_count: 500, batch_size: 0 }.clamped();

		assert_eq!(cfg.match_threshold, MATCH_THRESHOLD_MAX);
		assert_eq!(cfg.match_count, MATCH_COUNT_MAX);
		assert_eq!(cfg.batch_size, 1);

		let cfg =
			SearchConfig { match_threshold: f32::NAN, match_count: 0, batch_size: 99 }.clamped();

		assert_eq!(cfg.match_threshold, 0.0);
		assert_eq!(cfg.match_count, 1);
		assert_eq!(cfg.batch_size, BATCH_SIZE_MAX);
	}

	#[test]
	fn in_range_config_is_untouched() {
		let cfg = SearchConfig { match_threshold: 0.42, match_count: 7, batch_size: 5 };

		assert_eq!(cfg.clamped(), cfg);
	}
}
