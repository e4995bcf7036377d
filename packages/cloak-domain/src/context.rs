use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{
	ChunkPayload, ContextChunk, ContextDocument, Provenance, RetrievedContext, SearchResult,
};

/// Returned instead of an empty block so the completion prompt can react to
/// the no-context case explicitly.
pub const EMPTY_CONTEXT_MARKER: &str =
	"No relevant information was found in the available documents.";

/// Independent from the search-time config; context assembly may be stricter
/// than raw search recall.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct ContextOptions {
	pub min_similarity: f32,
	pub max_chunks: u32,
}

/// Filters, re-ranks, and groups decrypted results per document. Chunks that
/// are still sealed are skipped; a clean chunk makes it in or nothing does.
pub fn assemble_context(
	query: &str,
	results: &[SearchResult],
	options: ContextOptions,
) -> RetrievedContext {
	let mut survivors: Vec<&SearchResult> = results
		.iter()
		.filter(|result| !result.chunk.payload.is_sealed())
		.filter(|result| result.similarity >= options.min_similarity)
		.collect();

	survivors.sort_by(|a, b| {
		b.similarity.partial_cmp(&a.similarity).unwrap_or(std::cmp::Ordering::Equal)
	});
	survivors.truncate(options.max_chunks as usize);

	let mut documents: Vec<ContextDocument> = Vec::new();
	let mut slots: HashMap<Uuid, usize> = HashMap::new();

	for result in survivors {
		let ChunkPayload::Plain { content, metadata } = &result.chunk.payload else {
			continue;
		};
		let slot = match slots.get(&result.chunk.document_id) {
			Some(&slot) => slot,
			None => {
				slots.insert(result.chunk.document_id, documents.len());
				documents.push(ContextDocument {
					document_id: result.chunk.document_id,
					name: result.chunk.document_name.clone(),
					kind: result.chunk.document_kind,
					chunks: Vec::new(),
				});

				documents.len() - 1
			},
		};

		documents[slot].chunks.push(ContextChunk {
			chunk_number: result.chunk.chunk_number,
			text: content.clone(),
			similarity: result.similarity,
			provenance: metadata.clone(),
		});
	}

	let total_chunks = documents.iter().map(|document| document.chunks.len()).sum::<usize>() as u32;

	RetrievedContext { query: query.to_string(), documents, total_chunks }
}

impl RetrievedContext {
	/// Serializes the grouped chunks into the provenance-annotated block fed
	/// to the completion prompt.
	pub fn to_prompt_block(&self) -> String {
		if self.documents.is_empty() {
			return EMPTY_CONTEXT_MARKER.to_string();
		}

		let mut out = String::new();

		for document in &self.documents {
			if !out.is_empty() {
				out.push('\n');
			}

			out.push_str(&format!("## {} ({})\n", document.name, document.kind.as_str()));

			for chunk in &document.chunks {
				out.push_str(&format!("{}\n{}\n", chunk.text, source_line(chunk)));
			}
		}

		out
	}
}

fn source_line(chunk: &ContextChunk) -> String {
	match &chunk.provenance {
		Some(Provenance::Page { number }) => format!("[page {number}]"),
		Some(Provenance::Web { url, title: Some(title) }) => format!("[{title} | {url}]"),
		Some(Provenance::Web { url, title: None }) => format!("[{url}]"),
		Some(Provenance::Transcript { timestamp }) => format!("[at {timestamp}]"),
		None => format!("[chunk {}]", chunk.chunk_number),
	}
}
