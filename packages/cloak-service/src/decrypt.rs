use tokio_util::sync::CancellationToken;

use cloak_domain::{ChunkPayload, Provenance, SearchResult};
use cloak_keyring::{CipherInput, KeyMaterial, metadata, text};

use crate::{ServiceError, ServiceResult};

/// Outcome of a batched decryption pass.
#[derive(Debug)]
pub struct DecryptOutcome {
	pub results: Vec<SearchResult>,
	pub dropped: u32,
}

/// Opens sealed search results in place, a batch at a time.
///
/// A chunk that fails to open is dropped and counted instead of failing the
/// pass, and every survivor keeps its original rank. The task yields to the
/// runtime between batches and honors `cancel` at each batch boundary.
pub async fn decrypt_results(
	key: &KeyMaterial,
	results: Vec<SearchResult>,
	batch_size: u32,
	cancel: &CancellationToken,
) -> ServiceResult<DecryptOutcome> {
	let batch_size = batch_size.max(1) as usize;
	let mut opened = Vec::with_capacity(results.len());
	let mut dropped = 0_u32;

	for (position, mut result) in results.into_iter().enumerate() {
		if position % batch_size == 0 {
			if cancel.is_cancelled() {
				return Err(ServiceError::Cancelled);
			}
			if position > 0 {
				tokio::task::yield_now().await;
			}
		}

		let ChunkPayload::Sealed { encrypted_content, encrypted_metadata } = &result.chunk.payload
		else {
			opened.push(result);
			continue;
		};

		match open_payload(key, encrypted_content, encrypted_metadata.as_deref()) {
			Ok((content, metadata)) => {
				result.chunk.payload = ChunkPayload::Plain { content, metadata };
				result.is_decrypted = true;

				opened.push(result);
			},
			Err(err) => {
				dropped += 1;

				tracing::warn!(
					chunk_id = %result.chunk.id,
					error = %err,
					"Dropping a chunk that failed to decrypt."
				);
			},
		}
	}

	Ok(DecryptOutcome { results: opened, dropped })
}

fn open_payload(
	key: &KeyMaterial,
	content: &str,
	metadata: Option<&str>,
) -> cloak_keyring::Result<(String, Option<Provenance>)> {
	let plaintext = text::decrypt_text(key, &CipherInput::from(content))?;
	let provenance = match metadata {
		Some(sealed) => {
			let json = metadata::decrypt_metadata(key, &CipherInput::from(sealed))?;
			let parsed =
				serde_json::from_str(&json).map_err(|_| cloak_keyring::Error::Decryption {
					message: "Decrypted metadata is not valid provenance JSON.".to_string(),
				})?;

			Some(parsed)
		},
		None => None,
	};

	Ok((plaintext, provenance))
}
