use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{BackendClient, Result};

#[derive(Debug, Serialize)]
struct OwnershipRequest<'a> {
	chunk_ids: &'a [Uuid],
	encrypted_contents: &'a [String],
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct EchoedChunk {
	pub id: Uuid,
	pub encrypted_content: String,
}

#[derive(Debug, Deserialize)]
struct OwnershipResponse {
	chunks: Vec<EchoedChunk>,
}

impl BackendClient {
	/// Asks the store to echo the sealed bytes it holds for these chunk ids
	/// and keeps only the ids whose echo is byte-identical to what we sent.
	/// A chunk the store cannot faithfully echo is treated as not ours.
	pub async fn validate_ownership(
		&self,
		chunk_ids: &[Uuid],
		encrypted_contents: &[String],
	) -> Result<Vec<Uuid>> {
		if chunk_ids.is_empty() {
			return Ok(Vec::new());
		}

		let request = OwnershipRequest { chunk_ids, encrypted_contents };
		let res = self
			.client
			.post(&self.ownership_url)
			.headers(self.headers.clone())
			.json(&request)
			.send()
			.await?;
		let response: OwnershipResponse = res.error_for_status()?.json().await?;

		Ok(verified_ids(chunk_ids, encrypted_contents, &response.chunks))
	}
}

fn verified_ids(
	chunk_ids: &[Uuid],
	encrypted_contents: &[String],
	echoed: &[EchoedChunk],
) -> Vec<Uuid> {
	let echoes: HashMap<Uuid, &str> =
		echoed.iter().map(|chunk| (chunk.id, chunk.encrypted_content.as_str())).collect();

	chunk_ids
		.iter()
		.zip(encrypted_contents)
		.filter(|&(id, sent)| echoes.get(id) == Some(&sent.as_str()))
		.map(|(id, _)| *id)
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn keeps_only_byte_identical_echoes() {
		let ids = vec![Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
		let sent = vec!["AAAA".to_string(), "BBBB".to_string(), "CCCC".to_string()];
		let echoed = vec![
			EchoedChunk { id: ids[0], encrypted_content: "AAAA".to_string() },
			EchoedChunk { id: ids[1], encrypted_content: "Bxxx".to_string() },
		];
		let verified = verified_ids(&ids, &sent, &echoed);

		assert_eq!(verified, vec![ids[0]]);
	}

	#[test]
	fn unknown_echoes_do_not_vouch_for_anything() {
		let ids = vec![Uuid::new_v4()];
		let sent = vec!["AAAA".to_string()];
		let echoed = vec![EchoedChunk { id: Uuid::new_v4(), encrypted_content: "AAAA".to_string() }];

		assert!(verified_ids(&ids, &sent, &echoed).is_empty());
	}
}
