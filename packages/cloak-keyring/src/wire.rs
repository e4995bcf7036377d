use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Ciphertext as callers hand it over. The wire accepts either the canonical
/// base64 string or a raw byte array; both normalize to the same bytes before
/// any cipher sees them.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CipherInput {
	Encoded(String),
	Raw(Vec<u8>),
}

impl CipherInput {
	pub fn to_bytes(&self) -> Result<Vec<u8>> {
		match self {
			Self::Encoded(text) => STANDARD.decode(text.trim()).map_err(|_| Error::Decryption {
				message: "Ciphertext is not valid base64.".to_string(),
			}),
			Self::Raw(bytes) => Ok(bytes.clone()),
		}
	}
}

impl From<&str> for CipherInput {
	fn from(encoded: &str) -> Self {
		Self::Encoded(encoded.to_string())
	}
}
impl From<Vec<u8>> for CipherInput {
	fn from(bytes: Vec<u8>) -> Self {
		Self::Raw(bytes)
	}
}
impl From<&[u8]> for CipherInput {
	fn from(bytes: &[u8]) -> Self {
		Self::Raw(bytes.to_vec())
	}
}

/// Canonical outbound encoding for sealed bytes.
pub fn encode(bytes: &[u8]) -> String {
	STANDARD.encode(bytes)
}
