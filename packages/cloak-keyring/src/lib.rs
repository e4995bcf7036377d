pub mod error;
pub mod metadata;
pub mod text;
pub mod vector;
pub mod wire;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use hkdf::Hkdf;
use rand::{RngCore, rngs::OsRng};
use sha2::Sha256;
use zeroize::Zeroize;

pub use error::{Error, Result};
pub use wire::CipherInput;

pub const ROOT_KEY_LEN: usize = 32;

const TEXT_KEY_INFO: &[u8] = b"cloak/text-key/v1";
const METADATA_KEY_INFO: &[u8] = b"cloak/metadata-key/v1";
const VECTOR_SEED_INFO: &[u8] = b"cloak/vector-seed/v1";

/// Per-session cipher keys, derived once from a 32-byte root and wiped on
/// drop. The root itself is not retained; a client that keeps it can derive
/// the same keys again later.
pub struct KeyMaterial {
	pub(crate) text_key: [u8; 32],
	pub(crate) metadata_key: [u8; 64],
	pub(crate) vector_seed: [u8; 32],
}

impl KeyMaterial {
	pub fn generate() -> Result<Self> {
		let mut root = [0_u8; ROOT_KEY_LEN];

		OsRng.fill_bytes(&mut root);

		let material = Self::from_root(&root);

		root.zeroize();

		material
	}

	pub fn from_root(root: &[u8; ROOT_KEY_LEN]) -> Result<Self> {
		let hkdf = Hkdf::<Sha256>::new(None, root);
		let mut text_key = [0_u8; 32];
		let mut metadata_key = [0_u8; 64];
		let mut vector_seed = [0_u8; 32];

		hkdf.expand(TEXT_KEY_INFO, &mut text_key).map_err(derivation_error)?;
		hkdf.expand(METADATA_KEY_INFO, &mut metadata_key).map_err(derivation_error)?;
		hkdf.expand(VECTOR_SEED_INFO, &mut vector_seed).map_err(derivation_error)?;

		Ok(Self { text_key, metadata_key, vector_seed })
	}

	/// Accepts the base64 session root a client held on to.
	pub fn from_encoded_root(encoded: &str) -> Result<Self> {
		let mut bytes = STANDARD.decode(encoded.trim()).map_err(|_| Error::InvalidKey {
			message: "Session root must be valid base64.".to_string(),
		})?;
		let Ok(mut root) = <[u8; ROOT_KEY_LEN]>::try_from(bytes.as_slice()) else {
			let length = bytes.len();

			bytes.zeroize();

			return Err(Error::InvalidKey {
				message: format!("Session root must be {ROOT_KEY_LEN} bytes, got {length}."),
			});
		};

		bytes.zeroize();

		let material = Self::from_root(&root);

		root.zeroize();

		material
	}

	/// One-way identifier safe to log; never derivable back into key bytes.
	pub fn fingerprint(&self) -> String {
		let mut hasher = blake3::Hasher::new();

		hasher.update(&self.text_key);
		hasher.update(&self.metadata_key);
		hasher.update(&self.vector_seed);

		hasher.finalize().to_hex()[..16].to_string()
	}
}

impl std::fmt::Debug for KeyMaterial {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("KeyMaterial")
			.field("fingerprint", &self.fingerprint())
			.finish_non_exhaustive()
	}
}

impl Drop for KeyMaterial {
	fn drop(&mut self) {
		self.text_key.zeroize();
		self.metadata_key.zeroize();
		self.vector_seed.zeroize();
	}
}

fn derivation_error(_: hkdf::InvalidLength) -> Error {
	Error::InvalidKey { message: "Key derivation failed.".to_string() }
}
