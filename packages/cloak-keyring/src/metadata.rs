use chacha20poly1305::{Key, KeyInit, XChaCha20Poly1305, XNonce, aead::Aead};

use crate::{
	CipherInput, Error, KeyMaterial, Result,
	text::{NONCE_LEN, TAG_LEN},
	wire,
};

/// Deterministic sibling of the text cipher. The nonce is a keyed hash of
/// the plaintext, so equal metadata always seals to equal bytes and stored
/// labels stay matchable without opening them.
pub fn encrypt_metadata(key: &KeyMaterial, plaintext: &str) -> Result<String> {
	let (mac_key, enc_key) = split_key(&key.metadata_key);
	let digest = blake3::keyed_hash(&mac_key, plaintext.as_bytes());
	let mut nonce = [0_u8; NONCE_LEN];

	nonce.copy_from_slice(&digest.as_bytes()[..NONCE_LEN]);

	let aead = XChaCha20Poly1305::new(Key::from_slice(&enc_key));
	let ciphertext = aead
		.encrypt(XNonce::from_slice(&nonce), plaintext.as_bytes())
		.map_err(|_| Error::Encryption { message: "Metadata encryption failed.".to_string() })?;
	let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());

	sealed.extend_from_slice(&nonce);
	sealed.extend_from_slice(&ciphertext);

	Ok(wire::encode(&sealed))
}

pub fn decrypt_metadata(key: &KeyMaterial, input: &CipherInput) -> Result<String> {
	let bytes = input.to_bytes()?;

	if bytes.len() < NONCE_LEN + TAG_LEN {
		return Err(Error::Decryption { message: "Ciphertext is too short.".to_string() });
	}

	let (nonce, ciphertext) = bytes.split_at(NONCE_LEN);
	let (_, enc_key) = split_key(&key.metadata_key);
	let aead = XChaCha20Poly1305::new(Key::from_slice(&enc_key));
	let plaintext = aead
		.decrypt(XNonce::from_slice(nonce), ciphertext)
		.map_err(|_| Error::Decryption { message: "Metadata authentication failed.".to_string() })?;

	String::from_utf8(plaintext).map_err(|_| Error::Decryption {
		message: "Decrypted metadata is not valid UTF-8.".to_string(),
	})
}

fn split_key(metadata_key: &[u8; 64]) -> ([u8; 32], [u8; 32]) {
	let mut mac_key = [0_u8; 32];
	let mut enc_key = [0_u8; 32];

	mac_key.copy_from_slice(&metadata_key[..32]);
	enc_key.copy_from_slice(&metadata_key[32..]);

	(mac_key, enc_key)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn key() -> KeyMaterial {
		KeyMaterial::from_root(&[9_u8; 32]).expect("derive key")
	}

	#[test]
	fn identical_plaintext_seals_identically() {
		let key = key();
		let first = encrypt_metadata(&key, r#"{"page":12}"#).expect("encrypt");
		let second = encrypt_metadata(&key, r#"{"page":12}"#).expect("encrypt");

		assert_eq!(first, second);
	}

	#[test]
	fn different_plaintext_seals_differently() {
		let key = key();
		let first = encrypt_metadata(&key, r#"{"page":12}"#).expect("encrypt");
		let second = encrypt_metadata(&key, r#"{"page":13}"#).expect("encrypt");

		assert_ne!(first, second);
	}

	#[test]
	fn round_trips_through_both_wire_forms() {
		let key = key();
		let sealed = encrypt_metadata(&key, "label").expect("encrypt");
		let bytes = CipherInput::Encoded(sealed.clone()).to_bytes().expect("decode");

		assert_eq!(
			decrypt_metadata(&key, &CipherInput::Encoded(sealed)).expect("decrypt"),
			"label",
		);
		assert_eq!(decrypt_metadata(&key, &CipherInput::Raw(bytes)).expect("decrypt"), "label");
	}

	#[test]
	fn tampered_metadata_fails_authentication() {
		let key = key();
		let sealed = encrypt_metadata(&key, "label").expect("encrypt");
		let mut bytes = CipherInput::Encoded(sealed).to_bytes().expect("decode");

		bytes[NONCE_LEN] ^= 0xFF;

		assert!(matches!(
			decrypt_metadata(&key, &CipherInput::Raw(bytes)),
			Err(Error::Decryption { .. }),
		));
	}

	#[test]
	fn metadata_and_text_keys_are_independent() {
		let key = key();
		let sealed = encrypt_metadata(&key, "label").expect("encrypt");

		assert!(matches!(
			crate::text::decrypt_text(&key, &CipherInput::Encoded(sealed)),
			Err(Error::Decryption { .. }),
		));
	}
}
