use chacha20poly1305::{Key, KeyInit, XChaCha20Poly1305, XNonce, aead::Aead};
use rand::{RngCore, rngs::OsRng};

use crate::{CipherInput, Error, KeyMaterial, Result, wire};

pub const NONCE_LEN: usize = 24;
pub const TAG_LEN: usize = 16;

/// Seals chunk text under a fresh random nonce; the same plaintext never
/// produces the same ciphertext twice. Output is base64 over nonce followed
/// by ciphertext.
pub fn encrypt_text(key: &KeyMaterial, plaintext: &str) -> Result<String> {
	let aead = XChaCha20Poly1305::new(Key::from_slice(&key.text_key));
	let mut nonce = [0_u8; NONCE_LEN];

	OsRng.fill_bytes(&mut nonce);

	let ciphertext = aead
		.encrypt(XNonce::from_slice(&nonce), plaintext.as_bytes())
		.map_err(|_| Error::Encryption { message: "Text encryption failed.".to_string() })?;
	let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());

	sealed.extend_from_slice(&nonce);
	sealed.extend_from_slice(&ciphertext);

	Ok(wire::encode(&sealed))
}

pub fn decrypt_text(key: &KeyMaterial, input: &CipherInput) -> Result<String> {
	let bytes = input.to_bytes()?;

	if bytes.len() < NONCE_LEN + TAG_LEN {
		return Err(Error::Decryption { message: "Ciphertext is too short.".to_string() });
	}

	let (nonce, ciphertext) = bytes.split_at(NONCE_LEN);
	let aead = XChaCha20Poly1305::new(Key::from_slice(&key.text_key));
	let plaintext = aead
		.decrypt(XNonce::from_slice(nonce), ciphertext)
		.map_err(|_| Error::Decryption { message: "Text authentication failed.".to_string() })?;

	String::from_utf8(plaintext).map_err(|_| Error::Decryption {
		message: "Decrypted text is not valid UTF-8.".to_string(),
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	fn key() -> KeyMaterial {
		KeyMaterial::from_root(&[7_u8; 32]).expect("derive key")
	}

	#[test]
	fn round_trips_unicode_text() {
		let key = key();
		let plaintext = "réponse finale: 42 ✓";
		let sealed = encrypt_text(&key, plaintext).expect("encrypt");
		let opened = decrypt_text(&key, &CipherInput::Encoded(sealed)).expect("decrypt");

		assert_eq!(opened, plaintext);
	}

	#[test]
	fn repeated_encryption_differs_but_both_open() {
		let key = key();
		let first = encrypt_text(&key, "same input").expect("encrypt");
		let second = encrypt_text(&key, "same input").expect("encrypt");

		assert_ne!(first, second);
		assert_eq!(
			decrypt_text(&key, &CipherInput::Encoded(first)).expect("decrypt"),
			decrypt_text(&key, &CipherInput::Encoded(second)).expect("decrypt"),
		);
	}

	#[test]
	fn flipped_byte_fails_authentication() {
		let key = key();
		let sealed = encrypt_text(&key, "attack at dawn").expect("encrypt");
		let mut bytes = CipherInput::Encoded(sealed).to_bytes().expect("decode");
		let last = bytes.len() - 1;

		bytes[last] ^= 0x01;

		assert!(matches!(
			decrypt_text(&key, &CipherInput::Raw(bytes)),
			Err(Error::Decryption { .. }),
		));
	}

	#[test]
	fn wrong_key_fails_authentication() {
		let sealed = encrypt_text(&key(), "secret").expect("encrypt");
		let other = KeyMaterial::from_root(&[8_u8; 32]).expect("derive key");

		assert!(matches!(
			decrypt_text(&other, &CipherInput::Encoded(sealed)),
			Err(Error::Decryption { .. }),
		));
	}

	#[test]
	fn truncated_ciphertext_is_rejected_before_the_cipher_runs() {
		let key = key();

		assert!(matches!(
			decrypt_text(&key, &CipherInput::Raw(vec![0_u8; NONCE_LEN])),
			Err(Error::Decryption { .. }),
		));
	}
}
