pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("{message}")]
	Decryption { message: String },
	#[error("{message}")]
	Encryption { message: String },
	#[error("{message}")]
	InvalidKey { message: String },
}
