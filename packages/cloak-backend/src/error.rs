pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Reqwest(#[from] reqwest::Error),
	#[error(transparent)]
	Provider(#[from] cloak_providers::Error),
	#[error("{message}")]
	InvalidResponse { message: String },
}
