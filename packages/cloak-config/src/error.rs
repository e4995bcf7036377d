use std::path::PathBuf;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Could not read config file {path:?}: {source}")]
	Read { path: PathBuf, source: std::io::Error },
	#[error("Config file {path:?} is not valid TOML: {source}")]
	Parse { path: PathBuf, source: toml::de::Error },
	#[error("{message}")]
	Validation { message: String },
}
