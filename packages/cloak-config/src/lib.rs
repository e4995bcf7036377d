mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Backend, CompletionProviderConfig, Config, Context, EmbeddingProviderConfig, History, Keyring,
	Providers, Search, Security, Service,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::Read { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::Parse { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.keyring.session_ttl_minutes <= 0 {
		return Err(Error::Validation {
			message: "keyring.session_ttl_minutes must be greater than zero.".to_string(),
		});
	}
	if cfg.keyring.max_sessions == 0 {
		return Err(Error::Validation {
			message: "keyring.max_sessions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.max_batch == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.max_batch must be greater than zero.".to_string(),
		});
	}
	if !cfg.providers.completion.temperature.is_finite()
		|| cfg.providers.completion.temperature < 0.0
	{
		return Err(Error::Validation {
			message: "providers.completion.temperature must be zero or greater.".to_string(),
		});
	}

	for (label, key) in [
		("embedding", &cfg.providers.embedding.api_key),
		("completion", &cfg.providers.completion.api_key),
	] {
		if key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
	}

	if cfg.backend.api_base.trim().is_empty() {
		return Err(Error::Validation {
			message: "backend.api_base must be non-empty.".to_string(),
		});
	}

	for (label, path) in [
		("backend.search_path", &cfg.backend.search_path),
		("backend.ownership_path", &cfg.backend.ownership_path),
	] {
		if !path.starts_with('/') {
			return Err(Error::Validation {
				message: format!("{label} must start with a slash."),
			});
		}
	}

	if !cfg.search.match_threshold.is_finite()
		|| !(0.0..=0.99).contains(&cfg.search.match_threshold)
	{
		return Err(Error::Validation {
			message: "search.match_threshold must be within 0.0-0.99.".to_string(),
		});
	}
	if !(1..=50).contains(&cfg.search.match_count) {
		return Err(Error::Validation {
			message: "search.match_count must be within 1-50.".to_string(),
		});
	}
	if !(1..=20).contains(&cfg.search.batch_size) {
		return Err(Error::Validation {
			message: "search.batch_size must be within 1-20.".to_string(),
		});
	}
	if !cfg.context.min_similarity.is_finite() || !(0.0..=1.0).contains(&cfg.context.min_similarity)
	{
		return Err(Error::Validation {
			message: "context.min_similarity must be within 0.0-1.0.".to_string(),
		});
	}
	if cfg.context.max_chunks == 0 {
		return Err(Error::Validation {
			message: "context.max_chunks must be greater than zero.".to_string(),
		});
	}
	if cfg.history.max_tokens == 0 {
		return Err(Error::Validation {
			message: "history.max_tokens must be greater than zero.".to_string(),
		});
	}
	if cfg.history.reserved_generation_budget >= cfg.history.max_tokens {
		return Err(Error::Validation {
			message: "history.reserved_generation_budget must be less than history.max_tokens."
				.to_string(),
		});
	}
	if cfg.history.max_sessions == 0 {
		return Err(Error::Validation {
			message: "history.max_sessions must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.security.api_auth_token.as_deref().map(|token| token.trim().is_empty()).unwrap_or(false)
	{
		cfg.security.api_auth_token = None;
	}
}
