use std::{
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use toml::Value;

use cloak_config::{Config, Error};

const SAMPLE_CONFIG_TEMPLATE_TOML: &str = include_str!("fixtures/sample_config.template.toml");

fn sample_toml() -> String {
	SAMPLE_CONFIG_TEMPLATE_TOML.to_string()
}

fn sample_toml_with(section: &str, key: &str, value: Value) -> String {
	let mut root: Value =
		toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse template config.");
	let table = root.as_table_mut().expect("Template config must be a table.");
	let section = table
		.get_mut(section)
		.and_then(Value::as_table_mut)
		.unwrap_or_else(|| panic!("Template config must include [{section}]."));

	section.insert(key.to_string(), value);

	toml::to_string(&root).expect("Failed to render template config.")
}

fn write_temp_config(payload: String) -> PathBuf {
	static COUNTER: AtomicU64 = AtomicU64::new(0);

	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System time must be valid.")
		.as_nanos();
	let ordinal = COUNTER.fetch_add(1, Ordering::SeqCst);
	let pid = std::process::id();
	let mut path = env::temp_dir();

	path.push(format!("cloak_config_test_{nanos}_{pid}_{ordinal}.toml"));

	fs::write(&path, payload).expect("Failed to write test config.");

	path
}

fn base_config() -> Config {
	toml::from_str(&sample_toml()).expect("Failed to parse test config.")
}

fn load_expecting_error(payload: String) -> Error {
	let path = write_temp_config(payload);
	let result = cloak_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	result.expect_err("Expected a validation error.")
}

#[test]
fn template_config_is_valid() {
	let path = write_temp_config(sample_toml());
	let result = cloak_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	result.expect("Expected template config to load.");
}

#[test]
fn example_toml_is_valid() {
	let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));

	path.push("../../cloak.example.toml");

	cloak_config::load(&path).expect("Expected cloak.example.toml to be a valid config.");
}

#[test]
fn match_threshold_must_stay_below_ceiling() {
	let payload = sample_toml_with("search", "match_threshold", Value::Float(1.0));
	let err = load_expecting_error(payload);

	assert!(
		err.to_string().contains("search.match_threshold must be within 0.0-0.99."),
		"Unexpected error: {err}"
	);
}

#[test]
fn match_count_must_be_within_range() {
	let payload = sample_toml_with("search", "match_count", Value::Integer(51));
	let err = load_expecting_error(payload);

	assert!(
		err.to_string().contains("search.match_count must be within 1-50."),
		"Unexpected error: {err}"
	);

	let payload = sample_toml_with("search", "match_count", Value::Integer(0));
	let err = load_expecting_error(payload);

	assert!(
		err.to_string().contains("search.match_count must be within 1-50."),
		"Unexpected error: {err}"
	);
}

#[test]
fn batch_size_must_be_within_range() {
	let payload = sample_toml_with("search", "batch_size", Value::Integer(21));
	let err = load_expecting_error(payload);

	assert!(
		err.to_string().contains("search.batch_size must be within 1-20."),
		"Unexpected error: {err}"
	);
}

#[test]
fn embedding_api_key_must_be_non_empty() {
	let mut root: Value =
		toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse template config.");
	let embedding = root
		.as_table_mut()
		.and_then(|t| t.get_mut("providers"))
		.and_then(Value::as_table_mut)
		.and_then(|t| t.get_mut("embedding"))
		.and_then(Value::as_table_mut)
		.expect("Template config must include [providers.embedding].");

	embedding.insert("api_key".to_string(), Value::String("   ".to_string()));

	let payload = toml::to_string(&root).expect("Failed to render template config.");
	let err = load_expecting_error(payload);

	assert!(
		err.to_string().contains("Provider embedding api_key must be non-empty."),
		"Unexpected error: {err}"
	);
}

#[test]
fn backend_paths_must_be_rooted() {
	let payload =
		sample_toml_with("backend", "search_path", Value::String("v1/search".to_string()));
	let err = load_expecting_error(payload);

	assert!(
		err.to_string().contains("backend.search_path must start with a slash."),
		"Unexpected error: {err}"
	);
}

#[test]
fn reserved_generation_budget_must_leave_room() {
	let payload = sample_toml_with("history", "reserved_generation_budget", Value::Integer(8192));
	let err = load_expecting_error(payload);

	assert!(
		err.to_string()
			.contains("history.reserved_generation_budget must be less than history.max_tokens."),
		"Unexpected error: {err}"
	);
}

#[test]
fn keyring_session_ttl_must_be_positive() {
	let payload = sample_toml_with("keyring", "session_ttl_minutes", Value::Integer(0));
	let err = load_expecting_error(payload);

	assert!(
		err.to_string().contains("keyring.session_ttl_minutes must be greater than zero."),
		"Unexpected error: {err}"
	);
}

#[test]
fn blank_api_auth_token_normalizes_to_none() {
	let mut cfg = base_config();

	cfg.security.api_auth_token = Some("   ".to_string());

	let payload = sample_toml_with("security", "api_auth_token", Value::String("   ".to_string()));
	let path = write_temp_config(payload);
	let loaded = cloak_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	let loaded = loaded.expect("Expected config with blank token to load.");

	assert_eq!(loaded.security.api_auth_token, None);
	assert!(cloak_config::validate(&cfg).is_ok());
}

#[test]
fn missing_section_is_a_parse_error() {
	let payload = sample_toml().replace("[history]", "[history_renamed]");
	let path = write_temp_config(payload);
	let err = cloak_config::load(&path).expect_err("Expected missing history parse error.");

	fs::remove_file(&path).expect("Failed to remove test config.");

	let message = match err {
		Error::Parse { source, .. } => source.to_string(),
		err => panic!("Expected parse config error, got {err}"),
	};

	assert!(message.contains("missing field `history`"), "Unexpected error: {message}");
}
