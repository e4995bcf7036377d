use regex::Regex;

const MAX_ERROR_CHARS: usize = 500;
const REDACTED: &str = "[REDACTED]";

const SECRET_PATTERNS: [&str; 5] = [
	r"(?i)(bearer\s+)\S+",
	r"(?i)(api[_-]?key\s*[:=]\s*)\S+",
	r"(?i)(password\s*[:=]\s*)\S+",
	r"(?i)(secret\s*[:=]\s*)\S+",
	r"(?i)(token\s*[:=]\s*)\S+",
];

/// Formats upstream error text for a log line, honoring the redaction toggle.
///
/// Provider and backend errors can echo request fragments; this is the only
/// path their text takes into the log.
pub fn error_text(text: &str, redact: bool) -> String {
	if redact { sanitize_error(text) } else { truncate_chars(text, MAX_ERROR_CHARS) }
}

/// Scrubs credential-shaped fragments from error text, then truncates the
/// result to a loggable length.
pub fn sanitize_error(text: &str) -> String {
	let mut sanitized = text.to_string();

	for pattern in SECRET_PATTERNS {
		sanitized = Regex::new(pattern)
			.map(|re| re.replace_all(&sanitized, format!("${{1}}{REDACTED}")).into_owned())
			.unwrap_or(sanitized);
	}

	truncate_chars(&sanitized, MAX_ERROR_CHARS)
}

fn truncate_chars(text: &str, limit: usize) -> String {
	if text.chars().count() <= limit {
		return text.to_string();
	}

	let mut truncated = text.chars().take(limit).collect::<String>();

	truncated.push_str("...");

	truncated
}
