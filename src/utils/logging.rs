use serde::Serialize;

pub(crate) fn with_pretty_json_debug<T, F>(value: &T, log_action: F)
where
    T: Serialize,
    F: FnOnce(&str),
{
    if !tracing::enabled!(tracing::Level::DEBUG) {
        return;
    }

    let pretty_json = serde_json::to_string_pretty(value)
        .unwrap_or_else(|error| format!("<pretty serialize failed: {error}>"));
    log_action(pretty_json.as_str());
}

/// Masks a secret for logs and `Debug`, keeping only a 4-char prefix on long values.
pub fn redact(secret: &str) -> String {
    let len = secret.chars().count();
    if len <= 8 {
        return "***".to_string();
    }
    let prefix: String = secret.chars().take(4).collect();
    format!("{prefix}***({len})")
}

pub fn redact_opt(secret: Option<&str>) -> Option<String> {
    secret.map(redact)
}
