/// Strips the weak-validator prefix and surrounding quotes from an etag.
pub fn normalize_etag(etag: &str) -> String {
    let trimmed = etag.trim();
    let trimmed = trimmed.strip_prefix("W/").unwrap_or(trimmed);
    trimmed.trim_matches('"').to_string()
}

/// Evaluates an `If-Match`/`If-None-Match` style condition against the current
/// (normalized) etag. `*` matches anything; lists are comma separated.
pub fn etag_matches(condition: &str, current: &str) -> bool {
    condition
        .split(',')
        .map(str::trim)
        .filter(|candidate| !candidate.is_empty())
        .any(|candidate| candidate == "*" || normalize_etag(candidate) == current)
}

pub fn is_wildcard(condition: &str) -> bool {
    condition.trim() == "*"
}

/// Quotes a normalized etag for use in an `ETag` header.
pub fn quote_etag(etag: &str) -> String {
    format!("\"{}\"", etag)
}
