/// Default base URL for relay requests.
pub const DEFAULT_BASE_URL: &str = "https://api.tether.run";

/// Normalize a base URL: trim whitespace and trailing slashes, fall back to
/// the default when empty.
pub fn normalize_base_url(input: &str) -> String {
    let base = if input.trim().is_empty() {
        DEFAULT_BASE_URL
    } else {
        input.trim()
    };

    base.trim_end_matches('/').to_string()
}

/// Join a versioned API path onto a normalized base URL.
pub fn api_url(base: &str, path: &str) -> String {
    format!(
        "{}/api/v1/{}",
        normalize_base_url(base),
        path.trim_start_matches('/')
    )
}
