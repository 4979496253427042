//! URL utilities for consistent endpoint construction
//!
//! Normalizes base URLs so that appending endpoint paths never produces
//! double slashes, regardless of how the configured URL was written.

/// Remove trailing slashes from a base URL.
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Join a base URL and an endpoint path with exactly one slash between them.
///
/// # Examples
///
/// ```
/// use charla::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("http://localhost:11434/", "api/tags"),
///     "http://localhost:11434/api/tags"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let normalized_base = normalize_base_url(base_url);
    let endpoint = endpoint.trim_start_matches('/');
    format!("{}/{}", normalized_base, endpoint)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_any_number_of_trailing_slashes() {
        assert_eq!(
            normalize_base_url("http://localhost:11434"),
            "http://localhost:11434"
        );
        assert_eq!(
            normalize_base_url("http://localhost:11434/"),
            "http://localhost:11434"
        );
        assert_eq!(
            normalize_base_url("http://localhost:11434///"),
            "http://localhost:11434"
        );
        assert_eq!(normalize_base_url(""), "");
    }

    #[test]
    fn construct_handles_slashes_on_either_side() {
        assert_eq!(
            construct_api_url("http://localhost:11434", "api/generate"),
            "http://localhost:11434/api/generate"
        );
        assert_eq!(
            construct_api_url("http://localhost:11434/", "/api/generate"),
            "http://localhost:11434/api/generate"
        );
        assert_eq!(
            construct_api_url("http://localhost:11434///", "api/pull"),
            "http://localhost:11434/api/pull"
        );
    }
}
