//! Intercepted request model and URL canonicalization.
//!
//! Every request entering the worker is represented as a [`WorkerRequest`]
//! with an already-canonicalized URL, so route classification and cache key
//! computation see the same identity.

use url::Url;

use crate::Error;

/// Canonicalize a URL string for consistent caching and classification.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Lowercase the host
/// 3. Remove fragment (#...)
/// 4. Keep query string intact (do not reorder)
///
/// Schemes outside http/https (browser-extension schemes, `data:`, ...)
/// are rejected with [`Error::UnsupportedScheme`] so they never reach the
/// interception path.
pub fn canonicalize(input: &str) -> Result<Url, Error> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()));
    }

    let mut parsed = Url::parse(trimmed).map_err(|e| Error::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(Error::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str() {
        let lowered = host.to_lowercase();
        if lowered != host {
            parsed
                .set_host(Some(lowered.as_str()))
                .map_err(|e| Error::InvalidUrl(e.to_string()))?;
        }
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// An intercepted request.
///
/// Method and URL together form the cache identity; headers are carried for
/// content negotiation (the `Accept` header decides whether a failed static
/// request gets the offline page).
#[derive(Debug, Clone)]
pub struct WorkerRequest {
    /// Uppercased HTTP method.
    pub method: String,
    /// Canonical request URL.
    pub url: Url,
    /// Request headers as (name, value) pairs, names lowercased.
    pub headers: Vec<(String, String)>,
}

impl WorkerRequest {
    /// Build a request from raw parts, canonicalizing the URL.
    pub fn new(method: &str, url: &str, headers: Vec<(String, String)>) -> Result<Self, Error> {
        let url = canonicalize(url)?;
        let headers = headers
            .into_iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), value))
            .collect();

        Ok(Self { method: method.to_ascii_uppercase(), url, headers })
    }

    /// Convenience constructor for a GET request with no headers.
    pub fn get(url: &str) -> Result<Self, Error> {
        Self::new("GET", url, Vec::new())
    }

    /// First header value for `name` (case-insensitive), if present.
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Whether the request negotiates for an HTML document.
    pub fn accepts_html(&self) -> bool {
        self.header("accept").is_some_and(|v| v.contains("text/html"))
    }

    /// Origin (scheme://host:port) of the request URL.
    pub fn origin(&self) -> String {
        self.url.origin().ascii_serialization()
    }

    /// Human-readable identity used in logs and error messages.
    pub fn identity(&self) -> String {
        format!("{} {}", self.method, self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_basic() {
        let url = canonicalize("https://example.com").unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host_str(), Some("example.com"));
    }

    #[test]
    fn test_canonicalize_lowercase_host() {
        let url = canonicalize("https://EXAMPLE.COM/Cars/42").unwrap();
        assert_eq!(url.host_str(), Some("example.com"));
        assert_eq!(url.path(), "/Cars/42");
    }

    #[test]
    fn test_canonicalize_remove_fragment() {
        let url = canonicalize("https://example.com/dashboard#section").unwrap();
        assert_eq!(url.fragment(), None);
        assert_eq!(url.path(), "/dashboard");
    }

    #[test]
    fn test_canonicalize_preserve_query() {
        let url = canonicalize("https://example.com/api/cars?page=2&sort=price").unwrap();
        assert_eq!(url.query(), Some("page=2&sort=price"));
    }

    #[test]
    fn test_canonicalize_trim_whitespace() {
        let url = canonicalize("  https://example.com  ").unwrap();
        assert_eq!(url.as_str(), "https://example.com/");
    }

    #[test]
    fn test_canonicalize_extension_scheme_excluded() {
        let result = canonicalize("chrome-extension://abcdef/script.js");
        assert!(matches!(result, Err(Error::UnsupportedScheme(_))));
    }

    #[test]
    fn test_canonicalize_data_scheme_excluded() {
        let result = canonicalize("data:text/plain,hello");
        assert!(matches!(result, Err(Error::UnsupportedScheme(_))));
    }

    #[test]
    fn test_canonicalize_empty() {
        let result = canonicalize("   ");
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_request_method_uppercased() {
        let req = WorkerRequest::new("get", "http://localhost:8000/cars/42", Vec::new()).unwrap();
        assert_eq!(req.method, "GET");
    }

    #[test]
    fn test_request_accepts_html() {
        let req = WorkerRequest::new(
            "GET",
            "http://localhost:8000/dashboard",
            vec![("Accept".into(), "text/html,application/xhtml+xml".into())],
        )
        .unwrap();
        assert!(req.accepts_html());

        let req = WorkerRequest::new(
            "GET",
            "http://localhost:8000/static/js/app.js",
            vec![("Accept".into(), "*/*".into())],
        )
        .unwrap();
        assert!(!req.accepts_html());
    }

    #[test]
    fn test_request_identity() {
        let req = WorkerRequest::get("http://localhost:8000/cars/42").unwrap();
        assert_eq!(req.identity(), "GET http://localhost:8000/cars/42");
    }
}
