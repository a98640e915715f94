//! Route classification.
//!
//! Maps a request URL to the caching strategy that will serve it. The
//! decision is a pure function of the URL path: no cache or network access,
//! fully deterministic, checked before either strategy touches anything.

use url::Url;

/// How an intercepted request will be served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Backend API endpoint; served network-first with cache fallback.
    Dynamic,
    /// Cacheable asset or page shell; served cache-first.
    Static,
}

impl std::fmt::Display for RouteClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouteClass::Dynamic => write!(f, "dynamic"),
            RouteClass::Static => write!(f, "static"),
        }
    }
}

/// Path markers identifying backend API traffic.
///
/// Requests whose path contains any of these segments go network-first;
/// everything else is treated as a static asset. The set is fixed at
/// deployment: generic API, authentication, the two resource collections,
/// and the document endpoints.
pub const API_MARKERS: &[&str] = &["/api/", "/auth/", "/cars/", "/clients/", "/docs/"];

/// Classify a request URL by its path.
pub fn classify(url: &Url) -> RouteClass {
    let path = url.path();
    if API_MARKERS.iter().any(|marker| path.contains(marker)) {
        RouteClass::Dynamic
    } else {
        RouteClass::Static
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_api_paths_are_dynamic() {
        for path in [
            "/api/tenants",
            "/auth/login",
            "/cars/42",
            "/clients/7/documents",
            "/docs/contract.pdf",
            "/v2/api/health",
        ] {
            let url = parse(&format!("http://localhost:8000{path}"));
            assert_eq!(classify(&url), RouteClass::Dynamic, "{path}");
        }
    }

    #[test]
    fn test_asset_paths_are_static() {
        for path in [
            "/",
            "/dashboard",
            "/static/css/style.css",
            "/static/js/app.js",
            "/static/manifest.json",
            "/favicon.ico",
        ] {
            let url = parse(&format!("http://localhost:8000{path}"));
            assert_eq!(classify(&url), RouteClass::Static, "{path}");
        }
    }

    #[test]
    fn test_marker_requires_trailing_slash() {
        // "/cars" alone is a page route, not the resource collection.
        let url = parse("http://localhost:8000/cars");
        assert_eq!(classify(&url), RouteClass::Static);
    }

    #[test]
    fn test_query_does_not_affect_class() {
        let url = parse("http://localhost:8000/dashboard?tab=cars%2F");
        assert_eq!(classify(&url), RouteClass::Static);
    }

    #[test]
    fn test_classification_ignores_host() {
        let url = parse("https://cars/static/logo.png");
        assert_eq!(classify(&url), RouteClass::Static);
    }
}
