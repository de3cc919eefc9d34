//! Resource URL canonicalization.
//!
//! Resource ids double as target URLs. Before a request leaves the process the
//! id is turned into an absolute http(s) URL with a lowercase host and no
//! fragment; the query string is kept as given.

use crate::error::FetchError;
use url::Url;

/// Turn a resource id into the URL sent to the extraction service.
pub fn canonicalize_target(resource_id: &str) -> Result<Url, FetchError> {
    let trimmed = resource_id.trim();
    if trimmed.is_empty() {
        return Err(FetchError::InvalidTarget("empty resource id".into()));
    }

    let candidate = if trimmed.contains("://") { trimmed.to_string() } else { format!("https://{trimmed}") };
    let mut target = Url::parse(&candidate).map_err(|e| FetchError::InvalidTarget(format!("{trimmed}: {e}")))?;

    if !matches!(target.scheme(), "http" | "https") {
        return Err(FetchError::InvalidTarget(format!("unsupported scheme: {}", target.scheme())));
    }
    if target.host_str().is_none_or(str::is_empty) {
        return Err(FetchError::InvalidTarget(format!("{trimmed}: missing host")));
    }

    // `Url` already lowercases registrable hosts; the fragment never reaches a server.
    target.set_fragment(None);
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_https() {
        let url = canonicalize_target("shop.example.com/catalog").unwrap();
        assert_eq!(url.as_str(), "https://shop.example.com/catalog");
    }

    #[test]
    fn test_lowercases_host_and_drops_fragment() {
        let url = canonicalize_target("  HTTP://Shop.Example.COM/Items?page=2#top ").unwrap();
        assert_eq!(url.scheme(), "http");
        assert_eq!(url.host_str(), Some("shop.example.com"));
        assert_eq!(url.path(), "/Items");
        assert_eq!(url.query(), Some("page=2"));
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn test_rejects_empty_and_foreign_schemes() {
        assert!(matches!(canonicalize_target("   "), Err(FetchError::InvalidTarget(_))));
        assert!(matches!(canonicalize_target("ftp://example.com"), Err(FetchError::InvalidTarget(_))));
        assert!(matches!(canonicalize_target("file:///etc/hosts"), Err(FetchError::InvalidTarget(_))));
    }
}
