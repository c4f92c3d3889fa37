//! `Cache-Control` parsing.

use std::time::Duration;

use reqwest::header::{HeaderMap, AGE, CACHE_CONTROL, VARY};

/// The directives of a `Cache-Control` header the disk cache acts on.
///
/// Unknown directives are ignored. When a header is repeated, the values
/// are merged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheControl {
    pub max_age: Option<u64>,
    pub no_cache: bool,
    pub no_store: bool,
    pub must_revalidate: bool,
}

impl CacheControl {
    pub fn parse(header: &str) -> Self {
        let mut control = Self::default();
        control.merge(header);
        control
    }

    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut control = Self::default();
        for value in headers.get_all(CACHE_CONTROL) {
            if let Ok(value) = value.to_str() {
                control.merge(value);
            }
        }
        control
    }

    fn merge(&mut self, header: &str) {
        for directive in header.split(',') {
            let directive = directive.trim().to_ascii_lowercase();
            match directive.as_str() {
                "no-cache" => self.no_cache = true,
                "no-store" => self.no_store = true,
                "must-revalidate" => self.must_revalidate = true,
                _ => {
                    if let Some(seconds) = directive.strip_prefix("max-age=") {
                        if let Ok(seconds) = seconds.trim_matches('"').parse::<u64>() {
                            self.max_age = Some(seconds);
                        }
                    }
                }
            }
        }
    }

    /// How long a response may be served from disk, or `None` if it must
    /// not be stored at all.
    ///
    /// Only explicit `max-age` lifetimes count; there is no heuristic
    /// freshness.
    pub fn freshness_lifetime(&self) -> Option<Duration> {
        if self.no_store || self.no_cache {
            return None;
        }
        self.max_age
            .filter(|&seconds| seconds > 0)
            .map(Duration::from_secs)
    }
}

/// Remaining lifetime of a response with these headers, or `None` if it
/// must not be stored.
pub fn storable_lifetime(headers: &HeaderMap) -> Option<Duration> {
    if headers
        .get(VARY)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim() == "*")
    {
        return None;
    }

    let lifetime = CacheControl::from_headers(headers).freshness_lifetime()?;
    let age = headers
        .get(AGE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or_default();

    lifetime.checked_sub(age).filter(|left| !left.is_zero())
}

#[cfg(test)]
mod tests {
    use reqwest::header::HeaderValue;

    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_parse_directives() {
        let control = CacheControl::parse("public, Max-Age=600, must-revalidate");
        assert_eq!(control.max_age, Some(600));
        assert!(control.must_revalidate);
        assert!(!control.no_store);
        assert_eq!(control.freshness_lifetime(), Some(Duration::from_secs(600)));
    }

    #[test]
    fn test_no_store_wins_over_max_age() {
        let control = CacheControl::parse("max-age=86400, no-store");
        assert_eq!(control.freshness_lifetime(), None);
    }

    #[test]
    fn test_repeated_headers_merge() {
        let map = headers(&[("cache-control", "max-age=60"), ("cache-control", "no-cache")]);
        let control = CacheControl::from_headers(&map);
        assert_eq!(control.max_age, Some(60));
        assert!(control.no_cache);
    }

    #[test]
    fn test_missing_or_zero_max_age_is_not_storable() {
        assert_eq!(storable_lifetime(&headers(&[])), None);
        assert_eq!(
            storable_lifetime(&headers(&[("cache-control", "public")])),
            None
        );
        assert_eq!(
            storable_lifetime(&headers(&[("cache-control", "max-age=0")])),
            None
        );
    }

    #[test]
    fn test_age_shortens_lifetime() {
        let map = headers(&[("cache-control", "max-age=100"), ("age", "40")]);
        assert_eq!(storable_lifetime(&map), Some(Duration::from_secs(60)));

        let expired = headers(&[("cache-control", "max-age=100"), ("age", "100")]);
        assert_eq!(storable_lifetime(&expired), None);
    }

    #[test]
    fn test_vary_star_is_not_storable() {
        let map = headers(&[("cache-control", "max-age=100"), ("vary", "*")]);
        assert_eq!(storable_lifetime(&map), None);
    }
}
