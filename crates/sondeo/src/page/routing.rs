//! Path patterns and a route table for identifying which page is showing.

use std::collections::HashMap;

/// URL path pattern for page objects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlMatcher {
    pattern: String,
    segments: Vec<UrlSegment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum UrlSegment {
    Literal(String),
    Wildcard,
    Parameter(String),
}

/// Path component of a URL, without query or fragment
fn path_of(url: &str) -> &str {
    let without_origin = match url.find("://") {
        Some(scheme_end) => {
            let rest = &url[scheme_end + 3..];
            rest.find('/').map_or("/", |i| &rest[i..])
        }
        None => url,
    };
    without_origin
        .split(['?', '#'])
        .next()
        .unwrap_or(without_origin)
}

fn segments_of(url: &str) -> Vec<&str> {
    path_of(url).split('/').filter(|s| !s.is_empty()).collect()
}

impl UrlMatcher {
    /// Create a matcher from a pattern.
    ///
    /// Patterns support literal segments (`/login`), wildcards (`/users/*`)
    /// and named parameters (`/users/:id`). Absolute URLs are matched on
    /// their path.
    #[must_use]
    pub fn new(pattern: &str) -> Self {
        let segments = pattern
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| {
                if s == "*" {
                    UrlSegment::Wildcard
                } else if let Some(name) = s.strip_prefix(':') {
                    UrlSegment::Parameter(name.to_string())
                } else {
                    UrlSegment::Literal(s.to_string())
                }
            })
            .collect();

        Self {
            pattern: pattern.to_string(),
            segments,
        }
    }

    /// Check if a URL matches the pattern
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        let url_segments = segments_of(url);

        // wildcards and parameters each consume exactly one segment
        url_segments.len() == self.segments.len()
            && self
                .segments
                .iter()
                .zip(&url_segments)
                .all(|(segment, actual)| match segment {
                    UrlSegment::Literal(lit) => lit == actual,
                    UrlSegment::Wildcard | UrlSegment::Parameter(_) => true,
                })
    }

    /// Extract named parameters from a matching URL
    #[must_use]
    pub fn extract_params(&self, url: &str) -> HashMap<String, String> {
        self.segments
            .iter()
            .zip(segments_of(url))
            .filter_map(|(segment, value)| match segment {
                UrlSegment::Parameter(name) => Some((name.clone(), value.to_string())),
                _ => None,
            })
            .collect()
    }

    /// Get the original pattern
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

/// Route table from page name to path pattern
#[derive(Debug, Default, Clone)]
pub struct PageRegistry {
    pages: Vec<(String, UrlMatcher)>,
}

impl PageRegistry {
    /// Create a new page registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a page under a path pattern; re-registering replaces it
    pub fn register(&mut self, name: impl Into<String>, pattern: &str) {
        let name = name.into();
        let matcher = UrlMatcher::new(pattern);
        match self.pages.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = matcher,
            None => self.pages.push((name, matcher)),
        }
    }

    /// Matcher of a page
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&UrlMatcher> {
        self.pages.iter().find(|(n, _)| n == name).map(|(_, m)| m)
    }

    /// First registered page whose pattern matches the URL
    #[must_use]
    pub fn identify(&self, url: &str) -> Option<&str> {
        self.pages
            .iter()
            .find(|(_, m)| m.matches(url))
            .map(|(n, _)| n.as_str())
    }

    /// Registered page names in registration order
    #[must_use]
    pub fn list(&self) -> Vec<&str> {
        self.pages.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Get the number of registered pages
    #[must_use]
    pub fn count(&self) -> usize {
        self.pages.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod url_matcher_tests {
        use super::*;

        #[test]
        fn test_literal_match() {
            let matcher = UrlMatcher::new("/login");
            assert!(matcher.matches("/login"));
            assert!(!matcher.matches("/register"));
            assert!(!matcher.matches("/login/extra"));
        }

        #[test]
        fn test_absolute_urls_match_on_path() {
            let matcher = UrlMatcher::new("/dashboard");
            assert!(matcher.matches("http://localhost:3000/dashboard"));
            assert!(matcher.matches("http://localhost:3000/dashboard?tab=orders#top"));
            assert!(!matcher.matches("http://localhost:3000/"));
        }

        #[test]
        fn test_wildcard_and_parameter() {
            let matcher = UrlMatcher::new("/users/*");
            assert!(matcher.matches("/users/123"));
            assert!(!matcher.matches("/users"));

            let matcher = UrlMatcher::new("/orders/:id/items/:item");
            let params = matcher.extract_params("https://shop.test/orders/42/items/7");
            assert_eq!(params.get("id").map(String::as_str), Some("42"));
            assert_eq!(params.get("item").map(String::as_str), Some("7"));
        }

        #[test]
        fn test_root() {
            assert!(UrlMatcher::new("/").matches("http://app.test"));
            assert_eq!(UrlMatcher::new("/a/b").pattern(), "/a/b");
        }
    }

    mod page_registry_tests {
        use super::*;

        fn registry() -> PageRegistry {
            let mut registry = PageRegistry::new();
            registry.register("login", "/login");
            registry.register("dashboard", "/dashboard");
            registry.register("order", "/orders/:id");
            registry
        }

        #[test]
        fn test_identify() {
            let registry = registry();
            assert_eq!(registry.identify("http://app/login"), Some("login"));
            assert_eq!(registry.identify("http://app/orders/9"), Some("order"));
            assert_eq!(registry.identify("http://app/unknown"), None);
        }

        #[test]
        fn test_register_replaces() {
            let mut registry = registry();
            registry.register("login", "/signin");
            assert_eq!(registry.count(), 3);
            assert_eq!(registry.get("login").unwrap().pattern(), "/signin");
            assert_eq!(registry.list(), vec!["login", "dashboard", "order"]);
        }
    }
}
