//! Classification of asset keys.
//!
//! An asset key is either a URL with one of the recognised schemes or an
//! opaque local path. Nothing else is inferred from the key.

use std::fmt;

/// URL schemes that route a key to the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    /// Every recognised scheme.
    pub const ALL: [Scheme; 2] = [Scheme::Http, Scheme::Https];

    /// The scheme prefix including `://`.
    pub fn prefix(self) -> &'static str {
        match self {
            Scheme::Http => "http://",
            Scheme::Https => "https://",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scheme::Http => f.write_str("http"),
            Scheme::Https => f.write_str("https"),
        }
    }
}

/// Where an asset key should be resolved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locator {
    /// A remote URL with a recognised scheme.
    Remote(Scheme),
    /// Anything else: treated as a filesystem path.
    Local,
}

impl Locator {
    /// Classify `key` by its scheme prefix. The scheme is matched
    /// case-insensitively; the rest of the key is not inspected.
    pub fn classify(key: &str) -> Self {
        let key = key.trim_start();
        for scheme in Scheme::ALL {
            let prefix = scheme.prefix();
            if key.len() >= prefix.len()
                && key.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
            {
                return Locator::Remote(scheme);
            }
        }
        Locator::Local
    }

    pub fn is_remote(self) -> bool {
        matches!(self, Locator::Remote(_))
    }
}

/// Shorthand for `Locator::classify(key).is_remote()`.
pub fn is_remote(key: &str) -> bool {
    Locator::classify(key).is_remote()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_and_https_are_remote() {
        assert_eq!(
            Locator::classify("http://example.com/a.png"),
            Locator::Remote(Scheme::Http)
        );
        assert_eq!(
            Locator::classify("https://example.com/a.png"),
            Locator::Remote(Scheme::Https)
        );
    }

    #[test]
    fn test_scheme_is_case_insensitive() {
        assert_eq!(
            Locator::classify("HTTPS://EXAMPLE.COM/A.PNG"),
            Locator::Remote(Scheme::Https)
        );
    }

    #[test]
    fn test_paths_are_local() {
        assert_eq!(Locator::classify("/var/tmp/a.jpg"), Locator::Local);
        assert_eq!(Locator::classify("a.jpg"), Locator::Local);
        assert_eq!(Locator::classify(""), Locator::Local);
    }

    #[test]
    fn test_bare_prefix_without_separator_is_local() {
        // a file literally named "httpfoo.jpg" is not a URL
        assert_eq!(Locator::classify("httpfoo.jpg"), Locator::Local);
        assert_eq!(Locator::classify("http:/missing-slash"), Locator::Local);
        assert!(!is_remote("ftp://example.com/a.png"));
        assert!(!is_remote("file:///tmp/a.png"));
    }
}
