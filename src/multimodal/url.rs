//! URL and URI detection in free text.
//!
//! Detection is a lexical heuristic built from five explicit shapes, tried
//! leftmost-first in declaration order:
//!
//! | shape        | example                          |
//! |--------------|----------------------------------|
//! | `SchemeUrl`  | `https://host/path`, `ftp://...` |
//! | `WwwHost`    | `www.example.com/page`           |
//! | `DottedHost` | `example.org/docs`               |
//! | `FileUri`    | `file:///tmp/data.csv`           |
//! | `DataUri`    | `data:text/plain,hello`          |
//!
//! Anything file-name-like (`report.pdf`) also satisfies `DottedHost` and comes
//! back as `https://report.pdf`. That over-match is a known limitation of the
//! grammar and is left as is. `data:` URIs never have an authority and are always
//! dropped by validation.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;
use tracing::{debug, trace};
use url::Url;

/// Characters that terminate a match in every shape.
const URL_CHAR: &str = r#"[^\s<>"{}|\\^`\[\]]"#;

/// Lexical shape of a raw match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlShape {
    /// `http://`, `https://` or `ftp://` followed by URL characters.
    SchemeUrl,
    /// Bare host starting with `www.`.
    WwwHost,
    /// Dotted `host.tld` with an optional `/path`.
    DottedHost,
    /// `file://` URI.
    FileUri,
    /// `data:` URI.
    DataUri,
}

impl UrlShape {
    /// All shapes in scan priority order.
    pub const ALL: [UrlShape; 5] = [
        UrlShape::SchemeUrl,
        UrlShape::WwwHost,
        UrlShape::DottedHost,
        UrlShape::FileUri,
        UrlShape::DataUri,
    ];

    /// Capture group name used in the combined scanner.
    fn group(self) -> &'static str {
        match self {
            UrlShape::SchemeUrl => "scheme",
            UrlShape::WwwHost => "www",
            UrlShape::DottedHost => "dotted",
            UrlShape::FileUri => "file",
            UrlShape::DataUri => "data",
        }
    }

    /// Regex source for this shape, without case-insensitivity flags.
    pub fn pattern(self) -> String {
        let template = match self {
            UrlShape::SchemeUrl => r"(?:https?|ftp)://@+(?:\.@+)*",
            UrlShape::WwwHost => r"www\.@+(?:\.@+)*",
            UrlShape::DottedHost => r"(?:[\w\-]+\.)+[a-zA-Z]{2,}(?:/@*)?",
            UrlShape::FileUri => r"file://@+",
            UrlShape::DataUri => r"data:@+",
        };
        template.replace('@', URL_CHAR)
    }
}

/// A normalized, validated absolute URI.
///
/// The scheme is always non-empty, and the URI either has a host or uses the
/// `file` scheme. Only [`UrlDetector`] can build one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DetectedUrl(String);

impl DetectedUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }

}

impl std::fmt::Display for DetectedUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DetectedUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A raw lexical match before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMatch {
    pub shape: UrlShape,
    pub text: String,
}

/// Scans text for links and URIs.
pub struct UrlDetector {
    scanner: Regex,
    scheme_prefix: Regex,
}

impl UrlDetector {
    pub fn new() -> Self {
        let alternatives = UrlShape::ALL
            .iter()
            .map(|shape| format!("(?P<{}>{})", shape.group(), shape.pattern()))
            .collect::<Vec<_>>()
            .join("|");

        let scanner = Regex::new(&format!("(?i){}", alternatives)).expect("Invalid regex");
        let scheme_prefix = Regex::new(r"^[a-zA-Z][a-zA-Z\d+\-.]*:").expect("Invalid regex");

        Self {
            scanner,
            scheme_prefix,
        }
    }

    /// Return every non-overlapping raw match, leftmost first.
    pub fn scan(&self, text: &str) -> Vec<RawMatch> {
        self.scanner
            .captures_iter(text)
            .filter_map(|caps| {
                UrlShape::ALL.iter().find_map(|shape| {
                    caps.name(shape.group()).map(|m| RawMatch {
                        shape: *shape,
                        text: m.as_str().trim().to_string(),
                    })
                })
            })
            .collect()
    }

    /// Whether the text contains anything URL-shaped, valid or not.
    pub fn contains_urls(&self, text: &str) -> bool {
        self.scanner.is_match(text)
    }

    /// Prepend `https://` to scheme-less matches that look like hosts.
    pub fn normalize(&self, raw: &str) -> String {
        if self.scheme_prefix.is_match(raw) {
            return raw.to_string();
        }

        if raw.starts_with("www.") || (raw.contains('.') && !raw.starts_with('.')) {
            format!("https://{}", raw)
        } else {
            raw.to_string()
        }
    }

    /// Parse a normalized candidate and keep it only if it is an absolute URI with
    /// a host, or a `file` URI.
    ///
    /// The host must follow `://` directly. The `url` crate skips extra slashes
    /// for special schemes, so `https:///example.com` would otherwise pass.
    pub fn validate(&self, candidate: &str) -> Option<DetectedUrl> {
        let parsed = match Url::parse(candidate) {
            Ok(url) => url,
            Err(e) => {
                trace!("Discarding {:?}: {}", candidate, e);
                return None;
            }
        };

        if parsed.scheme() != "file" {
            let authority = candidate.split_once("://").map(|(_, rest)| rest);
            if !authority.is_some_and(|rest| !rest.is_empty() && !rest.starts_with('/')) {
                trace!("Discarding {:?}: empty authority", candidate);
                return None;
            }
        }

        let has_host = parsed.host_str().is_some_and(|h| !h.is_empty());
        if !parsed.scheme().is_empty() && (has_host || parsed.scheme() == "file") {
            Some(DetectedUrl(candidate.to_string()))
        } else {
            trace!("Discarding {:?}: no authority", candidate);
            None
        }
    }

    /// Extract the set of valid, normalized URLs from text.
    ///
    /// Duplicates are removed by exact string comparison after normalization. The
    /// returned order is first occurrence, but callers should treat it as a set.
    pub fn extract(&self, text: &str) -> Vec<DetectedUrl> {
        if text.is_empty() {
            return Vec::new();
        }

        let mut seen = HashSet::new();
        let mut urls = Vec::new();

        for raw in self.scan(text) {
            let candidate = self.normalize(&raw.text);
            if let Some(url) = self.validate(&candidate) {
                if seen.insert(url.clone()) {
                    urls.push(url);
                }
            }
        }

        debug!("Detected {} URL(s)", urls.len());
        urls
    }
}

impl Default for UrlDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract URLs with a shared detector.
pub fn extract_urls(text: &str) -> Vec<DetectedUrl> {
    static DETECTOR: OnceLock<UrlDetector> = OnceLock::new();
    DETECTOR.get_or_init(UrlDetector::new).extract(text)
}
