//! Mount-relative path resolution.

use std::fmt;

/// The path forwarded upstream. Always starts with `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedPath(String);

impl RoutedPath {
    /// `/` + segments joined with `/`, or `/` when there are none.
    pub fn from_segments<S: AsRef<str>>(segments: &[S]) -> Self {
        if segments.is_empty() {
            return Self("/".to_string());
        }
        let joined = segments
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join("/");
        Self(format!("/{joined}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoutedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The prefix the gateway is mounted under.
#[derive(Debug, Clone)]
pub struct Mount {
    prefix: String,
}

impl Mount {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.trim_end_matches('/').to_string(),
        }
    }

    /// Segments of `raw_path` below the mount. `None` if the path is outside it.
    pub fn segments<'a>(&self, raw_path: &'a str) -> Option<Vec<&'a str>> {
        let rest = raw_path.strip_prefix(self.prefix.as_str())?;
        if !rest.is_empty() && !rest.starts_with('/') {
            return None;
        }
        let rest = rest.strip_prefix('/').unwrap_or(rest);
        if rest.is_empty() {
            return Some(Vec::new());
        }
        Some(rest.split('/').collect())
    }

    /// Resolve `raw_path` to the upstream path.
    pub fn resolve(&self, raw_path: &str) -> Option<RoutedPath> {
        self.segments(raw_path)
            .map(|segments| RoutedPath::from_segments(&segments))
    }
}
