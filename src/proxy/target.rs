//! Upstream URL construction.

use url::Url;

use crate::routing::RoutedPath;

/// The fixed upstream origin.
#[derive(Debug, Clone)]
pub struct UpstreamTarget {
    origin: Url,
}

impl UpstreamTarget {
    pub fn parse(origin: &str) -> Result<Self, url::ParseError> {
        let origin = Url::parse(origin)?;
        if origin.cannot_be_a_base() || origin.host_str().is_none() {
            return Err(url::ParseError::EmptyHost);
        }
        Ok(Self { origin })
    }

    /// Origin with its path replaced by `path` and its query set to `query`.
    ///
    /// The origin's own path, query and fragment are discarded. Percent
    /// escapes already present in `path` and `query` are kept as they are.
    /// Bytes the URL standard forbids in a query for http(s) (`'`, space,
    /// `"`, `<`, `>`) are percent-encoded; everything else is copied as is.
    pub fn url_for(&self, path: &RoutedPath, query: Option<&str>) -> Url {
        let mut url = self.origin.clone();
        url.set_fragment(None);
        url.set_path(path.as_str());
        url.set_query(query);
        url
    }
}
