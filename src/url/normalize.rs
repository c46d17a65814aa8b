use crate::UrlError;
use std::fmt;
use url::Url;

/// A URL in canonical form: absolute, lowercase host, no fragment
///
/// This is the only identity key used by the visited set and the discovered-file
/// set. Two values compare equal exactly when their serialized forms do.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NormalizedUrl(Url);

impl NormalizedUrl {
    /// Parses an absolute URL string (typically the seed) into canonical form
    ///
    /// Unlike [`normalize`], this reports why the input was rejected, since a bad
    /// seed is a configuration error rather than a link to skip.
    ///
    /// # Examples
    ///
    /// ```
    /// use sumi_harvest::url::NormalizedUrl;
    ///
    /// let url = NormalizedUrl::parse("https://EXAMPLE.test/docs#top").unwrap();
    /// assert_eq!(url.as_str(), "https://example.test/docs");
    /// ```
    pub fn parse(input: &str) -> Result<Self, UrlError> {
        let url = Url::parse(input.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(UrlError::InvalidScheme(format!(
                "Only HTTP and HTTPS schemes are supported, got: {}",
                url.scheme()
            )));
        }

        if url.host_str().map_or(true, str::is_empty) {
            return Err(UrlError::MissingDomain);
        }

        canonicalize(url).ok_or_else(|| UrlError::Parse(input.to_string()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }

    /// Path component, as served (case preserved)
    pub fn path(&self) -> &str {
        self.0.path()
    }

    pub fn into_string(self) -> String {
        self.0.into()
    }
}

impl fmt::Display for NormalizedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl AsRef<str> for NormalizedUrl {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl From<NormalizedUrl> for Url {
    fn from(value: NormalizedUrl) -> Self {
        value.0
    }
}

/// Resolves `href` against `base` and canonicalizes the result
///
/// # Normalization Steps
///
/// 1. Resolve the reference against the base URL (relative paths, `..`, `//host`)
/// 2. Lowercase the host
/// 3. Remove the fragment (everything after `#`)
///
/// Scheme, path and query are otherwise left as resolved. Returns `None` when the
/// reference cannot be resolved; callers treat that as "skip this link".
///
/// # Examples
///
/// ```
/// use sumi_harvest::url::normalize;
/// use url::Url;
///
/// let base = Url::parse("https://example.test/docs/index.html").unwrap();
/// let a = normalize("../files/a.pdf#page=2", &base).unwrap();
/// let b = normalize("HTTPS://Example.TEST/files/a.pdf", &base).unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.as_str(), "https://example.test/files/a.pdf");
/// ```
pub fn normalize(href: &str, base: &Url) -> Option<NormalizedUrl> {
    let resolved = match base.join(href.trim()) {
        Ok(url) => url,
        Err(e) => {
            tracing::debug!("Failed to normalize URL {}: {}", href, e);
            return None;
        }
    };

    canonicalize(resolved)
}

fn canonicalize(mut url: Url) -> Option<NormalizedUrl> {
    // The url crate already lowercases hosts of special schemes; other schemes
    // keep whatever case they were written in.
    if let Some(host) = url.host_str() {
        let lower = host.to_lowercase();
        if lower != host {
            url.set_host(Some(&lower)).ok()?;
        }
    }

    url.set_fragment(None);

    Some(NormalizedUrl(url))
}
