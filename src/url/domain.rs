use url::Url;

/// Extracts the lowercase host of a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_harvest::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns true when `candidate` lives on the same site as `seed`
///
/// Same site means same scheme, host and effective port. Subdomains count as
/// different sites, and so does an `http` link from an `https` seed.
pub fn is_same_site(seed: &Url, candidate: &Url) -> bool {
    seed.scheme() == candidate.scheme()
        && extract_domain(seed).is_some()
        && extract_domain(seed) == extract_domain(candidate)
        && seed.port_or_known_default() == candidate.port_or_known_default()
}

/// Returns the `scheme://host[:port]` prefix of a URL
pub fn site_root(url: &Url) -> String {
    url.origin().ascii_serialization()
}
