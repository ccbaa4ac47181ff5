use crate::RequestError;
use sha2::{Digest, Sha256};
use url::Url;

/// Query parameters that never change the listing content
const TRACKING_PARAMS: &[&str] = &["ref", "ref_", "qid", "sr", "utm_source", "utm_medium"];

/// Normalizes a request URL before it is hashed into a cache key
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed or not HTTP(S)
/// 2. Lowercase the host (done by the parser)
/// 3. Normalize path:
///    - Remove dot segments (. and ..)
///    - Collapse repeated slashes
///    - Remove trailing slash (except for root /)
/// 4. Remove fragment
/// 5. Remove tracking and empty query parameters
/// 6. Sort remaining query parameters by key, then value
///
/// # Examples
///
/// ```
/// use review_harvester::request::normalize_url;
///
/// let url = normalize_url("https://WWW.EXAMPLE.COM/product-reviews/B01/?pageNumber=2&sortBy=recent#top").unwrap();
/// assert_eq!(url.as_str(), "https://www.example.com/product-reviews/B01?pageNumber=2&sortBy=recent");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, RequestError> {
    let mut url = Url::parse(url_str)
        .map_err(|e| RequestError::InvalidRequest(format!("{}: {}", url_str, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(RequestError::InvalidRequest(format!(
            "unsupported scheme '{}' in {}",
            url.scheme(),
            url_str
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(RequestError::InvalidRequest(format!(
            "missing host in {}",
            url_str
        )));
    }

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    url.set_fragment(None);

    if url.query().is_some() {
        let params = filter_and_sort_query_params(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            let query = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(params.iter().map(|(k, v)| (k.as_str(), v.as_str())))
                .finish();
            url.set_query(Some(&query));
        }
    }

    Ok(url)
}

/// Computes the cache key of a URL: the hex SHA-256 of its normalized form
///
/// The full 64-character digest is used; no truncation is applied.
pub fn cache_key_for(url: &Url) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_str().as_bytes());
    hex::encode(hasher.finalize())
}

/// Normalizes a URL path by removing dot segments and trailing slashes
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", segments.join("/"))
}

/// Filters out tracking and empty parameters and sorts the rest
fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, value)| !key.is_empty() && !value.is_empty())
        .filter(|(key, _)| !TRACKING_PARAMS.contains(&key.as_ref()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    params.sort();
    params
}
