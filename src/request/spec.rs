use crate::request::filters::{FormatFilter, MediaFilter, SortOrder, StarFilter};
use crate::request::normalize::{cache_key_for, normalize_url};
use crate::{RequestError, RequestResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Stable catalog key identifying one product
///
/// Identifiers are trimmed on construction. Empty identifiers and identifiers
/// that could escape a file name (path separators, control characters) are
/// rejected with [`RequestError::InvalidEntity`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: &str) -> RequestResult<Self> {
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(RequestError::InvalidEntity(id.to_string()));
        }
        if trimmed == "." || trimmed == ".." {
            return Err(RequestError::InvalidEntity(id.to_string()));
        }
        if trimmed
            .chars()
            .any(|c| c == '/' || c == '\\' || c.is_control() || c.is_whitespace())
        {
            return Err(RequestError::InvalidEntity(id.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for EntityId {
    type Error = RequestError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<EntityId> for String {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

/// One fully specified page request: entity plus filter, sort and page coordinates
///
/// Specs order by entity, then sort, star, format, media and page, which is the
/// order the planner emits them in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestSpec {
    pub entity: EntityId,
    pub sort: SortOrder,
    pub star: StarFilter,
    pub format: FormatFilter,
    pub media: MediaFilter,
    pub page: u32,
}

impl RequestSpec {
    /// Builds the normalized listing URL for this request under `base`
    pub fn url(&self, base: &Url) -> RequestResult<Url> {
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|_| RequestError::InvalidRequest(format!("cannot-be-a-base URL: {}", base)))?
            .pop_if_empty()
            .extend(["product-reviews", self.entity.as_str()]);

        url.set_fragment(None);
        url.query_pairs_mut()
            .clear()
            .append_pair("sortBy", self.sort.query_value())
            .append_pair("pageNumber", &self.page.to_string())
            .append_pair("filterByStar", self.star.query_value())
            .append_pair("formatType", self.format.query_value())
            .append_pair("mediaType", self.media.query_value());

        normalize_url(url.as_str())
    }

    /// Computes the cache key for this request under `base`
    pub fn cache_key(&self, base: &Url) -> RequestResult<CacheKey> {
        Ok(CacheKey::for_url(self.url(base)?))
    }
}

impl fmt::Display for RequestSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}/{}/{}/{}/p{}]",
            self.entity, self.sort, self.star, self.format, self.media, self.page
        )
    }
}

/// Content hash of a normalized request URL, kept next to the URL it was derived from
///
/// The URL travels with the digest so a cache can detect the (astronomically
/// unlikely) case of two URLs sharing a digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    digest: String,
    url: Url,
}

impl CacheKey {
    /// Derives the key from an already normalized URL
    pub fn for_url(url: Url) -> Self {
        let digest = cache_key_for(&url);
        Self { digest, url }
    }

    /// Full 64-character hex SHA-256 digest
    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}
