use crate::config::CredentialsConfig;
use crate::{ConfigError, ConfigResult};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, COOKIE};
use std::collections::BTreeMap;
use std::fmt;

/// Debug view of a name/value map that shows names only
pub(crate) struct Redacted<'a>(pub(crate) &'a BTreeMap<String, String>);

impl fmt::Debug for Redacted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.0.keys().map(|name| (name, format_args!("<redacted>"))))
            .finish()
    }
}

/// Session cookies and extra headers sent with every listing request
///
/// Built once per run and handed to the fetch client; rotating or refreshing
/// them is up to whoever builds the value.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    cookies: BTreeMap<String, String>,
    headers: BTreeMap<String, String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("cookies", &Redacted(&self.cookies))
            .field("headers", &Redacted(&self.headers))
            .finish()
    }
}

impl Credentials {
    /// Credentials that send nothing beyond the user agent
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Resolves a credentials section against the process environment
    pub fn from_config(config: &CredentialsConfig) -> ConfigResult<Self> {
        Self::from_config_with(config, |name| std::env::var(name).ok())
    }

    /// Resolves a credentials section using `lookup` for `$NAME` references
    ///
    /// Values starting with `$` name a variable; `$$` escapes a literal `$`.
    pub fn from_config_with<F>(config: &CredentialsConfig, lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let resolve = |value: &String| -> ConfigResult<String> {
            if let Some(literal) = value.strip_prefix("$$") {
                return Ok(format!("${}", literal));
            }
            match value.strip_prefix('$') {
                Some(name) => lookup(name).ok_or_else(|| ConfigError::MissingEnv(name.to_string())),
                None => Ok(value.clone()),
            }
        };

        let mut credentials = Self::anonymous();
        for (name, value) in &config.cookies {
            credentials.cookies.insert(name.clone(), resolve(value)?);
        }
        for (name, value) in &config.headers {
            credentials.headers.insert(name.clone(), resolve(value)?);
        }

        Ok(credentials)
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty() && self.headers.is_empty()
    }

    /// `Cookie` header value, `None` when no cookies are set
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }

        Some(
            self.cookies
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Default headers for the HTTP client, cookies included
    pub fn header_map(&self) -> ConfigResult<HeaderMap> {
        let mut map = HeaderMap::new();

        for (name, value) in &self.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ConfigError::InvalidHeader(format!("{}: {}", name, e)))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|e| ConfigError::InvalidHeader(format!("{}: {}", name, e)))?;
            map.insert(header_name, header_value);
        }

        if let Some(cookie) = self.cookie_header() {
            let value = HeaderValue::from_str(&cookie)
                .map_err(|e| ConfigError::InvalidHeader(format!("Cookie: {}", e)))?;
            map.insert(COOKIE, value);
        }

        Ok(map)
    }
}
