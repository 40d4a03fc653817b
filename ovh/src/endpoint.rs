//! API endpoint resolution.

use crate::error::UnknownEndpoint;
use std::fmt;
use std::str::FromStr;

const ENDPOINTS: &[(&str, &str)] = &[
    ("ovh-eu", "https://eu.api.ovh.com/1.0"),
    ("ovh-ca", "https://ca.api.ovh.com/1.0"),
    ("ovh-us", "https://api.us.ovhcloud.com/1.0"),
    ("kimsufi-eu", "https://eu.api.kimsufi.com/1.0"),
    ("kimsufi-ca", "https://ca.api.kimsufi.com/1.0"),
    ("soyoustart-eu", "https://eu.api.soyoustart.com/1.0"),
    ("soyoustart-ca", "https://ca.api.soyoustart.com/1.0"),
];

/// Base URL of an OVH API region.
///
/// # Example
///
/// ```
/// use ovh_sniper_ovh::Endpoint;
///
/// let endpoint: Endpoint = "ovh-ca".parse().unwrap();
/// assert_eq!(endpoint.base_url(), "https://ca.api.ovh.com/1.0");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    base_url: String,
}

impl Endpoint {
    /// Use an explicit base URL (trailing slash removed).
    #[must_use]
    pub fn custom(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Base URL, without trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::custom(ENDPOINTS[0].1)
    }
}

impl FromStr for Endpoint {
    type Err = UnknownEndpoint;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();

        if let Some((_, url)) = ENDPOINTS.iter().find(|(name, _)| *name == value) {
            return Ok(Self::custom(url));
        }
        if value.starts_with("https://") || value.starts_with("http://") {
            return Ok(Self::custom(value));
        }

        Err(UnknownEndpoint(value.to_string()))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base_url)
    }
}
