// Explicit run configuration. Built once at the CLI edge and handed to the
// client and batch uploader; nothing below reads the process environment.

use std::fmt;
use std::time::Duration;

use reqwest::Url;

use crate::error::ConfigError;

pub const DEFAULT_PORTAL: &str = "https://siasky.net/";
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Base URL of a portal, always ending in exactly one `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalUrl(Url);

impl PortalUrl {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let trimmed = raw.trim().trim_end_matches('/');
        let url = Url::parse(&format!("{trimmed}/")).map_err(|e| ConfigError::InvalidPortal {
            url: raw.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidPortal {
                url: raw.to_string(),
                reason: format!("unsupported scheme {}", url.scheme()),
            });
        }
        Ok(PortalUrl(url))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// `{portal}api/upload?filename={name}` with the name query-encoded.
    pub fn upload_endpoint(&self, file_name: &str) -> Url {
        let mut url = self.0.clone();
        url.set_path(&format!("{}api/upload", self.0.path()));
        url.query_pairs_mut().append_pair("filename", file_name);
        url
    }

    /// Addressable location of an uploaded blob.
    pub fn address_of(&self, identifier: &str) -> String {
        format!("{}{}", self.0, identifier)
    }
}

impl fmt::Display for PortalUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

/// Settings for a single publish run.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub portal: PortalUrl,
    /// Skip the network and hand out random identifiers.
    pub mock_uploads: bool,
    /// Upper bound on uploads in flight.
    pub concurrency: usize,
    /// Stop starting new uploads once one has failed.
    pub fail_fast: bool,
    /// Treat a failed portal pre-flight check as fatal.
    pub strict_portal: bool,
    /// Per-request timeout; `None` waits forever.
    pub timeout: Option<Duration>,
}

impl UploadConfig {
    pub fn new(portal: PortalUrl) -> Self {
        Self {
            portal,
            mock_uploads: false,
            concurrency: DEFAULT_CONCURRENCY,
            fail_fast: false,
            strict_portal: false,
            timeout: None,
        }
    }
}
