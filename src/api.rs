// API client module: a small blocking HTTP client that talks to the
// portal. It uploads one file per call and hands back the identifier the
// portal assigned to it.

use std::path::Path;

use rand::Rng;
use reqwest::blocking::{multipart, Client};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::{PortalUrl, UploadConfig};
use crate::error::{ConfigError, PortalUnreachableError, UploadError};

/// Opaque content identifier assigned by the portal.
pub type Identifier = String;

const MOCK_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";
pub const MOCK_IDENTIFIER_LEN: usize = 64;

/// Anything that can turn a local file into a portal identifier.
#[cfg_attr(test, mockall::automock)]
pub trait Uploader: Send + Sync {
    /// Upload a single file. One attempt, no retries.
    fn upload(&self, file: &Path) -> Result<Identifier, UploadError>;
}

/// Expected response from the upload endpoint.
#[derive(Deserialize, Debug)]
struct UploadResponse {
    identifier: String,
}

/// Client for a single portal. In mock mode no request is ever sent.
#[derive(Clone)]
pub struct PortalClient {
    client: Client,
    portal: PortalUrl,
    mock_uploads: bool,
}

impl PortalClient {
    pub fn new(config: &UploadConfig) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(ConfigError::HttpClient)?;
        Ok(PortalClient {
            client,
            portal: config.portal.clone(),
            mock_uploads: config.mock_uploads,
        })
    }

    /// Pre-flight check: `GET {portal}` must answer 200.
    pub fn check_portal(&self) -> Result<(), PortalUnreachableError> {
        let url = self.portal.as_str();
        let unreachable = |reason: String| PortalUnreachableError {
            url: url.to_string(),
            reason,
        };
        let res = self
            .client
            .get(url)
            .send()
            .map_err(|e| unreachable(e.to_string()))?;
        if res.status() != StatusCode::OK {
            return Err(unreachable(format!("status {}", res.status())));
        }
        Ok(())
    }

    /// Stream the file as multipart/form-data to `{portal}api/upload`.
    fn post_file(&self, file: &Path) -> Result<Identifier, UploadError> {
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let url = self.portal.upload_endpoint(&file_name);

        let form = multipart::Form::new()
            .file("file", file)
            .map_err(|source| UploadError::Io {
                path: file.to_path_buf(),
                source,
            })?;

        let res = self.client.post(url).multipart(form).send()?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().unwrap_or_default();
            warn!(file = %file.display(), %status, "portal rejected upload");
            return Err(UploadError::Status { status, body });
        }

        let body = res.text()?;
        let parsed: UploadResponse = serde_json::from_str(&body)
            .map_err(|e| UploadError::MalformedResponse(format!("{e}: {body}")))?;
        debug!(file = %file.display(), identifier = %parsed.identifier, "uploaded");
        Ok(parsed.identifier)
    }
}

impl Uploader for PortalClient {
    fn upload(&self, file: &Path) -> Result<Identifier, UploadError> {
        if self.mock_uploads {
            return Ok(mock_identifier());
        }
        self.post_file(file)
    }
}

/// Random identifier shaped like a real one.
pub fn mock_identifier() -> Identifier {
    let mut rng = rand::thread_rng();
    (0..MOCK_IDENTIFIER_LEN)
        .map(|_| MOCK_CHARSET[rng.gen_range(0..MOCK_CHARSET.len())] as char)
        .collect()
}
