// Error types shared across the crate.
//
// Each stage of a publish run has its own error type so callers can react
// to the stage that failed. `PublishError` wraps them all and maps each
// kind to a process exit status.

use std::path::PathBuf;

use thiserror::Error;

/// A directory under the upload root could not be listed.
#[derive(Debug, Error)]
#[error("failed to read directory {}: {source}", .path.display())]
pub struct DirectoryReadError {
    pub path: PathBuf,
    #[source]
    pub source: walkdir::Error,
}

/// Failure of a single file upload.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("failed to open {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("portal answered {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("malformed portal response: {0}")]
    MalformedResponse(String),
}

/// Aggregate failure of a batch upload. Holds every per-file failure.
#[derive(Debug, Error)]
#[error("{} of {total} uploads failed, first error: {first}", .failures.len())]
pub struct BatchUploadError {
    pub total: usize,
    /// Files never attempted because the batch stopped early.
    pub skipped: usize,
    pub first: String,
    pub failures: Vec<(PathBuf, UploadError)>,
}

/// The pre-flight `GET {portal}` did not return 200.
#[derive(Debug, Error)]
#[error("failed to reach portal at {url}: {reason}")]
pub struct PortalUnreachableError {
    pub url: String,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no identifier recorded for {}", .0.display())]
    MissingIdentifier(PathBuf),
    #[error("template rendering failed: {0}")]
    Template(#[from] askama::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid portal url {url:?}: {reason}")]
    InvalidPortal { url: String, reason: String },
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// Top-level error of a publish run.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to find directory \"{}\"", .0.display())]
    MissingDirectory(PathBuf),
    #[error("the given path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
    #[error(transparent)]
    DirectoryRead(#[from] DirectoryReadError),
    #[error("upload failed")]
    BatchUpload(#[from] BatchUploadError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("index upload failed, perhaps try a different portal")]
    IndexUpload(#[source] UploadError),
    #[error("failed to write index page")]
    Scratch(#[source] std::io::Error),
    #[error(transparent)]
    PortalUnreachable(#[from] PortalUnreachableError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl PublishError {
    /// Process exit status for this kind of failure. Never 0.
    pub fn exit_code(&self) -> u8 {
        match self {
            PublishError::MissingDirectory(_) | PublishError::NotADirectory(_) => 3,
            PublishError::DirectoryRead(_) => 4,
            PublishError::BatchUpload(_) => 5,
            PublishError::Render(_) => 6,
            PublishError::IndexUpload(_) => 7,
            PublishError::Scratch(_) => 8,
            PublishError::PortalUnreachable(_) => 9,
            PublishError::Config(_) => 1,
        }
    }
}
