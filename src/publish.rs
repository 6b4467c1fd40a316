// Publish orchestration: scan, upload, render, upload the index.
//
// Stages run strictly in order and the first failing stage ends the run.
// The generated page is written to a scratch directory that is removed when
// the run returns, whatever the outcome.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::api::{Identifier, PortalClient, Uploader};
use crate::batch::BatchUploader;
use crate::config::UploadConfig;
use crate::error::PublishError;
use crate::render::{render_page, render_tree};
use crate::tree::{DirTree, EntryFilter};
use crate::ui::Console;

pub const INDEX_FILE_NAME: &str = "directory.html";

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct Publication {
    /// Address of the generated index page.
    pub url: String,
    pub index_identifier: Identifier,
    /// Number of files uploaded besides the index.
    pub files: usize,
}

/// Upload `directory` to the configured portal and publish its index.
pub fn publish_directory(
    config: &UploadConfig,
    directory: &Path,
    filter: &impl EntryFilter,
    console: &Console,
) -> Result<Publication, PublishError> {
    validate_directory(directory)?;
    console.announce(&display_path(directory), config.portal.as_str());

    let client = PortalClient::new(config)?;
    if !config.mock_uploads {
        preflight(&client, config.strict_portal, console)?;
    }
    run_stages(&client, config, directory, filter, console)
}

/// Same as [`publish_directory`] with an explicit uploader and no portal
/// pre-flight check.
pub fn publish_with<U: Uploader + ?Sized>(
    uploader: &U,
    config: &UploadConfig,
    directory: &Path,
    filter: &impl EntryFilter,
    console: &Console,
) -> Result<Publication, PublishError> {
    validate_directory(directory)?;
    console.announce(&display_path(directory), config.portal.as_str());
    run_stages(uploader, config, directory, filter, console)
}

fn run_stages<U: Uploader + ?Sized>(
    uploader: &U,
    config: &UploadConfig,
    directory: &Path,
    filter: &impl EntryFilter,
    console: &Console,
) -> Result<Publication, PublishError> {
    let tree = DirTree::scan(directory, filter)?;
    let files = tree.files();
    console.found_files(files.len());
    info!(directory = %directory.display(), files = files.len(), "scanned upload root");

    let progress = console.upload_progress(files.len());
    let identifiers = BatchUploader::new(uploader, config).upload_all(&files, &progress)?;
    console.done("Upload complete");

    console.stage("Building html");
    let title = format!("Contents of {}", directory.display());
    let page = render_page(&title, &render_tree(&tree, &config.portal, &identifiers)?)?;

    let scratch = tempfile::Builder::new()
        .prefix("portal-upload")
        .tempdir()
        .map_err(PublishError::Scratch)?;
    let index_path = scratch.path().join(INDEX_FILE_NAME);
    fs::write(&index_path, page).map_err(PublishError::Scratch)?;

    let index_identifier = uploader
        .upload(&index_path)
        .map_err(PublishError::IndexUpload)?;
    if let Err(err) = scratch.close() {
        warn!(error = %err, "failed to remove scratch directory");
    }
    console.done("Upload complete");

    let url = config.portal.address_of(&index_identifier);
    info!(%url, "published index");
    console.published(&url);
    Ok(Publication {
        url,
        index_identifier,
        files: files.len(),
    })
}

fn validate_directory(directory: &Path) -> Result<(), PublishError> {
    let meta = fs::metadata(directory)
        .map_err(|_| PublishError::MissingDirectory(directory.to_path_buf()))?;
    if !meta.is_dir() {
        return Err(PublishError::NotADirectory(directory.to_path_buf()));
    }
    Ok(())
}

/// Reachability check. Advisory unless `strict` is set.
fn preflight(client: &PortalClient, strict: bool, console: &Console) -> Result<(), PublishError> {
    match client.check_portal() {
        Ok(()) => Ok(()),
        Err(err) if strict => Err(err.into()),
        Err(err) => {
            warn!(error = %err, "portal pre-flight check failed, continuing");
            console.warning(&format!("Warning: {err}"));
            Ok(())
        }
    }
}

fn display_path(directory: &Path) -> PathBuf {
    fs::canonicalize(directory).unwrap_or_else(|_| directory.to_path_buf())
}
