// Library root
// -----------
// This crate uploads a directory tree to a content-addressed portal and
// publishes an HTML index linking every uploaded file. The binary
// (`main.rs`) only parses arguments and reports the outcome.
//
// Module responsibilities:
// - `tree`: scans the upload root once into an arena shared by the later
//   stages.
// - `api`: HTTP interactions with the portal (upload, reachability check).
// - `batch`: concurrent uploads of many files with all-or-nothing results.
// - `render`: turns the scanned tree plus identifiers into the index page.
// - `publish`: sequences the stages.
// - `ui`: terminal output and progress.
// - `cli`, `config`, `logging`, `error`: the usual plumbing.
pub mod api;
pub mod batch;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod publish;
pub mod render;
pub mod tree;
pub mod ui;

pub use api::{Identifier, PortalClient, Uploader};
pub use batch::{BatchUploader, IdentifierMap};
pub use config::{PortalUrl, UploadConfig};
pub use error::PublishError;
pub use publish::{publish_directory, publish_with, Publication};
pub use tree::{list_files, DirTree, EntryFilter, FileEntry};
