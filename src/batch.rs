// Batch uploads.
//
// A fixed number of worker threads pull files off a shared cursor and push
// each outcome over a channel. The calling thread is the only consumer of
// that channel and the only writer of the identifier map.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;

use tracing::{debug, info, warn};

use crate::api::{Identifier, Uploader};
use crate::config::UploadConfig;
use crate::error::{BatchUploadError, UploadError};
use crate::ui::UploadProgress;

/// File path to the identifier the portal assigned to it.
pub type IdentifierMap = HashMap<PathBuf, Identifier>;

pub struct BatchUploader<'a, U: Uploader + ?Sized> {
    uploader: &'a U,
    concurrency: usize,
    fail_fast: bool,
}

impl<'a, U: Uploader + ?Sized> BatchUploader<'a, U> {
    pub fn new(uploader: &'a U, config: &UploadConfig) -> Self {
        BatchUploader {
            uploader,
            concurrency: config.concurrency.max(1),
            fail_fast: config.fail_fast,
        }
    }

    /// Upload every file and collect their identifiers.
    ///
    /// All uploads are allowed to settle before the outcome is decided. The
    /// map is only returned when every file made it; otherwise the partial
    /// results are dropped and all failures are reported together.
    pub fn upload_all(
        &self,
        files: &[PathBuf],
        progress: &UploadProgress,
    ) -> Result<IdentifierMap, BatchUploadError> {
        if files.is_empty() {
            return Ok(IdentifierMap::new());
        }

        let workers = self.concurrency.min(files.len());
        let cursor = AtomicUsize::new(0);
        let stop = AtomicBool::new(false);
        let (tx, rx) = mpsc::channel::<(usize, Result<Identifier, UploadError>)>();
        info!(files = files.len(), workers, "starting batch upload");

        let (identifiers, failures, settled) = thread::scope(|scope| {
            for _ in 0..workers {
                let tx = tx.clone();
                let cursor = &cursor;
                let stop = &stop;
                scope.spawn(move || loop {
                    if stop.load(Ordering::Relaxed) {
                        break;
                    }
                    let index = cursor.fetch_add(1, Ordering::Relaxed);
                    let Some(file) = files.get(index) else {
                        break;
                    };
                    let result = self.uploader.upload(file);
                    if tx.send((index, result)).is_err() {
                        break;
                    }
                });
            }
            // workers hold the only senders now
            drop(tx);

            let mut identifiers = IdentifierMap::with_capacity(files.len());
            let mut failures: Vec<(PathBuf, UploadError)> = Vec::new();
            let mut settled = 0usize;
            for (index, result) in rx {
                settled += 1;
                let file = &files[index];
                progress.settled(file, result.is_ok());
                match result {
                    Ok(identifier) => {
                        debug!(file = %file.display(), %identifier, "upload settled");
                        identifiers.insert(file.clone(), identifier);
                    }
                    Err(err) => {
                        warn!(file = %file.display(), error = %err, "upload failed");
                        if self.fail_fast {
                            stop.store(true, Ordering::Relaxed);
                        }
                        failures.push((file.clone(), err));
                    }
                }
            }
            (identifiers, failures, settled)
        });
        progress.finish();

        if failures.is_empty() {
            return Ok(identifiers);
        }
        Err(batch_error(files.len(), settled, failures))
    }
}

fn batch_error(total: usize, settled: usize, failures: Vec<(PathBuf, UploadError)>) -> BatchUploadError {
    let first = failures
        .first()
        .map(|(path, err)| format!("{}: {err}", display_name(path)))
        .unwrap_or_default();
    BatchUploadError {
        total,
        skipped: total - settled,
        first,
        failures,
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{mock_identifier, MockUploader, MOCK_IDENTIFIER_LEN};
    use crate::api::PortalClient;
    use crate::config::PortalUrl;
    use std::time::Duration;

    fn config(concurrency: usize) -> UploadConfig {
        let mut config = UploadConfig::new(PortalUrl::parse("http://127.0.0.1:9").unwrap());
        config.concurrency = concurrency;
        config
    }

    fn paths(n: usize) -> Vec<PathBuf> {
        (1..=n).map(|i| PathBuf::from(format!("dir/{i}.txt"))).collect()
    }

    #[test]
    fn empty_input_makes_no_uploads() {
        let mut uploader = MockUploader::new();
        uploader.expect_upload().never();

        let batch = BatchUploader::new(&uploader, &config(4));
        let ids = batch.upload_all(&[], &UploadProgress::hidden()).unwrap();

        assert!(ids.is_empty());
    }

    #[test]
    fn every_file_gets_an_identifier() {
        let mut uploader = MockUploader::new();
        uploader
            .expect_upload()
            .times(20)
            .returning(|p| Ok(format!("id-{}", p.display())));

        let files = paths(20);
        let batch = BatchUploader::new(&uploader, &config(3));
        let ids = batch.upload_all(&files, &UploadProgress::hidden()).unwrap();

        assert_eq!(ids.len(), 20);
        for file in &files {
            assert_eq!(ids[file], format!("id-{}", file.display()));
        }
    }

    #[test]
    fn one_failure_fails_the_batch_after_all_settle() {
        let mut uploader = MockUploader::new();
        uploader.expect_upload().times(5).returning(|p| {
            if p.ends_with("3.txt") {
                Err(UploadError::MalformedResponse("no identifier".into()))
            } else {
                Ok(mock_identifier())
            }
        });

        let batch = BatchUploader::new(&uploader, &config(2));
        let err = batch.upload_all(&paths(5), &UploadProgress::hidden()).unwrap_err();

        assert_eq!(err.total, 5);
        assert_eq!(err.skipped, 0);
        assert_eq!(err.failures.len(), 1);
        assert_eq!(err.failures[0].0, PathBuf::from("dir/3.txt"));
        assert!(err.first.starts_with("3.txt: "));
    }

    #[test]
    fn fail_fast_stops_starting_new_uploads() {
        let attempts = AtomicUsize::new(0);
        struct Failing<'a>(&'a AtomicUsize);
        impl Uploader for Failing<'_> {
            fn upload(&self, _: &Path) -> Result<Identifier, UploadError> {
                self.0.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(10));
                Err(UploadError::MalformedResponse("down".into()))
            }
        }

        let mut cfg = config(1);
        cfg.fail_fast = true;
        let uploader = Failing(&attempts);
        let batch = BatchUploader::new(&uploader, &cfg);
        let err = batch.upload_all(&paths(50), &UploadProgress::hidden()).unwrap_err();

        let attempted = attempts.load(Ordering::SeqCst);
        assert!(attempted < 50);
        assert_eq!(err.failures.len(), attempted);
        assert_eq!(err.skipped, 50 - attempted);
    }

    #[test]
    fn concurrency_is_bounded() {
        let in_flight = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        struct Slow<'a> {
            in_flight: &'a AtomicUsize,
            peak: &'a AtomicUsize,
        }
        impl Uploader for Slow<'_> {
            fn upload(&self, _: &Path) -> Result<Identifier, UploadError> {
                let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                self.peak.fetch_max(now, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(5));
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(mock_identifier())
            }
        }

        let uploader = Slow {
            in_flight: &in_flight,
            peak: &peak,
        };
        let batch = BatchUploader::new(&uploader, &config(4));
        let ids = batch.upload_all(&paths(40), &UploadProgress::hidden()).unwrap();

        assert_eq!(ids.len(), 40);
        assert!(peak.load(Ordering::SeqCst) <= 4);
    }

    #[test]
    fn mock_client_yields_well_formed_identifiers() {
        let mut cfg = config(8);
        cfg.mock_uploads = true;
        let client = PortalClient::new(&cfg).unwrap();

        let files = paths(12);
        let ids = BatchUploader::new(&client, &cfg)
            .upload_all(&files, &UploadProgress::hidden())
            .unwrap();

        assert_eq!(ids.len(), 12);
        assert!(ids.values().all(|id| id.len() == MOCK_IDENTIFIER_LEN
            && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')));
    }
}
