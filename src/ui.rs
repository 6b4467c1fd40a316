// UI layer: everything the user sees on the terminal. Status lines are
// colored with crossterm, upload progress is an indicatif bar. A silent
// console is available so library callers and tests produce no output.

use std::path::Path;

use crossterm::style::Stylize;
use indicatif::{ProgressBar, ProgressStyle};

/// Terminal reporter for a publish run.
#[derive(Debug, Clone)]
pub struct Console {
    silent: bool,
    verbose: bool,
}

impl Console {
    pub fn new(verbose: bool) -> Self {
        Console {
            silent: false,
            verbose,
        }
    }

    /// A console that prints nothing.
    pub fn silent() -> Self {
        Console {
            silent: true,
            verbose: false,
        }
    }

    fn say(&self, line: String) {
        if !self.silent {
            println!("{line}");
        }
    }

    pub fn announce(&self, directory: &Path, portal: &str) {
        self.say(format!(
            "\n{} {} {} {}\n",
            "Uploading contents of directory".white(),
            directory.display().to_string().red().bold(),
            "to".white(),
            portal.red().bold(),
        ));
    }

    pub fn found_files(&self, count: usize) {
        self.say(format!("Found {count} files to upload").white().to_string());
    }

    pub fn stage(&self, message: &str) {
        self.say(message.white().to_string());
    }

    pub fn done(&self, message: &str) {
        self.say(format!("{message}\n").green().to_string());
    }

    pub fn warning(&self, message: &str) {
        self.say(message.yellow().to_string());
    }

    pub fn failure(&self, message: &str) {
        if !self.silent {
            eprintln!("{}", message.red());
        }
    }

    /// Final line of a successful run: where the index page lives.
    pub fn published(&self, url: &str) {
        self.say("You can find your files at\n".white().to_string());
        self.say(format!("{}\n", url.red().bold()));
    }

    /// Progress reporter for `total` uploads.
    pub fn upload_progress(&self, total: usize) -> UploadProgress {
        if self.silent {
            return UploadProgress::hidden();
        }
        if self.verbose {
            return UploadProgress {
                bar: None,
                verbose: true,
            };
        }
        let bar = ProgressBar::new(total as u64);
        if let Ok(style) = ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}") {
            bar.set_style(style);
        }
        UploadProgress {
            bar: Some(bar),
            verbose: false,
        }
    }
}

/// Per-file feedback while a batch is running. Only ever driven from the
/// thread that aggregates upload results.
pub struct UploadProgress {
    bar: Option<ProgressBar>,
    verbose: bool,
}

impl UploadProgress {
    pub fn hidden() -> Self {
        UploadProgress {
            bar: None,
            verbose: false,
        }
    }

    /// One upload finished, successfully or not.
    pub fn settled(&self, file: &Path, ok: bool) {
        if self.verbose {
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if ok {
                println!("Done {name}");
            } else {
                println!("{}", format!("Failed {name}").red());
            }
        }
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
    }

    pub fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish();
        }
    }
}
