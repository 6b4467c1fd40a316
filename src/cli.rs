// Command line surface. Environment flags are read here, at the edge, and
// folded into an explicit `UploadConfig`.

use std::path::PathBuf;
use std::time::Duration;

use clap::builder::{FalseyValueParser, TypedValueParser};
use clap::{ArgAction, Args, Parser, Subcommand};

use crate::config::{PortalUrl, UploadConfig, DEFAULT_CONCURRENCY, DEFAULT_PORTAL};
use crate::error::ConfigError;

#[derive(Debug, Parser)]
#[command(name = "portal-upload", version, about = "Upload a directory to a portal and publish an index page")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Upload the contents of a directory and print the index address
    Upload(UploadArgs),
}

#[derive(Debug, Args)]
pub struct UploadArgs {
    /// Directory to upload
    pub directory: PathBuf,

    /// Portal to upload to
    #[arg(short, long, default_value = DEFAULT_PORTAL)]
    pub portal: String,

    /// Do not contact the portal, hand out random identifiers
    #[arg(long, env = "MOCK_UPLOADS", action = ArgAction::SetTrue, value_parser = FalseyValueParser::new())]
    pub mock: bool,

    /// Print every finished file instead of a progress bar
    #[arg(short, long, env = "DEBUG", action = ArgAction::SetTrue, value_parser = FalseyValueParser::new())]
    pub verbose: bool,

    /// Maximum number of uploads in flight
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY, value_parser = clap::value_parser!(u16).range(1..).map(usize::from))]
    pub concurrency: usize,

    /// Stop starting new uploads after the first failure
    #[arg(long)]
    pub fail_fast: bool,

    /// Abort when the portal does not answer the reachability check
    #[arg(long)]
    pub strict_portal: bool,

    /// Per-request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

impl UploadArgs {
    pub fn to_config(&self) -> Result<UploadConfig, ConfigError> {
        let mut config = UploadConfig::new(PortalUrl::parse(&self.portal)?);
        config.mock_uploads = self.mock;
        config.concurrency = self.concurrency;
        config.fail_fast = self.fail_fast;
        config.strict_portal = self.strict_portal;
        config.timeout = self.timeout.map(Duration::from_secs);
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> UploadArgs {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Command::Upload(args) => args,
        }
    }

    #[test]
    fn upload_defaults() {
        let args = parse(&["portal-upload", "upload", "site"]);
        let config = args.to_config().unwrap();

        assert_eq!(args.directory, PathBuf::from("site"));
        assert_eq!(config.portal.as_str(), DEFAULT_PORTAL);
        assert_eq!(config.concurrency, DEFAULT_CONCURRENCY);
        assert!(config.timeout.is_none());
    }

    #[test]
    fn portal_flag_is_normalised() {
        let args = parse(&["portal-upload", "upload", "site", "-p", "https://portal.example"]);
        assert_eq!(args.to_config().unwrap().portal.as_str(), "https://portal.example/");
    }

    #[test]
    fn tuning_flags_reach_the_config() {
        let args = parse(&[
            "portal-upload",
            "upload",
            "site",
            "--mock",
            "--concurrency",
            "3",
            "--fail-fast",
            "--timeout",
            "30",
        ]);
        let config = args.to_config().unwrap();

        assert!(config.mock_uploads);
        assert!(config.fail_fast);
        assert_eq!(config.concurrency, 3);
        assert_eq!(config.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn missing_directory_and_zero_concurrency_are_usage_errors() {
        assert!(Cli::try_parse_from(["portal-upload", "upload"]).is_err());
        assert!(Cli::try_parse_from(["portal-upload", "upload", "site", "--concurrency", "0"]).is_err());
        assert!(Cli::try_parse_from(["portal-upload", "upload", "site", "--bogus"]).is_err());
    }
}
