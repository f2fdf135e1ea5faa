use std::num::NonZeroU64;
use std::path::PathBuf;

use clap::Parser;

use crate::application::data::{FailurePolicy, LogLevel};

/// Periodically mirrors a source directory onto a replica directory.
#[derive(Parser, Debug, Clone)]
#[command(version, about)]
pub struct Cli {
    /// Directory to mirror, never modified
    pub source: PathBuf,

    /// Directory that is made an exact copy of the source
    pub replica: PathBuf,

    /// Seconds to wait after a pass before starting the next one
    pub interval: NonZeroU64,

    /// Directory receiving the `sync.log` file
    pub log_dir: PathBuf,

    #[clap(long, short, default_value = "debug", value_enum)]
    pub log_level: LogLevel,

    /// What to do when a whole pass fails
    #[clap(long, default_value = "skip", value_enum)]
    pub on_error: FailurePolicy,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[test]
    fn test_parses_four_positional_arguments() {
        let cli = Cli::try_parse_from(["foldersync", "src", "dst", "5", "logs"])
            .expect("Arguments should parse");

        assert_eq!(cli.source, PathBuf::from("src"));
        assert_eq!(cli.replica, PathBuf::from("dst"));
        assert_eq!(cli.interval.get(), 5);
        assert_eq!(cli.log_dir, PathBuf::from("logs"));
        assert_eq!(cli.on_error, FailurePolicy::Skip);
    }

    #[test]
    fn test_parses_optional_flags() {
        let cli = Cli::try_parse_from([
            "foldersync",
            "src",
            "dst",
            "1",
            "logs",
            "--on-error",
            "abort",
            "-l",
            "warn",
        ])
        .expect("Arguments should parse");

        assert_eq!(cli.on_error, FailurePolicy::Abort);
        assert!(matches!(cli.log_level, LogLevel::Warn));
    }

    #[rstest]
    #[case(&["foldersync"])]
    #[case(&["foldersync", "src", "dst", "5"])]
    #[case(&["foldersync", "src", "dst", "5", "logs", "extra"])]
    #[case(&["foldersync", "src", "dst", "0", "logs"])]
    #[case(&["foldersync", "src", "dst", "-3", "logs"])]
    #[case(&["foldersync", "src", "dst", "soon", "logs"])]
    fn test_rejects_invalid_arguments(#[case] args: &[&str]) {
        assert!(Cli::try_parse_from(args).is_err());
    }
}
