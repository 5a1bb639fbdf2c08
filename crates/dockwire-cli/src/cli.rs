//! Command-line argument definitions.

use clap::{Parser, Subcommand};

/// One-shot client for the Docker Engine API.
///
/// Configuration flags (`--docker-host`, `--api-version`, `--log-filter`,
/// `--log-format`, `--config-path`) come before the command.
#[derive(Parser, Debug)]
#[command(name = "dockwire", version, disable_help_subcommand = true)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Command,
}

/// Commands understood by the CLI.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    /// Checks that the daemon answers.
    Ping,
    /// Prints daemon and API versions.
    Version,
    /// Prints system-wide information.
    Info,
    /// Lists containers.
    Ps {
        /// Include stopped containers.
        #[arg(short, long)]
        all: bool,
        /// Show at most this many recent containers.
        #[arg(long)]
        limit: Option<u32>,
        /// Server-side filter, repeatable.
        #[arg(long = "filter", value_name = "NAME=VALUE")]
        filters: Vec<String>,
    },
    /// Follows daemon events until interrupted or `--until` passes.
    Events {
        /// Replay events after this UNIX timestamp.
        #[arg(long)]
        since: Option<i64>,
        /// Stop after this UNIX timestamp.
        #[arg(long)]
        until: Option<i64>,
        /// Server-side filter, repeatable.
        #[arg(long = "filter", value_name = "NAME=VALUE")]
        filters: Vec<String>,
    },
    /// Pulls an image, printing progress documents.
    Pull {
        /// Image reference, for example `library/alpine`.
        image: String,
        /// Tag to pull.
        #[arg(long, default_value = "latest")]
        tag: String,
        /// Platform in `os[/arch[/variant]]` form.
        #[arg(long)]
        platform: Option<String>,
    },
    /// Prints container resource usage.
    Stats {
        /// Container id or name.
        container: String,
        /// Keep printing samples until interrupted.
        #[arg(long)]
        stream: bool,
    },
    /// Prints a container's output.
    Logs {
        /// Container id or name.
        container: String,
        /// Keep printing new output until interrupted.
        #[arg(short, long)]
        follow: bool,
        /// Only this many lines from the end.
        #[arg(long)]
        tail: Option<u64>,
        /// Prefix lines with timestamps.
        #[arg(short, long)]
        timestamps: bool,
    },
    /// Lists volumes.
    Volumes {
        /// Server-side filter, repeatable.
        #[arg(long = "filter", value_name = "NAME=VALUE")]
        filters: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(&["dockwire", "ping"], Command::Ping)]
    #[case(
        &["dockwire", "ps", "-a", "--filter", "status=exited"],
        Command::Ps { all: true, limit: None, filters: vec![String::from("status=exited")] }
    )]
    #[case(
        &["dockwire", "pull", "alpine"],
        Command::Pull { image: String::from("alpine"), tag: String::from("latest"), platform: None }
    )]
    #[case(
        &["dockwire", "stats", "web", "--stream"],
        Command::Stats { container: String::from("web"), stream: true }
    )]
    #[case(
        &["dockwire", "logs", "web", "-f", "--tail", "20"],
        Command::Logs { container: String::from("web"), follow: true, tail: Some(20), timestamps: false }
    )]
    fn commands_parse(#[case] args: &[&str], #[case] expected: Command) {
        let cli = Cli::try_parse_from(args).expect("parse");
        assert_eq!(cli.command, expected);
    }

    #[test]
    fn missing_command_is_a_usage_error() {
        assert!(Cli::try_parse_from(["dockwire"]).is_err());
    }
}
