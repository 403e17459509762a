use clap::{Parser, Subcommand};

use crate::sources::ThreadKey;

/// revtally: reconcile duplicate review comments and track who engaged
#[derive(Parser, Debug, Clone)]
#[command(name = "revtally", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,

    /// Path to config file (default: revtally.toml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Directory for assignments and rosters
    #[arg(long, global = true)]
    pub data_dir: Option<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CliCommand {
    /// Reconcile review comments and print the result
    Report {
        /// Pull request to reconcile (owner/repo#N or URL); repeatable.
        /// Defaults to every configured repository
        #[arg(long = "pr", value_name = "KEY")]
        prs: Vec<ThreadKey>,

        /// Treat two comments as distinct even if a marker links them
        #[arg(long = "suppress", value_name = "DUP=ORIG", value_parser = parse_suppression)]
        suppressions: Vec<(String, String)>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        /// Bypass the cache and fetch fresh data
        #[arg(long)]
        force: bool,
    },

    /// Set the owner of a comment and every duplicate of it
    Assign {
        #[arg(long = "pr", value_name = "KEY")]
        pr: ThreadKey,

        /// Comment URL
        url: String,

        /// Owner handle (empty string clears the owner)
        owner: String,
    },

    /// Show or replace the participant roster of a pull request
    Roster {
        #[arg(long = "pr", value_name = "KEY")]
        pr: ThreadKey,

        /// Participant handles; omit to print the current roster
        handles: Vec<String>,
    },
}

/// Parse `DUP=ORIG` into its two comment URLs.
pub fn parse_suppression(value: &str) -> Result<(String, String), String> {
    let Some((duplicate, original)) = value.split_once('=') else {
        return Err(format!("expected DUP=ORIG, got '{value}'"));
    };
    let (duplicate, original) = (duplicate.trim(), original.trim());
    if duplicate.is_empty() || original.is_empty() {
        return Err(format!("expected DUP=ORIG, got '{value}'"));
    }
    Ok((duplicate.to_string(), original.to_string()))
}
