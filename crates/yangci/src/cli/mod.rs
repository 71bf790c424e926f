// SPDX-License-Identifier: Apache-2.0
//! `cli` defines argument parsing and the command surface.
//!
//! Boundary: `cli` parses/normalizes user input and dispatches to command
//! handlers; harness logic belongs in `commands`/`yangci-core`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

mod dispatch;

pub(crate) fn run() -> i32 {
    let cli = Cli::parse();
    dispatch::run_cli(cli)
}

#[derive(Parser, Debug)]
#[command(name = "yangci", version, disable_help_subcommand = true)]
#[command(about = "CI harness driving an external YANG schema validator over fetched corpora")]
pub struct Cli {
    #[arg(long, global = true, default_value_t = false)]
    pub quiet: bool,
    #[arg(long, global = true, default_value_t = false)]
    pub json: bool,
    #[arg(long, global = true, default_value_t = false)]
    pub verbose: bool,
    /// Root the corpora are fetched into; defaults to ./corpus.
    #[arg(long, global = true)]
    pub corpus_root: Option<PathBuf>,
    /// Root the run logs are written under; defaults to ./logs.
    #[arg(long, global = true)]
    pub logs_root: Option<PathBuf>,
    #[arg(long, global = true)]
    pub run_id: Option<String>,
    /// Override the embedded corpus source registry.
    #[arg(long, global = true)]
    pub sources: Option<PathBuf>,
    /// Override the embedded exclusion registry.
    #[arg(long, global = true)]
    pub exclusions: Option<PathBuf>,
    /// Override the embedded classification rules.
    #[arg(long, global = true)]
    pub rules: Option<PathBuf>,
    #[arg(long = "allow-write", global = true, default_value_t = false)]
    pub allow_write: bool,
    #[arg(long = "allow-subprocess", global = true, default_value_t = false)]
    pub allow_subprocess: bool,
    #[arg(long = "allow-git", global = true, default_value_t = false)]
    pub allow_git: bool,
    #[arg(long = "allow-network", global = true, default_value_t = false)]
    pub allow_network: bool,
    /// Run every external command on this host over ssh.
    #[arg(long = "ssh-host", global = true)]
    pub ssh_host: Option<String>,
    #[arg(long = "ssh-user", global = true)]
    pub ssh_user: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Sources {
        #[command(subcommand)]
        command: SourcesCommand,
    },
    /// Provision the host and fetch every pinned corpus.
    Fetch {
        /// Also download the IANA YANG parameters listing as run evidence.
        #[arg(long = "with-iana", default_value_t = false)]
        with_iana: bool,
        #[arg(long, value_enum, default_value_t = FormatArg::Text)]
        format: FormatArg,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Delete known-bad files listed in the exclusion registry.
    Prune {
        #[arg(long = "dry-run", default_value_t = false)]
        dry_run: bool,
        #[arg(long, value_enum, default_value_t = FormatArg::Text)]
        format: FormatArg,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// List the YANG files a validate run would cover.
    Discover {
        #[arg(long)]
        subdir: Option<String>,
        #[arg(long, value_enum, default_value_t = FormatArg::Text)]
        format: FormatArg,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Run the validator over the corpus and classify every failure.
    Validate {
        #[arg(long)]
        subdir: Option<String>,
        #[arg(long = "batch-size", default_value_t = 1)]
        batch_size: usize,
        #[arg(long = "validator-jar", default_value = "yang-model-validator.jar")]
        validator_jar: String,
        /// Released validator version; derives the jar name.
        #[arg(long = "validator-version", conflicts_with = "validator_jar")]
        validator_version: Option<String>,
        #[arg(long, default_value = "java")]
        java: String,
        /// Drop per-file logs for passing files.
        #[arg(long = "delete-logs", default_value_t = false)]
        delete_logs: bool,
        #[arg(long = "fail-fast", default_value_t = false)]
        fail_fast: bool,
        #[arg(long = "max-failures")]
        max_failures: Option<usize>,
        #[arg(long, value_enum, default_value_t = FormatArg::Text)]
        format: FormatArg,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Classify a previously captured validator log.
    Classify {
        #[arg(long)]
        log: PathBuf,
        #[arg(long, value_enum, default_value_t = FormatArg::Text)]
        format: FormatArg,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Check the registries, the JVM, and the validator jar.
    Doctor {
        #[arg(long, value_enum, default_value_t = FormatArg::Text)]
        format: FormatArg,
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
pub enum SourcesCommand {
    List {
        #[arg(long, value_enum, default_value_t = FormatArg::Text)]
        format: FormatArg,
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Text,
    Json,
    Jsonl,
}
