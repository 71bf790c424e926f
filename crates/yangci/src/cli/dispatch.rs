// SPDX-License-Identifier: Apache-2.0

use std::io::{self, Write};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::{Cli, Command, FormatArg, SourcesCommand};
use crate::commands::{self, ValidateArgs, Workspace};

fn init_tracing(json: bool, verbose: bool) {
    let default_filter = if verbose { "yangci=debug" } else { "yangci=info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    // Diagnostics go to stderr; stdout carries the rendered command output.
    if json {
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(io::stderr),
            )
            .try_init();
    } else {
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .try_init();
    }
}

fn effective_format(global_json: bool, format: FormatArg) -> FormatArg {
    if global_json && format == FormatArg::Text {
        FormatArg::Json
    } else {
        format
    }
}

fn command_label(command: &Command) -> &'static str {
    match command {
        Command::Sources { .. } => "sources",
        Command::Fetch { .. } => "fetch",
        Command::Prune { .. } => "prune",
        Command::Discover { .. } => "discover",
        Command::Validate { .. } => "validate",
        Command::Classify { .. } => "classify",
        Command::Doctor { .. } => "doctor",
    }
}

pub(crate) fn run_cli(cli: Cli) -> i32 {
    init_tracing(cli.json, cli.verbose);

    let workspace = Workspace::from_cli(&cli);
    let quiet = cli.quiet;
    let json = cli.json;
    let label = command_label(&cli.command);

    let outcome = match cli.command {
        Command::Sources {
            command: SourcesCommand::List { format, out },
        } => commands::run_sources_list(&workspace, effective_format(json, format), out),
        Command::Fetch {
            with_iana,
            format,
            out,
        } => commands::run_fetch(&workspace, with_iana, effective_format(json, format), out),
        Command::Prune {
            dry_run,
            format,
            out,
        } => commands::run_prune(&workspace, dry_run, effective_format(json, format), out),
        Command::Discover {
            subdir,
            format,
            out,
        } => commands::run_discover(&workspace, subdir, effective_format(json, format), out),
        Command::Validate {
            subdir,
            batch_size,
            validator_jar,
            validator_version,
            java,
            delete_logs,
            fail_fast,
            max_failures,
            format,
            out,
        } => commands::run_validate(
            &workspace,
            ValidateArgs {
                subdir,
                batch_size,
                validator_jar,
                validator_version,
                java,
                delete_logs,
                fail_fast,
                max_failures,
            },
            effective_format(json, format),
            out,
        ),
        Command::Classify { log, format, out } => {
            commands::run_classify(&workspace, log, effective_format(json, format), out)
        }
        Command::Doctor { format, out } => {
            commands::run_doctor(&workspace, effective_format(json, format), out)
        }
    };

    match outcome {
        Ok((rendered, code)) => {
            if !quiet && !rendered.is_empty() {
                if code == 0 {
                    let _ = writeln!(io::stdout(), "{rendered}");
                } else {
                    let _ = writeln!(io::stderr(), "{rendered}");
                }
            }
            code
        }
        Err(err) => {
            let _ = writeln!(io::stderr(), "yangci {label} failed: {err}");
            1
        }
    }
}
