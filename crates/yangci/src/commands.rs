// SPDX-License-Identifier: Apache-2.0

//! Command handlers. Each returns the rendered output plus the process exit
//! code; printing and error prefixes stay in `cli::dispatch`.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;
use yangci_adapters::{
    Capabilities, CurlNetwork, FsWrite, ProcessRunner, RealFs, RealGit, RealProcessRunner,
    SshRunner,
};
use yangci_core::{
    classify, corpus, discovery, exclusions, invoke, report, run_validation, RunOptions,
    RunRequest,
};
use yangci_model::{RunId, ValidatorSpec};

use crate::cli::{Cli, FormatArg};

pub(crate) struct SshTarget {
    pub host: String,
    pub user: Option<String>,
}

/// Everything the handlers need from the global flags.
pub(crate) struct Workspace {
    pub corpus_root: PathBuf,
    pub logs_root: PathBuf,
    pub run_id: Option<String>,
    pub capabilities: Capabilities,
    pub sources_path: Option<PathBuf>,
    pub exclusions_path: Option<PathBuf>,
    pub rules_path: Option<PathBuf>,
    pub ssh: Option<SshTarget>,
}

impl Workspace {
    pub(crate) fn from_cli(cli: &Cli) -> Self {
        Self {
            corpus_root: cli
                .corpus_root
                .clone()
                .unwrap_or_else(|| PathBuf::from("corpus")),
            logs_root: cli.logs_root.clone().unwrap_or_else(|| PathBuf::from("logs")),
            run_id: cli.run_id.clone(),
            capabilities: Capabilities::from_cli_flags(
                cli.allow_write,
                cli.allow_subprocess,
                cli.allow_git,
                cli.allow_network,
            ),
            sources_path: cli.sources.clone(),
            exclusions_path: cli.exclusions.clone(),
            rules_path: cli.rules.clone(),
            ssh: cli.ssh_host.clone().map(|host| SshTarget {
                host,
                user: cli.ssh_user.clone(),
            }),
        }
    }

    fn run_id_or(&self, seed: &str) -> Result<RunId, String> {
        match &self.run_id {
            Some(raw) => RunId::parse(raw),
            None => Ok(RunId::from_seed(seed)),
        }
    }

    /// The validator (and pkill) run over ssh when a host is given; the
    /// corpus tree is then expected at the same path on the remote side.
    fn process_runner(&self) -> Box<dyn ProcessRunner> {
        match &self.ssh {
            Some(target) => Box::new(SshRunner::new(
                RealProcessRunner,
                &target.host,
                target.user.as_deref(),
            )),
            None => Box::new(RealProcessRunner),
        }
    }
}

fn read_registry_text(path: &Option<PathBuf>, embedded: &str) -> Result<String, String> {
    match path {
        Some(path) => fs::read_to_string(path)
            .map_err(|err| format!("cannot read {}: {err}", path.display())),
        None => Ok(embedded.to_string()),
    }
}

fn write_output_if_requested(out: Option<PathBuf>, rendered: &str) -> Result<(), String> {
    if let Some(path) = out {
        fs::write(&path, format!("{rendered}\n"))
            .map_err(|err| format!("cannot write {}: {err}", path.display()))?;
    }
    Ok(())
}

fn load_source_registry(ws: &Workspace) -> Result<corpus::SourceRegistry, String> {
    corpus::load_sources(&read_registry_text(&ws.sources_path, corpus::DEFAULT_SOURCES)?)
}

fn load_exclusion_entries(ws: &Workspace) -> Result<Vec<yangci_model::ExclusionEntry>, String> {
    exclusions::load_exclusions(&read_registry_text(
        &ws.exclusions_path,
        exclusions::DEFAULT_EXCLUSIONS,
    )?)
}

fn load_classify_rules(ws: &Workspace) -> Result<Vec<yangci_model::ClassifyRule>, String> {
    classify::load_rules(&read_registry_text(&ws.rules_path, classify::DEFAULT_RULES)?)
}

pub(crate) fn run_sources_list(
    ws: &Workspace,
    format: FormatArg,
    out: Option<PathBuf>,
) -> Result<(String, i32), String> {
    let registry = load_source_registry(ws)?;
    let rendered = match format {
        FormatArg::Text => {
            let mut lines = registry
                .sources
                .iter()
                .map(|s| format!("{}\t{}\t{}\t{}", s.id, s.url, s.commit, s.dest))
                .collect::<Vec<_>>();
            lines.push(format!("iana\t{}", registry.iana_url));
            lines.join("\n")
        }
        FormatArg::Json => serde_json::to_string_pretty(&serde_json::json!({
            "sources": registry.sources,
            "iana_url": registry.iana_url,
        }))
        .map_err(|err| err.to_string())?,
        FormatArg::Jsonl => registry
            .sources
            .iter()
            .map(|s| serde_json::to_string(s).map_err(|err| err.to_string()))
            .collect::<Result<Vec<_>, _>>()?
            .join("\n"),
    };
    write_output_if_requested(out, &rendered)?;
    Ok((rendered, 0))
}

pub(crate) fn run_fetch(
    ws: &Workspace,
    with_iana: bool,
    format: FormatArg,
    out: Option<PathBuf>,
) -> Result<(String, i32), String> {
    let registry = load_source_registry(ws)?;
    let process = ws.process_runner();

    let provisioned = corpus::provision(
        process.as_ref(),
        ws.capabilities,
        &ws.corpus_root,
        &registry.kill_pattern,
    )?;
    let fetched = corpus::fetch(&RealGit, ws.capabilities, &ws.corpus_root, &registry)?;
    info!(sources = fetched.fetched.len(), "corpus fetch complete");

    let mut iana_entries = None;
    if with_iana {
        let listing = corpus::fetch_iana(&CurlNetwork, ws.capabilities, &registry)?;
        let run_id = ws.run_id_or("fetch_run")?;
        RealFs
            .write_text(
                &ws.logs_root,
                run_id.as_str(),
                Path::new("iana.yang-parameters.txt"),
                &listing.text,
            )
            .map_err(|err| err.to_string())?;
        info!(entries = listing.entries, "iana listing saved");
        iana_entries = Some(listing.entries);
    }

    let payload = serde_json::json!({
        "schema_version": 1,
        "provision": provisioned,
        "fetched": fetched.fetched,
        "iana_entries": iana_entries,
    });
    let rendered = match format {
        FormatArg::Text => {
            let mut lines = vec![
                format!("fetched: {}", fetched.fetched.join(" ")),
                format!("killed_stale: {}", provisioned.killed_stale),
            ];
            if let Some(entries) = iana_entries {
                lines.push(format!("iana_entries: {entries}"));
            }
            lines.join("\n")
        }
        FormatArg::Json => {
            serde_json::to_string_pretty(&payload).map_err(|err| err.to_string())?
        }
        FormatArg::Jsonl => serde_json::to_string(&payload).map_err(|err| err.to_string())?,
    };
    write_output_if_requested(out, &rendered)?;
    Ok((rendered, 0))
}

pub(crate) fn run_prune(
    ws: &Workspace,
    dry_run: bool,
    format: FormatArg,
    out: Option<PathBuf>,
) -> Result<(String, i32), String> {
    let entries = load_exclusion_entries(ws)?;
    let outcome = exclusions::prune(&ws.corpus_root, &entries, ws.capabilities, dry_run)?;
    info!(
        removed = outcome.removed.len(),
        missing = outcome.missing.len(),
        dry_run,
        "prune complete"
    );

    let rendered = match format {
        FormatArg::Text => {
            let mut lines = vec![format!(
                "pruned: removed={} missing={} dry_run={}",
                outcome.removed.len(),
                outcome.missing.len(),
                dry_run
            )];
            lines.extend(outcome.removed.iter().map(|p| format!("removed: {p}")));
            lines.extend(outcome.missing.iter().map(|p| format!("missing: {p}")));
            lines.join("\n")
        }
        FormatArg::Json => serde_json::to_string_pretty(&serde_json::json!({
            "schema_version": 1,
            "dry_run": dry_run,
            "removed": outcome.removed,
            "missing": outcome.missing,
        }))
        .map_err(|err| err.to_string())?,
        FormatArg::Jsonl => serde_json::to_string(&outcome).map_err(|err| err.to_string())?,
    };
    write_output_if_requested(out, &rendered)?;
    Ok((rendered, 0))
}

pub(crate) fn run_discover(
    ws: &Workspace,
    subdir: Option<String>,
    format: FormatArg,
    out: Option<PathBuf>,
) -> Result<(String, i32), String> {
    let mut files = discovery::discover_yang_files(&ws.corpus_root)?;
    if let Some(subdir) = subdir {
        let nested = format!("{}/", subdir.trim_end_matches('/'));
        files.retain(|file| file.starts_with(&nested));
    }
    let rendered = match format {
        FormatArg::Text => files.join("\n"),
        FormatArg::Json => serde_json::to_string_pretty(&serde_json::json!({
            "count": files.len(),
            "files": files,
        }))
        .map_err(|err| err.to_string())?,
        FormatArg::Jsonl => files
            .iter()
            .map(|f| serde_json::to_string(f).map_err(|err| err.to_string()))
            .collect::<Result<Vec<_>, _>>()?
            .join("\n"),
    };
    write_output_if_requested(out, &rendered)?;
    Ok((rendered, 0))
}

pub(crate) struct ValidateArgs {
    pub subdir: Option<String>,
    pub batch_size: usize,
    pub validator_jar: String,
    pub validator_version: Option<String>,
    pub java: String,
    pub delete_logs: bool,
    pub fail_fast: bool,
    pub max_failures: Option<usize>,
}

/// Released validator builds follow the upstream artifact naming.
fn jar_for_version(version: &str) -> String {
    format!("yang-model-validator-{version}-jar-with-dependencies.jar")
}

pub(crate) fn run_validate(
    ws: &Workspace,
    args: ValidateArgs,
    format: FormatArg,
    out: Option<PathBuf>,
) -> Result<(String, i32), String> {
    let rules = load_classify_rules(ws)?;
    let jar = match &args.validator_version {
        Some(version) => jar_for_version(version),
        None => args.validator_jar,
    };
    let spec = ValidatorSpec {
        java: args.java,
        jar,
        model_paths: discovery::model_path_set(),
        batch_size: args.batch_size,
        ..ValidatorSpec::default()
    };
    let run_id = ws
        .run_id
        .as_deref()
        .map(RunId::parse)
        .transpose()?;
    let request = RunRequest {
        corpus_root: ws.corpus_root.clone(),
        logs_root: ws.logs_root.clone(),
        run_id,
        capabilities: ws.capabilities,
        command: Some(
            std::env::args().collect::<Vec<_>>().join(" "),
        ),
        subdir: args.subdir,
        delete_passing_logs: args.delete_logs,
        timestamp: None,
    };
    let process = ws.process_runner();
    let report_out = run_validation(
        process.as_ref(),
        &RealFs,
        &request,
        &spec,
        &rules,
        &RunOptions {
            fail_fast: args.fail_fast,
            max_failures: args.max_failures,
        },
    )?;
    info!(
        passed = report_out.summary.passed,
        failed = report_out.summary.failed,
        errors = report_out.summary.errors,
        "validation complete"
    );

    let rendered = match format {
        FormatArg::Text => report::render_text(&report_out),
        FormatArg::Json => report::render_json(&report_out)?,
        FormatArg::Jsonl => report::render_jsonl(&report_out)?,
    };
    write_output_if_requested(out, &rendered)?;
    Ok((rendered, report::exit_code_for_report(&report_out)))
}

pub(crate) fn run_classify(
    ws: &Workspace,
    log: PathBuf,
    format: FormatArg,
    out: Option<PathBuf>,
) -> Result<(String, i32), String> {
    let rules = load_classify_rules(ws)?;
    let text = fs::read_to_string(&log)
        .map_err(|err| format!("cannot read {}: {err}", log.display()))?;
    let category = classify::classify(&rules, &text);
    let rendered = match format {
        FormatArg::Text => category.as_str().to_string(),
        FormatArg::Json => serde_json::to_string_pretty(&serde_json::json!({
            "log": log.display().to_string(),
            "category": category.as_str(),
        }))
        .map_err(|err| err.to_string())?,
        FormatArg::Jsonl => serde_json::to_string(&serde_json::json!({
            "log": log.display().to_string(),
            "category": category.as_str(),
        }))
        .map_err(|err| err.to_string())?,
    };
    write_output_if_requested(out, &rendered)?;
    Ok((rendered, 0))
}

pub(crate) fn run_doctor(
    ws: &Workspace,
    format: FormatArg,
    out: Option<PathBuf>,
) -> Result<(String, i32), String> {
    let mut errors = Vec::new();

    let sources = match load_source_registry(ws) {
        Ok(registry) => registry.sources.len(),
        Err(err) => {
            errors.push(format!("sources: {err}"));
            0
        }
    };
    let exclusion_count = match load_exclusion_entries(ws) {
        Ok(entries) => entries.len(),
        Err(err) => {
            errors.push(format!("exclusions: {err}"));
            0
        }
    };
    let rule_count = match load_classify_rules(ws) {
        Ok(rules) => rules.len(),
        Err(err) => {
            errors.push(format!("rules: {err}"));
            0
        }
    };

    // JVM and jar availability are reported, not fatal: a driver host may
    // only ever fetch and prune.
    let java_version = if ws.capabilities.subprocess {
        let process = ws.process_runner();
        invoke::java_version(process.as_ref(), &ValidatorSpec::default(), Path::new("."))
    } else {
        None
    };
    let jar_present = Path::new(&ValidatorSpec::default().jar).exists();

    let status = if errors.is_empty() { "ok" } else { "failed" };
    let payload = serde_json::json!({
        "schema_version": 1,
        "status": status,
        "errors": errors,
        "sources": sources,
        "exclusions": exclusion_count,
        "rules": rule_count,
        "java_version": java_version,
        "java_checked": ws.capabilities.subprocess,
        "jar_present": jar_present,
    });

    if ws.capabilities.fs_write {
        let run_id = ws.run_id_or("doctor_run")?;
        let pretty = serde_json::to_string_pretty(&payload).map_err(|err| err.to_string())?;
        RealFs
            .write_text(
                &ws.logs_root,
                run_id.as_str(),
                Path::new("doctor.report.json"),
                &pretty,
            )
            .map_err(|err| err.to_string())?;
    }

    let rendered = match format {
        FormatArg::Text => format!(
            "status: {status}\nsources: {sources}\nexclusions: {exclusion_count}\nrules: {rule_count}\njava: {}\njar_present: {jar_present}",
            match (&java_version, ws.capabilities.subprocess) {
                (Some(version), _) => version.clone(),
                (None, true) => "unavailable".to_string(),
                (None, false) => "skipped".to_string(),
            },
        ),
        FormatArg::Json => serde_json::to_string_pretty(&payload).map_err(|err| err.to_string())?,
        FormatArg::Jsonl => serde_json::to_string(&payload).map_err(|err| err.to_string())?,
    };
    write_output_if_requested(out, &rendered)?;
    Ok((rendered, if status == "ok" { 0 } else { 1 }))
}
