#![forbid(unsafe_code)]

//! Engine of the yangci harness.
//!
//! Everything here is synchronous and sequential: one validator process per
//! file (or batch), blocking until it exits. The only state is the fetched
//! corpus tree on disk and the log files the run writes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use yangci_adapters::{Capabilities, FsWrite, ProcessRunner};
use yangci_model::{
    Category, ClassifyRule, FileOutcome, FileStatus, RunId, RunReport, RunSummary, ValidatorSpec,
};

pub mod classify;
pub mod corpus;
pub mod discovery;
pub mod exclusions;
pub mod invoke;
pub mod report;

pub use yangci_adapters as adapters;
pub use yangci_model as model;

#[derive(Debug, Clone)]
pub struct RunRequest {
    pub corpus_root: PathBuf,
    pub logs_root: PathBuf,
    pub run_id: Option<RunId>,
    pub capabilities: Capabilities,
    pub command: Option<String>,
    /// Restrict validation to one corpus subdirectory.
    pub subdir: Option<String>,
    /// Drop per-file logs for passing files; failures always keep theirs.
    pub delete_passing_logs: bool,
    /// Unix seconds used in log file names; the wall clock when absent.
    pub timestamp: Option<u64>,
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub fail_fast: bool,
    pub max_failures: Option<usize>,
}

pub fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

fn capability_map(caps: Capabilities) -> BTreeMap<String, bool> {
    BTreeMap::from([
        ("fs_write".to_string(), caps.fs_write),
        ("subprocess".to_string(), caps.subprocess),
        ("git".to_string(), caps.git),
        ("network".to_string(), caps.network),
    ])
}

/// Runs the validator over every discovered YANG file and turns exit codes
/// plus captured output into a [`RunReport`], persisting per-file logs and
/// per-category summary files under the run's log root.
pub fn run_validation(
    process: &dyn ProcessRunner,
    fs_write: &dyn FsWrite,
    request: &RunRequest,
    validator: &ValidatorSpec,
    rules: &[ClassifyRule],
    options: &RunOptions,
) -> Result<RunReport, String> {
    if !request.capabilities.subprocess {
        return Err("validate requires --allow-subprocess".to_string());
    }
    if !request.capabilities.fs_write {
        return Err("validate requires --allow-write".to_string());
    }

    let mut files = discovery::discover_yang_files(&request.corpus_root)?;
    if let Some(subdir) = &request.subdir {
        let prefix = subdir.trim_end_matches('/');
        let nested = format!("{prefix}/");
        files.retain(|file| file.starts_with(&nested));
    }

    let run_id = request
        .run_id
        .clone()
        .unwrap_or_else(|| RunId::from_seed("validator_run"));
    let timestamp = request.timestamp.unwrap_or_else(unix_timestamp);
    let batch = validator.batch_size.max(1);

    let mut outcomes: Vec<FileOutcome> = Vec::new();
    let mut failures = 0usize;

    'chunks: for (index, chunk) in files.chunks(batch).enumerate() {
        let args = invoke::validator_args(validator, chunk);
        let start = Instant::now();
        let run = process.run(&validator.java, &args, &request.corpus_root);
        let duration_ms = start.elapsed().as_millis() as u64;

        let label = if chunk.len() == 1 {
            report::label_for_file(&chunk[0])
        } else {
            format!("batch_{index:04}")
        };
        let base_log = report::log_file_name(&validator.tool, &label, timestamp);

        let (status, exit_code, category, output) = match run {
            Ok(out) if out.success() => (FileStatus::Pass, Some(out.code), None, out.combined()),
            Ok(out) => {
                let combined = out.combined();
                let category = classify::classify(rules, &combined);
                (FileStatus::Fail, Some(out.code), Some(category), combined)
            }
            // Spawn failures are not a classification of the models; they
            // still count under `other` in the category files.
            Err(err) => (
                FileStatus::Error,
                None,
                Some(Category::other()),
                err.to_string(),
            ),
        };

        let log_name = if matches!(status, FileStatus::Pass) {
            base_log
        } else {
            let category = category.as_ref().unwrap_or(&Category::other()).clone();
            report::categorized_log_name(&category, &base_log)
        };

        let keep_log = !(matches!(status, FileStatus::Pass) && request.delete_passing_logs);
        let mut log_sha256 = None;
        if keep_log {
            let content = report::log_content(&validator.java, &args, &output);
            fs_write
                .write_text(
                    &request.logs_root,
                    run_id.as_str(),
                    Path::new(&log_name),
                    &content,
                )
                .map_err(|err| err.to_string())?;
            log_sha256 = Some(report::sha256_hex(&content));
        }

        for file in chunk {
            outcomes.push(FileOutcome {
                path: file.clone(),
                status,
                exit_code,
                category: category.clone(),
                log: keep_log.then(|| log_name.clone()),
                log_sha256: log_sha256.clone(),
                duration_ms,
            });
        }

        if !matches!(status, FileStatus::Pass) {
            failures += 1;
            if options.fail_fast {
                break 'chunks;
            }
            if let Some(max) = options.max_failures {
                if failures >= max {
                    break 'chunks;
                }
            }
        }
    }

    outcomes.sort_by(|a, b| a.path.cmp(&b.path));

    let summary = RunSummary {
        passed: outcomes
            .iter()
            .filter(|row| row.status == FileStatus::Pass)
            .count() as u64,
        failed: outcomes
            .iter()
            .filter(|row| row.status == FileStatus::Fail)
            .count() as u64,
        errors: outcomes
            .iter()
            .filter(|row| row.status == FileStatus::Error)
            .count() as u64,
        total: outcomes.len() as u64,
    };

    let mut by_category: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for outcome in &outcomes {
        if matches!(outcome.status, FileStatus::Pass) {
            continue;
        }
        let label = outcome
            .category
            .as_ref()
            .map_or_else(|| "other".to_string(), |c| c.as_str().to_string());
        by_category.entry(label).or_default().push(outcome.path.clone());
    }
    for (label, failed_files) in &by_category {
        let mut content = failed_files.join("\n");
        content.push('\n');
        fs_write
            .write_text(
                &request.logs_root,
                run_id.as_str(),
                Path::new(&report::category_file_name(label)),
                &content,
            )
            .map_err(|err| err.to_string())?;
    }
    let categories = by_category
        .into_iter()
        .map(|(label, failed_files)| (label, failed_files.len() as u64))
        .collect();

    Ok(RunReport {
        run_id,
        corpus_root: request.corpus_root.display().to_string(),
        command: request
            .command
            .clone()
            .unwrap_or_else(|| "validate".to_string()),
        capabilities: capability_map(request.capabilities),
        categories,
        outcomes,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_refuses_without_subprocess_capability() {
        let request = RunRequest {
            corpus_root: PathBuf::from("."),
            logs_root: PathBuf::from("logs"),
            run_id: None,
            capabilities: Capabilities::deny_all(),
            command: None,
            subdir: None,
            delete_passing_logs: false,
            timestamp: Some(0),
        };
        let err = run_validation(
            &yangci_adapters::DeniedProcessRunner,
            &yangci_adapters::RealFs,
            &request,
            &ValidatorSpec::default(),
            &[],
            &RunOptions::default(),
        )
        .expect_err("must refuse");
        assert!(err.contains("--allow-subprocess"));
    }

    #[test]
    fn timestamps_are_monotonic_enough_for_log_names() {
        assert!(unix_timestamp() > 1_600_000_000);
    }
}
