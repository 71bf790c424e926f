// SPDX-License-Identifier: Apache-2.0

//! Log naming, category files, and report rendering.
//!
//! Log files are named `<tool>--<label>.<timestamp>.log`; a failing file's
//! log carries its category as a prefix so a directory listing groups the
//! failures at a glance. Category summary files are `<category>.txt`.

use sha2::{Digest, Sha256};
use yangci_model::{Category, FileStatus, RunReport};

pub fn label_for_file(path: &str) -> String {
    let stem = std::path::Path::new(path)
        .file_stem()
        .and_then(|v| v.to_str())
        .unwrap_or("file");
    stem.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

pub fn log_file_name(tool: &str, label: &str, timestamp: u64) -> String {
    format!("{tool}--{label}.{timestamp}.log")
}

pub fn categorized_log_name(category: &Category, base: &str) -> String {
    format!("{category}.{base}")
}

pub fn category_file_name(category: &str) -> String {
    format!("{category}.txt")
}

pub fn log_content(program: &str, args: &[String], output: &str) -> String {
    let mut content = String::from("$ ");
    content.push_str(program);
    for arg in args {
        content.push(' ');
        content.push_str(arg);
    }
    content.push('\n');
    content.push('\n');
    content.push_str(output);
    if !content.ends_with('\n') {
        content.push('\n');
    }
    content
}

pub fn sha256_hex(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn render_text(report: &RunReport) -> String {
    let mut lines = vec![format!(
        "summary: passed={} failed={} errors={} total={}",
        report.summary.passed, report.summary.failed, report.summary.errors, report.summary.total,
    )];
    for (category, count) in &report.categories {
        lines.push(format!("category: {category} {count}"));
    }
    for outcome in &report.outcomes {
        if matches!(outcome.status, FileStatus::Pass) {
            continue;
        }
        let category = outcome
            .category
            .as_ref()
            .map_or("other", Category::as_str);
        lines.push(format!("failed: {} {category}", outcome.path));
    }
    lines.join("\n")
}

pub fn render_json(report: &RunReport) -> Result<String, String> {
    serde_json::to_string_pretty(report).map_err(|err| err.to_string())
}

pub fn render_jsonl(report: &RunReport) -> Result<String, String> {
    let mut lines = Vec::new();
    for outcome in &report.outcomes {
        lines.push(serde_json::to_string(outcome).map_err(|err| err.to_string())?);
    }
    Ok(lines.join("\n"))
}

pub fn exit_code_for_report(report: &RunReport) -> i32 {
    if report.summary.errors > 0 {
        3
    } else if report.summary.failed > 0 {
        2
    } else {
        0
    }
}
