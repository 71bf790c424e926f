#![forbid(unsafe_code)]

//! Vocabulary types shared by the yangci harness crates.
//!
//! Nothing in here touches the filesystem or spawns processes; these are the
//! values that flow between the corpus registry, the validator runner, the
//! failure classifier, and the report renderers.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

fn is_lower_snake(input: &str) -> bool {
    !input.is_empty()
        && input
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Identifier of a single harness run; doubles as the log subdirectory name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    pub fn parse(value: &str) -> Result<Self, String> {
        let raw = value.trim();
        if raw.is_empty() {
            return Err("run id cannot be empty".to_string());
        }
        if !is_lower_snake(raw) {
            return Err(format!(
                "invalid run id `{raw}`: expected lowercase snake_case"
            ));
        }
        Ok(Self(raw.to_string()))
    }

    /// Derives a usable run id from free-form text, e.g. a CI job name.
    pub fn from_seed(seed: &str) -> Self {
        let mut out = String::with_capacity(seed.len());
        for c in seed.chars() {
            if c.is_ascii_alphanumeric() {
                out.push(c.to_ascii_lowercase());
            } else {
                out.push('_');
            }
        }
        let compact = out
            .split('_')
            .filter(|seg| !seg.is_empty())
            .collect::<Vec<_>>()
            .join("_");
        if compact.is_empty() {
            return Self("run".to_string());
        }
        Self(compact)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of a corpus source in the source registry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(String);

impl SourceId {
    pub fn parse(value: &str) -> Result<Self, String> {
        let raw = value.trim();
        if raw.is_empty() {
            return Err("source id cannot be empty".to_string());
        }
        if !is_lower_snake(raw) {
            return Err(format!(
                "invalid source id `{raw}`: expected lowercase snake_case"
            ));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure-category label assigned by the output classifier.
///
/// `other` is the catch-all for failing output no rule matches and is always
/// a valid category.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Category(String);

impl Category {
    pub const MAX_LEN: usize = 48;

    pub fn parse(value: &str) -> Result<Self, String> {
        let raw = value.trim();
        if raw.is_empty() {
            return Err("category cannot be empty".to_string());
        }
        if raw.len() > Self::MAX_LEN {
            return Err(format!(
                "category `{raw}` exceeds max length {}",
                Self::MAX_LEN
            ));
        }
        if !is_lower_snake(raw) {
            return Err(format!(
                "invalid category `{raw}`: expected lowercase snake_case"
            ));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn other() -> Self {
        Self("other".to_string())
    }

    pub fn is_other(&self) -> bool {
        self.0 == "other"
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One external Git corpus pinned to a known commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusSpec {
    pub id: SourceId,
    pub url: String,
    pub commit: String,
    /// Destination directory relative to the corpus root.
    pub dest: String,
    /// Directory name the clone produces when it differs from the final
    /// location (OpenConfig clones as `public` and is relocated).
    pub clone_as: Option<String>,
}

/// A corpus-relative path excluded from validation, with the reason it is
/// known bad or irrelevant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionEntry {
    pub path: String,
    pub reason: String,
}

/// One ordered classification rule: if the validator output contains
/// `needle`, the failure is assigned `category`. First match wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifyRule {
    pub needle: String,
    pub category: Category,
}

/// Invocation contract for the external validator jar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorSpec {
    /// Tool name used in log file names.
    pub tool: String,
    pub java: String,
    pub jar: String,
    /// Dependency directories passed via `--path`, relative to the corpus
    /// root. Recursive resolution is deliberately not used; it is too slow
    /// for corpora of this size.
    pub model_paths: Vec<String>,
    /// Files validated per process invocation.
    pub batch_size: usize,
}

impl Default for ValidatorSpec {
    fn default() -> Self {
        Self {
            tool: "yang-model-validator".to_string(),
            java: "java".to_string(),
            jar: "yang-model-validator.jar".to_string(),
            model_paths: Vec::new(),
            batch_size: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Pass,
    Fail,
    /// The validator process could not be spawned or produced no usable
    /// status. Not distinguished from schema failures in category files.
    Error,
}

/// Result of validating one YANG file (or one member of a batch).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOutcome {
    /// Corpus-relative path of the YANG file.
    pub path: String,
    pub status: FileStatus,
    pub exit_code: Option<i32>,
    pub category: Option<Category>,
    /// Final log file name under the run's log root, category-prefixed on
    /// failure.
    pub log: Option<String>,
    pub log_sha256: Option<String>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub passed: u64,
    pub failed: u64,
    pub errors: u64,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub corpus_root: String,
    pub command: String,
    pub capabilities: BTreeMap<String, bool>,
    /// Failing files per category; keys are category labels.
    pub categories: BTreeMap<String, u64>,
    pub outcomes: Vec<FileOutcome>,
    pub summary: RunSummary,
}

pub fn report_json_schema() -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "yangci run report",
        "type": "object",
        "required": ["run_id", "corpus_root", "command", "capabilities", "categories", "outcomes", "summary"],
        "properties": {
            "run_id": {"type": "string"},
            "corpus_root": {"type": "string"},
            "command": {"type": "string"},
            "capabilities": {"type": "object", "additionalProperties": {"type": "boolean"}},
            "categories": {"type": "object", "additionalProperties": {"type": "integer", "minimum": 0}},
            "outcomes": {"type": "array"},
            "summary": {"type": "object"}
        }
    })
}
