// SPDX-License-Identifier: Apache-2.0

//! The exclusion registry and the prune operation.
//!
//! Every entry names a corpus-relative file, directory, or single-level
//! glob together with the reason it is withheld from the validator. Pruning
//! is destructive on the fetched corpus tree, never on anything else.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use yangci_adapters::Capabilities;
use yangci_model::ExclusionEntry;

pub const DEFAULT_EXCLUSIONS: &str = include_str!("../config/exclusions.toml");

#[derive(Debug, Deserialize)]
struct RawExclusions {
    exclusions: Vec<RawEntry>,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    path: String,
    reason: String,
}

pub fn load_exclusions(text: &str) -> Result<Vec<ExclusionEntry>, String> {
    let raw: RawExclusions =
        toml::from_str(text).map_err(|err| format!("failed to parse exclusions: {err}"))?;
    let entries = raw
        .exclusions
        .into_iter()
        .map(|row| ExclusionEntry {
            path: row.path,
            reason: row.reason,
        })
        .collect::<Vec<_>>();
    let errors = validate_exclusions(&entries);
    if errors.is_empty() {
        Ok(entries)
    } else {
        Err(errors.join("; "))
    }
}

pub fn validate_exclusions(entries: &[ExclusionEntry]) -> Vec<String> {
    let mut errors = Vec::new();
    let mut seen = BTreeSet::new();
    for entry in entries {
        let path = entry.path.trim();
        if path.is_empty() {
            errors.push("exclusion with an empty path".to_string());
            continue;
        }
        if !seen.insert(path.to_string()) {
            errors.push(format!("duplicate exclusion `{path}`"));
        }
        if Path::new(path).is_absolute() {
            errors.push(format!("exclusion `{path}` must be corpus-relative"));
        }
        if path.split('/').any(|part| part == "..") {
            errors.push(format!("exclusion `{path}` must not traverse upwards"));
        }
        if entry.reason.trim().is_empty() {
            errors.push(format!("exclusion `{path}` has no reason"));
        }
    }
    errors
}

fn wildcard_matches(pattern: &str, value: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == value;
    }
    let mut cursor = 0usize;
    for (idx, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        if idx == 0 && !pattern.starts_with('*') {
            if !value[cursor..].starts_with(part) {
                return false;
            }
            cursor += part.len();
            continue;
        }
        if idx == parts.len() - 1 && !pattern.ends_with('*') {
            return value.ends_with(part) && value[cursor..].contains(part);
        }
        if let Some(pos) = value[cursor..].find(part) {
            cursor += pos + part.len();
        } else {
            return false;
        }
    }
    true
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PruneOutcome {
    /// Corpus-relative paths actually deleted (or that would be, on a dry
    /// run).
    pub removed: Vec<String>,
    /// Entries whose target was already absent.
    pub missing: Vec<String>,
}

/// Deletes every excluded path from the fetched corpus. A `*` is honored in
/// the final path segment only (`ietf-snmp*`); directories are removed whole.
pub fn prune(
    corpus_root: &Path,
    entries: &[ExclusionEntry],
    caps: Capabilities,
    dry_run: bool,
) -> Result<PruneOutcome, String> {
    if !dry_run && !caps.fs_write {
        return Err("prune requires --allow-write".to_string());
    }

    let mut outcome = PruneOutcome::default();
    for entry in entries {
        let targets = expand_entry(corpus_root, &entry.path)?;
        if targets.is_empty() {
            outcome.missing.push(entry.path.clone());
            continue;
        }
        for rel in targets {
            let absolute = corpus_root.join(&rel);
            if !dry_run {
                remove_target(&absolute)?;
            }
            outcome.removed.push(rel);
        }
    }
    outcome.removed.sort();
    outcome.missing.sort();
    Ok(outcome)
}

fn expand_entry(corpus_root: &Path, pattern: &str) -> Result<Vec<String>, String> {
    if !pattern.contains('*') {
        let target = corpus_root.join(pattern);
        return Ok(if target.exists() {
            vec![pattern.to_string()]
        } else {
            Vec::new()
        });
    }

    let path = Path::new(pattern);
    let file_pattern = path
        .file_name()
        .and_then(|v| v.to_str())
        .ok_or_else(|| format!("exclusion `{pattern}` has no file component"))?;
    let parent_rel = path.parent().unwrap_or_else(|| Path::new(""));
    let parent = corpus_root.join(parent_rel);
    if !parent.is_dir() {
        return Ok(Vec::new());
    }

    let mut out = Vec::new();
    let entries = fs::read_dir(&parent)
        .map_err(|err| format!("cannot read {}: {err}", parent.display()))?;
    for entry in entries {
        let entry = entry.map_err(|err| format!("cannot read {}: {err}", parent.display()))?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if wildcard_matches(file_pattern, name) {
            out.push(parent_rel.join(name).display().to_string());
        }
    }
    Ok(out)
}

fn remove_target(path: &Path) -> Result<(), String> {
    let meta = fs::symlink_metadata(path)
        .map_err(|err| format!("cannot stat {}: {err}", path.display()))?;
    if meta.is_dir() {
        fs::remove_dir_all(path).map_err(|err| format!("cannot remove {}: {err}", path.display()))
    } else {
        fs::remove_file(path).map_err(|err| format!("cannot remove {}: {err}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_parses_and_validates() {
        let entries = load_exclusions(DEFAULT_EXCLUSIONS).expect("default exclusions");
        assert!(validate_exclusions(&entries).is_empty());
        assert!(entries.len() > 50);
        assert!(entries.iter().any(|e| e.path == "yang/vendor/juniper"));
    }

    #[test]
    fn validation_flags_duplicates_and_bad_paths() {
        let entries = vec![
            ExclusionEntry {
                path: "a.yang".to_string(),
                reason: "r".to_string(),
            },
            ExclusionEntry {
                path: "a.yang".to_string(),
                reason: "r".to_string(),
            },
            ExclusionEntry {
                path: "/etc/passwd".to_string(),
                reason: "r".to_string(),
            },
            ExclusionEntry {
                path: "../escape.yang".to_string(),
                reason: "r".to_string(),
            },
            ExclusionEntry {
                path: "b.yang".to_string(),
                reason: " ".to_string(),
            },
        ];
        let errors = validate_exclusions(&entries);
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn wildcard_matching_covers_prefix_patterns() {
        assert!(wildcard_matches("ietf-snmp*", "ietf-snmp-common.yang"));
        assert!(wildcard_matches("ietf-snmp*", "ietf-snmp.yang"));
        assert!(!wildcard_matches("ietf-snmp*", "ietf-system.yang"));
        assert!(wildcard_matches("*", "anything"));
        assert!(wildcard_matches("a*c", "abc"));
        assert!(!wildcard_matches("a*c", "abd"));
    }
}
