// SPDX-License-Identifier: Apache-2.0

//! Corpus source registry, host provisioning, and fetch.
//!
//! Sources are fetched in registry order; a source whose destination nests
//! inside another source's tree (OpenConfig inside YangModels) must come
//! after it. The registry validator enforces this so a reordering cannot
//! silently clobber a fetch.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use yangci_adapters::{AdapterError, Capabilities, Git, Network, ProcessRunner};
use yangci_model::{CorpusSpec, SourceId};

pub const DEFAULT_SOURCES: &str = include_str!("../config/sources.toml");

/// Branch name used for the pinned checkout in every fetched source.
pub const WORK_BRANCH: &str = "yangci";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRegistry {
    pub sources: Vec<CorpusSpec>,
    pub iana_url: String,
    pub kill_pattern: String,
}

#[derive(Debug, Deserialize)]
struct RawRegistry {
    sources: Vec<RawSource>,
    iana: RawIana,
    provision: RawProvision,
}

#[derive(Debug, Deserialize)]
struct RawSource {
    id: String,
    url: String,
    commit: String,
    dest: String,
    clone_as: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawIana {
    url: String,
}

#[derive(Debug, Deserialize)]
struct RawProvision {
    kill_pattern: String,
}

fn is_commit_hash(raw: &str) -> bool {
    raw.len() == 40 && raw.chars().all(|c| c.is_ascii_hexdigit())
}

pub fn load_sources(text: &str) -> Result<SourceRegistry, String> {
    let raw: RawRegistry =
        toml::from_str(text).map_err(|err| format!("failed to parse sources: {err}"))?;
    let sources = raw
        .sources
        .into_iter()
        .map(|row| {
            Ok(CorpusSpec {
                id: SourceId::parse(&row.id)?,
                url: row.url,
                commit: row.commit,
                dest: row.dest,
                clone_as: row.clone_as,
            })
        })
        .collect::<Result<Vec<_>, String>>()?;
    let registry = SourceRegistry {
        sources,
        iana_url: raw.iana.url,
        kill_pattern: raw.provision.kill_pattern,
    };
    let errors = validate_sources(&registry);
    if errors.is_empty() {
        Ok(registry)
    } else {
        Err(errors.join("; "))
    }
}

pub fn validate_sources(registry: &SourceRegistry) -> Vec<String> {
    let mut errors = Vec::new();
    let mut ids = std::collections::BTreeSet::new();
    let mut dests = std::collections::BTreeSet::new();

    for (index, source) in registry.sources.iter().enumerate() {
        if !ids.insert(source.id.as_str().to_string()) {
            errors.push(format!("duplicate source id `{}`", source.id));
        }
        if !source.url.starts_with("https://") {
            errors.push(format!("{}: url must be https", source.id));
        }
        if !is_commit_hash(&source.commit) {
            errors.push(format!(
                "{}: commit must be a full 40-character hash",
                source.id
            ));
        }
        let dest = source.dest.trim_matches('/');
        if dest.is_empty() {
            errors.push(format!("{}: dest cannot be empty", source.id));
        }
        if !dests.insert(dest.to_string()) {
            errors.push(format!("duplicate source dest `{dest}`"));
        }
        // A nested destination only works once its parent tree exists.
        for later in &registry.sources[index + 1..] {
            let other = later.dest.trim_matches('/');
            if dest.starts_with(&format!("{other}/")) {
                errors.push(format!(
                    "{}: dest nests inside `{}` which is fetched later",
                    source.id, later.id
                ));
            }
        }
    }

    if registry.iana_url.trim().is_empty() {
        errors.push("iana url cannot be empty".to_string());
    }
    if registry.kill_pattern.trim().is_empty() {
        errors.push("provision kill_pattern cannot be empty".to_string());
    }
    errors
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProvisionOutcome {
    /// Whether a stale validator process was found and killed.
    pub killed_stale: bool,
    pub cleaned: bool,
}

/// Kills leftover validator JVMs and recreates the corpus working tree.
pub fn provision(
    process: &dyn ProcessRunner,
    caps: Capabilities,
    corpus_root: &Path,
    kill_pattern: &str,
) -> Result<ProvisionOutcome, String> {
    if !caps.subprocess {
        return Err("provision requires --allow-subprocess".to_string());
    }
    if !caps.fs_write {
        return Err("provision requires --allow-write".to_string());
    }

    // pkill exits 1 when nothing matched; that is the normal case on a
    // clean host. A host without pkill is tolerated the same way.
    let killed_stale = match process.run(
        "pkill",
        &["-f".to_string(), kill_pattern.to_string()],
        Path::new("."),
    ) {
        Ok(out) => out.code == 0,
        Err(AdapterError::EffectDenied { effect, detail }) => {
            return Err(format!("effect denied: {effect} ({detail})"));
        }
        Err(_) => false,
    };

    if corpus_root.exists() {
        fs::remove_dir_all(corpus_root)
            .map_err(|err| format!("cannot remove {}: {err}", corpus_root.display()))?;
    }
    fs::create_dir_all(corpus_root)
        .map_err(|err| format!("cannot create {}: {err}", corpus_root.display()))?;

    Ok(ProvisionOutcome {
        killed_stale,
        cleaned: true,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FetchOutcome {
    /// Source ids fetched and pinned, in registry order.
    pub fetched: Vec<String>,
}

/// Clones every source, pins it to its commit on [`WORK_BRANCH`], relocates
/// clones that land under a different name, and drops the `.git` trees so
/// discovery never wanders into object stores.
pub fn fetch(
    git: &dyn Git,
    caps: Capabilities,
    corpus_root: &Path,
    registry: &SourceRegistry,
) -> Result<FetchOutcome, String> {
    if !caps.git {
        return Err("fetch requires --allow-git".to_string());
    }
    if !caps.fs_write {
        return Err("fetch requires --allow-write".to_string());
    }

    let mut outcome = FetchOutcome::default();
    for source in &registry.sources {
        let dest = corpus_root.join(&source.dest);
        if dest.exists() {
            fs::remove_dir_all(&dest)
                .map_err(|err| format!("cannot remove {}: {err}", dest.display()))?;
        }

        let clone_dir = match &source.clone_as {
            Some(name) => dest
                .parent()
                .unwrap_or(corpus_root)
                .join(name),
            None => dest.clone(),
        };
        if clone_dir != dest && clone_dir.exists() {
            fs::remove_dir_all(&clone_dir)
                .map_err(|err| format!("cannot remove {}: {err}", clone_dir.display()))?;
        }

        git.clone_blobless(&source.url, &clone_dir)
            .map_err(|err| format!("{}: {err}", source.id))?;
        git.checkout_pinned(&clone_dir, WORK_BRANCH, &source.commit)
            .map_err(|err| format!("{}: {err}", source.id))?;

        if clone_dir != dest {
            fs::rename(&clone_dir, &dest).map_err(|err| {
                format!(
                    "cannot move {} to {}: {err}",
                    clone_dir.display(),
                    dest.display()
                )
            })?;
        }

        let git_dir = dest.join(".git");
        if git_dir.exists() {
            fs::remove_dir_all(&git_dir)
                .map_err(|err| format!("cannot remove {}: {err}", git_dir.display()))?;
        }

        outcome.fetched.push(source.id.as_str().to_string());
    }
    Ok(outcome)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IanaListing {
    pub url: String,
    /// Non-comment, non-empty lines in the registry listing.
    pub entries: usize,
    #[serde(skip)]
    pub text: String,
}

/// Downloads the IANA YANG parameters listing, kept as run evidence and
/// used to spot IANA-maintained modules absent from the corpus.
pub fn fetch_iana(
    network: &dyn Network,
    caps: Capabilities,
    registry: &SourceRegistry,
) -> Result<IanaListing, String> {
    if !caps.network {
        return Err("iana fetch requires --allow-network".to_string());
    }
    let text = network
        .get_text(&registry.iana_url)
        .map_err(|err| err.to_string())?;
    let entries = text
        .lines()
        .filter(|line| !line.trim().is_empty() && !line.trim_start().starts_with('#'))
        .count();
    Ok(IanaListing {
        url: registry.iana_url.clone(),
        entries,
        text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use yangci_adapters::{CapturedOutput, DeniedGit, DeniedNetwork};

    #[test]
    fn default_registry_parses_and_validates() {
        let registry = load_sources(DEFAULT_SOURCES).expect("default sources");
        assert!(validate_sources(&registry).is_empty());
        assert_eq!(registry.sources.len(), 2);
        assert_eq!(registry.sources[0].id.as_str(), "yangmodels");
        assert_eq!(registry.sources[1].clone_as.as_deref(), Some("public"));
        assert!(registry.iana_url.contains("iana.org"));
    }

    #[test]
    fn validation_rejects_bad_pins_and_nesting_order() {
        let mut registry = load_sources(DEFAULT_SOURCES).expect("default sources");
        registry.sources[0].commit = "deadbeef".to_string();
        registry.sources.swap(0, 1);
        let errors = validate_sources(&registry);
        assert!(errors.iter().any(|e| e.contains("40-character")));
        assert!(errors.iter().any(|e| e.contains("fetched later")));
    }

    #[test]
    fn fetch_requires_git_capability() {
        let registry = load_sources(DEFAULT_SOURCES).expect("default sources");
        let err = fetch(
            &DeniedGit,
            Capabilities::from_cli_flags(true, false, false, false),
            Path::new("."),
            &registry,
        )
        .expect_err("must refuse");
        assert!(err.contains("--allow-git"));
    }

    #[test]
    fn iana_fetch_requires_network_capability() {
        let registry = load_sources(DEFAULT_SOURCES).expect("default sources");
        let err = fetch_iana(&DeniedNetwork, Capabilities::deny_all(), &registry)
            .expect_err("must refuse");
        assert!(err.contains("--allow-network"));
    }

    #[test]
    fn provision_tolerates_a_clean_host() {
        struct NothingMatched;
        impl ProcessRunner for NothingMatched {
            fn run(
                &self,
                program: &str,
                _args: &[String],
                _cwd: &Path,
            ) -> Result<CapturedOutput, AdapterError> {
                assert_eq!(program, "pkill");
                Ok(CapturedOutput {
                    code: 1,
                    stdout: String::new(),
                    stderr: String::new(),
                })
            }
        }
        let root = std::env::temp_dir().join(format!(
            "yangci-provision-{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time")
                .as_nanos()
        ));
        let outcome = provision(
            &NothingMatched,
            Capabilities::from_cli_flags(true, true, false, false),
            &root,
            "yang-model-validator",
        )
        .expect("provision");
        assert!(!outcome.killed_stale);
        assert!(outcome.cleaned);
        assert!(root.is_dir());
    }
}
