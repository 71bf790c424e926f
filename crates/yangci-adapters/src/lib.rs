#![forbid(unsafe_code)]

use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::process::Command;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterError {
    EffectDenied {
        effect: &'static str,
        detail: String,
    },
    PathViolation {
        path: PathBuf,
        detail: String,
    },
    Io {
        op: &'static str,
        path: PathBuf,
        detail: String,
    },
    Process {
        program: String,
        detail: String,
    },
    Git {
        detail: String,
    },
    Network {
        detail: String,
    },
}

impl fmt::Display for AdapterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EffectDenied { effect, detail } => {
                write!(f, "effect denied: {effect} ({detail})")
            }
            Self::PathViolation { path, detail } => {
                write!(f, "path violation: {} ({detail})", path.display())
            }
            Self::Io { op, path, detail } => {
                write!(f, "io error: {op} {} ({detail})", path.display())
            }
            Self::Process { program, detail } => write!(f, "process error: {program} ({detail})"),
            Self::Git { detail } => write!(f, "git error: {detail}"),
            Self::Network { detail } => write!(f, "network error: {detail}"),
        }
    }
}

impl std::error::Error for AdapterError {}

/// Exit code plus captured text of a finished subprocess. The classifier
/// scans both streams, so the runner keeps them separate but offers the
/// concatenation too.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CapturedOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }

    pub fn combined(&self) -> String {
        if self.stderr.is_empty() {
            return self.stdout.clone();
        }
        if self.stdout.is_empty() {
            return self.stderr.clone();
        }
        format!("{}\n{}", self.stdout, self.stderr)
    }
}

pub trait Fs {
    fn read_text(&self, root: &Path, path: &Path) -> Result<String, AdapterError>;
    fn exists(&self, root: &Path, path: &Path) -> bool;
    fn canonicalize(&self, root: &Path, path: &Path) -> Result<PathBuf, AdapterError>;
}

pub trait FsWrite {
    fn write_text(
        &self,
        logs_root: &Path,
        run_id: &str,
        path: &Path,
        content: &str,
    ) -> Result<PathBuf, AdapterError>;
}

pub trait ProcessRunner {
    fn run(&self, program: &str, args: &[String], cwd: &Path)
        -> Result<CapturedOutput, AdapterError>;
}

pub trait Git {
    /// Blobless clone into `dest` without checking the work tree out.
    fn clone_blobless(&self, url: &str, dest: &Path) -> Result<(), AdapterError>;
    /// Creates a work branch at the pinned commit.
    fn checkout_pinned(&self, repo: &Path, branch: &str, commit: &str) -> Result<(), AdapterError>;
}

pub trait Network {
    fn get_text(&self, url: &str) -> Result<String, AdapterError>;
}

pub fn canonicalize_from_root(root: &Path, path: &Path) -> Result<PathBuf, AdapterError> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    };
    joined.canonicalize().map_err(|err| AdapterError::Io {
        op: "canonicalize",
        path: joined,
        detail: err.to_string(),
    })
}

/// Writes are confined to the run's own log directory. Category files, per
/// file validator logs, and the report all land under
/// `<logs_root>/<run_id>/`; anything else is a violation.
pub fn ensure_write_path_under_run_logs(
    logs_root: &Path,
    run_id: &str,
    target: &Path,
) -> Result<PathBuf, AdapterError> {
    let write_root = logs_root.join(run_id);
    fs::create_dir_all(&write_root).map_err(|err| AdapterError::Io {
        op: "create_dir_all",
        path: write_root.clone(),
        detail: err.to_string(),
    })?;

    let absolute_target = if target.is_absolute() {
        target.to_path_buf()
    } else {
        write_root.join(target)
    };

    if let Some(parent) = absolute_target.parent() {
        fs::create_dir_all(parent).map_err(|err| AdapterError::Io {
            op: "create_dir_all",
            path: parent.to_path_buf(),
            detail: err.to_string(),
        })?;
    }

    let normalized_root = normalize_path(&write_root);
    let normalized_target = normalize_path(&absolute_target);

    if !normalized_target.starts_with(&normalized_root) {
        return Err(AdapterError::PathViolation {
            path: absolute_target,
            detail: format!("writes allowed only under {}", normalized_root.display()),
        });
    }
    Ok(absolute_target)
}

fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[derive(Debug, Default)]
pub struct RealFs;

impl Fs for RealFs {
    fn read_text(&self, root: &Path, path: &Path) -> Result<String, AdapterError> {
        let target = canonicalize_from_root(root, path)?;
        fs::read_to_string(&target).map_err(|err| AdapterError::Io {
            op: "read_to_string",
            path: target,
            detail: err.to_string(),
        })
    }

    fn exists(&self, root: &Path, path: &Path) -> bool {
        let target = if path.is_absolute() {
            path.to_path_buf()
        } else {
            root.join(path)
        };
        target.exists()
    }

    fn canonicalize(&self, root: &Path, path: &Path) -> Result<PathBuf, AdapterError> {
        canonicalize_from_root(root, path)
    }
}

impl FsWrite for RealFs {
    fn write_text(
        &self,
        logs_root: &Path,
        run_id: &str,
        path: &Path,
        content: &str,
    ) -> Result<PathBuf, AdapterError> {
        let target = ensure_write_path_under_run_logs(logs_root, run_id, path)?;
        fs::write(&target, content).map_err(|err| AdapterError::Io {
            op: "write",
            path: target.clone(),
            detail: err.to_string(),
        })?;
        Ok(target)
    }
}

#[derive(Debug, Default)]
pub struct RealProcessRunner;

impl ProcessRunner for RealProcessRunner {
    fn run(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
    ) -> Result<CapturedOutput, AdapterError> {
        let output = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .output()
            .map_err(|err| AdapterError::Process {
                program: program.to_string(),
                detail: err.to_string(),
            })?;
        Ok(CapturedOutput {
            code: output.status.code().unwrap_or(1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// Runs every command on a remote test host by wrapping it in `ssh`. The
/// transport itself stays external; this only builds the remote command
/// line. The working directory is applied with a `cd` on the remote side
/// because `current_dir` would act on the local ssh client.
#[derive(Debug)]
pub struct SshRunner<R> {
    inner: R,
    target: String,
}

impl<R> SshRunner<R> {
    pub fn new(inner: R, host: &str, user: Option<&str>) -> Self {
        let target = match user {
            Some(user) => format!("{user}@{host}"),
            None => host.to_string(),
        };
        Self { inner, target }
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

fn shell_quote(word: &str) -> String {
    if !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:@".contains(c))
    {
        return word.to_string();
    }
    format!("'{}'", word.replace('\'', "'\\''"))
}

impl<R: ProcessRunner> ProcessRunner for SshRunner<R> {
    fn run(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
    ) -> Result<CapturedOutput, AdapterError> {
        let mut remote = format!("cd {} && {}", shell_quote(&cwd.display().to_string()), shell_quote(program));
        for arg in args {
            remote.push(' ');
            remote.push_str(&shell_quote(arg));
        }
        self.inner.run(
            "ssh",
            &[
                "-o".to_string(),
                "BatchMode=yes".to_string(),
                self.target.clone(),
                remote,
            ],
            Path::new("."),
        )
    }
}

#[derive(Debug, Default)]
pub struct RealGit;

impl RealGit {
    fn git(&self, args: &[&str], cwd: &Path) -> Result<(), AdapterError> {
        let output = Command::new("git")
            .args(args)
            .current_dir(cwd)
            .output()
            .map_err(|err| AdapterError::Git {
                detail: err.to_string(),
            })?;
        if !output.status.success() {
            return Err(AdapterError::Git {
                detail: format!(
                    "git {} exited with {}: {}",
                    args.first().copied().unwrap_or_default(),
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }
        Ok(())
    }
}

impl Git for RealGit {
    fn clone_blobless(&self, url: &str, dest: &Path) -> Result<(), AdapterError> {
        let parent = dest.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent).map_err(|err| AdapterError::Io {
            op: "create_dir_all",
            path: parent.to_path_buf(),
            detail: err.to_string(),
        })?;
        let dest_text = dest.display().to_string();
        self.git(
            &[
                "clone",
                "--filter=blob:none",
                "--no-checkout",
                url,
                &dest_text,
            ],
            parent,
        )
    }

    fn checkout_pinned(&self, repo: &Path, branch: &str, commit: &str) -> Result<(), AdapterError> {
        self.git(&["checkout", "-b", branch, commit], repo)
    }
}

/// Fetches a URL by shelling out to curl. HTTP/FTP are external transports
/// here, consumed through a process boundary like every other collaborator.
#[derive(Debug, Default)]
pub struct CurlNetwork;

impl Network for CurlNetwork {
    fn get_text(&self, url: &str) -> Result<String, AdapterError> {
        let output = Command::new("curl")
            .args(["-fsSL", url])
            .output()
            .map_err(|err| AdapterError::Network {
                detail: err.to_string(),
            })?;
        if !output.status.success() {
            return Err(AdapterError::Network {
                detail: format!(
                    "curl {url} exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }
        String::from_utf8(output.stdout).map_err(|err| AdapterError::Network {
            detail: err.to_string(),
        })
    }
}

#[derive(Debug, Default)]
pub struct DeniedProcessRunner;

impl ProcessRunner for DeniedProcessRunner {
    fn run(
        &self,
        program: &str,
        _args: &[String],
        _cwd: &Path,
    ) -> Result<CapturedOutput, AdapterError> {
        Err(AdapterError::EffectDenied {
            effect: "subprocess",
            detail: format!("attempted to execute `{program}`"),
        })
    }
}

#[derive(Debug, Default)]
pub struct DeniedGit;

impl Git for DeniedGit {
    fn clone_blobless(&self, url: &str, _dest: &Path) -> Result<(), AdapterError> {
        Err(AdapterError::EffectDenied {
            effect: "git",
            detail: format!("attempted to clone `{url}`"),
        })
    }

    fn checkout_pinned(
        &self,
        _repo: &Path,
        _branch: &str,
        commit: &str,
    ) -> Result<(), AdapterError> {
        Err(AdapterError::EffectDenied {
            effect: "git",
            detail: format!("attempted to checkout `{commit}`"),
        })
    }
}

#[derive(Debug, Default)]
pub struct DeniedNetwork;

impl Network for DeniedNetwork {
    fn get_text(&self, url: &str) -> Result<String, AdapterError> {
        Err(AdapterError::EffectDenied {
            effect: "network",
            detail: format!("attempted to fetch `{url}`"),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub fs_write: bool,
    pub subprocess: bool,
    pub git: bool,
    pub network: bool,
}

impl Capabilities {
    pub fn deny_all() -> Self {
        Self {
            fs_write: false,
            subprocess: false,
            git: false,
            network: false,
        }
    }

    pub fn from_cli_flags(
        allow_fs_write: bool,
        allow_subprocess: bool,
        allow_git: bool,
        allow_network: bool,
    ) -> Self {
        Self {
            fs_write: allow_fs_write,
            subprocess: allow_subprocess,
            git: allow_git,
            network: allow_network,
        }
    }
}
