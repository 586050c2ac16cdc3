//! Remote module fetching via the `git` CLI.
//!
//! A remote-shaped require path looks like `host/user/repo[/subpath][@ref]`
//! — the host must contain a dot, which is what distinguishes it from a
//! local relative path. Immutable refs (tags, full commit shas) are
//! cached forever; branch refs are re-fetched on `mod update`. Every
//! fetch is recorded in the lockfile; `--frozen` builds refuse to touch
//! the network and fail on any module missing from it.
//!
//! The cache lives in `$RUGO_MOD_CACHE`, defaulting to `~/.rugo/mod`.

use crate::lockfile::Lockfile;
use rugo_base::{Result, RugoError};
use std::path::{Path, PathBuf};
use std::process::Command;

/// A parsed remote require target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSpec {
    /// Repository part (`github.com/acme/tools`).
    pub repo: String,
    /// Optional path inside the repository.
    pub subpath: Option<String>,
    /// Requested ref (`@v1.2.0`, `@main`, `@<sha>`), if any.
    pub reference: Option<String>,
}

impl RemoteSpec {
    /// Module path used as the lockfile key.
    pub fn module(&self) -> String {
        match &self.subpath {
            Some(sub) => format!("{}/{}", self.repo, sub),
            None => self.repo.clone(),
        }
    }
}

/// Parses `host/user/repo[/sub][@ref]`; `None` for local paths.
pub fn parse_remote(spec: &str) -> Option<RemoteSpec> {
    let (path, reference) = match spec.split_once('@') {
        Some((p, r)) => (p, Some(r.to_string())),
        None => (spec, None),
    };
    let segments: Vec<&str> = path.split('/').collect();
    if segments.len() < 3 || !segments[0].contains('.') {
        return None;
    }
    let repo = segments[..3].join("/");
    let subpath = if segments.len() > 3 {
        Some(segments[3..].join("/"))
    } else {
        None
    };
    Some(RemoteSpec {
        repo,
        subpath,
        reference,
    })
}

/// Cache root: `$RUGO_MOD_CACHE` or `~/.rugo/mod`.
pub fn cache_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("RUGO_MOD_CACHE") {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".rugo")
        .join("mod")
}

/// A ref that can never move: a full sha or a `vN...` tag.
pub fn is_immutable_ref(reference: &str) -> bool {
    if reference.len() == 40 && reference.bytes().all(|b| b.is_ascii_hexdigit()) {
        return true;
    }
    reference.starts_with('v')
        && reference[1..].starts_with(|c: char| c.is_ascii_digit())
}

/// Fetches (or reuses) a remote module; returns the local directory the
/// require resolves into, plus the label and commit recorded in the
/// lockfile.
pub fn fetch_remote(
    spec: &RemoteSpec,
    lockfile: &mut Lockfile,
    frozen: bool,
    update: bool,
) -> Result<(PathBuf, String, String)> {
    let module = spec.module();
    let label = spec.reference.clone().unwrap_or_else(|| "HEAD".to_string());
    let checkout = cache_dir().join(spec.repo.replace('/', std::path::MAIN_SEPARATOR_STR));

    if frozen {
        let entry = lockfile.get(&module).ok_or_else(|| {
            RugoError::new(format!(
                "--frozen: module {} is not pinned in {}",
                module,
                crate::lockfile::LOCKFILE_NAME
            ))
        })?;
        let sha = entry.sha.clone();
        let label = entry.label.clone();
        if !checkout.is_dir() {
            clone_repo(&spec.repo, &checkout)?;
        }
        git_checkout(&checkout, &sha)?;
        return Ok((subdir(&checkout, spec), label, sha));
    }

    let reuse = checkout.is_dir()
        && !update
        && spec
            .reference
            .as_deref()
            .map(is_immutable_ref)
            .unwrap_or(false)
        && lockfile.get(&module).is_some();
    if reuse {
        let entry = lockfile.get(&module).expect("checked above");
        return Ok((subdir(&checkout, spec), entry.label.clone(), entry.sha.clone()));
    }

    if checkout.is_dir() {
        std::fs::remove_dir_all(&checkout)?;
    }
    clone_repo(&spec.repo, &checkout)?;
    if let Some(reference) = &spec.reference {
        git_checkout(&checkout, reference)?;
    }
    let sha = git_head_sha(&checkout)?;
    lockfile.pin(&module, &label, &sha);
    log::debug!("fetched {} at {} ({})", module, label, sha);
    Ok((subdir(&checkout, spec), label, sha))
}

fn subdir(checkout: &Path, spec: &RemoteSpec) -> PathBuf {
    match &spec.subpath {
        Some(sub) => checkout.join(sub),
        None => checkout.to_path_buf(),
    }
}

fn clone_repo(repo: &str, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let url = format!("https://{}", repo);
    let output = Command::new("git")
        .args(["clone", "--quiet", &url])
        .arg(dest)
        .output()
        .map_err(|e| RugoError::new(format!("cannot run git: {}", e)))?;
    if !output.status.success() {
        return Err(RugoError::new(format!(
            "git clone {} failed: {}",
            url,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(())
}

fn git_checkout(dir: &Path, reference: &str) -> Result<()> {
    let output = Command::new("git")
        .args(["-C"])
        .arg(dir)
        .args(["checkout", "--quiet", reference])
        .output()
        .map_err(|e| RugoError::new(format!("cannot run git: {}", e)))?;
    if !output.status.success() {
        return Err(RugoError::new(format!(
            "git checkout {} failed: {}",
            reference,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(())
}

fn git_head_sha(dir: &Path) -> Result<String> {
    let output = Command::new("git")
        .args(["-C"])
        .arg(dir)
        .args(["rev-parse", "HEAD"])
        .output()
        .map_err(|e| RugoError::new(format!("cannot run git: {}", e)))?;
    if !output.status.success() {
        return Err(RugoError::new("git rev-parse HEAD failed"));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_shapes_parse() {
        let spec = parse_remote("github.com/acme/tools").unwrap();
        assert_eq!(spec.repo, "github.com/acme/tools");
        assert_eq!(spec.subpath, None);
        assert_eq!(spec.reference, None);

        let spec = parse_remote("github.com/acme/tools/text@v1.2.0").unwrap();
        assert_eq!(spec.repo, "github.com/acme/tools");
        assert_eq!(spec.subpath.as_deref(), Some("text"));
        assert_eq!(spec.reference.as_deref(), Some("v1.2.0"));
        assert_eq!(spec.module(), "github.com/acme/tools/text");
    }

    #[test]
    fn local_paths_are_not_remote() {
        assert!(parse_remote("lib/util").is_none());
        assert!(parse_remote("./tools").is_none());
        assert!(parse_remote("nodots/a/b").is_none());
    }

    #[test]
    fn immutable_refs() {
        assert!(is_immutable_ref("v1.0.0"));
        assert!(is_immutable_ref("0123456789abcdef0123456789abcdef01234567"));
        assert!(!is_immutable_ref("main"));
        assert!(!is_immutable_ref("vnext"));
    }

    #[test]
    fn frozen_without_lock_entry_fails() {
        let spec = parse_remote("github.com/acme/tools@main").unwrap();
        let mut lock = Lockfile::default();
        let err = fetch_remote(&spec, &mut lock, true, false).unwrap_err();
        assert!(err.to_string().contains("--frozen"));
        assert!(err.to_string().contains("github.com/acme/tools"));
    }

    #[test]
    fn cache_dir_honors_env() {
        // Serialized by cargo's per-test process isolation being absent:
        // set and unset within one test only.
        std::env::set_var("RUGO_MOD_CACHE", "/tmp/rugo-test-cache");
        assert_eq!(cache_dir(), PathBuf::from("/tmp/rugo-test-cache"));
        std::env::remove_var("RUGO_MOD_CACHE");
    }
}
