//! `rugo mod` — lockfile maintenance.
//!
//! Both subcommands operate on the project in the current directory: the
//! entry file is `main.rugo`, or the sole `.rugo` file. `tidy` resolves
//! the remote modules the program actually requires and prunes the rest
//! from the lockfile; `update` re-fetches branch-pinned modules and
//! rewrites their pins.

use rugo_base::{Result, RugoError};
use rugo_compile::{BuildOptions, Lockfile, LOCKFILE_NAME};
use std::path::{Path, PathBuf};

/// Entry file of the project in `dir`: `main.rugo` (or the legacy
/// `main.rg`), else the sole source file.
fn project_entry(dir: &Path) -> Result<PathBuf> {
    for ext in rugo_base::SOURCE_EXTENSIONS {
        let main = dir.join(format!("main.{}", ext));
        if main.is_file() {
            return Ok(main);
        }
    }
    let mut rugo_files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| rugo_base::is_source_path(p))
        .collect();
    rugo_files.sort();
    match rugo_files.as_slice() {
        [sole] => Ok(sole.clone()),
        [] => Err(RugoError::new("no rugo source files in the current directory")),
        _ => Err(RugoError::new(
            "multiple source files; create a main.rugo entry point",
        )),
    }
}

/// Remote module specs mentioned by a source tree, found textually so
/// tidy works even when the modules are not fetched yet.
fn remote_requires(entry: &Path) -> Result<Vec<String>> {
    let src = std::fs::read_to_string(entry)?;
    let mut modules = Vec::new();
    for line in src.lines() {
        let trimmed = line.trim_start();
        let Some(rest) = trimmed.strip_prefix("require ") else {
            continue;
        };
        let Some(spec) = rest.trim().strip_prefix('"').and_then(|r| r.split('"').next()) else {
            continue;
        };
        if let Some(remote) = rugo_compile::fetch::parse_remote(spec) {
            modules.push(remote.module());
        }
    }
    Ok(modules)
}

pub fn tidy() -> Result<i32> {
    let cwd = std::env::current_dir()?;
    let entry = project_entry(&cwd)?;
    let keep = remote_requires(&entry)?;
    let lock_path = cwd.join(LOCKFILE_NAME);
    let mut lockfile = Lockfile::load(&lock_path)?;
    let pruned = lockfile.tidy(&keep);
    if lockfile.dirty {
        lockfile.save(&lock_path)?;
    }
    println!("pruned {} entr{}", pruned, if pruned == 1 { "y" } else { "ies" });
    Ok(0)
}

pub fn update() -> Result<i32> {
    let cwd = std::env::current_dir()?;
    let entry = project_entry(&cwd)?;
    let opts = BuildOptions {
        update: true,
        ..Default::default()
    };
    // Resolution re-fetches branch refs and rewrites the lockfile.
    rugo_compile::compile_entry(&entry, &opts)?;
    println!("updated remote modules");
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn remote_requires_found_textually() {
        let tmp = tempfile::tempdir().unwrap();
        let entry = tmp.path().join("main.rugo");
        fs::write(
            &entry,
            "require \"github.com/acme/tools@v1\"\nrequire \"lib/local\"\n",
        )
        .unwrap();
        let modules = remote_requires(&entry).unwrap();
        assert_eq!(modules, vec!["github.com/acme/tools"]);
    }

    #[test]
    fn project_entry_prefers_main() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("main.rugo"), "").unwrap();
        fs::write(tmp.path().join("other.rugo"), "").unwrap();
        assert_eq!(
            project_entry(tmp.path()).unwrap(),
            tmp.path().join("main.rugo")
        );
    }
}
