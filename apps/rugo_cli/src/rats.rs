//! The `rats` test runner and the `bench` runner.
//!
//! Discovery walks a file or directory for `.rugo` files containing
//! `rats` blocks. Each file compiles in test mode — its emitted `main`
//! runs every block under a recover and prints TAP lines — and the
//! runner aggregates results across files. Filtering happens inside the
//! emitted program (Go's regexp, via `RUGO_RATS_FILTER`), so `--filter`
//! accepts full regular expressions without the runner needing one.

use rugo_base::{Result, RugoError};
use rugo_compile::{BuildOptions, EmitMode};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub struct RatsOptions {
    pub filter: Option<String>,
    pub jobs: usize,
    pub tap: bool,
    pub timing: bool,
}

#[derive(Debug, Default)]
struct FileResult {
    file: PathBuf,
    passed: usize,
    failed: usize,
    output: String,
}

pub fn run_rats(path: PathBuf, opts: RatsOptions) -> Result<i32> {
    let files = discover(&path, "rats")?;
    if files.is_empty() {
        println!("no rats blocks found under {}", path.display());
        return Ok(0);
    }

    let next = AtomicUsize::new(0);
    let results: Mutex<Vec<FileResult>> = Mutex::new(Vec::new());
    let failed_to_build: Mutex<Vec<(PathBuf, RugoError)>> = Mutex::new(Vec::new());

    std::thread::scope(|scope| {
        for _ in 0..opts.jobs.min(files.len()) {
            scope.spawn(|| loop {
                let i = next.fetch_add(1, Ordering::SeqCst);
                let Some(file) = files.get(i) else { break };
                match run_one(file, &opts) {
                    Ok(result) => results.lock().expect("runner lock").push(result),
                    Err(err) => failed_to_build
                        .lock()
                        .expect("runner lock")
                        .push((file.clone(), err)),
                }
            });
        }
    });

    let mut results = results.into_inner().expect("runner lock");
    results.sort_by(|a, b| a.file.cmp(&b.file));
    let build_errors = failed_to_build.into_inner().expect("runner lock");

    let mut passed = 0;
    let mut failed = 0;
    for result in &results {
        if opts.tap {
            print!("{}", result.output);
        } else {
            for line in result.output.lines() {
                if line.starts_with("not ok") || opts.timing && line.starts_with('#') {
                    println!("{}: {}", result.file.display(), line);
                }
            }
        }
        passed += result.passed;
        failed += result.failed;
    }
    for (file, err) in &build_errors {
        eprintln!("{}: {}", file.display(), err);
    }

    if !opts.tap {
        println!(
            "rats: {} passed, {} failed across {} file(s)",
            passed,
            failed,
            results.len()
        );
    }
    if failed > 0 || !build_errors.is_empty() {
        Ok(1)
    } else {
        Ok(0)
    }
}

fn run_one(file: &Path, opts: &RatsOptions) -> Result<FileResult> {
    let build_opts = BuildOptions {
        mode: EmitMode::Rats,
        ..Default::default()
    };
    let bin = rugo_compile::build_binary(
        file,
        &build_opts,
        Some(&rugo_compile::compile::build_dir_for(file).join("rats_bin")),
    )?;
    let mut cmd = Command::new(&bin);
    if let Some(filter) = &opts.filter {
        cmd.env("RUGO_RATS_FILTER", filter);
    }
    if opts.timing {
        cmd.env("RUGO_RATS_TIMING", "1");
    }
    let output = cmd
        .output()
        .map_err(|e| RugoError::new(format!("cannot run {}: {}", bin.display(), e)))?;
    let text = String::from_utf8_lossy(&output.stdout).to_string();
    let passed = text
        .lines()
        .filter(|l| l.starts_with("ok ") && !l.contains("# SKIP"))
        .count();
    let failed = text.lines().filter(|l| l.starts_with("not ok")).count();
    Ok(FileResult {
        file: file.to_path_buf(),
        passed,
        failed,
        output: text,
    })
}

pub fn run_bench(path: PathBuf) -> Result<i32> {
    let files = discover(&path, "bench")?;
    if files.is_empty() {
        println!("no bench blocks found under {}", path.display());
        return Ok(0);
    }
    for file in files {
        let build_opts = BuildOptions {
            mode: EmitMode::Bench,
            ..Default::default()
        };
        let bin = rugo_compile::build_binary(
            &file,
            &build_opts,
            Some(&rugo_compile::compile::build_dir_for(&file).join("bench_bin")),
        )?;
        let status = Command::new(&bin)
            .status()
            .map_err(|e| RugoError::new(format!("cannot run {}: {}", bin.display(), e)))?;
        if !status.success() {
            return Ok(1);
        }
    }
    Ok(0)
}

/// Finds `.rugo` files containing a block of the given keyword.
fn discover(path: &Path, keyword: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    collect_rugo_files(path, &mut files)?;
    files.retain(|f| {
        std::fs::read_to_string(f)
            .map(|src| {
                src.lines().any(|l| {
                    let t = l.trim_start();
                    t.starts_with(keyword)
                        && t[keyword.len()..]
                            .chars()
                            .next()
                            .map_or(true, |c| c == ' ' || c == '"')
                })
            })
            .unwrap_or(false)
    });
    files.sort();
    Ok(files)
}

fn collect_rugo_files(path: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    if path.is_file() {
        if rugo_base::is_source_path(path) {
            out.push(path.to_path_buf());
        }
        return Ok(());
    }
    if !path.is_dir() {
        return Err(RugoError::new(format!(
            "no such file or directory: {}",
            path.display()
        )));
    }
    let mut entries: Vec<PathBuf> = std::fs::read_dir(path)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .collect();
    entries.sort();
    for entry in entries {
        let name = entry
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        if name.starts_with('.') || name == "target" {
            continue;
        }
        if entry.is_dir() {
            collect_rugo_files(&entry, out)?;
        } else if rugo_base::is_source_path(&entry) {
            out.push(entry);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn discovery_finds_rats_files_recursively() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("sub")).unwrap();
        fs::write(
            tmp.path().join("a_test.rugo"),
            "rats \"adds\"\n  puts 1\nend\n",
        )
        .unwrap();
        fs::write(tmp.path().join("sub/b.rugo"), "rats \"subs\"\nend\n").unwrap();
        fs::write(tmp.path().join("plain.rugo"), "puts 1\n").unwrap();
        let files = discover(tmp.path(), "rats").unwrap();
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn discovery_ignores_rats_prefixed_words() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("a.rugo"), "ratsnest = 1\n").unwrap();
        let files = discover(tmp.path(), "rats").unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn discovery_accepts_legacy_extension() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("old.rg"), "rats \"legacy\"\nend\n").unwrap();
        let files = discover(tmp.path(), "rats").unwrap();
        assert_eq!(files, vec![tmp.path().join("old.rg")]);
    }
}
