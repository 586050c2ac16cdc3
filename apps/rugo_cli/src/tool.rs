//! `rugo tool` — install rugo programs into a per-user tool directory.
//!
//! Tools land in `~/.rugo/tools/bin`, named after the script's stem.
//! Putting that directory on PATH makes installed scripts first-class
//! commands.

use rugo_base::{Result, RugoError};
use rugo_compile::BuildOptions;
use std::path::{Path, PathBuf};

pub fn tools_bin_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".rugo")
        .join("tools")
        .join("bin")
}

pub fn install(file: &Path) -> Result<i32> {
    if !rugo_base::is_source_path(file) {
        return Err(RugoError::new(format!(
            "'{}' is not a rugo source file (expected .rugo or .rg)",
            file.display()
        )));
    }
    let name = file
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| RugoError::new(format!("cannot derive a tool name from {}", file.display())))?;
    let dir = tools_bin_dir();
    std::fs::create_dir_all(&dir)?;
    let dest = dir.join(name);
    rugo_compile::build_binary(file, &BuildOptions::default(), Some(&dest))?;
    println!("installed {} -> {}", name, dest.display());
    Ok(0)
}

pub fn list() -> Result<i32> {
    let dir = tools_bin_dir();
    if !dir.is_dir() {
        println!("no tools installed");
        return Ok(0);
    }
    let mut names: Vec<String> = std::fs::read_dir(&dir)?
        .filter_map(|e| e.ok())
        .filter_map(|e| e.file_name().to_str().map(str::to_string))
        .collect();
    names.sort();
    if names.is_empty() {
        println!("no tools installed");
    }
    for name in names {
        println!("{}", name);
    }
    Ok(0)
}

pub fn remove(name: &str) -> Result<i32> {
    let path = tools_bin_dir().join(name);
    if !path.is_file() {
        return Err(RugoError::new(format!("no installed tool named '{}'", name)));
    }
    std::fs::remove_file(&path)?;
    println!("removed {}", name);
    Ok(0)
}
