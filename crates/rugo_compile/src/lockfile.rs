//! The line-oriented lockfile pinning remote modules.
//!
//! One line per remote module: `<module-path> <ref-label> <40-hex-sha>`.
//! Comment lines begin with `#`. The file lives next to the entry file as
//! `rugo.lock`; `--frozen` builds require every remote module to appear
//! here, and `mod tidy` prunes entries that are no longer required.

use rugo_base::{Result, RugoError};
use std::collections::BTreeMap;
use std::path::Path;

pub const LOCKFILE_NAME: &str = "rugo.lock";

/// A pinned remote module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockEntry {
    /// Ref label the user asked for (`main`, `v1.2.0`, or `HEAD`).
    pub label: String,
    /// Resolved commit.
    pub sha: String,
}

#[derive(Debug, Clone, Default)]
pub struct Lockfile {
    entries: BTreeMap<String, LockEntry>,
    pub dirty: bool,
}

impl Lockfile {
    /// Loads the lockfile, tolerating a missing file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text, &path.display().to_string())
    }

    pub fn parse(text: &str, origin: &str) -> Result<Self> {
        let mut entries = BTreeMap::new();
        for (i, line) in text.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let parts: Vec<&str> = trimmed.split_whitespace().collect();
            if parts.len() != 3 {
                return Err(RugoError::at(
                    format!("malformed lockfile line: {}", trimmed),
                    origin,
                    i as u32 + 1,
                ));
            }
            let sha = parts[2];
            if sha.len() != 40 || !sha.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(RugoError::at(
                    format!("'{}' is not a commit sha", sha),
                    origin,
                    i as u32 + 1,
                ));
            }
            entries.insert(
                parts[0].to_string(),
                LockEntry {
                    label: parts[1].to_string(),
                    sha: sha.to_string(),
                },
            );
        }
        Ok(Self {
            entries,
            dirty: false,
        })
    }

    pub fn get(&self, module: &str) -> Option<&LockEntry> {
        self.entries.get(module)
    }

    pub fn pin(&mut self, module: &str, label: &str, sha: &str) {
        let entry = LockEntry {
            label: label.to_string(),
            sha: sha.to_string(),
        };
        if self.entries.get(module) != Some(&entry) {
            self.entries.insert(module.to_string(), entry);
            self.dirty = true;
        }
    }

    /// Drops entries not in `keep`; returns how many were pruned.
    pub fn tidy(&mut self, keep: &[String]) -> usize {
        let before = self.entries.len();
        self.entries.retain(|module, _| keep.contains(module));
        let pruned = before - self.entries.len();
        if pruned > 0 {
            self.dirty = true;
        }
        pruned
    }

    pub fn modules(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn render(&self) -> String {
        let mut out = String::from("# rugo lockfile: <module> <ref> <commit>\n");
        for (module, entry) in &self.entries {
            out.push_str(&format!("{} {} {}\n", module, entry.label, entry.sha));
        }
        out
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.render())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHA: &str = "0123456789abcdef0123456789abcdef01234567";

    #[test]
    fn parse_and_render_round_trip() {
        let text = format!(
            "# comment\ngithub.com/acme/tools main {}\n",
            SHA
        );
        let lock = Lockfile::parse(&text, "rugo.lock").unwrap();
        let entry = lock.get("github.com/acme/tools").unwrap();
        assert_eq!(entry.label, "main");
        assert_eq!(entry.sha, SHA);
        let rendered = lock.render();
        assert!(rendered.contains(&format!("github.com/acme/tools main {}", SHA)));
    }

    #[test]
    fn malformed_lines_rejected() {
        assert!(Lockfile::parse("too few", "l").is_err());
        assert!(Lockfile::parse("a b notasha", "l").is_err());
    }

    #[test]
    fn pin_marks_dirty_only_on_change() {
        let mut lock = Lockfile::default();
        lock.pin("m", "main", SHA);
        assert!(lock.dirty);
        lock.dirty = false;
        lock.pin("m", "main", SHA);
        assert!(!lock.dirty);
    }

    #[test]
    fn tidy_prunes_unused() {
        let mut lock = Lockfile::default();
        lock.pin("keep/me", "main", SHA);
        lock.pin("drop/me", "main", SHA);
        let pruned = lock.tidy(&["keep/me".to_string()]);
        assert_eq!(pruned, 1);
        assert!(lock.get("drop/me").is_none());
    }
}
