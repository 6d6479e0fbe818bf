//! Purpose: Ignore-file predicate resolved through the environment store.
//! Exports: `is_ignored`, `IgnoreFile`.
//! Invariants: Pattern files are consulted from the outermost ancestor down to
//! the file's own directory; within that order the last matching rule wins.

use std::fs;
use std::path::{Path, PathBuf};

use glob::Pattern;

use crate::core::env::{EnvStore, VC_IGNORE};

#[derive(Debug)]
struct Rule {
    negated: bool,
    pattern: Pattern,
}

/// One parsed ignore file: glob patterns, one per line, `#` comments, `!`
/// negation prefix.
#[derive(Debug)]
pub struct IgnoreFile {
    dir: PathBuf,
    rules: Vec<Rule>,
}

impl IgnoreFile {
    pub fn load(path: &Path) -> Option<Self> {
        let text = fs::read_to_string(path).ok()?;
        let dir = path.parent().unwrap_or(Path::new("")).to_path_buf();
        let mut rules = Vec::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (negated, body) = match line.strip_prefix('!') {
                Some(rest) => (true, rest.trim()),
                None => (false, line),
            };
            match Pattern::new(body) {
                Ok(pattern) => rules.push(Rule { negated, pattern }),
                Err(err) => {
                    tracing::debug!(pattern = body, %err, "skipping unparsable ignore pattern");
                }
            }
        }
        Some(Self { dir, rules })
    }

    /// Verdict of this file's rules for `path`, or `None` when nothing matches.
    pub fn verdict(&self, path: &Path) -> Option<bool> {
        let relative = path.strip_prefix(&self.dir).unwrap_or(path);
        let name = path.file_name().map(Path::new);
        let mut verdict = None;
        for rule in &self.rules {
            let hit = rule.pattern.matches_path(relative)
                || name.is_some_and(|n| rule.pattern.matches_path(n));
            if hit {
                verdict = Some(!rule.negated);
            }
        }
        verdict
    }
}

/// Whether `path` matches the ignore patterns named by `VCIGNORE`, resolved
/// through the store's three-tier precedence. Missing configuration or files
/// mean nothing is ignored.
pub fn is_ignored(env: &EnvStore, path: &Path) -> bool {
    let Some(name) = env.get(VC_IGNORE) else {
        return false;
    };
    if name.is_empty() {
        return false;
    }

    let files = ignore_files(&name, path);
    let mut verdict = false;
    for file in &files {
        if let Some(decision) = file.verdict(path) {
            verdict = decision;
        }
    }
    verdict
}

/// Ignore files that govern `path`: an absolute `VCIGNORE` names one file;
/// otherwise every ancestor directory of `path` may carry one, applied
/// outermost first so closer files override.
fn ignore_files(name: &str, path: &Path) -> Vec<IgnoreFile> {
    let name_path = Path::new(name);
    if name_path.is_absolute() {
        return IgnoreFile::load(name_path).into_iter().collect();
    }
    let mut dirs: Vec<&Path> = path.ancestors().skip(1).collect();
    dirs.reverse();
    dirs.iter()
        .filter_map(|dir| IgnoreFile::load(&dir.join(name_path)))
        .collect()
}
