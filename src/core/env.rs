//! Purpose: Process-wide environment-style configuration with three-tier precedence.
//! Exports: `EnvStore` and the well-known `VC_*` keys.
//! Invariants: Lookup order is in-process overrides, then the OS environment,
//! then the persisted store file; `update` values never survive `reload`.
//! Invariants: `set` writes the persisted tier and invalidates any override
//! for that key, so the persisted value becomes visible (modulo OS env).

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::{Deserialize, Serialize};

use crate::core::error::{Error, ErrorKind};

pub const VC_PORT: &str = "VCPORT";
pub const VC_USER: &str = "VCUSER";
pub const VC_PASSWD: &str = "VCPASSWD";
pub const VC_CLIENT: &str = "VCCLIENT";
pub const VC_CHARSET: &str = "VCCHARSET";
pub const VC_IGNORE: &str = "VCIGNORE";
pub const VC_CONFIG: &str = "VCCONFIG";

/// On-disk form of the persisted tier.
#[derive(Debug, Default, Deserialize, Serialize)]
struct PersistedEnv {
    #[serde(default)]
    entries: HashMap<String, String>,
}

/// String-keyed configuration store external to any session handle.
#[derive(Debug)]
pub struct EnvStore {
    overrides: HashMap<String, String>,
    file: PathBuf,
}

impl EnvStore {
    pub fn new() -> Self {
        Self::with_file(default_store_path())
    }

    /// Use an explicit persisted-store file; tests point this at a temp dir.
    pub fn with_file(file: impl Into<PathBuf>) -> Self {
        Self {
            overrides: HashMap::new(),
            file: file.into(),
        }
    }

    pub fn store_path(&self) -> &Path {
        &self.file
    }

    /// Three-tier lookup: override, OS environment, persisted store.
    pub fn get(&self, key: &str) -> Option<String> {
        if let Some(value) = self.overrides.get(key) {
            return Some(value.clone());
        }
        if let Ok(value) = std::env::var(key) {
            return Some(value);
        }
        self.load_persisted().ok()?.remove(key)
    }

    /// Persist `value` under `key` and drop any in-process override for it.
    /// An empty value unsets the persisted entry.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), Error> {
        let mut persisted = self.load_persisted()?;
        if value.is_empty() {
            persisted.remove(key);
        } else {
            persisted.insert(key.to_string(), value.to_string());
        }
        self.write_persisted(&persisted)?;
        self.overrides.remove(key);
        Ok(())
    }

    /// Stage an in-process override; highest precedence until `reload`.
    /// An empty value removes the override.
    pub fn update(&mut self, key: &str, value: &str) {
        if value.is_empty() {
            self.overrides.remove(key);
        } else {
            self.overrides
                .insert(key.to_string(), value.to_string());
        }
    }

    /// Discard all in-process overrides, reverting to environment and
    /// persisted values.
    pub fn reload(&mut self) {
        self.overrides.clear();
    }

    /// Merged view of the persisted tier with overrides applied, sorted by key.
    /// The OS environment is deliberately not enumerated here.
    pub fn list(&self) -> Vec<(String, String)> {
        let mut merged = self.load_persisted().unwrap_or_default();
        for (key, value) in &self.overrides {
            merged.insert(key.clone(), value.clone());
        }
        let mut entries: Vec<_> = merged.into_iter().collect();
        entries.sort();
        entries
    }

    // Per-directory configuration discovery ---------------------------------

    /// Walk `cwd` upward looking for the config file named by `VCCONFIG`.
    pub fn config_file(&self, cwd: &Path) -> Option<PathBuf> {
        let name = self.get(VC_CONFIG)?;
        if name.is_empty() {
            return None;
        }
        let name = Path::new(&name);
        if name.is_absolute() {
            return name.is_file().then(|| name.to_path_buf());
        }
        let mut dir = Some(cwd);
        while let Some(current) = dir {
            let candidate = current.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
            dir = current.parent();
        }
        None
    }

    /// Value of `key` from the discovered config file, if any.
    pub fn config_value(&self, cwd: &Path, key: &str) -> Option<String> {
        let file = self.config_file(cwd)?;
        let text = fs::read_to_string(&file).ok()?;
        parse_config_line(&text, key)
    }

    /// Resolve `key` with per-directory config taking precedence over the
    /// store tiers when a `cwd` is given.
    pub fn resolve(&self, cwd: Option<&Path>, key: &str) -> Option<String> {
        if let Some(cwd) = cwd {
            if let Some(value) = self.config_value(cwd, key) {
                return Some(value);
            }
        }
        self.get(key)
    }

    // Persisted tier ---------------------------------------------------------

    fn load_persisted(&self) -> Result<HashMap<String, String>, Error> {
        let mut file = match File::open(&self.file) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(HashMap::new());
            }
            Err(err) => {
                return Err(Error::new(ErrorKind::Io)
                    .with_path(&self.file)
                    .with_source(err));
            }
        };
        file.lock_shared().map_err(|err| {
            Error::new(ErrorKind::Io).with_path(&self.file).with_source(err)
        })?;
        let mut text = String::new();
        let read = file.read_to_string(&mut text);
        let _ = FileExt::unlock(&file);
        read.map_err(|err| {
            Error::new(ErrorKind::Io).with_path(&self.file).with_source(err)
        })?;
        if text.trim().is_empty() {
            return Ok(HashMap::new());
        }
        let doc: PersistedEnv = serde_json::from_str(&text).map_err(|err| {
            Error::new(ErrorKind::Corrupt)
                .with_message("persisted environment store is not valid JSON")
                .with_path(&self.file)
                .with_source(err)
        })?;
        Ok(doc.entries)
    }

    fn write_persisted(&self, entries: &HashMap<String, String>) -> Result<(), Error> {
        if let Some(parent) = self.file.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|err| {
                    Error::new(ErrorKind::Io).with_path(parent).with_source(err)
                })?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(&self.file)
            .map_err(|err| {
                Error::new(ErrorKind::Io).with_path(&self.file).with_source(err)
            })?;
        file.lock_exclusive().map_err(|err| {
            Error::new(ErrorKind::Io).with_path(&self.file).with_source(err)
        })?;
        let doc = PersistedEnv {
            entries: entries.clone(),
        };
        let json = serde_json::to_string_pretty(&doc).map_err(|err| {
            Error::new(ErrorKind::Internal).with_source(err)
        })?;
        let write = file
            .set_len(0)
            .and_then(|()| file.write_all(json.as_bytes()))
            .and_then(|()| file.flush());
        let _ = FileExt::unlock(&file);
        write.map_err(|err| {
            Error::new(ErrorKind::Io).with_path(&self.file).with_source(err)
        })
    }
}

impl Default for EnvStore {
    fn default() -> Self {
        Self::new()
    }
}

fn default_store_path() -> PathBuf {
    let home = std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    home.join(".depotbridge").join("env.json")
}

fn parse_config_line(text: &str, key: &str) -> Option<String> {
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((name, value)) = line.split_once('=') {
            if name.trim() == key {
                return Some(value.trim().to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::{EnvStore, VC_CONFIG, VC_PORT};
    use std::fs;

    fn store() -> (tempfile::TempDir, EnvStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let env = EnvStore::with_file(dir.path().join("env.json"));
        (dir, env)
    }

    #[test]
    fn update_beats_os_environment() {
        let (_dir, mut env) = store();
        // SAFETY: test-only process env mutation with a test-unique key.
        unsafe { std::env::set_var("DPB_TEST_PRECEDENCE", "from-env") };
        assert_eq!(env.get("DPB_TEST_PRECEDENCE").as_deref(), Some("from-env"));

        env.update("DPB_TEST_PRECEDENCE", "from-update");
        assert_eq!(
            env.get("DPB_TEST_PRECEDENCE").as_deref(),
            Some("from-update")
        );

        env.reload();
        assert_eq!(env.get("DPB_TEST_PRECEDENCE").as_deref(), Some("from-env"));
        unsafe { std::env::remove_var("DPB_TEST_PRECEDENCE") };
    }

    #[test]
    fn set_persists_and_invalidates_override() {
        let (_dir, mut env) = store();
        env.update("DPB_TEST_SETKEY", "override");
        env.set("DPB_TEST_SETKEY", "persisted").expect("set");
        // The override is gone, so the persisted tier answers.
        assert_eq!(env.get("DPB_TEST_SETKEY").as_deref(), Some("persisted"));

        // A second store over the same file sees the persisted value.
        let env2 = EnvStore::with_file(env.store_path());
        assert_eq!(env2.get("DPB_TEST_SETKEY").as_deref(), Some("persisted"));
    }

    #[test]
    fn set_empty_unsets_persisted_entry() {
        let (_dir, mut env) = store();
        env.set("DPB_TEST_UNSET", "value").expect("set");
        env.set("DPB_TEST_UNSET", "").expect("unset");
        assert_eq!(env.get("DPB_TEST_UNSET"), None);
    }

    #[test]
    fn missing_store_file_reads_as_empty() {
        let (_dir, env) = store();
        assert_eq!(env.get("DPB_TEST_MISSING"), None);
        assert!(env.list().is_empty());
    }

    #[test]
    fn corrupt_store_file_is_reported() {
        let (_dir, mut env) = store();
        fs::write(env.store_path(), "not json").expect("write");
        let err = env.set("DPB_TEST_CORRUPT", "x").expect_err("must fail");
        assert_eq!(err.kind(), crate::core::error::ErrorKind::Corrupt);
    }

    #[test]
    fn config_discovery_walks_parents() {
        let (dir, mut env) = store();
        env.update(VC_CONFIG, ".vcconfig");
        let root = dir.path();
        let nested = root.join("ws").join("proj").join("src");
        fs::create_dir_all(&nested).expect("mkdirs");
        fs::write(
            root.join("ws").join(".vcconfig"),
            "# workspace config\nVCPORT=cfg:1666\nVCCLIENT = cfg-ws\n",
        )
        .expect("write config");

        assert_eq!(
            env.config_file(&nested),
            Some(root.join("ws").join(".vcconfig"))
        );
        assert_eq!(
            env.config_value(&nested, VC_PORT).as_deref(),
            Some("cfg:1666")
        );
        assert_eq!(
            env.config_value(&nested, "VCCLIENT").as_deref(),
            Some("cfg-ws")
        );
        // Config wins over the store tiers when resolving with a cwd.
        env.update(VC_PORT, "override:1666");
        assert_eq!(
            env.resolve(Some(&nested), VC_PORT).as_deref(),
            Some("cfg:1666")
        );
        assert_eq!(env.resolve(None, VC_PORT).as_deref(), Some("override:1666"));
    }

    #[test]
    fn list_merges_overrides_over_persisted() {
        let (_dir, mut env) = store();
        env.set("DPB_LIST_A", "persisted-a").expect("set");
        env.set("DPB_LIST_B", "persisted-b").expect("set");
        env.update("DPB_LIST_B", "override-b");
        let entries = env.list();
        assert!(entries.contains(&("DPB_LIST_A".to_string(), "persisted-a".to_string())));
        assert!(entries.contains(&("DPB_LIST_B".to_string(), "override-b".to_string())));
    }
}
