//! Filesystem-backed `ObjectStore` reference implementation.
//!
//! Grounded on the teacher's `SessionStore`/`RunStore` precedent of
//! `std::fs` + JSON(L) persistence under a root directory, generalized from
//! a typed store into a generic keyed-blob store.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use serde_json::Value;

use agentrt_domain::{Error, Result};

use crate::{ObjectStore, StoreValue};

pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, key: &str, body: &[u8]) -> Result<()> {
        let path = self.resolve(key);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, body)?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<StoreValue> {
        let path = self.resolve(key);
        let is_json = key.ends_with(".json");
        let is_jsonl = key.ends_with(".jsonl");

        if !path.exists() {
            return if is_json {
                Ok(StoreValue::Json(Value::Object(Default::default())))
            } else if is_jsonl {
                Ok(StoreValue::JsonLines(Vec::new()))
            } else {
                Err(Error::NotFound(key.to_string()))
            };
        }

        if is_json {
            let content = std::fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                return Ok(StoreValue::Json(Value::Object(Default::default())));
            }
            let value: Value = serde_json::from_str(&content)?;
            Ok(StoreValue::Json(value))
        } else if is_jsonl {
            let content = std::fs::read_to_string(&path)?;
            let mut values = Vec::new();
            for line in content.lines() {
                if line.trim().is_empty() {
                    continue;
                }
                values.push(serde_json::from_str(line)?);
            }
            Ok(StoreValue::JsonLines(values))
        } else {
            Ok(StoreValue::Raw(std::fs::read(&path)?))
        }
    }

    async fn append(&self, key: &str, line: &str) -> Result<()> {
        use std::io::Write;
        let path = self.resolve(key);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.resolve(key);
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.resolve(key).exists())
    }

    async fn list(&self) -> Result<Vec<String>> {
        let mut entries = collect_files(&self.root)?;
        entries.sort_by_key(|(_, mtime)| *mtime);
        Ok(entries.into_iter().map(|(k, _)| k).collect())
    }

    async fn find_by_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let all = self.list().await?;
        Ok(all.into_iter().filter(|k| k.starts_with(prefix)).collect())
    }

    async fn find_by_extension(&self, ext: &str) -> Result<Vec<String>> {
        let suffix = if let Some(stripped) = ext.strip_prefix('.') {
            format!(".{stripped}")
        } else {
            format!(".{ext}")
        };
        let all = self.list().await?;
        Ok(all.into_iter().filter(|k| k.ends_with(&suffix)).collect())
    }

    async fn ensure_bucket(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;
        Ok(())
    }

    async fn bucket_exists(&self) -> Result<bool> {
        Ok(self.root.exists())
    }

    async fn is_healthy(&self) -> Result<bool> {
        Ok(self.root.exists() || std::fs::create_dir_all(&self.root).is_ok())
    }

    fn path(&self, key: Option<&str>) -> String {
        match key {
            Some(k) => self.resolve(k).display().to_string(),
            None => self.root.display().to_string(),
        }
    }
}

fn collect_files(root: &Path) -> Result<Vec<(String, SystemTime)>> {
    let mut out = Vec::new();
    if !root.exists() {
        return Ok(out);
    }
    walk(root, root, &mut out)?;
    Ok(out)
}

fn walk(root: &Path, dir: &Path, out: &mut Vec<(String, SystemTime)>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            walk(root, &path, out)?;
        } else {
            let meta = entry.metadata()?;
            let mtime = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            let rel = path
                .strip_prefix(root)
                .unwrap_or(&path)
                .to_string_lossy()
                .replace(std::path::MAIN_SEPARATOR, "/");
            out.push((rel, mtime));
        }
    }
    Ok(())
}
