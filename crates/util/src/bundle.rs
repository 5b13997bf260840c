//! Bundle extraction (spec §2 "bundle download" utility leaf, scoped to
//! extraction only — no network fetch, that belongs to the excluded
//! CLI/installer layer). Grounded on the teacher's hardened tgz importer
//! (`gateway::import::openclaw::extract`): reject path traversal, reject
//! symlinks, cap total extracted size.

use std::fs;
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use tar::Archive;

use agentrt_domain::{Error, Result};

const DEFAULT_MAX_EXTRACTED_BYTES: u64 = 500 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub max_extracted_bytes: u64,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            max_extracted_bytes: DEFAULT_MAX_EXTRACTED_BYTES,
        }
    }
}

/// Extracts a `.tar.gz` bundle into `dest_dir`. Rejects entries that would
/// escape `dest_dir` (absolute paths, `..` components) or that are
/// symlinks/hardlinks, and aborts once `max_extracted_bytes` is exceeded.
pub fn extract_tgz(archive_path: &Path, dest_dir: &Path, options: &ExtractOptions) -> Result<()> {
    fs::create_dir_all(dest_dir)?;

    let file = fs::File::open(archive_path)?;
    let gz = GzDecoder::new(std::io::BufReader::new(file));
    let mut archive = Archive::new(gz);

    let mut extracted_bytes: u64 = 0;

    for entry in archive.entries()? {
        let mut entry = entry?;
        let entry_type = entry.header().entry_type();

        match entry_type {
            tar::EntryType::Symlink | tar::EntryType::Link => {
                let path = entry.path().unwrap_or_default().to_string_lossy().into_owned();
                return Err(Error::Other(format!("symlink/hardlink in bundle: {path}")));
            }
            tar::EntryType::XHeader | tar::EntryType::XGlobalHeader | tar::EntryType::GNULongName | tar::EntryType::GNULongLink => {
                continue;
            }
            _ => {}
        }

        let raw_path = entry.path()?.into_owned();
        let relative = normalize_bundle_path(&raw_path)?;
        let full_path = dest_dir.join(&relative);

        if entry_type == tar::EntryType::Directory {
            fs::create_dir_all(&full_path)?;
            continue;
        }

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }

        extracted_bytes += entry.header().size().unwrap_or(0);
        if extracted_bytes > options.max_extracted_bytes {
            return Err(Error::Other(format!(
                "bundle exceeds extracted-size limit of {} bytes",
                options.max_extracted_bytes
            )));
        }

        let mut out_file = fs::OpenOptions::new().write(true).create_new(true).open(&full_path)?;
        std::io::copy(&mut entry, &mut out_file)?;
    }

    Ok(())
}

/// Rejects absolute paths and `..` traversal, strips `.` components, and
/// returns the normalized relative path.
fn normalize_bundle_path(path: &Path) -> Result<PathBuf> {
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => parts.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(Error::Other(format!("parent dir traversal in bundle entry: {}", path.display())));
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(Error::Other(format!("absolute path in bundle entry: {}", path.display())));
            }
        }
    }
    if parts.is_empty() {
        return Err(Error::Other(format!("bundle entry normalizes to empty path: {}", path.display())));
    }
    Ok(parts.into_iter().collect())
}
