//! Catalog document: load one collection of records, write it back in place.
//!
//! Only the named collection is replaced on save. Every other top-level key
//! keeps its value and position, and the previous file content is copied to
//! a timestamped backup first.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use brandscout_shared::{BrandScoutError, OrganizationRecord, Result};

/// A loaded catalog file.
#[derive(Debug, Clone)]
pub struct Catalog {
    path: PathBuf,
    collection: String,
    raw: String,
    root: Map<String, Value>,
    pub records: Vec<OrganizationRecord>,
}

impl Catalog {
    /// Read `path` and parse the `collection` array. A missing collection
    /// key loads as an empty list.
    #[instrument(skip_all, fields(path = %path.display(), collection = %collection))]
    pub fn load(path: &Path, collection: &str) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            BrandScoutError::Catalog(format!("cannot read {}: {e}", path.display()))
        })?;

        let root = match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                return Err(BrandScoutError::Catalog(format!(
                    "{}: top level is not a JSON object",
                    path.display()
                )));
            }
            Err(e) => {
                return Err(BrandScoutError::Catalog(format!(
                    "cannot parse {}: {e}",
                    path.display()
                )));
            }
        };

        let records = match root.get(collection) {
            None | Some(Value::Null) => Vec::new(),
            Some(value) => serde_json::from_value(value.clone()).map_err(|e| {
                BrandScoutError::Catalog(format!("cannot parse '{collection}' records: {e}"))
            })?,
        };

        debug!(records = records.len(), "catalog loaded");
        Ok(Self {
            path: path.to_path_buf(),
            collection: collection.to_string(),
            raw,
            root,
            records,
        })
    }

    /// Back up the original content, then atomically rewrite the file with
    /// the current records. Returns the backup path.
    #[instrument(skip_all, fields(path = %self.path.display()))]
    pub fn save(&self) -> Result<PathBuf> {
        let backup = backup_path(&self.path, chrono::Utc::now().timestamp());
        std::fs::write(&backup, &self.raw).map_err(|e| {
            BrandScoutError::Catalog(format!("cannot write backup {}: {e}", backup.display()))
        })?;

        let mut root = self.root.clone();
        let records = serde_json::to_value(&self.records)
            .map_err(|e| BrandScoutError::Catalog(format!("cannot serialize records: {e}")))?;
        root.insert(self.collection.clone(), records);

        let mut out = serde_json::to_string_pretty(&Value::Object(root))
            .map_err(|e| BrandScoutError::Catalog(format!("cannot serialize catalog: {e}")))?;
        out.push('\n');

        write_atomic(&self.path, out.as_bytes()).map_err(|e| {
            BrandScoutError::Catalog(format!("cannot write {}: {e}", self.path.display()))
        })?;

        info!(backup = %backup.display(), records = self.records.len(), "catalog saved");
        Ok(backup)
    }
}

/// `<path>.bak-<unix-seconds>`
pub fn backup_path(path: &Path, unix_seconds: i64) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".bak-{unix_seconds}"));
    PathBuf::from(name)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "catalog".into());
    let tmp = path.with_file_name(format!(".{file_name}.{}.part", Uuid::now_v7()));
    if let Err(e) = std::fs::write(&tmp, bytes).and_then(|()| std::fs::rename(&tmp, path)) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(())
}
