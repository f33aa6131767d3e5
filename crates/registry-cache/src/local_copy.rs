//! Durable copy of the last good registry data.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::errors::PersistError;
use crate::model::PersistedSnapshot;

#[derive(Clone, Debug)]
pub struct LocalCopy {
    path: PathBuf,
}

impl LocalCopy {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, snapshot: &PersistedSnapshot) -> Result<(), PersistError> {
        let data =
            serde_json::to_vec_pretty(snapshot).map_err(|err| PersistError::Encode(err.to_string()))?;
        write_atomic(&self.path, &data).map_err(|source| PersistError::Io {
            path: self.path.clone(),
            source,
        })
    }

    /// Reads the local copy.
    ///
    /// A missing file is `Ok(None)`. An unreadable or empty copy is removed
    /// from disk and reported as `Corrupt`.
    pub fn load(&self) -> Result<Option<PersistedSnapshot>, PersistError> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(PersistError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let reason = match serde_json::from_slice::<PersistedSnapshot>(&raw) {
            Ok(snapshot) if snapshot.is_usable() => return Ok(Some(snapshot)),
            Ok(_) => "no virtualizations or permissions".to_string(),
            Err(err) => err.to_string(),
        };

        self.discard();
        Err(PersistError::Corrupt {
            path: self.path.clone(),
            reason,
        })
    }

    pub fn discard(&self) {
        if let Err(err) = fs::remove_file(&self.path) {
            if err.kind() != io::ErrorKind::NotFound {
                warn!(target: "registry-cache", path = %self.path.display(), error = %err, "failed to delete local copy");
            }
        }
    }
}

fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let tmp = path.with_extension("tmp");
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&tmp)?;
    file.write_all(data)?;
    file.sync_all()?;
    fs::rename(tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use routegate_core_types::{PermissionRecord, VirtualizationRecord};

    fn sample() -> PersistedSnapshot {
        let epoch = Utc.timestamp_opt(0, 0).unwrap();
        PersistedSnapshot {
            saved_at: None,
            virtualizations: vec![VirtualizationRecord {
                receiver_id: "receiver-1".into(),
                contract_namespace: "ns".into(),
                transport_profile: "RIVTABP21".into(),
                physical_address: "http://a".into(),
                valid_from: epoch,
                valid_to: None,
            }],
            permissions: vec![PermissionRecord {
                sender_id: "tp".into(),
                receiver_id: "receiver-1".into(),
                contract_namespace: "ns".into(),
                valid_from: epoch,
                valid_to: None,
            }],
        }
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let copy = LocalCopy::new(dir.path().join("absent.json"));
        assert!(copy.load().unwrap().is_none());
    }

    #[test]
    fn save_then_load_restores_records() {
        let dir = tempfile::tempdir().unwrap();
        let copy = LocalCopy::new(dir.path().join("nested/registry.json"));
        copy.save(&sample()).unwrap();
        let loaded = copy.load().unwrap().unwrap();
        assert_eq!(loaded.virtualizations, sample().virtualizations);
        assert_eq!(loaded.permissions, sample().permissions);
    }

    #[test]
    fn corrupt_file_is_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");
        fs::write(&path, b"{not json").unwrap();
        let copy = LocalCopy::new(&path);
        let err = copy.load().unwrap_err();
        assert!(matches!(err, PersistError::Corrupt { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn empty_copy_is_treated_as_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let copy = LocalCopy::new(dir.path().join("registry.json"));
        copy.save(&PersistedSnapshot::default()).unwrap();
        assert!(matches!(copy.load(), Err(PersistError::Corrupt { .. })));
        assert!(!copy.path().exists());
    }
}
