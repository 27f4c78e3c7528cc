use std::{
    fs::{self, OpenOptions, rename, write},
    io,
    path::{Path, PathBuf},
};

use fs2::FileExt;
use uuid::Uuid;

use crate::storage::{KeyValueStore, StorageError};

pub const DEFAULT_BACKUPS_TO_KEEP: usize = 5;

/// File-backed key-value store: every key is a `<key>.json` file in `dir`.
pub struct JsonFileStorage {
    dir: PathBuf,
    backups_to_keep: usize,
}

impl JsonFileStorage {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            backups_to_keep: DEFAULT_BACKUPS_TO_KEEP,
        }
    }

    pub fn with_backups_to_keep(mut self, backups_to_keep: usize) -> Self {
        self.backups_to_keep = backups_to_keep;
        self
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    fn create_backup_dir(&self) -> Result<(), StorageError> {
        let backups_dir = self.get_backup_dir();
        fs::create_dir_all(&backups_dir).map_err(|e| StorageError::BackupFailed {
            path: backups_dir,
            source: e,
        })?;
        Ok(())
    }

    fn create_backup(&self, key: &str) -> Result<u64, StorageError> {
        let path = self.path_for(key);
        let file_exists = fs::exists(&path).map_err(|e| StorageError::BackupFailed {
            path: path.clone(),
            source: e,
        })?;
        if !file_exists {
            return Ok(0);
        }

        let backup_path = self.get_backup_path(key);
        let copy_result = fs::copy(&path, &backup_path);
        match copy_result {
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.create_backup_dir()?;
                fs::copy(&path, &backup_path).map_err(|e| StorageError::BackupFailed {
                    path: backup_path,
                    source: e,
                })
            }
            Err(e) => Err(StorageError::BackupFailed {
                path: backup_path,
                source: e,
            }),
            Ok(bytes) => Ok(bytes),
        }
    }

    fn cleanup_old_backups(&self, key: &str) -> Result<(), StorageError> {
        let backup_dir = self.get_backup_dir();
        let backup_dir_exists =
            fs::exists(&backup_dir).map_err(|e| StorageError::CleanupFailed {
                dir: backup_dir.clone(),
                source: e,
            })?;
        if !backup_dir_exists {
            return Ok(());
        }

        let mut file_entries = fs::read_dir(&backup_dir)
            .map_err(|e| StorageError::CleanupFailed {
                dir: backup_dir.clone(),
                source: e,
            })?
            .flatten()
            .filter(|entry| entry.metadata().map(|m| m.is_file()).unwrap_or(false))
            .filter(|entry| is_backup_of(&entry.file_name().to_string_lossy(), key))
            .map(|entry| entry.path())
            .collect::<Vec<_>>();

        file_entries.sort();

        let number_of_files_to_delete = file_entries.len().saturating_sub(self.backups_to_keep);
        if number_of_files_to_delete == 0 {
            return Ok(());
        }

        for file_path in &file_entries[0..number_of_files_to_delete] {
            fs::remove_file(file_path).map_err(|e| StorageError::CleanupFailed {
                dir: backup_dir.clone(),
                source: e,
            })?;
        }
        tracing::debug!(
            "Pruned {} old backup(s) of '{}'",
            number_of_files_to_delete,
            key
        );

        Ok(())
    }

    fn get_backup_dir(&self) -> PathBuf {
        self.dir.join("backups")
    }

    fn get_backup_path(&self, key: &str) -> PathBuf {
        // Millisecond precision keeps lexical order equal to age order.
        let timestamp = jiff::Timestamp::now().as_millisecond();
        self.get_backup_dir()
            .join(format!("{}-{:015}.json", key, timestamp))
    }

    /// Back up the current file and move `temp_path` over it, under the key's lock.
    fn commit(&self, key: &str, temp_path: &Path, path: PathBuf) -> Result<(), StorageError> {
        let lock_file_path = path.with_extension("lock");
        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_file_path)
            .map_err(|e| StorageError::LockFailed {
                path: lock_file_path.clone(),
                source: e,
            })?;
        lock_file
            .lock_exclusive()
            .map_err(|e| StorageError::LockFailed {
                path: lock_file_path.clone(),
                source: e,
            })?;

        if self.backups_to_keep > 0 {
            self.create_backup(key)?;
            self.cleanup_old_backups(key)?;
        }

        rename(temp_path, &path).map_err(|e| self.write_error(key, path.clone(), e))?;

        lock_file.unlock().map_err(|e| StorageError::LockFailed {
            path: lock_file_path,
            source: e,
        })?;

        Ok(())
    }

    fn write_error(&self, key: &str, path: PathBuf, source: io::Error) -> StorageError {
        if source.kind() == io::ErrorKind::StorageFull {
            StorageError::StorageFull {
                key: key.to_string(),
            }
        } else {
            StorageError::WriteFailed { path, source }
        }
    }
}

impl KeyValueStore for JsonFileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::ReadFailed { path, source: e }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| self.write_error(key, self.dir.clone(), e))?;

        let path = self.path_for(key);
        let temp_path = PathBuf::from(format!("{}.tmp.{}", path.display(), Uuid::new_v4()));
        let result = write(&temp_path, value)
            .map_err(|e| self.write_error(key, temp_path.clone(), e))
            .and_then(|()| self.commit(key, &temp_path, path));

        if result.is_err() && fs::remove_file(&temp_path).is_ok() {
            tracing::debug!("Removed leftover '{}'", temp_path.display());
        }
        result
    }
}

/// True for `<key>-<digits>.json`, the names [`JsonFileStorage`] gives backups of `key`.
fn is_backup_of(file_name: &str, key: &str) -> bool {
    file_name
        .strip_prefix(key)
        .and_then(|rest| rest.strip_prefix('-'))
        .and_then(|rest| rest.strip_suffix(".json"))
        .is_some_and(|stamp| !stamp.is_empty() && stamp.bytes().all(|b| b.is_ascii_digit()))
}
