//! File-backed scoped storage for persisting login state between runs.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use directories::ProjectDirs;
use fs2::FileExt;
use tracing::{debug, trace};

use firedb_core::ScopedStorage;
use firedb_core::error::{Error, StorageError};

#[cfg(unix)]
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

const STORE_FILE: &str = "storage.json";

fn map_io(err: std::io::Error) -> Error {
    Error::Storage(StorageError::Io {
        message: err.to_string(),
    })
}

/// Data directory for the CLI, created on first use.
pub fn data_dir() -> anyhow::Result<PathBuf> {
    let dirs =
        ProjectDirs::from("", "", "firedb").context("Could not determine data directory")?;

    let data_dir = dirs.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data directory")?;

    Ok(data_dir.to_path_buf())
}

/// A string map kept as one JSON object on disk.
///
/// Writers hold an exclusive lock on the file for the whole
/// read-modify-write cycle; readers take a shared lock.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Storage in the user's data directory.
    pub fn open_default() -> anyhow::Result<Self> {
        Ok(Self::new(data_dir()?.join(STORE_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn decode(&self, contents: &str) -> Result<BTreeMap<String, String>, Error> {
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(contents).map_err(|e| {
            Error::Storage(StorageError::Corrupt {
                message: format!("{}: {}", self.path.display(), e),
            })
        })
    }

    fn load(&self) -> Result<BTreeMap<String, String>, Error> {
        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(map_io(e)),
        };

        file.lock_shared().map_err(map_io)?;
        let mut contents = String::new();
        let read = file.read_to_string(&mut contents).map_err(map_io);
        file.unlock().map_err(map_io)?;
        read?;

        self.decode(&contents)
    }

    fn modify(&self, apply: impl FnOnce(&mut BTreeMap<String, String>)) -> Result<(), Error> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(map_io)?;
        }

        let mut options = OpenOptions::new();
        options.create(true).read(true).write(true).truncate(false);
        #[cfg(unix)]
        options.mode(0o600);
        let mut file = options.open(&self.path).map_err(map_io)?;
        // The mode above only applies to new files.
        #[cfg(unix)]
        file.set_permissions(fs::Permissions::from_mode(0o600))
            .map_err(map_io)?;

        file.lock_exclusive().map_err(map_io)?;
        let written = self.rewrite(&mut file, apply);
        file.unlock().map_err(map_io)?;
        written
    }

    fn rewrite(
        &self,
        file: &mut File,
        apply: impl FnOnce(&mut BTreeMap<String, String>),
    ) -> Result<(), Error> {
        let mut contents = String::new();
        file.read_to_string(&mut contents).map_err(map_io)?;
        let mut entries = self.decode(&contents)?;

        apply(&mut entries);

        let json = serde_json::to_string_pretty(&entries).map_err(|e| {
            Error::Storage(StorageError::Corrupt {
                message: e.to_string(),
            })
        })?;
        file.set_len(0).map_err(map_io)?;
        file.seek(SeekFrom::Start(0)).map_err(map_io)?;
        file.write_all(json.as_bytes()).map_err(map_io)?;
        file.sync_data().map_err(map_io)
    }
}

impl ScopedStorage for FileStorage {
    fn get_item(&self, key: &str) -> firedb_core::Result<Option<String>> {
        trace!(key, "Reading stored item");
        Ok(self.load()?.remove(key))
    }

    fn set_item(&self, key: &str, value: &str) -> firedb_core::Result<()> {
        debug!(key, path = %self.path().display(), "Writing stored item");
        self.modify(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove_item(&self, key: &str) -> firedb_core::Result<()> {
        debug!(key, path = %self.path().display(), "Removing stored item");
        self.modify(|entries| {
            entries.remove(key);
        })
    }
}
