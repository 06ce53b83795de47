//! Directory-per-machine store backed by the local filesystem

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use dockyard_host::HostRecord;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tracing::{debug, instrument, warn};

use crate::error::StoreError;
use crate::traits::HostStore;

const MACHINES_DIR: &str = "machines";
const CONFIG_FILE: &str = "config.json";
const TEMP_PREFIX: &str = "config.json.tmp";

/// Stores machines as `<path>/machines/<name>/config.json`
#[derive(Debug, Clone)]
pub struct Filestore {
    path: PathBuf,
}

impl Filestore {
    /// Create a store rooted at `path`; nothing is created until the first save
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Root directory of the store
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory holding one subdirectory per machine
    #[must_use]
    pub fn machines_dir(&self) -> PathBuf {
        self.path.join(MACHINES_DIR)
    }

    fn host_dir(&self, name: &str) -> Result<PathBuf, StoreError> {
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(StoreError::InvalidName(name.to_string()));
        }
        Ok(self.machines_dir().join(name))
    }

    fn encode(record: &HostRecord) -> Result<Vec<u8>, StoreError> {
        let mut data = Vec::new();
        let mut ser =
            serde_json::Serializer::with_formatter(&mut data, PrettyFormatter::with_indent(b"    "));
        record
            .serialize(&mut ser)
            .map_err(|source| StoreError::Encode {
                name: record.name.clone(),
                source,
            })?;
        Ok(data)
    }

    /// Write `data` to `file` so readers only ever see a complete document
    ///
    /// A first write goes straight to `file`. Later writes go to a sibling
    /// temp file which is renamed over `file`; the temp file is deleted if
    /// anything fails before the rename.
    fn save_to_file(data: &[u8], file: &Path) -> Result<(), StoreError> {
        match fs::metadata(file) {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => return write_new(file, data),
            Err(e) => return Err(StoreError::io(file, e)),
        }

        let dir = file.parent().unwrap_or(Path::new("."));
        let mut tmp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(dir)
            .map_err(|e| StoreError::io(dir, e))?;

        tmp.write_all(data)
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| StoreError::io(tmp.path(), e))?;

        // closes the handle; the returned path still deletes itself on drop
        let tmp_path = tmp.into_temp_path();
        tmp_path
            .persist(file)
            .map_err(|e| StoreError::io(file, e.error))?;

        Ok(())
    }
}

fn write_new(file: &Path, data: &[u8]) -> Result<(), StoreError> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut f = options.open(file).map_err(|e| StoreError::io(file, e))?;
    f.write_all(data)
        .and_then(|()| f.sync_all())
        .map_err(|e| StoreError::io(file, e))
}

fn create_host_dir(dir: &Path) -> Result<(), StoreError> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(dir).map_err(|e| StoreError::io(dir, e))
}

impl HostStore for Filestore {
    fn exists(&self, name: &str) -> Result<bool, StoreError> {
        let dir = self.host_dir(name)?;
        match fs::metadata(&dir) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::io(dir, e)),
        }
    }

    fn list(&self) -> Result<Vec<String>, StoreError> {
        let machines_dir = self.machines_dir();
        let entries = match fs::read_dir(&machines_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(machines_dir, e)),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(&machines_dir, e))?;
            let file_type = entry
                .file_type()
                .map_err(|e| StoreError::io(entry.path(), e))?;
            if !file_type.is_dir() {
                continue;
            }
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                warn!(
                    path = %entry.path().display(),
                    "skipping machine directory with non UTF-8 name"
                );
                continue;
            };
            if !name.starts_with('.') {
                names.push(name.to_string());
            }
        }

        names.sort();
        Ok(names)
    }

    #[instrument(skip(self))]
    fn load(&self, name: &str) -> Result<HostRecord, StoreError> {
        if !self.exists(name)? {
            return Err(StoreError::NotFound {
                name: name.to_string(),
            });
        }

        let file = self.host_dir(name)?.join(CONFIG_FILE);
        let data = fs::read(&file).map_err(|e| StoreError::io(&file, e))?;

        let mut record: HostRecord =
            serde_json::from_slice(&data).map_err(|source| StoreError::Decode {
                path: file.clone(),
                source,
            })?;

        // a document without a name still belongs to its directory
        if record.name.is_empty() {
            record.name = name.to_string();
        }

        debug!(path = %file.display(), "loaded host");
        Ok(record)
    }

    #[instrument(skip(self))]
    fn remove(&self, name: &str) -> Result<(), StoreError> {
        let dir = self.host_dir(name)?;
        match fs::remove_dir_all(&dir) {
            Ok(()) => {
                debug!(path = %dir.display(), "removed host");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io(dir, e)),
        }
    }

    #[instrument(skip(self, record), fields(host = %record.name))]
    fn save(&self, record: &HostRecord) -> Result<(), StoreError> {
        let dir = self.host_dir(&record.name)?;
        let data = Self::encode(record)?;

        create_host_dir(&dir)?;

        let file = dir.join(CONFIG_FILE);
        Self::save_to_file(&data, &file)?;

        debug!(path = %file.display(), bytes = data.len(), "saved host");
        Ok(())
    }
}
