//! SSH private key resolution

use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::TempPath;
use tracing::debug;

/// File name prefix of decoded env keys in the temp directory
const TEMP_KEY_PREFIX: &str = "dockyard_ssh_key";

/// Where the SSH private key for a machine comes from
#[derive(Debug, Clone)]
pub enum KeySource {
    /// Key file on disk, typically `<root>/machines/<name>/id_rsa`
    Path(PathBuf),
    /// Base64-encoded key held in the named environment variable
    Env(String),
}

impl KeySource {
    /// Resolve to a key file usable by the SSH client
    ///
    /// `Env` keys are decoded and written to a private temporary file that
    /// is deleted when the returned [`ResolvedKey`] is dropped.
    ///
    /// # Errors
    /// Returns `KeyError` if the file is missing or too permissive, or the
    /// environment variable is unset or not valid base64
    pub fn resolve(&self) -> Result<ResolvedKey, KeyError> {
        match self {
            KeySource::Path(path) => {
                check_permissions(path)?;
                Ok(ResolvedKey::Path(path.clone()))
            }
            KeySource::Env(var_name) => {
                let encoded =
                    env::var(var_name).map_err(|_| KeyError::EnvNotSet(var_name.clone()))?;
                let key_data = decode_base64(&encoded)?;
                Ok(ResolvedKey::Temp(write_temp_key(&env::temp_dir(), &key_data)?))
            }
        }
    }
}

/// Key file ready to hand to the SSH client
#[derive(Debug)]
pub enum ResolvedKey {
    /// Caller-owned key file
    Path(PathBuf),
    /// Temporary file, removed on drop
    Temp(TempPath),
}

impl ResolvedKey {
    /// Path of the key file
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            ResolvedKey::Path(p) => p,
            ResolvedKey::Temp(p) => p,
        }
    }
}

/// Key resolution errors
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("environment variable {0} not set")]
    EnvNotSet(String),

    #[error("invalid base64 encoding")]
    InvalidBase64,

    #[error("key file permissions too open: {0} (should be 600)")]
    BadPermissions(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn decode_base64(input: &str) -> Result<Vec<u8>, KeyError> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD
        .decode(input.trim())
        .map_err(|_| KeyError::InvalidBase64)
}

#[cfg(unix)]
fn check_permissions(path: &Path) -> Result<(), KeyError> {
    use std::os::unix::fs::PermissionsExt;

    let mode = std::fs::metadata(path)?.permissions().mode();

    // group/other bits must be clear
    if mode & 0o077 != 0 {
        return Err(KeyError::BadPermissions(path.display().to_string()));
    }

    Ok(())
}

#[cfg(not(unix))]
fn check_permissions(path: &Path) -> Result<(), KeyError> {
    std::fs::metadata(path)?;
    Ok(())
}

/// Write `key_data` to a fresh file in `dir`
///
/// The file gets a random name and is created exclusively with mode 0600,
/// so nothing already sitting in `dir` is followed or reused.
fn write_temp_key(dir: &Path, key_data: &[u8]) -> Result<TempPath, KeyError> {
    let mut file = tempfile::Builder::new()
        .prefix(TEMP_KEY_PREFIX)
        .tempfile_in(dir)?;
    file.write_all(key_data)?;
    file.as_file().sync_all()?;

    debug!(path = %file.path().display(), "wrote temporary SSH key");

    Ok(file.into_temp_path())
}

#[cfg(all(test, unix))]
mod tests {
    use std::os::unix::fs::PermissionsExt;

    use super::*;

    #[test]
    fn test_path_key_rejects_open_permissions() {
        let dir = tempfile::tempdir().unwrap();
        let key = dir.path().join("id_rsa");
        std::fs::write(&key, b"not really a key").unwrap();
        std::fs::set_permissions(&key, std::fs::Permissions::from_mode(0o644)).unwrap();

        let err = KeySource::Path(key.clone()).resolve().unwrap_err();
        assert!(matches!(err, KeyError::BadPermissions(_)));

        std::fs::set_permissions(&key, std::fs::Permissions::from_mode(0o600)).unwrap();
        let resolved = KeySource::Path(key.clone()).resolve().unwrap();
        assert_eq!(resolved.path(), key.as_path());
    }

    #[test]
    fn test_env_key_missing_variable() {
        let err = KeySource::Env("DOCKYARD_TEST_KEY_THAT_IS_NOT_SET".to_string())
            .resolve()
            .unwrap_err();
        assert!(matches!(err, KeyError::EnvNotSet(_)));
    }

    #[test]
    fn test_temp_key_ignores_planted_symlinks() {
        let dir = tempfile::tempdir().unwrap();
        let victim = dir.path().join("victim.txt");
        std::fs::write(&victim, "precious").unwrap();
        for name in [
            TEMP_KEY_PREFIX.to_string(),
            format!("{TEMP_KEY_PREFIX}_{}", std::process::id()),
        ] {
            std::os::unix::fs::symlink(&victim, dir.path().join(name)).unwrap();
        }

        let key = ResolvedKey::Temp(write_temp_key(dir.path(), b"SECRETKEY").unwrap());

        assert_eq!(std::fs::read_to_string(&victim).unwrap(), "precious");
        assert!(!key.path().is_symlink());
        assert_eq!(std::fs::read(key.path()).unwrap(), b"SECRETKEY");
        let mode = std::fs::metadata(key.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_temp_keys_are_independent_and_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let first = ResolvedKey::Temp(write_temp_key(dir.path(), b"one").unwrap());
        let second = ResolvedKey::Temp(write_temp_key(dir.path(), b"two").unwrap());
        assert_ne!(first.path(), second.path());

        let first_path = first.path().to_path_buf();
        drop(first);

        assert!(!first_path.exists());
        assert_eq!(std::fs::read(second.path()).unwrap(), b"two");
    }
}
