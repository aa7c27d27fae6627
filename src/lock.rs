use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::DiceError;

#[derive(Debug)]
pub struct RootLock {
    path: Utf8PathBuf,
    file: File,
}

impl RootLock {
    pub fn acquire(root: &Utf8Path, role: &str) -> Result<Self, DiceError> {
        let path = lock_path(root, role);
        fs::create_dir_all(root.as_std_path()).map_err(|err| lock_err(&path, err))?;
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path.as_std_path())
            .map_err(|err| lock_err(&path, err))?;
        Self::hold(path, file, root, role)
    }

    /// Like `acquire`, but never creates the root or the lock file. `None`
    /// when no lock file exists yet.
    pub fn acquire_existing(root: &Utf8Path, role: &str) -> Result<Option<Self>, DiceError> {
        let path = lock_path(root, role);
        let file = match File::open(path.as_std_path()) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::debug!("no {role} lock file under {root}, not locking");
                return Ok(None);
            }
            Err(err) => return Err(lock_err(&path, err)),
        };
        Self::hold(path, file, root, role).map(Some)
    }

    fn hold(path: Utf8PathBuf, file: File, root: &Utf8Path, role: &str) -> Result<Self, DiceError> {
        tracing::debug!("waiting for {role} lock on {root}");
        file.lock().map_err(|err| lock_err(&path, err))?;
        tracing::debug!("acquired {role} lock on {root}");
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

fn lock_path(root: &Utf8Path, role: &str) -> Utf8PathBuf {
    root.join(format!(".{role}_lock"))
}

fn lock_err(path: &Utf8Path, err: std::io::Error) -> DiceError {
    DiceError::Lock {
        path: path.as_std_path().to_path_buf(),
        message: err.to_string(),
    }
}

impl Drop for RootLock {
    fn drop(&mut self) {
        if let Err(err) = self.file.unlock() {
            tracing::warn!("failed to release lock {}: {err}", self.path);
        }
    }
}
