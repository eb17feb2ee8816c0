//! Single-flight guard for polling cycles.
//!
//! A cycle can outlive the scheduler interval (it waits for lineups), so an
//! advisory lock on `matchbot.lock` keeps a second invocation from working
//! on the same ledger at the same time. The lock belongs to the open file
//! handle: the OS drops it when the process exits, however it exits.

use std::fs::{File, OpenOptions, TryLockError};
use std::io::{self, Write as _};
use std::path::PathBuf;

use snafu::{ResultExt as _, Snafu};
use tracing::{debug, warn};

const LOG_TARGET: &str = "matchbot::lock";

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum LockError {
    #[snafu(display("Lock file {} error: {source}", path.display()))]
    Io { path: PathBuf, source: io::Error },
}

pub type LockResult<T> = std::result::Result<T, LockError>;

/// Held lock. Released when dropped.
#[derive(Debug)]
pub struct CycleLock {
    file: File,
    path: PathBuf,
}

impl CycleLock {
    /// Lock the file at `path`, creating it if needed.
    ///
    /// Returns `None` while another process holds it. Whatever a previous
    /// holder left in the file does not matter.
    pub fn try_acquire(path: impl Into<PathBuf>, now_unix: i64) -> LockResult<Option<Self>> {
        let path = path.into();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .context(IoSnafu { path: &path })?;

        match file.try_lock() {
            Ok(()) => {}
            Err(TryLockError::WouldBlock) => {
                let holder = std::fs::read_to_string(&path).unwrap_or_default();
                debug!(target: LOG_TARGET, holder = %holder.trim(), "Lock held by another run");
                return Ok(None);
            }
            Err(TryLockError::Error(source)) => return Err(LockError::Io { path, source }),
        }

        let mut lock = Self { file, path };
        // Diagnostics only
        if let Err(err) = lock.write_holder(now_unix) {
            warn!(target: LOG_TARGET, path = %lock.path.display(), %err, "Could not note lock holder");
        }
        debug!(target: LOG_TARGET, path = %lock.path.display(), "Lock acquired");
        Ok(Some(lock))
    }

    fn write_holder(&mut self, now_unix: i64) -> io::Result<()> {
        self.file.set_len(0)?;
        write!(self.file, "{now_unix} {}", std::process::id())?;
        self.file.sync_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_792_400_000;

    #[test_log::test]
    fn second_holder_is_rejected_until_release() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("matchbot.lock");

        let first = CycleLock::try_acquire(&path, NOW)
            .unwrap()
            .expect("first acquire");
        assert!(CycleLock::try_acquire(&path, NOW + 60).unwrap().is_none());

        drop(first);
        assert!(CycleLock::try_acquire(&path, NOW + 120).unwrap().is_some());
    }

    #[test_log::test]
    fn lock_is_free_once_holder_handle_is_gone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("matchbot.lock");

        let held = CycleLock::try_acquire(&path, NOW)
            .unwrap()
            .expect("first acquire");
        // What the OS does for a killed process: close the handle, run no
        // cleanup code, leave the file behind.
        let CycleLock { file, .. } = held;
        drop(file);
        assert!(path.exists());

        let next = CycleLock::try_acquire(&path, NOW + 60)
            .unwrap()
            .expect("lock of a dead holder must be free");
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            format!("{} {}", NOW + 60, std::process::id())
        );
        drop(next);
    }

    #[test_log::test]
    fn leftover_file_from_a_crashed_run_is_reused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("matchbot.lock");
        std::fs::write(&path, format!("{} 4242 and some garbage", NOW - 60)).unwrap();

        assert!(CycleLock::try_acquire(&path, NOW).unwrap().is_some());
        assert!(
            std::fs::read_to_string(&path)
                .unwrap()
                .starts_with(&NOW.to_string())
        );
    }
}
