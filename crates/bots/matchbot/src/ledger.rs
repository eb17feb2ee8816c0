//! Record of everything the bot has already posted.
//!
//! The ledger is a set of opaque keys (`fixture-<id>`,
//! `discussion-<YYYY-MM-DD>`). It only ever grows. Every insertion rewrites
//! the whole set through the [`LedgerStore`], so the persisted state matches
//! memory as soon as [`Ledger::record`] returns.

use std::collections::BTreeSet;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use snafu::{ResultExt as _, Snafu};
use time::Date;
use time::macros::format_description;
use tracing::debug;

const LOG_TARGET: &str = "matchbot::ledger";

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum LedgerError {
    #[snafu(display("Could not read ledger {}: {source}", path.display()))]
    Read { path: PathBuf, source: io::Error },
    #[snafu(display("Could not write ledger {}: {source}", path.display()))]
    Write { path: PathBuf, source: io::Error },
    #[snafu(display("Ledger database error: {source}"))]
    Database { source: redb::Error },
    #[snafu(display("Ledger task failed: {source}"))]
    Join { source: tokio::task::JoinError },
}

pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

pub fn fixture_key(fixture_id: u64) -> String {
    format!("fixture-{fixture_id}")
}

/// Discussions are keyed by the Monday of their week.
pub fn discussion_key(monday: Date) -> String {
    let date = monday
        .format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| monday.to_string());
    format!("discussion-{date}")
}

/// Where the key set lives between runs.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Missing storage is not an error: it means nothing was posted yet.
    async fn load(&self) -> LedgerResult<BTreeSet<String>>;

    /// Replace the persisted set with `keys`.
    async fn save(&self, keys: &BTreeSet<String>) -> LedgerResult<()>;
}

pub struct Ledger {
    store: Box<dyn LedgerStore>,
    keys: BTreeSet<String>,
}

impl Ledger {
    pub async fn load(store: Box<dyn LedgerStore>) -> LedgerResult<Self> {
        let keys = store.load().await?;
        debug!(target: LOG_TARGET, len = keys.len(), "Ledger loaded");
        Ok(Self { store, keys })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Insert `key` and persist the full set.
    ///
    /// The key stays in memory even if persisting fails, so this process
    /// will not post the same item twice either way.
    pub async fn record(&mut self, key: String) -> LedgerResult<()> {
        debug!(target: LOG_TARGET, %key, "Recording");
        self.keys.insert(key);
        self.store.save(&self.keys).await
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Newline separated keys in a plain text file.
#[derive(Debug, Clone)]
pub struct FileLedgerStore {
    path: PathBuf,
}

impl FileLedgerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl LedgerStore for FileLedgerStore {
    async fn load(&self) -> LedgerResult<BTreeSet<String>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(BTreeSet::new()),
            res => res.context(ReadSnafu { path: &self.path })?,
        };

        Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_owned)
            .collect())
    }

    async fn save(&self, keys: &BTreeSet<String>) -> LedgerResult<()> {
        let content = keys.iter().map(String::as_str).collect::<Vec<_>>().join("\n");

        // Rename over the old file so a crash mid-write never leaves a
        // truncated ledger behind.
        let tmp_path = self.path.with_extension("tmp");
        tokio::fs::write(&tmp_path, content)
            .await
            .context(WriteSnafu { path: &tmp_path })?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .context(WriteSnafu { path: &self.path })?;
        Ok(())
    }
}

/// Shared in-memory store. Clones see the same set, which lets tests
/// reload a [`Ledger`] from "the same storage".
#[derive(Debug, Clone, Default)]
pub struct MemoryLedgerStore {
    keys: Arc<Mutex<BTreeSet<String>>>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> BTreeSet<String> {
        self.keys.lock().expect("Locking failed").clone()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn load(&self) -> LedgerResult<BTreeSet<String>> {
        Ok(self.snapshot())
    }

    async fn save(&self, keys: &BTreeSet<String>) -> LedgerResult<()> {
        *self.keys.lock().expect("Locking failed") = keys.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;

    #[test]
    fn key_shapes() {
        assert_eq!(fixture_key(501), "fixture-501");
        assert_eq!(discussion_key(date!(2026 - 10 - 12)), "discussion-2026-10-12");
        assert_eq!(discussion_key(date!(2026 - 01 - 05)), "discussion-2026-01-05");
    }

    #[test_log::test(tokio::test)]
    async fn recorded_key_survives_reload() {
        let store = MemoryLedgerStore::new();
        let mut ledger = Ledger::load(Box::new(store.clone())).await.unwrap();
        assert!(ledger.is_empty());

        ledger.record(fixture_key(501)).await.unwrap();
        assert!(ledger.contains("fixture-501"));

        let reloaded = Ledger::load(Box::new(store)).await.unwrap();
        assert!(reloaded.contains("fixture-501"));
        assert_eq!(reloaded.len(), 1);
    }

    #[test_log::test(tokio::test)]
    async fn missing_file_is_empty_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileLedgerStore::new(dir.path().join("posted.txt"));
        let ledger = Ledger::load(Box::new(store)).await.unwrap();
        assert!(ledger.is_empty());
    }

    #[test_log::test(tokio::test)]
    async fn file_store_rewrites_whole_set() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("posted.txt");
        std::fs::write(&path, "fixture-1\n\n  discussion-2026-10-12 \n").unwrap();

        let mut ledger = Ledger::load(Box::new(FileLedgerStore::new(&path)))
            .await
            .unwrap();
        assert!(ledger.contains("fixture-1"));
        assert!(ledger.contains("discussion-2026-10-12"));

        ledger.record(fixture_key(2)).await.unwrap();

        let mut lines: Vec<String> = std::fs::read_to_string(&path)
            .unwrap()
            .lines()
            .map(str::to_owned)
            .collect();
        lines.sort();
        assert_eq!(
            lines,
            vec!["discussion-2026-10-12", "fixture-1", "fixture-2"]
        );
        assert!(!dir.path().join("posted.tmp").exists());
    }

    #[test_log::test(tokio::test)]
    async fn unreadable_ledger_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("posted.txt");
        std::fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();

        let res = Ledger::load(Box::new(FileLedgerStore::new(&path))).await;
        assert!(matches!(res, Err(LedgerError::Read { .. })));
    }
}
