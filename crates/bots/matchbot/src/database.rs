//! redb-backed [`LedgerStore`].

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use redb::{ReadableTable as _, TableDefinition};
use snafu::ResultExt as _;
use time::OffsetDateTime;
use tracing::debug;

use crate::ledger::{DatabaseSnafu, JoinSnafu, LedgerResult, LedgerStore};

const LOG_TARGET: &str = "matchbot::database";

/// Key: ledger key. Value: unix time the key was first recorded.
const POSTED_TABLE: TableDefinition<&str, i64> = TableDefinition::new("matchbot::posted");

#[derive(Debug, Clone)]
pub struct RedbLedgerStore {
    db: Arc<redb::Database>,
}

impl RedbLedgerStore {
    /// Open (or create) the database at `path` and make sure the table
    /// exists.
    pub async fn open(path: impl Into<PathBuf>) -> LedgerResult<Self> {
        let path = path.into();
        let db = tokio::task::spawn_blocking(move || -> Result<redb::Database, redb::Error> {
            let db = redb::Database::create(&path)?;
            {
                let write_txn = db.begin_write()?;
                // Opening the table in a write transaction creates it
                let _ = write_txn.open_table(POSTED_TABLE)?;
                write_txn.commit()?;
            }
            debug!(target: LOG_TARGET, path = %path.display(), "Database opened");
            Ok(db)
        })
        .await
        .context(JoinSnafu)?
        .context(DatabaseSnafu)?;

        Ok(Self { db: Arc::new(db) })
    }
}

fn read_keys(db: &redb::Database) -> Result<BTreeSet<String>, redb::Error> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(POSTED_TABLE)?;

    let mut keys = BTreeSet::new();
    for entry in table.iter()? {
        let (key, _recorded_at) = entry?;
        keys.insert(key.value().to_owned());
    }
    Ok(keys)
}

fn insert_missing(
    db: &redb::Database,
    keys: &BTreeSet<String>,
    now: i64,
) -> Result<usize, redb::Error> {
    let write_txn = db.begin_write()?;
    let mut inserted = 0;
    {
        let mut table = write_txn.open_table(POSTED_TABLE)?;
        for key in keys {
            if table.get(key.as_str())?.is_none() {
                table.insert(key.as_str(), now)?;
                inserted += 1;
            }
        }
    }
    write_txn.commit()?;
    Ok(inserted)
}

#[async_trait]
impl LedgerStore for RedbLedgerStore {
    async fn load(&self) -> LedgerResult<BTreeSet<String>> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || read_keys(&db))
            .await
            .context(JoinSnafu)?
            .context(DatabaseSnafu)
    }

    /// The ledger never shrinks, so saving only has to add the keys the
    /// table does not have yet.
    async fn save(&self, keys: &BTreeSet<String>) -> LedgerResult<()> {
        let db = self.db.clone();
        let keys = keys.clone();
        let now = OffsetDateTime::now_utc().unix_timestamp();

        let inserted = tokio::task::spawn_blocking(move || insert_missing(&db, &keys, now))
            .await
            .context(JoinSnafu)?
            .context(DatabaseSnafu)?;
        debug!(target: LOG_TARGET, inserted, "Ledger saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{Ledger, discussion_key, fixture_key};

    #[test_log::test(tokio::test)]
    async fn keys_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("matchbot.redb");

        {
            let store = RedbLedgerStore::open(&path).await.unwrap();
            let mut ledger = Ledger::load(Box::new(store)).await.unwrap();
            assert!(ledger.is_empty());
            ledger.record(fixture_key(501)).await.unwrap();
            ledger
                .record(discussion_key(time::macros::date!(2026 - 10 - 12)))
                .await
                .unwrap();
        }

        let store = RedbLedgerStore::open(&path).await.unwrap();
        let ledger = Ledger::load(Box::new(store)).await.unwrap();
        assert_eq!(ledger.len(), 2);
        assert!(ledger.contains("fixture-501"));
        assert!(ledger.contains("discussion-2026-10-12"));
    }
}
