//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the FrontierStore trait.
//!
//! Connections come from an r2d2 pool; each operation checks one out, runs a
//! single transaction and hands it back, so nothing is held across a fetch
//! and several processes can share one file. Write transactions start with
//! `BEGIN IMMEDIATE`; the database write lock serialises claims, which is what
//! makes `claim_one` exclusive. Every claim carries a token, and operations on
//! a claimed URL only apply while that token is still the current one.

use crate::state::{UrlStatus, DEFAULT_RETRY_THRESHOLD};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{FrontierStore, StorageError, StorageResult};
use crate::storage::{Claim, Document, FailureRecord, FrontierEntry, NewDocument};
use chrono::{SecondsFormat, Utc};
use r2d2::{ManageConnection, Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension, Transaction, TransactionBehavior};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

/// Default wait for another connection's write lock
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Default number of pooled connections
pub const DEFAULT_POOL_SIZE: u32 = 8;

/// SQLite storage backend
#[derive(Clone)]
pub struct SqliteStore {
    path: PathBuf,
    pool: Pool<SqliteConnectionManager>,
    retry_threshold: u32,
}

impl fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteStore")
            .field("path", &self.path)
            .field("pool_size", &self.pool.max_size())
            .field("retry_threshold", &self.retry_threshold)
            .finish()
    }
}

impl SqliteStore {
    /// Opens (or creates) the database at `path` with default pool settings
    pub fn open(path: &Path) -> StorageResult<Self> {
        Self::open_with(path, DEFAULT_BUSY_TIMEOUT, DEFAULT_POOL_SIZE)
    }

    /// Opens (or creates) the database at `path`
    ///
    /// Switches the file to WAL mode, creates missing tables and builds a
    /// pool of at most `pool_size` connections, each waiting up to
    /// `busy_timeout` for the write lock. Errors here mean the store is
    /// unusable.
    pub fn open_with(path: &Path, busy_timeout: Duration, pool_size: u32) -> StorageResult<Self> {
        let manager = SqliteConnectionManager::file(path).with_init(move |conn| {
            conn.busy_timeout(busy_timeout)?;
            conn.execute_batch("PRAGMA synchronous = NORMAL;")
        });

        // Schema setup uses its own connection so a bad path fails immediately
        let conn = manager.connect()?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        initialize_schema(&conn)?;
        drop(conn);

        let pool = Pool::builder()
            .max_size(pool_size)
            .min_idle(Some(1))
            .build(manager)?;

        Ok(Self {
            path: path.to_path_buf(),
            pool,
            retry_threshold: DEFAULT_RETRY_THRESHOLD,
        })
    }

    /// Sets the number of failures after which a URL becomes FAILED
    pub fn with_retry_threshold(mut self, retry_threshold: u32) -> Self {
        self.retry_threshold = retry_threshold;
        self
    }

    pub fn retry_threshold(&self) -> u32 {
        self.retry_threshold
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Checks out a connection for a single operation
    fn connect(&self) -> StorageResult<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    /// Runs `op` inside an immediate (write-locked) transaction
    fn write<T>(&self, op: impl FnOnce(&Transaction<'_>) -> StorageResult<T>) -> StorageResult<T> {
        let mut conn = self.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = op(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}

fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_status(raw: &str) -> StorageResult<UrlStatus> {
    UrlStatus::from_db_string(raw).ok_or_else(|| StorageError::InvalidStatus(raw.to_string()))
}

fn enqueue_in(tx: &Transaction<'_>, urls: &[String]) -> StorageResult<usize> {
    let mut stmt = tx.prepare_cached(
        "INSERT INTO url_queue (url, status) VALUES (?1, ?2) ON CONFLICT(url) DO NOTHING",
    )?;

    let mut inserted = 0;
    for url in urls {
        inserted += stmt.execute(params![url, UrlStatus::Pending.to_db_string()])?;
    }
    Ok(inserted)
}

fn insert_document_in(tx: &Transaction<'_>, document: &NewDocument) -> StorageResult<String> {
    let id = Uuid::new_v4().to_string();
    tx.execute(
        "INSERT INTO documents (id, title, content, url, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            id,
            document.title,
            document.content,
            document.url,
            now_timestamp()
        ],
    )?;
    Ok(id)
}

/// Retry count of the claimed row, or `ClaimLost` if `claim` is stale
fn held_retry_count(tx: &Transaction<'_>, claim: &Claim) -> StorageResult<u32> {
    tx.query_row(
        "SELECT retry_count FROM url_queue WHERE url = ?1 AND status = ?2 AND claim_id = ?3",
        params![
            claim.url,
            UrlStatus::InProgress.to_db_string(),
            claim.token
        ],
        |row| row.get::<_, u32>(0),
    )
    .optional()?
    .ok_or_else(|| StorageError::ClaimLost(claim.url.clone()))
}

/// Moves a held claim to `status`, or fails with `ClaimLost`
fn settle_claim_in(tx: &Transaction<'_>, claim: &Claim, status: UrlStatus) -> StorageResult<()> {
    let updated = tx.execute(
        "UPDATE url_queue SET status = ?1, claimed_at = NULL, claim_id = NULL
         WHERE url = ?2 AND status = ?3 AND claim_id = ?4",
        params![
            status.to_db_string(),
            claim.url,
            UrlStatus::InProgress.to_db_string(),
            claim.token
        ],
    )?;
    if updated == 0 {
        return Err(StorageError::ClaimLost(claim.url.clone()));
    }
    Ok(())
}

impl FrontierStore for SqliteStore {
    // ===== Frontier =====

    fn claim_one(&self) -> StorageResult<Option<Claim>> {
        let token = Uuid::new_v4().to_string();
        self.write(|tx| {
            let url = tx
                .query_row(
                    "UPDATE url_queue SET status = ?1, claimed_at = ?2, claim_id = ?3
                     WHERE url = (SELECT url FROM url_queue WHERE status = ?4 LIMIT 1)
                     RETURNING url",
                    params![
                        UrlStatus::InProgress.to_db_string(),
                        now_timestamp(),
                        token,
                        UrlStatus::Pending.to_db_string()
                    ],
                    |row| row.get::<_, String>(0),
                )
                .optional()?;
            Ok(url.map(|url| Claim { url, token }))
        })
    }

    fn enqueue(&self, urls: &[String]) -> StorageResult<usize> {
        if urls.is_empty() {
            return Ok(0);
        }
        self.write(|tx| enqueue_in(tx, urls))
    }

    fn mark_completed(&self, url: &str) -> StorageResult<()> {
        let updated = self.write(|tx| {
            Ok(tx.execute(
                "UPDATE url_queue SET status = ?1, claimed_at = NULL, claim_id = NULL WHERE url = ?2",
                params![UrlStatus::Completed.to_db_string(), url],
            )?)
        })?;
        if updated == 0 {
            return Err(StorageError::NotFound(url.to_string()));
        }
        Ok(())
    }

    fn mark_failed(&self, claim: &Claim, reason: &str) -> StorageResult<FailureRecord> {
        self.write(|tx| {
            let retry_count = held_retry_count(tx, claim)? + 1;
            let status = UrlStatus::after_failure(retry_count, self.retry_threshold);

            tx.execute(
                "UPDATE url_queue
                 SET status = ?1, retry_count = ?2, fail_reason = ?3,
                     claimed_at = NULL, claim_id = NULL
                 WHERE url = ?4",
                params![status.to_db_string(), retry_count, reason, claim.url],
            )?;

            Ok(FailureRecord {
                status,
                retry_count,
            })
        })
    }

    fn release(&self, claim: &Claim) -> StorageResult<()> {
        self.write(|tx| settle_claim_in(tx, claim, UrlStatus::Pending))
    }

    fn requeue_expired(&self, lease: Duration) -> StorageResult<usize> {
        let cutoff = chrono::Duration::from_std(lease)
            .ok()
            .and_then(|lease| Utc::now().checked_sub_signed(lease));

        // A lease longer than the representable past cannot have expired
        let Some(cutoff) = cutoff else {
            return Ok(0);
        };
        let cutoff = cutoff.to_rfc3339_opts(SecondsFormat::Millis, true);

        self.write(|tx| {
            Ok(tx.execute(
                "UPDATE url_queue SET status = ?1, claimed_at = NULL, claim_id = NULL
                 WHERE status = ?2 AND (claimed_at IS NULL OR claimed_at < ?3)",
                params![
                    UrlStatus::Pending.to_db_string(),
                    UrlStatus::InProgress.to_db_string(),
                    cutoff
                ],
            )?)
        })
    }

    // ===== Documents =====

    fn record_page(
        &self,
        claim: &Claim,
        links: &[String],
        document: &NewDocument,
    ) -> StorageResult<usize> {
        self.write(|tx| {
            let inserted = enqueue_in(tx, links)?;
            insert_document_in(tx, document)?;
            // On error the dropped transaction rolls back the links and document
            settle_claim_in(tx, claim, UrlStatus::Completed)?;
            Ok(inserted)
        })
    }

    // ===== Inspection =====

    fn get_entry(&self, url: &str) -> StorageResult<Option<FrontierEntry>> {
        let conn = self.connect()?;
        let row = conn
            .query_row(
                "SELECT url, status, retry_count, fail_reason, claimed_at
                 FROM url_queue WHERE url = ?1",
                params![url],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, u32>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, Option<String>>(4)?,
                    ))
                },
            )
            .optional()?;

        row.map(|(url, status, retry_count, fail_reason, claimed_at)| {
            Ok(FrontierEntry {
                url,
                status: parse_status(&status)?,
                retry_count,
                fail_reason,
                claimed_at,
            })
        })
        .transpose()
    }

    fn count_by_status(&self, status: UrlStatus) -> StorageResult<u64> {
        let conn = self.connect()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM url_queue WHERE status = ?1",
            params![status.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_documents(&self) -> StorageResult<u64> {
        let conn = self.connect()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn documents_for_url(&self, url: &str) -> StorageResult<Vec<Document>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT id, title, content, url, created_at FROM documents
             WHERE url = ?1 ORDER BY created_at ASC",
        )?;

        let documents = stmt
            .query_map(params![url], |row| {
                Ok(Document {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    content: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    url: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                    created_at: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(documents)
    }

    fn top_fail_reasons(&self, limit: usize) -> StorageResult<Vec<(String, u64)>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT fail_reason, COUNT(*) AS count FROM url_queue
             WHERE fail_reason IS NOT NULL
             GROUP BY fail_reason
             ORDER BY count DESC, fail_reason ASC
             LIMIT ?1",
        )?;

        let reasons = stmt
            .query_map(params![limit as i64], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(reasons)
    }
}
