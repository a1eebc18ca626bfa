//! Ledger persistence: statements, transactions and read-side aggregation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, ToSql};

use crate::error::TollError;
use crate::types::{KeyTotal, ProviderId, StatementMetadata, TollTransaction};

/// Persistence contract consumed by the orchestrator and the read-side
/// query surface.
pub trait Storage: Send + Sync {
    /// Insert-or-update keyed by `(provider, statement_date)`. Re-invocation
    /// with the same key refreshes file path and download timestamp and
    /// returns the same row id.
    fn upsert_statement(&self, statement: &StatementMetadata) -> Result<i64, TollError>;

    /// Atomically swap the statement's owned transaction set. On failure the
    /// previously stored set stays fully intact.
    fn replace_transactions(
        &self,
        statement_id: i64,
        transactions: &[TollTransaction],
    ) -> Result<(), TollError>;

    fn all_transactions(&self) -> Result<Vec<TollTransaction>, TollError>;

    /// Summed amounts per non-empty plate.
    fn summary_by_plate(&self) -> Result<Vec<KeyTotal>, TollError>;

    /// Summed amounts per non-empty transponder.
    fn summary_by_transponder(&self) -> Result<Vec<KeyTotal>, TollError>;
}

impl ToSql for ProviderId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for ProviderId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS statements (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    provider TEXT NOT NULL,
    statement_date TEXT NOT NULL,
    period_start TEXT,
    period_end TEXT,
    file_path TEXT NOT NULL,
    downloaded_at TEXT NOT NULL,
    UNIQUE (provider, statement_date)
);

CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    statement_id INTEGER NOT NULL REFERENCES statements(id) ON DELETE CASCADE,
    provider TEXT NOT NULL,
    statement_date TEXT NOT NULL,
    transaction_date TEXT NOT NULL,
    posted_date TEXT,
    plate TEXT,
    transponder TEXT,
    location TEXT,
    description TEXT,
    amount_cents INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_transactions_statement
    ON transactions (statement_id);
";

/// SQLite-backed [`Storage`].
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    pub fn open(path: &Path) -> Result<Self, TollError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::from_connection(Connection::open(path)?)
    }

    pub fn in_memory() -> Result<Self, TollError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, TollError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, TollError> {
        self.conn.lock().map_err(|_| TollError::StorageLock)
    }

    #[cfg(test)]
    fn statement_count(&self) -> usize {
        self.conn()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM statements", [], |row| row.get(0))
            .unwrap()
    }
}

fn summary_query(conn: &Connection, key_column: &str) -> Result<Vec<KeyTotal>, TollError> {
    let sql = format!(
        "SELECT {key}, SUM(amount_cents) FROM transactions
         WHERE {key} IS NOT NULL AND {key} != ''
         GROUP BY {key} ORDER BY {key}",
        key = key_column
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| {
        Ok(KeyTotal {
            key: row.get(0)?,
            amount_cents: row.get(1)?,
        })
    })?;

    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

impl Storage for SqliteStorage {
    fn upsert_statement(&self, statement: &StatementMetadata) -> Result<i64, TollError> {
        let conn = self.conn()?;
        let file_path = statement.file_path.to_string_lossy();

        conn.execute(
            "INSERT INTO statements
                (provider, statement_date, period_start, period_end, file_path, downloaded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (provider, statement_date) DO UPDATE SET
                period_start = excluded.period_start,
                period_end = excluded.period_end,
                file_path = excluded.file_path,
                downloaded_at = excluded.downloaded_at",
            params![
                statement.provider,
                statement.statement_date,
                statement.period_start,
                statement.period_end,
                file_path.as_ref(),
                statement.downloaded_at,
            ],
        )?;

        let id = conn.query_row(
            "SELECT id FROM statements WHERE provider = ?1 AND statement_date = ?2",
            params![statement.provider, statement.statement_date],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    fn replace_transactions(
        &self,
        statement_id: i64,
        transactions: &[TollTransaction],
    ) -> Result<(), TollError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            "DELETE FROM transactions WHERE statement_id = ?1",
            params![statement_id],
        )?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO transactions
                    (statement_id, provider, statement_date, transaction_date, posted_date,
                     plate, transponder, location, description, amount_cents)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;

            for txn in transactions {
                stmt.execute(params![
                    statement_id,
                    txn.provider,
                    txn.statement_date,
                    txn.transaction_date,
                    txn.posted_date,
                    txn.plate,
                    txn.transponder,
                    txn.location,
                    txn.description,
                    txn.amount_cents,
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn all_transactions(&self) -> Result<Vec<TollTransaction>, TollError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT provider, statement_date, transaction_date, posted_date,
                    plate, transponder, location, description, amount_cents
             FROM transactions
             ORDER BY transaction_date, id",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(TollTransaction {
                provider: row.get(0)?,
                statement_date: row.get(1)?,
                transaction_date: row.get(2)?,
                posted_date: row.get(3)?,
                plate: row.get(4)?,
                transponder: row.get(5)?,
                location: row.get(6)?,
                description: row.get(7)?,
                amount_cents: row.get(8)?,
            })
        })?;

        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn summary_by_plate(&self) -> Result<Vec<KeyTotal>, TollError> {
        summary_query(&*self.conn()?, "plate")
    }

    fn summary_by_transponder(&self) -> Result<Vec<KeyTotal>, TollError> {
        summary_query(&*self.conn()?, "transponder")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use std::path::PathBuf;

    fn statement(provider: ProviderId, date: NaiveDate) -> StatementMetadata {
        StatementMetadata {
            provider,
            statement_date: date,
            period_start: None,
            period_end: None,
            file_path: PathBuf::from(format!("/tmp/{}-{}.pdf", provider, date)),
            downloaded_at: Utc::now(),
        }
    }

    fn transaction(
        provider: ProviderId,
        statement_date: NaiveDate,
        plate: Option<&str>,
        transponder: Option<&str>,
        amount_cents: i64,
    ) -> TollTransaction {
        TollTransaction {
            provider,
            statement_date,
            transaction_date: statement_date,
            posted_date: None,
            plate: plate.map(Into::into),
            transponder: transponder.map(Into::into),
            location: None,
            description: Some("TOLL".into()),
            amount_cents,
        }
    }

    fn march() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    #[test]
    fn test_upsert_statement_is_idempotent() {
        let storage = SqliteStorage::in_memory().unwrap();

        let first = storage
            .upsert_statement(&statement(ProviderId::EzPassNy, march()))
            .unwrap();
        let mut updated = statement(ProviderId::EzPassNy, march());
        updated.file_path = PathBuf::from("/tmp/redownloaded.pdf");
        let second = storage.upsert_statement(&updated).unwrap();

        assert_eq!(first, second);
        assert_eq!(storage.statement_count(), 1);

        // A different key gets its own row.
        let other = storage
            .upsert_statement(&statement(ProviderId::DriveEzMd, march()))
            .unwrap();
        assert_ne!(first, other);
        assert_eq!(storage.statement_count(), 2);
    }

    #[test]
    fn test_replace_transactions_never_accumulates() {
        let storage = SqliteStorage::in_memory().unwrap();
        let id = storage
            .upsert_statement(&statement(ProviderId::EzPassNy, march()))
            .unwrap();

        let first_set = vec![
            transaction(ProviderId::EzPassNy, march(), Some("ABC123"), None, 450),
            transaction(ProviderId::EzPassNy, march(), Some("ABC123"), None, 200),
        ];
        storage.replace_transactions(id, &first_set).unwrap();
        assert_eq!(storage.all_transactions().unwrap().len(), 2);

        // Reprocessing a corrected document replaces the set wholesale.
        let corrected = vec![transaction(
            ProviderId::EzPassNy,
            march(),
            Some("XYZ987"),
            None,
            300,
        )];
        storage.replace_transactions(id, &corrected).unwrap();

        let stored = storage.all_transactions().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].plate.as_deref(), Some("XYZ987"));
        assert_eq!(stored[0].amount_cents, 300);
    }

    #[test]
    fn test_replace_failure_leaves_prior_set_intact() {
        let storage = SqliteStorage::in_memory().unwrap();
        let id = storage
            .upsert_statement(&statement(ProviderId::EzPassNy, march()))
            .unwrap();

        let original = vec![
            transaction(ProviderId::EzPassNy, march(), Some("ABC123"), None, 450),
            transaction(ProviderId::EzPassNy, march(), Some("ABC123"), None, 200),
        ];
        storage.replace_transactions(id, &original).unwrap();

        // A nonexistent statement id passes the delete but trips the foreign
        // key on insert; the whole replace rolls back.
        let result = storage.replace_transactions(
            id + 1,
            &[transaction(ProviderId::EzPassNy, march(), Some("XYZ987"), None, 300)],
        );
        assert!(matches!(result, Err(TollError::Storage(_))));

        let stored = storage.all_transactions().unwrap();
        assert_eq!(stored.len(), 2);
        assert!(stored.iter().all(|t| t.plate.as_deref() == Some("ABC123")));
    }

    #[test]
    fn test_transactions_round_trip_optional_fields() {
        let storage = SqliteStorage::in_memory().unwrap();
        let id = storage
            .upsert_statement(&statement(ProviderId::EzPassNy, march()))
            .unwrap();

        let mut txn = transaction(ProviderId::EzPassNy, march(), None, Some("TAG9"), -300);
        txn.posted_date = NaiveDate::from_ymd_opt(2024, 3, 3);
        storage.replace_transactions(id, &[txn.clone()]).unwrap();

        let stored = storage.all_transactions().unwrap();
        assert_eq!(stored, vec![txn]);
    }

    #[test]
    fn test_summaries_group_by_non_empty_key() {
        let storage = SqliteStorage::in_memory().unwrap();
        let id = storage
            .upsert_statement(&statement(ProviderId::DriveEzMd, march()))
            .unwrap();

        storage
            .replace_transactions(
                id,
                &[
                    transaction(ProviderId::DriveEzMd, march(), Some("ABC123"), Some("TAG9"), 450),
                    transaction(ProviderId::DriveEzMd, march(), Some("ABC123"), None, 200),
                    transaction(ProviderId::DriveEzMd, march(), None, Some("TAG9"), 100),
                ],
            )
            .unwrap();

        let by_plate = storage.summary_by_plate().unwrap();
        assert_eq!(
            by_plate,
            vec![KeyTotal {
                key: "ABC123".into(),
                amount_cents: 650,
            }]
        );

        let by_transponder = storage.summary_by_transponder().unwrap();
        assert_eq!(
            by_transponder,
            vec![KeyTotal {
                key: "TAG9".into(),
                amount_cents: 550,
            }]
        );
    }
}
