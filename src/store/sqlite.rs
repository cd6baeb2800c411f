//! SQLite repositories
//! Mission: Store users and their calculation history in one SQLite file

use crate::auth::models::{NewUser, User};
use crate::calculator::Operation;
use crate::models::{Calculation, CalculationStats, HistoryFilter, NewCalculation};
use crate::store::{CalculationRepository, Conflict, UserRepository};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, types::Type, Connection, ErrorCode, OptionalExtension, Row};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

const USER_COLUMNS: &str = "id, username, email, hashed_password, created_at, updated_at";
const CALC_COLUMNS: &str = "id, user_id, operation, operand1, operand2, result, created_at";

#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) the database at `db_path`. `":memory:"` gives a
    /// private in-memory database.
    pub fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).context("open app db")?;
        conn.pragma_update(None, "journal_mode", "WAL").ok();
        conn.pragma_update(None, "synchronous", "NORMAL").ok();

        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT UNIQUE NOT NULL,
                email TEXT UNIQUE NOT NULL,
                hashed_password TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS calculations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                operation TEXT NOT NULL,
                operand1 REAL NOT NULL,
                operand2 REAL NOT NULL,
                result REAL NOT NULL,
                created_at INTEGER NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id)
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_calculations_user_created ON calculations(user_id, created_at DESC)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_calculations_user_operation ON calculations(user_id, operation)",
            [],
        )?;

        info!("🗄️  App database ready at {}", db_path);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn in_memory() -> Result<Self> {
        Self::new(":memory:")
    }
}

fn millis_to_utc(idx: usize, ms: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Integer,
            format!("timestamp out of range: {ms}").into(),
        )
    })
}

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        hashed_password: row.get(3)?,
        created_at: millis_to_utc(4, row.get(4)?)?,
        updated_at: millis_to_utc(5, row.get(5)?)?,
    })
}

fn row_to_calculation(row: &Row<'_>) -> rusqlite::Result<Calculation> {
    let op: String = row.get(2)?;
    let operation = Operation::from_str(&op).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            Type::Text,
            format!("unknown operation: {op}").into(),
        )
    })?;

    Ok(Calculation {
        id: row.get(0)?,
        user_id: row.get(1)?,
        operation,
        operand1: row.get(3)?,
        operand2: row.get(4)?,
        result: row.get(5)?,
        created_at: millis_to_utc(6, row.get(6)?)?,
    })
}

/// Map a UNIQUE violation on `users` to the field that collided.
fn user_conflict(err: rusqlite::Error, context: &'static str) -> anyhow::Error {
    if let rusqlite::Error::SqliteFailure(ref failure, Some(ref msg)) = err {
        if failure.code == ErrorCode::ConstraintViolation {
            if msg.contains("users.username") {
                return Conflict::Username.into();
            }
            if msg.contains("users.email") {
                return Conflict::Email.into();
            }
        }
    }
    anyhow::Error::new(err).context(context)
}

fn query_user(conn: &Connection, clause: &str, value: &dyn rusqlite::ToSql) -> Result<Option<User>> {
    let mut stmt = conn.prepare_cached(&format!("SELECT {USER_COLUMNS} FROM users WHERE {clause}"))?;
    let user = stmt.query_row(params![value], row_to_user).optional()?;
    Ok(user)
}

#[async_trait]
impl UserRepository for SqliteStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.conn.lock().await;
        query_user(&conn, "username = ?1", &username)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        let conn = self.conn.lock().await;
        query_user(&conn, "id = ?1", &id)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn.lock().await;
        query_user(&conn, "email = ?1", &email)
    }

    async fn create(&self, user: NewUser) -> Result<User> {
        let now = Utc::now();
        let ts = now.timestamp_millis();
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO users (username, email, hashed_password, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![user.username, user.email, user.hashed_password, ts, ts],
        )
        .map_err(|e| user_conflict(e, "Failed to insert user"))?;

        let id = conn.last_insert_rowid();
        info!("✅ Created user: {} ({})", user.username, id);

        Ok(User {
            id,
            username: user.username,
            email: user.email,
            hashed_password: user.hashed_password,
            created_at: millis_to_utc(0, ts)?,
            updated_at: millis_to_utc(0, ts)?,
        })
    }

    async fn update(&self, user: &User) -> Result<User> {
        let updated_at = millis_to_utc(0, Utc::now().timestamp_millis())?;
        let conn = self.conn.lock().await;
        let rows = conn
            .execute(
                "UPDATE users SET username = ?1, email = ?2, hashed_password = ?3, updated_at = ?4
                 WHERE id = ?5",
                params![
                    user.username,
                    user.email,
                    user.hashed_password,
                    updated_at.timestamp_millis(),
                    user.id,
                ],
            )
            .map_err(|e| user_conflict(e, "Failed to update user"))?;

        if rows == 0 {
            anyhow::bail!("User not found");
        }

        Ok(User {
            updated_at,
            ..user.clone()
        })
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM calculations WHERE user_id = ?1", params![id])?;
        let rows = tx.execute("DELETE FROM users WHERE id = ?1", params![id])?;
        tx.commit()?;

        if rows > 0 {
            info!("🗑️  Deleted user: {}", id);
        }
        Ok(rows > 0)
    }
}

#[async_trait]
impl CalculationRepository for SqliteStore {
    async fn insert(&self, calc: NewCalculation) -> Result<Calculation> {
        let created_at = millis_to_utc(0, Utc::now().timestamp_millis())?;
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO calculations (user_id, operation, operand1, operand2, result, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                calc.user_id,
                calc.operation.as_str(),
                calc.operand1,
                calc.operand2,
                calc.result,
                created_at.timestamp_millis(),
            ],
        )
        .context("Failed to insert calculation")?;

        Ok(Calculation {
            id: conn.last_insert_rowid(),
            user_id: calc.user_id,
            operation: calc.operation,
            operand1: calc.operand1,
            operand2: calc.operand2,
            result: calc.result,
            created_at,
        })
    }

    async fn get(&self, user_id: i64, id: i64) -> Result<Option<Calculation>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {CALC_COLUMNS} FROM calculations WHERE id = ?1 AND user_id = ?2"
        ))?;
        let calc = stmt
            .query_row(params![id, user_id], row_to_calculation)
            .optional()?;
        Ok(calc)
    }

    async fn list(&self, user_id: i64, skip: i64, limit: i64) -> Result<Vec<Calculation>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {CALC_COLUMNS} FROM calculations WHERE user_id = ?1
             ORDER BY created_at DESC, id DESC LIMIT ?2 OFFSET ?3"
        ))?;
        let calcs = stmt
            .query_map(params![user_id, limit, skip], row_to_calculation)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(calcs)
    }

    async fn update(&self, calc: &Calculation) -> Result<()> {
        let conn = self.conn.lock().await;
        let rows = conn.execute(
            "UPDATE calculations SET operation = ?1, operand1 = ?2, operand2 = ?3, result = ?4
             WHERE id = ?5 AND user_id = ?6",
            params![
                calc.operation.as_str(),
                calc.operand1,
                calc.operand2,
                calc.result,
                calc.id,
                calc.user_id,
            ],
        )?;
        if rows == 0 {
            anyhow::bail!("Calculation not found");
        }
        Ok(())
    }

    async fn delete(&self, user_id: i64, id: i64) -> Result<bool> {
        let conn = self.conn.lock().await;
        let rows = conn.execute(
            "DELETE FROM calculations WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        Ok(rows > 0)
    }

    async fn history(
        &self,
        user_id: i64,
        filter: &HistoryFilter,
    ) -> Result<(Vec<Calculation>, i64)> {
        const WHERE: &str = "user_id = ?1
             AND (?2 IS NULL OR operation = ?2)
             AND (?3 IS NULL OR created_at >= ?3)
             AND (?4 IS NULL OR created_at <= ?4)";

        let op = filter.operation.map(|o| o.as_str());
        let start = filter.start_date.map(|d| d.timestamp_millis());
        let end = filter.end_date.map(|d| d.timestamp_millis());

        let conn = self.conn.lock().await;
        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM calculations WHERE {WHERE}"),
            params![user_id, op, start, end],
            |row| row.get(0),
        )?;

        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {CALC_COLUMNS} FROM calculations WHERE {WHERE}
             ORDER BY created_at DESC, id DESC LIMIT ?5 OFFSET ?6"
        ))?;
        let items = stmt
            .query_map(
                params![user_id, op, start, end, filter.limit, filter.offset],
                row_to_calculation,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok((items, total))
    }

    async fn stats(&self, user_id: i64) -> Result<CalculationStats> {
        let conn = self.conn.lock().await;

        let (total, average_result, latest): (i64, Option<f64>, Option<i64>) = conn.query_row(
            "SELECT COUNT(*), AVG(result), MAX(created_at) FROM calculations WHERE user_id = ?1",
            params![user_id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        let mut stmt = conn.prepare_cached(
            "SELECT operation, COUNT(*) FROM calculations WHERE user_id = ?1 GROUP BY operation",
        )?;
        let operation_counts = stmt
            .query_map(params![user_id], |row| {
                let op: String = row.get(0)?;
                let count: i64 = row.get(1)?;
                Ok((op, count))
            })?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .filter_map(|(op, count)| Operation::from_str(&op).map(|op| (op, count)))
            .collect();

        let latest_created_at = latest.map(|ms| millis_to_utc(2, ms)).transpose()?;

        Ok(CalculationStats {
            total,
            operation_counts,
            average_result,
            latest_created_at,
        })
    }

    async fn delete_all(&self, user_id: i64) -> Result<usize> {
        let conn = self.conn.lock().await;
        let rows = conn.execute(
            "DELETE FROM calculations WHERE user_id = ?1",
            params![user_id],
        )?;
        info!("🧹 Cleared {} calculations for user {}", rows, user_id);
        Ok(rows)
    }
}
