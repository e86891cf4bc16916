use std::path::Path;

use chrono::{Duration, NaiveDateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::models::session::parse_lesson_time;
use crate::models::{Booking, NewBooking, NewUser, Payment, User};

#[derive(Clone, Debug)]
pub struct Database {
    pub pool: SqlitePool,
}

/// Storage failures are unrecoverable for the current request; the dialogue
/// reports a generic error and the user may retry.
#[derive(Debug)]
pub enum StorageError {
    Database(String),
    Io(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Database(e) => write!(f, "Database error: {}", e),
            StorageError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        StorageError::Database(err.to_string())
    }
}

impl Database {
    /// Opens (and lazily creates) the SQLite file together with its parent
    /// directory.
    pub async fn new(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| StorageError::Io(e.to_string()))?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Ok(Database { pool })
    }

    pub async fn init(&self) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                transport_id INTEGER NOT NULL UNIQUE,
                username TEXT,
                first_name TEXT,
                last_name TEXT,
                locale TEXT,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS bookings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users (id),
                full_name TEXT NOT NULL,
                contact TEXT NOT NULL,
                preferred_date TEXT NOT NULL,
                notes TEXT,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS payments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                booking_id INTEGER NOT NULL REFERENCES bookings (id) ON DELETE CASCADE,
                file_ref TEXT NOT NULL,
                file_unique_ref TEXT,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS content (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_bookings_user_id ON bookings (user_id)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_payments_booking_id ON payments (booking_id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Idempotent upsert keyed by transport id; returns the internal user id.
    pub async fn upsert_user(&self, user: &NewUser) -> Result<i64, StorageError> {
        sqlx::query(
            r#"
            INSERT INTO users (transport_id, username, first_name, last_name, locale, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT (transport_id) DO UPDATE SET
                username = excluded.username,
                first_name = excluded.first_name,
                last_name = excluded.last_name,
                locale = excluded.locale
            "#,
        )
        .bind(user.transport_id)
        .bind(&user.username)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.locale)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let id: i64 = sqlx::query_scalar("SELECT id FROM users WHERE transport_id = ?1")
            .bind(user.transport_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(id)
    }

    pub async fn get_user(&self, transport_id: i64) -> Result<Option<User>, StorageError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE transport_id = ?1")
            .bind(transport_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Inserts a finalized booking and returns its id. With
    /// `reuse_previous_time` the supplied date is ignored and the user's most
    /// recent prior booking time is copied instead.
    pub async fn create_booking(
        &self,
        booking: &NewBooking,
        reuse_previous_time: bool,
    ) -> Result<i64, StorageError> {
        let mut preferred_date = booking.preferred_date.clone();
        if reuse_previous_time {
            if let Some(previous) = self.last_booking(booking.user_id).await? {
                preferred_date = previous.preferred_date;
            }
        }

        let result = sqlx::query(
            r#"
            INSERT INTO bookings (user_id, full_name, contact, preferred_date, notes, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(booking.user_id)
        .bind(&booking.full_name)
        .bind(&booking.contact)
        .bind(&preferred_date)
        .bind(&booking.notes)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Attaches a payment screenshot to an already-finalized booking.
    pub async fn save_payment(
        &self,
        booking_id: i64,
        file_ref: &str,
        file_unique_ref: Option<&str>,
    ) -> Result<i64, StorageError> {
        let result = sqlx::query(
            "INSERT INTO payments (booking_id, file_ref, file_unique_ref, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(booking_id)
        .bind(file_ref)
        .bind(file_unique_ref)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn get_content(&self, key: &str, default: &str) -> Result<String, StorageError> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM content WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(value.unwrap_or_else(|| default.to_string()))
    }

    pub async fn set_content(&self, key: &str, value: &str) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO content (key, value) VALUES (?1, ?2)
            ON CONFLICT (key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Write-if-absent, used to seed defaults without clobbering edits.
    pub async fn seed_content(&self, key: &str, value: &str) -> Result<(), StorageError> {
        sqlx::query("INSERT OR IGNORE INTO content (key, value) VALUES (?1, ?2)")
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Transport ids of every known user for broadcast fan-out, newest-first
    /// like every other listing.
    pub async fn list_user_ids(&self) -> Result<Vec<i64>, StorageError> {
        let ids = sqlx::query_scalar(
            "SELECT transport_id FROM users ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    /// Bookings newest-first, optionally for one user only.
    pub async fn list_bookings(&self, user_id: Option<i64>) -> Result<Vec<Booking>, StorageError> {
        let bookings = match user_id {
            Some(user_id) => {
                sqlx::query_as::<_, Booking>(
                    "SELECT * FROM bookings WHERE user_id = ?1 ORDER BY created_at DESC, id DESC",
                )
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Booking>(
                    "SELECT * FROM bookings ORDER BY created_at DESC, id DESC",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(bookings)
    }

    pub async fn list_payments(
        &self,
        booking_id: Option<i64>,
    ) -> Result<Vec<Payment>, StorageError> {
        let payments = match booking_id {
            Some(booking_id) => {
                sqlx::query_as::<_, Payment>(
                    "SELECT * FROM payments WHERE booking_id = ?1 ORDER BY created_at DESC, id DESC",
                )
                .bind(booking_id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Payment>(
                    "SELECT * FROM payments ORDER BY created_at DESC, id DESC",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(payments)
    }

    /// The user's most recent booking, if any.
    pub async fn last_booking(&self, user_id: i64) -> Result<Option<Booking>, StorageError> {
        let booking = sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings WHERE user_id = ?1 ORDER BY created_at DESC, id DESC LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(booking)
    }

    /// Removes the booking at `index` in the user's newest-first listing and
    /// returns the removed record.
    pub async fn remove_booking_by_index(
        &self,
        user_id: i64,
        index: usize,
    ) -> Result<Option<Booking>, StorageError> {
        let bookings = self.list_bookings(Some(user_id)).await?;
        let Some(booking) = bookings.into_iter().nth(index) else {
            return Ok(None);
        };

        sqlx::query("DELETE FROM bookings WHERE id = ?1")
            .bind(booking.id)
            .execute(&self.pool)
            .await?;

        Ok(Some(booking))
    }

    /// Removes finalized bookings whose lesson time predates the retention
    /// cutoff relative to the caller-supplied `now`. Bookings with a date
    /// that no longer parses are left alone. Running twice yields the same
    /// remaining set.
    pub async fn cleanup_expired_bookings(
        &self,
        now: NaiveDateTime,
        retention_days: i64,
    ) -> Result<u64, StorageError> {
        let cutoff = now - Duration::days(retention_days);

        let expired: Vec<i64> = self
            .list_bookings(None)
            .await?
            .into_iter()
            .filter(|b| matches!(parse_lesson_time(&b.preferred_date), Some(t) if t < cutoff))
            .map(|b| b.id)
            .collect();

        let mut tx = self.pool.begin().await?;
        for id in &expired {
            sqlx::query("DELETE FROM bookings WHERE id = ?1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        Ok(expired.len() as u64)
    }
}
