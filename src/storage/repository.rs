use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::{
    Expense, ExpenseId, Participant, ParticipantId, Trip, TripId, User, UserId,
};

use super::MIGRATION_001_INITIAL;

/// True when `err` was raised by a UNIQUE constraint, such as a second account
/// for an email that is already registered.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<sqlx::Error>(),
        Some(sqlx::Error::Database(db)) if db.is_unique_violation()
    )
}

/// Repository for persisting and querying users, trips, participants and expenses.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations. Safe to run on an existing database.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    // ========================
    // User operations
    // ========================

    pub async fn save_user(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, email_normalized, password_hash, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user.id.to_string())
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.email.to_lowercase())
        .bind(&user.password_hash)
        .bind(user.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save user")?;
        Ok(())
    }

    pub async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let row = sqlx::query(
            "SELECT id, name, email, password_hash, created_at FROM users WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch user")?;

        row.as_ref().map(Self::row_to_user).transpose()
    }

    /// Email lookup is case-insensitive.
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            "SELECT id, name, email, password_hash, created_at FROM users WHERE email_normalized = ?",
        )
        .bind(email.trim().to_lowercase())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch user by email")?;

        row.as_ref().map(Self::row_to_user).transpose()
    }

    fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
        Ok(User {
            id: parse_uuid(row.get("id"), "user ID")?,
            name: row.get("name"),
            email: row.get("email"),
            password_hash: row.get("password_hash"),
            created_at: parse_timestamp(row.get("created_at"))?,
        })
    }

    // ========================
    // Trip operations
    // ========================

    pub async fn save_trip(&self, trip: &Trip) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO trips (id, owner_id, name, destination, description, currency, start_date, end_date, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(trip.id.to_string())
        .bind(trip.owner_id.to_string())
        .bind(&trip.name)
        .bind(&trip.destination)
        .bind(&trip.description)
        .bind(&trip.currency)
        .bind(trip.start_date.to_string())
        .bind(trip.end_date.to_string())
        .bind(trip.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save trip")?;
        Ok(())
    }

    pub async fn update_trip(&self, trip: &Trip) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE trips
            SET name = ?, destination = ?, description = ?, currency = ?, start_date = ?, end_date = ?
            WHERE id = ?
            "#,
        )
        .bind(&trip.name)
        .bind(&trip.destination)
        .bind(&trip.description)
        .bind(&trip.currency)
        .bind(trip.start_date.to_string())
        .bind(trip.end_date.to_string())
        .bind(trip.id.to_string())
        .execute(&self.pool)
        .await
        .context("Failed to update trip")?;
        Ok(())
    }

    pub async fn get_trip(&self, id: TripId) -> Result<Option<Trip>> {
        let row = sqlx::query(
            r#"
            SELECT id, owner_id, name, destination, description, currency, start_date, end_date, created_at
            FROM trips
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch trip")?;

        row.as_ref().map(Self::row_to_trip).transpose()
    }

    /// Trips owned by `owner`, soonest first.
    pub async fn list_trips_by_owner(&self, owner: UserId) -> Result<Vec<Trip>> {
        let rows = sqlx::query(
            r#"
            SELECT id, owner_id, name, destination, description, currency, start_date, end_date, created_at
            FROM trips
            WHERE owner_id = ?
            ORDER BY start_date, created_at
            "#,
        )
        .bind(owner.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list trips")?;

        rows.iter().map(Self::row_to_trip).collect()
    }

    /// Delete a trip together with its participants and expenses.
    pub async fn delete_trip(&self, id: TripId) -> Result<()> {
        let id = id.to_string();
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        sqlx::query("DELETE FROM expenses WHERE trip_id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete trip expenses")?;
        sqlx::query("DELETE FROM participants WHERE trip_id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete trip participants")?;
        sqlx::query("DELETE FROM trips WHERE id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete trip")?;

        tx.commit().await.context("Failed to commit trip deletion")?;
        Ok(())
    }

    fn row_to_trip(row: &sqlx::sqlite::SqliteRow) -> Result<Trip> {
        Ok(Trip {
            id: parse_uuid(row.get("id"), "trip ID")?,
            owner_id: parse_uuid(row.get("owner_id"), "owner ID")?,
            name: row.get("name"),
            destination: row.get("destination"),
            description: row.get("description"),
            currency: row.get("currency"),
            start_date: parse_date(row.get("start_date"))?,
            end_date: parse_date(row.get("end_date"))?,
            created_at: parse_timestamp(row.get("created_at"))?,
        })
    }

    // ========================
    // Participant operations
    // ========================

    /// Save a participant at the end of its trip's roster.
    pub async fn save_participant(&self, participant: &Participant) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO participants (id, trip_id, position, name, email, created_at)
            VALUES (?, ?, (SELECT COALESCE(MAX(position), 0) + 1 FROM participants WHERE trip_id = ?), ?, ?, ?)
            "#,
        )
        .bind(participant.id.to_string())
        .bind(participant.trip_id.to_string())
        .bind(participant.trip_id.to_string())
        .bind(&participant.name)
        .bind(&participant.email)
        .bind(participant.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save participant")?;
        Ok(())
    }

    pub async fn update_participant(&self, participant: &Participant) -> Result<()> {
        sqlx::query("UPDATE participants SET name = ?, email = ? WHERE id = ?")
            .bind(&participant.name)
            .bind(&participant.email)
            .bind(participant.id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to update participant")?;
        Ok(())
    }

    pub async fn get_participant(&self, id: ParticipantId) -> Result<Option<Participant>> {
        let row = sqlx::query(
            "SELECT id, trip_id, name, email, created_at FROM participants WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch participant")?;

        row.as_ref().map(Self::row_to_participant).transpose()
    }

    /// Participants of a trip in the order they were added.
    pub async fn list_participants(&self, trip_id: TripId) -> Result<Vec<Participant>> {
        let rows = sqlx::query(
            r#"
            SELECT id, trip_id, name, email, created_at
            FROM participants
            WHERE trip_id = ?
            ORDER BY position
            "#,
        )
        .bind(trip_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list participants")?;

        rows.iter().map(Self::row_to_participant).collect()
    }

    fn row_to_participant(row: &sqlx::sqlite::SqliteRow) -> Result<Participant> {
        Ok(Participant {
            id: parse_uuid(row.get("id"), "participant ID")?,
            trip_id: parse_uuid(row.get("trip_id"), "trip ID")?,
            name: row.get("name"),
            email: row.get("email"),
            created_at: parse_timestamp(row.get("created_at"))?,
        })
    }

    // ========================
    // Expense operations
    // ========================

    pub async fn save_expense(&self, expense: &Expense) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO expenses (id, trip_id, payer_id, amount_cents, description, date, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(expense.id.to_string())
        .bind(expense.trip_id.to_string())
        .bind(expense.payer_id.to_string())
        .bind(expense.amount_cents)
        .bind(&expense.description)
        .bind(expense.date.to_string())
        .bind(expense.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save expense")?;
        Ok(())
    }

    pub async fn update_expense(&self, expense: &Expense) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE expenses
            SET payer_id = ?, amount_cents = ?, description = ?, date = ?
            WHERE id = ?
            "#,
        )
        .bind(expense.payer_id.to_string())
        .bind(expense.amount_cents)
        .bind(&expense.description)
        .bind(expense.date.to_string())
        .bind(expense.id.to_string())
        .execute(&self.pool)
        .await
        .context("Failed to update expense")?;
        Ok(())
    }

    pub async fn get_expense(&self, id: ExpenseId) -> Result<Option<Expense>> {
        let row = sqlx::query(
            r#"
            SELECT id, trip_id, payer_id, amount_cents, description, date, created_at
            FROM expenses
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch expense")?;

        row.as_ref().map(Self::row_to_expense).transpose()
    }

    /// Expenses of a trip ordered by date, then by recording time.
    pub async fn list_expenses(&self, trip_id: TripId) -> Result<Vec<Expense>> {
        let rows = sqlx::query(
            r#"
            SELECT id, trip_id, payer_id, amount_cents, description, date, created_at
            FROM expenses
            WHERE trip_id = ?
            ORDER BY date, created_at
            "#,
        )
        .bind(trip_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list expenses")?;

        rows.iter().map(Self::row_to_expense).collect()
    }

    pub async fn delete_expense(&self, id: ExpenseId) -> Result<()> {
        sqlx::query("DELETE FROM expenses WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete expense")?;
        Ok(())
    }

    fn row_to_expense(row: &sqlx::sqlite::SqliteRow) -> Result<Expense> {
        Ok(Expense {
            id: parse_uuid(row.get("id"), "expense ID")?,
            trip_id: parse_uuid(row.get("trip_id"), "trip ID")?,
            payer_id: parse_uuid(row.get("payer_id"), "payer ID")?,
            amount_cents: row.get("amount_cents"),
            description: row.get("description"),
            date: parse_date(row.get("date"))?,
            created_at: parse_timestamp(row.get("created_at"))?,
        })
    }
}

fn parse_uuid(value: String, what: &str) -> Result<Uuid> {
    Uuid::parse_str(&value).with_context(|| format!("Invalid {}: {}", what, value))
}

fn parse_date(value: String) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(&value, "%Y-%m-%d")
        .with_context(|| format!("Invalid date: {}", value))
}

fn parse_timestamp(value: String) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(&value)
        .with_context(|| format!("Invalid timestamp: {}", value))?
        .with_timezone(&Utc))
}
