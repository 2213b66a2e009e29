//! Storage layer for attendance tracking.
//!
//! Provides persistence for the person registry, the attendance policy, and
//! the event log using `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! A `Database` instance can be moved between threads but cannot be shared
//! across threads without external synchronization. Separate processes may
//! open the same file: scans take an `IMMEDIATE` write lock, so two scanners
//! recording the same code serialize instead of both seeing "no arrival yet".
//!
//! # Schema
//!
//! ## Timestamp Format
//!
//! Event timestamps are local wall-clock time stored as TEXT with fixed-width
//! microseconds (e.g., `2025-03-03T07:00:00.000000`), so lexicographic order
//! matches chronological order and the first ten characters are the calendar
//! day. Registry bookkeeping (`created_at`, `updated_at`) is RFC 3339 UTC.
//!
//! ## Scan Codes
//!
//! Staff and students share one `people` table with a unique `code` column, so
//! a code can never name two people across categories. Events store the code
//! itself rather than a row reference; deleting a person keeps their history.
//! A partial unique index allows at most one arrival per code per day.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use attend_core::{
    AttendanceEvent, AttendancePolicy, AttendanceStore, DayBucket, EventKind, NewPerson, Person,
    PersonCategory, PersonDetails, PersonDirectory, PersonUpdate, ScanCode, ScanError,
    ScanOutcome, ScanRequest, Timeliness, ValidationError,
};
use chrono::{DateTime, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use rusqlite::{
    Connection, ErrorCode, OptionalExtension, Row, Transaction, TransactionBehavior, params,
};
use serde::Serialize;
use thiserror::Error;

const EVENT_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";
const POLICY_TIME_FORMAT: &str = "%H:%M:%S";
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const ONE_ARRIVAL_INDEX: &str = "idx_events_one_arrival_per_day";

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A domain value failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// A stored value could not be parsed back into its domain type.
    #[error("invalid {column} in {table} row {row_id}: {value}")]
    InvalidValue {
        table: &'static str,
        column: &'static str,
        row_id: i64,
        value: String,
    },
    /// The scan code is already held by someone.
    #[error("scan code already registered: {0}")]
    DuplicateCode(String),
    /// The registration number is already used within the category.
    #[error("{category} registration number already registered: {number}")]
    DuplicateRegistration {
        category: PersonCategory,
        number: String,
    },
    /// No person has the given registry identifier.
    #[error("person not found: {0}")]
    PersonNotFound(i64),
    /// An arrival for this code already exists on that day.
    #[error("arrival already recorded for {code} on {date}")]
    DuplicateArrival { code: String, date: String },
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// An event as stored, with its log identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredEvent {
    pub id: i64,
    #[serde(flatten)]
    pub event: AttendanceEvent,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS people (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                category TEXT NOT NULL CHECK (category IN ('staff', 'student')),
                name TEXT NOT NULL,
                code TEXT NOT NULL UNIQUE,
                registration_number TEXT,
                class_name TEXT,
                phone TEXT,
                email TEXT,
                address TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE (category, registration_number)
            );

            CREATE INDEX IF NOT EXISTS idx_people_category ON people(category);

            -- Singleton row: id is pinned to 1
            CREATE TABLE IF NOT EXISTS attendance_policy (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                arrival_window_start TEXT NOT NULL,
                arrival_window_end TEXT NOT NULL,
                departure_window_end TEXT NOT NULL,
                require_arrival_before_departure INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            -- Append-only event log
            -- code: scan code, matched by string against people.code
            -- timestamp: local time, e.g. '2025-03-03T07:00:00.000000'
            CREATE TABLE IF NOT EXISTS attendance_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                code TEXT NOT NULL,
                kind TEXT NOT NULL CHECK (kind IN ('arrival', 'departure')),
                timestamp TEXT NOT NULL,
                location TEXT NOT NULL,
                status TEXT NOT NULL CHECK (status IN ('on_time', 'late')),
                note TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_events_timestamp ON attendance_events(timestamp);
            CREATE INDEX IF NOT EXISTS idx_events_code_timestamp
                ON attendance_events(code, timestamp);
            CREATE UNIQUE INDEX IF NOT EXISTS idx_events_one_arrival_per_day
                ON attendance_events(code, substr(timestamp, 1, 10))
                WHERE kind = 'arrival';
            ",
        )?;
        Ok(())
    }

    // ========== People ==========

    /// Registers a person.
    pub fn add_person(&mut self, person: &NewPerson) -> Result<Person, DbError> {
        let now = format_timestamp(Utc::now());
        let details = &person.details;
        self.conn
            .execute(
                "
                INSERT INTO people
                (category, name, code, registration_number, class_name, phone, email, address, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ",
                params![
                    person.category.as_str(),
                    person.name,
                    person.code.as_str(),
                    details.registration_number,
                    details.class_name,
                    details.phone,
                    details.email,
                    details.address,
                    now,
                    now,
                ],
            )
            .map_err(|err| person_conflict(err, person.category, &person.code, details))?;

        let id = self.conn.last_insert_rowid();
        tracing::debug!(id, code = %person.code, category = %person.category, "registered person");
        self.get_person(id)?.ok_or(DbError::PersonNotFound(id))
    }

    /// Fetches a person by registry identifier.
    pub fn get_person(&self, id: i64) -> Result<Option<Person>, DbError> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {PERSON_COLUMNS} FROM people WHERE id = ?"),
                [id],
                PersonRow::from_row,
            )
            .optional()?;
        row.map(PersonRow::into_person).transpose()
    }

    /// Lists people ordered by category then name, optionally for one category.
    pub fn list_people(&self, category: Option<PersonCategory>) -> Result<Vec<Person>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "
            SELECT {PERSON_COLUMNS}
            FROM people
            WHERE ?1 IS NULL OR category = ?1
            ORDER BY category ASC, name ASC, id ASC
            "
        ))?;
        let rows = stmt.query_map([category.map(|c| c.as_str())], PersonRow::from_row)?;
        let mut people = Vec::new();
        for row in rows {
            people.push(row?.into_person()?);
        }
        Ok(people)
    }

    /// Maps every registered scan code to its person.
    pub fn people_by_code(&self) -> Result<HashMap<ScanCode, Person>, DbError> {
        Ok(self
            .list_people(None)?
            .into_iter()
            .map(|person| (person.code.clone(), person))
            .collect())
    }

    /// Counts people in a category.
    pub fn count_people(&self, category: PersonCategory) -> Result<usize, DbError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM people WHERE category = ?",
            [category.as_str()],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Applies an administrative edit. The scan code never changes.
    pub fn update_person(&mut self, id: i64, update: &PersonUpdate) -> Result<Person, DbError> {
        let mut person = self.get_person(id)?.ok_or(DbError::PersonNotFound(id))?;
        update.apply(&mut person)?;

        let details = &person.details;
        self.conn
            .execute(
                "
                UPDATE people
                SET name = ?, registration_number = ?, class_name = ?, phone = ?, email = ?, address = ?, updated_at = ?
                WHERE id = ?
                ",
                params![
                    person.name,
                    details.registration_number,
                    details.class_name,
                    details.phone,
                    details.email,
                    details.address,
                    format_timestamp(Utc::now()),
                    id,
                ],
            )
            .map_err(|err| person_conflict(err, person.category, &person.code, details))?;

        tracing::debug!(id, "updated person");
        self.get_person(id)?.ok_or(DbError::PersonNotFound(id))
    }

    /// Deletes a person, returning what was removed. Their events remain.
    pub fn remove_person(&mut self, id: i64) -> Result<Person, DbError> {
        let person = self.get_person(id)?.ok_or(DbError::PersonNotFound(id))?;
        self.conn.execute("DELETE FROM people WHERE id = ?", [id])?;
        tracing::debug!(id, code = %person.code, "removed person");
        Ok(person)
    }

    // ========== Policy ==========

    /// Returns the attendance policy, creating it with defaults on first access.
    pub fn load_or_init_policy(&mut self) -> Result<AttendancePolicy, DbError> {
        load_or_init_policy(&self.conn)
    }

    /// Replaces the attendance policy. Recorded events keep their timeliness.
    pub fn update_policy(&mut self, policy: &AttendancePolicy) -> Result<(), DbError> {
        let now = format_timestamp(Utc::now());
        self.conn.execute(
            "
            INSERT INTO attendance_policy
            (id, arrival_window_start, arrival_window_end, departure_window_end,
             require_arrival_before_departure, created_at, updated_at)
            VALUES (1, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                arrival_window_start = excluded.arrival_window_start,
                arrival_window_end = excluded.arrival_window_end,
                departure_window_end = excluded.departure_window_end,
                require_arrival_before_departure = excluded.require_arrival_before_departure,
                updated_at = excluded.updated_at
            ",
            params![
                format_policy_time(policy.arrival_window_start),
                format_policy_time(policy.arrival_window_end),
                format_policy_time(policy.departure_window_end),
                policy.require_arrival_before_departure,
                now,
                now,
            ],
        )?;
        tracing::debug!(?policy, "updated attendance policy");
        Ok(())
    }

    // ========== Events ==========

    /// Classifies and records a scan atomically.
    ///
    /// The identity lookup, policy read, same-day arrival check, and insert
    /// all run in one `IMMEDIATE` transaction. A rejected scan rolls back, so
    /// it leaves the database untouched.
    pub fn record_scan(&mut self, request: ScanRequest) -> Result<ScanOutcome, ScanError<DbError>> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|err| ScanError::Store(err.into()))?;
        let mut store = ScanTransaction { tx };
        let outcome = attend_core::record_scan(&mut store, request)?;
        store
            .tx
            .commit()
            .map_err(|err| ScanError::Store(err.into()))?;
        Ok(outcome)
    }

    /// Lists events with timestamps in `[start, end]`, oldest first.
    pub fn list_events_between(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<StoredEvent>, DbError> {
        if end < start {
            return Ok(Vec::new());
        }
        let mut stmt = self.conn.prepare(
            "
            SELECT id, code, kind, timestamp, location, status, note
            FROM attendance_events
            WHERE timestamp >= ? AND timestamp <= ?
            ORDER BY timestamp ASC, id ASC
            ",
        )?;
        let rows = stmt.query_map(
            [format_event_timestamp(start), format_event_timestamp(end)],
            EventRow::from_row,
        )?;
        let mut events = Vec::new();
        for row in rows {
            events.push(row?.into_stored_event()?);
        }
        Ok(events)
    }

    /// Counts events with timestamps in `[start, end]`.
    pub fn count_events_between(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<usize, DbError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM attendance_events WHERE timestamp >= ? AND timestamp <= ?",
            [format_event_timestamp(start), format_event_timestamp(end)],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}

impl PersonDirectory for Database {
    type Error = DbError;

    fn find_by_code(&self, code: &ScanCode) -> Result<Option<Person>, Self::Error> {
        find_person_by_code(&self.conn, code)
    }
}

/// Store view over an open scan transaction.
struct ScanTransaction<'conn> {
    tx: Transaction<'conn>,
}

impl PersonDirectory for ScanTransaction<'_> {
    type Error = DbError;

    fn find_by_code(&self, code: &ScanCode) -> Result<Option<Person>, Self::Error> {
        find_person_by_code(&self.tx, code)
    }
}

impl AttendanceStore for ScanTransaction<'_> {
    fn load_or_init_policy(&mut self) -> Result<AttendancePolicy, Self::Error> {
        load_or_init_policy(&self.tx)
    }

    fn has_arrival_within(
        &self,
        code: &ScanCode,
        bucket: &DayBucket,
    ) -> Result<bool, Self::Error> {
        has_arrival_within(&self.tx, code, bucket)
    }

    fn append_event(&mut self, event: &AttendanceEvent) -> Result<(), Self::Error> {
        insert_event(&self.tx, event).map(|_| ())
    }
}

// ========== Row Mapping ==========

const PERSON_COLUMNS: &str = "id, category, name, code, registration_number, class_name, phone, email, address, created_at, updated_at";

#[derive(Debug)]
struct PersonRow {
    id: i64,
    category: String,
    name: String,
    code: String,
    registration_number: Option<String>,
    class_name: Option<String>,
    phone: Option<String>,
    email: Option<String>,
    address: Option<String>,
    created_at: String,
    updated_at: String,
}

impl PersonRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            category: row.get(1)?,
            name: row.get(2)?,
            code: row.get(3)?,
            registration_number: row.get(4)?,
            class_name: row.get(5)?,
            phone: row.get(6)?,
            email: row.get(7)?,
            address: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }

    fn into_person(self) -> Result<Person, DbError> {
        let invalid = |column: &'static str, value: &str| DbError::InvalidValue {
            table: "people",
            column,
            row_id: self.id,
            value: value.to_string(),
        };
        let category: PersonCategory = self
            .category
            .parse()
            .map_err(|_| invalid("category", &self.category))?;
        let code = ScanCode::new(self.code.as_str()).map_err(|_| invalid("code", &self.code))?;
        let created_at =
            parse_timestamp(&self.created_at).ok_or_else(|| invalid("created_at", &self.created_at))?;
        let updated_at =
            parse_timestamp(&self.updated_at).ok_or_else(|| invalid("updated_at", &self.updated_at))?;

        Ok(Person {
            id: self.id,
            name: self.name,
            category,
            code,
            details: PersonDetails {
                registration_number: self.registration_number,
                class_name: self.class_name,
                phone: self.phone,
                email: self.email,
                address: self.address,
            },
            created_at,
            updated_at,
        })
    }
}

#[derive(Debug)]
struct EventRow {
    id: i64,
    code: String,
    kind: String,
    timestamp: String,
    location: String,
    status: String,
    note: Option<String>,
}

impl EventRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            code: row.get(1)?,
            kind: row.get(2)?,
            timestamp: row.get(3)?,
            location: row.get(4)?,
            status: row.get(5)?,
            note: row.get(6)?,
        })
    }

    fn into_stored_event(self) -> Result<StoredEvent, DbError> {
        let invalid = |column: &'static str, value: &str| DbError::InvalidValue {
            table: "attendance_events",
            column,
            row_id: self.id,
            value: value.to_string(),
        };
        let code = ScanCode::new(self.code.as_str()).map_err(|_| invalid("code", &self.code))?;
        let kind: EventKind = self.kind.parse().map_err(|_| invalid("kind", &self.kind))?;
        let status: Timeliness = self
            .status
            .parse()
            .map_err(|_| invalid("status", &self.status))?;
        let timestamp = NaiveDateTime::parse_from_str(&self.timestamp, "%Y-%m-%dT%H:%M:%S%.f")
            .map_err(|_| invalid("timestamp", &self.timestamp))?;

        Ok(StoredEvent {
            id: self.id,
            event: AttendanceEvent {
                code,
                kind,
                timestamp,
                location: self.location,
                status,
                note: self.note,
            },
        })
    }
}

// ========== Shared Queries ==========

fn find_person_by_code(conn: &Connection, code: &ScanCode) -> Result<Option<Person>, DbError> {
    let row = conn
        .query_row(
            &format!("SELECT {PERSON_COLUMNS} FROM people WHERE code = ?"),
            [code.as_str()],
            PersonRow::from_row,
        )
        .optional()?;
    row.map(PersonRow::into_person).transpose()
}

fn load_or_init_policy(conn: &Connection) -> Result<AttendancePolicy, DbError> {
    let defaults = AttendancePolicy::default();
    let now = format_timestamp(Utc::now());
    let created = conn.execute(
        "
        INSERT OR IGNORE INTO attendance_policy
        (id, arrival_window_start, arrival_window_end, departure_window_end,
         require_arrival_before_departure, created_at, updated_at)
        VALUES (1, ?, ?, ?, ?, ?, ?)
        ",
        params![
            format_policy_time(defaults.arrival_window_start),
            format_policy_time(defaults.arrival_window_end),
            format_policy_time(defaults.departure_window_end),
            defaults.require_arrival_before_departure,
            now,
            now,
        ],
    )?;
    if created > 0 {
        tracing::debug!(policy = ?defaults, "created default attendance policy");
    }

    let (start, arrival_end, departure_end, require_arrival): (String, String, String, bool) =
        conn.query_row(
            "
            SELECT arrival_window_start, arrival_window_end, departure_window_end,
                   require_arrival_before_departure
            FROM attendance_policy
            WHERE id = 1
            ",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )?;

    Ok(AttendancePolicy {
        arrival_window_start: parse_policy_time("arrival_window_start", &start)?,
        arrival_window_end: parse_policy_time("arrival_window_end", &arrival_end)?,
        departure_window_end: parse_policy_time("departure_window_end", &departure_end)?,
        require_arrival_before_departure: require_arrival,
    })
}

fn has_arrival_within(
    conn: &Connection,
    code: &ScanCode,
    bucket: &DayBucket,
) -> Result<bool, DbError> {
    let exists = conn.query_row(
        "
        SELECT EXISTS (
            SELECT 1 FROM attendance_events
            WHERE code = ? AND kind = 'arrival' AND timestamp >= ? AND timestamp <= ?
        )
        ",
        params![
            code.as_str(),
            format_event_timestamp(bucket.start),
            format_event_timestamp(bucket.end),
        ],
        |row| row.get(0),
    )?;
    Ok(exists)
}

fn insert_event(conn: &Connection, event: &AttendanceEvent) -> Result<i64, DbError> {
    conn.execute(
        "
        INSERT INTO attendance_events (code, kind, timestamp, location, status, note)
        VALUES (?, ?, ?, ?, ?, ?)
        ",
        params![
            event.code.as_str(),
            event.kind.as_str(),
            format_event_timestamp(event.timestamp),
            event.location,
            event.status.as_str(),
            event.note,
        ],
    )
    .map_err(|err| {
        if is_unique_violation(&err, ONE_ARRIVAL_INDEX) {
            DbError::DuplicateArrival {
                code: event.code.to_string(),
                date: event.timestamp.date().to_string(),
            }
        } else {
            DbError::Sqlite(err)
        }
    })?;
    Ok(conn.last_insert_rowid())
}

fn person_conflict(
    err: rusqlite::Error,
    category: PersonCategory,
    code: &ScanCode,
    details: &PersonDetails,
) -> DbError {
    if is_unique_violation(&err, "people.code") {
        return DbError::DuplicateCode(code.to_string());
    }
    if is_unique_violation(&err, "people.registration_number") {
        return DbError::DuplicateRegistration {
            category,
            number: details.registration_number.clone().unwrap_or_default(),
        };
    }
    DbError::Sqlite(err)
}

fn is_unique_violation(err: &rusqlite::Error, target: &str) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, Some(message))
            if failure.code == ErrorCode::ConstraintViolation && message.contains(target)
    )
}

// ========== Formatting ==========

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(timestamp: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(timestamp)
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}

fn format_event_timestamp(timestamp: NaiveDateTime) -> String {
    timestamp.format(EVENT_TIMESTAMP_FORMAT).to_string()
}

fn format_policy_time(time: NaiveTime) -> String {
    time.format(POLICY_TIME_FORMAT).to_string()
}

fn parse_policy_time(column: &'static str, value: &str) -> Result<NaiveTime, DbError> {
    NaiveTime::parse_from_str(value, POLICY_TIME_FORMAT).map_err(|_| DbError::InvalidValue {
        table: "attendance_policy",
        column,
        row_id: 1,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use attend_core::Rejection;
    use chrono::NaiveDate;

    #[test]
    fn open_in_memory_database() {
        let db = Database::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn schema_matches_data_model() {
        let db = Database::open_in_memory().expect("open in-memory db");

        assert_eq!(
            table_columns(&db.conn, "people"),
            vec![
                "id",
                "category",
                "name",
                "code",
                "registration_number",
                "class_name",
                "phone",
                "email",
                "address",
                "created_at",
                "updated_at",
            ]
        );
        assert_eq!(
            table_columns(&db.conn, "attendance_policy"),
            vec![
                "id",
                "arrival_window_start",
                "arrival_window_end",
                "departure_window_end",
                "require_arrival_before_departure",
                "created_at",
                "updated_at",
            ]
        );
        assert_eq!(
            table_columns(&db.conn, "attendance_events"),
            vec!["id", "code", "kind", "timestamp", "location", "status", "note"]
        );

        let event_indexes = index_names(&db.conn, "attendance_events");
        let expected: HashSet<String> = [
            "idx_events_timestamp",
            "idx_events_code_timestamp",
            "idx_events_one_arrival_per_day",
        ]
        .into_iter()
        .map(String::from)
        .collect();
        assert!(expected.is_subset(&event_indexes));
        assert!(index_names(&db.conn, "people").contains("idx_people_category"));
    }

    fn table_columns(conn: &Connection, table: &str) -> Vec<String> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info({table})"))
            .expect("prepare table_info");
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .expect("query table_info");
        rows.map(|row| row.expect("table_info row")).collect()
    }

    fn index_names(conn: &Connection, table: &str) -> HashSet<String> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA index_list({table})"))
            .expect("prepare index_list");
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .expect("query index_list");
        rows.map(|row| row.expect("index_list row")).collect()
    }

    fn count_rows(conn: &Connection, table: &str) -> i64 {
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
            row.get(0)
        })
        .expect("count rows")
    }

    fn new_person(name: &str, category: PersonCategory, code: &str) -> NewPerson {
        NewPerson::new(
            name,
            category,
            Some(ScanCode::new(code).unwrap()),
            PersonDetails::default(),
        )
        .unwrap()
    }

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn scan(
        db: &mut Database,
        code: &str,
        when: NaiveDateTime,
    ) -> Result<ScanOutcome, ScanError<DbError>> {
        db.record_scan(ScanRequest::new(ScanCode::new(code).unwrap(), when))
    }

    #[test]
    fn add_and_resolve_person_across_categories() {
        let mut db = Database::open_in_memory().unwrap();
        let staff = db
            .add_person(&new_person("Ada Lovelace", PersonCategory::Staff, "abc123"))
            .unwrap();
        let student = db
            .add_person(&new_person("Grace Hopper", PersonCategory::Student, "stu001"))
            .unwrap();

        let found = attend_core::resolve(&db, &ScanCode::new("stu001").unwrap())
            .unwrap()
            .expect("student resolves");
        assert_eq!(found, student);
        assert_eq!(found.category, PersonCategory::Student);

        let found = db
            .find_by_code(&ScanCode::new("abc123").unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(found.id, staff.id);
        assert!(
            db.find_by_code(&ScanCode::new("zzz000").unwrap())
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn codes_are_unique_across_categories() {
        let mut db = Database::open_in_memory().unwrap();
        db.add_person(&new_person("Ada Lovelace", PersonCategory::Staff, "abc123"))
            .unwrap();

        let err = db
            .add_person(&new_person("Grace Hopper", PersonCategory::Student, "abc123"))
            .unwrap_err();
        assert!(matches!(err, DbError::DuplicateCode(code) if code == "abc123"));
    }

    #[test]
    fn registration_numbers_are_unique_per_category() {
        let mut db = Database::open_in_memory().unwrap();
        let with_number = |name: &str, category, code: &str| {
            NewPerson::new(
                name,
                category,
                Some(ScanCode::new(code).unwrap()),
                PersonDetails {
                    registration_number: Some("1001".to_string()),
                    ..PersonDetails::default()
                },
            )
            .unwrap()
        };

        db.add_person(&with_number("Ada Lovelace", PersonCategory::Staff, "abc123"))
            .unwrap();
        db.add_person(&with_number("Grace Hopper", PersonCategory::Student, "stu001"))
            .expect("same number in another category is allowed");

        let err = db
            .add_person(&with_number("Alan Turing", PersonCategory::Staff, "abc124"))
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::DuplicateRegistration {
                category: PersonCategory::Staff,
                ..
            }
        ));
    }

    #[test]
    fn list_people_filters_and_orders() {
        let mut db = Database::open_in_memory().unwrap();
        db.add_person(&new_person("Zed Student", PersonCategory::Student, "s2"))
            .unwrap();
        db.add_person(&new_person("Ada Lovelace", PersonCategory::Staff, "t1"))
            .unwrap();
        db.add_person(&new_person("Amy Student", PersonCategory::Student, "s1"))
            .unwrap();

        let everyone: Vec<String> = db
            .list_people(None)
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(everyone, vec!["Ada Lovelace", "Amy Student", "Zed Student"]);

        let students = db.list_people(Some(PersonCategory::Student)).unwrap();
        assert_eq!(students.len(), 2);
        assert_eq!(db.count_people(PersonCategory::Staff).unwrap(), 1);
        assert_eq!(db.count_people(PersonCategory::Student).unwrap(), 2);
        assert_eq!(db.people_by_code().unwrap().len(), 3);
    }

    #[test]
    fn update_person_keeps_code() {
        let mut db = Database::open_in_memory().unwrap();
        let person = db
            .add_person(&new_person("Grace Hopper", PersonCategory::Student, "stu001"))
            .unwrap();

        let update = PersonUpdate {
            name: Some("Grace Brewster Hopper".to_string()),
            details: PersonDetails {
                class_name: Some("12C".to_string()),
                ..PersonDetails::default()
            },
        };
        let updated = db.update_person(person.id, &update).unwrap();

        assert_eq!(updated.name, "Grace Brewster Hopper");
        assert_eq!(updated.details.class_name.as_deref(), Some("12C"));
        assert_eq!(updated.code, person.code);
        assert_eq!(updated.created_at, person.created_at);

        let err = db.update_person(999, &update).unwrap_err();
        assert!(matches!(err, DbError::PersonNotFound(999)));
    }

    #[test]
    fn removing_a_person_keeps_their_events() {
        let mut db = Database::open_in_memory().unwrap();
        let person = db
            .add_person(&new_person("Ada Lovelace", PersonCategory::Staff, "abc123"))
            .unwrap();
        scan(&mut db, "abc123", at(3, 7, 0)).unwrap();

        let removed = db.remove_person(person.id).unwrap();
        assert_eq!(removed.code.as_str(), "abc123");
        assert!(db.get_person(person.id).unwrap().is_none());

        let events = db.list_events_between(at(3, 0, 0), at(3, 23, 59)).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event.code.as_str(), "abc123");

        let err = scan(&mut db, "abc123", at(3, 16, 0)).unwrap_err();
        assert_eq!(err.rejection(), Some(Rejection::UnknownCode));
        assert!(matches!(
            db.remove_person(person.id),
            Err(DbError::PersonNotFound(_))
        ));
    }

    #[test]
    fn policy_is_created_lazily_once() {
        let mut db = Database::open_in_memory().unwrap();
        assert_eq!(count_rows(&db.conn, "attendance_policy"), 0);

        let policy = db.load_or_init_policy().unwrap();
        assert_eq!(policy, AttendancePolicy::default());
        db.load_or_init_policy().unwrap();
        assert_eq!(count_rows(&db.conn, "attendance_policy"), 1);
    }

    #[test]
    fn update_policy_replaces_singleton() {
        let mut db = Database::open_in_memory().unwrap();
        let policy = AttendancePolicy {
            arrival_window_end: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            require_arrival_before_departure: false,
            ..AttendancePolicy::default()
        };

        db.update_policy(&policy).unwrap();
        assert_eq!(db.load_or_init_policy().unwrap(), policy);
        assert_eq!(count_rows(&db.conn, "attendance_policy"), 1);
    }

    #[test]
    fn record_scan_follows_daily_cycle() {
        let mut db = Database::open_in_memory().unwrap();
        db.add_person(&new_person("Ada Lovelace", PersonCategory::Staff, "abc123"))
            .unwrap();

        let first = scan(&mut db, "abc123", at(3, 7, 0)).unwrap();
        assert_eq!((first.kind, first.status), (EventKind::Arrival, Timeliness::OnTime));

        let second = scan(&mut db, "abc123", at(3, 7, 30)).unwrap();
        assert_eq!(
            (second.kind, second.status),
            (EventKind::Departure, Timeliness::OnTime)
        );

        let third = scan(&mut db, "abc123", at(3, 16, 30)).unwrap();
        assert_eq!((third.kind, third.status), (EventKind::Departure, Timeliness::Late));

        let next_day = scan(&mut db, "abc123", at(4, 7, 16)).unwrap();
        assert_eq!(
            (next_day.kind, next_day.status),
            (EventKind::Arrival, Timeliness::Late)
        );

        assert_eq!(count_rows(&db.conn, "attendance_events"), 4);
        assert_eq!(count_rows(&db.conn, "attendance_policy"), 1);
    }

    #[test]
    fn unknown_code_writes_nothing() {
        let mut db = Database::open_in_memory().unwrap();
        db.add_person(&new_person("Ada Lovelace", PersonCategory::Staff, "abc123"))
            .unwrap();

        let err = scan(&mut db, "zzz000", at(3, 7, 0)).unwrap_err();
        assert_eq!(err.rejection(), Some(Rejection::UnknownCode));
        assert_eq!(count_rows(&db.conn, "attendance_events"), 0);
        assert_eq!(count_rows(&db.conn, "attendance_policy"), 0);
    }

    #[test]
    fn policy_changes_do_not_touch_recorded_events() {
        let mut db = Database::open_in_memory().unwrap();
        db.add_person(&new_person("Ada Lovelace", PersonCategory::Staff, "abc123"))
            .unwrap();
        scan(&mut db, "abc123", at(3, 7, 10)).unwrap();

        db.update_policy(&AttendancePolicy {
            arrival_window_end: NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
            ..AttendancePolicy::default()
        })
        .unwrap();

        let events = db.list_events_between(at(3, 0, 0), at(3, 23, 59)).unwrap();
        assert_eq!(events[0].event.status, Timeliness::OnTime);
    }

    #[test]
    fn second_arrival_same_day_is_refused_by_store() {
        let db = Database::open_in_memory().unwrap();
        let arrival = AttendanceEvent {
            code: ScanCode::new("abc123").unwrap(),
            kind: EventKind::Arrival,
            timestamp: at(3, 7, 0),
            location: "Main gate".to_string(),
            status: Timeliness::OnTime,
            note: None,
        };
        insert_event(&db.conn, &arrival).unwrap();

        let duplicate = AttendanceEvent {
            timestamp: at(3, 7, 1),
            ..arrival.clone()
        };
        let err = insert_event(&db.conn, &duplicate).unwrap_err();
        assert!(matches!(err, DbError::DuplicateArrival { ref date, .. } if date == "2025-03-03"));

        let departure = AttendanceEvent {
            kind: EventKind::Departure,
            timestamp: at(3, 16, 0),
            ..arrival.clone()
        };
        insert_event(&db.conn, &departure).unwrap();
        insert_event(&db.conn, &departure).expect("departures are not capped");

        let tomorrow = AttendanceEvent {
            timestamp: at(4, 7, 0),
            ..arrival
        };
        insert_event(&db.conn, &tomorrow).unwrap();
    }

    #[test]
    fn arrival_lookup_respects_day_bucket() {
        let db = Database::open_in_memory().unwrap();
        let code = ScanCode::new("abc123").unwrap();
        let late_night = NaiveDate::from_ymd_opt(2025, 3, 3)
            .unwrap()
            .and_hms_micro_opt(23, 59, 59, 999_999)
            .unwrap();
        insert_event(
            &db.conn,
            &AttendanceEvent {
                code: code.clone(),
                kind: EventKind::Arrival,
                timestamp: late_night,
                location: "Main gate".to_string(),
                status: Timeliness::Late,
                note: None,
            },
        )
        .unwrap();

        let today = DayBucket::for_date(late_night.date());
        let tomorrow = DayBucket::for_date(late_night.date().succ_opt().unwrap());
        assert!(has_arrival_within(&db.conn, &code, &today).unwrap());
        assert!(!has_arrival_within(&db.conn, &code, &tomorrow).unwrap());
    }

    #[test]
    fn list_events_between_is_inclusive_and_ordered() {
        let mut db = Database::open_in_memory().unwrap();
        db.add_person(&new_person("Ada Lovelace", PersonCategory::Staff, "abc123"))
            .unwrap();
        db.add_person(&new_person("Grace Hopper", PersonCategory::Student, "stu001"))
            .unwrap();
        scan(&mut db, "stu001", at(3, 7, 5)).unwrap();
        scan(&mut db, "abc123", at(3, 7, 0)).unwrap();
        scan(&mut db, "abc123", at(4, 7, 0)).unwrap();

        let events = db.list_events_between(at(3, 7, 0), at(3, 7, 5)).unwrap();
        let codes: Vec<&str> = events.iter().map(|e| e.event.code.as_str()).collect();
        assert_eq!(codes, vec!["abc123", "stu001"]);

        assert_eq!(db.count_events_between(at(3, 0, 0), at(4, 23, 59)).unwrap(), 3);
        assert!(
            db.list_events_between(at(4, 0, 0), at(3, 0, 0))
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn data_persists_across_reopen() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("attend.db");
        {
            let mut db = Database::open(&path).unwrap();
            db.add_person(&new_person("Ada Lovelace", PersonCategory::Staff, "abc123"))
                .unwrap();
            scan(&mut db, "abc123", at(3, 7, 0)).unwrap();
        }

        let mut db = Database::open(&path).unwrap();
        let outcome = scan(&mut db, "abc123", at(3, 15, 0)).unwrap();
        assert_eq!(outcome.kind, EventKind::Departure);
    }

    #[test]
    fn corrupt_stored_values_surface_as_errors() {
        let db = Database::open_in_memory().unwrap();
        db.conn
            .execute(
                "INSERT INTO attendance_policy VALUES (1, 'seven', '07:15:00', '16:00:00', 1, 'x', 'x')",
                [],
            )
            .unwrap();

        let err = load_or_init_policy(&db.conn).unwrap_err();
        assert!(matches!(
            err,
            DbError::InvalidValue {
                column: "arrival_window_start",
                ..
            }
        ));
    }
}
