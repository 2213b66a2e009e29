//! Scan classification: arrival or departure, on time or late.
//!
//! [`classify`] is the pure decision over a policy, a timestamp, and whether
//! the person already arrived that day. [`record_scan`] wraps it with the
//! reads and the single append an [`AttendanceStore`] provides.

use std::fmt;

use chrono::{NaiveDateTime, SubsecRound};
use serde::Serialize;
use thiserror::Error;

use crate::event::{AttendanceEvent, EventKind, Timeliness};
use crate::person::{Person, PersonCategory, PersonDirectory, resolve};
use crate::policy::{AttendancePolicy, DayBucket};
use crate::types::ScanCode;

/// Location recorded when the scanner does not report one.
pub const DEFAULT_LOCATION: &str = "Unknown";

/// Why a scan was refused. A refused scan writes nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    /// The code matches nobody in either registry.
    #[error("scan code is not registered")]
    UnknownCode,
    /// A departure was attempted before any arrival that day.
    #[error("an arrival must be recorded before a departure")]
    ArrivalRequiredFirst,
}

impl Rejection {
    /// Machine-readable reason string.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::UnknownCode => "unknown_code",
            Self::ArrivalRequiredFirst => "arrival_required_first",
        }
    }

    /// Failure payload for callers.
    #[must_use]
    pub const fn receipt(self) -> RejectionReceipt {
        RejectionReceipt { reason: self }
    }
}

/// Failure payload: `{"reason": "unknown_code"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RejectionReceipt {
    pub reason: Rejection,
}

/// Error from [`record_scan`]: either a policy rejection or a store failure.
#[derive(Debug)]
pub enum ScanError<E> {
    Rejected(Rejection),
    Store(E),
}

impl<E> ScanError<E> {
    /// The rejection, if this is not a store failure.
    pub const fn rejection(&self) -> Option<Rejection> {
        match self {
            Self::Rejected(rejection) => Some(*rejection),
            Self::Store(_) => None,
        }
    }
}

impl<E> From<Rejection> for ScanError<E> {
    fn from(rejection: Rejection) -> Self {
        Self::Rejected(rejection)
    }
}

impl<E: fmt::Display> fmt::Display for ScanError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected(rejection) => write!(f, "scan rejected: {rejection}"),
            Self::Store(err) => write!(f, "attendance store failed: {err}"),
        }
    }
}

impl<E> std::error::Error for ScanError<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Rejected(rejection) => Some(rejection),
            Self::Store(err) => Some(err),
        }
    }
}

/// Everything the classifier reads and the one thing it writes.
pub trait AttendanceStore: PersonDirectory {
    /// Returns the active policy, creating it with defaults if absent.
    fn load_or_init_policy(&mut self) -> Result<AttendancePolicy, Self::Error>;

    /// Whether `code` has an arrival event inside `bucket`.
    fn has_arrival_within(
        &self,
        code: &ScanCode,
        bucket: &DayBucket,
    ) -> Result<bool, Self::Error>;

    /// Appends an event to the log.
    fn append_event(&mut self, event: &AttendanceEvent) -> Result<(), Self::Error>;
}

/// A scan as submitted by a scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    pub code: ScanCode,
    /// Caller's clock, local wall time.
    pub at: NaiveDateTime,
    pub location: String,
    pub note: Option<String>,
}

impl ScanRequest {
    /// A request at the default location with no note.
    pub fn new(code: ScanCode, at: NaiveDateTime) -> Self {
        Self {
            code,
            at,
            location: DEFAULT_LOCATION.to_string(),
            note: None,
        }
    }

    /// Sets the location; blank values keep the default.
    #[must_use]
    pub fn with_location(mut self, location: &str) -> Self {
        let location = location.trim();
        if !location.is_empty() {
            self.location = location.to_string();
        }
        self
    }

    /// Attaches a note; blank values are dropped.
    #[must_use]
    pub fn with_note(mut self, note: Option<&str>) -> Self {
        self.note = note
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);
        self
    }
}

/// Kind and timeliness decided for a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub kind: EventKind,
    pub status: Timeliness,
}

/// Decides kind and timeliness for a scan at `at`.
///
/// The first scan of a day is an arrival, judged against
/// `arrival_window_end`. Once an arrival exists, every further scan that day
/// is a departure, flagged late when it happens after `departure_window_end`.
/// Both boundaries are on time when hit exactly.
///
/// The arrival-first gate only applies to a departure attempt without a
/// prior arrival. Since the no-arrival path always yields an arrival, that
/// rejection cannot currently trigger.
pub fn classify(
    policy: &AttendancePolicy,
    at: NaiveDateTime,
    arrived_today: bool,
) -> Result<Classification, Rejection> {
    let time = at.time();
    if arrived_today {
        return Ok(Classification {
            kind: EventKind::Departure,
            status: Timeliness::against(&time, &policy.departure_window_end),
        });
    }

    let kind = EventKind::Arrival;
    if policy.require_arrival_before_departure && kind == EventKind::Departure {
        return Err(Rejection::ArrivalRequiredFirst);
    }
    Ok(Classification {
        kind,
        status: Timeliness::against(&time, &policy.arrival_window_end),
    })
}

/// Result of a recorded scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOutcome {
    pub person: Person,
    pub kind: EventKind,
    pub status: Timeliness,
    pub at: NaiveDateTime,
    pub location: String,
}

impl ScanOutcome {
    /// Success payload for callers.
    #[must_use]
    pub fn receipt(&self) -> ScanReceipt {
        ScanReceipt {
            person_name: self.person.name.clone(),
            person_category: self.person.category,
            event_kind: self.kind,
            timeliness: self.status,
            time: self.at.format("%H:%M:%S").to_string(),
            date: self.at.format("%Y-%m-%d").to_string(),
            location: self.location.clone(),
        }
    }
}

/// Success payload returned to the scanner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanReceipt {
    pub person_name: String,
    pub person_category: PersonCategory,
    pub event_kind: EventKind,
    pub timeliness: Timeliness,
    pub time: String,
    pub date: String,
    pub location: String,
}

/// Classifies a scan and appends the resulting event.
///
/// Reads happen in a fixed order: identity, policy, same-day arrival. The
/// only write besides the event itself is the lazy policy creation. Callers
/// wanting the read and the append to be atomic must hand in a store that
/// runs inside a transaction.
pub fn record_scan<S>(
    store: &mut S,
    request: ScanRequest,
) -> Result<ScanOutcome, ScanError<S::Error>>
where
    S: AttendanceStore + ?Sized,
{
    let Some(person) = resolve(&*store, &request.code).map_err(ScanError::Store)? else {
        tracing::warn!(code = %request.code, "rejected scan for unknown code");
        return Err(Rejection::UnknownCode.into());
    };

    // The event log keeps microseconds; classify the instant that gets stored.
    let at = request.at.trunc_subsecs(6);
    let policy = store.load_or_init_policy().map_err(ScanError::Store)?;
    let bucket = DayBucket::containing(at);
    let arrived_today = store
        .has_arrival_within(&request.code, &bucket)
        .map_err(ScanError::Store)?;

    let Classification { kind, status } =
        classify(&policy, at, arrived_today).inspect_err(|rejection| {
            tracing::warn!(code = %request.code, %rejection, "rejected scan");
        })?;

    let event = AttendanceEvent {
        code: request.code,
        kind,
        timestamp: at,
        location: request.location,
        status,
        note: request.note,
    };
    store.append_event(&event).map_err(ScanError::Store)?;
    tracing::info!(
        code = %event.code,
        person = %person.name,
        %kind,
        %status,
        "scan recorded"
    );

    Ok(ScanOutcome {
        person,
        kind,
        status,
        at: event.timestamp,
        location: event.location,
    })
}
