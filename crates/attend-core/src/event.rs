//! Attendance events as stored in the append-only event log.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::types::{ScanCode, ValidationError};

/// Whether a scan opened or closed a person's day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Arrival,
    Departure,
}

impl EventKind {
    /// String representation for database storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Arrival => "arrival",
            Self::Departure => "departure",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Arrival => "Arrival",
            Self::Departure => "Departure",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "arrival" => Ok(Self::Arrival),
            "departure" => Ok(Self::Departure),
            _ => Err(ValidationError::InvalidEventKind {
                value: s.to_string(),
            }),
        }
    }
}

/// On-time/late classification of an event against the policy boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timeliness {
    OnTime,
    Late,
}

impl Timeliness {
    /// Late when `value` is strictly after `boundary`; the boundary itself is on time.
    #[must_use]
    pub fn against<T: PartialOrd>(value: &T, boundary: &T) -> Self {
        if value > boundary {
            Self::Late
        } else {
            Self::OnTime
        }
    }

    /// String representation for database storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OnTime => "on_time",
            Self::Late => "late",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::OnTime => "on time",
            Self::Late => "late",
        }
    }
}

impl fmt::Display for Timeliness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Timeliness {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "on_time" => Ok(Self::OnTime),
            "late" => Ok(Self::Late),
            _ => Err(ValidationError::InvalidTimeliness {
                value: s.to_string(),
            }),
        }
    }
}

/// A single recorded scan.
///
/// Events reference people by scan code rather than by row identifier, so an
/// event outlives the deletion of the person who produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceEvent {
    /// Scan code of the person who scanned.
    pub code: ScanCode,
    /// Arrival or departure.
    pub kind: EventKind,
    /// Local wall-clock time of the scan.
    pub timestamp: NaiveDateTime,
    /// Free-text location of the scanner.
    pub location: String,
    /// Timeliness as classified when the event was recorded.
    pub status: Timeliness,
    /// Optional note attached by the operator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}
