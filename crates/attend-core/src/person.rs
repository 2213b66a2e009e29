//! People who can scan in: staff and students.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ScanCode, ValidationError};

/// Which registry a person belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersonCategory {
    Staff,
    Student,
}

impl PersonCategory {
    /// String representation for database storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Staff => "staff",
            Self::Student => "student",
        }
    }

    /// Display label used in scan messages and reports.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Staff => "Staff",
            Self::Student => "Student",
        }
    }
}

impl fmt::Display for PersonCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PersonCategory {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "staff" | "teacher" => Ok(Self::Staff),
            "student" => Ok(Self::Student),
            _ => Err(ValidationError::InvalidCategory {
                value: s.to_string(),
            }),
        }
    }
}

/// Optional registry details kept alongside a person.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonDetails {
    /// Employee number for staff, student number for students.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_number: Option<String>,
    /// Class or homeroom (students).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// A registered person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    /// Registry identifier.
    pub id: i64,
    /// Display name.
    pub name: String,
    pub category: PersonCategory,
    /// Scan code; never changes once issued.
    pub code: ScanCode,
    #[serde(flatten)]
    pub details: PersonDetails,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for registering a person.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPerson {
    pub name: String,
    pub category: PersonCategory,
    pub code: ScanCode,
    pub details: PersonDetails,
}

impl NewPerson {
    /// Builds a registration, issuing a fresh scan code when none is given.
    pub fn new(
        name: &str,
        category: PersonCategory,
        code: Option<ScanCode>,
        details: PersonDetails,
    ) -> Result<Self, ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::Empty { field: "name" });
        }
        Ok(Self {
            name: name.to_string(),
            category,
            code: code.unwrap_or_else(ScanCode::issue),
            details,
        })
    }
}

/// Administrative edit of a registered person.
///
/// `None` leaves a field untouched; a blank string clears an optional detail.
/// The scan code and category are not editable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonUpdate {
    pub name: Option<String>,
    pub details: PersonDetails,
}

impl PersonUpdate {
    /// Applies the edit to `person` in place.
    pub fn apply(&self, person: &mut Person) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(ValidationError::Empty { field: "name" });
            }
            person.name = name.to_string();
        }

        let details = &mut person.details;
        merge_detail(&mut details.registration_number, &self.details.registration_number);
        merge_detail(&mut details.class_name, &self.details.class_name);
        merge_detail(&mut details.phone, &self.details.phone);
        merge_detail(&mut details.email, &self.details.email);
        merge_detail(&mut details.address, &self.details.address);
        Ok(())
    }

    /// Whether applying the edit would change nothing.
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.details.registration_number.is_none()
            && self.details.class_name.is_none()
            && self.details.phone.is_none()
            && self.details.email.is_none()
            && self.details.address.is_none()
    }
}

fn merge_detail(current: &mut Option<String>, update: &Option<String>) {
    if let Some(value) = update {
        let value = value.trim();
        *current = if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        };
    }
}

/// Lookup of people by scan code.
///
/// Implementations search every registry (staff and students) so a code
/// resolves regardless of category.
pub trait PersonDirectory {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Finds the person holding `code`, if any.
    fn find_by_code(&self, code: &ScanCode) -> Result<Option<Person>, Self::Error>;
}

/// Resolves a scan code to a person; `Ok(None)` means the code is unknown.
pub fn resolve<D>(directory: &D, code: &ScanCode) -> Result<Option<Person>, D::Error>
where
    D: PersonDirectory + ?Sized,
{
    let person = directory.find_by_code(code)?;
    if person.is_none() {
        tracing::debug!(code = %code, "scan code not registered");
    }
    Ok(person)
}
