//! Core domain logic for barcode attendance tracking.
//!
//! This crate contains the fundamental types and logic for:
//! - Identity: resolving a scanned code to a staff member or student
//! - Classification: deciding arrival/departure and on-time/late for a scan
//! - Summaries: folding recorded events into per-person tallies

pub mod event;
pub mod person;
pub mod policy;
pub mod scan;
pub mod summary;
pub mod types;

pub use event::{AttendanceEvent, EventKind, Timeliness};
pub use person::{
    NewPerson, Person, PersonCategory, PersonDetails, PersonDirectory, PersonUpdate, resolve,
};
pub use policy::{AttendancePolicy, DayBucket, date_range_bounds};
pub use scan::{
    AttendanceStore, Classification, DEFAULT_LOCATION, Rejection, RejectionReceipt, ScanError,
    ScanOutcome, ScanReceipt, ScanRequest, classify, record_scan,
};
pub use summary::{RecapPeriod, RecapSection, Tally, UNKNOWN_PERSON, recap, tally, tally_by_person};
pub use types::{ScanCode, ValidationError};
