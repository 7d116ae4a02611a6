//! Attendance tracker: first-sighting admission into an append-only roster.

use crate::types::{AttendanceRecord, Label, MatchResult};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct Roster {
    records: Vec<AttendanceRecord>,
    members: HashSet<String>,
}

/// Owner of the attendance roster.
///
/// Each known identity is admitted at most once per session. The membership
/// check and the append happen under one lock, so overlapping ticks can call
/// [`admit`](Self::admit) concurrently without duplicating an entry.
#[derive(Default)]
pub struct AttendanceTracker {
    roster: Mutex<Roster>,
}

impl AttendanceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit the recognized identity if it has not been seen before.
    ///
    /// Returns the new record, or `None` for unknown faces and repeat sightings.
    pub fn admit(&self, result: &MatchResult) -> Option<AttendanceRecord> {
        self.admit_at(result, Utc::now())
    }

    /// Like [`admit`](Self::admit), with an explicit timestamp.
    pub fn admit_at(&self, result: &MatchResult, at: DateTime<Utc>) -> Option<AttendanceRecord> {
        let Label::Known(name) = &result.label else {
            return None;
        };

        let mut roster = self.lock();
        if roster.members.contains(name) {
            return None;
        }
        roster.members.insert(name.clone());

        let record = AttendanceRecord {
            identity: name.clone(),
            timestamp: at,
        };
        roster.records.push(record.clone());
        Some(record)
    }

    /// Copy of the roster in admission order.
    pub fn snapshot(&self) -> Vec<AttendanceRecord> {
        self.lock().records.clone()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lock().members.contains(name)
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // A panic while holding the lock cannot leave the roster half-updated:
    // `members` is only written right before the push.
    fn lock(&self) -> MutexGuard<'_, Roster> {
        self.roster.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
