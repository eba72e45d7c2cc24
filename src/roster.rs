//! Roster resolution: the external participant list filtered down to the
//! participants who currently count.

use std::collections::HashSet;

use crate::types::{ParticipantId, RosterEntry};

/// Ordered set of valid participant IDs, in the external roster's order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    ids: Vec<ParticipantId>,
}

impl Roster {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|p| p == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.ids.iter().position(|p| p == id)
    }

    pub fn get(&self, index: usize) -> Option<&ParticipantId> {
        self.ids.get(index)
    }

    pub fn first(&self) -> Option<&ParticipantId> {
        self.ids.first()
    }

    pub fn last(&self) -> Option<&ParticipantId> {
        self.ids.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParticipantId> {
        self.ids.iter()
    }

    /// Everybody except `id`
    pub fn others<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a ParticipantId> + 'a {
        self.ids.iter().filter(move |p| p.as_str() != id)
    }

    pub fn as_slice(&self) -> &[ParticipantId] {
        &self.ids
    }
}

impl<S: Into<ParticipantId>> FromIterator<S> for Roster {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        let mut seen = HashSet::new();
        let ids = iter
            .into_iter()
            .map(Into::into)
            .filter(|id: &ParticipantId| !id.trim().is_empty())
            .filter(|id| seen.insert(id.clone()))
            .collect();
        Self { ids }
    }
}

/// Drop removed entries and blank IDs, keep first occurrences in order
pub fn resolve_roster(entries: &[RosterEntry]) -> Roster {
    entries
        .iter()
        .filter(|entry| !entry.removed)
        .map(|entry| entry.id.clone())
        .collect()
}
