//! Event categories and per-category totals.
//!
//! The engine only ever tracks three kinds of events. The enumeration is closed:
//! anything that does not parse into a [`Category`] is rejected before any state
//! is touched, and categories are the only dynamic selector used to address
//! storage columns.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A telemetry event category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    /// A chat session was started (`chatStarted`).
    SessionStarted,
    /// A chat session was ended (`chatEnded`).
    SessionEnded,
    /// The chat application was opened (`omegleOpened`).
    AppOpened,
}

impl Category {
    /// All categories, in storage column order.
    pub const ALL: [Self; 3] = [Self::SessionStarted, Self::SessionEnded, Self::AppOpened];

    /// The action name used by the browser extension.
    #[must_use]
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::SessionStarted => "chatStarted",
            Self::SessionEnded => "chatEnded",
            Self::AppOpened => "omegleOpened",
        }
    }

    /// Position of this category in [`Category::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::SessionStarted => 0,
            Self::SessionEnded => 1,
            Self::AppOpened => 2,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for Category {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.wire_name() == s)
            .ok_or_else(|| CoreError::InvalidCategory(s.to_string()))
    }
}

/// Event totals per category.
///
/// Serializes with the field names of the public statistics payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTotals {
    /// Number of `chatStarted` events.
    pub chats_started: u64,
    /// Number of `chatEnded` events.
    pub chats_ended: u64,
    /// Number of `omegleOpened` events.
    pub times_opened: u64,
}

impl CategoryTotals {
    /// Get the total for a category.
    #[must_use]
    pub const fn get(&self, category: Category) -> u64 {
        match category {
            Category::SessionStarted => self.chats_started,
            Category::SessionEnded => self.chats_ended,
            Category::AppOpened => self.times_opened,
        }
    }

    /// Get a mutable reference to the total for a category.
    pub fn get_mut(&mut self, category: Category) -> &mut u64 {
        match category {
            Category::SessionStarted => &mut self.chats_started,
            Category::SessionEnded => &mut self.chats_ended,
            Category::AppOpened => &mut self.times_opened,
        }
    }

    /// Add another set of totals into this one, saturating on overflow.
    pub fn accumulate(&mut self, other: &Self) {
        for category in Category::ALL {
            let slot = self.get_mut(category);
            *slot = slot.saturating_add(other.get(category));
        }
    }

    /// Keep only the listed categories, zeroing the rest.
    #[must_use]
    pub fn restricted_to(&self, categories: &[Category]) -> Self {
        let mut out = Self::default();
        for &category in categories {
            *out.get_mut(category) = self.get(category);
        }
        out
    }

    /// Sum across all categories.
    #[must_use]
    pub fn total(&self) -> u64 {
        Category::ALL
            .into_iter()
            .map(|category| self.get(category))
            .fold(0, u64::saturating_add)
    }
}
