//! Domain types stored in the database.
//!
//! These types represent the persisted activity and counter state.

use chrono::{DateTime, Utc};
use chromegle_stats_core::{Category, CategoryTotals};
use serde::{Deserialize, Serialize};

/// A daily counter row: one integer per category for a single calendar day.
pub type DailyCounters = CategoryTotals;

/// The most recent activity of one identity, one timestamp per category.
///
/// Each event overwrites the timestamp of its own category only. No history
/// is kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRecord {
    /// Last `chatStarted` event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_started_at: Option<DateTime<Utc>>,
    /// Last `chatEnded` event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_ended_at: Option<DateTime<Utc>>,
    /// Last `omegleOpened` event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_opened_at: Option<DateTime<Utc>>,
}

impl ActivityRecord {
    /// A record with only `category` set.
    #[must_use]
    pub fn single(category: Category, at: DateTime<Utc>) -> Self {
        let mut record = Self::default();
        record.set(category, at);
        record
    }

    /// Get the timestamp for a category.
    #[must_use]
    pub const fn get(&self, category: Category) -> Option<DateTime<Utc>> {
        match category {
            Category::SessionStarted => self.chat_started_at,
            Category::SessionEnded => self.chat_ended_at,
            Category::AppOpened => self.app_opened_at,
        }
    }

    /// Set the timestamp for a category.
    pub fn set(&mut self, category: Category, at: DateTime<Utc>) {
        let slot = match category {
            Category::SessionStarted => &mut self.chat_started_at,
            Category::SessionEnded => &mut self.chat_ended_at,
            Category::AppOpened => &mut self.app_opened_at,
        };
        *slot = Some(at);
    }

    /// Overwrite every column that is set in `newer`, keeping the rest.
    pub fn overlay(&mut self, newer: &Self) {
        for category in Category::ALL {
            if let Some(at) = newer.get(category) {
                self.set(category, at);
            }
        }
    }

    /// Whether the category timestamp is at or after `since`.
    #[must_use]
    pub fn active_since(&self, category: Category, since: DateTime<Utc>) -> bool {
        self.get(category).is_some_and(|at| at >= since)
    }
}
