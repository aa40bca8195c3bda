//! Auto-save status indicator
//!
//! Tracks where the current draft stands relative to its last save and
//! renders the short labels shown next to the editor. The indicator only
//! records what the host reports; it never saves anything itself.
//!
//! ```text
//!            begin_save            mark_saved(at)
//!   Idle ───────────────▶ Saving ─────────────────▶ Saved
//!    ▲                      │                         │
//!    │                      │ mark_failed(msg)        │
//!    │                      ▼                         │
//!    └──── mark_dirty ─── Error ◀─────────────────────┘
//!                                 (mark_dirty from Saved too)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::metrics::{DocumentMetrics, time_ago};

/// Save state of the current draft
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SaveStatus {
    #[default]
    Idle,
    Saving,
    Saved { at: DateTime<Utc> },
    Error { message: String },
}

impl SaveStatus {
    fn name(&self) -> &'static str {
        match self {
            SaveStatus::Idle => "idle",
            SaveStatus::Saving => "saving",
            SaveStatus::Saved { .. } => "saved",
            SaveStatus::Error { .. } => "error",
        }
    }
}

/// Save state plus the live word and character counts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveIndicator {
    status: SaveStatus,
    words: usize,
    characters: usize,
}

impl SaveIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> &SaveStatus {
        &self.status
    }

    pub fn words(&self) -> usize {
        self.words
    }

    pub fn characters(&self) -> usize {
        self.characters
    }

    /// A save started; allowed from every state
    pub fn begin_save(&mut self) {
        self.status = SaveStatus::Saving;
    }

    /// The running save finished. Returns `false` if no save was running.
    pub fn mark_saved(&mut self, at: DateTime<Utc>) -> bool {
        if self.status != SaveStatus::Saving {
            warn!(from = self.status.name(), "Ignoring save completion without a running save");
            return false;
        }
        self.status = SaveStatus::Saved { at };
        true
    }

    /// The running save failed. Returns `false` if no save was running.
    pub fn mark_failed(&mut self, message: impl Into<String>) -> bool {
        if self.status != SaveStatus::Saving {
            warn!(from = self.status.name(), "Ignoring save failure without a running save");
            return false;
        }
        self.status = SaveStatus::Error {
            message: message.into(),
        };
        true
    }

    /// The draft changed after a save attempt finished
    ///
    /// Returns `false` while idle (nothing to do) or while a save is running.
    pub fn mark_dirty(&mut self) -> bool {
        match self.status {
            SaveStatus::Saved { .. } | SaveStatus::Error { .. } => {
                self.status = SaveStatus::Idle;
                true
            }
            SaveStatus::Saving => {
                warn!("Ignoring edit notification while a save is running");
                false
            }
            SaveStatus::Idle => false,
        }
    }

    pub fn update_counts(&mut self, words: usize, characters: usize) {
        self.words = words;
        self.characters = characters;
    }

    pub fn update_from_metrics(&mut self, metrics: &DocumentMetrics) {
        self.update_counts(metrics.words, metrics.characters);
    }

    /// Status text, empty while idle
    ///
    /// ```rust
    /// use chrono::{Duration, Utc};
    /// use content_pipeline::save_status::SaveIndicator;
    ///
    /// let now = Utc::now();
    /// let mut indicator = SaveIndicator::new();
    /// indicator.begin_save();
    /// assert_eq!(indicator.status_label(now), "Saving...");
    /// indicator.mark_saved(now - Duration::minutes(5));
    /// assert_eq!(indicator.status_label(now), "Saved 5 minutes ago");
    /// ```
    pub fn status_label(&self, now: DateTime<Utc>) -> String {
        match &self.status {
            SaveStatus::Idle => String::new(),
            SaveStatus::Saving => "Saving...".to_string(),
            SaveStatus::Saved { at } => {
                let ago = time_ago(*at, now);
                if ago == "Just now" {
                    "Saved just now".to_string()
                } else {
                    format!("Saved {ago}")
                }
            }
            SaveStatus::Error { message } => format!("Save failed: {message}"),
        }
    }

    /// Word and character counts, e.g. `12 words · 80 characters`
    pub fn counts_label(&self) -> String {
        format!(
            "{} {} · {} {}",
            self.words,
            if self.words == 1 { "word" } else { "words" },
            self.characters,
            if self.characters == 1 { "character" } else { "characters" }
        )
    }
}
