//! Card and section domain records.
//!
//! # Responsibility
//! - Define `Card`, `Section`, and the draft/patch input shapes.
//! - Provide validation helpers shared by repository write paths.
//! - Normalize tag sets into their canonical stored form.
//!
//! # Invariants
//! - `id` is assigned once by the store and never changes.
//! - `title` is unique across the whole archive, not per section.
//! - Tags are trimmed, lowercased, deduplicated, and sorted before storage.
//! - Section names match `[A-Za-z0-9_]+`; the check is defense-in-depth on
//!   top of the fixed relational schema, not an injection guard.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Stable identifier for a card. Kept as an alias to make intent explicit
/// in signatures.
pub type CardId = i64;

/// Writer recorded when the caller does not identify one.
pub const UNKNOWN_AUTHOR: &str = "UNKNOWN";

static SECTION_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\A[A-Za-z0-9_]+\z").expect("valid section name regex"));

/// A single archived note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    /// Store-assigned positive id, immutable after creation.
    pub id: CardId,
    /// Archive-wide unique title.
    pub title: String,
    /// Short free-text description. May be empty.
    pub desc: String,
    /// Long free-text body, stored literally (transport escaping is handled
    /// outside the core).
    pub content: String,
    /// Normalized tag labels.
    pub tags: Vec<String>,
    /// Last write time in epoch milliseconds.
    pub modified: i64,
    /// Identity of the last writer.
    pub modified_by: String,
}

/// A named grouping cards can be linked into.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
}

/// Input shape for card creation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardDraft {
    pub title: String,
    pub desc: String,
    pub content: String,
    pub tags: Vec<String>,
    /// Writer identity; `UNKNOWN` is recorded when absent.
    pub author: Option<String>,
}

/// Partial update for a card.
///
/// `None` leaves the stored value unchanged; `Some(value)` replaces it, so
/// an explicit empty string clears the field. Absent and empty are distinct
/// on purpose.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardPatch {
    pub title: Option<String>,
    pub desc: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl CardPatch {
    /// Returns whether the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.desc.is_none()
            && self.content.is_none()
            && self.tags.is_none()
    }
}

/// Validation failure for card or section input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardValidationError {
    /// Card title is empty or whitespace-only.
    EmptyTitle,
    /// Section name fails the identifier pattern.
    InvalidSectionName(String),
}

impl Display for CardValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "card title must not be empty"),
            Self::InvalidSectionName(name) => {
                write!(f, "`{name}` is not a valid section name")
            }
        }
    }
}

impl Error for CardValidationError {}

impl CardDraft {
    /// Creates a draft with normalized tags.
    pub fn new(
        title: impl Into<String>,
        desc: impl Into<String>,
        content: impl Into<String>,
        tags: &[String],
        author: Option<String>,
    ) -> Self {
        Self {
            title: title.into(),
            desc: desc.into(),
            content: content.into(),
            tags: normalize_tags(tags),
            author,
        }
    }

    /// Checks draft invariants before any SQL runs.
    pub fn validate(&self) -> Result<(), CardValidationError> {
        if self.title.trim().is_empty() {
            return Err(CardValidationError::EmptyTitle);
        }
        Ok(())
    }
}

/// Validates a section name against the identifier pattern.
pub fn validate_section_name(name: &str) -> Result<(), CardValidationError> {
    if SECTION_NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(CardValidationError::InvalidSectionName(name.to_string()))
    }
}

/// Normalizes one tag value. Blank input normalizes to nothing.
pub fn normalize_tag(tag: &str) -> Option<String> {
    let trimmed = tag.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Normalizes and deduplicates tag values into sorted order.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut unique = BTreeSet::new();
    for tag in tags {
        if let Some(value) = normalize_tag(tag) {
            unique.insert(value);
        }
    }
    unique.into_iter().collect()
}

/// Joins normalized tags into the single stored column value.
pub fn tags_to_column(tags: &[String]) -> String {
    tags.join(",")
}

/// Splits the stored column value back into the tag list.
pub fn tags_from_column(column: &str) -> Vec<String> {
    column
        .split(',')
        .filter_map(normalize_tag)
        .collect()
}
