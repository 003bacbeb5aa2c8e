//! # Collection Views
//!
//! Consumer-side operations over collections of content units: search
//! filtering and drag-reordering. These read the model; they add no
//! invariants of their own.

use crate::{Fiber, WeaveError};
use serde::{Deserialize, Serialize};

// =============================================================================
// SEARCHABLE TRAIT
// =============================================================================

/// A content unit that can be matched by a text query.
pub trait Searchable {
    /// The unit's body text.
    fn content(&self) -> &str;

    /// The unit's tags, as a single text field.
    fn tags(&self) -> &str;
}

/// A content unit as shown by the card viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Card {
    /// Identifier of the underlying fiber, when there is one.
    #[serde(default)]
    pub id: Option<String>,
    pub content: String,
    #[serde(default)]
    pub tags: String,
}

impl Card {
    #[must_use]
    pub fn new(content: impl Into<String>, tags: impl Into<String>) -> Self {
        Self {
            id: None,
            content: content.into(),
            tags: tags.into(),
        }
    }

    /// Build a card from a fiber: the current stage tag is the content,
    /// and tags are joined with spaces.
    #[must_use]
    pub fn from_fiber(fiber: &Fiber) -> Self {
        Self {
            id: Some(fiber.id().as_str().to_string()),
            content: fiber.stage_tag().as_str().to_string(),
            tags: fiber.tags().join(" "),
        }
    }
}

impl Searchable for Card {
    fn content(&self) -> &str {
        &self.content
    }

    fn tags(&self) -> &str {
        &self.tags
    }
}

// =============================================================================
// OPERATIONS
// =============================================================================

/// Whether `item` matches `query`, case-insensitively, in content or tags.
///
/// The query is only case-folded: no trimming, no Unicode normalization.
/// An empty query matches everything.
#[must_use]
pub fn matches<T: Searchable + ?Sized>(item: &T, query: &str) -> bool {
    matches_folded(item, &query.to_lowercase())
}

fn matches_folded<T: Searchable + ?Sized>(item: &T, folded_query: &str) -> bool {
    item.content().to_lowercase().contains(folded_query)
        || item.tags().to_lowercase().contains(folded_query)
}

/// Return the items matching `query`, in their original order.
#[must_use]
pub fn filter<'a, T: Searchable>(items: &'a [T], query: &str) -> Vec<&'a T> {
    let query = query.to_lowercase();
    items
        .iter()
        .filter(|item| matches_folded(*item, &query))
        .collect()
}

/// Move the item at `from` to position `to`.
///
/// Every other item keeps its relative order. Both indexes must be in range.
pub fn reorder<T>(items: &mut Vec<T>, from: usize, to: usize) -> Result<(), WeaveError> {
    let len = items.len();
    if from >= len || to >= len {
        return Err(WeaveError::InvalidArgument(format!(
            "reorder {} -> {} out of range for {} items",
            from, to, len
        )));
    }
    let item = items.remove(from);
    items.insert(to, item);
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
