//! # Fiber Entity
//!
//! A fiber is an atomic content unit with an append-only transformation
//! history.
//!
//! Invariants held for the whole lifetime of a `Fiber`:
//! - `history` is never empty and starts with a `"start"` entry
//! - `history` only grows; entries are never reordered or removed
//! - `stage_tag` equals the label of the last history entry
//! - `markers` only grows and may contain duplicates
//!
//! The fields are private so that these invariants can only be changed
//! through `transform` and `add_marker`.

use crate::lineage::Lineage;
use crate::primitives::{MAX_ID_LENGTH, MAX_LABEL_LENGTH};
use crate::{FiberId, HistoryEntry, Label, Marker, Role, WeaveError};

/// A content unit and its provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fiber {
    id: FiberId,
    role: Role,
    stage_tag: Label,
    history: Vec<HistoryEntry>,
    markers: Vec<Marker>,
    /// Lowercased, unique, insertion-ordered.
    tags: Vec<String>,
}

impl Fiber {
    /// Create a plain fiber with a single `"start"` history entry.
    ///
    /// Returns `WeaveError::InvalidArgument` if `id` or `initial_label` is
    /// empty or longer than the configured limits.
    pub fn create(
        id: impl Into<String>,
        initial_label: impl Into<String>,
    ) -> Result<Self, WeaveError> {
        Self::with_role(id, initial_label, Role::Plain)
    }

    /// Create a fiber with an explicit role.
    pub fn with_role(
        id: impl Into<String>,
        initial_label: impl Into<String>,
        role: Role,
    ) -> Result<Self, WeaveError> {
        let id = FiberId::new(id);
        let label = Label::new(initial_label);
        validate_id(&id)?;
        validate_label(&label)?;

        Ok(Self {
            id,
            role,
            stage_tag: label.clone(),
            history: vec![HistoryEntry::start(label)],
            markers: Vec::new(),
            tags: Vec::new(),
        })
    }

    /// Rebuild a fiber from an exported lineage.
    ///
    /// The lineage must satisfy the history invariants; tags are not part
    /// of a lineage and start empty.
    pub fn from_lineage(lineage: Lineage, role: Role) -> Result<Self, WeaveError> {
        lineage.validate()?;
        let Lineage {
            id,
            history,
            markers,
        } = lineage;

        let stage_tag = history
            .last()
            .map(|entry| entry.label.clone())
            .ok_or_else(|| WeaveError::LineageCorrupted("empty history".to_string()))?;

        Ok(Self {
            id,
            role,
            stage_tag,
            history,
            markers,
            tags: Vec::new(),
        })
    }

    // -------------------------------------------------------------------------
    // MUTATIONS
    // -------------------------------------------------------------------------

    /// Apply a named stage transition.
    ///
    /// Appends `{stage, new_label, context}` to the history and moves the
    /// stage tag to `new_label`. Always succeeds.
    pub fn transform(
        &mut self,
        stage: impl Into<String>,
        new_label: impl Into<String>,
        context: Option<String>,
    ) -> &mut Self {
        let label = Label::new(new_label);
        self.stage_tag = label.clone();
        self.history.push(HistoryEntry::new(stage, label, context));
        self
    }

    /// Attach a marker. Duplicates are kept.
    pub fn add_marker(&mut self, marker: impl Into<String>) -> &mut Self {
        self.markers.push(Marker::new(marker));
        self
    }

    /// Add a tag, lowercased. Adding an existing tag is a no-op.
    pub fn add_tag(&mut self, tag: &str) -> &mut Self {
        let norm = tag.to_lowercase();
        if !self.tags.contains(&norm) {
            self.tags.push(norm);
        }
        self
    }

    /// Remove a tag, compared case-insensitively.
    pub fn remove_tag(&mut self, tag: &str) -> &mut Self {
        let norm = tag.to_lowercase();
        self.tags.retain(|t| *t != norm);
        self
    }

    // -------------------------------------------------------------------------
    // READS
    // -------------------------------------------------------------------------

    /// Snapshot of the id, full history and markers. Pure read.
    #[must_use]
    pub fn export_lineage(&self) -> Lineage {
        Lineage {
            id: self.id.clone(),
            history: self.history.clone(),
            markers: self.markers.clone(),
        }
    }

    #[must_use]
    pub fn id(&self) -> &FiberId {
        &self.id
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    /// The current classification label.
    #[must_use]
    pub fn stage_tag(&self) -> &Label {
        &self.stage_tag
    }

    #[must_use]
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    #[must_use]
    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Whether the fiber carries `tag` (case-insensitive).
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        let norm = tag.to_lowercase();
        self.tags.contains(&norm)
    }

    /// The most recent history entry.
    #[must_use]
    pub fn current(&self) -> Option<&HistoryEntry> {
        self.history.last()
    }

    /// Number of transforms applied since creation.
    #[must_use]
    pub fn revision_count(&self) -> usize {
        self.history.len().saturating_sub(1)
    }

    pub(crate) fn set_tags(&mut self, tags: &[String]) {
        for tag in tags {
            self.add_tag(tag);
        }
    }
}

// =============================================================================
// VALIDATION
// =============================================================================

fn validate_id(id: &FiberId) -> Result<(), WeaveError> {
    if id.as_str().is_empty() {
        return Err(WeaveError::InvalidArgument(
            "fiber id must not be empty".to_string(),
        ));
    }
    if id.as_str().len() > MAX_ID_LENGTH {
        return Err(WeaveError::InvalidArgument(format!(
            "fiber id exceeds {} bytes",
            MAX_ID_LENGTH
        )));
    }
    Ok(())
}

fn validate_label(label: &Label) -> Result<(), WeaveError> {
    if label.as_str().is_empty() {
        return Err(WeaveError::InvalidArgument(
            "initial label must not be empty".to_string(),
        ));
    }
    if label.as_str().len() > MAX_LABEL_LENGTH {
        return Err(WeaveError::InvalidArgument(format!(
            "label exceeds {} bytes",
            MAX_LABEL_LENGTH
        )));
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
