//! # Core Type Definitions
//!
//! This module contains the value types shared by every part of the lineage model:
//! - Identifiers (`FiberId`, `ThreadId`)
//! - Classification and annotation values (`Label`, `Marker`, `Role`)
//! - The provenance record (`HistoryEntry`)
//! - Error types (`WeaveError`)
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Use integer arithmetic only (no floating-point)
//! - Implement `Ord` where they key a `BTreeMap` or `BTreeSet`
//! - Use saturating arithmetic for counters to prevent overflow

use crate::primitives::START_STAGE;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Opaque, stable identifier of a fiber.
///
/// Assigned by the caller at creation and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FiberId(pub String);

impl FiberId {
    /// Create a new fiber identifier.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FiberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FiberId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Identifier of a spun thread inside a loom.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct ThreadId(pub u64);

impl ThreadId {
    /// The identifier following this one. Saturates at `u64::MAX`.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "thread-{}", self.0)
    }
}

// =============================================================================
// LABELS & MARKERS
// =============================================================================

/// Classification label of a fiber (its current color / processing stage).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Label(pub String);

impl Label {
    /// Create a new label from a string.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the label as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lightweight annotation attached to a fiber without changing its stage.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Marker(pub String);

impl Marker {
    /// Create a new marker from a string.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the marker as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// ROLE
// =============================================================================

/// The structural role a fiber plays in a weave.
///
/// Roles carry no behavior of their own; they only affect how a view
/// lays the fiber out.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Lengthwise fiber, held in tension.
    Warp,
    /// Crosswise fiber, woven through the warp.
    Weft,
    /// Free fiber with no loom position.
    #[default]
    Plain,
}

impl Role {
    /// Lowercase name of the role.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Warp => "warp",
            Self::Weft => "weft",
            Self::Plain => "plain",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Role {
    type Err = WeaveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "warp" => Ok(Self::Warp),
            "weft" => Ok(Self::Weft),
            "plain" => Ok(Self::Plain),
            other => Err(WeaveError::InvalidArgument(format!(
                "unknown role '{}' (expected warp, weft or plain)",
                other
            ))),
        }
    }
}

// =============================================================================
// THREAD STATUS
// =============================================================================

/// Workflow state of a spun thread.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "kebab-case")]
pub enum ThreadStatus {
    #[default]
    Open,
    InProgress,
    Closed,
}

impl ThreadStatus {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in-progress",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for ThreadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for ThreadStatus {
    type Err = WeaveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "in-progress" => Ok(Self::InProgress),
            "closed" => Ok(Self::Closed),
            other => Err(WeaveError::InvalidArgument(format!(
                "unknown thread status '{}' (expected open, in-progress or closed)",
                other
            ))),
        }
    }
}

// =============================================================================
// HISTORY ENTRY
// =============================================================================

/// One record in a fiber's lineage.
///
/// `label` is also accepted as `color` on input, the name older
/// snapshots used for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Name of the transform applied, or `"start"` for the creation entry.
    pub stage: String,
    /// Classification label after the transform.
    #[serde(alias = "color")]
    pub label: Label,
    /// Why the transform happened. Absent is a valid value.
    #[serde(default)]
    pub context: Option<String>,
}

impl HistoryEntry {
    /// Create a history entry.
    #[must_use]
    pub fn new(stage: impl Into<String>, label: Label, context: Option<String>) -> Self {
        Self {
            stage: stage.into(),
            label,
            context,
        }
    }

    /// Create the creation entry for a fresh fiber.
    #[must_use]
    pub fn start(label: Label) -> Self {
        Self::new(START_STAGE, label, None)
    }

    /// Whether this is a creation entry.
    #[must_use]
    pub fn is_start(&self) -> bool {
        self.stage == START_STAGE
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the lineage model.
///
/// - No silent failures
/// - Use `Result<T, WeaveError>` for fallible operations
/// - The core never panics; all errors are recoverable
#[derive(Debug, Error)]
pub enum WeaveError {
    /// A caller-supplied argument was empty, too long or out of range.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The requested fiber is not held by the loom.
    #[error("Fiber not found: {0}")]
    FiberNotFound(FiberId),

    /// A fiber with the same id is already held by the loom.
    #[error("Duplicate fiber: {0}")]
    DuplicateFiber(FiberId),

    /// The requested thread is not held by the loom.
    #[error("Thread not found: {0}")]
    ThreadNotFound(ThreadId),

    /// A lineage violates the append-only history invariants.
    #[error("Lineage corrupted: {0}")]
    LineageCorrupted(String),

    /// A serialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A deserialization error occurred.
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================
