//! # Primitives
//!
//! Fixed constants for the lineage model.
//!
//! These are compiled into the binary and are immutable at runtime.

/// Stage name of the creation entry every fiber starts with.
pub const START_STAGE: &str = "start";

/// Well-known stage: fibers bundled into a thread by a spinner.
pub const SPIN_STAGE: &str = "spin";

/// Well-known stage: fiber laid onto the warp.
pub const WARP_STAGE: &str = "warp";

/// Well-known stage: fiber woven through as weft.
pub const WEFT_STAGE: &str = "weft";

/// The stage names seen in practice. Not enforced: stage names are free-form.
pub const KNOWN_STAGES: [&str; 4] = [START_STAGE, SPIN_STAGE, WARP_STAGE, WEFT_STAGE];

/// Tag applied to every thread produced by a spinner.
pub const SPUN_TAG: &str = "spun";

/// Thread priority bounds and the priority a fresh thread gets.
pub const MIN_PRIORITY: u8 = 1;
pub const MAX_PRIORITY: u8 = 5;
pub const DEFAULT_PRIORITY: u8 = 3;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length for fiber identifiers.
pub const MAX_ID_LENGTH: usize = 256;

/// Maximum length for labels and stage names.
pub const MAX_LABEL_LENGTH: usize = 256;

/// Largest width, height, spacing or stroke a render config may use.
pub const MAX_CANVAS_EXTENT: i64 = 1_000_000;

/// Maximum history length accepted on import.
///
/// In-memory transforms are never refused; this only bounds untrusted input.
pub const MAX_IMPORT_HISTORY: u64 = 1_000_000;

/// Maximum marker count accepted on import.
pub const MAX_IMPORT_MARKERS: u64 = 1_000_000;
