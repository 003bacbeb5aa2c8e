//! # weave-core
//!
//! The Fiber Lineage Model - THE LOGIC.
//!
//! A fiber is an atomic content unit that carries an append-only record of
//! every named transformation applied to it. This crate holds:
//! - the `Fiber` entity and its history invariants
//! - lineage export (JSON and a checksummed canonical binary form)
//! - the `Loom`, which owns fibers and spins them into threads
//! - collection views (search filtering, reordering)
//! - a stateless render view producing drawing instructions
//!
//! ## Architectural Constraints
//!
//! - Pure Rust: no async, no network, no logging dependency
//! - Deterministic: `BTreeMap` only, no floats, no randomness
//! - Transient: fibers live in memory; persistence is a caller concern

// =============================================================================
// MODULES
// =============================================================================

pub mod fiber;
pub mod lineage;
pub mod loom;
pub mod palette;
pub mod primitives;
pub mod render;
pub mod types;
pub mod view;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    FiberId, HistoryEntry, Label, Marker, Role, ThreadId, ThreadStatus, WeaveError,
};

// =============================================================================
// RE-EXPORTS: Model
// =============================================================================

pub use fiber::Fiber;
pub use lineage::{
    Lineage, LineageHeader, export_canonical, import_canonical, lineage_checksum,
    verify_canonical,
};
pub use loom::{FiberRecord, Loom, LoomSnapshot, Thread};

// =============================================================================
// RE-EXPORTS: Views
// =============================================================================

pub use palette::{Color, color_for};
pub use render::{DrawInstruction, Point, RenderConfig, render_fiber, render_loom};
pub use view::{Card, Searchable, filter, reorder};
