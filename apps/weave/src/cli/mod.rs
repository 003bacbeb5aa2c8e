//! # Weave CLI Module
//!
//! This module implements the CLI interface for Weave.
//!
//! ## Available Commands
//!
//! - `init` - Create an empty loom session file
//! - `create` - Create a fiber
//! - `transform` - Apply a named stage transition to a fiber
//! - `mark` - Attach a marker to a fiber
//! - `tag` - Add or remove a fiber tag
//! - `spin` - Bundle fibers into threads
//! - `thread` - Edit a thread's members, order, status or priority
//! - `remove` - Drop a fiber from the loom
//! - `lineage` - Export a fiber's lineage
//! - `filter` - Search cards by content or tags
//! - `render` - Print drawing instructions
//! - `status` - Show loom counts
//! - `hash` - Checksum a fiber's canonical lineage

mod commands;

use crate::config::Config;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use weave_core::{Role, ThreadStatus, WeaveError};

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Weave - fiber lineage tracking
///
/// Records every named transformation a content unit goes through.
#[derive(Parser, Debug)]
#[command(name = "weave")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress informational output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the loom session file (overrides config)
    #[arg(short = 'L', long, global = true)]
    pub loom: Option<PathBuf>,

    /// Path to a TOML config file (default: ./weave.toml if present)
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create an empty loom session file
    Init {
        /// Overwrite an existing session file
        #[arg(short, long)]
        force: bool,
    },

    /// Create a fiber
    Create {
        /// Fiber identifier
        #[arg(short, long)]
        id: String,

        /// Initial classification label
        #[arg(short, long)]
        label: String,

        /// Fiber role (warp, weft, plain)
        #[arg(short, long, default_value = "plain")]
        role: Role,
    },

    /// Apply a named stage transition to a fiber
    Transform {
        #[arg(short, long)]
        id: String,

        /// Stage name (e.g. spin, warp, weft)
        #[arg(short, long)]
        stage: String,

        /// Resulting classification label
        #[arg(short, long)]
        label: String,

        /// Why the transform happened
        #[arg(short = 'x', long)]
        context: Option<String>,
    },

    /// Attach a marker to a fiber
    Mark {
        #[arg(short, long)]
        id: String,

        #[arg(short, long)]
        marker: String,
    },

    /// Add or remove a fiber tag
    Tag {
        #[arg(short, long)]
        id: String,

        #[arg(short, long)]
        tag: String,

        /// Remove the tag instead of adding it
        #[arg(short, long)]
        remove: bool,
    },

    /// Bundle fibers into threads
    Spin {
        /// Spinner name recorded on the thread
        #[arg(short, long, default_value = "spinner")]
        spinner: String,

        /// Fiber IDs (comma-separated); repeat for one thread per bundle
        #[arg(short, long, required = true)]
        fibers: Vec<String>,
    },

    /// Edit a spun thread
    Thread {
        #[command(subcommand)]
        action: ThreadAction,
    },

    /// Drop a fiber from the loom
    Remove {
        #[arg(short, long)]
        id: String,
    },

    /// Export a fiber's lineage
    Lineage {
        #[arg(short, long)]
        id: String,

        /// Export format (json, canonical)
        #[arg(short = 't', long, default_value = "json")]
        format: String,

        /// Output file (required for canonical, stdout for json otherwise)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Search cards by content or tags (case-insensitive)
    Filter {
        /// JSON file with an array of cards; defaults to the loom's fibers
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Substring to look for
        #[arg(short = 'Q', long, default_value = "")]
        query: String,
    },

    /// Print drawing instructions as JSON
    Render {
        /// Render a single fiber instead of the whole loom
        #[arg(short, long)]
        id: Option<String>,
    },

    /// Show loom counts
    Status,

    /// Checksum a fiber's canonical lineage
    Hash {
        #[arg(short, long)]
        id: String,
    },
}

/// Thread editing actions.
#[derive(Subcommand, Debug)]
pub enum ThreadAction {
    /// Show one thread, or all threads
    Show {
        #[arg(short = 'T', long)]
        thread: Option<u64>,
    },

    /// Add a fiber to a thread
    Add {
        #[arg(short = 'T', long)]
        thread: u64,

        #[arg(short, long)]
        id: String,

        /// Insert position (appends when omitted or past the end)
        #[arg(short, long)]
        position: Option<usize>,
    },

    /// Take a fiber out of a thread
    Remove {
        #[arg(short = 'T', long)]
        thread: u64,

        #[arg(short, long)]
        id: String,
    },

    /// Replace a thread's order; must list exactly its current members
    Reorder {
        #[arg(short = 'T', long)]
        thread: u64,

        /// Fiber IDs in the new order (comma-separated)
        #[arg(short, long)]
        fibers: String,
    },

    /// Move the member at one position to another
    Move {
        #[arg(short = 'T', long)]
        thread: u64,

        #[arg(long)]
        from: usize,

        #[arg(long)]
        to: usize,
    },

    /// Set status and/or priority
    Set {
        #[arg(short = 'T', long)]
        thread: u64,

        /// open, in-progress or closed
        #[arg(short, long)]
        status: Option<ThreadStatus>,

        /// 1 to 5
        #[arg(short, long)]
        priority: Option<u8>,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments and resolved config.
pub fn execute(cli: Cli, config: &Config) -> Result<(), WeaveError> {
    let loom_path = cli.loom.clone().unwrap_or_else(|| config.loom.clone());
    let json_mode = cli.json_mode;

    tracing::debug!(loom = %loom_path.display(), "resolved session file");

    match cli.command {
        Some(Commands::Init { force }) => cmd_init(&loom_path, force),
        Some(Commands::Create { id, label, role }) => {
            cmd_create(&loom_path, json_mode, &id, &label, role)
        }
        Some(Commands::Transform {
            id,
            stage,
            label,
            context,
        }) => cmd_transform(&loom_path, json_mode, &id, &stage, &label, context),
        Some(Commands::Mark { id, marker }) => cmd_mark(&loom_path, json_mode, &id, &marker),
        Some(Commands::Tag { id, tag, remove }) => cmd_tag(&loom_path, &id, &tag, remove),
        Some(Commands::Spin { spinner, fibers }) => {
            cmd_spin(&loom_path, json_mode, &spinner, &fibers)
        }
        Some(Commands::Thread { action }) => execute_thread(&loom_path, json_mode, action),
        Some(Commands::Remove { id }) => cmd_remove(&loom_path, &id),
        Some(Commands::Lineage { id, format, output }) => {
            cmd_lineage(&loom_path, &id, &format, output.as_deref())
        }
        Some(Commands::Filter { file, query }) => {
            cmd_filter(&loom_path, json_mode, file.as_deref(), &query)
        }
        Some(Commands::Render { id }) => cmd_render(&loom_path, id.as_deref(), &config.render),
        Some(Commands::Status) => cmd_status(&loom_path, json_mode),
        Some(Commands::Hash { id }) => cmd_hash(&loom_path, json_mode, &id),
        None => {
            // No subcommand - show status by default
            cmd_status(&loom_path, json_mode)
        }
    }
}

fn execute_thread(
    loom_path: &Path,
    json_mode: bool,
    action: ThreadAction,
) -> Result<(), WeaveError> {
    match action {
        ThreadAction::Show { thread } => cmd_thread_show(loom_path, json_mode, thread),
        ThreadAction::Add {
            thread,
            id,
            position,
        } => cmd_thread_add(loom_path, json_mode, thread, &id, position),
        ThreadAction::Remove { thread, id } => cmd_thread_remove(loom_path, thread, &id),
        ThreadAction::Reorder { thread, fibers } => {
            cmd_thread_reorder(loom_path, json_mode, thread, &fibers)
        }
        ThreadAction::Move { thread, from, to } => {
            cmd_thread_move(loom_path, json_mode, thread, from, to)
        }
        ThreadAction::Set {
            thread,
            status,
            priority,
        } => cmd_thread_set(loom_path, json_mode, thread, status, priority),
    }
}
