//! # CLI Command Implementations
//!
//! Every command loads the loom from its session file, applies one
//! operation, and writes the file back if anything changed.

use std::path::{Path, PathBuf};
use weave_core::{
    Card, FiberId, Loom, LoomSnapshot, RenderConfig, Role, Thread, ThreadId, ThreadStatus,
    WeaveError, export_canonical, filter, lineage_checksum, render_fiber, render_loom,
};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum size for a loom session file (100 MB).
const MAX_LOOM_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Maximum size for a card list given to `filter` (10 MB).
const MAX_CARDS_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), WeaveError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| WeaveError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(WeaveError::InvalidArgument(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Canonicalize an input path and make sure it is a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, WeaveError> {
    let canonical = path.canonicalize().map_err(|e| {
        WeaveError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(WeaveError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Canonicalize the parent of an output path, which must be an existing directory.
fn validate_output_path(path: &Path) -> Result<PathBuf, WeaveError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        WeaveError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(WeaveError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| WeaveError::IoError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

fn print_json(value: &serde_json::Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_default()
    );
}

/// Split a comma-separated id list, skipping blanks.
fn parse_ids(csv: &str) -> Vec<FiberId> {
    csv.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(FiberId::new)
        .collect()
}

fn print_thread(json_mode: bool, thread: &Thread) -> Result<(), WeaveError> {
    if json_mode {
        let value = serde_json::to_value(thread)
            .map_err(|e| WeaveError::SerializationError(e.to_string()))?;
        print_json(&value);
    } else {
        let members: Vec<&str> = thread.fiber_ids.iter().map(FiberId::as_str).collect();
        println!(
            "{} [{}, priority {}] by {}: {}",
            thread.name,
            thread.status,
            thread.priority,
            thread.spinner,
            members.join(", ")
        );
    }
    Ok(())
}

// =============================================================================
// SESSION FILE
// =============================================================================

/// Load the loom from its session file, or start an empty one.
pub fn load_loom(path: &Path) -> Result<Loom, WeaveError> {
    if !path.exists() {
        tracing::debug!(loom = %path.display(), "no session file, starting empty loom");
        return Ok(Loom::new());
    }

    let validated = validate_file_path(path)?;
    validate_file_size(&validated, MAX_LOOM_FILE_SIZE)?;

    let contents = std::fs::read_to_string(&validated)
        .map_err(|e| WeaveError::IoError(format!("Read loom: {}", e)))?;
    let loom = Loom::from_snapshot(LoomSnapshot::from_json(&contents)?)?;

    tracing::debug!(
        loom = %path.display(),
        fibers = loom.len(),
        threads = loom.thread_count(),
        "loaded session file"
    );
    Ok(loom)
}

/// Write the loom to its session file.
///
/// The snapshot goes to a `.tmp` sibling first and is renamed over the
/// session file, so an interrupted write leaves the previous loom intact.
pub fn save_loom(loom: &Loom, path: &Path) -> Result<(), WeaveError> {
    let validated = validate_output_path(path)?;
    let json = loom.snapshot().to_json()?;

    let tmp = validated.with_extension("tmp");
    std::fs::write(&tmp, json)
        .map_err(|e| WeaveError::IoError(format!("Write loom: {}", e)))?;
    std::fs::rename(&tmp, &validated)
        .map_err(|e| WeaveError::IoError(format!("Replace loom: {}", e)))?;
    Ok(())
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Create an empty session file.
pub fn cmd_init(loom_path: &Path, force: bool) -> Result<(), WeaveError> {
    if loom_path.exists() && !force {
        return Err(WeaveError::InvalidArgument(
            "Loom already exists. Use --force to overwrite.".to_string(),
        ));
    }

    save_loom(&Loom::new(), loom_path)?;
    tracing::info!(loom = %loom_path.display(), "initialized empty loom");
    println!("Initialized new loom at {:?}", loom_path);
    Ok(())
}

// =============================================================================
// FIBER COMMANDS
// =============================================================================

/// Create a fiber.
pub fn cmd_create(
    loom_path: &Path,
    json_mode: bool,
    id: &str,
    label: &str,
    role: Role,
) -> Result<(), WeaveError> {
    let mut loom = load_loom(loom_path)?;
    let lineage = loom.create(id, label, role)?.export_lineage();
    save_loom(&loom, loom_path)?;

    tracing::info!(fiber = id, label, role = %role, "created fiber");

    if json_mode {
        print_json(&serde_json::json!({
            "id": id,
            "role": role,
            "stage_tag": label,
            "history_len": lineage.history.len(),
        }));
    } else {
        println!("Created {} fiber {} ({})", role, id, label);
    }
    Ok(())
}

/// Apply a transform.
pub fn cmd_transform(
    loom_path: &Path,
    json_mode: bool,
    id: &str,
    stage: &str,
    label: &str,
    context: Option<String>,
) -> Result<(), WeaveError> {
    let mut loom = load_loom(loom_path)?;
    let fiber = loom.transform(&FiberId::new(id), stage, label, context)?;
    let history_len = fiber.history().len();
    save_loom(&loom, loom_path)?;

    tracing::info!(fiber = id, stage, label, history_len, "applied transform");

    if json_mode {
        print_json(&serde_json::json!({
            "id": id,
            "stage": stage,
            "stage_tag": label,
            "history_len": history_len,
        }));
    } else {
        println!(
            "{}: {} -> {} (history: {} entries)",
            id, stage, label, history_len
        );
    }
    Ok(())
}

/// Attach a marker.
pub fn cmd_mark(
    loom_path: &Path,
    json_mode: bool,
    id: &str,
    marker: &str,
) -> Result<(), WeaveError> {
    let mut loom = load_loom(loom_path)?;
    let marker_count = loom.add_marker(&FiberId::new(id), marker)?.markers().len();
    save_loom(&loom, loom_path)?;

    tracing::info!(fiber = id, marker, "added marker");

    if json_mode {
        print_json(&serde_json::json!({
            "id": id,
            "marker": marker,
            "marker_count": marker_count,
        }));
    } else {
        println!("{}: marked '{}' ({} markers)", id, marker, marker_count);
    }
    Ok(())
}

/// Add or remove a tag.
pub fn cmd_tag(loom_path: &Path, id: &str, tag: &str, remove: bool) -> Result<(), WeaveError> {
    let mut loom = load_loom(loom_path)?;
    let fiber_id = FiberId::new(id);
    let fiber = loom
        .get_mut(&fiber_id)
        .ok_or_else(|| WeaveError::FiberNotFound(fiber_id.clone()))?;

    if remove {
        fiber.remove_tag(tag);
    } else {
        fiber.add_tag(tag);
    }
    let tags = fiber.tags().join(", ");
    save_loom(&loom, loom_path)?;

    tracing::info!(fiber = id, tag, remove, "updated tags");
    println!("{}: tags [{}]", id, tags);
    Ok(())
}

/// Bundle fibers into threads, one thread per comma-separated bundle.
///
/// With several bundles a failing bundle is logged and skipped; the command
/// only fails if no bundle could be spun.
pub fn cmd_spin(
    loom_path: &Path,
    json_mode: bool,
    spinner: &str,
    bundles: &[String],
) -> Result<(), WeaveError> {
    let bundles: Vec<Vec<FiberId>> = bundles.iter().map(|b| parse_ids(b)).collect();

    let mut loom = load_loom(loom_path)?;
    let thread_ids = match bundles.as_slice() {
        [single] => vec![loom.spin(spinner, single)?],
        _ => {
            let mut spun = Vec::new();
            let mut first_error = None;
            for (index, result) in loom.batch_spin(spinner, &bundles).into_iter().enumerate() {
                match result {
                    Ok(thread_id) => spun.push(thread_id),
                    Err(e) => {
                        tracing::warn!(bundle = index, error = %e, "spin failed, skipping bundle");
                        if first_error.is_none() {
                            first_error = Some(e);
                        }
                    }
                }
            }
            match first_error {
                Some(e) if spun.is_empty() => return Err(e),
                _ => spun,
            }
        }
    };
    save_loom(&loom, loom_path)?;

    let threads: Vec<&Thread> = thread_ids
        .iter()
        .map(|id| loom.thread(*id).ok_or(WeaveError::ThreadNotFound(*id)))
        .collect::<Result<_, _>>()?;

    for thread in &threads {
        tracing::info!(
            thread = %thread.name,
            spinner,
            fibers = thread.fiber_ids.len(),
            "spun thread"
        );
    }

    if json_mode {
        let value = serde_json::to_value(&threads)
            .map_err(|e| WeaveError::SerializationError(e.to_string()))?;
        print_json(&value);
    } else {
        for thread in &threads {
            println!(
                "Spun {} from {} fibers",
                thread.name,
                thread.fiber_ids.len()
            );
        }
    }
    Ok(())
}

/// Drop a fiber from the loom.
pub fn cmd_remove(loom_path: &Path, id: &str) -> Result<(), WeaveError> {
    let mut loom = load_loom(loom_path)?;
    let fiber = loom.remove(&FiberId::new(id))?;
    save_loom(&loom, loom_path)?;

    tracing::info!(fiber = id, history_len = fiber.history().len(), "removed fiber");
    println!("Removed fiber {}", id);
    Ok(())
}

// =============================================================================
// THREAD COMMANDS
// =============================================================================

/// Add a fiber to a thread, appending unless `position` is given.
pub fn cmd_thread_add(
    loom_path: &Path,
    json_mode: bool,
    thread: u64,
    id: &str,
    position: Option<usize>,
) -> Result<(), WeaveError> {
    let mut loom = load_loom(loom_path)?;
    let updated = loom
        .add_to_thread(ThreadId(thread), &FiberId::new(id), position)?
        .clone();
    save_loom(&loom, loom_path)?;

    tracing::info!(thread = %updated.name, fiber = id, "added fiber to thread");
    print_thread(json_mode, &updated)
}

/// Take a fiber out of a thread.
pub fn cmd_thread_remove(loom_path: &Path, thread: u64, id: &str) -> Result<(), WeaveError> {
    let mut loom = load_loom(loom_path)?;
    let thread_id = ThreadId(thread);
    if !loom.remove_from_thread(thread_id, &FiberId::new(id))? {
        println!("{} is not in {}", id, thread_id);
        return Ok(());
    }
    save_loom(&loom, loom_path)?;

    tracing::info!(thread = %thread_id, fiber = id, "removed fiber from thread");
    println!("Removed {} from {}", id, thread_id);
    Ok(())
}

/// Replace a thread's order with the listed ids.
pub fn cmd_thread_reorder(
    loom_path: &Path,
    json_mode: bool,
    thread: u64,
    fibers: &str,
) -> Result<(), WeaveError> {
    let mut loom = load_loom(loom_path)?;
    let updated = loom
        .reorder_thread(ThreadId(thread), &parse_ids(fibers))?
        .clone();
    save_loom(&loom, loom_path)?;

    tracing::info!(thread = %updated.name, "reordered thread");
    print_thread(json_mode, &updated)
}

/// Move one member of a thread to a new position.
pub fn cmd_thread_move(
    loom_path: &Path,
    json_mode: bool,
    thread: u64,
    from: usize,
    to: usize,
) -> Result<(), WeaveError> {
    let mut loom = load_loom(loom_path)?;
    let updated = loom.move_in_thread(ThreadId(thread), from, to)?.clone();
    save_loom(&loom, loom_path)?;

    tracing::info!(thread = %updated.name, from, to, "moved thread member");
    print_thread(json_mode, &updated)
}

/// Update a thread's status and/or priority.
pub fn cmd_thread_set(
    loom_path: &Path,
    json_mode: bool,
    thread: u64,
    status: Option<ThreadStatus>,
    priority: Option<u8>,
) -> Result<(), WeaveError> {
    if status.is_none() && priority.is_none() {
        return Err(WeaveError::InvalidArgument(
            "nothing to set: pass --status and/or --priority".to_string(),
        ));
    }

    let thread_id = ThreadId(thread);
    let mut loom = load_loom(loom_path)?;
    if let Some(priority) = priority {
        loom.set_thread_priority(thread_id, priority)?;
    }
    if let Some(status) = status {
        loom.set_thread_status(thread_id, status)?;
    }
    let updated = loom
        .thread(thread_id)
        .cloned()
        .ok_or(WeaveError::ThreadNotFound(thread_id))?;
    save_loom(&loom, loom_path)?;

    tracing::info!(
        thread = %updated.name,
        status = %updated.status,
        priority = updated.priority,
        "updated thread"
    );
    print_thread(json_mode, &updated)
}

/// Show one thread, or all of them.
pub fn cmd_thread_show(
    loom_path: &Path,
    json_mode: bool,
    thread: Option<u64>,
) -> Result<(), WeaveError> {
    let loom = load_loom(loom_path)?;

    let threads: Vec<&Thread> = match thread {
        Some(id) => {
            let thread_id = ThreadId(id);
            vec![
                loom.thread(thread_id)
                    .ok_or(WeaveError::ThreadNotFound(thread_id))?,
            ]
        }
        None => loom.threads().collect(),
    };

    if json_mode {
        let value = serde_json::to_value(&threads)
            .map_err(|e| WeaveError::SerializationError(e.to_string()))?;
        print_json(&value);
        return Ok(());
    }

    if threads.is_empty() {
        println!("No threads");
    }
    for thread in threads {
        print_thread(false, thread)?;
    }
    Ok(())
}

// =============================================================================
// LINEAGE COMMAND
// =============================================================================

/// Export a fiber's lineage.
pub fn cmd_lineage(
    loom_path: &Path,
    id: &str,
    format: &str,
    output: Option<&Path>,
) -> Result<(), WeaveError> {
    let loom = load_loom(loom_path)?;
    let fiber_id = FiberId::new(id);
    let lineage = loom
        .get(&fiber_id)
        .ok_or(WeaveError::FiberNotFound(fiber_id))?
        .export_lineage();

    let data = match format {
        "json" => lineage.to_json()?.into_bytes(),
        "canonical" => {
            if output.is_none() {
                return Err(WeaveError::InvalidArgument(
                    "canonical export needs --output".to_string(),
                ));
            }
            let data = export_canonical(&lineage)?;
            println!("Checksum: {}", lineage_checksum(&lineage));
            data
        }
        _ => {
            return Err(WeaveError::InvalidArgument(format!(
                "Unknown format: {}. Use: json, canonical",
                format
            )));
        }
    };

    match output {
        Some(path) => {
            let validated = validate_output_path(path)?;
            std::fs::write(&validated, &data)
                .map_err(|e| WeaveError::IoError(format!("Write file: {}", e)))?;
            tracing::info!(fiber = id, format, bytes = data.len(), "exported lineage");
            println!("Exported {} bytes to {:?}", data.len(), validated);
        }
        None => println!("{}", String::from_utf8_lossy(&data)),
    }

    Ok(())
}

// =============================================================================
// FILTER COMMAND
// =============================================================================

/// Read a JSON array of cards.
pub fn read_cards(path: &Path) -> Result<Vec<Card>, WeaveError> {
    let validated = validate_file_path(path)?;
    validate_file_size(&validated, MAX_CARDS_FILE_SIZE)?;

    let contents = std::fs::read(&validated)
        .map_err(|e| WeaveError::IoError(format!("Read file: {}", e)))?;
    serde_json::from_slice(&contents).map_err(|e| WeaveError::DeserializationError(e.to_string()))
}

/// Print the cards matching `query`, in their original order.
pub fn cmd_filter(
    loom_path: &Path,
    json_mode: bool,
    file: Option<&Path>,
    query: &str,
) -> Result<(), WeaveError> {
    let cards = match file {
        Some(path) => read_cards(path)?,
        None => load_loom(loom_path)?.fibers().map(Card::from_fiber).collect(),
    };

    let matched = filter(&cards, query);
    tracing::debug!(query, total = cards.len(), matched = matched.len(), "filtered cards");

    if json_mode {
        let value = serde_json::to_value(&matched)
            .map_err(|e| WeaveError::SerializationError(e.to_string()))?;
        print_json(&value);
        return Ok(());
    }

    println!("{} of {} cards match {:?}", matched.len(), cards.len(), query);
    for card in matched {
        match &card.id {
            Some(id) => println!("  [{}] {} ({})", id, card.content, card.tags),
            None => println!("  {} ({})", card.content, card.tags),
        }
    }
    Ok(())
}

// =============================================================================
// RENDER COMMAND
// =============================================================================

/// Print drawing instructions for one fiber or the whole loom.
pub fn cmd_render(
    loom_path: &Path,
    id: Option<&str>,
    config: &RenderConfig,
) -> Result<(), WeaveError> {
    config.validate()?;
    let loom = load_loom(loom_path)?;

    let instructions = match id {
        Some(id) => {
            let fiber_id = FiberId::new(id);
            let fiber = loom
                .get(&fiber_id)
                .ok_or(WeaveError::FiberNotFound(fiber_id))?;
            render_fiber(fiber, 0, config)
        }
        None => render_loom(&loom, config),
    };

    let value = serde_json::to_value(&instructions)
        .map_err(|e| WeaveError::SerializationError(e.to_string()))?;
    print_json(&value);
    Ok(())
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show loom counts.
pub fn cmd_status(loom_path: &Path, json_mode: bool) -> Result<(), WeaveError> {
    let loom = load_loom(loom_path)?;

    let count_role = |role: Role| loom.fibers().filter(|f| f.role() == role).count();

    if json_mode {
        print_json(&serde_json::json!({
            "loom": loom_path.to_string_lossy(),
            "fibers": loom.len(),
            "warp": count_role(Role::Warp),
            "weft": count_role(Role::Weft),
            "plain": count_role(Role::Plain),
            "threads": loom.thread_count(),
            "history_entries": loom.history_entry_count(),
            "markers": loom.marker_count(),
        }));
        return Ok(());
    }

    println!("Weave Loom Status");
    println!("=================");
    println!("Loom:    {:?}", loom_path);
    println!();
    println!(
        "Fibers:  {} (warp {}, weft {}, plain {})",
        loom.len(),
        count_role(Role::Warp),
        count_role(Role::Weft),
        count_role(Role::Plain)
    );
    println!("Threads: {}", loom.thread_count());
    println!("History: {} entries", loom.history_entry_count());
    println!("Markers: {}", loom.marker_count());

    Ok(())
}

// =============================================================================
// HASH COMMAND
// =============================================================================

/// Digests of a fiber's lineage: the canonical checksum and the BLAKE3 hex
/// of its canonical export.
pub fn fiber_digests(loom: &Loom, id: &str) -> Result<(u64, String), WeaveError> {
    let fiber_id = FiberId::new(id);
    let lineage = loom
        .get(&fiber_id)
        .ok_or(WeaveError::FiberNotFound(fiber_id))?
        .export_lineage();

    let checksum = lineage_checksum(&lineage);
    let blake3 = weave_core::lineage::lineage_crypto_hash(&lineage)?;
    Ok((checksum, blake3))
}

/// Checksum a fiber's canonical lineage.
pub fn cmd_hash(loom_path: &Path, json_mode: bool, id: &str) -> Result<(), WeaveError> {
    let loom = load_loom(loom_path)?;
    let (checksum, blake3) = fiber_digests(&loom, id)?;

    if json_mode {
        print_json(&serde_json::json!({
            "id": id,
            "checksum": checksum,
            "blake3": blake3,
        }));
    } else {
        println!("Checksum: {}", checksum);
        println!("BLAKE3:   {}", blake3);
    }
    Ok(())
}
