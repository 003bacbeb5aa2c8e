//! # Loom
//!
//! The owning collection of fibers.
//!
//! A fiber never deletes itself; dropping unreferenced fibers is the loom's
//! job (`Loom::remove`). The loom also records the threads spinners produce
//! from bundles of fibers, and edits their membership afterwards.
//!
//! Membership edits after a spin (add, remove, reorder) do not touch fiber
//! history; only the spin itself is part of a fiber's lineage.
//!
//! All keyed storage uses `BTreeMap` so iteration order is deterministic.

use crate::lineage::Lineage;
use crate::primitives::{DEFAULT_PRIORITY, MAX_PRIORITY, MIN_PRIORITY, SPIN_STAGE, SPUN_TAG};
use crate::view::reorder;
use crate::{Fiber, FiberId, Role, ThreadId, ThreadStatus, WeaveError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// THREAD
// =============================================================================

/// A bundle of fibers produced by one spin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    pub id: ThreadId,
    /// Display name, `thread-<id>`.
    pub name: String,
    /// Name of the spinner that produced the thread.
    pub spinner: String,
    /// Member fibers, in thread order. No id appears twice.
    pub fiber_ids: Vec<FiberId>,
    pub tags: Vec<String>,
    #[serde(default)]
    pub status: ThreadStatus,
    /// In `MIN_PRIORITY..=MAX_PRIORITY`.
    #[serde(default = "default_priority")]
    pub priority: u8,
}

fn default_priority() -> u8 {
    DEFAULT_PRIORITY
}

fn check_priority(priority: u8) -> Result<(), WeaveError> {
    if (MIN_PRIORITY..=MAX_PRIORITY).contains(&priority) {
        Ok(())
    } else {
        Err(WeaveError::InvalidArgument(format!(
            "priority {} outside {}..={}",
            priority, MIN_PRIORITY, MAX_PRIORITY
        )))
    }
}

// =============================================================================
// LOOM
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct Loom {
    fibers: BTreeMap<FiberId, Fiber>,
    threads: BTreeMap<ThreadId, Thread>,
    next_thread_id: ThreadId,
}

impl Loom {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fiber and take ownership of it.
    pub fn create(
        &mut self,
        id: impl Into<String>,
        initial_label: impl Into<String>,
        role: Role,
    ) -> Result<&mut Fiber, WeaveError> {
        let fiber = Fiber::with_role(id, initial_label, role)?;
        self.insert(fiber)
    }

    /// Take ownership of an existing fiber.
    ///
    /// Returns `WeaveError::DuplicateFiber` if the id is already taken.
    pub fn insert(&mut self, fiber: Fiber) -> Result<&mut Fiber, WeaveError> {
        use std::collections::btree_map::Entry;

        match self.fibers.entry(fiber.id().clone()) {
            Entry::Occupied(e) => Err(WeaveError::DuplicateFiber(e.key().clone())),
            Entry::Vacant(e) => Ok(e.insert(fiber)),
        }
    }

    #[must_use]
    pub fn get(&self, id: &FiberId) -> Option<&Fiber> {
        self.fibers.get(id)
    }

    pub fn get_mut(&mut self, id: &FiberId) -> Option<&mut Fiber> {
        self.fibers.get_mut(id)
    }

    fn require_mut(&mut self, id: &FiberId) -> Result<&mut Fiber, WeaveError> {
        self.fibers
            .get_mut(id)
            .ok_or_else(|| WeaveError::FiberNotFound(id.clone()))
    }

    /// Apply a transform to a held fiber.
    pub fn transform(
        &mut self,
        id: &FiberId,
        stage: impl Into<String>,
        new_label: impl Into<String>,
        context: Option<String>,
    ) -> Result<&Fiber, WeaveError> {
        let fiber = self.require_mut(id)?;
        fiber.transform(stage, new_label, context);
        Ok(&*fiber)
    }

    /// Attach a marker to a held fiber.
    pub fn add_marker(
        &mut self,
        id: &FiberId,
        marker: impl Into<String>,
    ) -> Result<&Fiber, WeaveError> {
        let fiber = self.require_mut(id)?;
        fiber.add_marker(marker);
        Ok(&*fiber)
    }

    /// Drop a fiber from the loom, returning it.
    ///
    /// Threads keep referring to the id; their membership is history.
    pub fn remove(&mut self, id: &FiberId) -> Result<Fiber, WeaveError> {
        self.fibers
            .remove(id)
            .ok_or_else(|| WeaveError::FiberNotFound(id.clone()))
    }

    /// Bundle fibers into a new thread.
    ///
    /// Every member gets a `spin` transform whose context names the thread;
    /// its label is kept. Nothing is mutated unless every id is held and
    /// distinct.
    pub fn spin(&mut self, spinner: &str, ids: &[FiberId]) -> Result<ThreadId, WeaveError> {
        if spinner.is_empty() {
            return Err(WeaveError::InvalidArgument(
                "spinner name must not be empty".to_string(),
            ));
        }
        if ids.is_empty() {
            return Err(WeaveError::InvalidArgument(
                "cannot spin an empty bundle".to_string(),
            ));
        }
        let mut seen = BTreeSet::new();
        for id in ids {
            if !seen.insert(id) {
                return Err(WeaveError::InvalidArgument(format!(
                    "fiber {} listed twice",
                    id
                )));
            }
            if !self.fibers.contains_key(id) {
                return Err(WeaveError::FiberNotFound(id.clone()));
            }
        }

        let thread_id = self.next_thread_id;
        self.next_thread_id = thread_id.next();
        let name = thread_id.to_string();

        for id in ids {
            let fiber = self.require_mut(id)?;
            let label = fiber.stage_tag().as_str().to_string();
            fiber.transform(SPIN_STAGE, label, Some(name.clone()));
        }

        self.threads.insert(
            thread_id,
            Thread {
                id: thread_id,
                name,
                spinner: spinner.to_string(),
                fiber_ids: ids.to_vec(),
                tags: vec![SPUN_TAG.to_string()],
                status: ThreadStatus::Open,
                priority: DEFAULT_PRIORITY,
            },
        );

        Ok(thread_id)
    }

    /// Spin several bundles, one thread each.
    ///
    /// Bundles are independent: a failing bundle leaves the loom untouched
    /// and does not stop the ones after it.
    pub fn batch_spin(
        &mut self,
        spinner: &str,
        bundles: &[Vec<FiberId>],
    ) -> Vec<Result<ThreadId, WeaveError>> {
        bundles
            .iter()
            .map(|bundle| self.spin(spinner, bundle))
            .collect()
    }

    // -------------------------------------------------------------------------
    // THREAD MEMBERSHIP
    // -------------------------------------------------------------------------

    fn require_thread_mut(&mut self, id: ThreadId) -> Result<&mut Thread, WeaveError> {
        self.threads
            .get_mut(&id)
            .ok_or(WeaveError::ThreadNotFound(id))
    }

    /// Add a held fiber to a thread.
    ///
    /// `None` or a position past the end appends.
    pub fn add_to_thread(
        &mut self,
        thread_id: ThreadId,
        fiber_id: &FiberId,
        position: Option<usize>,
    ) -> Result<&Thread, WeaveError> {
        if !self.fibers.contains_key(fiber_id) {
            return Err(WeaveError::FiberNotFound(fiber_id.clone()));
        }
        let thread = self.require_thread_mut(thread_id)?;
        if thread.fiber_ids.contains(fiber_id) {
            return Err(WeaveError::InvalidArgument(format!(
                "fiber {} already in {}",
                fiber_id, thread.name
            )));
        }

        match position {
            Some(pos) if pos <= thread.fiber_ids.len() => {
                thread.fiber_ids.insert(pos, fiber_id.clone());
            }
            _ => thread.fiber_ids.push(fiber_id.clone()),
        }
        Ok(&*thread)
    }

    /// Take a fiber out of a thread. Returns whether it was a member.
    pub fn remove_from_thread(
        &mut self,
        thread_id: ThreadId,
        fiber_id: &FiberId,
    ) -> Result<bool, WeaveError> {
        let thread = self.require_thread_mut(thread_id)?;
        let before = thread.fiber_ids.len();
        thread.fiber_ids.retain(|id| id != fiber_id);
        Ok(thread.fiber_ids.len() != before)
    }

    /// Replace a thread's order.
    ///
    /// `new_order` must name exactly the current members, each once.
    pub fn reorder_thread(
        &mut self,
        thread_id: ThreadId,
        new_order: &[FiberId],
    ) -> Result<&Thread, WeaveError> {
        let thread = self.require_thread_mut(thread_id)?;

        let wanted: BTreeSet<&FiberId> = new_order.iter().collect();
        let current: BTreeSet<&FiberId> = thread.fiber_ids.iter().collect();
        if wanted.len() != new_order.len() || wanted != current {
            return Err(WeaveError::InvalidArgument(format!(
                "fiber ids mismatch for {}",
                thread.name
            )));
        }

        thread.fiber_ids = new_order.to_vec();
        Ok(&*thread)
    }

    /// Move the member at `from` to position `to`.
    pub fn move_in_thread(
        &mut self,
        thread_id: ThreadId,
        from: usize,
        to: usize,
    ) -> Result<&Thread, WeaveError> {
        let thread = self.require_thread_mut(thread_id)?;
        reorder(&mut thread.fiber_ids, from, to)?;
        Ok(&*thread)
    }

    pub fn set_thread_status(
        &mut self,
        thread_id: ThreadId,
        status: ThreadStatus,
    ) -> Result<&Thread, WeaveError> {
        let thread = self.require_thread_mut(thread_id)?;
        thread.status = status;
        Ok(&*thread)
    }

    /// Set a thread's priority. Must be in `MIN_PRIORITY..=MAX_PRIORITY`.
    pub fn set_thread_priority(
        &mut self,
        thread_id: ThreadId,
        priority: u8,
    ) -> Result<&Thread, WeaveError> {
        check_priority(priority)?;
        let thread = self.require_thread_mut(thread_id)?;
        thread.priority = priority;
        Ok(&*thread)
    }

    #[must_use]
    pub fn thread(&self, id: ThreadId) -> Option<&Thread> {
        self.threads.get(&id)
    }

    /// All threads, oldest first.
    pub fn threads(&self) -> impl Iterator<Item = &Thread> {
        self.threads.values()
    }

    /// All fibers, in id order.
    pub fn fibers(&self) -> impl Iterator<Item = &Fiber> {
        self.fibers.values()
    }

    /// Lineage of every fiber, in id order.
    #[must_use]
    pub fn lineages(&self) -> Vec<Lineage> {
        self.fibers.values().map(Fiber::export_lineage).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fibers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fibers.is_empty()
    }

    #[must_use]
    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    /// Total history entries across all fibers.
    #[must_use]
    pub fn history_entry_count(&self) -> usize {
        self.fibers.values().map(|f| f.history().len()).sum()
    }

    /// Total markers across all fibers.
    #[must_use]
    pub fn marker_count(&self) -> usize {
        self.fibers.values().map(|f| f.markers().len()).sum()
    }

    // -------------------------------------------------------------------------
    // SNAPSHOTS
    // -------------------------------------------------------------------------

    /// Capture the loom as a serializable snapshot.
    #[must_use]
    pub fn snapshot(&self) -> LoomSnapshot {
        LoomSnapshot {
            fibers: self
                .fibers
                .values()
                .map(|f| FiberRecord {
                    role: f.role(),
                    tags: f.tags().to_vec(),
                    lineage: f.export_lineage(),
                })
                .collect(),
            threads: self.threads.values().cloned().collect(),
            next_thread_id: self.next_thread_id,
        }
    }

    /// Rebuild a loom from a snapshot, checking every fiber's lineage.
    ///
    /// Threads must have distinct ids, distinct members and a priority in
    /// range. Members need not be held: a removed fiber stays in the
    /// threads it was spun into.
    pub fn from_snapshot(snapshot: LoomSnapshot) -> Result<Self, WeaveError> {
        let mut loom = Self::new();

        for record in snapshot.fibers {
            let mut fiber = Fiber::from_lineage(record.lineage, record.role)?;
            fiber.set_tags(&record.tags);
            loom.insert(fiber)?;
        }

        let mut highest = None;
        for thread in snapshot.threads {
            let members: BTreeSet<&FiberId> = thread.fiber_ids.iter().collect();
            if members.len() != thread.fiber_ids.len() {
                return Err(WeaveError::LineageCorrupted(format!(
                    "{} lists a fiber twice",
                    thread.id
                )));
            }
            check_priority(thread.priority)
                .map_err(|e| WeaveError::LineageCorrupted(format!("{}: {}", thread.id, e)))?;

            highest = highest.max(Some(thread.id));
            if loom.threads.contains_key(&thread.id) {
                return Err(WeaveError::LineageCorrupted(format!(
                    "duplicate thread id {}",
                    thread.id
                )));
            }
            loom.threads.insert(thread.id, thread);
        }

        // Never hand out an id an existing thread already uses.
        let floor = highest.map(ThreadId::next).unwrap_or_default();
        loom.next_thread_id = snapshot.next_thread_id.max(floor);

        Ok(loom)
    }
}

// =============================================================================
// SNAPSHOT FORMAT
// =============================================================================

/// One fiber inside a [`LoomSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiberRecord {
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub lineage: Lineage,
}

/// Serializable state of a whole loom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LoomSnapshot {
    #[serde(default)]
    pub fibers: Vec<FiberRecord>,
    #[serde(default)]
    pub threads: Vec<Thread>,
    #[serde(default)]
    pub next_thread_id: ThreadId,
}

impl LoomSnapshot {
    /// Encode as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, WeaveError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| WeaveError::SerializationError(e.to_string()))
    }

    /// Decode from JSON. Lineages are checked by [`Loom::from_snapshot`].
    pub fn from_json(json: &str) -> Result<Self, WeaveError> {
        serde_json::from_str(json).map_err(|e| WeaveError::DeserializationError(e.to_string()))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> FiberId {
        FiberId::new(s)
    }

    fn sample_loom() -> Loom {
        let mut loom = Loom::new();
        loom.create("a", "raw", Role::Warp).expect("create");
        loom.create("b", "raw", Role::Weft).expect("create");
        loom.create("c", "draft", Role::Plain).expect("create");
        loom
    }

    #[test]
    fn create_and_get() {
        let loom = sample_loom();
        assert_eq!(loom.len(), 3);
        assert_eq!(loom.get(&id("a")).expect("a").role(), Role::Warp);
        assert!(loom.get(&id("z")).is_none());
    }

    #[test]
    fn duplicate_insert_rejected() {
        let mut loom = sample_loom();
        let result = loom.create("a", "other", Role::Plain);
        assert!(matches!(result, Err(WeaveError::DuplicateFiber(_))));
        assert_eq!(loom.get(&id("a")).expect("a").stage_tag().as_str(), "raw");
    }

    #[test]
    fn transform_unknown_fiber() {
        let mut loom = sample_loom();
        assert!(matches!(
            loom.transform(&id("z"), "spin", "x", None),
            Err(WeaveError::FiberNotFound(_))
        ));
    }

    #[test]
    fn transform_and_mark_through_loom() {
        let mut loom = sample_loom();
        loom.transform(&id("a"), "warp", "green", None)
            .expect("transform");
        loom.add_marker(&id("a"), "checked").expect("mark");

        let fiber = loom.get(&id("a")).expect("a");
        assert_eq!(fiber.stage_tag().as_str(), "green");
        assert_eq!(fiber.markers().len(), 1);
        assert_eq!(loom.history_entry_count(), 4);
        assert_eq!(loom.marker_count(), 1);
    }

    #[test]
    fn remove_returns_fiber() {
        let mut loom = sample_loom();
        let fiber = loom.remove(&id("b")).expect("remove");
        assert_eq!(fiber.id(), &id("b"));
        assert_eq!(loom.len(), 2);
        assert!(loom.remove(&id("b")).is_err());
    }

    #[test]
    fn spin_records_thread_and_history() {
        let mut loom = sample_loom();
        let thread_id = loom
            .spin("spinner", &[id("b"), id("a")])
            .expect("spin");

        let thread = loom.thread(thread_id).expect("thread");
        assert_eq!(thread.name, "thread-0");
        assert_eq!(thread.fiber_ids, vec![id("b"), id("a")]);
        assert_eq!(thread.tags, vec!["spun".to_string()]);

        let a = loom.get(&id("a")).expect("a");
        let last = a.current().expect("last");
        assert_eq!(last.stage, "spin");
        assert_eq!(last.label.as_str(), "raw");
        assert_eq!(last.context.as_deref(), Some("thread-0"));

        let c = loom.get(&id("c")).expect("c");
        assert_eq!(c.history().len(), 1);

        let next = loom.spin("spinner", &[id("c")]).expect("spin");
        assert_eq!(next, ThreadId(1));
    }

    #[test]
    fn spin_is_all_or_nothing() {
        let mut loom = sample_loom();
        let result = loom.spin("spinner", &[id("a"), id("missing")]);
        assert!(matches!(result, Err(WeaveError::FiberNotFound(_))));
        assert_eq!(loom.get(&id("a")).expect("a").history().len(), 1);
        assert_eq!(loom.thread_count(), 0);
    }

    #[test]
    fn spin_rejects_empty_and_duplicates() {
        let mut loom = sample_loom();
        assert!(loom.spin("spinner", &[]).is_err());
        assert!(loom.spin("spinner", &[id("a"), id("a")]).is_err());
        assert!(loom.spin("", &[id("a")]).is_err());
    }

    #[test]
    fn snapshot_roundtrip() {
        let mut loom = sample_loom();
        loom.transform(&id("a"), "warp", "green", Some("why".to_string()))
            .expect("transform");
        loom.add_marker(&id("b"), "m").expect("mark");
        loom.get_mut(&id("c")).expect("c").add_tag("Draft");
        loom.spin("spinner", &[id("a"), id("b")]).expect("spin");

        let json = loom.snapshot().to_json().expect("json");
        let restored =
            Loom::from_snapshot(LoomSnapshot::from_json(&json).expect("parse")).expect("restore");

        assert_eq!(restored.snapshot(), loom.snapshot());
        assert_eq!(restored.get(&id("a")).expect("a").role(), Role::Warp);
        assert!(restored.get(&id("c")).expect("c").has_tag("draft"));
        assert_eq!(restored.thread_count(), 1);
    }

    #[test]
    fn snapshot_next_thread_id_never_reuses() {
        let mut loom = sample_loom();
        loom.spin("spinner", &[id("a")]).expect("spin");

        let mut snapshot = loom.snapshot();
        snapshot.next_thread_id = ThreadId(0);
        let mut restored = Loom::from_snapshot(snapshot).expect("restore");

        let next = restored.spin("spinner", &[id("b")]).expect("spin");
        assert_eq!(next, ThreadId(1));
    }

    #[test]
    fn snapshot_with_corrupt_lineage_rejected() {
        let json = r#"{"fibers":[{"id":"x","history":[],"markers":[]}]}"#;
        let snapshot = LoomSnapshot::from_json(json).expect("parse");
        assert!(matches!(
            Loom::from_snapshot(snapshot),
            Err(WeaveError::LineageCorrupted(_))
        ));
    }

    fn spun_thread(loom: &mut Loom) -> ThreadId {
        loom.spin("spinner", &[id("a"), id("b")]).expect("spin")
    }

    #[test]
    fn new_thread_is_open_with_default_priority() {
        let mut loom = sample_loom();
        let thread_id = spun_thread(&mut loom);
        let thread = loom.thread(thread_id).expect("thread");
        assert_eq!(thread.status, ThreadStatus::Open);
        assert_eq!(thread.priority, 3);
    }

    #[test]
    fn add_remove_reorder_membership() {
        let mut loom = sample_loom();
        let t = spun_thread(&mut loom);

        assert!(loom.remove_from_thread(t, &id("a")).expect("remove"));
        assert!(!loom.remove_from_thread(t, &id("a")).expect("remove"));
        assert_eq!(loom.thread(t).expect("t").fiber_ids, vec![id("b")]);

        loom.add_to_thread(t, &id("a"), Some(0)).expect("add");
        loom.add_to_thread(t, &id("c"), Some(99)).expect("add");
        assert_eq!(
            loom.thread(t).expect("t").fiber_ids,
            vec![id("a"), id("b"), id("c")]
        );

        loom.reorder_thread(t, &[id("c"), id("a"), id("b")])
            .expect("reorder");
        assert_eq!(
            loom.thread(t).expect("t").fiber_ids,
            vec![id("c"), id("a"), id("b")]
        );

        loom.move_in_thread(t, 0, 2).expect("move");
        assert_eq!(
            loom.thread(t).expect("t").fiber_ids,
            vec![id("a"), id("b"), id("c")]
        );

        // Membership edits leave lineage alone.
        assert_eq!(loom.get(&id("c")).expect("c").history().len(), 1);
    }

    #[test]
    fn reorder_thread_rejects_mismatched_ids() {
        let mut loom = sample_loom();
        let t = spun_thread(&mut loom);

        for order in [
            vec![id("b")],
            vec![id("b"), id("c")],
            vec![id("a"), id("b"), id("a")],
            vec![id("a"), id("a")],
        ] {
            assert!(matches!(
                loom.reorder_thread(t, &order),
                Err(WeaveError::InvalidArgument(ref m)) if m.contains("mismatch")
            ));
        }
        assert_eq!(loom.thread(t).expect("t").fiber_ids, vec![id("a"), id("b")]);
    }

    #[test]
    fn add_to_thread_checks_fiber_and_membership() {
        let mut loom = sample_loom();
        let t = spun_thread(&mut loom);

        assert!(matches!(
            loom.add_to_thread(t, &id("zzz"), None),
            Err(WeaveError::FiberNotFound(_))
        ));
        assert!(matches!(
            loom.add_to_thread(t, &id("a"), None),
            Err(WeaveError::InvalidArgument(_))
        ));
        assert!(matches!(
            loom.add_to_thread(ThreadId(42), &id("c"), None),
            Err(WeaveError::ThreadNotFound(_))
        ));
    }

    #[test]
    fn status_and_priority() {
        let mut loom = sample_loom();
        let t = spun_thread(&mut loom);

        loom.set_thread_status(t, ThreadStatus::Closed)
            .expect("status");
        loom.set_thread_priority(t, 1).expect("priority");
        let thread = loom.thread(t).expect("t");
        assert_eq!(thread.status, ThreadStatus::Closed);
        assert_eq!(thread.priority, 1);

        assert!(loom.set_thread_priority(t, 0).is_err());
        assert!(loom.set_thread_priority(t, 6).is_err());
        assert_eq!(loom.thread(t).expect("t").priority, 1);
    }

    #[test]
    fn batch_spin_continues_past_failures() {
        let mut loom = sample_loom();
        let results = loom.batch_spin(
            "batch",
            &[vec![id("a")], vec![id("missing")], vec![id("b"), id("c")]],
        );

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().ok(), Some(&ThreadId(0)));
        assert!(matches!(results[1], Err(WeaveError::FiberNotFound(_))));
        assert_eq!(results[2].as_ref().ok(), Some(&ThreadId(1)));
        assert_eq!(loom.thread_count(), 2);
    }

    #[test]
    fn snapshot_rejects_duplicate_thread_ids() {
        let mut loom = sample_loom();
        spun_thread(&mut loom);

        let mut snapshot = loom.snapshot();
        let copy = snapshot.threads[0].clone();
        snapshot.threads.push(copy);

        assert!(matches!(
            Loom::from_snapshot(snapshot),
            Err(WeaveError::LineageCorrupted(ref m)) if m.contains("duplicate thread")
        ));
    }

    #[test]
    fn snapshot_rejects_bad_thread_members_and_priority() {
        let mut loom = sample_loom();
        spun_thread(&mut loom);

        let mut twice = loom.snapshot();
        twice.threads[0].fiber_ids.push(id("a"));
        assert!(Loom::from_snapshot(twice).is_err());

        let mut priority = loom.snapshot();
        priority.threads[0].priority = 9;
        assert!(matches!(
            Loom::from_snapshot(priority),
            Err(WeaveError::LineageCorrupted(_))
        ));
    }

    #[test]
    fn snapshot_keeps_removed_members() {
        let mut loom = sample_loom();
        let t = spun_thread(&mut loom);
        loom.remove(&id("a")).expect("remove");

        let restored = Loom::from_snapshot(loom.snapshot()).expect("restore");
        assert_eq!(
            restored.thread(t).expect("t").fiber_ids,
            vec![id("a"), id("b")]
        );
    }

    #[test]
    fn snapshot_without_status_fields_loads_defaults() {
        let json = r#"{"threads":[{"id":0,"name":"thread-0","spinner":"s","fiber_ids":[],"tags":[]}]}"#;
        let loom = Loom::from_snapshot(LoomSnapshot::from_json(json).expect("parse")).expect("load");
        let thread = loom.thread(ThreadId(0)).expect("thread");
        assert_eq!(thread.status, ThreadStatus::Open);
        assert_eq!(thread.priority, 3);
    }

    #[test]
    fn fiber_record_is_flat() {
        let loom = sample_loom();
        let value = serde_json::to_value(loom.snapshot()).expect("value");
        assert_eq!(value["fibers"][0]["id"], "a");
        assert_eq!(value["fibers"][0]["role"], "warp");
        assert_eq!(value["fibers"][0]["history"][0]["stage"], "start");
    }
}
