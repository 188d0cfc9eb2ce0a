//! Client-local view of tasks and assignments.
//!
//! The board is owned by one client and shared between its services behind
//! [`SharedBoard`]. Everything that changes task or assignment data goes
//! through crate-internal methods used by the mutation pipeline and the
//! reconciler; callers outside the crate only read.

use super::{
    ConflictBoard, ConflictIndicator, Mutation, MutationKind, MutationLane, Notice, SyncError,
    SyncResult,
};
use crate::task::domain::{
    AssigneeRoster, AssignmentId, DriverId, Task, TaskAssignee, TaskId, TaskPatch, TaskStatus,
};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::{Arc, RwLock};

/// Pre-mutation copy of the slices of the board that a set of mutations
/// change.
///
/// Each entry covers only what its mutation's lane owns, so rolling back
/// one lane leaves changes made on other lanes of the same task in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    entries: Vec<SnapshotEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SnapshotEntry {
    task_id: TaskId,
    lane: MutationLane,
    revision: u64,
    slice: SnapshotSlice,
    touched_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SnapshotSlice {
    Status(TaskStatus),
    Fields(TaskPatch),
    Roster(Vec<TaskAssignee>),
    Presence {
        task: Box<Task>,
        assignees: Vec<TaskAssignee>,
        selected: bool,
    },
}

impl Snapshot {
    /// Returns the number of captured slices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the snapshot is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Result of merging an inbound task record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskMerge {
    /// The task was not on the board and was added.
    Inserted,
    /// The held task was replaced by a newer revision.
    Updated {
        /// When this client last changed the task optimistically.
        local_change_at: Option<DateTime<Utc>>,
    },
    /// The task was removed from the board.
    Removed,
    /// The record was not newer than the held one.
    Ignored,
}

/// Tasks, assignments and client-local annotations of one board.
#[derive(Debug, Clone, Default)]
pub struct BoardState {
    tasks: BTreeMap<TaskId, Task>,
    roster: AssigneeRoster,
    selection: BTreeSet<TaskId>,
    in_flight: HashSet<(TaskId, MutationLane)>,
    recent_local: HashMap<TaskId, DateTime<Utc>>,
    conflicts: ConflictBoard,
    notices: VecDeque<Notice>,
    /// Last known revision of tasks removed from the board.
    tombstones: HashMap<TaskId, u64>,
    /// Assignment rows the server has deleted.
    retired_rows: HashSet<AssignmentId>,
}

impl BoardState {
    /// Creates an empty board.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a task by identifier.
    #[must_use]
    pub fn task(&self, task_id: TaskId) -> Option<&Task> {
        self.tasks.get(&task_id)
    }

    /// Returns every task on the board ordered by identifier.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    /// Returns the number of tasks on the board.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns whether the board holds no tasks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Returns the tasks shown in a status column.
    #[must_use]
    pub fn status_column(&self, status: TaskStatus) -> Vec<&Task> {
        self.tasks
            .values()
            .filter(|task| task.status() == status)
            .collect()
    }

    /// Returns the tasks shown in a driver column.
    #[must_use]
    pub fn driver_column(&self, driver_id: DriverId) -> Vec<&Task> {
        self.tasks
            .values()
            .filter(|task| self.lead_for(task.id()) == Some(driver_id))
            .collect()
    }

    /// Returns the lead driver of a task.
    #[must_use]
    pub fn lead_for(&self, task_id: TaskId) -> Option<DriverId> {
        self.roster.lead_for(task_id).map(|row| row.driver_id)
    }

    /// Returns the assignment rows of a task, lead first.
    #[must_use]
    pub fn assignees_for(&self, task_id: TaskId) -> Vec<TaskAssignee> {
        self.roster.rows_for(task_id)
    }

    /// Returns every assignment row.
    #[must_use]
    pub const fn roster(&self) -> &AssigneeRoster {
        &self.roster
    }

    /// Returns the selected task identifiers.
    #[must_use]
    pub const fn selection(&self) -> &BTreeSet<TaskId> {
        &self.selection
    }

    /// Returns whether a control of a task is disabled by an in-flight write.
    #[must_use]
    pub fn is_busy(&self, task_id: TaskId, lane: MutationLane) -> bool {
        self.in_flight.contains(&(task_id, lane))
    }

    /// Returns the active conflict indicator of a task.
    #[must_use]
    pub fn conflict(&self, task_id: TaskId, now: DateTime<Utc>) -> Option<&ConflictIndicator> {
        self.conflicts.get(task_id, now)
    }

    /// Returns every active conflict indicator.
    #[must_use]
    pub fn conflicts(&self, now: DateTime<Utc>) -> Vec<ConflictIndicator> {
        self.conflicts.active(now)
    }

    /// Returns queued notices without draining them.
    pub fn notices(&self) -> impl Iterator<Item = &Notice> {
        self.notices.iter()
    }

    /// Merges a full reload from the store.
    ///
    /// Tasks missing from the reload are removed. Held tasks are replaced
    /// only by newer revisions, and assignment rows are replaced except for
    /// tasks with an assignment write in flight. Returns the number of tasks
    /// inserted, updated or removed.
    pub(crate) fn reload(&mut self, tasks: Vec<Task>, rows: Vec<TaskAssignee>) -> usize {
        let live: HashSet<TaskId> = tasks
            .iter()
            .filter(|task| !task.is_deleted())
            .map(Task::id)
            .collect();
        let stale: Vec<TaskId> = self
            .tasks
            .keys()
            .filter(|id| !live.contains(id))
            .copied()
            .collect();
        let mut changed = 0;
        for task_id in stale {
            if self.remove_task(task_id) {
                changed += 1;
            }
        }
        for task in tasks {
            if self.merge_task(task) != TaskMerge::Ignored {
                changed += 1;
            }
        }

        let mut grouped: BTreeMap<TaskId, Vec<TaskAssignee>> = BTreeMap::new();
        for row in rows {
            grouped.entry(row.task_id).or_default().push(row);
        }
        let task_ids: Vec<TaskId> = self.tasks.keys().copied().collect();
        for task_id in task_ids {
            if self.is_busy(task_id, MutationLane::Assignment) {
                continue;
            }
            let server_rows = grouped.remove(&task_id).unwrap_or_default();
            let kept: HashSet<AssignmentId> = server_rows.iter().map(|row| row.id).collect();
            for row in self.roster.rows_for(task_id) {
                if !kept.contains(&row.id) {
                    self.retired_rows.insert(row.id);
                }
            }
            self.roster.replace_task(task_id, server_rows);
        }
        changed
    }

    /// Returns when this client last changed a task optimistically.
    #[must_use]
    pub fn local_change_at(&self, task_id: TaskId) -> Option<DateTime<Utc>> {
        self.recent_local.get(&task_id).copied()
    }

    /// Captures what each mutation is about to change. Mutations on tasks
    /// that are not on the board capture nothing.
    pub(crate) fn snapshot(&self, mutations: &[Mutation]) -> Snapshot {
        let entries = mutations
            .iter()
            .filter_map(|mutation| {
                let task_id = mutation.task_id();
                let task = self.tasks.get(&task_id)?;
                let slice = match mutation.kind() {
                    MutationKind::ChangeStatus { .. } => SnapshotSlice::Status(task.status()),
                    MutationKind::EditFields(patch) => SnapshotSlice::Fields(patch.reverting(task)),
                    MutationKind::ReassignLead(_) => {
                        SnapshotSlice::Roster(self.roster.rows_for(task_id))
                    }
                    MutationKind::SoftDelete => SnapshotSlice::Presence {
                        task: Box::new(task.clone()),
                        assignees: self.roster.rows_for(task_id),
                        selected: self.selection.contains(&task_id),
                    },
                };
                Some(SnapshotEntry {
                    task_id,
                    lane: mutation.lane(),
                    revision: task.revision(),
                    slice,
                    touched_at: self.recent_local.get(&task_id).copied(),
                })
            })
            .collect();
        Snapshot { entries }
    }

    /// Puts back every captured slice that no newer server revision has
    /// superseded since the snapshot was taken. Returns the number of slices
    /// restored.
    pub(crate) fn restore(&mut self, snapshot: Snapshot) -> usize {
        let mut restored = 0;
        for entry in snapshot.entries {
            if self.restore_entry(entry) {
                restored += 1;
            }
        }
        restored
    }

    fn restore_entry(&mut self, entry: SnapshotEntry) -> bool {
        let SnapshotEntry {
            task_id,
            lane,
            revision,
            slice,
            touched_at,
        } = entry;
        if self.newest_revision(task_id).is_some_and(|newest| newest > revision) {
            return false;
        }
        match slice {
            SnapshotSlice::Status(status) => {
                let Some(task) = self.tasks.get_mut(&task_id) else {
                    return false;
                };
                task.set_status(status);
            }
            SnapshotSlice::Fields(revert) => {
                let Some(task) = self.tasks.get_mut(&task_id) else {
                    return false;
                };
                task.apply_patch(&revert);
            }
            SnapshotSlice::Roster(rows) => {
                if !self.tasks.contains_key(&task_id) {
                    return false;
                }
                self.replace_live_rows(task_id, rows);
            }
            SnapshotSlice::Presence {
                task,
                assignees,
                selected,
            } => {
                self.tombstones.remove(&task_id);
                self.tasks.insert(task_id, *task);
                self.replace_live_rows(task_id, assignees);
                if selected {
                    self.selection.insert(task_id);
                }
            }
        }
        if !self.busy_on_other_lane(task_id, lane) {
            match touched_at {
                Some(at) => {
                    self.recent_local.insert(task_id, at);
                }
                None => {
                    self.recent_local.remove(&task_id);
                }
            }
        }
        true
    }

    fn newest_revision(&self, task_id: TaskId) -> Option<u64> {
        self.tasks
            .get(&task_id)
            .map(Task::revision)
            .or_else(|| self.tombstones.get(&task_id).copied())
    }

    fn busy_on_other_lane(&self, task_id: TaskId, lane: MutationLane) -> bool {
        self.in_flight
            .iter()
            .any(|(busy_task, busy_lane)| *busy_task == task_id && *busy_lane != lane)
    }

    fn replace_live_rows(&mut self, task_id: TaskId, rows: Vec<TaskAssignee>) {
        let live = rows
            .into_iter()
            .filter(|row| !self.retired_rows.contains(&row.id))
            .collect();
        self.roster.replace_task(task_id, live);
    }

    pub(crate) fn begin(&mut self, task_id: TaskId, lane: MutationLane) -> SyncResult<()> {
        if !self.tasks.contains_key(&task_id) {
            return Err(SyncError::UnknownTask(task_id));
        }
        if !self.in_flight.insert((task_id, lane)) {
            return Err(SyncError::Busy { task_id, lane });
        }
        Ok(())
    }

    pub(crate) fn finish(&mut self, task_id: TaskId, lane: MutationLane) {
        self.in_flight.remove(&(task_id, lane));
    }

    /// Returns whether applying the mutation would change nothing.
    pub(crate) fn is_noop(&self, mutation: &Mutation) -> bool {
        let Some(task) = self.tasks.get(&mutation.task_id()) else {
            return false;
        };
        match mutation.kind() {
            MutationKind::ChangeStatus { target, .. } => task.status() == *target,
            MutationKind::EditFields(patch) => patch.is_empty(),
            MutationKind::ReassignLead(driver_id) => {
                self.lead_for(mutation.task_id()) == Some(*driver_id)
            }
            MutationKind::SoftDelete => false,
        }
    }

    pub(crate) fn apply_local(&mut self, mutation: &Mutation, now: DateTime<Utc>) -> SyncResult<()> {
        let task_id = mutation.task_id();
        match mutation.kind() {
            MutationKind::ChangeStatus { target, .. } => {
                self.task_mut(task_id)?.set_status(*target);
            }
            MutationKind::EditFields(patch) => {
                self.task_mut(task_id)?.apply_patch(patch);
            }
            MutationKind::ReassignLead(driver_id) => {
                self.task_mut(task_id)?;
                let displaced: Vec<AssignmentId> = self
                    .roster
                    .rows_for(task_id)
                    .into_iter()
                    .filter(|row| row.is_lead || row.driver_id == *driver_id)
                    .map(|row| row.id)
                    .collect();
                for id in displaced {
                    self.roster.remove(id);
                }
                self.roster
                    .upsert(TaskAssignee::lead(task_id, *driver_id, now));
            }
            MutationKind::SoftDelete => {
                self.task_mut(task_id)?;
                self.remove_task(task_id);
            }
        }
        self.recent_local.insert(task_id, now);
        Ok(())
    }

    /// Merges an inbound task record.
    ///
    /// Records no newer than the held revision, or than the last revision
    /// seen for a removed task, are ignored, so redelivered events never
    /// bring a deleted card back.
    pub(crate) fn merge_task(&mut self, task: Task) -> TaskMerge {
        let task_id = task.id();
        if task.is_deleted() {
            return if self.discard_task(task_id, task.revision()) {
                TaskMerge::Removed
            } else {
                TaskMerge::Ignored
            };
        }
        if self
            .tombstones
            .get(&task_id)
            .is_some_and(|buried| task.revision() <= *buried)
        {
            return TaskMerge::Ignored;
        }
        match self.tasks.get(&task_id) {
            None => {
                self.tombstones.remove(&task_id);
                self.tasks.insert(task_id, task);
                TaskMerge::Inserted
            }
            Some(held) if task.revision() <= held.revision() => TaskMerge::Ignored,
            Some(_) => {
                self.tasks.insert(task_id, task);
                TaskMerge::Updated {
                    local_change_at: self.recent_local.get(&task_id).copied(),
                }
            }
        }
    }

    /// Removes a task and everything attached to it. Returns whether the
    /// task was on the board.
    pub(crate) fn remove_task(&mut self, task_id: TaskId) -> bool {
        self.roster.remove_task(task_id);
        self.selection.remove(&task_id);
        self.conflicts.dismiss(task_id);
        self.recent_local.remove(&task_id);
        match self.tasks.remove(&task_id) {
            Some(task) => {
                self.bury(task_id, task.revision());
                true
            }
            None => false,
        }
    }

    /// Removes a task the server deleted at `revision`. Returns whether the
    /// task was on the board.
    pub(crate) fn discard_task(&mut self, task_id: TaskId, revision: u64) -> bool {
        let removed = self.remove_task(task_id);
        self.bury(task_id, revision);
        removed
    }

    fn bury(&mut self, task_id: TaskId, revision: u64) {
        let buried = self.tombstones.entry(task_id).or_insert(revision);
        *buried = (*buried).max(revision);
    }

    /// Upserts an inbound assignment row. Rows for tasks that are not on the
    /// board, rows the server already deleted and rows already held
    /// unchanged are ignored. Returns whether the board changed.
    pub(crate) fn merge_assignee(&mut self, row: TaskAssignee) -> bool {
        if !self.tasks.contains_key(&row.task_id) || self.retired_rows.contains(&row.id) {
            return false;
        }
        if self.roster.get(row.id) == Some(&row) {
            return false;
        }
        self.roster.upsert(row);
        true
    }

    /// Applies a server-side row deletion. The row id is remembered so a
    /// late redelivery of its insert cannot bring it back.
    pub(crate) fn remove_assignee(&mut self, id: AssignmentId) -> bool {
        self.retired_rows.insert(id);
        self.roster.remove(id).is_some()
    }

    pub(crate) fn raise_conflict(&mut self, indicator: ConflictIndicator) {
        self.conflicts.raise(indicator);
    }

    pub(crate) fn dismiss_conflict(&mut self, task_id: TaskId) -> bool {
        self.conflicts.dismiss(task_id)
    }

    pub(crate) fn prune(&mut self, now: DateTime<Utc>, window: chrono::TimeDelta) -> usize {
        self.recent_local.retain(|_, at| now - *at <= window);
        self.conflicts.prune(now)
    }

    pub(crate) fn push_notice(&mut self, notice: Notice) {
        self.notices.push_back(notice);
    }

    pub(crate) fn drain_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }

    pub(crate) fn select(&mut self, task_id: TaskId) -> bool {
        self.tasks.contains_key(&task_id) && self.selection.insert(task_id)
    }

    pub(crate) fn deselect(&mut self, task_id: TaskId) -> bool {
        self.selection.remove(&task_id)
    }

    pub(crate) fn clear_selection(&mut self) {
        self.selection.clear();
    }

    fn task_mut(&mut self, task_id: TaskId) -> SyncResult<&mut Task> {
        self.tasks
            .get_mut(&task_id)
            .ok_or(SyncError::UnknownTask(task_id))
    }
}

/// Board shared between the services of one client.
///
/// Locks are held only for synchronous updates, never across a store call.
#[derive(Debug, Clone, Default)]
pub struct SharedBoard {
    inner: Arc<RwLock<BoardState>>,
}

impl SharedBoard {
    /// Creates an empty shared board.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` with read access to the board.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::BoardUnavailable`] if the lock is poisoned.
    pub fn read<R>(&self, f: impl FnOnce(&BoardState) -> R) -> SyncResult<R> {
        let board = self.inner.read().map_err(|_| SyncError::BoardUnavailable)?;
        Ok(f(&board))
    }

    pub(crate) fn write<R>(&self, f: impl FnOnce(&mut BoardState) -> R) -> SyncResult<R> {
        let mut board = self.inner.write().map_err(|_| SyncError::BoardUnavailable)?;
        Ok(f(&mut board))
    }
}
