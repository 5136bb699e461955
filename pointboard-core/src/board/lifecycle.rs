/// Task lifecycle: Todo -> InProgress -> Done.
///
/// A task's state is the column holding it. Both forward steps are two-phase:
/// `propose_*` stages the intent without touching stored state, `confirm_*`
/// commits it, `cancel_*` discards it. Any other column pairing is rejected,
/// and Done is terminal apart from deletion.
use std::fmt;

use chrono::{DateTime, NaiveDate};

use super::{Kanban, KanbanError};
use crate::colors::is_hex_color;
use crate::reorder::reorder;
use crate::types::{BoardData, CaptureData, ColumnId, NewTask, Task, TaskPatch, DEFAULT_TASK_COLOR};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposalKind {
    /// Todo -> InProgress, needs capture data.
    Start,
    /// InProgress -> Done, awards the task's points.
    Completion,
}

impl ProposalKind {
    pub fn source(self) -> ColumnId {
        match self {
            ProposalKind::Start => ColumnId::Todo,
            ProposalKind::Completion => ColumnId::InProgress,
        }
    }

    pub fn target(self) -> ColumnId {
        match self {
            ProposalKind::Start => ColumnId::InProgress,
            ProposalKind::Completion => ColumnId::Done,
        }
    }
}

impl fmt::Display for ProposalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProposalKind::Start => f.write_str("transition"),
            ProposalKind::Completion => f.write_str("completion"),
        }
    }
}

/// A staged transition waiting for confirmation.
#[derive(Debug, Clone, PartialEq)]
pub struct Proposal {
    pub kind: ProposalKind,
    pub board_id: String,
    /// Snapshot of the task when the proposal was made.
    pub task: Task,
}

impl Proposal {
    fn matches(&self, board_id: &str, task_id: &str) -> bool {
        self.board_id == board_id && self.task.id == task_id
    }
}

/// What a drop gesture turned into.
#[derive(Debug, Clone, PartialEq)]
pub enum DropOutcome {
    /// Dropped back onto its own column.
    Ignored,
    /// The task is not in the source column (or the board is unknown).
    NotFound,
    /// A start was proposed; gather capture data, then `confirm_transition`.
    AwaitingCapture(Task),
    /// A completion was proposed; ask the user, then `confirm_completion`.
    AwaitingConfirmation(Task),
}

/// Result of a confirmed completion.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub task: Task,
    pub points_earned: u32,
    /// Reward label to show the user, if the task carried one.
    pub reward: Option<String>,
    /// Board balance after the points were added.
    pub balance: u64,
}

/// Whole days from `today` until `due`. Accepts `YYYY-MM-DD` or RFC 3339.
pub fn days_left(due: &str, today: NaiveDate) -> Option<i64> {
    let due = due.trim();
    let date = NaiveDate::parse_from_str(due, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(due).ok().map(|d| d.date_naive()))?;
    Some((date - today).num_days())
}

fn check_color(color: Option<&String>) -> Result<(), KanbanError> {
    match color {
        Some(c) if !is_hex_color(c) => Err(KanbanError::InvalidColor(c.clone())),
        _ => Ok(()),
    }
}

impl BoardData {
    pub fn find_task(&self, task_id: &str) -> Option<(ColumnId, &Task)> {
        let (col, idx) = self.columns.locate(task_id)?;
        Some((col, &self.columns.get(col).items[idx]))
    }

    /// Create a task at the end of Todo.
    pub fn add_task(&mut self, new: NewTask) -> Result<Task, KanbanError> {
        let title = new.title.trim();
        if title.is_empty() {
            return Err(KanbanError::EmptyTitle);
        }
        check_color(new.color.as_ref())?;

        let mut task = Task::new(title, new.points);
        task.description = new.description.trim().to_string();
        task.color = new.color.unwrap_or_else(|| DEFAULT_TASK_COLOR.to_string());
        self.columns.todo.items.push(task.clone());
        Ok(task)
    }

    /// Relocate a task from `source` to the end of `target`, merging `extra`.
    ///
    /// Only single forward steps are allowed. `Ok(None)` if the task is not in
    /// `source`. Does not touch the points balance.
    pub fn move_task(
        &mut self,
        source: ColumnId,
        target: ColumnId,
        task_id: &str,
        extra: &TaskPatch,
    ) -> Result<Option<Task>, KanbanError> {
        if !source.can_transition_to(target) {
            return Err(KanbanError::IllegalTransition { from: source, to: target });
        }
        let Some(idx) = self.columns.get(source).position(task_id) else {
            return Ok(None);
        };

        let mut task = self.columns.get_mut(source).items.remove(idx);
        task.apply(extra);
        self.columns.get_mut(target).items.push(task.clone());
        Ok(Some(task))
    }

    /// Merge `patch` into a task in Todo or InProgress.
    pub fn edit_task(&mut self, task_id: &str, patch: &TaskPatch) -> Result<Option<Task>, KanbanError> {
        let Some((col, idx)) = self.columns.locate(task_id) else {
            return Ok(None);
        };
        if col == ColumnId::Done {
            return Err(KanbanError::TaskCompleted(task_id.to_string()));
        }
        if patch.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(KanbanError::EmptyTitle);
        }
        check_color(patch.color.as_ref())?;

        let task = &mut self.columns.get_mut(col).items[idx];
        task.apply(patch);
        Ok(Some(task.clone()))
    }

    /// Remove a task from `column`, whatever its state.
    pub fn delete_task(&mut self, task_id: &str, column: ColumnId) -> bool {
        let items = &mut self.columns.get_mut(column).items;
        let before = items.len();
        items.retain(|t| t.id != task_id);
        items.len() != before
    }

    pub fn reorder_tasks(&mut self, column: ColumnId, from: usize, to: usize) -> Result<(), KanbanError> {
        let col = self.columns.get_mut(column);
        col.items = reorder(&col.items, from, to)?;
        Ok(())
    }

    /// InProgress tasks, closest deadline first. Tasks without a usable due
    /// date go last, in their stored order.
    pub fn tasks_by_deadline(&self, today: NaiveDate) -> Vec<Task> {
        let mut tasks = self.columns.in_progress.items.clone();
        tasks.sort_by_key(|t| {
            let left = t.due_date.as_deref().and_then(|d| days_left(d, today));
            (left.is_none(), left)
        });
        tasks
    }
}

impl Kanban {
    pub fn add_task(&self, board_id: &str, new: NewTask) -> Result<Option<Task>, KanbanError> {
        let task = self.update_board(board_id, |data| data.add_task(new))?;
        if let Some(task) = &task {
            log::debug!("[pointboard.task] Added task {} to board {}", task.id, board_id);
        }
        Ok(task)
    }

    pub fn find_task(&self, board_id: &str, task_id: &str) -> Option<(ColumnId, Task)> {
        let state = self.state();
        state
            .board_data(board_id)?
            .find_task(task_id)
            .map(|(col, task)| (col, task.clone()))
    }

    /// Low-level relocation primitive behind every transition. It enforces the
    /// forward-only policy but awards no points; use `confirm_completion` for that.
    pub fn move_task(
        &self,
        board_id: &str,
        source: ColumnId,
        target: ColumnId,
        task_id: &str,
        extra: &TaskPatch,
    ) -> Result<Option<Task>, KanbanError> {
        Ok(self
            .update_board(board_id, |data| data.move_task(source, target, task_id, extra))?
            .flatten())
    }

    pub fn edit_task(&self, board_id: &str, task_id: &str, patch: &TaskPatch) -> Result<Option<Task>, KanbanError> {
        Ok(self
            .update_board(board_id, |data| data.edit_task(task_id, patch))?
            .flatten())
    }

    pub fn delete_task(&self, board_id: &str, task_id: &str, column: ColumnId) -> Result<bool, KanbanError> {
        let deleted = self
            .update_board(board_id, |data| Ok(data.delete_task(task_id, column)))?
            .unwrap_or(false);
        if deleted {
            let mut guard = self.pending();
            let pending = &mut *guard;
            for slot in [&mut pending.start, &mut pending.completion] {
                if slot.as_ref().is_some_and(|p| p.matches(board_id, task_id)) {
                    *slot = None;
                }
            }
        }
        Ok(deleted)
    }

    /// Set a task's progress percentage, clamped to 100.
    pub fn set_progress(&self, board_id: &str, task_id: &str, percent: u8) -> Result<Option<Task>, KanbanError> {
        let patch = TaskPatch {
            progress: Some(percent.min(100)),
            ..TaskPatch::default()
        };
        self.edit_task(board_id, task_id, &patch)
    }

    /// Returns false if the board does not exist.
    pub fn reorder_tasks(&self, board_id: &str, column: ColumnId, from: usize, to: usize) -> Result<bool, KanbanError> {
        Ok(self
            .update_board(board_id, |data| data.reorder_tasks(column, from, to))?
            .is_some())
    }

    pub fn tasks_by_deadline(&self, board_id: &str, today: NaiveDate) -> Vec<Task> {
        self.state()
            .board_data(board_id)
            .map(|data| data.tasks_by_deadline(today))
            .unwrap_or_default()
    }

    /// Stage `Todo -> InProgress`. Returns the task so the caller can gather
    /// capture data; `Ok(None)` if board or task is unknown.
    pub fn propose_transition(&self, board_id: &str, task_id: &str) -> Result<Option<Task>, KanbanError> {
        self.propose(ProposalKind::Start, board_id, task_id)
    }

    /// Commit a staged start: move to InProgress and merge `capture` onto the task.
    pub fn confirm_transition(
        &self,
        board_id: &str,
        task_id: &str,
        capture: CaptureData,
    ) -> Result<Option<Task>, KanbanError> {
        self.take_proposal(ProposalKind::Start, board_id, task_id)?;
        let patch = TaskPatch::from(capture);
        let moved = self.move_task(board_id, ColumnId::Todo, ColumnId::InProgress, task_id, &patch)?;
        if moved.is_some() {
            log::debug!("[pointboard.task] Started task {} on board {}", task_id, board_id);
        }
        Ok(moved)
    }

    pub fn cancel_transition(&self) -> Option<Proposal> {
        self.pending().start.take()
    }

    pub fn pending_transition(&self) -> Option<Proposal> {
        self.pending().start.clone()
    }

    /// Stage `InProgress -> Done`.
    pub fn propose_completion(&self, board_id: &str, task_id: &str) -> Result<Option<Task>, KanbanError> {
        self.propose(ProposalKind::Completion, board_id, task_id)
    }

    /// Commit a staged completion: move to Done and earn the task's points in
    /// the same write.
    pub fn confirm_completion(&self, board_id: &str, task_id: &str) -> Result<Option<Completion>, KanbanError> {
        self.take_proposal(ProposalKind::Completion, board_id, task_id)?;
        let completion = self
            .update_board(board_id, |data| {
                let moved = data.move_task(ColumnId::InProgress, ColumnId::Done, task_id, &TaskPatch::default())?;
                Ok(moved.map(|task| {
                    let balance = data.earn(task.points);
                    Completion {
                        points_earned: task.points,
                        reward: task.reward_label().map(str::to_string),
                        balance,
                        task,
                    }
                }))
            })?
            .flatten();
        if let Some(c) = &completion {
            log::info!(
                "[pointboard.task] Completed task {} on board {}: +{} points (balance {})",
                task_id,
                board_id,
                c.points_earned,
                c.balance
            );
        }
        Ok(completion)
    }

    pub fn cancel_completion(&self) -> Option<Proposal> {
        self.pending().completion.take()
    }

    pub fn pending_completion(&self) -> Option<Proposal> {
        self.pending().completion.clone()
    }

    /// Drop callback: route a drag from `source` to `target` into the right phase.
    pub fn on_drop(
        &self,
        board_id: &str,
        task_id: &str,
        source: ColumnId,
        target: ColumnId,
    ) -> Result<DropOutcome, KanbanError> {
        if source == target {
            return Ok(DropOutcome::Ignored);
        }
        match self.find_task(board_id, task_id) {
            Some((col, _)) if col == source => {}
            _ => return Ok(DropOutcome::NotFound),
        }

        let outcome = match (source, target) {
            (ColumnId::Todo, ColumnId::InProgress) => self
                .propose_transition(board_id, task_id)?
                .map(DropOutcome::AwaitingCapture),
            (ColumnId::InProgress, ColumnId::Done) => self
                .propose_completion(board_id, task_id)?
                .map(DropOutcome::AwaitingConfirmation),
            _ => return Err(KanbanError::IllegalTransition { from: source, to: target }),
        };
        Ok(outcome.unwrap_or(DropOutcome::NotFound))
    }

    fn propose(&self, kind: ProposalKind, board_id: &str, task_id: &str) -> Result<Option<Task>, KanbanError> {
        let Some((col, task)) = self.find_task(board_id, task_id) else {
            return Ok(None);
        };
        if col != kind.source() {
            return Err(KanbanError::IllegalTransition {
                from: col,
                to: kind.target(),
            });
        }

        *self.pending().slot(kind) = Some(Proposal {
            kind,
            board_id: board_id.to_string(),
            task: task.clone(),
        });
        Ok(Some(task))
    }

    /// Consume the staged proposal of `kind` if it is for this board and task.
    fn take_proposal(&self, kind: ProposalKind, board_id: &str, task_id: &str) -> Result<Proposal, KanbanError> {
        let mut pending = self.pending();
        let slot = pending.slot(kind);
        match slot.take() {
            Some(p) if p.matches(board_id, task_id) => Ok(p),
            other => {
                *slot = other;
                Err(KanbanError::NoPendingTransition {
                    kind,
                    task_id: task_id.to_string(),
                })
            }
        }
    }
}
