/// Board engine: registry, task lifecycle and points ledger.
///
/// The pure rules live on [`KanbanState`] and [`BoardData`]; [`Kanban`] wraps
/// them in read-modify-write cycles against a shared [`PersistentStore`].
/// A rejected operation never writes, so the stored state stays consistent.
pub mod ledger;
pub mod lifecycle;
pub mod registry;

use std::sync::{Arc, Mutex, PoisonError};

use crate::reorder::ReorderError;
use crate::storage::StorageError;
use crate::store::PersistentStore;
use crate::types::{BoardData, BoardDefaults, ColumnId, KanbanState, KANBAN_STATE_KEY};

pub use ledger::Redemption;
pub use lifecycle::{days_left, Completion, DropOutcome, Proposal, ProposalKind};
pub use registry::ReorderTarget;

#[derive(Debug, thiserror::Error)]
pub enum KanbanError {
    #[error("Cannot delete the last remaining board")]
    LastBoard,

    #[error("Insufficient points: reward costs {cost}, balance is {balance}")]
    InsufficientPoints { cost: u32, balance: u64 },

    #[error("Illegal transition from {from} to {to}")]
    IllegalTransition { from: ColumnId, to: ColumnId },

    #[error("Task {0} is done and can no longer be edited")]
    TaskCompleted(String),

    #[error("No pending {kind} for task {task_id}")]
    NoPendingTransition { kind: ProposalKind, task_id: String },

    #[error("Task title must not be empty")]
    EmptyTitle,

    #[error("Reward title must not be empty")]
    EmptyRewardTitle,

    #[error("Invalid color: {0:?}")]
    InvalidColor(String),

    #[error(transparent)]
    Reorder(#[from] ReorderError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Proposals waiting for confirmation, one slot per kind.
#[derive(Debug, Default)]
struct PendingProposals {
    start: Option<Proposal>,
    completion: Option<Proposal>,
}

impl PendingProposals {
    fn slot(&mut self, kind: ProposalKind) -> &mut Option<Proposal> {
        match kind {
            ProposalKind::Start => &mut self.start,
            ProposalKind::Completion => &mut self.completion,
        }
    }
}

/// The board engine. Construct once per store and share by reference.
pub struct Kanban {
    store: Arc<PersistentStore>,
    defaults: BoardDefaults,
    pending: Mutex<PendingProposals>,
}

impl Kanban {
    /// Loads the stored state, repairs it if needed and writes it back, so a
    /// fresh store holds a concrete default board from here on.
    pub fn new(store: Arc<PersistentStore>, defaults: BoardDefaults) -> Self {
        let kanban = Self {
            store,
            defaults,
            pending: Mutex::new(PendingProposals::default()),
        };
        if let Err(e) = kanban.update(|_| Ok(())) {
            log::warn!("[pointboard.board] Failed to persist initial state: {}", e);
        }
        kanban
    }

    pub fn store(&self) -> &Arc<PersistentStore> {
        &self.store
    }

    pub fn defaults(&self) -> &BoardDefaults {
        &self.defaults
    }

    /// Current state, normalized. Does not write.
    pub fn state(&self) -> KanbanState {
        let mut state = self
            .store
            .get(KANBAN_STATE_KEY, KanbanState::with_default_board(&self.defaults));
        state.normalize(&self.defaults);
        state
    }

    /// Run `f` against the current state and persist the result if it succeeds.
    fn update<R>(
        &self,
        f: impl FnOnce(&mut KanbanState) -> Result<R, KanbanError>,
    ) -> Result<R, KanbanError> {
        let defaults = &self.defaults;
        self.store.update(
            KANBAN_STATE_KEY,
            KanbanState::with_default_board(defaults),
            |state: &mut KanbanState| {
                state.normalize(defaults);
                f(state)
            },
        )
    }

    /// Like `update`, scoped to one board. Unknown boards yield `Ok(None)`
    /// without writing anything.
    fn update_board<R>(
        &self,
        board_id: &str,
        f: impl FnOnce(&mut BoardData) -> Result<R, KanbanError>,
    ) -> Result<Option<R>, KanbanError> {
        if self.state().board_data(board_id).is_none() {
            log::debug!("[pointboard.board] Ignoring operation on unknown board {}", board_id);
            return Ok(None);
        }
        self.update(|state| match state.board_data_mut(board_id) {
            Some(data) => f(data).map(Some),
            None => Ok(None),
        })
    }

    fn pending(&self) -> std::sync::MutexGuard<'_, PendingProposals> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
