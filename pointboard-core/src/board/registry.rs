/// Board registry: the set of boards, their display order and the active selection.
use std::collections::HashSet;

use super::{Kanban, KanbanError};
use crate::colors::is_hex_color;
use crate::daily::DailyChecklist;
use crate::reorder::{reorder, reorder_by_ids};
use crate::types::{generate_id, now_timestamp, Board, BoardData, BoardDefaults, ColumnId, KanbanState};

/// A list that can be reordered by index through [`Kanban::on_reorder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReorderTarget {
    Column { board_id: String, column: ColumnId },
    Boards,
    DailyChecklist,
}

impl KanbanState {
    pub fn board(&self, board_id: &str) -> Option<&Board> {
        self.boards.iter().find(|b| b.id == board_id)
    }

    pub fn board_data(&self, board_id: &str) -> Option<&BoardData> {
        self.boards_data.get(board_id)
    }

    pub fn board_data_mut(&mut self, board_id: &str) -> Option<&mut BoardData> {
        self.boards_data.get_mut(board_id)
    }

    pub fn active_board(&self) -> Option<&Board> {
        self.board(&self.active_board_id)
    }

    /// Append a new empty board and make it active.
    pub fn create_board(&mut self, name: &str, defaults: &BoardDefaults) -> String {
        let id = generate_id("board");
        self.boards.push(Board {
            id: id.clone(),
            name: name.to_string(),
            created_at: now_timestamp(),
        });
        self.boards_data.insert(id.clone(), BoardData::empty(defaults));
        self.active_board_id = id.clone();
        id
    }

    /// Remove a board. `Ok(false)` if it does not exist.
    ///
    /// When the active board is deleted, the first remaining board becomes active.
    pub fn delete_board(&mut self, board_id: &str) -> Result<bool, KanbanError> {
        if self.board(board_id).is_none() {
            return Ok(false);
        }
        if self.boards.len() <= 1 {
            return Err(KanbanError::LastBoard);
        }

        self.boards.retain(|b| b.id != board_id);
        self.boards_data.remove(board_id);
        if self.active_board_id == board_id {
            // Non-empty: we refused to delete the last board above.
            self.active_board_id = self.boards[0].id.clone();
        }
        Ok(true)
    }

    pub fn rename_board(&mut self, board_id: &str, name: &str) -> bool {
        match self.boards.iter_mut().find(|b| b.id == board_id) {
            Some(board) => {
                board.name = name.to_string();
                true
            }
            None => false,
        }
    }

    /// Replace the display order. `ordered_ids` must be a permutation of the board ids.
    pub fn reorder_boards(&mut self, ordered_ids: &[String]) -> Result<(), KanbanError> {
        self.boards = reorder_by_ids(&self.boards, ordered_ids, |b| b.id.as_str())?;
        Ok(())
    }

    pub fn move_board(&mut self, from: usize, to: usize) -> Result<(), KanbanError> {
        self.boards = reorder(&self.boards, from, to)?;
        Ok(())
    }

    pub fn set_active_board(&mut self, board_id: &str) -> bool {
        if self.board(board_id).is_none() {
            return false;
        }
        self.active_board_id = board_id.to_string();
        true
    }

    /// Restore the aggregate invariants after loading. Returns true if
    /// anything had to be repaired.
    pub fn normalize(&mut self, defaults: &BoardDefaults) -> bool {
        let mut repaired = false;

        let mut seen = HashSet::new();
        let before = self.boards.len();
        self.boards.retain(|b| seen.insert(b.id.clone()));
        if self.boards.len() != before {
            log::warn!(
                "[pointboard.board] Dropped {} duplicate board entries",
                before - self.boards.len()
            );
            repaired = true;
        }

        if self.boards.is_empty() {
            log::warn!("[pointboard.board] No boards in stored state, starting fresh");
            *self = KanbanState::with_default_board(defaults);
            return true;
        }

        for board in &self.boards {
            if !self.boards_data.contains_key(&board.id) {
                log::warn!("[pointboard.board] Board {} had no data, reinitialized", board.id);
                self.boards_data.insert(board.id.clone(), BoardData::empty(defaults));
                repaired = true;
            }
        }

        let known: HashSet<&str> = self.boards.iter().map(|b| b.id.as_str()).collect();
        let before = self.boards_data.len();
        self.boards_data.retain(|id, _| known.contains(id.as_str()));
        if self.boards_data.len() != before {
            log::warn!(
                "[pointboard.board] Dropped {} orphaned board data entries",
                before - self.boards_data.len()
            );
            repaired = true;
        }

        if self.board(&self.active_board_id).is_none() {
            log::warn!(
                "[pointboard.board] Active board {:?} not found, selecting {}",
                self.active_board_id,
                self.boards[0].id
            );
            self.active_board_id = self.boards[0].id.clone();
            repaired = true;
        }

        for (board_id, data) in self.boards_data.iter_mut() {
            let dropped = data.dedupe_tasks();
            if dropped > 0 {
                log::warn!(
                    "[pointboard.board] Dropped {} duplicate tasks on board {}",
                    dropped,
                    board_id
                );
                repaired = true;
            }
        }

        repaired
    }
}

impl BoardData {
    /// Remove tasks whose id already appeared earlier (Todo, then InProgress,
    /// then Done). Returns how many were removed.
    fn dedupe_tasks(&mut self) -> usize {
        let mut seen = HashSet::new();
        let mut dropped = 0;
        for col in ColumnId::ALL {
            let items = &mut self.columns.get_mut(col).items;
            let before = items.len();
            items.retain(|t| seen.insert(t.id.clone()));
            dropped += before - items.len();
        }
        dropped
    }
}

impl Kanban {
    pub fn boards(&self) -> Vec<Board> {
        self.state().boards
    }

    pub fn active_board_id(&self) -> String {
        self.state().active_board_id
    }

    pub fn board_data(&self, board_id: &str) -> Option<BoardData> {
        self.state().boards_data.remove(board_id)
    }

    pub fn create_board(&self, name: &str) -> Result<String, KanbanError> {
        let id = self.update(|state| Ok(state.create_board(name, &self.defaults)))?;
        log::info!("[pointboard.board] Created board {} ({:?})", id, name);
        Ok(id)
    }

    pub fn delete_board(&self, board_id: &str) -> Result<bool, KanbanError> {
        let deleted = self.update(|state| state.delete_board(board_id))?;
        if deleted {
            log::info!("[pointboard.board] Deleted board {}", board_id);
            let mut guard = self.pending();
            let pending = &mut *guard;
            for slot in [&mut pending.start, &mut pending.completion] {
                if slot.as_ref().is_some_and(|p| p.board_id == board_id) {
                    *slot = None;
                }
            }
        }
        Ok(deleted)
    }

    pub fn rename_board(&self, board_id: &str, name: &str) -> Result<bool, KanbanError> {
        self.update(|state| Ok(state.rename_board(board_id, name)))
    }

    pub fn reorder_boards(&self, ordered_ids: &[String]) -> Result<(), KanbanError> {
        self.update(|state| state.reorder_boards(ordered_ids))
    }

    pub fn set_active_board(&self, board_id: &str) -> Result<bool, KanbanError> {
        self.update(|state| Ok(state.set_active_board(board_id)))
    }

    /// Board-selector callback; same as [`Kanban::set_active_board`].
    pub fn on_board_change(&self, board_id: &str) -> Result<bool, KanbanError> {
        self.set_active_board(board_id)
    }

    pub fn set_board_colors(&self, board_id: &str, start: &str, end: &str) -> Result<bool, KanbanError> {
        for color in [start, end] {
            if !is_hex_color(color) {
                return Err(KanbanError::InvalidColor(color.to_string()));
            }
        }
        Ok(self
            .update_board(board_id, |data| {
                data.bg_color_start = start.to_string();
                data.bg_color_end = end.to_string();
                Ok(())
            })?
            .is_some())
    }

    /// Drag-and-drop reorder callback for any reorderable list.
    pub fn on_reorder(&self, target: &ReorderTarget, from: usize, to: usize) -> Result<(), KanbanError> {
        match target {
            ReorderTarget::Column { board_id, column } => {
                self.reorder_tasks(board_id, *column, from, to)?;
                Ok(())
            }
            ReorderTarget::Boards => self.update(|state| state.move_board(from, to)),
            ReorderTarget::DailyChecklist => DailyChecklist::new(self.store.clone()).reorder(from, to),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::engine;
    use super::*;
    use crate::types::DEFAULT_BOARD_ID;

    #[test]
    fn test_create_board_becomes_active() {
        let kanban = engine();
        let before = kanban.boards().len();

        let id = kanban.create_board("Work").unwrap();

        let state = kanban.state();
        assert_eq!(state.boards.len(), before + 1);
        assert_eq!(state.active_board_id, id);
        assert_eq!(state.boards.last().unwrap().name, "Work");
        let data = state.board_data(&id).unwrap();
        assert_eq!(data.columns.task_count(), 0);
        assert!(data.rewards.is_empty());
        assert_eq!(data.total_points, 0);
    }

    #[test]
    fn test_cannot_delete_last_board() {
        let kanban = engine();
        let boards = kanban.boards();
        assert_eq!(boards.len(), 1);

        let result = kanban.delete_board(&boards[0].id);
        assert!(matches!(result, Err(KanbanError::LastBoard)));
        assert_eq!(kanban.boards(), boards);
    }

    #[test]
    fn test_delete_active_board_repoints_to_first() {
        let kanban = engine();
        let work = kanban.create_board("Work").unwrap();
        let home = kanban.create_board("Home").unwrap();
        assert_eq!(kanban.active_board_id(), home);

        assert!(kanban.delete_board(&home).unwrap());
        let state = kanban.state();
        assert_eq!(state.active_board_id, DEFAULT_BOARD_ID);
        assert!(state.board_data(&home).is_none());
        assert!(state.board_data(&work).is_some());
    }

    #[test]
    fn test_delete_inactive_board_keeps_selection() {
        let kanban = engine();
        let work = kanban.create_board("Work").unwrap();
        kanban.set_active_board(DEFAULT_BOARD_ID).unwrap();

        assert!(kanban.delete_board(&work).unwrap());
        assert_eq!(kanban.active_board_id(), DEFAULT_BOARD_ID);
    }

    #[test]
    fn test_delete_unknown_board_is_noop() {
        let kanban = engine();
        kanban.create_board("Work").unwrap();
        assert!(!kanban.delete_board("nope").unwrap());
        assert_eq!(kanban.boards().len(), 2);
    }

    #[test]
    fn test_rename_board() {
        let kanban = engine();
        assert!(kanban.rename_board(DEFAULT_BOARD_ID, "Personal").unwrap());
        assert_eq!(kanban.boards()[0].name, "Personal");
        assert!(!kanban.rename_board("missing", "x").unwrap());
    }

    #[test]
    fn test_set_active_unknown_is_noop() {
        let kanban = engine();
        assert!(!kanban.set_active_board("missing").unwrap());
        assert_eq!(kanban.active_board_id(), DEFAULT_BOARD_ID);
    }

    #[test]
    fn test_reorder_boards_requires_permutation() {
        let kanban = engine();
        let a = kanban.create_board("A").unwrap();
        let b = kanban.create_board("B").unwrap();

        let order = vec![b.clone(), DEFAULT_BOARD_ID.to_string(), a.clone()];
        kanban.reorder_boards(&order).unwrap();
        let ids: Vec<String> = kanban.boards().into_iter().map(|b| b.id).collect();
        assert_eq!(ids, order);

        let bad = vec![a.clone(), b.clone()];
        assert!(matches!(
            kanban.reorder_boards(&bad),
            Err(KanbanError::Reorder(_))
        ));
        let ids: Vec<String> = kanban.boards().into_iter().map(|b| b.id).collect();
        assert_eq!(ids, order);
    }

    #[test]
    fn test_on_reorder_boards_by_index() {
        let kanban = engine();
        let a = kanban.create_board("A").unwrap();
        kanban.on_reorder(&ReorderTarget::Boards, 1, 0).unwrap();
        assert_eq!(kanban.boards()[0].id, a);
        assert_eq!(kanban.active_board_id(), a);
    }

    #[test]
    fn test_set_board_colors_validates() {
        let kanban = engine();
        assert!(kanban.set_board_colors(DEFAULT_BOARD_ID, "#000", "#ffffff").unwrap());
        let data = kanban.board_data(DEFAULT_BOARD_ID).unwrap();
        assert_eq!(data.bg_color_start, "#000");
        assert_eq!(data.bg_color_end, "#ffffff");

        assert!(matches!(
            kanban.set_board_colors(DEFAULT_BOARD_ID, "red", "#fff"),
            Err(KanbanError::InvalidColor(_))
        ));
        assert!(!kanban.set_board_colors("missing", "#fff", "#fff").unwrap());
    }

    #[test]
    fn test_normalize_repairs_broken_state() {
        let defaults = BoardDefaults::default();
        let mut state = KanbanState::with_default_board(&defaults);
        state.boards.push(Board {
            id: "b2".to_string(),
            name: "No data".to_string(),
            created_at: String::new(),
        });
        state.boards_data.insert("ghost".to_string(), BoardData::empty(&defaults));
        state.active_board_id = "gone".to_string();

        assert!(state.normalize(&defaults));
        assert!(state.board_data("b2").is_some());
        assert!(state.board_data("ghost").is_none());
        assert_eq!(state.active_board_id, DEFAULT_BOARD_ID);
        assert!(!state.normalize(&defaults));
    }

    #[test]
    fn test_normalize_empty_board_list() {
        let defaults = BoardDefaults::default();
        let mut state = KanbanState {
            active_board_id: String::new(),
            boards: Vec::new(),
            boards_data: Default::default(),
        };
        assert!(state.normalize(&defaults));
        assert_eq!(state.boards.len(), 1);
        assert_eq!(state.active_board_id, state.boards[0].id);
    }

    #[test]
    fn test_normalize_drops_duplicate_tasks() {
        let defaults = BoardDefaults::default();
        let mut state = KanbanState::with_default_board(&defaults);
        let task = crate::types::Task::new("Dup", 1);
        let data = state.board_data_mut(DEFAULT_BOARD_ID).unwrap();
        data.columns.todo.items.push(task.clone());
        data.columns.done.items.push(task);

        assert!(state.normalize(&defaults));
        let data = state.board_data(DEFAULT_BOARD_ID).unwrap();
        assert_eq!(data.columns.todo.items.len(), 1);
        assert!(data.columns.done.items.is_empty());
    }
}
