/// Daily checklist: a flat list of small to-dos, independent of the boards.
///
/// Items carry an explicit `order` so the user's manual arrangement survives
/// filtering and the other sort modes.
use std::cmp::Reverse;
use std::sync::Arc;

use chrono::DateTime;
use serde::{Deserialize, Serialize};

use crate::board::KanbanError;
use crate::reorder::reorder;
use crate::storage::StorageError;
use crate::store::PersistentStore;
use crate::types::{generate_id, now_timestamp, DAILY_TODOS_KEY};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

/// Sort rank: high first, unset last.
fn priority_rank(priority: Option<Priority>) -> u8 {
    match priority {
        Some(Priority::High) => 0,
        Some(Priority::Medium) => 1,
        Some(Priority::Low) => 2,
        None => 3,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoItem {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
    /// Estimated minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_estimate: Option<u32>,
}

impl TodoItem {
    fn created_millis(&self) -> Option<i64> {
        DateTime::parse_from_rfc3339(&self.created_at)
            .ok()
            .map(|d| d.timestamp_millis())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TodoFilter {
    #[default]
    All,
    Active,
    Completed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TodoSort {
    /// Newest first.
    #[default]
    Created,
    /// High to low, unset last. Ties keep their custom order.
    Priority,
    /// The user's manual order.
    Custom,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChecklistSummary {
    pub total: usize,
    pub completed: usize,
    /// Sum of the estimates of items not yet completed, in minutes.
    pub remaining_minutes: u32,
}

/// Sort into the user's manual order: explicit `order` first, then the rest by age.
fn sort_custom(items: &mut [TodoItem]) {
    items.sort_by_key(|t| (t.order.is_none(), t.order, t.created_millis()));
}

pub struct DailyChecklist {
    store: Arc<PersistentStore>,
}

impl DailyChecklist {
    pub fn new(store: Arc<PersistentStore>) -> Self {
        Self { store }
    }

    /// Items as stored.
    pub fn items(&self) -> Vec<TodoItem> {
        self.store.get(DAILY_TODOS_KEY, Vec::new())
    }

    /// Append an item at the end of the custom order. Blank text is ignored.
    pub fn add(
        &self,
        text: &str,
        priority: Option<Priority>,
        time_estimate: Option<u32>,
    ) -> Result<Option<TodoItem>, StorageError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }
        self.update(|items| {
            let next_order = items
                .iter()
                .filter_map(|t| t.order)
                .max()
                .map_or(items.len() as u32, |max| max.saturating_add(1).max(items.len() as u32));
            let item = TodoItem {
                id: generate_id("todo"),
                text: text.to_string(),
                completed: false,
                created_at: now_timestamp(),
                priority,
                order: Some(next_order),
                time_estimate,
            };
            items.push(item.clone());
            Ok(Some(item))
        })
    }

    /// Flip completion. Returns the new state, `None` if the id is unknown.
    pub fn toggle(&self, id: &str) -> Result<Option<bool>, StorageError> {
        self.update(|items| {
            Ok(items.iter_mut().find(|t| t.id == id).map(|t| {
                t.completed = !t.completed;
                t.completed
            }))
        })
    }

    pub fn delete(&self, id: &str) -> Result<bool, StorageError> {
        self.update(|items| {
            let before = items.len();
            items.retain(|t| t.id != id);
            Ok(items.len() != before)
        })
    }

    /// Move an item within the custom order (indices refer to
    /// `view(TodoFilter::All, TodoSort::Custom)`) and renumber every `order`.
    pub fn reorder(&self, from: usize, to: usize) -> Result<(), KanbanError> {
        self.store
            .update(DAILY_TODOS_KEY, Vec::new(), |items: &mut Vec<TodoItem>| {
                sort_custom(items);
                let mut moved = reorder(items, from, to)?;
                for (idx, item) in moved.iter_mut().enumerate() {
                    item.order = Some(idx as u32);
                }
                *items = moved;
                Ok(())
            })
    }

    pub fn view(&self, filter: TodoFilter, sort: TodoSort) -> Vec<TodoItem> {
        let mut items: Vec<TodoItem> = self
            .items()
            .into_iter()
            .filter(|t| match filter {
                TodoFilter::All => true,
                TodoFilter::Active => !t.completed,
                TodoFilter::Completed => t.completed,
            })
            .collect();

        sort_custom(&mut items);
        match sort {
            TodoSort::Custom => {}
            TodoSort::Created => items.sort_by_key(|t| Reverse(t.created_millis())),
            TodoSort::Priority => items.sort_by_key(|t| priority_rank(t.priority)),
        }
        items
    }

    /// The most pressing open items: by priority, then newest first.
    pub fn top_active(&self, limit: usize) -> Vec<TodoItem> {
        let mut items: Vec<TodoItem> = self.items().into_iter().filter(|t| !t.completed).collect();
        items.sort_by_key(|t| (priority_rank(t.priority), Reverse(t.created_millis())));
        items.truncate(limit);
        items
    }

    pub fn summary(&self) -> ChecklistSummary {
        let items = self.items();
        ChecklistSummary {
            total: items.len(),
            completed: items.iter().filter(|t| t.completed).count(),
            remaining_minutes: items
                .iter()
                .filter(|t| !t.completed)
                .filter_map(|t| t.time_estimate)
                .fold(0u32, u32::saturating_add),
        }
    }

    fn update<R>(&self, f: impl FnOnce(&mut Vec<TodoItem>) -> Result<R, StorageError>) -> Result<R, StorageError> {
        self.store.update(DAILY_TODOS_KEY, Vec::new(), f)
    }
}
