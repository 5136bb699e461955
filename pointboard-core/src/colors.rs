/// Saved color schemes (gradient or solid) for board backgrounds.
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::board::{Kanban, KanbanError};
use crate::storage::StorageError;
use crate::store::PersistentStore;
use crate::types::{generate_id, SAVED_COLOR_SCHEMES_KEY};

static HEX_COLOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").unwrap());

/// `#rgb` or `#rrggbb`.
pub fn is_hex_color(color: &str) -> bool {
    HEX_COLOR_RE.is_match(color)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedColorScheme {
    pub id: String,
    pub start_color: String,
    pub end_color: String,
    #[serde(default)]
    pub is_single: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub single_color: Option<String>,
}

impl SavedColorScheme {
    /// The (start, end) pair a board gets when this scheme is applied.
    /// Solid schemes paint both ends with one color.
    pub fn board_colors(&self) -> (String, String) {
        if self.is_single {
            let color = self
                .single_color
                .clone()
                .unwrap_or_else(|| self.start_color.clone());
            (color.clone(), color)
        } else {
            (self.start_color.clone(), self.end_color.clone())
        }
    }
}

/// Scheme library persisted under [`SAVED_COLOR_SCHEMES_KEY`].
pub struct ColorSchemes {
    store: Arc<PersistentStore>,
}

impl ColorSchemes {
    pub fn new(store: Arc<PersistentStore>) -> Self {
        Self { store }
    }

    pub fn schemes(&self) -> Vec<SavedColorScheme> {
        self.store.get(SAVED_COLOR_SCHEMES_KEY, Vec::new())
    }

    pub fn scheme(&self, scheme_id: &str) -> Option<SavedColorScheme> {
        self.schemes().into_iter().find(|s| s.id == scheme_id)
    }

    /// Save a gradient scheme.
    pub fn save_gradient(&self, start: &str, end: &str) -> Result<SavedColorScheme, KanbanError> {
        for color in [start, end] {
            if !is_hex_color(color) {
                return Err(KanbanError::InvalidColor(color.to_string()));
            }
        }
        self.push(SavedColorScheme {
            id: generate_id("scheme"),
            start_color: start.to_string(),
            end_color: end.to_string(),
            is_single: false,
            single_color: None,
        })
    }

    /// Save a solid scheme.
    pub fn save_solid(&self, color: &str) -> Result<SavedColorScheme, KanbanError> {
        if !is_hex_color(color) {
            return Err(KanbanError::InvalidColor(color.to_string()));
        }
        self.push(SavedColorScheme {
            id: generate_id("scheme"),
            start_color: color.to_string(),
            end_color: color.to_string(),
            is_single: true,
            single_color: Some(color.to_string()),
        })
    }

    pub fn delete_scheme(&self, scheme_id: &str) -> Result<bool, StorageError> {
        self.store
            .update(SAVED_COLOR_SCHEMES_KEY, Vec::new(), |schemes: &mut Vec<SavedColorScheme>| {
                let before = schemes.len();
                schemes.retain(|s| s.id != scheme_id);
                Ok(schemes.len() != before)
            })
    }

    /// Paint a board with a saved scheme. `Ok(false)` if the scheme or board is unknown.
    pub fn apply_scheme(&self, kanban: &Kanban, board_id: &str, scheme_id: &str) -> Result<bool, KanbanError> {
        let Some(scheme) = self.scheme(scheme_id) else {
            return Ok(false);
        };
        let (start, end) = scheme.board_colors();
        kanban.set_board_colors(board_id, &start, &end)
    }

    fn push(&self, scheme: SavedColorScheme) -> Result<SavedColorScheme, KanbanError> {
        self.store
            .update(SAVED_COLOR_SCHEMES_KEY, Vec::new(), |schemes: &mut Vec<SavedColorScheme>| {
                schemes.push(scheme.clone());
                Ok::<_, StorageError>(())
            })?;
        Ok(scheme)
    }
}
