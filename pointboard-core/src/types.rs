use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

/// Store keys of the persisted aggregates. Renaming any of these orphans
/// existing user data.
pub const KANBAN_STATE_KEY: &str = "kanbanState";
pub const DAILY_TODOS_KEY: &str = "dailyTodos";
pub const SAVED_COLOR_SCHEMES_KEY: &str = "savedColorSchemes";
pub const LANGUAGE_KEY: &str = "language";

pub const DEFAULT_BOARD_ID: &str = "default-board";
pub const DEFAULT_BOARD_NAME: &str = "My Board";
pub const DEFAULT_TASK_COLOR: &str = "#800080";
pub const DEFAULT_REWARD_COLOR: &str = "#4c1d95";
pub const DEFAULT_BG_COLOR_START: &str = "#2D9596";
pub const DEFAULT_BG_COLOR_END: &str = "#265073";

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Fresh identifier of the form `<prefix>-<seq>-<millis hex>`.
pub fn generate_id(prefix: &str) -> String {
    let seq = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    let ts = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    format!("{}-{}-{:x}", prefix, seq, ts)
}

/// Current time as an RFC 3339 string, the format used for every `createdAt`.
pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// The three fixed pipeline stages of a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColumnId {
    Todo,
    InProgress,
    Done,
}

impl ColumnId {
    pub const ALL: [ColumnId; 3] = [ColumnId::Todo, ColumnId::InProgress, ColumnId::Done];

    pub fn as_str(self) -> &'static str {
        match self {
            ColumnId::Todo => "todo",
            ColumnId::InProgress => "inProgress",
            ColumnId::Done => "done",
        }
    }

    pub fn default_title(self) -> &'static str {
        match self {
            ColumnId::Todo => "To Do",
            ColumnId::InProgress => "In Progress",
            ColumnId::Done => "Done",
        }
    }

    /// The stage a task in this column advances to, if any.
    pub fn next(self) -> Option<ColumnId> {
        match self {
            ColumnId::Todo => Some(ColumnId::InProgress),
            ColumnId::InProgress => Some(ColumnId::Done),
            ColumnId::Done => None,
        }
    }

    /// Forward-only pipeline: a task may only advance one stage at a time.
    pub fn can_transition_to(self, target: ColumnId) -> bool {
        self.next() == Some(target)
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "todo" => Ok(ColumnId::Todo),
            "inProgress" => Ok(ColumnId::InProgress),
            "done" => Ok(ColumnId::Done),
            other => Err(format!("unknown column: {}", other)),
        }
    }
}

fn default_task_color() -> String {
    DEFAULT_TASK_COLOR.to_string()
}

fn default_reward_color() -> String {
    DEFAULT_REWARD_COLOR.to_string()
}

fn default_bg_color_start() -> String {
    DEFAULT_BG_COLOR_START.to_string()
}

fn default_bg_color_end() -> String {
    DEFAULT_BG_COLOR_END.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub points: u32,
    #[serde(default = "default_task_color")]
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Free-text reward label, surfaced to the user when the task completes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    /// Percent complete, 0-100.
    #[serde(default)]
    pub progress: u8,
}

impl Task {
    pub fn new(title: impl Into<String>, points: u32) -> Self {
        Self {
            id: generate_id("task"),
            title: title.into(),
            description: String::new(),
            points,
            color: default_task_color(),
            due_date: None,
            notes: None,
            reward: None,
            duration: None,
            progress: 0,
        }
    }

    /// Merge every field set in `patch` onto this task.
    pub fn apply(&mut self, patch: &TaskPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(points) = patch.points {
            self.points = points;
        }
        if let Some(color) = &patch.color {
            self.color = color.clone();
        }
        if let Some(due_date) = &patch.due_date {
            self.due_date = Some(due_date.clone());
        }
        if let Some(notes) = &patch.notes {
            self.notes = Some(notes.clone());
        }
        if let Some(reward) = &patch.reward {
            self.reward = Some(reward.clone());
        }
        if let Some(duration) = &patch.duration {
            self.duration = Some(duration.clone());
        }
        if let Some(progress) = patch.progress {
            self.progress = progress.min(100);
        }
    }

    /// The reward label, if one was set and is not blank.
    pub fn reward_label(&self) -> Option<&str> {
        self.reward
            .as_deref()
            .map(str::trim)
            .filter(|label| !label.is_empty())
    }
}

/// Partial task used for edits and for the extra fields merged on a move.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub points: Option<u32>,
    pub color: Option<String>,
    pub due_date: Option<String>,
    pub notes: Option<String>,
    pub reward: Option<String>,
    pub duration: Option<String>,
    pub progress: Option<u8>,
}

/// Input for creating a task in the Todo column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub points: u32,
    pub color: Option<String>,
}

impl NewTask {
    pub fn new(title: impl Into<String>, points: u32) -> Self {
        Self {
            title: title.into(),
            points,
            ..Self::default()
        }
    }
}

/// Data gathered while a task is being started (`Todo -> InProgress`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaptureData {
    pub due_date: Option<String>,
    pub notes: Option<String>,
    pub duration: Option<String>,
    pub reward: Option<String>,
}

impl From<CaptureData> for TaskPatch {
    fn from(capture: CaptureData) -> Self {
        TaskPatch {
            due_date: capture.due_date,
            notes: capture.notes,
            duration: capture.duration,
            reward: capture.reward,
            ..TaskPatch::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnData {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub items: Vec<Task>,
}

impl ColumnData {
    pub fn empty(column: ColumnId) -> Self {
        Self {
            title: column.default_title().to_string(),
            items: Vec::new(),
        }
    }

    pub fn position(&self, task_id: &str) -> Option<usize> {
        self.items.iter().position(|t| t.id == task_id)
    }
}

fn empty_todo() -> ColumnData {
    ColumnData::empty(ColumnId::Todo)
}

fn empty_in_progress() -> ColumnData {
    ColumnData::empty(ColumnId::InProgress)
}

fn empty_done() -> ColumnData {
    ColumnData::empty(ColumnId::Done)
}

/// The three columns of a board, always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Columns {
    #[serde(default = "empty_todo")]
    pub todo: ColumnData,
    #[serde(default = "empty_in_progress")]
    pub in_progress: ColumnData,
    #[serde(default = "empty_done")]
    pub done: ColumnData,
}

impl Default for Columns {
    fn default() -> Self {
        Self {
            todo: empty_todo(),
            in_progress: empty_in_progress(),
            done: empty_done(),
        }
    }
}

impl Columns {
    pub fn get(&self, column: ColumnId) -> &ColumnData {
        match column {
            ColumnId::Todo => &self.todo,
            ColumnId::InProgress => &self.in_progress,
            ColumnId::Done => &self.done,
        }
    }

    pub fn get_mut(&mut self, column: ColumnId) -> &mut ColumnData {
        match column {
            ColumnId::Todo => &mut self.todo,
            ColumnId::InProgress => &mut self.in_progress,
            ColumnId::Done => &mut self.done,
        }
    }

    /// Locate a task in any column.
    pub fn locate(&self, task_id: &str) -> Option<(ColumnId, usize)> {
        ColumnId::ALL
            .into_iter()
            .find_map(|col| self.get(col).position(task_id).map(|idx| (col, idx)))
    }

    pub fn task_count(&self) -> usize {
        ColumnId::ALL.iter().map(|c| self.get(*c).items.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reward {
    pub id: String,
    pub title: String,
    /// Cost in points.
    #[serde(default)]
    pub points: u32,
    #[serde(default = "default_reward_color")]
    pub color: String,
}

/// Input for creating or replacing a reward.
#[derive(Debug, Clone, PartialEq)]
pub struct RewardInput {
    pub title: String,
    pub points: u32,
    pub color: Option<String>,
}

impl RewardInput {
    pub fn new(title: impl Into<String>, points: u32) -> Self {
        Self {
            title: title.into(),
            points,
            color: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub created_at: String,
}

/// Everything a board owns: columns, reward catalog, points balance and colors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardData {
    #[serde(default)]
    pub columns: Columns,
    #[serde(default)]
    pub rewards: Vec<Reward>,
    #[serde(default)]
    pub total_points: u64,
    #[serde(default = "default_bg_color_start")]
    pub bg_color_start: String,
    #[serde(default = "default_bg_color_end")]
    pub bg_color_end: String,
}

impl BoardData {
    pub fn empty(defaults: &BoardDefaults) -> Self {
        Self {
            columns: Columns::default(),
            rewards: Vec::new(),
            total_points: 0,
            bg_color_start: defaults.bg_color_start.clone(),
            bg_color_end: defaults.bg_color_end.clone(),
        }
    }
}

/// Values used when a board, or the whole state, is created from scratch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardDefaults {
    pub name: String,
    pub bg_color_start: String,
    pub bg_color_end: String,
}

impl Default for BoardDefaults {
    fn default() -> Self {
        Self {
            name: DEFAULT_BOARD_NAME.to_string(),
            bg_color_start: DEFAULT_BG_COLOR_START.to_string(),
            bg_color_end: DEFAULT_BG_COLOR_END.to_string(),
        }
    }
}

/// Root aggregate persisted under [`KANBAN_STATE_KEY`].
///
/// Invariants (restored by `normalize` on load, kept by every operation):
/// - `boards_data` keys equal the ids in `boards`
/// - `boards` is never empty
/// - `active_board_id` names a board in `boards`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KanbanState {
    #[serde(rename = "activeBoard", alias = "activeBoardId", default)]
    pub active_board_id: String,
    #[serde(default)]
    pub boards: Vec<Board>,
    #[serde(default)]
    pub boards_data: BTreeMap<String, BoardData>,
}

impl KanbanState {
    /// A state holding a single empty board.
    pub fn with_default_board(defaults: &BoardDefaults) -> Self {
        let board = Board {
            id: DEFAULT_BOARD_ID.to_string(),
            name: defaults.name.clone(),
            created_at: now_timestamp(),
        };
        let mut boards_data = BTreeMap::new();
        boards_data.insert(board.id.clone(), BoardData::empty(defaults));
        Self {
            active_board_id: board.id.clone(),
            boards: vec![board],
            boards_data,
        }
    }
}

impl Default for KanbanState {
    fn default() -> Self {
        Self::with_default_board(&BoardDefaults::default())
    }
}
