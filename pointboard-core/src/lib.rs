pub mod board;
pub mod colors;
pub mod config;
pub mod daily;
#[cfg(feature = "env-logger")]
pub mod logging;
pub mod reorder;
pub mod settings;
pub mod storage;
pub mod store;
pub mod types;

use std::sync::Arc;

pub use board::{Kanban, KanbanError};
pub use config::EngineConfig;
pub use store::PersistentStore;

/// Open the engine on the file-backed store described by `config`,
/// installing the logger at `config.log_level` first.
pub fn open(config: &EngineConfig) -> Result<Kanban, storage::StorageError> {
    #[cfg(feature = "env-logger")]
    logging::init(&config.log_level);

    let data_dir = config.data_dir();
    log::info!("[pointboard.store] Opening store at {}", data_dir.display());
    let store = PersistentStore::open_local(data_dir)?;
    Ok(Kanban::new(Arc::new(store), config.board_defaults()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CaptureData, ColumnId, NewTask, RewardInput};
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> EngineConfig {
        EngineConfig {
            data_dir: Some(dir.path().to_path_buf()),
            log_level: "debug".to_string(),
            ..EngineConfig::default()
        }
    }

    #[test]
    fn test_state_survives_reopen() {
        let tmp = TempDir::new().unwrap();
        let config = config_in(&tmp);

        let (work, task_id) = {
            let kanban = open(&config).unwrap();
            let work = kanban.create_board("Work").unwrap();
            let task = kanban.add_task(&work, NewTask::new("Ship it", 10)).unwrap().unwrap();
            kanban.propose_transition(&work, &task.id).unwrap();
            kanban
                .confirm_transition(&work, &task.id, CaptureData::default())
                .unwrap();
            kanban.propose_completion(&work, &task.id).unwrap();
            kanban.confirm_completion(&work, &task.id).unwrap();
            kanban.add_reward(&work, RewardInput::new("Coffee", 4)).unwrap();
            (work, task.id)
        };

        let kanban = open(&config).unwrap();
        assert_eq!(kanban.active_board_id(), work);
        assert_eq!(kanban.boards().len(), 2);
        assert_eq!(kanban.balance(&work), Some(10));
        assert_eq!(kanban.rewards(&work).len(), 1);
        let (col, _) = kanban.find_task(&work, &task_id).unwrap();
        assert_eq!(col, ColumnId::Done);
        assert!(kanban.pending_completion().is_none());
    }

    #[test]
    fn test_fresh_directory_gets_default_board_file() {
        let tmp = TempDir::new().unwrap();
        let kanban = open(&config_in(&tmp)).unwrap();
        assert_eq!(kanban.boards().len(), 1);
        assert!(tmp.path().join("kanbanState.json").exists());
    }

    #[cfg(feature = "env-logger")]
    #[test]
    fn test_open_installs_configured_log_level() {
        let tmp = TempDir::new().unwrap();
        let config = config_in(&tmp);
        open(&config).unwrap();

        let expected = logging::resolve_filter(
            std::env::var(logging::LOG_ENV_VAR).ok(),
            &config.log_level,
        );
        // Some harnesses install their own logger first; then none is ours.
        if let Some(active) = logging::active_filter() {
            assert_eq!(active, expected);
        }
    }
}
