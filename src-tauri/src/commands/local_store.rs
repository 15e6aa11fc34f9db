//! Local Store Commands
//!
//! 암호화가 필요 없는 설정 값용 key-value 저장소

use tauri::State;

use crate::commands::SecureStoreState;
use crate::error::{CommandError, CommandResult};

#[tauri::command]
pub async fn local_store_get(
    state: State<'_, SecureStoreState>,
    key: String,
) -> CommandResult<Option<String>> {
    state.local.get(&key).map_err(CommandError::from)
}

#[tauri::command]
pub async fn local_store_set(
    state: State<'_, SecureStoreState>,
    key: String,
    value: String,
) -> CommandResult<()> {
    state.local.set(&key, &value).map_err(CommandError::from)
}

#[tauri::command]
pub async fn local_store_remove(
    state: State<'_, SecureStoreState>,
    key: String,
) -> CommandResult<()> {
    state.local.remove(&key).map_err(CommandError::from)
}

/// 삭제된 항목 수 반환
#[tauri::command]
pub async fn local_store_clear(state: State<'_, SecureStoreState>) -> CommandResult<usize> {
    state.local.clear().map_err(CommandError::from)
}
