//! Secure Store Commands
//!
//! OS 키체인/키링(실패 시 로컬 암호화 저장소)을 사용해 민감한 값을 저장합니다.

use serde::Deserialize;
use tauri::State;

use crate::commands::SecureStoreState;
use crate::error::{CommandError, CommandResult};
use crate::secrets::BackendStatus;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecureSecretArgs {
    pub key: String,
    pub value: String,
}

#[tauri::command]
pub async fn secure_store_get(
    state: State<'_, SecureStoreState>,
    key: String,
) -> CommandResult<Option<String>> {
    state.secrets.get(&key).await.map_err(CommandError::from)
}

#[tauri::command]
pub async fn secure_store_set(
    state: State<'_, SecureStoreState>,
    args: SecureSecretArgs,
) -> CommandResult<()> {
    state
        .secrets
        .set(&args.key, &args.value)
        .await
        .map_err(CommandError::from)
}

#[tauri::command]
pub async fn secure_store_remove(
    state: State<'_, SecureStoreState>,
    key: String,
) -> CommandResult<()> {
    state.secrets.remove(&key).await.map_err(CommandError::from)
}

#[tauri::command]
pub async fn secure_store_clear(state: State<'_, SecureStoreState>) -> CommandResult<()> {
    state.secrets.clear().await.map_err(CommandError::from)
}

/// 키체인/fallback 상태 (설정 화면 진단용)
#[tauri::command]
pub async fn secure_store_status(
    state: State<'_, SecureStoreState>,
) -> CommandResult<BackendStatus> {
    state
        .secrets
        .backend_status()
        .await
        .map_err(CommandError::from)
}
