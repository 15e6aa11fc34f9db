//! Tauri Commands Module
//!
//! 프론트엔드에서 호출 가능한 Tauri 명령어 정의.
//! 호출자 인증은 Tauri IPC 레이어가 담당하며, 여기서는 저장소에 그대로 위임합니다.

pub mod local_store;
pub mod secure_store;

use tauri::{
    plugin::{Builder, TauriPlugin},
    Manager, Runtime,
};

use crate::config::SecretStoreConfig;
use crate::secrets::SecretStore;
use crate::storage::LocalStore;

/// 앱 상태로 관리되는 저장소
pub struct SecureStoreState {
    pub secrets: SecretStore,
    pub local: LocalStore,
}

impl SecureStoreState {
    pub fn new(secrets: SecretStore) -> Self {
        let local = secrets.local_store();
        Self { secrets, local }
    }
}

/// `secure-store` 플러그인
///
/// setup에서 app_data_dir 아래 DB/키 파일을 열고 상태로 등록합니다.
pub fn init<R: Runtime>() -> TauriPlugin<R> {
    Builder::new("secure-store")
        .invoke_handler(tauri::generate_handler![
            secure_store::secure_store_get,
            secure_store::secure_store_set,
            secure_store::secure_store_remove,
            secure_store::secure_store_clear,
            secure_store::secure_store_status,
            local_store::local_store_get,
            local_store::local_store_set,
            local_store::local_store_remove,
            local_store::local_store_clear,
        ])
        .setup(|app, _api| {
            crate::observability::init_tracing();

            let app_data_dir = app.path().app_data_dir()?;
            let config = SecretStoreConfig::from_env()?;
            let store = SecretStore::open(config, &app_data_dir)?;
            tracing::info!("Secure store opened at {}", app_data_dir.display());

            app.manage(SecureStoreState::new(store));
            Ok(())
        })
        .build()
}
