//! Secret Store façade
//!
//! get/set/remove/clear 4개 연산을 제공합니다.
//!
//! - Primary: OS 키체인 (사용 가능 여부는 인스턴스당 1회 probe)
//! - Fallback: 로컬 암호화 + SQLite 암호문 맵
//! - Secure Key Index: 변경이 성공할 때마다 갱신, clear의 기준
//!
//! 호출자 인증은 하지 않습니다. 상위 명령 레이어를 신뢰합니다.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;

use crate::config::SecretStoreConfig;
use crate::db::{self, LocalMap};
use crate::error::{StoreError, StoreResult};
use crate::secrets::index::SecureKeyIndex;
use crate::secrets::keychain::{CredentialVault, KeyringConnector, VaultConnector};
use crate::secrets::namespace::{is_valid_storage_key, resolve, strip_namespace, StorageKey};
use crate::secrets::probe::{BackendState, CapabilityProbe};
use crate::secrets::vault::{FallbackBackend, KeyFileCipher, LocalCipher};
use crate::storage::LocalStore;

/// 진단용 백엔드 상태
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendStatus {
    /// `not_probed` | `available` | `unavailable`
    pub primary: String,
    pub reason: Option<String>,
    pub fallback_available: bool,
    pub tracked_keys: usize,
}

pub struct SecretStore {
    config: SecretStoreConfig,
    probe: CapabilityProbe,
    fallback: FallbackBackend,
    index: SecureKeyIndex,
    local_map: LocalMap,
    /// primary 실패 경고는 인스턴스당 1회만
    primary_warned: AtomicBool,
}

impl SecretStore {
    /// collaborator 주입 생성자
    pub fn new(
        config: SecretStoreConfig,
        connector: Box<dyn VaultConnector>,
        cipher: Box<dyn LocalCipher>,
        local_map: LocalMap,
        secret_map: LocalMap,
    ) -> StoreResult<Self> {
        config.validate()?;
        Ok(Self {
            probe: CapabilityProbe::new(connector),
            fallback: FallbackBackend::new(cipher, secret_map, config.secret_namespace.clone()),
            index: SecureKeyIndex::new(local_map.clone(), config.index_key.clone()),
            local_map,
            primary_warned: AtomicBool::new(false),
            config,
        })
    }

    /// 운영 collaborator 구성: keyring + app_data_dir의 키 파일 + SQLite 파일
    pub fn open(config: SecretStoreConfig, app_data_dir: &Path) -> StoreResult<Self> {
        let (local_map, secret_map) = db::open_maps(&app_data_dir.join(&config.database_file))?;
        let connector = KeyringConnector::new(config.service_name.clone());
        let cipher = KeyFileCipher::new(app_data_dir.join(&config.key_file));
        Self::new(
            config,
            Box::new(connector),
            Box::new(cipher),
            local_map,
            secret_map,
        )
    }

    /// 같은 로컬 맵을 쓰는 일반(비밀 아님) 저장소
    pub fn local_store(&self) -> LocalStore {
        LocalStore::new(
            self.local_map.clone(),
            self.config.local_namespace.clone(),
            self.config.max_value_bytes,
        )
    }

    pub fn config(&self) -> &SecretStoreConfig {
        &self.config
    }

    /// 시크릿 조회
    ///
    /// 복호화 실패는 값 없음(`None`)으로 처리됩니다.
    /// primary에 없으면 primary 쓰기 실패로 fallback에 남은 값을 확인합니다.
    pub async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let key = StorageKey::parse(key)?;

        if let Some(vault) = self.probe.primary().await {
            match self.get_from_primary(vault.as_ref(), &key).await {
                Ok(Some(value)) => return Ok(Some(value)),
                Ok(None) => return self.promote_from_fallback(vault.as_ref(), &key).await,
                Err(e) => self.warn_primary_once(&e.to_string()),
            }
        }

        self.get_from_fallback(&key)
    }

    /// 시크릿 존재 여부
    pub async fn has(&self, key: &str) -> StoreResult<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// 시크릿 저장
    pub async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let key = StorageKey::parse(key)?;
        self.validate_value(value)?;

        match self.probe.probe_primary().await {
            BackendState::Available(vault) => {
                match vault
                    .set_secret(&self.account(&key), value)
                    .await
                    .map_err(StoreError::from)
                {
                    Ok(()) => {
                        // 이전에 fallback에 쓴 값은 이제 낡은 값
                        if let Err(e) = self.fallback.delete_pair(&key) {
                            tracing::warn!("Failed to drop stale fallback entry '{}': {}", key, e);
                        }
                        self.track(&key);
                        tracing::debug!(key = %key, "Secret stored in OS keychain");
                        return Ok(());
                    }
                    Err(e) => {
                        self.warn_primary_once(&e.to_string());
                        // 이전 primary 값이 새 fallback 값을 가리면 안 됨
                        self.delete_primary_accounts(vault.as_ref(), &key).await;
                    }
                }
            }
            BackendState::Unavailable(reason) => self.warn_primary_once(&reason),
            BackendState::NotProbed => {}
        }

        self.fallback.write(&key, value)?;
        self.track(&key);
        tracing::debug!(key = %key, "Secret stored in local encrypted store");
        Ok(())
    }

    /// 시크릿 삭제 (없는 키도 성공)
    pub async fn remove(&self, key: &str) -> StoreResult<()> {
        let key = StorageKey::parse(key)?;

        if let Some(vault) = self.probe.primary().await {
            self.delete_primary_accounts(vault.as_ref(), &key).await;
        }

        self.fallback.delete_pair(&key)?;
        self.index.remove(&key)?;
        tracing::debug!(key = %key, "Secret removed");
        Ok(())
    }

    /// 모든 시크릿 삭제
    ///
    /// 백엔드/인덱스 사이에 원자적이지 않습니다. 중간에 중단되면 인덱스에 값 없는 키가 남을 수 있고,
    /// 이는 다음 읽기에서 `None`으로 해석됩니다.
    pub async fn clear(&self) -> StoreResult<()> {
        let tracked = self.index.read()?;

        if let Some(vault) = self.probe.primary().await {
            let (deleted, failures) = self.clear_primary(vault.as_ref(), &tracked).await;
            if failures > 0 {
                tracing::warn!(
                    "OS keychain clear finished with {} failures ({} deleted)",
                    failures,
                    deleted
                );
            } else {
                tracing::debug!("OS keychain clear deleted {} accounts", deleted);
            }
        }

        // fallback 맵은 이 저장소 전용이므로 인덱스와 무관하게 전부 삭제
        let wiped = self.fallback.wipe()?;
        self.index.reset()?;

        tracing::info!(
            "Secret store cleared ({} tracked keys, {} fallback entries)",
            tracked.len(),
            wiped
        );
        Ok(())
    }

    /// 진단용 상태 (probe를 유발하지 않음)
    pub async fn backend_status(&self) -> StoreResult<BackendStatus> {
        let state = self.probe.state().await;
        let reason = match &state {
            BackendState::Unavailable(reason) => Some(reason.clone()),
            _ => None,
        };
        Ok(BackendStatus {
            primary: state.label().to_string(),
            reason,
            fallback_available: self.fallback.is_available(),
            tracked_keys: self.index.read()?.len(),
        })
    }

    fn account(&self, key: &StorageKey) -> String {
        key.namespaced(&self.config.secret_namespace)
    }

    fn validate_value(&self, value: &str) -> StoreResult<()> {
        if value.len() > self.config.max_value_bytes {
            return Err(StoreError::Validation(format!(
                "value is {} bytes, limit is {}",
                value.len(),
                self.config.max_value_bytes
            )));
        }
        Ok(())
    }

    fn warn_primary_once(&self, reason: &str) {
        if !self.primary_warned.swap(true, Ordering::SeqCst) {
            tracing::warn!(
                "OS keychain unavailable, falling back to local encrypted storage: {}",
                reason
            );
        } else {
            tracing::debug!("OS keychain unavailable: {}", reason);
        }
    }

    fn legacy_account<'k>(&self, key: &'k StorageKey) -> Option<&'k str> {
        key.legacy(&self.config.secret_namespace)
    }

    /// 네임스페이스/legacy 계정을 읽고 필요 시 마이그레이션
    async fn get_from_primary(
        &self,
        vault: &dyn CredentialVault,
        key: &StorageKey,
    ) -> StoreResult<Option<String>> {
        let account = self.account(key);
        let namespaced = vault.get_secret(&account).await?;
        let Some(legacy_account) = self.legacy_account(key) else {
            return Ok(namespaced);
        };
        let legacy = vault.get_secret(legacy_account).await?;
        let shadowed_legacy = namespaced.is_some() && legacy.is_some();

        let resolved = resolve(namespaced, legacy);

        if resolved.migrate {
            if let Some(value) = resolved.value.as_deref() {
                self.migrate_primary(vault, key, &account, legacy_account, value)
                    .await;
            }
        } else if shadowed_legacy {
            // 네임스페이스 값이 우선이므로 legacy 값은 더 이상 읽히지 않음
            if let Err(e) = vault.delete_secret(legacy_account).await {
                tracing::warn!("Failed to delete shadowed legacy account '{}': {}", key, e);
            }
        }

        Ok(resolved.value)
    }

    /// best-effort: 실패해도 읽기는 계속 진행
    async fn migrate_primary(
        &self,
        vault: &dyn CredentialVault,
        key: &StorageKey,
        account: &str,
        legacy_account: &str,
        value: &str,
    ) {
        if let Err(e) = vault.set_secret(account, value).await {
            // 쓰기가 실패했으면 legacy 값을 지우지 않음 (다음 읽기에서 재시도)
            tracing::warn!("Failed to migrate legacy keychain entry '{}': {}", key, e);
            return;
        }
        if let Err(e) = vault.delete_secret(legacy_account).await {
            tracing::warn!("Failed to delete migrated legacy account '{}': {}", key, e);
        }
        self.track(key);
        tracing::info!("Migrated legacy keychain entry '{}'", key);
    }

    /// primary miss 이후 fallback 확인. 찾은 값은 primary로 옮기고, 옮기지 못하면 fallback에 둠.
    async fn promote_from_fallback(
        &self,
        vault: &dyn CredentialVault,
        key: &StorageKey,
    ) -> StoreResult<Option<String>> {
        if !self.fallback.is_available() {
            return Ok(None);
        }
        let read = self.fallback.read(key)?;
        let Some(value) = read.value else {
            return Ok(None);
        };

        match vault.set_secret(&self.account(key), &value).await {
            Ok(()) => {
                if let Err(e) = self.fallback.delete_pair(key) {
                    tracing::warn!("Failed to drop promoted fallback entry '{}': {}", key, e);
                }
                tracing::info!("Moved fallback entry '{}' to OS keychain", key);
            }
            Err(e) => tracing::debug!("Keeping '{}' in local encrypted store: {}", key, e),
        }
        if read.migrated {
            self.track(key);
        }
        Ok(Some(value))
    }

    fn get_from_fallback(&self, key: &StorageKey) -> StoreResult<Option<String>> {
        if !self.fallback.is_available() {
            return Err(StoreError::StorageUnavailable(
                "neither the OS keychain nor local encryption is available".to_string(),
            ));
        }
        let read = self.fallback.read(key)?;
        if read.migrated {
            self.track(key);
        }
        Ok(read.value)
    }

    /// 값은 이미 저장되었으므로 인덱스 갱신 실패는 경고만 남김 (clear가 이 키를 놓칠 수 있음)
    fn track(&self, key: &StorageKey) {
        if let Err(e) = self.index.add(key) {
            tracing::warn!("Failed to track key '{}' in secure key index: {}", key, e);
        }
    }

    /// 네임스페이스 + legacy 계정 삭제 (best-effort)
    async fn delete_primary_accounts(&self, vault: &dyn CredentialVault, key: &StorageKey) {
        let accounts = std::iter::once(self.account(key))
            .chain(self.legacy_account(key).map(str::to_string));
        for account in accounts {
            if let Err(e) = vault.delete_secret(&account).await {
                tracing::warn!("Failed to delete '{}' from OS keychain: {}", account, e);
            }
        }
    }

    /// (삭제 수, 실패 수)
    async fn clear_primary(
        &self,
        vault: &dyn CredentialVault,
        tracked: &BTreeSet<StorageKey>,
    ) -> (usize, usize) {
        let namespace = &self.config.secret_namespace;
        let mut accounts: BTreeSet<String> = tracked
            .iter()
            .flat_map(|key| {
                std::iter::once(self.account(key))
                    .chain(self.legacy_account(key).map(str::to_string))
            })
            .collect();

        // 열거가 가능하면 인덱스가 놓친 계정도 포함
        match vault.list_secrets().await {
            Ok(Some(entries)) => {
                for (account, _) in entries {
                    if strip_namespace(namespace, &account).is_some()
                        || is_valid_storage_key(&account)
                    {
                        accounts.insert(account);
                    }
                }
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Failed to enumerate OS keychain entries: {}", e),
        }

        let mut deleted = 0;
        let mut failures = 0;
        for account in accounts {
            match vault.delete_secret(&account).await {
                Ok(true) => deleted += 1,
                Ok(false) => {}
                Err(e) => {
                    failures += 1;
                    tracing::warn!("Failed to delete '{}' from OS keychain: {}", account, e);
                }
            }
        }
        (deleted, failures)
    }
}
