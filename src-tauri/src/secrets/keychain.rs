//! Primary Backend: OS 키체인/키링
//!
//! 고정된 서비스 식별자 아래에 논리 키 1개당 account/value 1쌍을 저장합니다.
//! keyring 호출은 blocking이므로 `spawn_blocking`으로 실행합니다.

use std::sync::Arc;

use async_trait::async_trait;
use keyring::{Entry, Error as KeyringError};

use crate::error::StoreError;

/// Capability 확인용 예약 계정 (값을 쓰지 않고 조회만 함)
const PROBE_ACCOUNT: &str = "@secure-store/probe";

/// 키체인 오류
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("Keychain unavailable: {0}")]
    Unavailable(String),

    #[error("Keychain error: {0}")]
    Platform(String),

    #[error("Keychain task failed: {0}")]
    Join(String),
}

impl From<VaultError> for StoreError {
    fn from(err: VaultError) -> Self {
        StoreError::PrimaryUnavailable(err.to_string())
    }
}

/// OS credential vault 인터페이스
#[async_trait]
pub trait CredentialVault: Send + Sync {
    async fn get_secret(&self, account: &str) -> Result<Option<String>, VaultError>;

    async fn set_secret(&self, account: &str, value: &str) -> Result<(), VaultError>;

    /// 실제로 삭제된 항목이 있었는지 반환
    async fn delete_secret(&self, account: &str) -> Result<bool, VaultError>;

    /// 서비스 범위의 모든 (account, value). 열거를 지원하지 않으면 `None`.
    async fn list_secrets(&self) -> Result<Option<Vec<(String, String)>>, VaultError> {
        Ok(None)
    }
}

/// vault 핸들을 얻는 쪽 (Capability Probe가 최대 1회 호출)
#[async_trait]
pub trait VaultConnector: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn CredentialVault>, VaultError>;
}

/// keyring crate 기반 vault
pub struct KeyringVault {
    service: String,
}

impl KeyringVault {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, account: &str) -> Result<Entry, VaultError> {
        Entry::new(&self.service, account).map_err(map_keyring_error)
    }
}

fn map_keyring_error(err: KeyringError) -> VaultError {
    match err {
        KeyringError::NoStorageAccess(e) => VaultError::Unavailable(e.to_string()),
        KeyringError::PlatformFailure(e) => VaultError::Unavailable(e.to_string()),
        other => VaultError::Platform(other.to_string()),
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T, VaultError>
where
    F: FnOnce() -> Result<T, KeyringError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| VaultError::Join(e.to_string()))?
        .map_err(map_keyring_error)
}

#[async_trait]
impl CredentialVault for KeyringVault {
    async fn get_secret(&self, account: &str) -> Result<Option<String>, VaultError> {
        let entry = self.entry(account)?;
        run_blocking(move || match entry.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(KeyringError::NoEntry) => Ok(None),
            Err(e) => Err(e),
        })
        .await
    }

    async fn set_secret(&self, account: &str, value: &str) -> Result<(), VaultError> {
        let entry = self.entry(account)?;
        let value = value.to_string();
        run_blocking(move || entry.set_password(&value)).await
    }

    async fn delete_secret(&self, account: &str) -> Result<bool, VaultError> {
        let entry = self.entry(account)?;
        run_blocking(move || match entry.delete_password() {
            Ok(()) => Ok(true),
            Err(KeyringError::NoEntry) => Ok(false),
            Err(e) => Err(e),
        })
        .await
    }

    // keyring v2는 서비스 단위 열거를 지원하지 않음 → 기본 구현(None) 사용
}

/// keyring 연결기: 예약 계정을 조회해 키체인 접근 가능 여부를 판단
pub struct KeyringConnector {
    service: String,
}

impl KeyringConnector {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }
}

#[async_trait]
impl VaultConnector for KeyringConnector {
    async fn connect(&self) -> Result<Arc<dyn CredentialVault>, VaultError> {
        let service = self.service.clone();
        let probe = tokio::task::spawn_blocking(move || -> Result<(), KeyringError> {
            let entry = Entry::new(&service, PROBE_ACCOUNT)?;
            match entry.get_password() {
                Ok(_) | Err(KeyringError::NoEntry) => Ok(()),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(|e| VaultError::Join(e.to_string()))?;

        match probe {
            Ok(()) => Ok(Arc::new(KeyringVault::new(self.service.clone()))),
            Err(e) => Err(VaultError::Unavailable(e.to_string())),
        }
    }
}
