//! Secure Store 설정
//!
//! 기본값 + 환경변수 오버라이드. `.env` 파일은 `from_env()`에서 dotenvy로 로드합니다.

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::secrets::namespace::is_valid_storage_key;

/// 시크릿 저장소 설정
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SecretStoreConfig {
    /// OS 키체인 서비스 식별자 (앱 전체에서 고정)
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// 시크릿 키 prefix (`<secret_namespace>.<key>`)
    #[serde(default = "default_secret_namespace")]
    pub secret_namespace: String,

    /// 일반(비밀 아님) 로컬 저장소 키 prefix
    #[serde(default = "default_local_namespace")]
    pub local_namespace: String,

    /// Secure Key Index 예약 키 (유효한 StorageKey가 될 수 없는 문자 포함)
    #[serde(default = "default_index_key")]
    pub index_key: String,

    /// 값 크기 상한 (bytes)
    #[serde(default = "default_max_value_bytes")]
    pub max_value_bytes: usize,

    /// app_data_dir 하위 SQLite 파일명
    #[serde(default = "default_database_file")]
    pub database_file: String,

    /// app_data_dir 하위 fallback 암호화 키 파일명
    #[serde(default = "default_key_file")]
    pub key_file: String,
}

fn default_service_name() -> String {
    "com.ite.app".to_string()
}

fn default_secret_namespace() -> String {
    "secure".to_string()
}

fn default_local_namespace() -> String {
    "local".to_string()
}

fn default_index_key() -> String {
    "@secure-store/index".to_string()
}

fn default_max_value_bytes() -> usize {
    1024 * 1024 // 1 MiB
}

fn default_database_file() -> String {
    "secure-store.db".to_string()
}

fn default_key_file() -> String {
    "session.key".to_string()
}

impl Default for SecretStoreConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            secret_namespace: default_secret_namespace(),
            local_namespace: default_local_namespace(),
            index_key: default_index_key(),
            max_value_bytes: default_max_value_bytes(),
            database_file: default_database_file(),
            key_file: default_key_file(),
        }
    }
}

impl SecretStoreConfig {
    /// 기본값에 환경변수 오버라이드 적용
    ///
    /// - `SECURE_STORE_SERVICE`
    /// - `SECURE_STORE_NAMESPACE`
    /// - `LOCAL_STORE_NAMESPACE`
    pub fn from_env() -> StoreResult<Self> {
        // 파일이 없을 수 있으므로 실패해도 무시
        let _ = dotenvy::dotenv();

        let mut config = Self::default();
        if let Some(v) = non_empty_var("SECURE_STORE_SERVICE") {
            config.service_name = v;
        }
        if let Some(v) = non_empty_var("SECURE_STORE_NAMESPACE") {
            config.secret_namespace = v;
        }
        if let Some(v) = non_empty_var("LOCAL_STORE_NAMESPACE") {
            config.local_namespace = v;
        }
        config.validate()?;
        Ok(config)
    }

    /// 네임스페이스/예약 키 검증
    pub fn validate(&self) -> StoreResult<()> {
        if self.service_name.trim().is_empty() {
            return Err(StoreError::Validation(
                "service_name must not be empty".to_string(),
            ));
        }
        for (name, ns) in [
            ("secret_namespace", &self.secret_namespace),
            ("local_namespace", &self.local_namespace),
        ] {
            if !is_valid_storage_key(ns) {
                return Err(StoreError::Validation(format!(
                    "{} '{}' is not a valid storage key",
                    name, ns
                )));
            }
        }
        if self.secret_namespace == self.local_namespace {
            return Err(StoreError::Validation(
                "secret and local namespaces must differ".to_string(),
            ));
        }
        // 예약 키가 일반 키와 겹치면 인덱스가 사용자 데이터로 덮일 수 있음
        if is_valid_storage_key(&self.index_key) {
            return Err(StoreError::Validation(format!(
                "index_key '{}' must not be a valid storage key",
                self.index_key
            )));
        }
        if self.max_value_bytes == 0 {
            return Err(StoreError::Validation(
                "max_value_bytes must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
