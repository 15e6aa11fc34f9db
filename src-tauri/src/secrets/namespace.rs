//! 키 검증 및 네임스페이스 해석
//!
//! - 키 문자셋: `[a-zA-Z0-9_.-]`, 길이 1~256
//! - 저장 키: `<namespace>.<key>`
//! - 네임스페이스 도입 이전의 bare 키 값은 첫 읽기 시 마이그레이션

use crate::error::{StoreError, StoreResult};

/// 키 최대 길이
pub const MAX_KEY_LEN: usize = 256;

/// 키 문자셋/길이 검사
pub fn is_valid_storage_key(raw: &str) -> bool {
    !raw.is_empty()
        && raw.len() <= MAX_KEY_LEN
        && raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-')
}

/// 검증된 키
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StorageKey(String);

impl StorageKey {
    /// I/O 이전에 키를 검증합니다.
    pub fn parse(raw: &str) -> StoreResult<Self> {
        if is_valid_storage_key(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(StoreError::Validation(format!(
                "invalid storage key '{}': expected 1-{} chars of [a-zA-Z0-9_.-]",
                truncate_for_log(raw),
                MAX_KEY_LEN
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `<namespace>.<key>`
    pub fn namespaced(&self, namespace: &str) -> String {
        format!("{}.{}", namespace, self.0)
    }

    /// 네임스페이스 이전 bare 키
    ///
    /// `<namespace>.`로 시작하는 키의 bare 이름은 다른 키의 저장 키와 같으므로 legacy가 없습니다.
    pub fn legacy(&self, namespace: &str) -> Option<&str> {
        if strip_namespace(namespace, &self.0).is_some() {
            None
        } else {
            Some(&self.0)
        }
    }
}

impl std::fmt::Display for StorageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// `<namespace>.` prefix를 벗겨 원래 키를 얻습니다. (열거된 계정명 역해석용)
pub fn strip_namespace(namespace: &str, stored: &str) -> Option<StorageKey> {
    stored
        .strip_prefix(namespace)
        .and_then(|rest| rest.strip_prefix('.'))
        .filter(|rest| is_valid_storage_key(rest))
        .map(|rest| StorageKey(rest.to_string()))
}

/// 해석 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved<T> {
    pub value: Option<T>,
    /// legacy 값이 선택되어 네임스페이스 키로 옮겨야 함
    pub migrate: bool,
}

/// 네임스페이스 값이 있으면 항상 우선, 없으면 legacy 값을 선택하고 마이그레이션 표시
///
/// 두 백엔드가 동일하게 사용합니다.
pub fn resolve<T>(namespaced: Option<T>, legacy: Option<T>) -> Resolved<T> {
    match (namespaced, legacy) {
        (Some(value), _) => Resolved {
            value: Some(value),
            migrate: false,
        },
        (None, Some(value)) => Resolved {
            value: Some(value),
            migrate: true,
        },
        (None, None) => Resolved {
            value: None,
            migrate: false,
        },
    }
}

fn truncate_for_log(raw: &str) -> String {
    const LIMIT: usize = 32;
    if raw.chars().count() > LIMIT {
        let head: String = raw.chars().take(LIMIT).collect();
        format!("{}...", head)
    } else {
        raw.to_string()
    }
}
