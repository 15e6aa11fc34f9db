//! 일반(비밀 아님) 로컬 저장소
//!
//! 시크릿 저장소와 같은 네임스페이스/마이그레이션 규칙을 따르지만 암호화는 하지 않습니다.
//! Secure Key Index도 같은 맵의 예약 키에 저장되므로 `clear`는 네임스페이스 항목만 지웁니다.

use crate::db::LocalMap;
use crate::error::{StoreError, StoreResult};
use crate::secrets::namespace::{resolve, strip_namespace, StorageKey};

#[derive(Clone)]
pub struct LocalStore {
    map: LocalMap,
    namespace: String,
    max_value_bytes: usize,
}

impl LocalStore {
    pub fn new(map: LocalMap, namespace: impl Into<String>, max_value_bytes: usize) -> Self {
        Self {
            map,
            namespace: namespace.into(),
            max_value_bytes,
        }
    }

    pub fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let key = StorageKey::parse(key)?;
        let namespaced_key = key.namespaced(&self.namespace);
        let namespaced = self.map.get(&namespaced_key)?;
        let Some(legacy_key) = key.legacy(&self.namespace) else {
            return Ok(namespaced);
        };
        let legacy = self.map.get(legacy_key)?;
        if namespaced.is_some() && legacy.is_some() {
            self.map.delete(legacy_key)?;
        }

        let resolved = resolve(namespaced, legacy);
        if resolved.migrate {
            if let Some(value) = resolved.value.as_deref() {
                self.map.set(&namespaced_key, value)?;
                self.map.delete(legacy_key)?;
                tracing::info!("Migrated legacy local entry '{}'", key);
            }
        }
        Ok(resolved.value)
    }

    pub fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let key = StorageKey::parse(key)?;
        if value.len() > self.max_value_bytes {
            return Err(StoreError::Validation(format!(
                "value is {} bytes, limit is {}",
                value.len(),
                self.max_value_bytes
            )));
        }
        self.map.set(&key.namespaced(&self.namespace), value)
    }

    pub fn remove(&self, key: &str) -> StoreResult<()> {
        let key = StorageKey::parse(key)?;
        self.map.delete(&key.namespaced(&self.namespace))?;
        if let Some(legacy_key) = key.legacy(&self.namespace) {
            self.map.delete(legacy_key)?;
        }
        Ok(())
    }

    /// 네임스페이스 항목만 삭제, 삭제 수 반환
    pub fn clear(&self) -> StoreResult<usize> {
        let mut removed = 0;
        for stored in self.map.keys()? {
            if strip_namespace(&self.namespace, &stored).is_some() && self.map.delete(&stored)? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}
