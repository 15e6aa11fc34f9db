//! Secure Key Index
//!
//! 시크릿 저장소에 현재 존재하는 키 집합. 백엔드가 열거를 지원하지 않으므로
//! "전체 삭제"는 이 인덱스를 기준으로 동작합니다.
//!
//! 일반 로컬 맵의 예약 키 아래에 정렬된 JSON 배열로 저장됩니다.

use std::collections::BTreeSet;

use crate::db::LocalMap;
use crate::error::{StoreError, StoreResult};
use crate::secrets::namespace::{is_valid_storage_key, StorageKey};

pub struct SecureKeyIndex {
    map: LocalMap,
    reserved_key: String,
}

impl SecureKeyIndex {
    pub fn new(map: LocalMap, reserved_key: impl Into<String>) -> Self {
        Self {
            map,
            reserved_key: reserved_key.into(),
        }
    }

    /// 추적 중인 키 집합.
    ///
    /// 유효하지 않은 항목은 조용히 버립니다. 배열로 파싱되지 않으면 빈 집합으로 취급하고
    /// 손상된 값을 삭제합니다.
    pub fn read(&self) -> StoreResult<BTreeSet<StorageKey>> {
        let Some(raw) = self.map.get(&self.reserved_key)? else {
            return Ok(BTreeSet::new());
        };

        match parse_index(&raw) {
            Ok(keys) => Ok(keys),
            Err(e) => {
                tracing::warn!("{}; resetting secure key index", e);
                self.map.delete(&self.reserved_key)?;
                Ok(BTreeSet::new())
            }
        }
    }

    /// 비어 있으면 예약 키 자체를 삭제, 아니면 정렬된 배열 저장
    pub fn write(&self, keys: &BTreeSet<StorageKey>) -> StoreResult<()> {
        if keys.is_empty() {
            self.map.delete(&self.reserved_key)?;
            return Ok(());
        }
        let sorted: Vec<&str> = keys.iter().map(StorageKey::as_str).collect();
        self.map
            .set(&self.reserved_key, &serde_json::to_string(&sorted)?)
    }

    pub fn add(&self, key: &StorageKey) -> StoreResult<()> {
        let mut keys = self.read()?;
        if keys.insert(key.clone()) {
            self.write(&keys)?;
        }
        Ok(())
    }

    pub fn remove(&self, key: &StorageKey) -> StoreResult<()> {
        let mut keys = self.read()?;
        if keys.remove(key) {
            self.write(&keys)?;
        }
        Ok(())
    }

    pub fn reset(&self) -> StoreResult<()> {
        self.write(&BTreeSet::new())
    }
}

fn parse_index(raw: &str) -> StoreResult<BTreeSet<StorageKey>> {
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| StoreError::IndexCorrupted(format!("not valid JSON: {}", e)))?;
    let serde_json::Value::Array(items) = value else {
        return Err(StoreError::IndexCorrupted("not a JSON array".to_string()));
    };

    Ok(items
        .iter()
        .filter_map(|item| item.as_str())
        .filter(|s| is_valid_storage_key(s))
        .filter_map(|s| StorageKey::parse(s).ok())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory_maps;

    const INDEX_KEY: &str = "@secure-store/index";

    fn key(s: &str) -> StorageKey {
        StorageKey::parse(s).unwrap()
    }

    #[test]
    fn test_add_remove_persists_sorted() {
        let (local, _) = open_in_memory_maps().unwrap();
        let index = SecureKeyIndex::new(local.clone(), INDEX_KEY);

        index.add(&key("b")).unwrap();
        index.add(&key("a")).unwrap();
        index.add(&key("a")).unwrap();
        assert_eq!(local.get(INDEX_KEY).unwrap().as_deref(), Some(r#"["a","b"]"#));

        index.remove(&key("a")).unwrap();
        index.remove(&key("missing")).unwrap();
        assert_eq!(local.get(INDEX_KEY).unwrap().as_deref(), Some(r#"["b"]"#));
    }

    #[test]
    fn test_empty_index_deletes_reserved_key() {
        let (local, _) = open_in_memory_maps().unwrap();
        let index = SecureKeyIndex::new(local.clone(), INDEX_KEY);

        index.add(&key("only")).unwrap();
        index.remove(&key("only")).unwrap();
        assert!(local.get(INDEX_KEY).unwrap().is_none());
    }

    #[test]
    fn test_corrupt_index_self_heals() {
        let (local, _) = open_in_memory_maps().unwrap();
        let index = SecureKeyIndex::new(local.clone(), INDEX_KEY);

        for corrupt in ["{not json", r#"{"a":1}"#, "42"] {
            local.set(INDEX_KEY, corrupt).unwrap();
            assert!(index.read().unwrap().is_empty());
            assert!(local.get(INDEX_KEY).unwrap().is_none());
        }
    }

    #[test]
    fn test_invalid_entries_dropped() {
        let (local, _) = open_in_memory_maps().unwrap();
        let index = SecureKeyIndex::new(local.clone(), INDEX_KEY);
        local
            .set(INDEX_KEY, r#"["ok", "../etc/passwd", 7, "", "also.ok"]"#)
            .unwrap();

        let keys: Vec<String> = index.read().unwrap().iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["also.ok".to_string(), "ok".to_string()]);
        // 유효한 배열이므로 저장값은 그대로 둠
        assert!(local.get(INDEX_KEY).unwrap().is_some());
    }
}
