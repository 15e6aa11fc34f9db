//! Database Module
//!
//! SQLite 기반 로컬 key-value 저장소.
//! 일반 저장소, Secure Key Index, fallback 암호문이 모두 같은 파일의 이름 있는 맵에 저장됩니다.

mod schema;

pub use schema::{LOCAL_MAP, SECRETS_MAP};

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::{Connection, OptionalExtension};

use crate::error::{StoreError, StoreResult};

/// 데이터베이스 래퍼
pub struct Database {
    conn: Connection,
}

impl Database {
    /// 새 데이터베이스 연결 생성 (파일이 없으면 생성)
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    /// 메모리 DB (테스트 및 임시 사용)
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// 데이터베이스 스키마 초기화
    pub fn initialize(&self) -> StoreResult<()> {
        self.conn.execute_batch(schema::CREATE_SCHEMA)?;
        Ok(())
    }

    pub fn get(&self, map: &str, key: &str) -> StoreResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_entries WHERE map = ?1 AND key = ?2",
                (map, key),
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// upsert
    pub fn set(&self, map: &str, key: &str, value: &str) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO kv_entries (map, key, value, updated_at)
             VALUES (?1, ?2, ?3, strftime('%s', 'now'))
             ON CONFLICT(map, key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            (map, key, value),
        )?;
        Ok(())
    }

    /// 삭제된 행이 있었는지 반환
    pub fn delete(&self, map: &str, key: &str) -> StoreResult<bool> {
        let removed = self.conn.execute(
            "DELETE FROM kv_entries WHERE map = ?1 AND key = ?2",
            (map, key),
        )?;
        Ok(removed > 0)
    }

    pub fn keys(&self, map: &str) -> StoreResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key FROM kv_entries WHERE map = ?1 ORDER BY key")?;
        let iter = stmt.query_map([map], |row| row.get::<_, String>(0))?;
        let mut keys = Vec::new();
        for key in iter {
            keys.push(key?);
        }
        Ok(keys)
    }

    /// 맵 전체 삭제, 삭제된 행 수 반환
    pub fn clear_map(&self, map: &str) -> StoreResult<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM kv_entries WHERE map = ?1", [map])?;
        Ok(removed)
    }
}

/// 여러 맵 핸들이 공유하는 DB
pub type SharedDatabase = Arc<Mutex<Database>>;

/// 하나의 이름 있는 맵에 대한 핸들 (clone 비용 낮음)
#[derive(Clone)]
pub struct LocalMap {
    db: SharedDatabase,
    map: &'static str,
}

impl LocalMap {
    pub fn new(db: SharedDatabase, map: &'static str) -> Self {
        Self { db, map }
    }

    fn with_db<T>(&self, f: impl FnOnce(&Database) -> StoreResult<T>) -> StoreResult<T> {
        let db = self
            .db
            .lock()
            .map_err(|e| StoreError::Lock(e.to_string()))?;
        f(&db)
    }

    pub fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.with_db(|db| db.get(self.map, key))
    }

    pub fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.with_db(|db| db.set(self.map, key, value))
    }

    pub fn delete(&self, key: &str) -> StoreResult<bool> {
        self.with_db(|db| db.delete(self.map, key))
    }

    pub fn keys(&self) -> StoreResult<Vec<String>> {
        self.with_db(|db| db.keys(self.map))
    }

    pub fn clear(&self) -> StoreResult<usize> {
        self.with_db(|db| db.clear_map(self.map))
    }
}

/// DB를 열고 스키마를 초기화한 뒤 (local, secrets) 맵 핸들을 반환
pub fn open_maps(path: &Path) -> StoreResult<(LocalMap, LocalMap)> {
    let db = Database::open(path)?;
    db.initialize()?;
    Ok(split_maps(Arc::new(Mutex::new(db))))
}

/// 메모리 DB 기반 (local, secrets) 맵 핸들
pub fn open_in_memory_maps() -> StoreResult<(LocalMap, LocalMap)> {
    let db = Database::open_in_memory()?;
    db.initialize()?;
    Ok(split_maps(Arc::new(Mutex::new(db))))
}

fn split_maps(db: SharedDatabase) -> (LocalMap, LocalMap) {
    (
        LocalMap::new(db.clone(), LOCAL_MAP),
        LocalMap::new(db, SECRETS_MAP),
    )
}
