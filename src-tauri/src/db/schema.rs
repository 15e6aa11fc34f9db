//! Database Schema
//!
//! SQLite 테이블 스키마 정의

/// 로컬 key-value 맵 이름: 일반 저장소 + Secure Key Index
pub const LOCAL_MAP: &str = "local";

/// 로컬 key-value 맵 이름: fallback 시크릿 암호문
pub const SECRETS_MAP: &str = "secrets";

/// 데이터베이스 스키마 생성 SQL
pub const CREATE_SCHEMA: &str = r#"
-- 이름 있는 key-value 맵 (map = 'local' | 'secrets')
CREATE TABLE IF NOT EXISTS kv_entries (
    map TEXT NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
    PRIMARY KEY (map, key)
);

CREATE INDEX IF NOT EXISTS idx_kv_entries_map ON kv_entries(map);
"#;
