//! Secure Store Error Types
//!
//! 저장소 전역 에러 타입 정의
//!
//! 복구 가능한 에러(`PrimaryUnavailable`, `DecryptionFailed`, `IndexCorrupted`)는
//! 내부에서 로그 후 처리되며, 호출자에게 노출되는 것은 `Validation`,
//! `StorageUnavailable` 및 인프라 에러뿐입니다.

use serde::Serialize;
use thiserror::Error;

/// 시크릿 저장소 에러
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Primary backend unavailable: {0}")]
    PrimaryUnavailable(String),

    #[error("Secure storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("Secure key index corrupted: {0}")]
    IndexCorrupted(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to acquire database lock: {0}")]
    Lock(String),
}

impl StoreError {
    /// 호출자에게 전달되는 안정적인 에러 코드
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::Validation(_) => "VALIDATION_ERROR",
            StoreError::PrimaryUnavailable(_) => "PRIMARY_UNAVAILABLE",
            StoreError::StorageUnavailable(_) => "STORAGE_UNAVAILABLE",
            StoreError::DecryptionFailed(_) => "DECRYPTION_FAILED",
            StoreError::IndexCorrupted(_) => "INDEX_CORRUPTED",
            StoreError::Database(_) => "DB_ERROR",
            StoreError::Io(_) => "IO_ERROR",
            StoreError::Serialization(_) => "SERIALIZATION_ERROR",
            StoreError::Lock(_) => "LOCK_ERROR",
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Tauri 명령 응답용 직렬화 가능한 에러
#[derive(Debug, Serialize)]
pub struct CommandError {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}

impl From<StoreError> for CommandError {
    fn from(error: StoreError) -> Self {
        CommandError {
            code: error.code().to_string(),
            message: error.to_string(),
            details: None,
        }
    }
}

/// Tauri 명령 결과 타입
pub type CommandResult<T> = Result<T, CommandError>;
