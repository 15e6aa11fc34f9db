//! ITE Secure Store - Tauri Backend Library
//!
//! 데스크톱 앱의 민감한 문자열 값(인증 토큰, 자격 증명)을 저장합니다.
//!
//! - Primary: OS 키체인/키링 (`keyring`)
//! - Fallback: 로컬 XChaCha20-Poly1305 암호화 + SQLite 암호문 맵
//! - 키 네임스페이스 + 네임스페이스 이전 데이터의 1회 마이그레이션
//! - Secure Key Index로 열거 불가능한 백엔드에서도 전체 삭제 보장
//!
//! Tauri 명령 레이어는 `tauri` feature로 활성화합니다.

#[cfg(feature = "tauri")]
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod observability;
pub mod secrets;
pub mod storage;

pub use config::SecretStoreConfig;
pub use error::{CommandError, CommandResult, StoreError, StoreResult};
pub use secrets::SecretStore;
pub use storage::LocalStore;
