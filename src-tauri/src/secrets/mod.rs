//! Secret Store 모듈
//!
//! OS 키체인(primary)과 로컬 암호화 저장소(fallback)를 하나의 계약으로 묶습니다.
//!
//! - 키는 `<namespace>.<key>`로 저장, 네임스페이스 이전 bare 키는 첫 읽기 시 마이그레이션
//! - 키체인 사용 가능 여부는 인스턴스당 1회 probe (실패도 캐시)
//! - 키체인이 열거를 지원하지 않으므로 Secure Key Index로 전체 삭제를 보장

pub mod index;
pub mod keychain;
pub mod namespace;
pub mod probe;
pub mod store;
pub mod vault;

#[cfg(test)]
pub(crate) mod testing;

pub use index::SecureKeyIndex;
pub use keychain::{CredentialVault, KeyringConnector, KeyringVault, VaultConnector, VaultError};
pub use namespace::{is_valid_storage_key, StorageKey};
pub use probe::{BackendState, CapabilityProbe};
pub use store::{BackendStatus, SecretStore};
pub use vault::{CipherError, FallbackBackend, KeyFileCipher, LocalCipher};
