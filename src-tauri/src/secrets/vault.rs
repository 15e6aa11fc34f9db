//! Fallback Backend: 로컬 암호화 + 암호문 맵
//!
//! 암호문 포맷 (v1):
//! - magic: `ITESEC01` (8 bytes)
//! - nonce: 24 bytes (XChaCha20-Poly1305)
//! - ciphertext: AEAD 결과 (= 암호문 + 태그)
//!
//! AAD: magic을 AAD로 사용 (포맷 바인딩)
//!
//! 암호문은 base64로 인코딩되어 `secrets` 맵의 `<namespace>.<key>`에 저장됩니다.
//! 키 파일은 app_data_dir에 있으며, 다른 머신/세션으로 옮긴 암호문은 복호화되지 않습니다.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    Key, XChaCha20Poly1305, XNonce,
};
use rand::Rng;
use zeroize::{Zeroize, Zeroizing};

use crate::db::LocalMap;
use crate::error::{StoreError, StoreResult};
use crate::secrets::namespace::{resolve, Resolved, StorageKey};

/// 암호문 매직 (8 bytes)
pub const CIPHER_MAGIC: &[u8; 8] = b"ITESEC01";

/// 키 길이 (256-bit)
pub const KEY_LEN: usize = 32;

/// Nonce 길이 (XChaCha20-Poly1305용 24 bytes)
pub const NONCE_LEN: usize = 24;

/// 로컬 암호화 오류
#[derive(Debug, thiserror::Error)]
pub enum CipherError {
    #[error("Local encryption unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid ciphertext format: {0}")]
    InvalidFormat(String),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),
}

impl From<CipherError> for StoreError {
    fn from(err: CipherError) -> Self {
        match err {
            CipherError::Unavailable(msg) => StoreError::StorageUnavailable(msg),
            CipherError::InvalidFormat(msg) | CipherError::DecryptionFailed(msg) => {
                StoreError::DecryptionFailed(msg)
            }
            CipherError::EncryptionFailed(msg) => StoreError::StorageUnavailable(msg),
        }
    }
}

/// 동기 로컬 암호화 primitive (OS 세션에 묶임)
pub trait LocalCipher: Send + Sync {
    /// 현재 세션에서 사용 가능한지. 매 호출마다 다시 확인합니다.
    fn is_available(&self) -> bool;

    fn encrypt(&self, plaintext: &str) -> Result<Vec<u8>, CipherError>;

    fn decrypt(&self, ciphertext: &[u8]) -> Result<String, CipherError>;
}

/// 키 파일 기반 XChaCha20-Poly1305 cipher
pub struct KeyFileCipher {
    path: PathBuf,
}

impl KeyFileCipher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 키 파일 로드. 파일이 없으면 `None`.
    fn load_key(&self) -> Result<Option<Zeroizing<[u8; KEY_LEN]>>, CipherError> {
        match fs::read(&self.path) {
            Ok(mut bytes) => {
                if bytes.len() != KEY_LEN {
                    bytes.zeroize();
                    return Err(CipherError::Unavailable(format!(
                        "key file {} has invalid length",
                        self.path.display()
                    )));
                }
                let mut key = Zeroizing::new([0u8; KEY_LEN]);
                key.copy_from_slice(&bytes);
                bytes.zeroize();
                Ok(Some(key))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CipherError::Unavailable(format!(
                "cannot read key file {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    /// 키 파일 로드 (없으면 CSPRNG로 생성 후 저장). 암호화 경로에서만 사용.
    fn load_or_create_key(&self) -> Result<Zeroizing<[u8; KEY_LEN]>, CipherError> {
        if let Some(key) = self.load_key()? {
            return Ok(key);
        }
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        rand::thread_rng().fill(&mut key[..]);
        self.write_key(&key)
            .map_err(|e| CipherError::Unavailable(format!("cannot persist key: {}", e)))?;
        tracing::info!("Generated new local encryption key at {}", self.path.display());
        Ok(key)
    }

    /// Atomic write: 임시 파일에 쓰고 rename
    fn write_key(&self, key: &[u8; KEY_LEN]) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp_path = self.path.with_extension("key.tmp");

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(&tmp_path)?;
        file.write_all(key)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp_path, &self.path)
    }
}

impl LocalCipher for KeyFileCipher {
    /// 읽기 전용 확인: 키 파일이 없으면 첫 암호화 때 생성되므로 사용 가능으로 봄
    fn is_available(&self) -> bool {
        match self.load_key() {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!("Local encryption unavailable: {}", e);
                false
            }
        }
    }

    fn encrypt(&self, plaintext: &str) -> Result<Vec<u8>, CipherError> {
        let key = self.load_or_create_key()?;
        seal(&key, plaintext)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<String, CipherError> {
        let key = self.load_key()?.ok_or_else(|| {
            CipherError::DecryptionFailed(format!("key file {} is missing", self.path.display()))
        })?;
        open(&key, ciphertext)
    }
}

/// magic ‖ nonce ‖ AEAD(plaintext)
pub fn seal(key: &[u8; KEY_LEN], plaintext: &str) -> Result<Vec<u8>, CipherError> {
    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill(&mut nonce);

    let cipher = XChaCha20Poly1305::new(Key::from_slice(key));
    let ciphertext = cipher
        .encrypt(
            XNonce::from_slice(&nonce),
            Payload {
                msg: plaintext.as_bytes(),
                aad: CIPHER_MAGIC,
            },
        )
        .map_err(|e| CipherError::EncryptionFailed(e.to_string()))?;

    let mut out = Vec::with_capacity(CIPHER_MAGIC.len() + NONCE_LEN + ciphertext.len());
    out.extend_from_slice(CIPHER_MAGIC);
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

pub fn open(key: &[u8; KEY_LEN], envelope: &[u8]) -> Result<String, CipherError> {
    let header_len = CIPHER_MAGIC.len() + NONCE_LEN;
    if envelope.len() < header_len {
        return Err(CipherError::InvalidFormat("ciphertext too short".to_string()));
    }
    let (magic, rest) = envelope.split_at(CIPHER_MAGIC.len());
    if magic != CIPHER_MAGIC {
        return Err(CipherError::InvalidFormat("invalid magic".to_string()));
    }
    let (nonce, ciphertext) = rest.split_at(NONCE_LEN);

    let cipher = XChaCha20Poly1305::new(Key::from_slice(key));
    let mut plaintext = cipher
        .decrypt(
            XNonce::from_slice(nonce),
            Payload {
                msg: ciphertext,
                aad: CIPHER_MAGIC,
            },
        )
        .map_err(|e| CipherError::DecryptionFailed(e.to_string()))?;

    let value = String::from_utf8(plaintext.clone())
        .map_err(|_| CipherError::DecryptionFailed("plaintext is not UTF-8".to_string()));
    // 평문 메모리 지우기
    plaintext.zeroize();
    value
}

/// fallback 맵에서 읽은 해석 결과
#[derive(Debug)]
pub struct FallbackRead {
    pub value: Option<String>,
    pub migrated: bool,
}

/// 로컬 cipher + 암호문 맵
pub struct FallbackBackend {
    cipher: Box<dyn LocalCipher>,
    map: LocalMap,
    namespace: String,
}

impl FallbackBackend {
    pub fn new(cipher: Box<dyn LocalCipher>, map: LocalMap, namespace: impl Into<String>) -> Self {
        Self {
            cipher,
            map,
            namespace: namespace.into(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.cipher.is_available()
    }

    /// 네임스페이스/legacy 암호문을 읽고 해석 후 복호화.
    ///
    /// 복호화 실패는 에러가 아니라 miss로 취급합니다 (로그만 남김).
    /// legacy 값이 복호화되면 네임스페이스 키로 다시 쓰고 legacy 항목을 지웁니다.
    pub fn read(&self, key: &StorageKey) -> StoreResult<FallbackRead> {
        let namespaced_key = key.namespaced(&self.namespace);
        let legacy_key = key.legacy(&self.namespace);
        let namespaced = self.map.get(&namespaced_key)?;
        let legacy = match legacy_key {
            Some(legacy_key) => self.map.get(legacy_key)?,
            None => None,
        };
        if let (Some(_), Some(_), Some(legacy_key)) = (&namespaced, &legacy, legacy_key) {
            // 네임스페이스 값이 우선이므로 legacy 항목은 더 이상 읽히지 않음
            self.map.delete(legacy_key)?;
        }

        let Resolved { value, migrate } = resolve(namespaced, legacy);
        let Some(encoded) = value else {
            return Ok(FallbackRead {
                value: None,
                migrated: false,
            });
        };

        let plaintext = match self.decode_and_decrypt(&encoded) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("Fallback value for '{}' could not be decrypted: {}", key, e);
                return Ok(FallbackRead {
                    value: None,
                    migrated: false,
                });
            }
        };

        if let (true, Some(legacy_key)) = (migrate, legacy_key) {
            // 같은 세션 키로 복호화되었으므로 암호문을 그대로 옮김
            self.map.set(&namespaced_key, &encoded)?;
            self.map.delete(legacy_key)?;
            tracing::info!("Migrated legacy fallback entry '{}'", key);
        }

        Ok(FallbackRead {
            value: Some(plaintext),
            migrated: migrate,
        })
    }

    /// 암호화 후 네임스페이스 키로 저장
    pub fn write(&self, key: &StorageKey, value: &str) -> StoreResult<()> {
        if !self.cipher.is_available() {
            return Err(StoreError::StorageUnavailable(
                "local encryption is not available in this session".to_string(),
            ));
        }
        let ciphertext = self.cipher.encrypt(value)?;
        self.map
            .set(&key.namespaced(&self.namespace), &BASE64.encode(ciphertext))
    }

    /// 네임스페이스 + legacy 항목 삭제
    pub fn delete_pair(&self, key: &StorageKey) -> StoreResult<()> {
        self.map.delete(&key.namespaced(&self.namespace))?;
        if let Some(legacy_key) = key.legacy(&self.namespace) {
            self.map.delete(legacy_key)?;
        }
        Ok(())
    }

    /// 맵 전체 삭제 (인덱스와 무관하게)
    pub fn wipe(&self) -> StoreResult<usize> {
        self.map.clear()
    }

    fn decode_and_decrypt(&self, encoded: &str) -> Result<String, CipherError> {
        let bytes = BASE64
            .decode(encoded)
            .map_err(|e| CipherError::InvalidFormat(format!("invalid base64: {}", e)))?;
        self.cipher.decrypt(&bytes)
    }
}
