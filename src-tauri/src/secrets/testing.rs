//! 테스트용 가짜 collaborator

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::secrets::keychain::{CredentialVault, VaultConnector, VaultError};
use crate::secrets::vault::{CipherError, KeyFileCipher, LocalCipher};

/// 공유 호출 카운터
#[derive(Clone, Default)]
pub struct Counter(Arc<AtomicUsize>);

impl Counter {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct FakeVaultInner {
    accounts: Mutex<HashMap<String, String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    fail_deletes: AtomicBool,
    enumerable: AtomicBool,
}

/// 메모리 기반 vault. clone은 같은 계정 맵을 공유합니다.
#[derive(Clone, Default)]
pub struct FakeVault {
    inner: Arc<FakeVaultInner>,
}

impl FakeVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// `list_secrets` 지원
    pub fn enumerable() -> Self {
        let vault = Self::default();
        vault.inner.enumerable.store(true, Ordering::SeqCst);
        vault
    }

    pub fn fail_reads(&self, fail: bool) {
        self.inner.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.inner.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn insert(&self, account: &str, value: &str) {
        self.accounts().insert(account.to_string(), value.to_string());
    }

    pub fn account(&self, account: &str) -> Option<String> {
        self.accounts().get(account).cloned()
    }

    pub fn account_count(&self) -> usize {
        self.accounts().len()
    }

    fn accounts(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.inner.accounts.lock().unwrap()
    }

    fn check(flag: &AtomicBool, op: &str) -> Result<(), VaultError> {
        if flag.load(Ordering::SeqCst) {
            Err(VaultError::Platform(format!("simulated {} failure", op)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CredentialVault for FakeVault {
    async fn get_secret(&self, account: &str) -> Result<Option<String>, VaultError> {
        Self::check(&self.inner.fail_reads, "read")?;
        Ok(self.account(account))
    }

    async fn set_secret(&self, account: &str, value: &str) -> Result<(), VaultError> {
        Self::check(&self.inner.fail_writes, "write")?;
        self.insert(account, value);
        Ok(())
    }

    async fn delete_secret(&self, account: &str) -> Result<bool, VaultError> {
        Self::check(&self.inner.fail_deletes, "delete")?;
        Ok(self.accounts().remove(account).is_some())
    }

    async fn list_secrets(&self) -> Result<Option<Vec<(String, String)>>, VaultError> {
        if !self.inner.enumerable.load(Ordering::SeqCst) {
            return Ok(None);
        }
        Self::check(&self.inner.fail_reads, "list")?;
        Ok(Some(
            self.accounts()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        ))
    }
}

/// 고정된 결과를 돌려주는 connector
pub struct FakeConnector {
    result: Result<FakeVault, String>,
    attempts: Counter,
}

impl FakeConnector {
    pub fn available(vault: FakeVault) -> Self {
        Self {
            result: Ok(vault),
            attempts: Counter::default(),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            result: Err(reason.to_string()),
            attempts: Counter::default(),
        }
    }

    pub fn attempts(&self) -> Counter {
        self.attempts.clone()
    }
}

#[async_trait]
impl VaultConnector for FakeConnector {
    async fn connect(&self) -> Result<Arc<dyn CredentialVault>, VaultError> {
        self.attempts.bump();
        match &self.result {
            Ok(vault) => Ok(Arc::new(vault.clone())),
            Err(reason) => Err(VaultError::Unavailable(reason.clone())),
        }
    }
}

/// 실제 키 파일 cipher + 가용성 스위치 (세션 잠금 흉내)
pub struct SwitchCipher {
    inner: KeyFileCipher,
    available: Arc<AtomicBool>,
}

impl SwitchCipher {
    pub fn new(dir: &Path) -> Self {
        Self {
            inner: KeyFileCipher::new(dir.join("session.key")),
            available: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn switch(&self) -> Arc<AtomicBool> {
        self.available.clone()
    }

    fn ensure(&self) -> Result<(), CipherError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CipherError::Unavailable("session locked".to_string()))
        }
    }
}

impl LocalCipher for SwitchCipher {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst) && self.inner.is_available()
    }

    fn encrypt(&self, plaintext: &str) -> Result<Vec<u8>, CipherError> {
        self.ensure()?;
        self.inner.encrypt(plaintext)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<String, CipherError> {
        self.ensure()?;
        self.inner.decrypt(ciphertext)
    }
}
