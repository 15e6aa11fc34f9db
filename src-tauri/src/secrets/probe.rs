//! Capability Probe
//!
//! Primary backend(OS 키체인) 사용 가능 여부를 저장소 인스턴스당 1회만 확인하고 결과를 캐시합니다.
//! 실패도 캐시되며 자동으로 재시도하지 않습니다 (sticky failure).

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::secrets::keychain::{CredentialVault, VaultConnector};

/// Primary backend 상태
#[derive(Clone)]
pub enum BackendState {
    NotProbed,
    Available(Arc<dyn CredentialVault>),
    Unavailable(String),
}

impl BackendState {
    pub fn label(&self) -> &'static str {
        match self {
            BackendState::NotProbed => "not_probed",
            BackendState::Available(_) => "available",
            BackendState::Unavailable(_) => "unavailable",
        }
    }
}

impl std::fmt::Debug for BackendState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendState::NotProbed => f.write_str("NotProbed"),
            BackendState::Available(_) => f.write_str("Available(..)"),
            BackendState::Unavailable(reason) => f.debug_tuple("Unavailable").field(reason).finish(),
        }
    }
}

pub struct CapabilityProbe {
    connector: Box<dyn VaultConnector>,
    state: RwLock<BackendState>,
}

impl CapabilityProbe {
    pub fn new(connector: Box<dyn VaultConnector>) -> Self {
        Self {
            connector,
            state: RwLock::new(BackendState::NotProbed),
        }
    }

    /// 최초 호출 시에만 연결을 시도하고, 이후에는 캐시된 상태를 반환합니다.
    ///
    /// 동시에 두 번 probe가 일어나도 같은 capability를 분류하므로 먼저 쓴 쪽을 유지합니다.
    pub async fn probe_primary(&self) -> BackendState {
        {
            let state = self.state.read().await;
            if !matches!(*state, BackendState::NotProbed) {
                return (*state).clone();
            }
        }

        let probed = match self.connector.connect().await {
            Ok(vault) => {
                tracing::info!("OS keychain available, using it as primary secret backend");
                BackendState::Available(vault)
            }
            Err(e) => {
                tracing::warn!("OS keychain unavailable: {}", e);
                BackendState::Unavailable(e.to_string())
            }
        };

        let mut state = self.state.write().await;
        if matches!(*state, BackendState::NotProbed) {
            *state = probed;
        }
        (*state).clone()
    }

    /// 현재 상태 스냅샷 (probe하지 않음)
    pub async fn state(&self) -> BackendState {
        (*self.state.read().await).clone()
    }

    /// 사용 가능한 primary vault 핸들
    pub async fn primary(&self) -> Option<Arc<dyn CredentialVault>> {
        match self.probe_primary().await {
            BackendState::Available(vault) => Some(vault),
            _ => None,
        }
    }
}
