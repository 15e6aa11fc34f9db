//! 로깅 초기화

use tracing_subscriber::EnvFilter;

/// `RUST_LOG` 기반 fmt subscriber 설치 (중복 호출 시 무시)
pub fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .compact()
        .try_init();
}
