use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Probe the installed store and report whether the service runs degraded.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let mut healthy = false;
    match state.require_arena_store().await {
        Ok(store) => match store.health_check().await {
            Ok(()) => healthy = true,
            Err(err) => warn!(error = %err, "storage health check failed"),
        },
        Err(_) => warn!("storage unavailable (degraded mode)"),
    }

    let open_rounds = state.open_rounds().len();
    if healthy && !state.is_degraded() {
        HealthResponse::ok(open_rounds)
    } else {
        HealthResponse::degraded(open_rounds)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig, dao::arena_store::memory::MemoryArenaStore, geo::sampling::SamplingProvider,
        state::AppState,
    };

    #[tokio::test]
    async fn reports_degraded_until_a_store_is_installed() {
        let state = AppState::new(AppConfig::default(), Arc::new(SamplingProvider));
        assert_eq!(health_status(&state).await.status, "degraded");

        state
            .install_arena_store(Arc::new(MemoryArenaStore::new()))
            .await;
        let health = health_status(&state).await;
        assert_eq!(health.status, "ok");
        assert_eq!(health.open_rounds, 0);
    }
}
