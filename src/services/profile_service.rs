//! Display names cached from the identity provider.

use std::collections::HashMap;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    dao::{arena_store::ArenaStore, models::ProfileEntity},
    error::ServiceError,
    state::SharedState,
};

const MAX_USERNAME_CHARS: usize = 40;

/// Record the caller's display name. Failures are logged and otherwise ignored.
pub async fn remember(state: &SharedState, user_id: Uuid, username: Option<&str>) {
    let Some(username) = username.map(str::trim).filter(|name| !name.is_empty()) else {
        return;
    };
    let Some(store) = state.arena_store().await else {
        return;
    };

    let username: String = username.chars().take(MAX_USERNAME_CHARS).collect();
    match store
        .save_profile(ProfileEntity {
            user_id,
            username: username.clone(),
        })
        .await
    {
        Ok(()) => debug!(%user_id, %username, "profile refreshed"),
        Err(err) => warn!(%user_id, error = %err, "failed to store profile"),
    }
}

/// Every known username keyed by user id.
pub async fn usernames(store: &dyn ArenaStore) -> Result<HashMap<Uuid, String>, ServiceError> {
    Ok(store
        .list_profiles()
        .await?
        .into_iter()
        .map(|profile| (profile.user_id, profile.username))
        .collect())
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
    async fn blank_names_are_not_stored() {
        let state = AppState::new(AppConfig::default(), Arc::new(SamplingProvider));
        let store = Arc::new(MemoryArenaStore::new());
        state.install_arena_store(store.clone()).await;

        let user = Uuid::new_v4();
        remember(&state, user, Some("   ")).await;
        assert!(usernames(store.as_ref()).await.unwrap().is_empty());

        remember(&state, user, Some(" marta ")).await;
        assert_eq!(
            usernames(store.as_ref()).await.unwrap().get(&user).map(String::as_str),
            Some("marta")
        );
    }
}
