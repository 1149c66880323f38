pub mod match_progress;
pub mod round_clock;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{RwLock, watch};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dao::arena_store::ArenaStore,
    error::ServiceError,
    geo::{GeoProvider, RegionBounds},
    scoring::ScoringMode,
};

use self::round_clock::OpenRounds;

pub type SharedState = Arc<AppState>;

/// Target area and scoring formula of one match, resolved once from its game mode.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchSetup {
    pub bounds: RegionBounds,
    pub mode: ScoringMode,
}

/// Central application state: the installed store, gameplay settings and in-process caches.
pub struct AppState {
    arena_store: RwLock<Option<Arc<dyn ArenaStore>>>,
    degraded: watch::Sender<bool>,
    config: AppConfig,
    geo: Arc<dyn GeoProvider>,
    open_rounds: OpenRounds,
    match_setups: DashMap<Uuid, MatchSetup>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig, geo: Arc<dyn GeoProvider>) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            arena_store: RwLock::new(None),
            degraded: degraded_tx,
            config,
            geo,
            open_rounds: OpenRounds::default(),
            match_setups: DashMap::new(),
        })
    }

    /// Obtain a handle to the current store, if one is installed.
    pub async fn arena_store(&self) -> Option<Arc<dyn ArenaStore>> {
        let guard = self.arena_store.read().await;
        guard.as_ref().cloned()
    }

    /// Current store or [`ServiceError::Degraded`].
    pub async fn require_arena_store(&self) -> Result<Arc<dyn ArenaStore>, ServiceError> {
        self.arena_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new store implementation and leave degraded mode.
    pub async fn install_arena_store(&self, store: Arc<dyn ArenaStore>) {
        {
            let mut guard = self.arena_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current store and enter degraded mode.
    pub async fn clear_arena_store(&self) {
        {
            let mut guard = self.arena_store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub(crate) fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Provider used to draw new targets.
    pub fn geo(&self) -> Arc<dyn GeoProvider> {
        self.geo.clone()
    }

    /// Rounds currently shown to players, with their clocks.
    pub fn open_rounds(&self) -> &OpenRounds {
        &self.open_rounds
    }

    /// Per-match target area and scoring formula.
    pub fn match_setups(&self) -> &DashMap<Uuid, MatchSetup> {
        &self.match_setups
    }
}
