//! Guessr Back binary entrypoint wiring the REST API, the geodata provider and storage.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::{Context, bail};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use guessr_back::{
    config::AppConfig,
    dao::{
        arena_store::{ArenaStore, memory::MemoryArenaStore},
        storage::StorageError,
    },
    geo::{GeoProvider, sampling::SamplingProvider},
    routes,
    services::storage_supervisor,
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let geo = build_geo_provider(&config)?;
    let app_state = AppState::new(config, geo);

    spawn_storage(app_state.clone())?;
    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    let port = env::var("PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Street View imagery when an API key is configured, offline sampling otherwise.
fn build_geo_provider(config: &AppConfig) -> anyhow::Result<Arc<dyn GeoProvider>> {
    #[cfg(feature = "streetview")]
    {
        use guessr_back::geo::streetview::{StreetViewConfig, StreetViewProvider};

        if let Some(street_view) = StreetViewConfig::from_env() {
            let provider =
                StreetViewProvider::new(street_view.with_max_attempts(config.geo_max_attempts))
                    .context("building Street View provider")?;
            info!("using Street View geodata provider");
            return Ok(Arc::new(provider));
        }
    }

    info!(
        max_attempts = config.geo_max_attempts,
        "no imagery provider configured; sampling landmass boxes offline"
    );
    Ok(Arc::new(SamplingProvider))
}

/// Start the storage supervisor for the backend selected by `STORE_BACKEND`.
fn spawn_storage(state: SharedState) -> anyhow::Result<()> {
    let backend = env::var("STORE_BACKEND").unwrap_or_else(|_| default_backend().into());
    match backend.as_str() {
        "memory" => {
            warn!("using the in-memory store; data is lost on restart");
            let store: Arc<dyn ArenaStore> = Arc::new(MemoryArenaStore::new());
            tokio::spawn(storage_supervisor::run(state, move || {
                let store = store.clone();
                async move { Ok::<_, StorageError>(store) }
            }));
        }
        #[cfg(feature = "rest-store")]
        "postgrest" => {
            use guessr_back::dao::arena_store::postgrest::{PostgrestArenaStore, PostgrestConfig};

            let config = PostgrestConfig::from_env().context("reading PostgREST settings")?;
            info!(url = %config.base_url, "using the PostgREST store");
            tokio::spawn(storage_supervisor::run(state, move || {
                let config = config.clone();
                async move {
                    PostgrestArenaStore::connect(config)
                        .await
                        .map(|store| Arc::new(store) as Arc<dyn ArenaStore>)
                        .map_err(StorageError::from)
                }
            }));
        }
        other => bail!("unsupported STORE_BACKEND `{other}`"),
    }
    Ok(())
}

fn default_backend() -> &'static str {
    if cfg!(feature = "rest-store") && env::var("POSTGREST_URL").is_ok() {
        "postgrest"
    } else {
        "memory"
    }
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler; waiting for Ctrl+C");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
