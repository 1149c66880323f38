use serde::Serialize;
use utoipa::ToSchema;

/// Health payload returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// "ok" when a store is installed and answering, "degraded" otherwise.
    pub status: String,
    /// Round clocks currently running in this process.
    pub open_rounds: usize,
}

impl HealthResponse {
    pub fn ok(open_rounds: usize) -> Self {
        Self {
            status: "ok".to_string(),
            open_rounds,
        }
    }

    pub fn degraded(open_rounds: usize) -> Self {
        Self {
            status: "degraded".to_string(),
            open_rounds,
        }
    }
}
