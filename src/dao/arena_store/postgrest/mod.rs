//! PostgREST-backed [`ArenaStore`](super::ArenaStore): tables under `/rest/v1/<table>` and the
//! atomic procedures under `/rest/v1/rpc/<procedure>`.

mod config;
mod error;
mod models;
mod store;

pub use config::PostgrestConfig;
pub use error::PostgrestDaoError;
pub use store::PostgrestArenaStore;

use crate::dao::storage::StorageError;

impl From<PostgrestDaoError> for StorageError {
    fn from(err: PostgrestDaoError) -> Self {
        if matches!(
            &err,
            PostgrestDaoError::RequestStatus { status, .. } if status.is_client_error()
        ) {
            StorageError::rejected(err.to_string())
        } else {
            StorageError::unavailable(err.to_string(), err)
        }
    }
}
