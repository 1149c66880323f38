//! Error types shared by the PostgREST storage implementation.

use reqwest::StatusCode;
use thiserror::Error;

/// Convenient result alias returning [`PostgrestDaoError`] failures.
pub type PostgrestResult<T> = Result<T, PostgrestDaoError>;

/// Failures that can occur while talking to PostgREST.
#[derive(Debug, Error)]
pub enum PostgrestDaoError {
    /// Required environment variable is missing.
    #[error("missing PostgREST environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    /// Building the HTTP client failed (invalid TLS setup, etc).
    #[error("failed to build PostgREST client")]
    ClientBuilder {
        #[source]
        source: reqwest::Error,
    },
    /// A request could not be sent.
    #[error("failed to send PostgREST request to `{path}`")]
    RequestSend {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// PostgREST answered with an unexpected status code.
    #[error("unexpected PostgREST response status {status} for `{path}`: {body}")]
    RequestStatus {
        path: String,
        status: StatusCode,
        body: String,
    },
    /// Response payload could not be parsed into JSON.
    #[error("failed to decode PostgREST response for `{path}`")]
    DecodeResponse {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// A stored row holds a value the domain model cannot represent.
    #[error("invalid `{field}` value in `{table}`: {value}")]
    InvalidRow {
        table: &'static str,
        field: &'static str,
        value: String,
    },
}
