use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::{HeaderMap, request::Parts},
};
use uuid::Uuid;

use crate::error::AppError;

const USER_ID_HEADER: &str = "x-user-id";
const USER_NAME_HEADER: &str = "x-user-name";

/// Caller identity forwarded by the auth proxy in request headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Value of `X-User-Id`.
    pub user_id: Uuid,
    /// Value of `X-User-Name`, when sent.
    pub username: Option<String>,
}

impl Identity {
    fn from_headers(headers: &HeaderMap) -> Result<Option<Self>, AppError> {
        let Some(raw) = headers.get(USER_ID_HEADER) else {
            return Ok(None);
        };
        let user_id = raw
            .to_str()
            .ok()
            .and_then(|value| Uuid::parse_str(value.trim()).ok())
            .ok_or_else(|| AppError::Unauthorized("malformed `X-User-Id` header".into()))?;
        let username = headers
            .get(USER_NAME_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        Ok(Some(Self { user_id, username }))
    }
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::from_headers(&parts.headers)?
            .ok_or_else(|| AppError::Unauthorized("missing `X-User-Id` header".into()))
    }
}

impl<S> OptionalFromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Self::from_headers(&parts.headers)
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn identity_comes_from_headers() {
        let user_id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        assert_eq!(Identity::from_headers(&headers).unwrap(), None);

        headers.insert(
            USER_ID_HEADER,
            HeaderValue::from_str(&user_id.to_string()).unwrap(),
        );
        headers.insert(USER_NAME_HEADER, HeaderValue::from_static("mira"));
        let identity = Identity::from_headers(&headers).unwrap().unwrap();
        assert_eq!(identity.user_id, user_id);
        assert_eq!(identity.username.as_deref(), Some("mira"));

        headers.insert(USER_ID_HEADER, HeaderValue::from_static("not-a-uuid"));
        assert!(Identity::from_headers(&headers).is_err());
    }
}
