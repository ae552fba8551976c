use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap, StatusCode},
};
use log::debug;

use crate::model::UserContext;

/// Axum extractor for the acting administrator
///
/// Reads the identity forwarded by the front proxy:
/// - X-User-Id: user identifier, also the key for pending notices
/// - X-User-Email: optional email
/// - X-User-Name: optional display name used in audit lines
///
/// Requests without an id act as the development admin.
#[async_trait]
impl<S> FromRequestParts<S> for UserContext
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let headers = &parts.headers;

        match header_value(headers, "x-user-id") {
            Some(user_id) => Ok(UserContext::with_details(
                user_id,
                header_value(headers, "x-user-email"),
                header_value(headers, "x-user-name"),
            )),
            None => {
                debug!("No X-User-Id header, acting as the development admin");
                Ok(UserContext::default_user())
            }
        }
    }
}

/// Trimmed header value; blank or non-ASCII values count as absent
fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
