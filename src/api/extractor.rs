use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::error::BindingError;
use crate::logic::BoundArgs;

/// Axum extractor for the values resolved by the binding middleware.
///
/// Only usable on routes added through
/// [`BindingRouter::route`](crate::api::BindingRouter::route) whose handler has
/// binding metadata. Anywhere else it is a wiring defect and rejects the
/// request with a server error.
#[derive(Debug, Clone)]
pub struct Bound(pub BoundArgs);

#[async_trait]
impl<S> FromRequestParts<S> for Bound
where
    S: Send + Sync,
{
    type Rejection = BindingError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<BoundArgs>()
            .cloned()
            .map(Bound)
            .ok_or_else(|| BindingError::UnknownHandler(parts.uri.path().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[tokio::test]
    async fn test_missing_args_are_rejected() {
        let (mut parts, _) = Request::get("/posts/1").body(()).unwrap().into_parts();
        let err = Bound::from_request_parts(&mut parts, &()).await.unwrap_err();
        assert!(matches!(err, BindingError::UnknownHandler(ref path) if path == "/posts/1"));
        assert!(err.is_configuration());
    }
}
