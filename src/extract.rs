use crate::query::QueryMap;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use std::convert::Infallible;

/// Axum extractor handing the raw request query to the criteria compiler as
/// a [`QueryMap`]. Never rejects; a missing query string yields an empty map.
#[derive(Debug, Clone)]
pub struct ListQuery(pub QueryMap);

impl<S> FromRequestParts<S> for ListQuery
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(QueryMap::parse(parts.uri.query().unwrap_or(""))))
    }
}
