pub mod category;
pub mod comment;
pub mod genre;
mod macros;
pub mod paging;
pub mod review;
pub mod title;

use axum::extract::{rejection::PathRejection, FromRequestParts, Path};
use garde::Validate;
use http::request::Parts;
use serde::{de::DeserializeOwned, Deserialize};
use tracing::debug;

use crate::{error::ApiError, state::AppState};

pub use paging::{Page, Paging};

/// `search` query parameter, case insensitive substring match.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct Search {
    #[garde(length(max = 255))]
    search: Option<String>,
}

impl Search {
    pub fn term(&self) -> Option<&str> {
        self.search.as_deref().filter(|s| !s.is_empty())
    }
}

/// Numeric object ids from the path. A segment that is not an id matches no object.
#[derive(Debug, Clone, Copy)]
pub struct Ids<T>(pub T);

impl<T, S> FromRequestParts<S> for Ids<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(ids)) => Ok(Ids(ids)),
            Err(PathRejection::FailedToDeserializePathParams(e)) => {
                debug!("Invalid id in {}: {}", parts.uri.path(), e.body_text());
                Err(ApiError::NotFound("Record".to_string()))
            }
            Err(e) => Err(ApiError::InternalError(anyhow::anyhow!(e.body_text()))),
        }
    }
}

/// Catalog routes: categories, genres, titles with their reviews and comments.
pub fn api_router() -> axum::Router<AppState> {
    axum::Router::new()
        .nest("/categories", category::router())
        .nest("/genres", genre::router())
        .nest("/titles", title::router())
        .nest("/titles/{title_id}/reviews", review::router())
        .nest(
            "/titles/{title_id}/reviews/{review_id}/comments",
            comment::router(),
        )
}
