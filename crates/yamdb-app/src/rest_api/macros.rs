/// Handlers and router for a name + slug lookup resource.
#[macro_export]
macro_rules! lookup_api {
    ($repository:ty, $create_type:ty) => {
        $crate::repository_from_request!($repository);

        pub mod crud_api {
            use super::*;
            use $crate::error::ApiResult;
            use $crate::rest_api::{Page, Paging, Search};
            use $crate::state::AppState;
            use $crate::validate::Garde;
            use axum::{
                extract::{OriginalUri, Path, Query, State},
                response::IntoResponse,
                Json,
            };
            use http::StatusCode;

            pub async fn list(
                repository: $repository,
                State(state): State<AppState>,
                OriginalUri(uri): OriginalUri,
                Garde(Query(paging)): Garde<Query<Paging>>,
                Garde(Query(search)): Garde<Query<Search>>,
            ) -> ApiResult<impl IntoResponse> {
                let listing_params = paging.into_listing_params(state.config().default_page_size);
                let batch = repository
                    .list(listing_params, search.term())
                    .await?;
                Ok((StatusCode::OK, Json(Page::from_batch(batch, &state, &uri)?)))
            }

            pub async fn create(
                repository: $repository,
                Garde(Json(payload)): Garde<Json<$create_type>>,
            ) -> ApiResult<impl IntoResponse> {
                let record = repository.create(payload).await?;

                Ok((StatusCode::CREATED, Json(record)))
            }

            pub async fn delete(
                Path(slug): Path<String>,
                repository: $repository,
            ) -> ApiResult<impl IntoResponse> {
                repository.delete_by_slug(&slug).await?;

                Ok((StatusCode::NO_CONTENT, ()))
            }
        }

        pub fn router() -> axum::Router<$crate::state::AppState> {
            use $crate::permissions::{PermissionLayer, Policy};
            use axum::routing::{delete, get};
            axum::Router::new()
                .route("/", get(crud_api::list).post(crud_api::create))
                .route("/{slug}", delete(crud_api::delete))
                .route_layer(PermissionLayer::new(Policy::AdminOrReadOnly))
        }
    };
}
