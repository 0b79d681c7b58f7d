use axum::{
    extract::{OriginalUri, Query, State},
    response::IntoResponse,
    routing::get,
    Json,
};
use http::StatusCode;
use yamdb_dal::title::{CreateTitle, TitleFilter, TitleRepository, UpdateTitle};

use crate::{
    error::ApiResult,
    permissions::{PermissionLayer, Policy},
    repository_from_request,
    rest_api::{Ids, Page, Paging},
    state::AppState,
    validate::Garde,
};

repository_from_request!(TitleRepository);

pub async fn list(
    repository: TitleRepository,
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Garde(Query(paging)): Garde<Query<Paging>>,
    Garde(Query(filter)): Garde<Query<TitleFilter>>,
) -> ApiResult<impl IntoResponse> {
    let listing_params = paging.into_listing_params(state.config().default_page_size);
    let batch = repository.list(listing_params, &filter).await?;
    Ok((StatusCode::OK, Json(Page::from_batch(batch, &state, &uri)?)))
}

pub async fn get_title(
    Ids(id): Ids<i64>,
    repository: TitleRepository,
) -> ApiResult<impl IntoResponse> {
    let record = repository.get(id).await?;

    Ok((StatusCode::OK, Json(record)))
}

pub async fn create(
    repository: TitleRepository,
    Garde(Json(payload)): Garde<Json<CreateTitle>>,
) -> ApiResult<impl IntoResponse> {
    let record = repository.create(payload).await?;

    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn update(
    Ids(id): Ids<i64>,
    repository: TitleRepository,
    Garde(Json(payload)): Garde<Json<UpdateTitle>>,
) -> ApiResult<impl IntoResponse> {
    let record = repository.update(id, payload).await?;

    Ok((StatusCode::OK, Json(record)))
}

pub async fn delete(
    Ids(id): Ids<i64>,
    repository: TitleRepository,
) -> ApiResult<impl IntoResponse> {
    repository.delete(id).await?;

    Ok((StatusCode::NO_CONTENT, ()))
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", get(list).post(create))
        .route("/{title_id}", get(get_title).patch(update).delete(delete))
        .route_layer(PermissionLayer::new(Policy::AdminOrReadOnly))
}
