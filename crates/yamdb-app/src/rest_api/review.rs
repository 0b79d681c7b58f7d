use axum::{
    extract::{OriginalUri, Query, State},
    response::IntoResponse,
    routing::get,
    Json,
};
use http::{Method, StatusCode};
use tracing::debug;
use yamdb_dal::review::{CreateReview, ReviewRepository, UpdateReview};

use crate::{
    error::{ApiError, ApiResult},
    permissions::{author_moderator_admin_or_read_only, PermissionLayer, Policy, Requester},
    repository_from_request,
    rest_api::{Ids, Page, Paging},
    state::AppState,
    validate::Garde,
};

repository_from_request!(ReviewRepository);

pub async fn list(
    Ids(title_id): Ids<i64>,
    repository: ReviewRepository,
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Garde(Query(paging)): Garde<Query<Paging>>,
) -> ApiResult<impl IntoResponse> {
    let listing_params = paging.into_listing_params(state.config().default_page_size);
    let batch = repository.list(title_id, listing_params).await?;
    Ok((StatusCode::OK, Json(Page::from_batch(batch, &state, &uri)?)))
}

pub async fn get_review(
    Ids((title_id, id)): Ids<(i64, i64)>,
    repository: ReviewRepository,
) -> ApiResult<impl IntoResponse> {
    let record = repository.get(title_id, id).await?;

    Ok((StatusCode::OK, Json(record)))
}

pub async fn create(
    Ids(title_id): Ids<i64>,
    requester: Requester,
    repository: ReviewRepository,
    Garde(Json(payload)): Garde<Json<CreateReview>>,
) -> ApiResult<impl IntoResponse> {
    let author = requester.require_principal()?;
    let record = repository.create(title_id, author.id, payload).await?;
    debug!("{} reviewed title {title_id}", author.username);

    Ok((StatusCode::CREATED, Json(record)))
}

// Loads the review first, so missing review is 404 before permission is considered
async fn check_author(
    repository: &ReviewRepository,
    method: &Method,
    requester: &Requester,
    title_id: i64,
    id: i64,
) -> ApiResult<()> {
    let review = repository.get(title_id, id).await?;
    author_moderator_admin_or_read_only(method, requester, review.author_id)
        .map_err(ApiError::from)
}

pub async fn update(
    Ids((title_id, id)): Ids<(i64, i64)>,
    method: Method,
    requester: Requester,
    repository: ReviewRepository,
    Garde(Json(payload)): Garde<Json<UpdateReview>>,
) -> ApiResult<impl IntoResponse> {
    check_author(&repository, &method, &requester, title_id, id).await?;
    let record = repository.update(title_id, id, payload).await?;

    Ok((StatusCode::OK, Json(record)))
}

pub async fn delete(
    Ids((title_id, id)): Ids<(i64, i64)>,
    method: Method,
    requester: Requester,
    repository: ReviewRepository,
) -> ApiResult<impl IntoResponse> {
    check_author(&repository, &method, &requester, title_id, id).await?;
    repository.delete(title_id, id).await?;

    Ok((StatusCode::NO_CONTENT, ()))
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", get(list).post(create))
        .route("/{review_id}", get(get_review).patch(update).delete(delete))
        .route_layer(PermissionLayer::new(Policy::AuthenticatedOrReadOnly))
}
