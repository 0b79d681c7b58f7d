use axum::{
    extract::{OriginalUri, Query, State},
    response::IntoResponse,
    routing::get,
    Json,
};
use http::{Method, StatusCode};
use yamdb_dal::comment::{CommentRepository, CreateComment, UpdateComment};

use crate::{
    error::{ApiError, ApiResult},
    permissions::{author_moderator_admin_or_read_only, PermissionLayer, Policy, Requester},
    repository_from_request,
    rest_api::{Ids, Page, Paging},
    state::AppState,
    validate::Garde,
};

repository_from_request!(CommentRepository);

pub async fn list(
    Ids((title_id, review_id)): Ids<(i64, i64)>,
    repository: CommentRepository,
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Garde(Query(paging)): Garde<Query<Paging>>,
) -> ApiResult<impl IntoResponse> {
    let listing_params = paging.into_listing_params(state.config().default_page_size);
    let batch = repository.list(title_id, review_id, listing_params).await?;
    Ok((StatusCode::OK, Json(Page::from_batch(batch, &state, &uri)?)))
}

pub async fn get_comment(
    Ids((title_id, review_id, id)): Ids<(i64, i64, i64)>,
    repository: CommentRepository,
) -> ApiResult<impl IntoResponse> {
    let record = repository.get(title_id, review_id, id).await?;

    Ok((StatusCode::OK, Json(record)))
}

pub async fn create(
    Ids((title_id, review_id)): Ids<(i64, i64)>,
    requester: Requester,
    repository: CommentRepository,
    Garde(Json(payload)): Garde<Json<CreateComment>>,
) -> ApiResult<impl IntoResponse> {
    let author = requester.require_principal()?;
    let record = repository
        .create(title_id, review_id, author.id, payload)
        .await?;

    Ok((StatusCode::CREATED, Json(record)))
}

async fn check_author(
    repository: &CommentRepository,
    method: &Method,
    requester: &Requester,
    (title_id, review_id, id): (i64, i64, i64),
) -> ApiResult<()> {
    let comment = repository.get(title_id, review_id, id).await?;
    author_moderator_admin_or_read_only(method, requester, comment.author_id)
        .map_err(ApiError::from)
}

pub async fn update(
    Ids(ids): Ids<(i64, i64, i64)>,
    method: Method,
    requester: Requester,
    repository: CommentRepository,
    Garde(Json(payload)): Garde<Json<UpdateComment>>,
) -> ApiResult<impl IntoResponse> {
    check_author(&repository, &method, &requester, ids).await?;
    let (title_id, review_id, id) = ids;
    let record = repository.update(title_id, review_id, id, payload).await?;

    Ok((StatusCode::OK, Json(record)))
}

pub async fn delete(
    Ids(ids): Ids<(i64, i64, i64)>,
    method: Method,
    requester: Requester,
    repository: CommentRepository,
) -> ApiResult<impl IntoResponse> {
    check_author(&repository, &method, &requester, ids).await?;
    let (title_id, review_id, id) = ids;
    repository.delete(title_id, review_id, id).await?;

    Ok((StatusCode::NO_CONTENT, ()))
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", get(list).post(create))
        .route("/{comment_id}", get(get_comment).patch(update).delete(delete))
        .route_layer(PermissionLayer::new(Policy::AuthenticatedOrReadOnly))
}
