use axum::{
    extract::{OriginalUri, Path, Query, State},
    response::IntoResponse,
    routing::get,
    Json,
};
use http::{Method, StatusCode};
use tracing::{debug, info};
use yamdb_auth::generate_confirmation_code;
use yamdb_dal::user::{CreateUser, UpdateUser, UserRepository};

use crate::{
    error::{ApiError, ApiResult},
    permissions::{PermissionLayer, Policy, ProfileTarget, Requester},
    repository_from_request,
    rest_api::{Page, Paging, Search},
    state::AppState,
    validate::Garde,
};

repository_from_request!(UserRepository);

pub async fn list_users(
    repository: UserRepository,
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Garde(Query(paging)): Garde<Query<Paging>>,
    Garde(Query(search)): Garde<Query<Search>>,
) -> ApiResult<impl IntoResponse> {
    let listing_params = paging.into_listing_params(state.config().default_page_size);
    let batch = repository.list(listing_params, search.term()).await?;
    Ok((StatusCode::OK, Json(Page::from_batch(batch, &state, &uri)?)))
}

/// Admin created users get no mail, they use signup to receive a code.
pub async fn create_user(
    repository: UserRepository,
    Garde(Json(payload)): Garde<Json<CreateUser>>,
) -> ApiResult<impl IntoResponse> {
    let user = repository
        .create(payload, &generate_confirmation_code())
        .await?;
    info!("User {} created by admin", user.username);

    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get_user(
    Path(username): Path<String>,
    repository: UserRepository,
) -> ApiResult<impl IntoResponse> {
    let user = repository.get_by_username(&username).await?;

    Ok((StatusCode::OK, Json(user)))
}

pub async fn update_user(
    Path(username): Path<String>,
    repository: UserRepository,
    Garde(Json(payload)): Garde<Json<UpdateUser>>,
) -> ApiResult<impl IntoResponse> {
    let user = repository.get_by_username(&username).await?;
    let user = repository.update(user.id, payload).await?;

    Ok((StatusCode::OK, Json(user)))
}

pub async fn delete_user(
    Path(username): Path<String>,
    repository: UserRepository,
) -> ApiResult<impl IntoResponse> {
    let user = repository.get_by_username(&username).await?;
    repository.delete(user.id).await?;
    info!("User {username} deleted");

    Ok((StatusCode::NO_CONTENT, ()))
}

pub async fn get_me(
    requester: Requester,
    repository: UserRepository,
) -> ApiResult<impl IntoResponse> {
    let principal = requester.require_principal()?;
    let user = repository.get(principal.id).await?;

    Ok((StatusCode::OK, Json(user)))
}

/// Role is validated, but only admins can change it.
pub async fn update_me(
    requester: Requester,
    repository: UserRepository,
    Garde(Json(mut payload)): Garde<Json<UpdateUser>>,
) -> ApiResult<impl IntoResponse> {
    let principal = requester.require_principal()?;
    if !principal.is_admin() && payload.role.take().is_some() {
        debug!("Ignoring role change requested by {}", principal.username);
    }
    let user = repository.update(principal.id, payload).await?;

    Ok((StatusCode::OK, Json(user)))
}

pub async fn delete_me() -> ApiResult<()> {
    Err(ApiError::MethodNotAllowed(Method::DELETE))
}

pub fn router() -> axum::Router<AppState> {
    let me = axum::Router::new()
        .route("/me", get(get_me).patch(update_me).delete(delete_me))
        .route_layer(PermissionLayer::new(Policy::Profile(ProfileTarget::Me)));
    let others = axum::Router::new()
        .route("/", get(list_users).post(create_user))
        .route(
            "/{username}",
            get(get_user).patch(update_user).delete(delete_user),
        )
        .route_layer(PermissionLayer::new(Policy::Profile(ProfileTarget::Other)));
    me.merge(others)
}
