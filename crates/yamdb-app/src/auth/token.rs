use std::task::{Context, Poll};

use axum::{
    extract::Request,
    response::{IntoResponse, Response},
    RequestPartsExt,
};
use axum_extra::{
    typed_header::{TypedHeaderRejection, TypedHeaderRejectionReason},
    TypedHeader,
};
use futures::future::BoxFuture;
use headers::{authorization::Bearer, Authorization};
use http::request::Parts;
use tower::{Layer, Service};
use tracing::{debug, warn};
use yamdb_dal::user::UserRepository;
use yamdb_types::claim::ApiClaim;

use crate::{
    error::{ApiError, ApiResult},
    permissions::Requester,
    state::AppState,
};

fn invalid_token() -> ApiError {
    ApiError::Unauthenticated("Given token not valid for any token type".to_string())
}

/// Bearer token is optional, but when present it must be valid and belong to an existing user.
pub async fn resolve_requester(parts: &mut Parts, state: &AppState) -> ApiResult<Requester> {
    let token = match parts.extract::<TypedHeader<Authorization<Bearer>>>().await {
        Ok(TypedHeader(Authorization(bearer))) => bearer.token().to_string(),
        Err(e) if is_missing(&e) => return Ok(Requester::Anonymous),
        Err(e) => {
            debug!("Invalid authorization header: {e}");
            return Err(invalid_token());
        }
    };

    let claim = state.tokens().validate::<ApiClaim>(&token).map_err(|e| {
        debug!("Failed to validate token: {e}");
        invalid_token()
    })?;
    let user_id = claim.user_id().map_err(|e| {
        warn!("Token with invalid subject: {e}");
        invalid_token()
    })?;

    let user = UserRepository::new(state.pool().clone())
        .get(user_id)
        .await
        .map_err(|e| {
            if e.is_not_found() {
                debug!("Token for unknown user {user_id}");
                ApiError::Unauthenticated("User not found".to_string())
            } else {
                e.into()
            }
        })?;
    Ok(Requester::User(user.into()))
}

fn is_missing(rejection: &TypedHeaderRejection) -> bool {
    matches!(rejection.reason(), TypedHeaderRejectionReason::Missing)
}

/// Resolves [`Requester`] for every request and stores it in request extensions.
#[derive(Clone)]
pub struct RequesterLayer {
    state: AppState,
}

impl RequesterLayer {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl<S> Layer<S> for RequesterLayer {
    type Service = RequesterService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequesterService {
            inner,
            state: self.state.clone(),
        }
    }
}

#[derive(Clone)]
pub struct RequesterService<S> {
    inner: S,
    state: AppState,
}

impl<S> Service<Request> for RequesterService<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        // the ready service is taken, clone stays for the next call
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let state = self.state.clone();
        Box::pin(async move {
            let (mut parts, body) = req.into_parts();
            match resolve_requester(&mut parts, &state).await {
                Ok(requester) => {
                    parts.extensions.insert(requester);
                    inner.call(Request::from_parts(parts, body)).await
                }
                Err(e) => Ok(e.into_response()),
            }
        })
    }
}
