//! Authorization predicates over request method, requester and resource author.
//!
//! Route wide policies are applied with [`PermissionLayer`], checks that need
//! the loaded object (review or comment author) run in handlers.

use std::{
    convert::Infallible,
    task::{Context, Poll},
};

use axum::{
    extract::{FromRequestParts, Request},
    response::{IntoResponse, Response},
};
use futures::future::{BoxFuture, FutureExt as _};
use http::{request::Parts, Method};
use tower::{Layer, Service};
use tracing::debug;
use yamdb_types::claim::Role;

use crate::error::ApiError;

/// Authenticated user, as currently stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Principal {
    pub id: i64,
    pub username: String,
    pub role: Role,
    pub is_superuser: bool,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin || self.is_superuser
    }

    pub fn is_moderator(&self) -> bool {
        self.role == Role::Moderator
    }
}

impl From<yamdb_dal::user::User> for Principal {
    fn from(user: yamdb_dal::user::User) -> Self {
        Principal {
            id: user.id,
            username: user.username,
            role: user.role,
            is_superuser: user.is_superuser,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum Requester {
    #[default]
    Anonymous,
    User(Principal),
}

impl Requester {
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            Requester::Anonymous => None,
            Requester::User(principal) => Some(principal),
        }
    }

    pub fn require_principal(&self) -> Result<&Principal, Denied> {
        self.principal().ok_or(Denied::Unauthenticated)
    }
}

impl<S> FromRequestParts<S> for Requester
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<Requester>()
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denied {
    /// Maps to 401
    Unauthenticated,
    /// Maps to 403
    Forbidden,
}

pub type Access = Result<(), Denied>;

pub fn is_safe(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

pub fn authenticated(requester: &Requester) -> Access {
    requester.require_principal().map(|_| ())
}

pub fn admin(requester: &Requester) -> Access {
    if requester.require_principal()?.is_admin() {
        Ok(())
    } else {
        Err(Denied::Forbidden)
    }
}

pub fn authenticated_or_read_only(method: &Method, requester: &Requester) -> Access {
    if is_safe(method) {
        Ok(())
    } else {
        authenticated(requester)
    }
}

pub fn admin_or_read_only(method: &Method, requester: &Requester) -> Access {
    if is_safe(method) {
        Ok(())
    } else {
        admin(requester)
    }
}

/// Review and comment mutation: author, moderator or admin.
pub fn author_moderator_admin_or_read_only(
    method: &Method,
    requester: &Requester,
    author_id: i64,
) -> Access {
    if is_safe(method) {
        return Ok(());
    }
    let principal = requester.require_principal()?;
    if principal.id == author_id || principal.is_moderator() || principal.is_admin() {
        Ok(())
    } else {
        Err(Denied::Forbidden)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileTarget {
    /// `/users/me`
    Me,
    /// `/users/{username}` and the users collection
    Other,
}

pub fn self_or_admin(requester: &Requester, target: ProfileTarget) -> Access {
    match target {
        ProfileTarget::Me => authenticated(requester),
        ProfileTarget::Other => admin(requester),
    }
}

/// Route wide policy, object level checks are done by handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    AuthenticatedOrReadOnly,
    AdminOrReadOnly,
    Profile(ProfileTarget),
}

impl Policy {
    pub fn check(&self, method: &Method, requester: &Requester) -> Access {
        match self {
            Policy::AuthenticatedOrReadOnly => authenticated_or_read_only(method, requester),
            Policy::AdminOrReadOnly => admin_or_read_only(method, requester),
            Policy::Profile(target) => self_or_admin(requester, *target),
        }
    }
}

/// Rejects requests not allowed by [`Policy`], expects [`Requester`] in request extensions.
#[derive(Clone)]
pub struct PermissionLayer {
    policy: Policy,
}

impl PermissionLayer {
    pub fn new(policy: Policy) -> Self {
        Self { policy }
    }
}

impl<S> Layer<S> for PermissionLayer {
    type Service = PermissionService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        PermissionService {
            inner,
            policy: self.policy,
        }
    }
}

#[derive(Clone)]
pub struct PermissionService<S> {
    inner: S,
    policy: Policy,
}

impl<S> Service<Request> for PermissionService<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Error: Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let requester = req
            .extensions()
            .get::<Requester>()
            .cloned()
            .unwrap_or_default();
        match self.policy.check(req.method(), &requester) {
            Ok(()) => self.inner.call(req).boxed(),
            Err(denied) => {
                debug!(
                    "{:?} denied {} {} for {:?}",
                    self.policy,
                    req.method(),
                    req.uri(),
                    requester
                );
                let response = ApiError::from(denied).into_response();
                futures::future::ready(Ok(response)).boxed()
            }
        }
    }
}
