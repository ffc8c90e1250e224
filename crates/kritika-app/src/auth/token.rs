use std::{
    sync::Arc,
    task::{Context, Poll},
};

use axum::{
    body::Body,
    extract::FromRequestParts,
    response::{IntoResponse as _, Response},
    RequestPartsExt as _,
};
use axum_extra::TypedHeader;
use futures::future::BoxFuture;
use headers::{authorization::Bearer, Authorization};
use http::{request::Parts, Request, StatusCode};
use kritika_types::claim::{ApiClaim, Role};
use tower::{Layer, Service};
use tower_cookies::Cookies;
use tracing::{debug, error};

use crate::state::AppState;

pub const TOKEN_COOKIE_NAME: &str = "kritika_token";

impl FromRequestParts<AppState> for ApiClaim {
    type Rejection = StatusCode;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // TokenLayer has usually validated the token already.
        if let Some(claim) = parts.extensions.get::<ApiClaim>() {
            return Ok(claim.clone());
        }

        let mut header_token = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .ok()
            .map(|h| h.0.token().to_string());

        if header_token.is_none() {
            let cookies = parts.extract::<Cookies>().await.map_err(|e| {
                error!("Cannot get cookies: {}", e.1);
                e.0
            })?;
            header_token = cookies
                .get(TOKEN_COOKIE_NAME)
                .map(|t| t.value().to_string());
        }

        match header_token {
            Some(token) => {
                let claim = state.tokens().validate::<ApiClaim>(&token).map_err(|e| {
                    debug!("Failed to validate token: {}", e);
                    StatusCode::UNAUTHORIZED
                })?;
                Ok(claim)
            }
            None => {
                debug!("No token found");
                Err(StatusCode::UNAUTHORIZED)
            }
        }
    }
}

fn request_token(req: &Request<Body>) -> Option<String> {
    req.headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|v| v.trim().to_string())
        .or_else(|| {
            req.extensions()
                .get::<Cookies>()
                .and_then(|cookies| cookies.get(TOKEN_COOKIE_NAME))
                .map(|c| c.value().to_string())
        })
}

/// Validates the credential carried by the request, if any, and makes the
/// claim available to handlers and role layers. Anonymous requests pass
/// through, public read access is decided downstream.
#[derive(Clone)]
pub struct TokenLayer {
    state: AppState,
}

impl TokenLayer {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl<S> Layer<S> for TokenLayer {
    type Service = TokenMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TokenMiddleware {
            inner,
            state: self.state.clone(),
        }
    }
}

#[derive(Clone)]
pub struct TokenMiddleware<S> {
    inner: S,
    state: AppState,
}

impl<S> Service<Request<Body>> for TokenMiddleware<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        if let Some(token) = request_token(&req) {
            match self.state.tokens().validate::<ApiClaim>(&token) {
                Ok(claim) => {
                    req.extensions_mut().insert(claim);
                }
                Err(e) => {
                    debug!("Rejecting invalid token: {e}");
                    let response = StatusCode::UNAUTHORIZED.into_response();
                    return Box::pin(futures::future::ready(Ok(response)));
                }
            }
        }
        Box::pin(self.inner.call(req))
    }
}

/// Gates a route on role membership, with the superuser flag as an override.
/// Relies on [`TokenLayer`] having resolved the claim.
#[derive(Clone)]
pub struct RequiredRolesLayer {
    roles: Arc<Vec<Role>>,
}

impl RequiredRolesLayer {
    pub fn new(roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            roles: Arc::new(roles.into_iter().collect()),
        }
    }
}

impl<S> Layer<S> for RequiredRolesLayer {
    type Service = RequiredRoles<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequiredRoles {
            inner,
            roles: self.roles.clone(),
        }
    }
}

#[derive(Clone)]
pub struct RequiredRoles<S> {
    inner: S,
    roles: Arc<Vec<Role>>,
}

impl<S> Service<Request<Body>> for RequiredRoles<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let denied = match req.extensions().get::<ApiClaim>() {
            Some(claim) if claim.superuser || self.roles.contains(&claim.role) => None,
            Some(claim) => {
                debug!("Denied {} lacking required role", claim.username);
                Some(StatusCode::FORBIDDEN)
            }
            None => Some(StatusCode::UNAUTHORIZED),
        };
        match denied {
            None => Box::pin(self.inner.call(req)),
            Some(status) => Box::pin(futures::future::ready(Ok(status.into_response()))),
        }
    }
}
