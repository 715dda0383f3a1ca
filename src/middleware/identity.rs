/// Request Identity Middleware
///
/// Reads the access token from the `X-Authorization` header and binds the
/// authenticated user into request extensions. Requests without a usable
/// token pass through unauthenticated; handlers that need a principal take
/// an `AuthenticatedUser` argument, which answers 401 when none is bound.

use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::HeaderMap,
    Error, FromRequest, HttpMessage, HttpRequest,
};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::rc::Rc;
use std::sync::Arc;

use crate::auth::claims::TokenKind;
use crate::auth::jwt::{TokenCodec, BEARER_PREFIX};
use crate::auth::models::UserId;
use crate::error::{AppError, AuthError};

pub const CREDENTIAL_HEADER: &str = "X-Authorization";

/// Principal bound to a request by `IdentityMiddleware`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
}

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthenticatedUser>()
                .copied()
                .ok_or(AppError::Auth(AuthError::MissingIdentity)),
        )
    }
}

/// Token presented in the credential header, without its scheme
///
/// `None` when the header is absent, not valid text, or not a bearer token.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(CREDENTIAL_HEADER)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix(BEARER_PREFIX))
}

pub struct IdentityMiddleware {
    codec: Arc<TokenCodec>,
}

impl IdentityMiddleware {
    pub fn new(codec: Arc<TokenCodec>) -> Self {
        Self { codec }
    }
}

impl<S, B> Transform<S, ServiceRequest> for IdentityMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = IdentityMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(IdentityMiddlewareService {
            service: Rc::new(service),
            codec: self.codec.clone(),
        }))
    }
}

pub struct IdentityMiddlewareService<S> {
    service: Rc<S>,
    codec: Arc<TokenCodec>,
}

impl<S> IdentityMiddlewareService<S> {
    fn resolve(&self, headers: &HeaderMap) -> Option<AuthenticatedUser> {
        let token = bearer_token(headers)?;
        let subject = self.codec.verify(token, TokenKind::Access)?;

        match UserId::parse(&subject) {
            Ok(user_id) => Some(AuthenticatedUser { user_id }),
            Err(_) => {
                tracing::warn!("Access token subject is not a user id");
                None
            }
        }
    }
}

impl<S, B> Service<ServiceRequest> for IdentityMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if let Some(user) = self.resolve(req.headers()) {
            tracing::debug!(user_id = %user.user_id, "Request authenticated");
            req.extensions_mut().insert(user);
        }

        let service = self.service.clone();
        Box::pin(async move { service.call(req).await })
    }
}
