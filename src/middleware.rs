use std::sync::Arc;

use axum::{
    extract::Request,
    http::header,
    middleware::Next,
    response::IntoResponse,
    Extension,
};
use axum_extra::extract::cookie::CookieJar;

use crate::{
    error::{ErrorMessage, HttpError},
    models::usermodel::UserRole,
    service::error::ServiceError,
    utils::token::{self, TokenClaims, TokenType},
    AppState,
};

/// Identity resolved from the access token, available to handlers as an extension.
#[derive(Debug, Clone)]
pub struct JWTAuthMiddleware {
    pub claims: TokenClaims,
}

/// Per-route access rule.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutePolicy {
    pub allowed: Vec<UserRole>,
    /// Lets professionals awaiting approval through, so they can finish verification.
    pub allow_pending_approval: bool,
}

impl RoutePolicy {
    pub fn only(roles: &[UserRole]) -> Self {
        RoutePolicy {
            allowed: roles.to_vec(),
            allow_pending_approval: false,
        }
    }

    pub fn any_role() -> Self {
        Self::only(&[UserRole::Admin, UserRole::Professional, UserRole::Customer])
    }

    pub fn allowing_pending(mut self) -> Self {
        self.allow_pending_approval = true;
        self
    }
}

/// Applies the access checks in order; the first failing check decides the error.
pub fn evaluate(claims: Option<&TokenClaims>, policy: &RoutePolicy) -> Result<(), ServiceError> {
    let claims = claims.ok_or_else(|| {
        ServiceError::Authentication(ErrorMessage::UserNotAuthenticated.to_string())
    })?;

    if claims.role == UserRole::Admin && !policy.allowed.contains(&UserRole::Admin) {
        return Err(ServiceError::Authorization(
            "Administrators cannot use this endpoint".to_string(),
        ));
    }
    if !policy.allowed.contains(&claims.role) {
        return Err(ServiceError::Authorization(
            ErrorMessage::PermissionDenied.to_string(),
        ));
    }
    if claims.role == UserRole::Professional && !claims.approved && !policy.allow_pending_approval {
        return Err(ServiceError::PendingApproval);
    }
    if !claims.active {
        return Err(ServiceError::AccountInactive);
    }
    Ok(())
}

fn bearer_token(req: &Request) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|auth_header| auth_header.to_str().ok())
        .and_then(|auth_value| auth_value.strip_prefix("Bearer "))
        .map(str::to_owned)
}

/// Decodes the access token from the `token` cookie or a bearer header. No database lookup.
pub async fn auth(
    cookie_jar: CookieJar,
    Extension(app_state): Extension<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, HttpError> {
    let token = cookie_jar
        .get("token")
        .map(|cookie| cookie.value().to_string())
        .or_else(|| bearer_token(&req))
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::TokenNotProvided.to_string()))?;

    let claims = token::decode_token(token, app_state.env.jwt_secret.as_bytes())
        .map_err(|_| HttpError::unauthorized(ErrorMessage::InvalidToken.to_string()))?;

    if claims.typ != TokenType::Access {
        return Err(HttpError::unauthorized(ErrorMessage::InvalidToken.to_string()));
    }

    req.extensions_mut().insert(JWTAuthMiddleware { claims });

    Ok(next.run(req).await)
}

pub async fn role_check(
    Extension(_app_state): Extension<Arc<AppState>>,
    req: Request,
    next: Next,
    policy: RoutePolicy,
) -> Result<impl IntoResponse, HttpError> {
    let claims = req
        .extensions()
        .get::<JWTAuthMiddleware>()
        .map(|auth| &auth.claims);

    if let Err(e) = evaluate(claims, &policy) {
        tracing::debug!("Access denied to {}: {}", req.uri().path(), e);
        return Err(e.into());
    }

    Ok(next.run(req).await)
}
