use std::sync::Arc;

use axum::{
    http::{header, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::Cookie;
use validator::Validate;

use crate::{
    dtos::{
        userdtos::{
            FilterUserDto, IdentityDto, LoginUserDto, RefreshTokenDto, RegisterUserDto,
            UserLoginResponseDto,
        },
        ApiResponse,
    },
    error::HttpError,
    middleware::{auth, role_check, JWTAuthMiddleware, RoutePolicy},
    service::auth_service::AuthTokens,
    AppState,
};

pub fn auth_handler() -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route(
            "/me",
            get(get_me)
                .layer(middleware::from_fn(|state, req, next| {
                    role_check(state, req, next, RoutePolicy::any_role().allowing_pending())
                }))
                .layer(middleware::from_fn(auth)),
        )
}

fn token_response(
    app_state: &AppState,
    tokens: AuthTokens,
) -> Result<impl IntoResponse, HttpError> {
    let cookie_duration = time::Duration::minutes(app_state.env.jwt_maxage);
    let cookie = Cookie::build(("token", tokens.access_token.clone()))
        .path("/")
        .max_age(cookie_duration)
        .http_only(true)
        .build();

    let response = Json(UserLoginResponseDto {
        status: "success".to_string(),
        token: tokens.access_token,
        refresh_token: Some(tokens.refresh_token),
        user: FilterUserDto::filter_user(&tokens.user),
    });

    let mut response = response.into_response();
    response.headers_mut().append(
        header::SET_COOKIE,
        cookie
            .to_string()
            .parse()
            .map_err(|_| HttpError::server_error("Failed to build session cookie"))?,
    );
    Ok(response)
}

pub async fn register(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<RegisterUserDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let identity = app_state.auth_service.register(body).await?;

    let message = if identity.user.approved {
        "Registration successful"
    } else {
        "Registration successful. Upload your documents and wait for admin approval"
    };

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(message, IdentityDto::from(&identity))),
    ))
}

pub async fn login(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<LoginUserDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let tokens = app_state
        .auth_service
        .login(body.username.trim(), &body.password)
        .await?;

    token_response(&app_state, tokens)
}

pub async fn refresh(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<RefreshTokenDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let tokens = app_state.auth_service.refresh(&body.refresh_token).await?;

    token_response(&app_state, tokens)
}

pub async fn get_me(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let identity = app_state.auth_service.identity(user.claims.sub).await?;

    Ok(Json(ApiResponse::success(
        "Current user",
        IdentityDto::from(&identity),
    )))
}
