use axum::{
    extract::{rejection::JsonRejection, FromRef, State},
    http::{header, StatusCode},
    response::AppendHeaders,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        cookie::{clear_cookie, session_cookie},
        dto::{AuthResponse, LoginRequest, MessageResponse, PublicUser, SignupRequest},
        extractors::AuthUser,
        password::{hash_password, validate_password, verify_password},
        repo_types::User,
        services::{is_valid_email, JwtKeys},
    },
    error::{AppError, AppResult, AuthError, ValidationError},
    state::AppState,
};

type WithCookie<T> = (StatusCode, AppendHeaders<[(header::HeaderName, String); 1]>, Json<T>);

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/user/signup", post(signup))
        .route("/user/login", post(login))
        .route("/user/logout", get(logout))
        .route("/user/me", get(get_me))
}

/// Signs a session for `user` and wraps the response with its cookie.
fn start_session(
    state: &AppState,
    status: StatusCode,
    message: &str,
    user: User,
) -> AppResult<WithCookie<AuthResponse>> {
    let keys = JwtKeys::from_ref(state);
    let token = keys.issue(user.id)?;
    let cookie = session_cookie(&state.config.cookie, &token, keys.ttl);
    Ok((
        status,
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Json(AuthResponse {
            message: message.into(),
            user: PublicUser {
                id: user.id,
                email: user.email,
            },
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> AppResult<WithCookie<AuthResponse>> {
    let Json(mut payload) = payload?;
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ValidationError::InvalidEmail.into());
    }

    if let Err(e) = validate_password(&payload.password) {
        warn!("password too short");
        return Err(e.into());
    }

    let hash = hash_password(&payload.password)?;
    // unique email is enforced by the store, so racing signups cannot both win
    let user = state.users.create(&payload.email, &hash).await?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    start_session(&state, StatusCode::CREATED, "User registered successfully", user)
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<WithCookie<AuthResponse>> {
    let Json(mut payload) = payload?;
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ValidationError::InvalidEmail.into());
    }

    let Some(user) = state.users.find_by_email(&payload.email).await? else {
        warn!(email = %payload.email, "login unknown email");
        return Err(AppError::InvalidCredentials);
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(email = %payload.email, user_id = %user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    info!(user_id = %user.id, email = %user.email, "user logged in");
    start_session(&state, StatusCode::OK, "User logged in successfully", user)
}

/// Clears the cookie only. A copied token stays usable until it expires.
#[instrument(skip(state, identity), fields(user_id = %identity.user_id))]
pub async fn logout(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> WithCookie<MessageResponse> {
    info!("user logged out");
    (
        StatusCode::OK,
        AppendHeaders([(header::SET_COOKIE, clear_cookie(&state.config.cookie))]),
        Json(MessageResponse {
            message: "User logged out successfully".into(),
        }),
    )
}

#[instrument(skip(state, identity), fields(user_id = %identity.user_id))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> AppResult<Json<PublicUser>> {
    let user = state
        .users
        .find_by_id(identity.user_id)
        .await?
        .ok_or(AuthError::UserNotFound)?;

    Ok(Json(PublicUser {
        id: user.id,
        email: user.email,
    }))
}
