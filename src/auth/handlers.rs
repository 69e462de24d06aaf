use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LocationResponse, LoginRequest, PublicUser, RefreshRequest, RegisterRequest},
        extractors::{AuthUser, Session},
        jwt::JwtKeys,
        password::{hash_password, validate_registration, verify_password},
        repo::{self, NewUser},
        repo_types::User,
    },
    error::{is_unique_violation, AppError, AppResult},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/logout", post(logout))
}

pub fn me_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_me))
        .route("/locations", get(list_locations))
}

async fn public_user(state: &AppState, user: User) -> AppResult<PublicUser> {
    let locations = repo::location_names_for_user(&state.db, user.id).await?;
    Ok(PublicUser {
        id: user.id,
        email: user.email,
        username: user.username,
        first_name: user.first_name,
        locations,
    })
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    validate_registration(&mut payload)?;

    let hash = hash_password(&payload.password)?;

    let mut tx = state.db.begin().await?;
    let user = User::create_tx(
        &mut tx,
        NewUser {
            email: &payload.email,
            username: &payload.username,
            first_name: payload.first_name.as_deref(),
            password_hash: &hash,
        },
    )
    .await
    .map_err(|e| {
        if is_unique_violation(&e, "users_email_key") {
            warn!(email = %payload.email, "email already registered");
            AppError::Conflict("Email already registered".into())
        } else if is_unique_violation(&e, "users_username_key") {
            warn!(username = %payload.username, "username already taken");
            AppError::Conflict("Username already taken".into())
        } else {
            AppError::from(e)
        }
    })?;
    repo::attach_locations_tx(&mut tx, user.id, &payload.locations).await?;
    tx.commit().await?;

    let (access_token, refresh_token) = JwtKeys::from_ref(&state).sign_pair(user.id)?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            access_token,
            refresh_token,
            user: public_user(&state, user).await?,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let email = payload.email.trim().to_lowercase();
    let invalid = || AppError::Unauthorized("Invalid credentials".into());

    let user = match User::find_by_email(&state.db, &email).await? {
        Some(u) => u,
        None => {
            warn!(email = %email, "login unknown email");
            return Err(invalid());
        }
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(email = %email, user_id = %user.id, "login invalid password");
        return Err(invalid());
    }

    let (access_token, refresh_token) = JwtKeys::from_ref(&state).sign_pair(user.id)?;

    info!(user_id = %user.id, "user logged in");
    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        user: public_user(&state, user).await?,
    }))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> AppResult<Json<AuthResponse>> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| AppError::Unauthorized(e.to_string()))?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;

    // Rotation: the presented session ends here, so a refresh token works once.
    if !repo::revoke_session(&state.db, claims.sid, user.id, keys.session_expiry()).await? {
        warn!(user_id = %user.id, sid = %claims.sid, "refresh with revoked session");
        return Err(AppError::Unauthorized("Token has been revoked".into()));
    }

    let (access_token, refresh_token) = keys.sign_pair(user.id)?;
    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        user: public_user(&state, user).await?,
    }))
}

/// Ends the session of the presented access token, together with the
/// refresh token issued alongside it.
#[instrument(skip(state, session), fields(user_id = %session.user_id))]
pub async fn logout(State(state): State<AppState>, session: Session) -> AppResult<Json<Value>> {
    let expires_at = JwtKeys::from_ref(&state).session_expiry();
    repo::revoke_session(&state.db, session.session_id, session.user_id, expires_at).await?;
    info!(sid = %session.session_id, "session revoked");
    Ok(Json(json!({ "status": "ok" })))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<PublicUser>> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;
    Ok(Json(public_user(&state, user).await?))
}

#[instrument(skip(state))]
pub async fn list_locations(State(state): State<AppState>) -> AppResult<Json<Vec<LocationResponse>>> {
    let items = repo::list_locations(&state.db)
        .await?
        .into_iter()
        .map(|l| LocationResponse {
            id: l.id,
            name: l.name,
            lat: l.lat,
            lng: l.lng,
        })
        .collect();
    Ok(Json(items))
}
