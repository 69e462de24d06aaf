use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;
use uuid::Uuid;

use super::{dto::TokenKind, jwt::JwtKeys, repo};
use crate::{error::AppError, state::AppState};

/// A validated access token whose session has not been revoked.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: Uuid,
    pub session_id: Uuid,
}

/// Extracts and validates the bearer token, returning the user ID.
pub struct AuthUser(pub Uuid);

fn unauthorized(msg: &str) -> AppError {
    AppError::Unauthorized(msg.to_string())
}

pub(crate) fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let auth = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| unauthorized("Missing Authorization header"))?;

    auth.strip_prefix("Bearer ")
        .or_else(|| auth.strip_prefix("bearer "))
        .ok_or_else(|| unauthorized("Invalid Authorization header"))
}

#[async_trait]
impl FromRequestParts<AppState> for Session {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let keys = JwtKeys::from_ref(state);

        let claims = keys.verify(token).map_err(|_| {
            warn!("invalid or expired token");
            unauthorized("Invalid or expired token")
        })?;

        if claims.kind != TokenKind::Access {
            return Err(unauthorized("Access token required"));
        }

        if repo::is_session_revoked(&state.db, claims.sid).await? {
            warn!(user_id = %claims.sub, sid = %claims.sid, "revoked session presented");
            return Err(unauthorized("Token has been revoked"));
        }

        Ok(Session {
            user_id: claims.sub,
            session_id: claims.sid,
        })
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state).await?;
        Ok(AuthUser(session.user_id))
    }
}
