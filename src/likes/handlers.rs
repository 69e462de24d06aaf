use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use super::{
    dto::{CreateLikeRequest, LikeResponse},
    repo::{self, AD_FOREIGN_KEY, UNIQUE_USER_AD},
};
use crate::{
    ads::{dto::AdListItem, repo::Ad},
    auth::AuthUser,
    error::{is_foreign_key_violation, is_unique_violation, AppError, AppResult},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/likes", post(create_like))
        .route("/ads/liked", get(liked_ads))
}

#[instrument(skip(state, body))]
pub async fn create_like(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<CreateLikeRequest>,
) -> AppResult<(StatusCode, Json<LikeResponse>)> {
    let like = repo::create(&state.db, user_id, body.ad).await.map_err(|e| {
        if is_unique_violation(&e, UNIQUE_USER_AD) {
            warn!(%user_id, ad_id = body.ad, "duplicate like");
            AppError::validation("You have already liked this ad")
        } else if is_foreign_key_violation(&e, AD_FOREIGN_KEY) {
            AppError::not_found("Ad")
        } else {
            AppError::from(e)
        }
    })?;

    info!(%user_id, ad_id = body.ad, "ad liked");
    Ok((StatusCode::CREATED, Json(like.into())))
}

#[instrument(skip(state))]
pub async fn liked_ads(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<Vec<AdListItem>>> {
    let items = Ad::liked_by(&state.db, user_id)
        .await?
        .into_iter()
        .map(AdListItem::from)
        .collect();
    Ok(Json(items))
}
