use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header::HeaderName, StatusCode},
    routing::{get, patch, post},
    Json, Router,
};
use axum_extra::extract::Query;
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use super::{
    dto::{AdDetail, AdListItem, AdListQuery, AdResponse, CreateAdRequest, UpdateAdRequest},
    filter::{AdFilter, Page},
    repo::Ad,
    repo_types::{AdFields, AdRow},
};
use crate::{
    auth::{repo_types::User, AuthUser},
    categories::repo::Category,
    error::{AppError, AppResult},
    images::services::{is_image, remove_objects, resolve_url, upload_ad_image, UploadItem},
    likes::{dto::LikeResponse, repo as likes_repo},
    state::AppState,
};

const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

// --- public routers ---

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/ads", get(list_ads))
        .route("/ads/:id", get(get_ad))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/ads", post(create_ad))
        .route("/ads/:id", patch(update_ad).delete(delete_ad))
        .route(
            "/ads/:id/image",
            post(upload_image).layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES)),
        )
}

// --- helpers ---

async fn ad_response(state: &AppState, row: AdRow) -> AppResult<AdResponse> {
    let image = resolve_url(state, row.image.as_deref()).await?;
    let name_category = row.name_category().map(str::to_string);
    let author = row.username().map(str::to_string);
    Ok(AdResponse {
        id: row.id,
        name: row.name,
        author_id: row.author_id,
        author,
        price: row.price,
        description: row.description,
        is_published: row.is_published,
        category_id: row.category_id,
        name_category,
        image,
    })
}

/// Author and category must both exist before an ad may point at them.
async fn ensure_relations(state: &AppState, fields: &AdFields) -> AppResult<()> {
    if !User::exists(&state.db, fields.author_id).await? {
        return Err(AppError::not_found("Author"));
    }
    if !Category::exists(&state.db, fields.category_id).await? {
        return Err(AppError::not_found("Category"));
    }
    Ok(())
}

// --- handlers ---

#[instrument(skip(state))]
pub async fn list_ads(
    State(state): State<AppState>,
    Query(q): Query<AdListQuery>,
) -> AppResult<([(HeaderName, String); 1], Json<Vec<AdListItem>>)> {
    let filter = AdFilter::from_query(&q)?;
    let page = Page::from_query(&q)?;
    let total = Ad::count(&state.db, &filter).await?;
    let items = Ad::list(&state.db, &filter, page)
        .await?
        .into_iter()
        .map(AdListItem::from)
        .collect();
    // Total matches before paging; the body stays a bare array.
    let total_header = HeaderName::from_static("x-total-count");
    Ok(([(total_header, total.to_string())], Json(items)))
}

#[instrument(skip(state, _auth))]
pub async fn get_ad(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<AdDetail>> {
    let row = Ad::find(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Ad"))?;
    let likes = likes_repo::for_ad(&state.db, id)
        .await?
        .into_iter()
        .map(LikeResponse::from)
        .collect();
    let image = resolve_url(&state, row.image.as_deref()).await?;

    Ok(Json(AdDetail {
        id: row.id,
        username: row.username().map(str::to_string),
        name_category: row.name_category().map(str::to_string),
        name: row.name,
        price: row.price,
        description: row.description,
        is_published: row.is_published,
        image,
        likes,
    }))
}

#[instrument(skip(state, body))]
pub async fn create_ad(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<CreateAdRequest>,
) -> AppResult<(StatusCode, Json<AdResponse>)> {
    let (fields, is_published) = body.validate()?;
    ensure_relations(&state, &fields).await?;

    let row = Ad::create(&state.db, &fields, is_published).await?;
    info!(ad_id = row.id, %user_id, "ad created");
    Ok((StatusCode::CREATED, Json(ad_response(&state, row).await?)))
}

#[instrument(skip(state, body))]
pub async fn update_ad(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateAdRequest>,
) -> AppResult<Json<AdResponse>> {
    let fields = body.validate()?;
    if Ad::find(&state.db, id).await?.is_none() {
        return Err(AppError::not_found("Ad"));
    }
    ensure_relations(&state, &fields).await?;

    let row = Ad::update(&state.db, id, &fields)
        .await?
        .ok_or_else(|| AppError::not_found("Ad"))?;
    info!(ad_id = id, "ad updated");
    Ok(Json(ad_response(&state, row).await?))
}

/// POST /ads/:id/image (multipart, field `image`)
#[instrument(skip(state, mp))]
pub async fn upload_image(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    mut mp: Multipart,
) -> AppResult<Json<AdResponse>> {
    if Ad::find(&state.db, id).await?.is_none() {
        return Err(AppError::not_found("Ad"));
    }

    let mut upload = None;
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| AppError::validation(e.body_text()))?
    {
        if field.name() != Some("image") {
            continue;
        }
        let content_type = field
            .content_type()
            .map(str::to_string)
            .unwrap_or_else(|| "application/octet-stream".into());
        if !is_image(&content_type) {
            return Err(AppError::validation("Uploaded file must be an image"));
        }
        let body = field
            .bytes()
            .await
            .map_err(|e| AppError::validation(e.body_text()))?;
        if body.is_empty() {
            return Err(AppError::validation("Uploaded image is empty"));
        }
        upload = Some(UploadItem { body, content_type });
        break;
    }
    let upload = upload.ok_or_else(|| AppError::validation("image is required"))?;

    let key = upload_ad_image(&state, id, upload).await?;
    let previous = match Ad::replace_image(&state.db, id, &key).await? {
        Some(previous) => previous,
        None => {
            // Ad vanished between the lookup and the update.
            remove_objects(&state, &[key]).await;
            return Err(AppError::not_found("Ad"));
        }
    };
    if let Some(old) = previous.filter(|old| *old != key) {
        remove_objects(&state, &[old]).await;
    }
    info!(ad_id = id, key = %key, "ad image replaced");

    let row = Ad::find(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Ad"))?;
    Ok(Json(ad_response(&state, row).await?))
}

#[instrument(skip(state))]
pub async fn delete_ad(State(state): State<AppState>, Path(id): Path<i64>) -> AppResult<Json<Value>> {
    let image = match Ad::delete(&state.db, id).await? {
        Some(image) => image,
        None => {
            warn!(ad_id = id, "delete of unknown ad");
            return Err(AppError::not_found("Ad"));
        }
    };
    if let Some(key) = image {
        remove_objects(&state, &[key]).await;
    }
    info!(ad_id = id, "ad deleted");
    Ok(Json(json!({ "status": "ok" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::build_app;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    #[tokio::test]
    async fn ad_detail_requires_token() {
        let app = build_app(AppState::fake());
        let resp = app
            .oneshot(Request::get("/api/v1/ads/1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn create_ad_requires_token() {
        let app = build_app(AppState::fake());
        let resp = app
            .oneshot(
                Request::post("/api/v1/ads")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"name":"Desk"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn malformed_price_filter_is_bad_request() {
        let app = build_app(AppState::fake());
        let resp = app
            .oneshot(
                Request::get("/api/v1/ads?price_from=cheap")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_category_filter_is_bad_request() {
        let app = build_app(AppState::fake());
        let resp = app
            .oneshot(
                Request::get("/api/v1/ads?cat=1&cat=chairs")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
