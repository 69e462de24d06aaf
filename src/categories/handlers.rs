use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{info, instrument};

use super::{
    dto::{CategoryRequest, CategoryResponse},
    repo::Category,
};
use crate::{
    auth::AuthUser,
    error::{AppError, AppResult},
    images::services::remove_objects,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/:id",
            get(get_category)
                .patch(update_category)
                .delete(delete_category),
        )
}

impl From<Category> for CategoryResponse {
    fn from(c: Category) -> Self {
        Self {
            id: c.id,
            name: c.name,
        }
    }
}

#[instrument(skip(state))]
pub async fn list_categories(State(state): State<AppState>) -> AppResult<Json<Vec<CategoryResponse>>> {
    let items = Category::list(&state.db)
        .await?
        .into_iter()
        .map(CategoryResponse::from)
        .collect();
    Ok(Json(items))
}

#[instrument(skip(state))]
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<CategoryResponse>> {
    let category = Category::find(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Category"))?;
    Ok(Json(category.into()))
}

#[instrument(skip(state, body))]
pub async fn create_category(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<CategoryRequest>,
) -> AppResult<(StatusCode, Json<CategoryResponse>)> {
    let name = body.validated_name()?;
    let category = Category::create(&state.db, name).await?;
    info!(category_id = category.id, %user_id, "category created");
    Ok((StatusCode::CREATED, Json(category.into())))
}

#[instrument(skip(state, body))]
pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<CategoryRequest>,
) -> AppResult<Json<CategoryResponse>> {
    let name = body.validated_name()?;
    let category = Category::rename(&state.db, id, name)
        .await?
        .ok_or_else(|| AppError::not_found("Category"))?;
    info!(category_id = id, "category updated");
    Ok(Json(category.into()))
}

#[instrument(skip(state))]
pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Value>> {
    let images = Category::delete(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Category"))?;
    info!(category_id = id, removed_images = images.len(), "category deleted");
    remove_objects(&state, &images).await;
    Ok(Json(json!({ "status": "ok" })))
}
