use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ads::repo_types::{AdFields, AdListRow};
use crate::error::AppError;
use crate::likes::dto::LikeResponse;

pub const MAX_NAME_LEN: usize = 100;
pub const MAX_DESCRIPTION_LEN: usize = 1000;

/// Query string of `GET /ads`. Values stay raw strings so malformed numbers
/// are reported by the filter builder instead of the extractor.
#[derive(Debug, Default, Deserialize)]
pub struct AdListQuery {
    #[serde(default)]
    pub cat: Vec<String>,
    pub text: Option<String>,
    #[serde(default)]
    pub location: Vec<String>,
    pub price_from: Option<String>,
    pub price_to: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

/// List shape.
#[derive(Debug, Serialize)]
pub struct AdListItem {
    pub id: i64,
    pub name: String,
    pub username: Option<String>,
    pub price: i32,
}

impl From<AdListRow> for AdListItem {
    fn from(r: AdListRow) -> Self {
        Self {
            id: r.id,
            name: r.name,
            username: r.author_name,
            price: r.price,
        }
    }
}

/// Detail shape with the nested likes.
#[derive(Debug, Serialize)]
pub struct AdDetail {
    pub id: i64,
    pub name: String,
    pub username: Option<String>,
    pub price: i32,
    pub description: Option<String>,
    pub is_published: bool,
    pub name_category: Option<String>,
    pub image: Option<String>,
    pub likes: Vec<LikeResponse>,
}

/// Returned by create, update and image upload.
#[derive(Debug, Serialize)]
pub struct AdResponse {
    pub id: i64,
    pub name: String,
    pub author_id: Option<Uuid>,
    pub author: Option<String>,
    pub price: i32,
    pub description: Option<String>,
    pub is_published: bool,
    pub category_id: Option<i64>,
    pub name_category: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateAdRequest {
    pub name: String,
    pub author_id: Uuid,
    pub price: i64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_published: bool,
    pub category_id: i64,
}

/// Update overwrites every field listed here; `is_published` and the image
/// are left alone.
#[derive(Debug, Deserialize)]
pub struct UpdateAdRequest {
    pub name: String,
    pub author_id: Uuid,
    pub price: i64,
    #[serde(default)]
    pub description: Option<String>,
    pub category_id: i64,
}

impl CreateAdRequest {
    pub fn validate(self) -> Result<(AdFields, bool), AppError> {
        let fields = validate_fields(
            self.name,
            self.author_id,
            self.price,
            self.description,
            self.category_id,
        )?;
        Ok((fields, self.is_published))
    }
}

impl UpdateAdRequest {
    pub fn validate(self) -> Result<AdFields, AppError> {
        validate_fields(
            self.name,
            self.author_id,
            self.price,
            self.description,
            self.category_id,
        )
    }
}

fn validate_fields(
    name: String,
    author_id: Uuid,
    price: i64,
    description: Option<String>,
    category_id: i64,
) -> Result<AdFields, AppError> {
    let name = name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::validation("Ad name must not be empty"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::validation(format!(
            "Ad name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    let price = i32::try_from(price)
        .ok()
        .filter(|p| *p >= 0)
        .ok_or_else(|| AppError::validation("Price must be a non-negative integer"))?;
    if description
        .as_deref()
        .is_some_and(|d| d.chars().count() > MAX_DESCRIPTION_LEN)
    {
        return Err(AppError::validation(format!(
            "Description must be at most {MAX_DESCRIPTION_LEN} characters"
        )));
    }
    Ok(AdFields {
        name,
        author_id,
        price,
        description,
        category_id,
    })
}
