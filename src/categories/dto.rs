use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub const MAX_CATEGORY_NAME_LEN: usize = 20;

#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    pub id: i64,
    pub name: String,
}

/// Body for both create and update; update overwrites the name.
#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub name: String,
}

impl CategoryRequest {
    pub fn validated_name(&self) -> Result<&str, AppError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(AppError::validation("Category name must not be empty"));
        }
        if name.chars().count() > MAX_CATEGORY_NAME_LEN {
            return Err(AppError::validation(format!(
                "Category name must be at most {MAX_CATEGORY_NAME_LEN} characters"
            )));
        }
        Ok(name)
    }
}
