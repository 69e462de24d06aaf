use sqlx::FromRow;
use uuid::Uuid;

/// An ad joined with its author's display name and its category name.
#[derive(Debug, Clone, FromRow)]
pub struct AdRow {
    pub id: i64,
    pub name: String,
    pub author_id: Option<Uuid>,
    pub author_name: Option<String>,
    pub price: i32,
    pub description: Option<String>,
    pub is_published: bool,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub image: Option<String>,
}

impl AdRow {
    /// Name of the ad's category, `None` when the ad has no category.
    pub fn name_category(&self) -> Option<&str> {
        self.category_id.and(self.category_name.as_deref())
    }

    /// Display name of the author, `None` when the ad has no author.
    pub fn username(&self) -> Option<&str> {
        self.author_id.and(self.author_name.as_deref())
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct AdListRow {
    pub id: i64,
    pub name: String,
    pub author_name: Option<String>,
    pub price: i32,
}

/// Column values written by create and update.
#[derive(Debug, Clone)]
pub struct AdFields {
    pub name: String,
    pub author_id: Uuid,
    pub price: i32,
    pub description: Option<String>,
    pub category_id: i64,
}
