use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

pub const UNIQUE_USER_AD: &str = "likes_user_ad_key";
pub const AD_FOREIGN_KEY: &str = "likes_ad_id_fkey";

#[derive(Debug, Clone, FromRow)]
pub struct LikeRow {
    pub username: String,
    pub created: OffsetDateTime,
}

/// Inserts a like. A second like by the same user on the same ad fails with
/// a unique violation on `UNIQUE_USER_AD`; an unknown ad fails on
/// `AD_FOREIGN_KEY`.
pub async fn create(db: &PgPool, user_id: Uuid, ad_id: i64) -> Result<LikeRow, sqlx::Error> {
    sqlx::query_as::<_, LikeRow>(
        r#"
        WITH ins AS (
            INSERT INTO likes (user_id, ad_id) VALUES ($1, $2)
            RETURNING user_id, created
        )
        SELECT u.username, ins.created
          FROM ins
          JOIN users u ON u.id = ins.user_id
        "#,
    )
    .bind(user_id)
    .bind(ad_id)
    .fetch_one(db)
    .await
}

pub async fn for_ad(db: &PgPool, ad_id: i64) -> Result<Vec<LikeRow>, sqlx::Error> {
    sqlx::query_as::<_, LikeRow>(
        r#"
        SELECT u.username, l.created
          FROM likes l
          JOIN users u ON u.id = l.user_id
         WHERE l.ad_id = $1
         ORDER BY l.created, l.id
        "#,
    )
    .bind(ad_id)
    .fetch_all(db)
    .await
}
