use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{
    filter::{AdFilter, Page},
    repo_types::{AdFields, AdListRow, AdRow},
};

/// Columns of `AdRow`, selected from `src` aliased as `a`.
macro_rules! ad_row_select {
    ($src:literal) => {
        concat!(
            "SELECT a.id, a.name, a.author_id, u.first_name AS author_name, a.price, ",
            "a.description, a.is_published, a.category_id, c.name AS category_name, a.image ",
            "FROM ", $src, " a ",
            "LEFT JOIN users u ON u.id = a.author_id ",
            "LEFT JOIN categories c ON c.id = a.category_id"
        )
    };
}

const AD_LIST_SELECT: &str = "SELECT a.id, a.name, u.first_name AS author_name, a.price \
     FROM ads a LEFT JOIN users u ON u.id = a.author_id";

pub struct Ad;

impl Ad {
    pub async fn find(db: &PgPool, id: i64) -> Result<Option<AdRow>, sqlx::Error> {
        sqlx::query_as::<_, AdRow>(concat!(ad_row_select!("ads"), " WHERE a.id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn list(db: &PgPool, filter: &AdFilter, page: Page) -> Result<Vec<AdListRow>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new(AD_LIST_SELECT);
        filter.push_where(&mut qb);
        qb.push(" ORDER BY a.id LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset);
        qb.build_query_as::<AdListRow>().fetch_all(db).await
    }

    /// Number of ads matching `filter`, ignoring paging.
    pub async fn count(db: &PgPool, filter: &AdFilter) -> Result<i64, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM ads a");
        filter.push_where(&mut qb);
        qb.build_query_scalar::<i64>().fetch_one(db).await
    }

    /// Ads liked by `user_id`, oldest like first. The unique (user, ad)
    /// constraint keeps each ad to one row.
    pub async fn liked_by(db: &PgPool, user_id: Uuid) -> Result<Vec<AdListRow>, sqlx::Error> {
        sqlx::query_as::<_, AdListRow>(
            r#"
            SELECT a.id, a.name, u.first_name AS author_name, a.price
              FROM likes l
              JOIN ads a ON a.id = l.ad_id
              LEFT JOIN users u ON u.id = a.author_id
             WHERE l.user_id = $1
             ORDER BY l.created, l.id
            "#,
        )
        .bind(user_id)
        .fetch_all(db)
        .await
    }

    pub async fn create(db: &PgPool, f: &AdFields, is_published: bool) -> Result<AdRow, sqlx::Error> {
        sqlx::query_as::<_, AdRow>(concat!(
            "WITH ins AS (",
            "INSERT INTO ads (name, author_id, price, description, is_published, category_id) ",
            "VALUES ($1, $2, $3, $4, $5, $6) RETURNING *) ",
            ad_row_select!("ins")
        ))
        .bind(&f.name)
        .bind(f.author_id)
        .bind(f.price)
        .bind(&f.description)
        .bind(is_published)
        .bind(f.category_id)
        .fetch_one(db)
        .await
    }

    pub async fn update(db: &PgPool, id: i64, f: &AdFields) -> Result<Option<AdRow>, sqlx::Error> {
        sqlx::query_as::<_, AdRow>(concat!(
            "WITH upd AS (",
            "UPDATE ads SET name = $2, author_id = $3, price = $4, description = $5, category_id = $6 ",
            "WHERE id = $1 RETURNING *) ",
            ad_row_select!("upd")
        ))
        .bind(id)
        .bind(&f.name)
        .bind(f.author_id)
        .bind(f.price)
        .bind(&f.description)
        .bind(f.category_id)
        .fetch_optional(db)
        .await
    }

    /// Points the ad at a new image key. Returns the previous key, or `None`
    /// if the ad does not exist.
    pub async fn replace_image(
        db: &PgPool,
        id: i64,
        key: &str,
    ) -> Result<Option<Option<String>>, sqlx::Error> {
        let mut tx = db.begin().await?;
        let previous = sqlx::query_scalar::<_, Option<String>>(
            "SELECT image FROM ads WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        if previous.is_some() {
            sqlx::query("UPDATE ads SET image = $2 WHERE id = $1")
                .bind(id)
                .bind(key)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(previous)
    }

    /// Deletes the ad (its likes go with it). Returns its image key, or
    /// `None` if the ad did not exist.
    pub async fn delete(db: &PgPool, id: i64) -> Result<Option<Option<String>>, sqlx::Error> {
        sqlx::query_scalar::<_, Option<String>>("DELETE FROM ads WHERE id = $1 RETURNING image")
            .bind(id)
            .fetch_optional(db)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_select_joins_both_relations() {
        let sql = ad_row_select!("ads");
        assert!(sql.contains("LEFT JOIN users u ON u.id = a.author_id"));
        assert!(sql.contains("LEFT JOIN categories c ON c.id = a.category_id"));
        assert!(sql.starts_with("SELECT a.id, a.name, a.author_id, u.first_name AS author_name"));
    }

    #[test]
    fn list_query_appends_filter_and_page() {
        let filter = AdFilter {
            text: Some("desk".into()),
            ..AdFilter::default()
        };
        let mut qb = QueryBuilder::<Postgres>::new(AD_LIST_SELECT);
        filter.push_where(&mut qb);
        qb.push(" ORDER BY a.id LIMIT ")
            .push_bind(10_i64)
            .push(" OFFSET ")
            .push_bind(0_i64);
        assert!(qb
            .sql()
            .ends_with("WHERE a.name ILIKE $1 ORDER BY a.id LIMIT $2 OFFSET $3"));
    }
}
