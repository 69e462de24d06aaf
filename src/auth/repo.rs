use sqlx::{PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{Location, User};

pub struct NewUser<'a> {
    pub email: &'a str,
    pub username: &'a str,
    pub first_name: Option<&'a str>,
    pub password_hash: &'a str,
}

impl User {
    /// Find a user by email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, username, first_name, password_hash, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, username, first_name, password_hash, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await
    }

    pub async fn exists(db: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
            .bind(id)
            .fetch_one(db)
            .await
    }

    /// Create a new user with hashed password.
    pub async fn create_tx(
        tx: &mut Transaction<'_, Postgres>,
        new: NewUser<'_>,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, username, first_name, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, username, first_name, password_hash, created_at
            "#,
        )
        .bind(new.email)
        .bind(new.username)
        .bind(new.first_name)
        .bind(new.password_hash)
        .fetch_one(&mut **tx)
        .await
    }
}

// ---- Locations ----

/// Links `user_id` to each named location, creating missing locations.
pub async fn attach_locations_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    names: &[String],
) -> Result<(), sqlx::Error> {
    for name in names {
        let location_id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO locations (name) VALUES ($1)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id
            "#,
        )
        .bind(name)
        .fetch_one(&mut **tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO user_locations (user_id, location_id) VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(location_id)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

pub async fn location_names_for_user(db: &PgPool, user_id: Uuid) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        r#"
        SELECT l.name
          FROM locations l
          JOIN user_locations ul ON ul.location_id = l.id
         WHERE ul.user_id = $1
         ORDER BY l.name
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
}

pub async fn list_locations(db: &PgPool) -> Result<Vec<Location>, sqlx::Error> {
    sqlx::query_as::<_, Location>("SELECT id, name, lat, lng FROM locations ORDER BY name")
        .fetch_all(db)
        .await
}

// ---- Revoked sessions ----

/// Marks `session_id` as revoked until `expires_at`, dropping entries whose
/// tokens have expired anyway. Returns `false` if it was already revoked.
pub async fn revoke_session(
    db: &PgPool,
    session_id: Uuid,
    user_id: Uuid,
    expires_at: OffsetDateTime,
) -> Result<bool, sqlx::Error> {
    let mut tx = db.begin().await?;
    sqlx::query("DELETE FROM revoked_sessions WHERE expires_at < now()")
        .execute(&mut *tx)
        .await?;
    let inserted = sqlx::query(
        r#"
        INSERT INTO revoked_sessions (session_id, user_id, expires_at)
        VALUES ($1, $2, $3)
        ON CONFLICT (session_id) DO NOTHING
        "#,
    )
    .bind(session_id)
    .bind(user_id)
    .bind(expires_at)
    .execute(&mut *tx)
    .await?
    .rows_affected();
    tx.commit().await?;
    Ok(inserted == 1)
}

pub async fn is_session_revoked(db: &PgPool, session_id: Uuid) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM revoked_sessions WHERE session_id = $1)",
    )
    .bind(session_id)
    .fetch_one(db)
    .await
}
