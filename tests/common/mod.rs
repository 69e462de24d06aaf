#![allow(dead_code)]

use std::sync::Arc;

use adboard::{
    app::build_app,
    state::{test_config, AppState, MemoryStorage},
};
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use sqlx::{Connection, Executor, PgConnection, PgPool};
use tower::ServiceExt;
use uuid::Uuid;

pub struct TestApp {
    pub router: Router,
    pub db: PgPool,
    pub storage: Arc<MemoryStorage>,
}

pub struct TestUser {
    pub id: Uuid,
    pub token: String,
}

/// Creates a fresh database next to `TEST_DATABASE_URL`, migrates it and
/// builds the router on top. Returns `None` when Postgres is unavailable.
pub async fn spawn_app() -> Option<TestApp> {
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("Skipping test: TEST_DATABASE_URL is not set");
        return None;
    };
    let (base, _) = url.rsplit_once('/')?;
    let database_name = Uuid::new_v4().to_string();

    let mut connection = match PgConnection::connect(&url).await {
        Ok(c) => c,
        Err(err) => {
            eprintln!("Skipping test: failed to connect to postgres: {}", err);
            return None;
        }
    };
    connection
        .execute(format!(r#"CREATE DATABASE "{}""#, database_name).as_str())
        .await
        .expect("create test database");

    let database_url = format!("{}/{}", base, database_name);
    let db = PgPool::connect(&database_url).await.expect("connect test database");
    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .expect("run migrations");

    let storage = Arc::new(MemoryStorage::default());
    let state = AppState::from_parts(
        db.clone(),
        Arc::new(test_config(&database_url)),
        storage.clone(),
    );

    Some(TestApp {
        router: build_app(state),
        db,
        storage,
    })
}

impl TestApp {
    pub async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let resp = self.router.clone().oneshot(req).await.expect("router call");
        let status = resp.status();
        let body = to_bytes(resp.into_body(), usize::MAX).await.expect("body");
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    pub async fn json(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(format!("/api/v1{}", uri));
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        let req = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");
        self.send(req).await
    }

    pub async fn register(&self, username: &str, first_name: Option<&str>, locations: &[&str]) -> TestUser {
        let (status, body) = self
            .json(
                "POST",
                "/auth/register",
                None,
                Some(serde_json::json!({
                    "email": format!("{}@example.com", username),
                    "password": "correct-horse",
                    "username": username,
                    "first_name": first_name,
                    "locations": locations,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register {}: {}", username, body);
        TestUser {
            id: body["user"]["id"].as_str().unwrap().parse().unwrap(),
            token: body["access_token"].as_str().unwrap().to_string(),
        }
    }

    pub async fn create_category(&self, token: &str, name: &str) -> i64 {
        let (status, body) = self
            .json(
                "POST",
                "/categories",
                Some(token),
                Some(serde_json::json!({ "name": name })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["id"].as_i64().unwrap()
    }

    pub async fn create_ad(&self, user: &TestUser, name: &str, price: i64, category_id: i64) -> i64 {
        let (status, body) = self
            .json(
                "POST",
                "/ads",
                Some(&user.token),
                Some(serde_json::json!({
                    "name": name,
                    "author_id": user.id,
                    "price": price,
                    "description": "test ad",
                    "is_published": true,
                    "category_id": category_id,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["id"].as_i64().unwrap()
    }

    pub async fn upload_image(&self, ad_id: i64, bytes: &[u8]) -> (StatusCode, Value) {
        self.upload_part(ad_id, "image", "image/png", bytes).await
    }

    /// Sends a single-part multipart form to the ad image endpoint.
    pub async fn upload_part(
        &self,
        ad_id: i64,
        field: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> (StatusCode, Value) {
        let boundary = "adboard-test-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{b}\r\nContent-Disposition: form-data; name=\"{f}\"; filename=\"desk.png\"\r\n\
                 Content-Type: {ct}\r\n\r\n",
                b = boundary,
                f = field,
                ct = content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

        let req = Request::post(format!("/api/v1/ads/{}/image", ad_id))
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(body))
            .expect("request");
        self.send(req).await
    }

    pub async fn list_ads(&self, query: &str) -> Vec<String> {
        let (status, body) = self.json("GET", &format!("/ads{}", query), None, None).await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        body.as_array()
            .unwrap()
            .iter()
            .map(|ad| ad["name"].as_str().unwrap().to_string())
            .collect()
    }
}
