#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use userauth::config::{Config, LogFormat, SessionConfig};

pub const COOKIE_NAME: &str = "session-id";
pub const CSRF_HEADER: &str = "x-csrf-token";

/// A running test server instance with a dedicated test database.
pub struct TestApp {
    pub addr: SocketAddr,
    pub pool: PgPool,
    pub client: Client,
    pub db_name: String,
}

/// A signed-in client session: the raw cookie value and its CSRF token.
pub struct Session {
    pub cookie: String,
    pub csrf: String,
}

impl Session {
    pub fn cookie_header(&self) -> String {
        format!("{COOKIE_NAME}={}", self.cookie)
    }
}

/// Pull the session cookie value out of a response's `Set-Cookie` headers.
pub fn session_cookie(resp: &Response) -> Option<String> {
    resp.headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|v| {
            let pair = v.split(';').next()?;
            let (name, value) = pair.split_once('=')?;
            (name.trim() == COOKIE_NAME).then(|| value.trim().to_string())
        })
}

async fn into_parts(resp: Response) -> (Value, StatusCode) {
    let status = resp.status();
    let body: Value = resp.json().await.unwrap_or(json!(null));
    (body, status)
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn register_raw(&self, name: &str, email: &str, password: &str) -> Response {
        self.client
            .post(self.url("/api/v1/auth/register"))
            .json(&json!({ "name": name, "email": email, "password": password }))
            .send()
            .await
            .expect("register request failed")
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> (Value, StatusCode) {
        into_parts(self.register_raw(name, email, password).await).await
    }

    pub async fn login_raw(&self, email: &str, password: &str) -> Response {
        self.client
            .post(self.url("/api/v1/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("login request failed")
    }

    pub async fn login(&self, email: &str, password: &str) -> (Value, StatusCode) {
        into_parts(self.login_raw(email, password).await).await
    }

    /// Log in and fetch a CSRF token for the new session.
    pub async fn sign_in(&self, email: &str, password: &str) -> Session {
        let resp = self.login_raw(email, password).await;
        assert_eq!(resp.status(), StatusCode::OK, "login failed");
        let cookie = session_cookie(&resp).expect("login must set a session cookie");

        let resp = self
            .client
            .get(self.url("/api/v1/auth/token"))
            .header("cookie", format!("{COOKIE_NAME}={cookie}"))
            .send()
            .await
            .expect("token request failed");
        assert_eq!(resp.status(), StatusCode::OK, "token request failed");
        let csrf = resp
            .headers()
            .get(CSRF_HEADER)
            .and_then(|v| v.to_str().ok())
            .expect("token response must carry the csrf header")
            .to_string();

        Session { cookie, csrf }
    }

    /// Register a user and return its JSON representation.
    pub async fn create_user(&self, name: &str, email: &str, password: &str) -> Value {
        let (body, status) = self.register(name, email, password).await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        body
    }

    pub async fn get(&self, path: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("get request failed");
        into_parts(resp).await
    }

    pub async fn get_with_session(&self, path: &str, session: &Session) -> (Value, StatusCode) {
        let resp = self
            .client
            .get(self.url(path))
            .header("cookie", session.cookie_header())
            .send()
            .await
            .expect("get request failed");
        into_parts(resp).await
    }

    pub async fn put_with_session(
        &self,
        path: &str,
        session: &Session,
        csrf: Option<&str>,
        body: &Value,
    ) -> (Value, StatusCode) {
        let mut req = self
            .client
            .put(self.url(path))
            .header("cookie", session.cookie_header())
            .json(body);
        if let Some(token) = csrf {
            req = req.header(CSRF_HEADER, token);
        }
        into_parts(req.send().await.expect("put request failed")).await
    }

    pub async fn delete_with_session(
        &self,
        path: &str,
        session: &Session,
        csrf: Option<&str>,
    ) -> (Value, StatusCode) {
        let mut req = self
            .client
            .delete(self.url(path))
            .header("cookie", session.cookie_header());
        if let Some(token) = csrf {
            req = req.header(CSRF_HEADER, token);
        }
        into_parts(req.send().await.expect("delete request failed")).await
    }
}

fn admin_url(base_url: &str) -> String {
    base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/postgres"))
        .unwrap_or_else(|| base_url.to_string())
}

/// Create a throwaway database with migrations applied.
///
/// Returns `None` when `DATABASE_URL` is unset so database-backed tests can
/// bail out on machines without PostgreSQL.
pub async fn spawn_db() -> Option<(PgPool, String, String)> {
    let _ = dotenvy::dotenv();

    let Ok(base_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping database-backed test");
        return None;
    };

    let db_name = format!("userauth_test_{}", Uuid::now_v7().simple());

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url(&base_url))
        .await
        .expect("Failed to connect to postgres for test DB creation");

    sqlx::query(&format!("CREATE DATABASE \"{db_name}\""))
        .execute(&admin_pool)
        .await
        .expect("Failed to create test database");

    admin_pool.close().await;

    let test_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/{db_name}"))
        .unwrap_or_else(|| base_url.clone());

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&test_url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations on test database");

    Some((pool, test_url, db_name))
}

/// Spawn a test app with a fresh temporary database.
pub async fn spawn_app() -> Option<TestApp> {
    spawn_app_with(|_| {}).await
}

/// Like [`spawn_app`], letting the caller adjust the config first.
pub async fn spawn_app_with(configure: impl FnOnce(&mut Config)) -> Option<TestApp> {
    let (pool, test_url, db_name) = spawn_db().await?;

    let mut config = Config {
        database_url: test_url,
        csrf_secret: "test-csrf-secret".to_string(),
        host: "127.0.0.1".parse().unwrap(),
        port: 0, // unused, we bind to random port
        session: SessionConfig {
            cookie_name: COOKIE_NAME.to_string(),
            ttl: Duration::from_secs(3600),
            secure_cookie: false,
        },
        max_body_size: 65_536,
        request_timeout: Duration::from_secs(30),
        log_level: "warn".to_string(),
        log_format: LogFormat::Text,
    };
    configure(&mut config);

    let app = userauth::build_app(pool.clone(), config);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    let client = Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    Some(TestApp {
        addr,
        pool,
        client,
        db_name,
    })
}

/// Drop a test database created by [`spawn_db`].
pub async fn drop_db(pool: PgPool, db_name: &str) {
    pool.close().await;

    let base_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");
    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url(&base_url))
        .await
        .expect("Failed to connect for cleanup");

    let _ = sqlx::query(&format!("DROP DATABASE IF EXISTS \"{db_name}\" WITH (FORCE)"))
        .execute(&admin_pool)
        .await;

    admin_pool.close().await;
}

/// Drop the test database after tests complete.
pub async fn cleanup(app: TestApp) {
    let db_name = app.db_name.clone();
    drop_db(app.pool, &db_name).await;
}
