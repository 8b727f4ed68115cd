#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use copydesk::api::{self, AppState};
use copydesk::db::init_db;
use copydesk::{Config, Decimal, ProfileSource, Repository, WalletPolicy};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

pub struct TestApp {
    pub app: axum::Router,
    pub state: AppState,
    _temp: TempDir,
}

pub fn test_config(wallet_policy: WalletPolicy) -> Config {
    Config {
        port: 0,
        database_path: ":memory:".to_string(),
        public_base_url: "https://desk.example.com".to_string(),
        profiles_api: None,
        agent_commission_pct: Decimal::from_i64(30),
        wallet_policy,
    }
}

pub async fn setup_test_app(wallet_policy: WalletPolicy) -> TestApp {
    setup_with_source(wallet_policy, None).await
}

pub async fn setup_with_source(
    wallet_policy: WalletPolicy,
    source: Option<Arc<dyn ProfileSource>>,
) -> TestApp {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let pool = init_db(&db_path).await.expect("init_db failed");

    let repo = Arc::new(Repository::new(pool));
    let state = AppState::new(repo, test_config(wallet_policy), source);
    let app = api::create_router(state.clone());

    TestApp {
        app,
        state,
        _temp: temp_dir,
    }
}

impl TestApp {
    pub async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.dispatch(req).await
    }

    pub async fn send_text(&self, method: &str, uri: &str, body: &str) -> (StatusCode, Value) {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "text/csv")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.dispatch(req).await
    }

    async fn dispatch(&self, req: Request<Body>) -> (StatusCode, Value) {
        let res = self.app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send("GET", uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send("POST", uri, Some(body)).await
    }

    /// Create a user through the admin endpoint and return its uniqueId.
    pub async fn create_user(&self, username: &str) -> String {
        let (status, body) = self
            .post(
                "/v1/users",
                json!({"username": username, "email": format!("{}@example.com", username)}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["uniqueId"].as_str().unwrap().to_string()
    }

    pub async fn assign_plan(&self, user: &str, plan: &str) -> Value {
        let (status, body) = self
            .post("/v1/user-plans", json!({"userId": user, "plan": plan}))
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        body
    }

    pub async fn wallet_balance(&self, user: &str) -> f64 {
        let (status, body) = self.get(&format!("/v1/wallets/{}", user)).await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        body["balance"].as_f64().unwrap()
    }
}

pub fn approx(actual: &Value, expected: f64) {
    let actual = actual.as_f64().unwrap_or(f64::NAN);
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {}, got {}",
        expected,
        actual
    );
}
