use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

use axum::Router;
use axum::body::Body;
use axum::body::Bytes;
use axum::http::Method;
use axum::http::Request;
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::http::header::LOCATION;
use chrono::DateTime;
use chrono::TimeDelta;
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::Map;
use serde_json::Value;
use sqlx::SqlitePool;
use tower::Service;

use crate::create_router;
use crate::database::CreateAliasValues;
use crate::database::Database;
use crate::database::DatabaseConfig;
use crate::database::UpdateStatusValues;
use crate::generator::AddressGenerator;
use crate::lifecycle::Lifecycle;
use crate::provider;
use crate::provider::RuleProvider;

/// Domain of every alias generated in tests
pub const DOMAIN: &str = "example.com";

/// Test helper version of Alias struct
#[derive(Debug, Clone)]
pub struct Alias {
    pub id: i64,
    pub address: String,
    pub rule_id: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Error response
#[derive(Debug, PartialEq, Eq)]
pub struct Error {
    pub error: String,
    pub description: Option<String>,
}

/// Everything a test needs to poke at
pub struct TestApp {
    pub app: Router,
    pub provider: FakeProvider,
    pub lifecycle: Lifecycle<FakeProvider>,
}

/// Provider keeping its rules in memory
///
/// Records every call and can be told to fail
#[derive(Clone, Debug, Default)]
pub struct FakeProvider {
    state: Arc<Mutex<FakeState>>,
}

#[derive(Debug, Default)]
struct FakeState {
    next_rule: u32,
    rules: HashMap<String, bool>,
    created: Vec<String>,
    set_enabled: Vec<(String, bool)>,
    deleted: Vec<String>,
    fail_create: bool,
    fail_set_enabled: bool,
    fail_delete: bool,
}

impl FakeProvider {
    pub fn fail_create(&self, fail: bool) {
        self.state.lock().unwrap().fail_create = fail;
    }

    pub fn fail_set_enabled(&self, fail: bool) {
        self.state.lock().unwrap().fail_set_enabled = fail;
    }

    pub fn fail_delete(&self, fail: bool) {
        self.state.lock().unwrap().fail_delete = fail;
    }

    /// Addresses rules were created for, in order
    pub fn created(&self) -> Vec<String> {
        self.state.lock().unwrap().created.clone()
    }

    /// Enable/disable calls, in order
    pub fn set_enabled(&self) -> Vec<(String, bool)> {
        self.state.lock().unwrap().set_enabled.clone()
    }

    /// Rule IDs delete was called for, in order
    pub fn deleted(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted.clone()
    }

    /// Is the rule enabled? `None` when it does not exist
    pub fn rule_enabled(&self, rule_id: &str) -> Option<bool> {
        self.state.lock().unwrap().rules.get(rule_id).copied()
    }
}

impl RuleProvider for FakeProvider {
    async fn create_rule(&self, address: &str, enabled: bool) -> provider::Result<String> {
        let mut state = self.state.lock().unwrap();

        if state.fail_create {
            return Err(provider::Error::Api(Some("Rule limit reached".to_string())));
        }

        state.next_rule += 1;
        let rule_id = format!("rule-{}", state.next_rule);

        state.rules.insert(rule_id.clone(), enabled);
        state.created.push(address.to_string());

        Ok(rule_id)
    }

    async fn set_rule_enabled(&self, rule_id: &str, enabled: bool) -> provider::Result<()> {
        let mut state = self.state.lock().unwrap();

        state.set_enabled.push((rule_id.to_string(), enabled));

        if state.fail_set_enabled {
            return Err(provider::Error::Transport("connection reset".to_string()));
        }

        match state.rules.get_mut(rule_id) {
            Some(rule) => {
                *rule = enabled;
                Ok(())
            }
            None => Err(provider::Error::Api(None)),
        }
    }

    async fn delete_rule(&self, rule_id: &str) -> provider::Result<()> {
        let mut state = self.state.lock().unwrap();

        state.deleted.push(rule_id.to_string());

        if state.fail_delete {
            return Err(provider::Error::Transport("operation timed out".to_string()));
        }

        state.rules.remove(rule_id);

        Ok(())
    }
}

/// Setup the app with a fake provider and a fixed seed for addresses
pub async fn setup_test_app(pool: SqlitePool) -> TestApp {
    let database = Database::from_config(DatabaseConfig::ExistingConnection(pool))
        .await
        .unwrap();

    let provider = FakeProvider::default();

    let lifecycle = Lifecycle::new(
        database,
        provider.clone(),
        AddressGenerator::from_seed(42, DOMAIN),
    );

    TestApp {
        app: create_router(lifecycle.clone()),
        provider,
        lifecycle,
    }
}

/// Insert an alias directly, bypassing the provider
pub async fn insert_alias(
    test_app: &TestApp,
    address: &str,
    rule_id: &str,
    expires_at: DateTime<Utc>,
) -> i64 {
    let values = CreateAliasValues {
        address,
        rule_id,
        expires_at: &expires_at,
    };

    test_app
        .lifecycle
        .database()
        .create_alias(&values)
        .await
        .unwrap()
}

/// Overwrite status and rule of an alias directly
pub async fn set_status(test_app: &TestApp, id: i64, status: crate::aliases::Status, rule_id: &str) {
    let values = UpdateStatusValues { status, rule_id };

    test_app
        .lifecycle
        .database()
        .update_status_and_rule(id, &values)
        .await
        .unwrap();
}

pub async fn root(app: &mut Router) -> (StatusCode, Option<String>, String) {
    let request = Request::builder()
        .method(Method::GET)
        .uri("/")
        .body(Body::empty())
        .unwrap();

    let response = app.call(request).await.unwrap();

    let status_code = response.status();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .map(|header| header.to_str().unwrap().to_string());

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body = String::from_utf8_lossy(&body[..]).to_string();

    (status_code, content_type, body)
}

pub async fn maybe_generate(app: &mut Router) -> (StatusCode, Option<String>, Option<String>) {
    maybe_generate_with_method(app, Method::POST).await
}

pub async fn maybe_generate_with_method(
    app: &mut Router,
    method: Method,
) -> (StatusCode, Option<String>, Option<String>) {
    let request = Request::builder()
        .method(method)
        .uri("/api/generate")
        .body(Body::empty())
        .unwrap();

    call_lifecycle_endpoint(app, request).await
}

/// Call `/api/<action>?id=<id>`
///
/// Returns the status code, the redirect location and the error message
pub async fn maybe_call(
    app: &mut Router,
    action: &str,
    id: &str,
) -> (StatusCode, Option<String>, Option<String>) {
    let request = Request::builder()
        .method(Method::GET)
        .uri(format!("/api/{action}?id={id}"))
        .body(Body::empty())
        .unwrap();

    call_lifecycle_endpoint(app, request).await
}

/// Call `/api/<action>?id=<id>`, expecting the redirect back to the list
pub async fn call(app: &mut Router, action: &str, id: i64) {
    let (status_code, location, error) = maybe_call(app, action, &id.to_string()).await;

    assert_eq!(None, error);
    assert_eq!(StatusCode::SEE_OTHER, status_code);
    assert_eq!(Some("/".to_string()), location);
}

/// Call `/api/<action>` with a raw query string, returning the full error
pub async fn maybe_call_with_query(
    app: &mut Router,
    action: &str,
    query: &str,
) -> (StatusCode, Option<Error>) {
    let request = Request::builder()
        .method(Method::GET)
        .uri(format!("/api/{action}{query}"))
        .body(Body::empty())
        .unwrap();

    let response = app.call(request).await.unwrap();
    let status_code = response.status();

    let body = response.into_body().collect().await.unwrap().to_bytes();

    (
        status_code,
        if status_code.is_client_error() {
            Some(get_error(&body))
        } else {
            None
        },
    )
}

async fn call_lifecycle_endpoint(
    app: &mut Router,
    request: Request<Body>,
) -> (StatusCode, Option<String>, Option<String>) {
    let response = app.call(request).await.unwrap();
    let status_code = response.status();

    let location = response
        .headers()
        .get(LOCATION)
        .map(|header| header.to_str().unwrap().to_string());

    let body = response.into_body().collect().await.unwrap().to_bytes();

    (
        status_code,
        location,
        if status_code.is_client_error() || status_code.is_server_error() {
            Some(get_error_message(&body))
        } else {
            None
        },
    )
}

pub async fn list_aliases(app: &mut Router) -> Vec<Alias> {
    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/aliases")
        .body(Body::empty())
        .unwrap();

    let response = app.call(request).await.unwrap();
    let status_code = response.status();

    let body = response.into_body().collect().await.unwrap().to_bytes();

    assert_eq!(StatusCode::OK, status_code);

    get_aliases(&body)
}

pub async fn single_alias(app: &mut Router, id: i64) -> Alias {
    list_aliases(app)
        .await
        .into_iter()
        .find(|alias| alias.id == id)
        .unwrap()
}

/// Assert two moments are close enough to be the same for a test
pub fn assert_about(expected: DateTime<Utc>, actual: DateTime<Utc>) {
    let difference = (expected - actual).abs();

    assert!(
        difference < TimeDelta::seconds(5),
        "expected {actual} to be about {expected}"
    );
}

fn value_to_alias(alias: &Map<String, Value>) -> Alias {
    let parse_time = |value: &Value| {
        DateTime::parse_from_rfc3339(value.as_str().unwrap())
            .unwrap()
            .with_timezone(&Utc)
    };

    Alias {
        id: alias["id"].as_i64().unwrap(),
        address: alias["address"].as_str().map(ToString::to_string).unwrap(),
        rule_id: alias["ruleId"].as_str().map(ToString::to_string).unwrap(),
        status: alias["status"].as_str().map(ToString::to_string).unwrap(),
        created_at: parse_time(&alias["createdAt"]),
        expires_at: parse_time(&alias["expiresAt"]),
    }
}

fn get_aliases(body: &Bytes) -> Vec<Alias> {
    serde_json::from_slice::<Value>(&body[..]).unwrap()["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f.as_object().unwrap())
        .map(value_to_alias)
        .collect()
}

fn value_to_error(error: &Map<String, Value>) -> Error {
    Error {
        error: error["error"].as_str().map(ToString::to_string).unwrap(),
        description: error
            .get("description")
            .and_then(|description| description.as_str().map(ToString::to_string)),
    }
}

fn get_error(body: &Bytes) -> Error {
    serde_json::from_slice::<Value>(&body[..])
        .unwrap()
        .as_object()
        .map(value_to_error)
        .unwrap()
}

fn get_error_message(body: &Bytes) -> String {
    serde_json::from_slice::<Value>(&body[..])
        .map(|value| value["error"].as_str().map(ToString::to_string))
        .ok()
        .flatten()
        .unwrap_or_else(|| String::from_utf8_lossy(&body[..]).to_string())
}
