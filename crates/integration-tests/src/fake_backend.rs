//! In-process stand-in for the hosted backend.
//!
//! Serves just enough of the table API (`/rest/v1/{table}`) and the auth API
//! (`/auth/v1/*`) for the storefront and admin routers to run against it.
//! Rows are kept as JSON; filters support the operators the repositories
//! send (`eq`, `neq`, `lt`, `lte`, `gte`, `in`, `ilike`) plus `limit` and
//! `offset`.
//! Row-level security is not emulated.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use url::Url;
use uuid::Uuid;

use crate::serve;

type Params = Vec<(String, String)>;

/// Parameters that are not column filters.
const RESERVED_PARAMS: &[&str] = &["select", "order", "limit", "offset", "on_conflict"];

#[derive(Debug, Clone)]
struct FakeUser {
    id: Uuid,
    email: String,
    password: String,
}

#[derive(Default)]
struct Store {
    tables: HashMap<String, Vec<Value>>,
    users: Vec<FakeUser>,
}

/// Shared handle to the fake backend's data.
#[derive(Clone, Default)]
pub struct FakeBackend {
    store: Arc<Mutex<Store>>,
}

impl FakeBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_store<T>(&self, f: impl FnOnce(&mut Store) -> T) -> T {
        let mut store = self.store.lock().expect("fake backend lock poisoned");
        f(&mut store)
    }

    /// Add a row as-is, filling `id` and `created_at` when missing.
    pub fn insert(&self, table: &str, row: Value) -> Value {
        let row = with_defaults(row);
        self.with_store(|store| {
            store
                .tables
                .entry(table.to_string())
                .or_default()
                .push(row.clone());
        });
        row
    }

    /// Current rows of `table`.
    #[must_use]
    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.with_store(|store| store.tables.get(table).cloned().unwrap_or_default())
    }

    /// Merge `patch` into the row of `table` with this `id`.
    pub fn patch_row(&self, table: &str, id: Uuid, patch: &Value) {
        let id = id.to_string();
        self.with_store(|store| {
            if let Some(row) = store
                .tables
                .get_mut(table)
                .and_then(|rows| rows.iter_mut().find(|r| r["id"] == id.as_str()))
            {
                merge(row, patch);
            }
        });
    }

    /// Register an account and its profile row. Returns the user id.
    pub fn add_user(&self, email: &str, password: &str, role: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.with_store(|store| {
            store.users.push(FakeUser {
                id,
                email: email.to_string(),
                password: password.to_string(),
            });
        });
        self.insert(
            "profiles",
            json!({ "id": id, "email": email, "full_name": null, "role": role }),
        );
        id
    }

    /// Insert an active product and return its id.
    pub fn add_product(&self, name: &str, price: &str, stock: i32) -> Uuid {
        let row = self.insert(
            "products",
            json!({
                "name": name,
                "description": format!("{name} description"),
                "price": price,
                "original_price": null,
                "category": "tops",
                "brand": "Vesture",
                "images": [format!("https://cdn.test/{}.jpg", name.to_lowercase().replace(' ', "-"))],
                "sizes": ["S", "M", "L"],
                "colors": ["Black"],
                "stock": stock,
                "is_new": true,
                "is_featured": true,
                "is_active": true,
            }),
        );
        row.get("id")
            .and_then(Value::as_str)
            .and_then(|id| id.parse().ok())
            .expect("inserted product has an id")
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/rest/v1/", get(|| async { Json(json!({})) }))
            .route(
                "/rest/v1/{table}",
                get(select_rows)
                    .post(insert_rows)
                    .patch(update_rows)
                    .delete(delete_rows),
            )
            .route("/auth/v1/token", post(token))
            .route("/auth/v1/signup", post(signup))
            .route("/auth/v1/user", get(current_user))
            .route("/auth/v1/logout", post(|| async { StatusCode::NO_CONTENT }))
            .with_state(self.clone())
    }

    /// Serve on an ephemeral port and return the base URL.
    pub async fn spawn(&self) -> Url {
        let addr = serve(self.router()).await;
        Url::parse(&format!("http://{addr}/")).expect("valid fake backend URL")
    }
}

fn with_defaults(row: Value) -> Value {
    let Value::Object(mut map) = row else {
        return row;
    };
    map.entry("id").or_insert_with(|| json!(Uuid::new_v4()));
    map.entry("created_at")
        .or_insert_with(|| json!(Utc::now().to_rfc3339()));
    Value::Object(map)
}

// =============================================================================
// Filters
// =============================================================================

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    as_text(value).parse().ok()
}

fn matches_filter(row: &Value, column: &str, condition: &str) -> bool {
    let Some((op, operand)) = condition.split_once('.') else {
        return true;
    };
    let value = row.get(column).unwrap_or(&Value::Null);
    let compare = |check: fn(f64, f64) -> bool| {
        match (as_number(value), operand.parse::<f64>().ok()) {
            (Some(a), Some(b)) => check(a, b),
            _ => false,
        }
    };

    match op {
        "eq" => as_text(value) == operand,
        "neq" => as_text(value) != operand,
        "lt" => compare(|a, b| a < b),
        "lte" => compare(|a, b| a <= b),
        "gte" => compare(|a, b| a >= b),
        "in" => operand
            .trim_start_matches('(')
            .trim_end_matches(')')
            .split(',')
            .map(|v| v.trim_matches('"'))
            .any(|v| v == as_text(value)),
        "ilike" => as_text(value)
            .to_lowercase()
            .contains(&operand.trim_matches('*').to_lowercase()),
        _ => true,
    }
}

fn row_matches(row: &Value, params: &Params) -> bool {
    params
        .iter()
        .filter(|(key, _)| !RESERVED_PARAMS.contains(&key.as_str()))
        .all(|(column, condition)| matches_filter(row, column, condition))
}

fn param<'a>(params: &'a Params, key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

// =============================================================================
// Table handlers
// =============================================================================

async fn select_rows(
    State(backend): State<FakeBackend>,
    Path(table): Path<String>,
    Query(params): Query<Params>,
) -> Json<Vec<Value>> {
    let limit = param(&params, "limit")
        .and_then(|l| l.parse().ok())
        .unwrap_or(usize::MAX);
    let offset = param(&params, "offset")
        .and_then(|o| o.parse().ok())
        .unwrap_or(0);
    let rows = backend
        .rows(&table)
        .into_iter()
        .filter(|row| row_matches(row, &params))
        .skip(offset)
        .take(limit)
        .collect();
    Json(rows)
}

async fn insert_rows(
    State(backend): State<FakeBackend>,
    Path(table): Path<String>,
    Query(params): Query<Params>,
    Json(body): Json<Value>,
) -> Response {
    let incoming = match body {
        Value::Array(rows) => rows,
        row => vec![row],
    };
    let on_conflict = param(&params, "on_conflict").map(String::from);

    let stored: Vec<Value> = backend.with_store(|store| {
        let rows = store.tables.entry(table).or_default();
        incoming
            .into_iter()
            .map(|row| {
                if let Some(key) = &on_conflict
                    && let Some(existing) = rows
                        .iter_mut()
                        .find(|r| r.get(key).is_some() && r.get(key) == row.get(key))
                {
                    merge(existing, &row);
                    return existing.clone();
                }
                let row = with_defaults(row);
                rows.push(row.clone());
                row
            })
            .collect()
    });

    (StatusCode::CREATED, Json(stored)).into_response()
}

fn merge(target: &mut Value, patch: &Value) {
    if let (Value::Object(target), Value::Object(patch)) = (target, patch) {
        for (key, value) in patch {
            target.insert(key.clone(), value.clone());
        }
    }
}

async fn update_rows(
    State(backend): State<FakeBackend>,
    Path(table): Path<String>,
    Query(params): Query<Params>,
    Json(patch): Json<Value>,
) -> Json<Vec<Value>> {
    let updated = backend.with_store(|store| {
        store
            .tables
            .entry(table)
            .or_default()
            .iter_mut()
            .filter(|row| row_matches(row, &params))
            .map(|row| {
                merge(row, &patch);
                row.clone()
            })
            .collect()
    });
    Json(updated)
}

async fn delete_rows(
    State(backend): State<FakeBackend>,
    Path(table): Path<String>,
    Query(params): Query<Params>,
) -> StatusCode {
    backend.with_store(|store| {
        store
            .tables
            .entry(table)
            .or_default()
            .retain(|row| !row_matches(row, &params));
    });
    StatusCode::NO_CONTENT
}

// =============================================================================
// Auth handlers
// =============================================================================

#[derive(Deserialize)]
struct TokenRequest {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
}

fn session_json(user: &FakeUser) -> Value {
    json!({
        "access_token": format!("access-{}", user.id),
        "refresh_token": format!("refresh-{}", user.id),
        "expires_in": 3600,
        "user": { "id": user.id, "email": user.email, "user_metadata": {} },
    })
}

fn auth_error(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(json!({ "error": "invalid_grant", "error_description": message })),
    )
        .into_response()
}

async fn token(
    State(backend): State<FakeBackend>,
    Query(params): Query<HashMap<String, String>>,
    Json(request): Json<TokenRequest>,
) -> Response {
    let users = backend.with_store(|store| store.users.clone());
    let user = match params.get("grant_type").map(String::as_str) {
        Some("password") => users.iter().find(|u| {
            Some(u.email.as_str()) == request.email.as_deref()
                && Some(u.password.as_str()) == request.password.as_deref()
        }),
        Some("refresh_token") => users.iter().find(|u| {
            request.refresh_token.as_deref() == Some(format!("refresh-{}", u.id).as_str())
        }),
        _ => None,
    };

    match user {
        Some(user) => Json(session_json(user)).into_response(),
        None => auth_error(StatusCode::BAD_REQUEST, "Invalid login credentials"),
    }
}

async fn signup(
    State(backend): State<FakeBackend>,
    Json(request): Json<TokenRequest>,
) -> Response {
    let (Some(email), Some(password)) = (request.email, request.password) else {
        return auth_error(StatusCode::UNPROCESSABLE_ENTITY, "email and password required");
    };
    let id = backend.add_user(&email, &password, "customer");
    let user = FakeUser {
        id,
        email,
        password,
    };
    Json(session_json(&user)).into_response()
}

async fn current_user(State(backend): State<FakeBackend>, headers: HeaderMap) -> Response {
    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer access-"))
        .unwrap_or_default()
        .to_string();
    let users = backend.with_store(|store| store.users.clone());
    match users.iter().find(|u| u.id.to_string() == token) {
        Some(user) => Json(json!({
            "id": user.id,
            "email": user.email,
            "user_metadata": Map::new(),
        }))
        .into_response(),
        None => auth_error(StatusCode::UNAUTHORIZED, "invalid JWT"),
    }
}
