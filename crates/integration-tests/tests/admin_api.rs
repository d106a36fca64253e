//! Admin API: sign-in, order lifecycle, dashboard and catalog management.

use reqwest::StatusCode;
use serde_json::{Value, json};
use uuid::Uuid;
use vesture_integration_tests::fake_backend::FakeBackend;
use vesture_integration_tests::{admin_config, client, spawn_admin};

const ADMIN_EMAIL: &str = "ops@vesture.test";
const ADMIN_PASSWORD: &str = "back-office-pass";

struct Admin {
    url: String,
    backend: FakeBackend,
    http: reqwest::Client,
    admin_id: Uuid,
}

async fn admin() -> Admin {
    let backend = FakeBackend::new();
    let admin_id = backend.add_user(ADMIN_EMAIL, ADMIN_PASSWORD, "admin");
    let backend_url = backend.spawn().await;
    Admin {
        url: spawn_admin(admin_config(&backend_url)).await,
        backend,
        http: client(),
        admin_id,
    }
}

impl Admin {
    async fn send(&self, request: reqwest::RequestBuilder) -> (StatusCode, Value) {
        let response = request.send().await.expect("admin request");
        let status = response.status();
        let text = response.text().await.expect("response body");
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
        (status, body)
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        self.send(self.http.get(format!("{}{path}", self.url))).await
    }

    async fn post(&self, path: &str, body: &Value) -> (StatusCode, Value) {
        self.send(self.http.post(format!("{}{path}", self.url)).json(body))
            .await
    }

    async fn patch(&self, path: &str, body: &Value) -> (StatusCode, Value) {
        self.send(self.http.patch(format!("{}{path}", self.url)).json(body))
            .await
    }

    async fn login(&self) -> Value {
        let (status, body) = self
            .post(
                "/auth/login",
                &json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body
    }

    fn add_order(&self, status: &str, total: &str) -> Uuid {
        let row = self.backend.insert(
            "orders",
            json!({
                "user_id": Uuid::new_v4(),
                "items": [],
                "subtotal": total,
                "shipping": "0",
                "tax": "0",
                "total": total,
                "status": status,
                "shipping_address": {
                    "full_name": "Ada Lovelace",
                    "line1": "12 St James's Square",
                    "city": "London",
                    "postal_code": "SW1Y 4JH",
                    "country": "GB",
                },
            }),
        );
        row["id"]
            .as_str()
            .and_then(|id| id.parse().ok())
            .expect("order id")
    }
}

fn amount(value: &Value) -> f64 {
    match value {
        Value::String(s) => s.parse().expect("decimal string"),
        other => other.as_f64().expect("numeric amount"),
    }
}

#[tokio::test]
async fn test_admin_login_sets_session() {
    let admin = admin().await;

    let (status, _) = admin.get("/api/dashboard").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let me = admin.login().await;
    assert_eq!(me["email"], ADMIN_EMAIL);
    assert_eq!(me["id"], json!(admin.admin_id));

    let (status, _) = admin.get("/api/dashboard").await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = admin.post("/auth/logout", &json!({})).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = admin.get("/api/dashboard").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_customer_cannot_sign_in_to_admin() {
    let admin = admin().await;
    admin
        .backend
        .add_user("ada@example.com", "correct-horse", "customer");

    let (status, _) = admin
        .post(
            "/auth/login",
            &json!({ "email": "ada@example.com", "password": "correct-horse" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = admin.get("/api/orders").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = admin
        .post(
            "/auth/login",
            &json!({ "email": ADMIN_EMAIL, "password": "wrong-password" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_order_status_follows_lifecycle() {
    let admin = admin().await;
    let order = admin.add_order("pending", "120.00");
    admin.login().await;
    let path = format!("/api/orders/{order}/status");

    // pending cannot jump to shipped
    let (status, _) = admin.patch(&path, &json!({ "status": "shipped" })).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = admin.patch(&path, &json!({ "status": "processing" })).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "processing");
    assert!(body["updated_at"].is_string());

    let (status, _) = admin.patch(&path, &json!({ "status": "lost" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = admin.patch(&path, &json!({ "status": "shipped" })).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let (status, _) = admin.patch(&path, &json!({ "status": "cancelled" })).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let rows = admin.backend.rows("orders");
    assert_eq!(rows[0]["status"], "shipped");

    let (status, _) = admin
        .patch(
            &format!("/api/orders/{}/status", Uuid::new_v4()),
            &json!({ "status": "processing" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_order_list_filters_by_status() {
    let admin = admin().await;
    admin.add_order("pending", "10.00");
    admin.add_order("delivered", "20.00");
    admin.login().await;

    let (status, body) = admin.get("/api/orders?status=delivered").await;
    assert_eq!(status, StatusCode::OK);
    let orders = body.as_array().expect("orders");
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["status"], "delivered");

    let (status, _) = admin.get("/api/orders?status=returned").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_order_list_is_paged() {
    let admin = admin().await;
    for _ in 0..3 {
        admin.add_order("pending", "10.00");
    }
    admin.login().await;

    let (_, first) = admin.get("/api/orders?page=1&per_page=2").await;
    let (_, second) = admin.get("/api/orders?page=2&per_page=2").await;
    assert_eq!(first.as_array().map(Vec::len), Some(2));
    assert_eq!(second.as_array().map(Vec::len), Some(1));
    assert_ne!(first[0]["id"], second[0]["id"]);
    assert_ne!(first[1]["id"], second[0]["id"]);
}

#[tokio::test]
async fn test_product_search_matches_names() {
    let admin = admin().await;
    admin.backend.add_product("Linen Dress", "120.00", 3);
    admin.backend.add_product("Wool Coat", "180.00", 3);
    admin.login().await;

    let (status, body) = admin.get("/api/products?search=LINEN").await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .expect("products")
        .iter()
        .filter_map(|p| p["name"].as_str())
        .collect();
    assert_eq!(names, ["Linen Dress"]);

    let (_, all) = admin.get("/api/products").await;
    assert_eq!(all.as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn test_dashboard_summarizes_store() {
    let admin = admin().await;
    admin.add_order("pending", "50.00");
    admin.add_order("delivered", "30.00");
    admin.add_order("cancelled", "100.00");
    admin
        .backend
        .add_user("ada@example.com", "correct-horse", "customer");
    let scarce = admin.backend.add_product("Silk Shirt", "40.00", 2);
    admin.backend.add_product("Wool Coat", "180.00", 12);
    admin.login().await;

    let (status, stats) = admin.get("/api/dashboard").await;
    assert_eq!(status, StatusCode::OK, "{stats}");

    assert_eq!(stats["total_orders"], 3);
    assert_eq!(stats["total_products"], 2);
    assert_eq!(stats["active_products"], 2);
    assert_eq!(stats["customers"], 1);
    // Cancelled orders do not count towards revenue
    assert!((amount(&stats["revenue"]) - 80.0).abs() < f64::EPSILON);

    let by_status = stats["orders_by_status"].as_array().expect("status counts");
    let cancelled = by_status
        .iter()
        .find(|s| s["status"] == "cancelled")
        .expect("cancelled count");
    assert_eq!(cancelled["count"], 1);

    let low_stock = stats["low_stock"].as_array().expect("low stock");
    assert_eq!(low_stock.len(), 1);
    assert_eq!(low_stock[0]["id"], json!(scarce));
    assert_eq!(low_stock[0]["stock"], 2);
}

#[tokio::test]
async fn test_product_management() {
    let admin = admin().await;
    admin.login().await;

    let (status, _) = admin
        .post(
            "/api/products",
            &json!({ "name": "Linen Dress", "price": "-1", "category": "dresses" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, created) = admin
        .post(
            "/api/products",
            &json!({
                "name": "Linen Dress",
                "price": "120.00",
                "category": "dresses",
                "sizes": ["S", "M"],
                "stock": 6,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    let id = created["id"].as_str().expect("product id").to_string();
    assert_eq!(created["is_active"], true);

    // A sale price must stay below the original
    let (status, _) = admin
        .patch(
            &format!("/api/products/{id}"),
            &json!({ "original_price": "100.00" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, updated) = admin
        .patch(
            &format!("/api/products/{id}"),
            &json!({ "price": "90.00", "original_price": "120.00" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{updated}");
    assert!((amount(&updated["price"]) - 90.0).abs() < f64::EPSILON);

    let (status, _) = admin.patch(&format!("/api/products/{id}"), &json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = admin
        .send(admin.http.delete(format!("{}/api/products/{id}", admin.url)))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(admin.backend.rows("products").is_empty());
}

#[tokio::test]
async fn test_role_changes() {
    let admin = admin().await;
    let customer = admin
        .backend
        .add_user("ada@example.com", "correct-horse", "customer");
    admin.login().await;

    let (status, body) = admin
        .patch(
            &format!("/api/users/{customer}/role"),
            &json!({ "role": "admin" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["role"], "admin");

    let (status, _) = admin
        .patch(
            &format!("/api/users/{}/role", admin.admin_id),
            &json!({ "role": "customer" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = admin
        .patch(
            &format!("/api/users/{customer}/role"),
            &json!({ "role": "owner" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_settings_round_trip() {
    let admin = admin().await;
    admin.login().await;

    let (status, _) = admin.get("/api/settings/announcement_bar").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let value = json!({ "text": "Free shipping over $100", "enabled": true });
    let (status, _) = admin
        .send(
            admin
                .http
                .put(format!("{}/api/settings/announcement_bar", admin.url))
                .json(&json!({ "value": value })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, setting) = admin.get("/api/settings/announcement_bar").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(setting["value"], value);

    let (status, _) = admin
        .send(
            admin
                .http
                .put(format!("{}/api/settings/Bad%20Key", admin.url))
                .json(&json!({ "value": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_is_rate_limited() {
    let admin = admin().await;
    let wrong = json!({ "email": ADMIN_EMAIL, "password": "guess" });

    for _ in 0..5 {
        let (status, _) = admin.post("/auth/login", &wrong).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let (status, _) = admin.post("/auth/login", &wrong).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    // Other routes are not limited
    let (status, _) = admin.get("/health").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_demoted_admin_loses_write_access() {
    let admin = admin().await;
    let order = admin.add_order("pending", "40.00");
    admin.login().await;

    admin
        .backend
        .patch_row("profiles", admin.admin_id, &json!({ "role": "customer" }));

    let (status, _) = admin
        .patch(
            &format!("/api/orders/{order}/status"),
            &json!({ "status": "processing" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(admin.backend.rows("orders")[0]["status"], "pending");

    // The session is gone too
    let (status, _) = admin.get("/api/dashboard").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
