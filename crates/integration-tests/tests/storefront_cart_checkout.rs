//! Session cart, sign-in and checkout through the storefront.

use reqwest::StatusCode;
use serde_json::{Value, json};
use uuid::Uuid;
use vesture_integration_tests::fake_backend::FakeBackend;
use vesture_integration_tests::fake_tryon::{FakeTryOn, Script};
use vesture_integration_tests::{client, spawn_storefront, storefront_config};

struct Shop {
    url: String,
    backend: FakeBackend,
    http: reqwest::Client,
}

async fn shop() -> Shop {
    let backend = FakeBackend::new();
    let backend_url = backend.spawn().await;
    let provider_url = FakeTryOn::new(Script::NeverFinish).spawn().await;
    Shop {
        url: spawn_storefront(storefront_config(&backend_url, &provider_url)).await,
        backend,
        http: client(),
    }
}

impl Shop {
    async fn send(&self, request: reqwest::RequestBuilder) -> (StatusCode, Value) {
        let response = request.send().await.expect("storefront request");
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

    async fn add_to_cart(&self, product_id: Uuid, quantity: u32) -> (StatusCode, Value) {
        self.post(
            "/api/cart/items",
            &json!({ "product_id": product_id, "size": "m", "color": "Black", "quantity": quantity }),
        )
        .await
    }

    async fn sign_in(&self, email: &str, password: &str) {
        let (status, body) = self
            .post(
                "/api/auth/login",
                &json!({ "email": email, "password": password }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
    }
}

fn amount(value: &Value) -> f64 {
    match value {
        Value::String(s) => s.parse().expect("decimal string"),
        other => other.as_f64().expect("numeric amount"),
    }
}

fn address() -> Value {
    json!({
        "full_name": "Ada Lovelace",
        "line1": "12 St James's Square",
        "city": "London",
        "postal_code": "SW1Y 4JH",
        "country": "GB",
    })
}

#[tokio::test]
async fn test_catalog_lists_active_products() {
    let shop = shop().await;
    let shirt = shop.backend.add_product("Silk Shirt", "40.00", 4);
    let hidden = shop.backend.add_product("Old Stock", "10.00", 1);
    shop.backend.patch_row("products", hidden, &json!({ "is_active": false }));

    let (status, body) = shop.get("/api/products").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let ids: Vec<&str> = body["items"]
        .as_array()
        .expect("product page")
        .iter()
        .filter_map(|p| p["id"].as_str())
        .collect();
    assert_eq!(ids, vec![shirt.to_string().as_str()]);
    assert_eq!(body["items"][0]["display_price"], "$40.00");
    assert_eq!(body["has_next_page"], false);

    let (status, _) = shop.get(&format!("/api/products/{hidden}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cart_add_merge_and_totals() {
    let shop = shop().await;
    let shirt = shop.backend.add_product("Silk Shirt", "40.00", 4);

    let (status, _) = shop.add_to_cart(shirt, 1).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = shop.add_to_cart(shirt, 1).await;
    assert_eq!(status, StatusCode::OK);

    // Same product, size and color merge into one line
    let items = body["items"].as_array().expect("items");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["quantity"], 2);
    assert_eq!(items[0]["size"], "M");
    assert_eq!(items[0]["name"], "Silk Shirt");

    let totals = &body["totals"];
    assert!((amount(&totals["subtotal"]) - 80.0).abs() < f64::EPSILON);
    assert!((amount(&totals["shipping"]) - 9.99).abs() < 1e-9);
    assert!((amount(&totals["total"]) - 89.99).abs() < 1e-9);
    assert_eq!(body["display_total"], "$89.99");

    let (_, count) = shop.get("/api/cart/count").await;
    assert_eq!(count["count"], 2);

    // A fresh client has its own cart
    let (_, other) = shop
        .send(client().get(format!("{}/api/cart/count", shop.url)))
        .await;
    assert_eq!(other["count"], 0);
}

#[tokio::test]
async fn test_cart_rejects_unavailable_options_and_stock() {
    let shop = shop().await;
    let shirt = shop.backend.add_product("Silk Shirt", "40.00", 2);

    let (status, _) = shop
        .post(
            "/api/cart/items",
            &json!({ "product_id": shirt, "color": "Black" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "size is required");

    let (status, _) = shop.add_to_cart(shirt, 3).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "only 2 in stock");

    let (status, _) = shop.add_to_cart(Uuid::new_v4(), 1).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_stock_is_shared_across_sizes() {
    let shop = shop().await;
    let shirt = shop.backend.add_product("Silk Shirt", "40.00", 4);
    let add = |size: &str, quantity: u32| {
        json!({ "product_id": shirt, "size": size, "color": "Black", "quantity": quantity })
    };

    let (status, _) = shop.post("/api/cart/items", &add("S", 3)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = shop.post("/api/cart/items", &add("M", 2)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "3 small + 2 medium exceeds 4");
    let (status, _) = shop.post("/api/cart/items", &add("M", 1)).await;
    assert_eq!(status, StatusCode::OK);

    // Raising one size counts the other sizes already in the cart
    let (status, _) = shop.patch("/api/cart/items", &add("M", 2)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = shop.patch("/api/cart/items", &add("S", 2)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = shop.patch("/api/cart/items", &add("M", 2)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, count) = shop.get("/api/cart/count").await;
    assert_eq!(count["count"], 4);
}

#[tokio::test]
async fn test_cart_update_to_zero_removes_line() {
    let shop = shop().await;
    let shirt = shop.backend.add_product("Silk Shirt", "40.00", 4);
    shop.add_to_cart(shirt, 2).await;

    let mut update = json!({ "product_id": shirt, "size": "M", "color": "Black", "quantity": 3 });
    let (status, body) = shop.patch("/api/cart/items", &update).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"][0]["quantity"], 3);

    update["quantity"] = json!(0);
    let (status, body) = shop.patch("/api/cart/items", &update).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"].as_array().map(Vec::len), Some(0));
    assert!(amount(&body["totals"]["total"]).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_inactive_product_cannot_be_added() {
    let shop = shop().await;
    let retired = shop.backend.add_product("Old Stock", "10.00", 3);
    shop.backend.patch_row("products", retired, &json!({ "is_active": false }));

    let (status, _) = shop.add_to_cart(retired, 1).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, count) = shop.get("/api/cart/count").await;
    assert_eq!(count["count"], 0);
}

#[tokio::test]
async fn test_checkout_requires_sign_in() {
    let shop = shop().await;
    let (status, body) = shop
        .post("/api/checkout", &json!({ "shipping_address": address() }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Sign in required");
}

#[tokio::test]
async fn test_checkout_with_empty_cart_is_rejected() {
    let shop = shop().await;
    shop.backend.add_user("ada@example.com", "correct-horse", "customer");
    shop.sign_in("ada@example.com", "correct-horse").await;

    let (status, _) = shop
        .post("/api/checkout", &json!({ "shipping_address": address() }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(shop.backend.rows("orders").is_empty());
}

#[tokio::test]
async fn test_checkout_places_order_and_clears_cart() {
    let shop = shop().await;
    let user_id = shop.backend.add_user("ada@example.com", "correct-horse", "customer");
    let shirt = shop.backend.add_product("Silk Shirt", "40.00", 4);
    let coat = shop.backend.add_product("Wool Coat", "180.00", 1);

    // The guest cart survives sign-in
    shop.add_to_cart(shirt, 2).await;
    shop.sign_in("ada@example.com", "correct-horse").await;
    shop.add_to_cart(coat, 1).await;

    let (status, order) = shop
        .post("/api/checkout", &json!({ "shipping_address": address() }))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{order}");
    assert_eq!(order["status"], "pending");
    assert_eq!(order["user_id"], json!(user_id));
    assert_eq!(order["items"].as_array().map(Vec::len), Some(2));
    assert!((amount(&order["subtotal"]) - 260.0).abs() < f64::EPSILON);
    assert!(amount(&order["shipping"]).abs() < f64::EPSILON);
    assert!((amount(&order["total"]) - 260.0).abs() < f64::EPSILON);

    let rows = shop.backend.rows("orders");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["shipping_address"]["city"], "London");

    let (_, count) = shop.get("/api/cart/count").await;
    assert_eq!(count["count"], 0);

    let (status, orders) = shop.get("/api/account/orders").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(orders.as_array().map(Vec::len), Some(1));

    let (status, _) = shop
        .get(&format!("/api/account/orders/{}", order["id"].as_str().unwrap_or_default()))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_checkout_rechecks_stock_across_sizes() {
    let shop = shop().await;
    shop.backend.add_user("ada@example.com", "correct-horse", "customer");
    let shirt = shop.backend.add_product("Silk Shirt", "40.00", 4);
    let add = |size: &str| {
        json!({ "product_id": shirt, "size": size, "color": "Black", "quantity": 2 })
    };
    shop.post("/api/cart/items", &add("S")).await;
    shop.post("/api/cart/items", &add("M")).await;
    shop.sign_in("ada@example.com", "correct-horse").await;

    // Stock drops after the cart was filled
    shop.backend.patch_row("products", shirt, &json!({ "stock": 3 }));

    let (status, body) = shop
        .post("/api/checkout", &json!({ "shipping_address": address() }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert!(shop.backend.rows("orders").is_empty());

    let (_, count) = shop.get("/api/cart/count").await;
    assert_eq!(count["count"], 4);
}

#[tokio::test]
async fn test_login_with_wrong_password() {
    let shop = shop().await;
    shop.backend.add_user("ada@example.com", "correct-horse", "customer");

    let (status, _) = shop
        .post(
            "/api/auth/login",
            &json!({ "email": "ada@example.com", "password": "battery-staple" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = shop.get("/api/auth/me").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_signup_signs_in_and_logout_ends_session() {
    let shop = shop().await;

    let (status, body) = shop
        .post(
            "/api/auth/signup",
            &json!({ "email": "grace@example.com", "password": "cobol-forever", "full_name": "Grace" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let (status, me) = shop.get("/api/auth/me").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "grace@example.com");

    let (status, _) = shop.post("/api/auth/logout", &json!({})).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = shop.get("/api/auth/me").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
