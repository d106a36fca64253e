//! Virtual try-on through the storefront against scripted providers.

use reqwest::StatusCode;
use serde_json::{Value, json};
use vesture_integration_tests::fake_backend::FakeBackend;
use vesture_integration_tests::fake_tryon::{FakeTryOn, Script, result_base64};
use vesture_integration_tests::{
    PERSON_PNG, client, png_base64, spawn_storefront, storefront_config,
};

struct Harness {
    storefront: String,
    backend: FakeBackend,
    provider: FakeTryOn,
    provider_url: url::Url,
    http: reqwest::Client,
}

async fn harness(provider: FakeTryOn) -> Harness {
    harness_with(provider, |_| {}).await
}

async fn harness_with(
    provider: FakeTryOn,
    customize: impl FnOnce(&mut vesture_storefront::config::StorefrontConfig),
) -> Harness {
    let backend = FakeBackend::new();
    let backend_url = backend.spawn().await;
    let provider_url = provider.spawn().await;

    let mut config = storefront_config(&backend_url, &provider_url);
    customize(&mut config);

    Harness {
        storefront: spawn_storefront(config).await,
        backend,
        provider,
        provider_url,
        http: client(),
    }
}

impl Harness {
    async fn try_on(&self, body: Value) -> (StatusCode, Value) {
        let response = self
            .http
            .post(format!("{}/functions/virtual-tryon", self.storefront))
            .json(&body)
            .send()
            .await
            .expect("try-on request");
        let status = response.status();
        let body = response.json().await.expect("JSON body");
        (status, body)
    }
}

fn upper_body_request() -> Value {
    json!({
        "personImageBase64": PERSON_PNG,
        "garmentImageBase64": png_base64(b"shirt"),
        "category": "upper_body",
    })
}

#[tokio::test]
async fn test_task_api_success_returns_result_image() {
    let h = harness(FakeTryOn::new(Script::SucceedAfter(2))).await;

    let (status, body) = h.try_on(upper_body_request()).await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], true);
    assert_eq!(
        body["image"],
        format!("data:image/png;base64,{}", result_base64("task-1"))
    );

    let tasks = h.provider.tasks();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].human_image, PERSON_PNG);
    assert_eq!(tasks[0].cloth_image, png_base64(b"shirt"));
    assert_eq!(tasks[0].model_name, "kolors-virtual-try-on-v1-5");

    // Guests get no history
    assert!(h.backend.rows("tryon_results").is_empty());
}

#[tokio::test]
async fn test_data_url_person_image_is_accepted() {
    let h = harness(FakeTryOn::new(Script::SucceedAfter(1))).await;

    let mut request = upper_body_request();
    request["personImageBase64"] = json!(format!("data:image/png;base64,{PERSON_PNG}"));
    let (status, _) = h.try_on(request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(h.provider.tasks()[0].human_image, PERSON_PNG);
}

#[tokio::test]
async fn test_failed_task_is_bad_gateway() {
    let h = harness(FakeTryOn::new(Script::FailWith(
        "Image contains no person".to_string(),
    )))
    .await;

    let (status, body) = h.try_on(upper_body_request()).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["details"], "task_failed");
    // Provider text stays out of the response
    assert!(!body["error"].as_str().unwrap_or_default().contains("no person"));
}

#[tokio::test]
async fn test_failed_task_message_is_classified() {
    let h = harness(FakeTryOn::new(Script::FailWith(
        "Account balance not enough".to_string(),
    )))
    .await;

    let (status, body) = h.try_on(upper_body_request()).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["details"], "insufficient_credits");
}

#[tokio::test]
async fn test_unfinished_task_times_out() {
    let h = harness(FakeTryOn::new(Script::NeverFinish)).await;

    let (status, body) = h.try_on(upper_body_request()).await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body["details"], "timeout");
}

#[tokio::test]
async fn test_provider_rate_limit_status() {
    let provider = FakeTryOn::new(Script::SucceedAfter(1)).failing_create(
        StatusCode::TOO_MANY_REQUESTS,
        json!({ "code": 1302, "message": "slow down" }),
    );
    let h = harness(provider).await;

    let (status, body) = h.try_on(upper_body_request()).await;

    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["details"], "rate_limited");
}

#[tokio::test]
async fn test_payment_required_is_insufficient_credits() {
    let provider = FakeTryOn::new(Script::SucceedAfter(1)).failing_create(
        StatusCode::PAYMENT_REQUIRED,
        json!({ "error": { "message": "pay up" } }),
    );
    let h = harness(provider).await;

    let (status, body) = h.try_on(upper_body_request()).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["details"], "insufficient_credits");
}

#[tokio::test]
async fn test_error_envelope_with_http_ok_is_classified() {
    let provider = FakeTryOn::new(Script::SucceedAfter(1)).failing_create(
        StatusCode::OK,
        json!({ "code": 1102, "message": "Too many requests, rate limit exceeded" }),
    );
    let h = harness(provider).await;

    let (status, body) = h.try_on(upper_body_request()).await;

    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["details"], "rate_limited");
}

#[tokio::test]
async fn test_unclassified_provider_error() {
    let provider = FakeTryOn::new(Script::SucceedAfter(1)).failing_create(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "error": "internal failure" }),
    );
    let h = harness(provider).await;

    let (status, body) = h.try_on(upper_body_request()).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["details"], "provider_error");
}

#[tokio::test]
async fn test_missing_api_key_is_misconfigured() {
    let h = harness_with(FakeTryOn::new(Script::SucceedAfter(1)), |config| {
        config.tryon.task_api.api_key = None;
    })
    .await;

    let (status, body) = h.try_on(upper_body_request()).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["details"], "misconfigured");
    assert!(h.provider.tasks().is_empty());
}

#[tokio::test]
async fn test_invalid_requests_are_rejected_before_the_provider() {
    let h = harness(FakeTryOn::new(Script::SucceedAfter(1))).await;

    let (status, body) = h
        .try_on(json!({ "garmentImageBase64": PERSON_PNG, "category": "upper_body" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"], "invalid_request");

    let (status, body) = h
        .try_on(json!({
            "personImageBase64": "%%% not base64 %%%",
            "garmentImageBase64": PERSON_PNG,
            "category": "upper_body",
        }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"], "invalid_image");

    let (status, body) = h
        .try_on(json!({ "personImageBase64": PERSON_PNG, "category": "hats" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"], "invalid_request");

    assert!(h.provider.tasks().is_empty());
}

#[tokio::test]
async fn test_full_body_chains_upper_then_lower() {
    let h = harness(FakeTryOn::new(Script::SucceedAfter(1))).await;

    let (status, body) = h
        .try_on(json!({
            "personImageBase64": PERSON_PNG,
            "upperGarmentBase64": png_base64(b"shirt"),
            "lowerGarmentBase64": png_base64(b"trousers"),
            "category": "full_body",
        }))
        .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    let tasks = h.provider.tasks();
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0].human_image, PERSON_PNG);
    assert_eq!(tasks[0].cloth_image, png_base64(b"shirt"));
    // The second pass dresses the first pass's result
    assert_eq!(tasks[1].human_image, result_base64("task-1"));
    assert_eq!(tasks[1].cloth_image, png_base64(b"trousers"));
    assert_eq!(
        body["image"],
        format!("data:image/png;base64,{}", result_base64("task-2"))
    );
}

#[tokio::test]
async fn test_garment_url_is_downloaded_first() {
    let h = harness(FakeTryOn::new(Script::SucceedAfter(1))).await;

    let garment_url = h.provider_url.join("garments/dress.png").expect("URL");
    let (status, _) = h
        .try_on(json!({
            "personImageBase64": PERSON_PNG,
            "garmentImageUrl": garment_url.as_str(),
            "category": "dresses",
        }))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        h.provider.tasks()[0].cloth_image,
        png_base64(b"garment:dress.png")
    );

    let missing_url = h.provider_url.join("garments/missing.png").expect("URL");
    let (status, body) = h
        .try_on(json!({
            "personImageBase64": PERSON_PNG,
            "garmentImageUrl": missing_url.as_str(),
            "category": "dresses",
        }))
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["details"], "download_failed");
}

#[tokio::test]
async fn test_image_generation_provider() {
    let h = harness(FakeTryOn::new(Script::NeverFinish)).await;

    let mut request = upper_body_request();
    request["provider"] = json!("image_generation");
    let (status, body) = h.try_on(request).await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(
        body["image"],
        format!("data:image/png;base64,{}", png_base64(b"generated"))
    );
    assert!(h.provider.tasks().is_empty());

    let calls = h.provider.chat_requests();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0]["model"], "test/image-model");
    let content = calls[0]["messages"][0]["content"]
        .as_array()
        .expect("content parts");
    assert_eq!(content.len(), 3);
    assert_eq!(
        content[1]["image_url"]["url"],
        format!("data:image/png;base64,{PERSON_PNG}")
    );
}

#[tokio::test]
async fn test_signed_in_try_on_is_saved_to_history() {
    let h = harness(FakeTryOn::new(Script::SucceedAfter(1))).await;
    let user_id = h.backend.add_user("ada@example.com", "correct-horse", "customer");
    let product_id = h.backend.add_product("Silk Shirt", "89.00", 4);

    let response = h
        .http
        .post(format!("{}/api/auth/login", h.storefront))
        .json(&json!({ "email": "ada@example.com", "password": "correct-horse" }))
        .send()
        .await
        .expect("login");
    assert_eq!(response.status(), StatusCode::OK);

    let mut request = upper_body_request();
    request["productId"] = json!(product_id);
    let (status, body) = h.try_on(request).await;
    assert_eq!(status, StatusCode::OK);

    let rows = h.backend.rows("tryon_results");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["user_id"], json!(user_id));
    assert_eq!(rows[0]["product_id"], json!(product_id));
    assert_eq!(rows[0]["category"], "upper_body");
    assert_eq!(rows[0]["provider"], "task_api");
    assert_eq!(rows[0]["result_image"], body["image"]);

    let history: Value = h
        .http
        .get(format!("{}/api/account/try-ons", h.storefront))
        .send()
        .await
        .expect("history")
        .json()
        .await
        .expect("JSON body");
    assert_eq!(history.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_forwarded_for_does_not_reset_rate_limit() {
    let h = harness(FakeTryOn::new(Script::SucceedAfter(1))).await;

    let mut statuses = Vec::new();
    for n in 1..=4 {
        let response = h
            .http
            .post(format!("{}/functions/virtual-tryon", h.storefront))
            .header("x-forwarded-for", format!("198.51.100.{n}"))
            .json(&json!({ "category": "upper_body" }))
            .send()
            .await
            .expect("try-on request");
        statuses.push(response.status());
    }

    // Burst of three per peer address, whatever the headers claim
    assert_eq!(
        statuses,
        vec![
            StatusCode::BAD_REQUEST,
            StatusCode::BAD_REQUEST,
            StatusCode::BAD_REQUEST,
            StatusCode::TOO_MANY_REQUESTS,
        ]
    );
}
