//! Scripted stand-in for the try-on providers.
//!
//! One server plays both providers:
//! - the task API (`/v1/images/kolors-virtual-try-on`), whose tasks follow a
//!   [`Script`]
//! - the image generation API (`/chat/completions`)
//!
//! It also hosts result images under `/results/` and garment photos under
//! `/garments/`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use url::Url;

use crate::{png_base64, png_bytes, serve};

/// How tasks behave once created.
#[derive(Debug, Clone)]
pub enum Script {
    /// Report `processing` for the first `n - 1` polls, then succeed.
    SucceedAfter(u32),
    /// Fail on the first poll with this message.
    FailWith(String),
    /// Stay `processing` forever.
    NeverFinish,
}

/// A task as submitted by the storefront.
#[derive(Debug, Clone)]
pub struct CreatedTask {
    pub id: String,
    pub model_name: String,
    pub human_image: String,
    pub cloth_image: String,
}

struct ProviderState {
    script: Script,
    create_failure: Option<(StatusCode, Value)>,
    tasks: Vec<CreatedTask>,
    polls: HashMap<String, u32>,
    chat_requests: Vec<Value>,
    base_url: Option<Url>,
}

#[derive(Clone)]
pub struct FakeTryOn {
    state: Arc<Mutex<ProviderState>>,
}

impl FakeTryOn {
    #[must_use]
    pub fn new(script: Script) -> Self {
        Self {
            state: Arc::new(Mutex::new(ProviderState {
                script,
                create_failure: None,
                tasks: Vec::new(),
                polls: HashMap::new(),
                chat_requests: Vec::new(),
                base_url: None,
            })),
        }
    }

    /// Answer task creation with `status` and `body` instead of a task id.
    #[must_use]
    pub fn failing_create(self, status: StatusCode, body: Value) -> Self {
        self.with_state(|state| state.create_failure = Some((status, body)));
        self
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut ProviderState) -> T) -> T {
        let mut state = self.state.lock().expect("fake try-on lock poisoned");
        f(&mut state)
    }

    /// Tasks created so far, in order.
    #[must_use]
    pub fn tasks(&self) -> Vec<CreatedTask> {
        self.with_state(|state| state.tasks.clone())
    }

    /// Bodies of image generation calls received so far.
    #[must_use]
    pub fn chat_requests(&self) -> Vec<Value> {
        self.with_state(|state| state.chat_requests.clone())
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/v1/images/kolors-virtual-try-on", post(create_task))
            .route("/v1/images/kolors-virtual-try-on/{task_id}", get(poll_task))
            .route("/results/{file}", get(result_image))
            .route("/garments/{file}", get(garment_image))
            .route("/chat/completions", post(chat_completion))
            .with_state(self.clone())
    }

    /// Serve on an ephemeral port and return the base URL.
    pub async fn spawn(&self) -> Url {
        let addr = serve(self.router()).await;
        let url = Url::parse(&format!("http://{addr}/")).expect("valid fake try-on URL");
        self.with_state(|state| state.base_url = Some(url.clone()));
        url
    }
}

/// Bytes served as the result of `task_id`.
#[must_use]
pub fn result_png(task_id: &str) -> Vec<u8> {
    png_bytes(format!("result:{task_id}").as_bytes())
}

/// Base64 of the result of `task_id`, as it comes back to the shopper.
#[must_use]
pub fn result_base64(task_id: &str) -> String {
    png_base64(format!("result:{task_id}").as_bytes())
}

fn envelope(data: Value) -> Json<Value> {
    Json(json!({ "code": 0, "message": "SUCCEED", "request_id": "req", "data": data }))
}

fn png_response(bytes: Vec<u8>) -> Response {
    ([(header::CONTENT_TYPE, "image/png")], bytes).into_response()
}

#[derive(Deserialize)]
struct CreateTaskBody {
    model_name: String,
    human_image: String,
    cloth_image: String,
}

async fn create_task(State(fake): State<FakeTryOn>, Json(body): Json<CreateTaskBody>) -> Response {
    fake.with_state(|state| {
        if let Some((status, error)) = &state.create_failure {
            return (*status, Json(error.clone())).into_response();
        }
        let id = format!("task-{}", state.tasks.len() + 1);
        state.tasks.push(CreatedTask {
            id: id.clone(),
            model_name: body.model_name,
            human_image: body.human_image,
            cloth_image: body.cloth_image,
        });
        envelope(json!({ "task_id": id, "task_status": "submitted" })).into_response()
    })
}

async fn poll_task(State(fake): State<FakeTryOn>, Path(task_id): Path<String>) -> Response {
    fake.with_state(|state| {
        if !state.tasks.iter().any(|t| t.id == task_id) {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({ "code": 1203, "message": "task not found" })),
            )
                .into_response();
        }

        let polls = state.polls.entry(task_id.clone()).or_default();
        *polls += 1;

        let data = match &state.script {
            Script::SucceedAfter(n) if *polls >= *n => {
                let base = state
                    .base_url
                    .as_ref()
                    .map_or_else(String::new, Url::to_string);
                json!({
                    "task_id": task_id,
                    "task_status": "succeed",
                    "task_result": { "images": [{ "index": 0, "url": format!("{base}results/{task_id}.png") }] },
                })
            }
            Script::SucceedAfter(_) | Script::NeverFinish => {
                json!({ "task_id": task_id, "task_status": "processing" })
            }
            Script::FailWith(message) => json!({
                "task_id": task_id,
                "task_status": "failed",
                "task_status_msg": message,
            }),
        };
        envelope(data).into_response()
    })
}

async fn result_image(Path(file): Path<String>) -> Response {
    let task_id = file.trim_end_matches(".png");
    png_response(result_png(task_id))
}

async fn garment_image(Path(file): Path<String>) -> Response {
    if file.starts_with("missing") {
        return StatusCode::NOT_FOUND.into_response();
    }
    png_response(png_bytes(format!("garment:{file}").as_bytes()))
}

async fn chat_completion(State(fake): State<FakeTryOn>, Json(body): Json<Value>) -> Json<Value> {
    fake.with_state(|state| state.chat_requests.push(body));
    let image = format!("data:image/png;base64,{}", png_base64(b"generated"));
    Json(json!({
        "id": "gen-1",
        "choices": [{
            "message": {
                "role": "assistant",
                "content": "Here is the try-on.",
                "images": [{ "type": "image_url", "image_url": { "url": image } }],
            },
        }],
    }))
}
