//! Task-based try-on API.
//!
//! Rendering is asynchronous on the provider side:
//! 1. `POST /v1/images/kolors-virtual-try-on` creates a task and returns its id
//! 2. `GET /v1/images/kolors-virtual-try-on/{task_id}` is polled every
//!    `poll_interval` until the task succeeds or fails, at most
//!    `max_poll_attempts` times
//! 3. The first result image URL is downloaded and re-encoded as base64
//!
//! Every response is wrapped in `{ code, message, data }`; a non-zero `code`
//! is a failure even with HTTP 200.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};
use url::Url;

use super::error::TryOnError;
use super::image::ImageData;
use super::{download_image, provider_error, with_trailing_slash};
use crate::config::TaskApiConfig;

const TASK_PATH: &str = "v1/images/kolors-virtual-try-on";

/// Client for the task-based try-on API.
#[derive(Clone)]
pub struct TaskApiClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: Option<SecretString>,
    model: String,
    poll_interval: Duration,
    max_poll_attempts: u32,
}

#[derive(Serialize)]
struct CreateTaskRequest<'a> {
    model_name: &'a str,
    human_image: &'a str,
    cloth_image: &'a str,
}

#[derive(Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

#[derive(Deserialize)]
struct CreatedTask {
    task_id: String,
}

/// Provider-side task state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Submitted,
    Processing,
    Succeed,
    Failed,
    #[serde(other)]
    Unknown,
}

#[derive(Deserialize)]
struct Task {
    task_status: TaskStatus,
    #[serde(default)]
    task_status_msg: Option<String>,
    #[serde(default)]
    task_result: Option<TaskResult>,
}

#[derive(Deserialize)]
struct TaskResult {
    #[serde(default)]
    images: Vec<TaskImage>,
}

#[derive(Deserialize)]
struct TaskImage {
    url: String,
}

impl TaskApiClient {
    #[must_use]
    pub fn new(http: reqwest::Client, config: &TaskApiConfig) -> Self {
        Self {
            http,
            base_url: with_trailing_slash(config.base_url.clone()),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            poll_interval: config.poll_interval,
            max_poll_attempts: config.max_poll_attempts,
        }
    }

    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn api_key(&self) -> Result<&str, TryOnError> {
        self.api_key
            .as_ref()
            .map(|key| key.expose_secret())
            .ok_or_else(|| TryOnError::Misconfigured("TRYON_API_KEY is not set".to_string()))
    }

    fn task_url(&self, task_id: Option<&str>) -> Result<Url, TryOnError> {
        let path = match task_id {
            Some(id) => format!("{TASK_PATH}/{id}"),
            None => TASK_PATH.to_string(),
        };
        self.base_url
            .join(&path)
            .map_err(|e| TryOnError::Misconfigured(format!("invalid TRYON_API_BASE_URL: {e}")))
    }

    /// Render `garment` onto `person` and return the result image.
    ///
    /// # Errors
    ///
    /// Returns a classified [`TryOnError`] if the task cannot be created,
    /// fails, does not finish within the poll budget, or the result cannot
    /// be downloaded.
    #[instrument(skip_all)]
    pub async fn run(&self, person: &ImageData, garment: &ImageData) -> Result<ImageData, TryOnError> {
        let key = self.api_key()?;
        let task_id = self.create_task(key, person, garment).await?;
        tracing::info!(task_id = %task_id, "Try-on task created");

        let result_url = self.wait_for_result(key, &task_id).await?;
        download_image(&self.http, &result_url).await
    }

    async fn create_task(
        &self,
        key: &str,
        person: &ImageData,
        garment: &ImageData,
    ) -> Result<String, TryOnError> {
        let response = self
            .http
            .post(self.task_url(None)?)
            .bearer_auth(key)
            .json(&CreateTaskRequest {
                model_name: &self.model,
                human_image: person.base64(),
                cloth_image: garment.base64(),
            })
            .send()
            .await?;

        let created: CreatedTask = read_envelope(response).await?;
        Ok(created.task_id)
    }

    /// Poll until the task leaves the running states.
    async fn wait_for_result(&self, key: &str, task_id: &str) -> Result<String, TryOnError> {
        let url = self.task_url(Some(task_id))?;

        for attempt in 1..=self.max_poll_attempts {
            tokio::time::sleep(self.poll_interval).await;

            let response = self.http.get(url.clone()).bearer_auth(key).send().await?;
            let task: Task = read_envelope(response).await?;

            match task.task_status {
                TaskStatus::Submitted | TaskStatus::Processing => {
                    debug!(task_id, attempt, "Try-on task still running");
                }
                TaskStatus::Succeed => {
                    return task
                        .task_result
                        .and_then(|result| result.images.into_iter().next())
                        .map(|image| image.url)
                        .ok_or_else(|| {
                            TryOnError::TaskFailed("task succeeded without images".to_string())
                        });
                }
                TaskStatus::Failed => {
                    let message = task
                        .task_status_msg
                        .unwrap_or_else(|| "task failed".to_string());
                    return Err(task_failure(&message));
                }
                TaskStatus::Unknown => {
                    warn!(task_id, attempt, "Try-on task reported an unknown status");
                }
            }
        }

        Err(TryOnError::Timeout(format!(
            "task {task_id} not finished after {} polls",
            self.max_poll_attempts
        )))
    }
}

/// A failed task is reported as such unless its message names a more
/// specific category (credits, rate limit, timeout).
fn task_failure(message: &str) -> TryOnError {
    match TryOnError::classify(None, message) {
        TryOnError::Provider { message, .. } => TryOnError::TaskFailed(message),
        classified => classified,
    }
}

async fn read_envelope<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, TryOnError> {
    if !response.status().is_success() {
        return Err(provider_error(response).await);
    }

    let body = response.text().await?;
    let envelope: Envelope<T> = serde_json::from_str(&body).map_err(|e| {
        tracing::error!(
            error = %e,
            body = %body.chars().take(500).collect::<String>(),
            "Failed to parse try-on provider response"
        );
        TryOnError::Provider {
            status: None,
            message: format!("unexpected response: {e}"),
        }
    })?;

    if envelope.code != 0 {
        return Err(TryOnError::classify(None, &envelope.message));
    }

    envelope.data.ok_or_else(|| TryOnError::Provider {
        status: None,
        message: "response carried no data".to_string(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_task_status_parsing() {
        let task: Envelope<Task> = serde_json::from_str(
            r#"{"code":0,"message":"SUCCEED","data":{"task_id":"t1","task_status":"succeed",
                "task_result":{"images":[{"index":0,"url":"https://cdn.test/r.png"}]}}}"#,
        )
        .unwrap();
        let data = task.data.unwrap();
        assert_eq!(data.task_status, TaskStatus::Succeed);
        assert_eq!(data.task_result.unwrap().images[0].url, "https://cdn.test/r.png");

        let task: Task = serde_json::from_str(r#"{"task_status":"queued"}"#).unwrap();
        assert_eq!(task.task_status, TaskStatus::Unknown);
    }

    #[test]
    fn test_task_failure_classification() {
        assert!(matches!(
            task_failure("Image contains no person"),
            TryOnError::TaskFailed(_)
        ));
        assert!(matches!(
            task_failure("Account balance not enough"),
            TryOnError::InsufficientCredits(_)
        ));
    }

    #[test]
    fn test_task_url_respects_base_path() {
        let config = crate::config::tests::test_config();
        let mut task_config = config.tryon.task_api;
        task_config.base_url = Url::parse("http://127.0.0.1:9000/proxy").unwrap();
        let client = TaskApiClient::new(reqwest::Client::new(), &task_config);

        assert_eq!(
            client.task_url(Some("abc")).unwrap().as_str(),
            "http://127.0.0.1:9000/proxy/v1/images/kolors-virtual-try-on/abc"
        );
        assert!(client.is_configured());
    }

    #[tokio::test]
    async fn test_unresponsive_provider_is_timeout() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Accept connections and never answer
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let mut task_config = crate::config::tests::test_config().tryon.task_api;
        task_config.base_url = Url::parse(&format!("http://{addr}/")).unwrap();
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .unwrap();
        let client = TaskApiClient::new(http, &task_config);

        let image = ImageData::parse("iVBORw0KGgpwZXJzb24=").unwrap();
        let err = client.run(&image, &image).await.unwrap_err();

        assert!(matches!(err, TryOnError::Timeout(_)), "{err}");
        assert_eq!(err.code(), "timeout");
        assert_eq!(err.status(), axum::http::StatusCode::GATEWAY_TIMEOUT);
    }
}
