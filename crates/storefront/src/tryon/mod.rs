//! Virtual try-on orchestration.
//!
//! A try-on composites a garment onto a photo of the shopper using one of two
//! third-party providers:
//! - [`task_api`] - create task, poll status, download result (default)
//! - [`image_gen`] - a single chat-completion call returning an image
//!
//! Full-body try-ons chain two runs: the upper garment is applied to the
//! person, then the lower garment is applied to that intermediate result.
//! Nothing is retried beyond the task poll loop.

pub mod error;
pub mod image;
pub mod image_gen;
pub mod request;
pub mod task_api;

use std::time::Duration;

use tracing::{info, instrument};
use url::Url;
use vesture_core::{TryOnCategory, TryOnProvider};

use crate::config::TryOnConfig;

pub use error::TryOnError;
pub use image::{ImageData, ImageError, MAX_IMAGE_BYTES};
pub use image_gen::ImageGenClient;
pub use request::{GarmentSource, Garments, TryOnJob, TryOnRequest};
pub use task_api::TaskApiClient;

const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// Runs try-on jobs against the configured providers.
#[derive(Clone)]
pub struct TryOnService {
    http: reqwest::Client,
    task_api: TaskApiClient,
    image_gen: ImageGenClient,
}

impl TryOnService {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &TryOnConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self {
            task_api: TaskApiClient::new(http.clone(), &config.task_api),
            image_gen: ImageGenClient::new(http.clone(), &config.image_gen),
            http,
        })
    }

    /// Whether `provider` has credentials.
    #[must_use]
    pub const fn is_available(&self, provider: TryOnProvider) -> bool {
        match provider {
            TryOnProvider::TaskApi => self.task_api.is_configured(),
            TryOnProvider::ImageGeneration => self.image_gen.is_configured(),
        }
    }

    /// Run a job and return the final image.
    ///
    /// # Errors
    ///
    /// Returns [`TryOnError::Misconfigured`] when the provider has no key,
    /// otherwise the first classified failure of the run.
    #[instrument(skip(self, job), fields(category = job.category.as_str(), provider = job.provider.as_str()))]
    pub async fn run(&self, job: &TryOnJob) -> Result<ImageData, TryOnError> {
        if !self.is_available(job.provider) {
            return Err(TryOnError::Misconfigured(format!(
                "no API key for provider {}",
                job.provider.as_str()
            )));
        }

        match &job.garments {
            Garments::Single(source) => {
                let garment = self.resolve_garment(source).await?;
                self.render(job.provider, &job.person, &garment, job.category)
                    .await
            }
            Garments::FullBody { upper, lower } => {
                info!("Applying upper garment");
                let dressed = self
                    .render(job.provider, &job.person, upper, TryOnCategory::UpperBody)
                    .await?;
                info!("Applying lower garment to the upper-body result");
                self.render(job.provider, &dressed, lower, TryOnCategory::LowerBody)
                    .await
            }
        }
    }

    async fn render(
        &self,
        provider: TryOnProvider,
        person: &ImageData,
        garment: &ImageData,
        category: TryOnCategory,
    ) -> Result<ImageData, TryOnError> {
        match provider {
            TryOnProvider::TaskApi => self.task_api.run(person, garment).await,
            TryOnProvider::ImageGeneration => self.image_gen.run(person, garment, category).await,
        }
    }

    async fn resolve_garment(&self, source: &GarmentSource) -> Result<ImageData, TryOnError> {
        match source {
            GarmentSource::Inline(image) => Ok(image.clone()),
            GarmentSource::Url(url) => download_image(&self.http, url.as_str()).await,
        }
    }
}

// =============================================================================
// Shared HTTP helpers
// =============================================================================

/// Fetch an image and re-encode it as base64.
pub(crate) async fn download_image(
    http: &reqwest::Client,
    url: &str,
) -> Result<ImageData, TryOnError> {
    let response = http
        .get(url)
        .send()
        .await
        .map_err(|e| TryOnError::Download(format!("request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(TryOnError::Download(format!("status {status}")));
    }
    if response
        .content_length()
        .is_some_and(|len| len > MAX_IMAGE_BYTES as u64)
    {
        return Err(TryOnError::Download(format!(
            "image exceeds {MAX_IMAGE_BYTES} bytes"
        )));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    let bytes = response
        .bytes()
        .await
        .map_err(|e| TryOnError::Download(format!("reading body failed: {e}")))?;

    ImageData::from_bytes(&bytes, content_type.as_deref())
        .map_err(|e| TryOnError::Download(e.to_string()))
}

/// Error body shapes returned by providers: `{"message"}`,
/// `{"error": {"message"}}` or `{"error": "..."}`.
pub(crate) async fn provider_error(response: reqwest::Response) -> TryOnError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|json| {
            json.get("message")
                .or_else(|| json.pointer("/error/message"))
                .or_else(|| json.get("error"))
                .and_then(|v| v.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| body.chars().take(500).collect());

    tracing::warn!(status = %status, message = %message, "Try-on provider returned error");
    TryOnError::classify(Some(status.as_u16()), &message)
}

pub(crate) fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_availability_follows_keys() {
        let config = crate::config::tests::test_config();
        let service = TryOnService::new(&config.tryon).unwrap();
        assert!(service.is_available(TryOnProvider::TaskApi));
        assert!(!service.is_available(TryOnProvider::ImageGeneration));
    }

    #[test]
    fn test_with_trailing_slash() {
        let url = with_trailing_slash(Url::parse("https://api.test/v1").unwrap());
        assert_eq!(url.join("chat/completions").unwrap().as_str(), "https://api.test/v1/chat/completions");
        let url = with_trailing_slash(Url::parse("https://api.test").unwrap());
        assert_eq!(url.as_str(), "https://api.test/");
    }

    #[tokio::test]
    async fn test_missing_provider_key_is_misconfigured() {
        let config = crate::config::tests::test_config();
        let service = TryOnService::new(&config.tryon).unwrap();
        let person = ImageData::parse("iVBORw0KGgo=").unwrap();
        let job = TryOnJob {
            person: person.clone(),
            garments: Garments::Single(GarmentSource::Inline(person)),
            category: TryOnCategory::UpperBody,
            provider: TryOnProvider::ImageGeneration,
            product_id: None,
        };
        let err = service.run(&job).await.unwrap_err();
        assert!(matches!(err, TryOnError::Misconfigured(_)));
    }
}
