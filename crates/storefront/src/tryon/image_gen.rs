//! Chat-completion image generation provider.
//!
//! One synchronous call: a text instruction plus the person and garment as
//! inline data URLs. The rendered image comes back in the assistant message's
//! `images` list, usually as a data URL.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use url::Url;
use vesture_core::TryOnCategory;

use super::error::TryOnError;
use super::image::ImageData;
use super::{download_image, provider_error, with_trailing_slash};
use crate::config::ImageGenConfig;

/// Client for the image generation API.
#[derive(Clone)]
pub struct ImageGenClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: Option<SecretString>,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    modalities: [&'static str; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: Vec<ContentPart<'a>>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize, Deserialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    images: Vec<GeneratedImage>,
}

#[derive(Deserialize)]
struct GeneratedImage {
    image_url: ImageUrl,
}

impl ImageGenClient {
    #[must_use]
    pub fn new(http: reqwest::Client, config: &ImageGenConfig) -> Self {
        Self {
            http,
            base_url: with_trailing_slash(config.base_url.clone()),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }

    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Render `garment` onto `person`.
    ///
    /// # Errors
    ///
    /// Returns a classified [`TryOnError`] if the call fails or the model
    /// returns no image.
    #[instrument(skip(self, person, garment))]
    pub async fn run(
        &self,
        person: &ImageData,
        garment: &ImageData,
        category: TryOnCategory,
    ) -> Result<ImageData, TryOnError> {
        let key = self
            .api_key
            .as_ref()
            .map(|key| key.expose_secret())
            .ok_or_else(|| TryOnError::Misconfigured("IMAGE_GEN_API_KEY is not set".to_string()))?;
        let url = self
            .base_url
            .join("chat/completions")
            .map_err(|e| TryOnError::Misconfigured(format!("invalid IMAGE_GEN_API_BASE_URL: {e}")))?;

        let request = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: vec![
                    ContentPart::Text {
                        text: instruction(category),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: person.to_data_url(),
                        },
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: garment.to_data_url(),
                        },
                    },
                ],
            }],
            modalities: ["image", "text"],
        };

        let response = self
            .http
            .post(url)
            .bearer_auth(key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(provider_error(response).await);
        }

        let body = response.text().await?;
        let parsed: ChatResponse = serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse image generation response"
            );
            TryOnError::Provider {
                status: None,
                message: format!("unexpected response: {e}"),
            }
        })?;

        let message = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| TryOnError::TaskFailed("response had no choices".to_string()))?;

        let Some(image) = message.images.into_iter().next() else {
            let text = message.content.unwrap_or_default();
            return Err(TryOnError::TaskFailed(format!(
                "model returned no image: {}",
                text.chars().take(200).collect::<String>()
            )));
        };

        let url = image.image_url.url;
        if url.starts_with("data:") {
            ImageData::parse(&url)
                .map_err(|e| TryOnError::TaskFailed(format!("model returned a bad image: {e}")))
        } else {
            download_image(&self.http, &url).await
        }
    }
}

/// Instruction sent with the two images (person first, garment second).
fn instruction(category: TryOnCategory) -> &'static str {
    match category {
        TryOnCategory::UpperBody => {
            "Virtual try-on. Dress the person in the first image in the top from the second image. \
             Replace only their upper-body clothing, keep their face, pose, body shape, lower-body \
             clothing and the background unchanged. Return a single photorealistic image."
        }
        TryOnCategory::LowerBody => {
            "Virtual try-on. Dress the person in the first image in the bottoms from the second \
             image. Replace only their lower-body clothing, keep their face, pose, body shape, \
             upper-body clothing and the background unchanged. Return a single photorealistic image."
        }
        TryOnCategory::Dresses | TryOnCategory::FullBody => {
            "Virtual try-on. Dress the person in the first image in the outfit from the second \
             image. Replace their clothing, keep their face, pose, body shape and the background \
             unchanged. Return a single photorealistic image."
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let request = ChatRequest {
            model: "m",
            messages: [ChatMessage {
                role: "user",
                content: vec![
                    ContentPart::Text { text: "hi" },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: "data:image/png;base64,AA==".to_string(),
                        },
                    },
                ],
            }],
            modalities: ["image", "text"],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["content"][0]["type"], "text");
        assert_eq!(json["messages"][0]["content"][1]["type"], "image_url");
        assert_eq!(
            json["messages"][0]["content"][1]["image_url"]["url"],
            "data:image/png;base64,AA=="
        );
        assert_eq!(json["modalities"][0], "image");
    }

    #[test]
    fn test_response_image_extraction() {
        let parsed: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"Here you go",
                "images":[{"type":"image_url","image_url":{"url":"data:image/png;base64,iVBORw0KGgo="}}]}}]}"#,
        )
        .unwrap();
        let message = parsed.choices.into_iter().next().unwrap().message;
        assert_eq!(
            message.images[0].image_url.url,
            "data:image/png;base64,iVBORw0KGgo="
        );
    }

    #[test]
    fn test_instruction_mentions_garment_placement() {
        assert!(instruction(TryOnCategory::UpperBody).contains("upper-body"));
        assert!(instruction(TryOnCategory::LowerBody).contains("lower-body"));
    }
}
