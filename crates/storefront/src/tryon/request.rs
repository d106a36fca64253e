//! Try-on request body and its validation into a runnable job.

use serde::Deserialize;
use url::Url;
use vesture_core::{ProductId, TryOnCategory, TryOnProvider};

use super::error::TryOnError;
use super::image::ImageData;

/// Body of `POST /functions/virtual-tryon`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TryOnRequest {
    #[serde(default)]
    pub person_image_base64: Option<String>,
    #[serde(default)]
    pub garment_image_url: Option<String>,
    #[serde(default)]
    pub garment_image_base64: Option<String>,
    #[serde(default)]
    pub upper_garment_base64: Option<String>,
    #[serde(default)]
    pub lower_garment_base64: Option<String>,
    pub category: TryOnCategory,
    #[serde(default)]
    pub provider: Option<TryOnProvider>,
    #[serde(default)]
    pub product_id: Option<ProductId>,
}

/// Where a single garment comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GarmentSource {
    /// Downloaded before submission.
    Url(Url),
    Inline(ImageData),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Garments {
    Single(GarmentSource),
    FullBody { upper: ImageData, lower: ImageData },
}

/// A validated try-on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TryOnJob {
    pub person: ImageData,
    pub garments: Garments,
    pub category: TryOnCategory,
    pub provider: TryOnProvider,
    pub product_id: Option<ProductId>,
}

impl TryOnRequest {
    /// Validate images and pick the garment inputs for the category.
    ///
    /// # Errors
    ///
    /// Returns [`TryOnError::InvalidRequest`] when required images are
    /// missing or ambiguous, and [`TryOnError::Image`] when one fails to
    /// decode.
    pub fn resolve(self) -> Result<TryOnJob, TryOnError> {
        let person = non_blank(self.person_image_base64.as_deref())
            .ok_or_else(|| invalid("personImageBase64 is required"))
            .and_then(|raw| Ok(ImageData::parse(raw)?))?;

        let garments = if self.category == TryOnCategory::FullBody {
            let upper = non_blank(self.upper_garment_base64.as_deref());
            let lower = non_blank(self.lower_garment_base64.as_deref());
            match (upper, lower) {
                (Some(upper), Some(lower)) => Garments::FullBody {
                    upper: ImageData::parse(upper)?,
                    lower: ImageData::parse(lower)?,
                },
                _ => {
                    return Err(invalid(
                        "full_body needs both upperGarmentBase64 and lowerGarmentBase64",
                    ));
                }
            }
        } else {
            Garments::Single(self.single_garment()?)
        };

        Ok(TryOnJob {
            person,
            garments,
            category: self.category,
            provider: self.provider.unwrap_or_default(),
            product_id: self.product_id,
        })
    }

    fn single_garment(&self) -> Result<GarmentSource, TryOnError> {
        // The garment slot matching the category is accepted as inline input
        let slot = match self.category {
            TryOnCategory::UpperBody => self.upper_garment_base64.as_deref(),
            TryOnCategory::LowerBody => self.lower_garment_base64.as_deref(),
            TryOnCategory::Dresses | TryOnCategory::FullBody => None,
        };
        let inline = non_blank(self.garment_image_base64.as_deref()).or_else(|| non_blank(slot));
        let url = non_blank(self.garment_image_url.as_deref());

        match (url, inline) {
            (Some(_), Some(_)) => Err(invalid(
                "send either garmentImageUrl or garmentImageBase64, not both",
            )),
            (Some(url), None) => parse_garment_url(url).map(GarmentSource::Url),
            (None, Some(raw)) => Ok(GarmentSource::Inline(ImageData::parse(raw)?)),
            (None, None) => Err(invalid(
                "garmentImageUrl or garmentImageBase64 is required",
            )),
        }
    }
}

fn parse_garment_url(raw: &str) -> Result<Url, TryOnError> {
    let url = Url::parse(raw).map_err(|_| invalid("garmentImageUrl is not a valid URL"))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(invalid("garmentImageUrl must be http or https")),
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn invalid(message: &str) -> TryOnError {
    TryOnError::InvalidRequest(message.to_string())
}
