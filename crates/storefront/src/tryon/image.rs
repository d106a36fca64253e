//! Base64 image payloads.
//!
//! Clients send images either as bare base64 or as `data:<mime>;base64,...`
//! URLs. Both are validated (decodable, non-empty, at most
//! [`MAX_IMAGE_BYTES`] decoded) before anything is sent to a provider.

use base64::{Engine, engine::general_purpose::STANDARD};
use thiserror::Error;

/// Largest accepted decoded image size (10 MiB).
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

const DEFAULT_MIME: &str = "image/jpeg";

/// Errors validating an image payload.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("image is empty")]
    Empty,
    #[error("malformed data URL")]
    InvalidDataUrl,
    #[error("image is not valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
    #[error("image is {size} bytes, the limit is {max}")]
    TooLarge { size: usize, max: usize },
    #[error("unsupported content type: {0}")]
    UnsupportedType(String),
}

/// A validated image held as base64.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageData {
    mime: String,
    base64: String,
}

impl std::fmt::Debug for ImageData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageData")
            .field("mime", &self.mime)
            .field("base64_len", &self.base64.len())
            .finish()
    }
}

impl ImageData {
    /// Parse bare base64 or a base64 data URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is empty, malformed, not an image
    /// type, or larger than [`MAX_IMAGE_BYTES`].
    pub fn parse(input: &str) -> Result<Self, ImageError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ImageError::Empty);
        }

        let (declared_mime, payload) = match input.strip_prefix("data:") {
            Some(rest) => {
                let (header, payload) = rest.split_once(',').ok_or(ImageError::InvalidDataUrl)?;
                let mime = header
                    .strip_suffix(";base64")
                    .ok_or(ImageError::InvalidDataUrl)?;
                (Some(mime), payload)
            }
            None => (None, input),
        };

        // Line-wrapped base64 is common from mobile clients
        let payload: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        if payload.is_empty() {
            return Err(ImageError::Empty);
        }

        // Size check before decoding: 4 base64 chars carry 3 bytes
        let estimated = payload.len() / 4 * 3;
        if estimated > MAX_IMAGE_BYTES + 3 {
            return Err(ImageError::TooLarge {
                size: estimated,
                max: MAX_IMAGE_BYTES,
            });
        }

        let bytes = STANDARD.decode(&payload)?;
        check_size(bytes.len())?;

        let mime = match declared_mime {
            Some(mime) => image_mime(mime)?,
            None => sniff_mime(&bytes).to_string(),
        };

        Ok(Self {
            mime,
            base64: payload,
        })
    }

    /// Wrap downloaded bytes. `content_type` comes from the response header.
    ///
    /// # Errors
    ///
    /// Returns an error if `bytes` is empty, too large, or not an image.
    pub fn from_bytes(bytes: &[u8], content_type: Option<&str>) -> Result<Self, ImageError> {
        if bytes.is_empty() {
            return Err(ImageError::Empty);
        }
        check_size(bytes.len())?;

        // Storage buckets often serve images as application/octet-stream
        let mime = match content_type.map(|ct| ct.split(';').next().unwrap_or(ct).trim()) {
            Some(ct) if ct.starts_with("image/") => ct.to_string(),
            Some("application/octet-stream" | "binary/octet-stream") | None => {
                sniff_mime(bytes).to_string()
            }
            Some(other) => return Err(ImageError::UnsupportedType(other.to_string())),
        };

        Ok(Self {
            mime,
            base64: STANDARD.encode(bytes),
        })
    }

    #[must_use]
    pub fn mime(&self) -> &str {
        &self.mime
    }

    /// Base64 without a data URL prefix.
    #[must_use]
    pub fn base64(&self) -> &str {
        &self.base64
    }

    /// `data:<mime>;base64,<payload>`.
    #[must_use]
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, self.base64)
    }
}

fn check_size(size: usize) -> Result<(), ImageError> {
    if size > MAX_IMAGE_BYTES {
        return Err(ImageError::TooLarge {
            size,
            max: MAX_IMAGE_BYTES,
        });
    }
    Ok(())
}

fn image_mime(mime: &str) -> Result<String, ImageError> {
    let mime = mime.trim().to_ascii_lowercase();
    if mime.is_empty() {
        return Ok(DEFAULT_MIME.to_string());
    }
    if !mime.starts_with("image/") {
        return Err(ImageError::UnsupportedType(mime));
    }
    Ok(mime)
}

/// Identify common image formats by magic bytes.
fn sniff_mime(bytes: &[u8]) -> &'static str {
    match bytes {
        [0x89, b'P', b'N', b'G', ..] => "image/png",
        [0xFF, 0xD8, 0xFF, ..] => "image/jpeg",
        [b'G', b'I', b'F', b'8', ..] => "image/gif",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "image/webp",
        _ => DEFAULT_MIME,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const PNG_HEADER: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn test_parse_bare_base64_sniffs_type() {
        let encoded = STANDARD.encode(PNG_HEADER);
        let image = ImageData::parse(&encoded).unwrap();
        assert_eq!(image.mime(), "image/png");
        assert_eq!(image.base64(), encoded);
    }

    #[test]
    fn test_parse_data_url_keeps_declared_type() {
        let encoded = STANDARD.encode(b"not really a webp");
        let image = ImageData::parse(&format!("data:image/webp;base64,{encoded}")).unwrap();
        assert_eq!(image.mime(), "image/webp");
        assert_eq!(image.to_data_url(), format!("data:image/webp;base64,{encoded}"));
    }

    #[test]
    fn test_parse_strips_line_breaks() {
        let encoded = STANDARD.encode([0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3, 4, 5]);
        let wrapped = format!("{}\n{}", &encoded[..4], &encoded[4..]);
        let image = ImageData::parse(&wrapped).unwrap();
        assert_eq!(image.mime(), "image/jpeg");
        assert_eq!(image.base64(), encoded);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(matches!(ImageData::parse("   "), Err(ImageError::Empty)));
        assert!(matches!(
            ImageData::parse("data:image/png,abcd"),
            Err(ImageError::InvalidDataUrl)
        ));
        assert!(matches!(
            ImageData::parse("data:image/png;base64,"),
            Err(ImageError::Empty)
        ));
        assert!(matches!(
            ImageData::parse("%%%not-base64%%%"),
            Err(ImageError::InvalidBase64(_))
        ));
        let text = STANDARD.encode(b"hello");
        assert!(matches!(
            ImageData::parse(&format!("data:text/plain;base64,{text}")),
            Err(ImageError::UnsupportedType(_))
        ));
    }

    #[test]
    fn test_parse_rejects_oversized_payload() {
        let encoded = "A".repeat((MAX_IMAGE_BYTES / 3 + 8) * 4);
        assert!(matches!(
            ImageData::parse(&encoded),
            Err(ImageError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_from_bytes_content_types() {
        let image = ImageData::from_bytes(&PNG_HEADER, Some("image/png; charset=binary")).unwrap();
        assert_eq!(image.mime(), "image/png");

        let image = ImageData::from_bytes(&PNG_HEADER, Some("application/octet-stream")).unwrap();
        assert_eq!(image.mime(), "image/png");

        assert!(matches!(
            ImageData::from_bytes(b"<html>", Some("text/html")),
            Err(ImageError::UnsupportedType(_))
        ));
        assert!(matches!(
            ImageData::from_bytes(&[], None),
            Err(ImageError::Empty)
        ));
    }
}
