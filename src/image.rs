use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use std::path::Path;
use tracing::debug;

use crate::api_types::ApiImagePayload;
use crate::error::TurnError;
use crate::models::ImageRef;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub mime_type: String,
    pub base64_data: String,
}

impl EncodedImage {
    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            mime_type: mime_type.into(),
            base64_data: BASE64.encode(bytes),
        }
    }

    pub fn to_data_url(&self) -> ImageRef {
        ImageRef(format!("data:{};base64,{}", self.mime_type, self.base64_data))
    }

    /// Splits `data:<mime>;base64,<payload>` back into its parts.
    pub fn from_data_url(url: &str) -> Result<Self, TurnError> {
        let rest = url
            .strip_prefix("data:")
            .ok_or_else(|| TurnError::ImageEncodingFailure("not a data URL".into()))?;
        let (header, data) = rest
            .split_once(',')
            .ok_or_else(|| TurnError::ImageEncodingFailure("data URL without payload".into()))?;
        let mime_type = header
            .strip_suffix(";base64")
            .filter(|m| m.starts_with("image/"))
            .ok_or_else(|| TurnError::ImageEncodingFailure(format!("unsupported data URL header {header:?}")))?;
        BASE64
            .decode(data)
            .map_err(|e| TurnError::ImageEncodingFailure(format!("invalid base64 payload: {e}")))?;
        Ok(Self {
            mime_type: mime_type.to_string(),
            base64_data: data.to_string(),
        })
    }

    pub fn to_payload(&self) -> ApiImagePayload {
        ApiImagePayload {
            mime_type: self.mime_type.clone(),
            base64_data: self.base64_data.clone(),
        }
    }
}

pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "heic" => Some("image/heic"),
        _ => None,
    }
}

/// Reads an image file for a turn. Fails before any extraction call is made.
pub fn encode_image_file(path: &Path) -> Result<EncodedImage, TurnError> {
    let mime = mime_for_path(path).ok_or_else(|| {
        TurnError::ImageEncodingFailure(format!("unsupported image type: {}", path.display()))
    })?;
    let bytes = std::fs::read(path)
        .map_err(|e| TurnError::ImageEncodingFailure(format!("{}: {e}", path.display())))?;
    if bytes.is_empty() {
        return Err(TurnError::ImageEncodingFailure(format!("{} is empty", path.display())));
    }
    debug!("Image encoded - path={}, mime={}, bytes={}", path.display(), mime, bytes.len());
    Ok(EncodedImage::from_bytes(mime, &bytes))
}
