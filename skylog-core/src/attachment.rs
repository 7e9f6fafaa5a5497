//! The single image staged for the next analysis

use crate::ingest::SourceFile;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use std::sync::Arc;

/// MIME type for the accepted image extensions
pub fn image_mime_type(name: &str) -> Option<&'static str> {
    let lower = name.to_ascii_lowercase();
    let (_, extension) = lower.rsplit_once('.')?;
    match extension {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// Encode bytes as a `data:` URL
pub fn to_data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, BASE64.encode(bytes))
}

/// Strip the `data:<mime>;base64,` metadata prefix, leaving the payload untouched
pub fn data_url_payload(data_url: &str) -> Option<&str> {
    let rest = data_url.strip_prefix("data:")?;
    let (_, payload) = rest.split_once(',')?;
    Some(payload)
}

/// File handle plus preview. Bytes are only read when the request is assembled.
#[derive(Clone, Debug)]
pub struct ImageAttachment {
    file: Arc<dyn SourceFile>,
    mime_type: String,
    preview: String,
}

impl ImageAttachment {
    pub fn new(file: Arc<dyn SourceFile>, mime_type: impl Into<String>) -> Self {
        let preview = file.preview_ref();
        Self {
            file,
            mime_type: mime_type.into(),
            preview,
        }
    }

    pub fn name(&self) -> &str {
        self.file.name()
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn preview(&self) -> &str {
        &self.preview
    }

    /// Read the image and return its base64 payload, as carried by inline request data
    pub async fn base64_payload(&self) -> std::io::Result<String> {
        let bytes = self.file.read_all().await?;
        let data_url = to_data_url(&self.mime_type, &bytes);
        Ok(data_url_payload(&data_url).unwrap_or_default().to_string())
    }
}
