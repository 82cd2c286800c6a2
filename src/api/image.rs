use log::debug;
use reqwest::multipart::Part;
use std::path::Path;

const CAPTURE_FILE_NAME: &str = "capture.jpg";
const CAPTURE_MIME: &str = "image/jpeg";

/// An image ready to be submitted for recognition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBlob {
    bytes: Vec<u8>,
    file_name: String,
    mime_type: String,
}

impl ImageBlob {
    pub fn new(bytes: Vec<u8>, file_name: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            file_name: file_name.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Wraps a JPEG frame handed over by a camera front-end.
    pub fn from_capture(bytes: Vec<u8>) -> Self {
        Self::new(bytes, CAPTURE_FILE_NAME, CAPTURE_MIME)
    }

    /// Reads a picked file from disk, guessing its MIME type from the extension.
    pub async fn from_path(path: &Path) -> Result<Self, String> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| format!("Failed to read image {}: {}", path.display(), e))?;

        if bytes.is_empty() {
            return Err(format!("Image {} is empty", path.display()));
        }

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        debug!(
            "Loaded image {} ({} bytes, {})",
            file_name,
            bytes.len(),
            mime_type
        );
        Ok(Self::new(bytes, file_name, mime_type))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub(crate) fn to_part(&self) -> Result<Part, String> {
        Part::bytes(self.bytes.clone())
            .file_name(self.file_name.clone())
            .mime_str(&self.mime_type)
            .map_err(|e| format!("Failed to create image part: {}", e))
    }
}
