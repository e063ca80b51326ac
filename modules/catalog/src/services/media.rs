use reqwest::multipart::{Form, Part};
use reqwest::Client;

use crate::config::MediaConfig;

/// Pass-through client for the third-party media host. Product images are
/// never stored locally; the catalog only keeps the URL the host hands back.
#[derive(Debug, Clone)]
pub struct MediaStore {
    client: Client,
    config: MediaConfig,
}

#[derive(Clone)]
pub struct UploadImage {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for UploadImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadImage")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("bytes", &format_args!("{} bytes", self.bytes.len()))
            .finish()
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
struct UploadResponse {
    secure_url: String,
}

impl MediaStore {
    pub fn new(config: MediaConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Uploads one image and returns its public URL. Any failure is an
    /// upstream error; persisted catalog state is untouched by a failed
    /// upload.
    pub async fn upload(&self, input: UploadImage) -> Result<String, framework::Error> {
        let part = Part::bytes(input.bytes)
            .file_name(input.file_name)
            .mime_str(&input.content_type)
            .map_err(|e| framework::Error::InvalidInput(format!("image content type: {e}")))?;
        let form = Form::new()
            .text("folder", self.config.folder.clone())
            .part("file", part);
        let response = self
            .client
            .post(self.config.upload_url.clone())
            .bearer_auth(&self.config.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| framework::Error::Upstream(format!("media host: {e}")))?;
        if !response.status().is_success() {
            return Err(framework::Error::Upstream(format!(
                "media host answered {}",
                response.status()
            )));
        }
        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| framework::Error::Upstream(format!("media host response: {e}")))?;
        Ok(body.secure_url)
    }
}
