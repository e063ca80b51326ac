use url::Url;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CatalogConfig {
    /// Search page size used when the request does not pass one.
    #[serde(default = "default_page_size")]
    pub default_page_size: i64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
        }
    }
}

/// Third-party media host that stores product images.
#[derive(Clone, serde::Serialize, serde::Deserialize)]
pub struct MediaConfig {
    pub upload_url: Url,
    pub api_key: String,
    #[serde(default = "default_media_folder")]
    pub folder: String,
}

impl std::fmt::Debug for MediaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaConfig")
            .field("upload_url", &self.upload_url.as_str())
            .field("api_key", &"[REDACTED]")
            .field("folder", &self.folder)
            .finish()
    }
}

fn default_page_size() -> i64 {
    3
}

fn default_media_folder() -> String {
    "products".to_owned()
}
