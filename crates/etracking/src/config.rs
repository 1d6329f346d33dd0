use std::path::PathBuf;
use std::time::Duration;

/// Settings for a [`Tracker`](crate::Tracker).
///
/// The defaults point at the live E-Tracking site and save the captcha image as
/// `codeImg.jpg` in the working directory.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub base_url: String,
    pub image_path: PathBuf,
    /// Label of the charset every page is decoded with, e.g. `big5` when the
    /// site renders garbled text as utf-8. Unknown labels fail tracker construction.
    pub encoding: String,
    pub timeout: Duration,
}

impl TrackerConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_image_path(mut self, image_path: impl Into<PathBuf>) -> Self {
        self.image_path = image_path.into();
        self
    }

    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub(crate) fn search_url(&self) -> String {
        format!("{}/search.aspx", self.base_url)
    }

    pub(crate) fn captcha_url(&self, ts: i64) -> String {
        format!("{}/ValidateImage.aspx?ts={}", self.base_url, ts)
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            base_url: crate::BASE_URL.to_string(),
            image_path: PathBuf::from("codeImg.jpg"),
            encoding: "utf-8".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}
