mod parser;
pub mod config;
pub mod scraper;
pub mod types;

pub use config::TrackerConfig;
pub use parser::ParseError;
pub use scraper::{Tracker, TrackerError};
pub use types::{SessionState, TrackingQuery, TrackingResult};

pub(crate) const BASE_URL: &str = "https://eservice.7-11.com.tw/E-Tracking";

pub(crate) const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub(crate) const IMAGE_ACCEPT: &str = "image/webp,image/apng,image/*,*/*;q=0.8";
