use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::io;
use std::path::PathBuf;

/// Everything the search form needs to accept a postback.
///
/// Produced by [`Tracker::acquire`](crate::Tracker::acquire) and passed
/// unchanged into [`Tracker::submit`](crate::Tracker::submit). The server
/// expires the cookies and tokens on its own schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub cookies: String,
    pub view_state: String,
    pub view_state_generator: String,
    pub image_path: PathBuf,
}

impl SessionState {
    /// Removes the captcha image saved for this session. A missing file is not an error.
    pub fn discard_image(&self) -> io::Result<()> {
        match std::fs::remove_file(&self.image_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingQuery {
    pub tracking_number: String,
    pub captcha_code: String,
}

impl TrackingQuery {
    pub fn new(tracking_number: impl Into<String>, captcha_code: impl Into<String>) -> Self {
        Self {
            tracking_number: tracking_number.into(),
            captcha_code: captcha_code.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingResult {
    pub store_name: String,
    pub store_address: String,
    pub pickup_deadline: String,
    pub payment_type: String,
    /// Oldest first, each line led by its `YYYY/MM/DD HH:MM` timestamp.
    pub status: Vec<String>,
}

impl Display for TrackingResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "┌─ {}", self.store_name)?;
        writeln!(f, "│  Address:  {}", self.store_address)?;
        writeln!(f, "│  Deadline: {}", self.pickup_deadline)?;
        writeln!(f, "│  Payment:  {}", self.payment_type)?;
        writeln!(f, "└─ {} status update(s)", self.status.len())?;
        for (i, line) in self.status.iter().enumerate() {
            writeln!(f, "{:>3}. {}", i + 1, line)?;
        }
        Ok(())
    }
}
