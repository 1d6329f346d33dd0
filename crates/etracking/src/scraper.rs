use crate::config::TrackerConfig;
use crate::parser::{ParseError, parse_form_tokens, parse_tracking_result};
use crate::types::{SessionState, TrackingQuery, TrackingResult};

use chrono::Utc;
use encoding_rs::Encoding;
use reqwest::header::{ACCEPT, COOKIE};
use reqwest::{Client, RequestBuilder, Response, StatusCode, redirect};

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Unexpected HTTP status {status} from {url}")]
    Fetch { url: String, status: StatusCode },
    #[error("Hidden token not found: {0}")]
    TokenNotFound(String),
    #[error("Captcha code is required")]
    MissingCaptcha,
    #[error("Query rejected, check the captcha code and tracking number")]
    Verify,
    #[error("Parse error: {0}")]
    ParseError(ParseError),
    #[error("Unknown encoding label: {0}")]
    UnknownEncoding(String),
    #[error("Failed to save captcha image: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ParseError> for TrackerError {
    fn from(e: ParseError) -> Self {
        match e {
            ParseError::MissingToken(id) => TrackerError::TokenNotFound(id),
            other => TrackerError::ParseError(other),
        }
    }
}

/// Drives the E-Tracking search form: [`acquire`](Self::acquire) a session and
/// captcha image, then [`submit`](Self::submit) a tracking number with the
/// operator's answer.
#[derive(Debug, Clone)]
pub struct Tracker {
    client: Client,
    postback: Client,
    encoding: &'static Encoding,
    config: TrackerConfig,
}

impl Tracker {
    pub fn new() -> Result<Self, TrackerError> {
        Self::with_config(TrackerConfig::default())
    }

    pub fn with_config(config: TrackerConfig) -> Result<Self, TrackerError> {
        let encoding = Encoding::for_label(config.encoding.trim().as_bytes())
            .ok_or_else(|| TrackerError::UnknownEncoding(config.encoding.clone()))?;

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(crate::USER_AGENT)
            .build()?;

        // the form posts back to itself; a redirect means the postback was not accepted
        let postback = Client::builder()
            .timeout(config.timeout)
            .user_agent(crate::USER_AGENT)
            .redirect(redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            postback,
            encoding,
            config,
        })
    }

    /// Loads the search page for its hidden tokens and cookies, then saves a
    /// fresh captcha image to the configured path, replacing any earlier one.
    pub async fn acquire(&self) -> Result<SessionState, TrackerError> {
        let url = self.config.search_url();
        log::info!("Fetching search page {}...", url);
        let response = self.send(self.client.get(&url)).await?;

        let cookies = cookie_header(
            response
                .cookies()
                .map(|c| (c.name().to_string(), c.value().to_string())),
        );
        let html = self.decode(response).await?;
        let tokens = parse_form_tokens(&html)?;
        log::debug!(
            "Session cookies: {:?}, view state generator: {}",
            cookies,
            tokens.view_state_generator
        );

        let image_url = self.config.captcha_url(Utc::now().timestamp_millis());
        log::info!("Downloading captcha image {}...", image_url);
        let mut request = self.client.get(&image_url).header(ACCEPT, crate::IMAGE_ACCEPT);
        if !cookies.is_empty() {
            request = request.header(COOKIE, &cookies);
        }
        let image = self
            .send(request)
            .await?
            .bytes()
            .await
            .inspect_err(|e| log::error!("Decode error: {e:?}"))?;

        tokio::fs::write(&self.config.image_path, &image).await?;
        log::info!(
            "Saved {} byte captcha image to {}",
            image.len(),
            self.config.image_path.display()
        );

        Ok(SessionState {
            cookies,
            view_state: tokens.view_state,
            view_state_generator: tokens.view_state_generator,
            image_path: self.config.image_path.clone(),
        })
    }

    /// Posts the search form once. Each attempt needs a fresh captcha answer;
    /// nothing is retried.
    pub async fn submit(
        &self,
        query: &TrackingQuery,
        session: &SessionState,
    ) -> Result<TrackingResult, TrackerError> {
        let code = query.captcha_code.trim();
        if code.is_empty() {
            return Err(TrackerError::MissingCaptcha);
        }

        let form = postback_form(&query.tracking_number, code, session);
        let url = self.config.search_url();
        log::info!("Submitting tracking query for {}...", query.tracking_number);

        let mut request = self.postback.post(&url).form(&form[..]);
        if !session.cookies.is_empty() {
            request = request.header(COOKIE, &session.cookies);
        }
        let response = self.send(request).await?;
        let html = self.decode(response).await?;

        parse_tracking_result(&html)?.ok_or_else(|| {
            log::warn!("Query for {} was rejected", query.tracking_number);
            TrackerError::Verify
        })
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, TrackerError> {
        let response = request
            .send()
            .await
            .inspect_err(|e| log::error!("HTTP error: {e:?}"))?;

        let status = response.status();
        if !status.is_success() {
            log::error!("Unexpected status {} from {}", status, response.url());
            return Err(TrackerError::Fetch {
                url: response.url().to_string(),
                status,
            });
        }
        Ok(response)
    }

    /// Decodes with the configured encoding regardless of the declared charset;
    /// the site declares utf-8 even when it serves big5.
    async fn decode(&self, response: Response) -> Result<String, TrackerError> {
        let body = response
            .bytes()
            .await
            .inspect_err(|e| log::error!("Decode error: {e:?}"))?;

        let (text, _, malformed) = self.encoding.decode(&body);
        if malformed {
            log::warn!(
                "Page is not valid {}, try another --encoding",
                self.encoding.name()
            );
        }
        Ok(text.into_owned())
    }
}

/// Joins cookies as `name=value;name=value`. A repeated name keeps its first
/// position and its last value.
fn cookie_header(cookies: impl IntoIterator<Item = (String, String)>) -> String {
    let mut pairs: Vec<(String, String)> = Vec::new();
    for (name, value) in cookies {
        match pairs.iter_mut().find(|(n, _)| *n == name) {
            Some(pair) => pair.1 = value,
            None => pairs.push((name, value)),
        }
    }
    pairs
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join(";")
}

fn postback_form<'a>(
    tracking_number: &'a str,
    captcha_code: &'a str,
    session: &'a SessionState,
) -> [(&'static str, &'a str); 10] {
    [
        ("__LASTFOCUS", ""),
        ("__EVENTTARGET", ""),
        ("__EVENTARGUMENT", ""),
        ("__VIEWSTATE", session.view_state.as_str()),
        ("__VIEWSTATEGENERATOR", session.view_state_generator.as_str()),
        ("txtProductNum", tracking_number),
        ("tbChkCode", captcha_code),
        ("aaa", ""),
        ("txtIMGName", ""),
        ("txtPage", "1"),
    ]
}
