use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::types::TrackingResult;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Missing hidden token: {0}")]
    MissingToken(String),
    #[error("Missing required field: {0}")]
    MissingField(String),
    #[error("No timestamp in status entry: {0}")]
    MissingTimestamp(String),
}

/// Page indicator value the site renders once a query reaches the results view.
const RESULTS_PAGE: &str = "2";

static RE_STATUS_TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{4}/\d{2}/\d{2} \d{2}:\d{2}").expect("invalid regex: status timestamp")
});

static SEL_VIEW_STATE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("input#__VIEWSTATE").expect("invalid selector: viewstate"));
static SEL_VIEW_STATE_GENERATOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("input#__VIEWSTATEGENERATOR").expect("invalid selector: viewstate generator")
});
static SEL_PAGE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("input#txtPage").expect("invalid selector: txtPage"));
static SEL_INFO: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".info").expect("invalid selector: info"));
static SEL_SHIPPING: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".shipping").expect("invalid selector: shipping"));
static SEL_LIST_ITEM: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("li").expect("invalid selector: li"));
static SEL_STORE_NAME: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#store_name").expect("invalid selector: store_name"));
static SEL_STORE_ADDRESS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("#store_address").expect("invalid selector: store_address")
});
static SEL_DEADLINE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#deadline").expect("invalid selector: deadline"));
static SEL_SERVICE_TYPE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#servicetype").expect("invalid selector: servicetype"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FormTokens {
    pub view_state: String,
    pub view_state_generator: String,
}

fn elem_text(element: ElementRef) -> String {
    element.text().collect::<String>()
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn hidden_value(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .next()
        .and_then(|e| e.value().attr("value"))
        .map(str::to_string)
}

fn field_text(block: ElementRef, selector: &Selector, id: &str) -> Result<String, ParseError> {
    block
        .select(selector)
        .next()
        .map(|e| normalize_whitespace(&elem_text(e)))
        .ok_or_else(|| ParseError::MissingField(id.to_string()))
}

pub(crate) fn parse_form_tokens(html: &str) -> Result<FormTokens, ParseError> {
    let document = Html::parse_document(html);

    let view_state = hidden_value(&document, &SEL_VIEW_STATE)
        .ok_or_else(|| ParseError::MissingToken("__VIEWSTATE".to_string()))?;
    let view_state_generator = hidden_value(&document, &SEL_VIEW_STATE_GENERATOR)
        .ok_or_else(|| ParseError::MissingToken("__VIEWSTATEGENERATOR".to_string()))?;

    Ok(FormTokens {
        view_state,
        view_state_generator,
    })
}

/// Moves the first `YYYY/MM/DD HH:MM` timestamp in `text` to the front.
pub(crate) fn format_status_line(text: &str) -> Result<String, ParseError> {
    let text = normalize_whitespace(text);
    let found = RE_STATUS_TIMESTAMP
        .find(&text)
        .ok_or_else(|| ParseError::MissingTimestamp(text.clone()))?;

    let rest = normalize_whitespace(&format!(
        "{} {}",
        &text[..found.start()],
        &text[found.end()..]
    ));

    if rest.is_empty() {
        Ok(found.as_str().to_string())
    } else {
        Ok(format!("{} {}", found.as_str(), rest))
    }
}

/// Returns `Ok(None)` when the page is not the results view, which is how the
/// site answers both a wrong captcha and an unknown tracking number.
pub(crate) fn parse_tracking_result(html: &str) -> Result<Option<TrackingResult>, ParseError> {
    let document = Html::parse_document(html);

    let page = hidden_value(&document, &SEL_PAGE);
    if page.as_deref() != Some(RESULTS_PAGE) {
        log::debug!("Page indicator is {:?}, not the results page", page);
        return Ok(None);
    }

    let info = document
        .select(&SEL_INFO)
        .next()
        .ok_or_else(|| ParseError::MissingField("info".to_string()))?;
    let blocks: Vec<ElementRef> = info
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|e| e.value().name() == "div")
        .collect();

    let pickup = blocks
        .first()
        .copied()
        .ok_or_else(|| ParseError::MissingField("pickup info".to_string()))?;
    let payment = blocks
        .get(1)
        .copied()
        .ok_or_else(|| ParseError::MissingField("payment info".to_string()))?;

    let shipping = document
        .select(&SEL_SHIPPING)
        .next()
        .ok_or_else(|| ParseError::MissingField("shipping".to_string()))?;
    let mut status = shipping
        .select(&SEL_LIST_ITEM)
        .map(|li| format_status_line(&elem_text(li)))
        .collect::<Result<Vec<_>, _>>()?;
    status.reverse();

    Ok(Some(TrackingResult {
        store_name: field_text(pickup, &SEL_STORE_NAME, "store_name")?,
        store_address: field_text(pickup, &SEL_STORE_ADDRESS, "store_address")?,
        pickup_deadline: field_text(pickup, &SEL_DEADLINE, "deadline")?,
        payment_type: field_text(payment, &SEL_SERVICE_TYPE, "servicetype")?,
        status,
    }))
}
