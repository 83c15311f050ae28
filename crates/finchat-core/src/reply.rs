//! Backend reply parsing and formatting.
//!
//! The chat backend answers with one of two JSON shapes: a price quote
//! (`{ticker, price, timestamp, source}`) or a free-text message
//! (`{message}`). A numeric `price` field selects the quote shape.

use serde::Deserialize;
use thiserror::Error;

pub const FALLBACK_REPLY: &str = "Sorry, I can't help with that yet!";

const UNKNOWN_FIELD: &str = "unknown";

#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub ticker: Option<String>,
    pub price: f64,
    pub timestamp: Option<String>,
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BackendReply {
    Quote(Quote),
    Plain { message: Option<String> },
    /// Upstream lookup failed; the gateway reports it in the body with a 200
    Rejected { error: String },
}

/// Everything that can go wrong between sending a query and having a reply
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Failure {
    #[error("HTTP error! Status: {0}")]
    Status(u16),
    #[error("{0}")]
    Transport(String),
    #[error("invalid response body: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for Failure {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Failure::Status(status.as_u16()),
            None => Failure::Transport(err.to_string()),
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawReply {
    ticker: Option<String>,
    price: Option<f64>,
    timestamp: Option<String>,
    source: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

/// Parse a successful response body into a typed reply
pub fn parse(body: &str) -> Result<BackendReply, Failure> {
    let raw: RawReply =
        serde_json::from_str(body).map_err(|e| Failure::Decode(e.to_string()))?;

    if let Some(price) = raw.price {
        return Ok(BackendReply::Quote(Quote {
            ticker: raw.ticker,
            price,
            timestamp: raw.timestamp,
            source: raw.source,
        }));
    }

    // An empty message counts as no message
    let message = raw.message.filter(|m| !m.is_empty());
    match (message, raw.error) {
        (None, Some(error)) => Ok(BackendReply::Rejected { error }),
        (message, _) => Ok(BackendReply::Plain { message }),
    }
}

impl Quote {
    pub fn summary(&self) -> String {
        // -0.0 would otherwise print as "-0"
        let price = if self.price == 0.0 { 0.0 } else { self.price };
        format!(
            "{} is ${} as of {} (Source: {})",
            self.ticker.as_deref().unwrap_or(UNKNOWN_FIELD),
            price,
            self.timestamp.as_deref().unwrap_or(UNKNOWN_FIELD),
            self.source.as_deref().unwrap_or(UNKNOWN_FIELD),
        )
    }
}

/// Turn the outcome of one backend call into the bot's message text
pub fn render(outcome: &Result<BackendReply, Failure>) -> String {
    match outcome {
        Ok(BackendReply::Quote(quote)) => quote.summary(),
        Ok(BackendReply::Plain { message: Some(message) }) => message.clone(),
        Ok(BackendReply::Plain { message: None }) => FALLBACK_REPLY.to_string(),
        Ok(BackendReply::Rejected { error }) => format!("Error: {}", error),
        Err(failure) => format!("Error: {}", failure),
    }
}
