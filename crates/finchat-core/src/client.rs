use reqwest::Client;
use serde::Deserialize;

use crate::config::Config;
use crate::reply::{self, BackendReply, Failure};

#[derive(Deserialize)]
struct GreetingResponse {
    message: Option<String>,
}

#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    base_url: String,
    chat_path: String,
    query_param: String,
}

impl ChatClient {
    pub fn new(base_url: &str) -> Self {
        let defaults = Config::new();
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            chat_path: defaults.chat_path,
            query_param: defaults.query_param,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            chat_path: config.chat_path.clone(),
            query_param: config.query_param.clone(),
            ..Self::new(&config.backend_url)
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full request URL for a query, with the text percent-encoded
    pub fn chat_url(&self, query: &str) -> String {
        format!(
            "{}{}?{}={}",
            self.base_url,
            self.chat_path,
            self.query_param,
            urlencoding::encode(query)
        )
    }

    /// Send one chat query and parse the reply.
    pub async fn ask(&self, query: &str) -> Result<BackendReply, Failure> {
        let url = self.chat_url(query);
        tracing::debug!(%url, "sending chat query");

        let response = self.client.get(&url).send().await.map_err(|e| {
            tracing::warn!(error = %e, "chat request failed");
            Failure::from(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "chat backend returned an error status");
            return Err(Failure::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let parsed = reply::parse(&body);
        if let Err(failure) = &parsed {
            tracing::warn!(%failure, "could not parse chat reply");
        }
        parsed
    }

    /// Fetch the backend's greeting from its root path.
    pub async fn greeting(&self) -> Result<String, Failure> {
        let url = format!("{}/", self.base_url);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(Failure::Status(response.status().as_u16()));
        }

        let body = response.text().await?;
        let greeting: GreetingResponse =
            serde_json::from_str(&body).map_err(|e| Failure::Decode(e.to_string()))?;
        Ok(greeting.message.unwrap_or_default())
    }
}
