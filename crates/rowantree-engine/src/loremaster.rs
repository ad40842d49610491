//! HTTP client for the loremaster service.
//!
//! The loremaster owns all encounter content. The personality only tells it
//! how many people a user has and gets back an event, or nothing.
//!
//! `GET {url}/v1/encounter?population=N` answers with a JSON [`UserEvent`],
//! a JSON `null`, or `204 No Content`. The last two mean "no encounter".

use std::time::Duration;

use reqwest::StatusCode;
use rowantree_core::config::LoremasterConfig;
use rowantree_core::service::{EventGenerator, GeneratorError};
use rowantree_types::UserEvent;

use crate::error::EngineError;

/// [`EventGenerator`] backed by the loremaster HTTP API.
pub struct HttpLoremaster {
    client: reqwest::Client,
    base_url: String,
}

impl HttpLoremaster {
    /// Build a client for the configured loremaster.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Loremaster`] if the HTTP client cannot be built.
    pub fn new(config: &LoremasterConfig) -> Result<Self, EngineError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| EngineError::Loremaster {
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_owned(),
        })
    }

    /// The base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn encounter_url(&self, population: i64) -> String {
        format!("{}/v1/encounter?population={population}", self.base_url)
    }
}

impl EventGenerator for HttpLoremaster {
    async fn generate_event(&self, population: i64) -> Result<Option<UserEvent>, GeneratorError> {
        let response = self
            .client
            .get(self.encounter_url(population))
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| GeneratorError::Transport(format!("encounter request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GeneratorError::Transport(format!("encounter body unreadable: {e}")))?;

        parse_encounter(status, &body)
    }
}

/// Interpret a loremaster response.
fn parse_encounter(status: StatusCode, body: &str) -> Result<Option<UserEvent>, GeneratorError> {
    if status == StatusCode::NO_CONTENT {
        return Ok(None);
    }
    if !status.is_success() {
        return Err(GeneratorError::Transport(format!(
            "loremaster returned {status}: {body}"
        )));
    }
    if body.trim().is_empty() {
        return Ok(None);
    }

    serde_json::from_str::<Option<UserEvent>>(body)
        .map_err(|e| GeneratorError::Malformed(e.to_string()))
}
