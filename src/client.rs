//! HTTP client for the controller's web API.
//!
//! [`ControllerClient`] wraps `reqwest::Client` and provides one method per
//! controller endpoint:
//!
//! - `GET /sens_out.json` — brief snapshot
//! - `GET /d_sens_out.json` — full snapshot with descriptions
//! - `POST /` — form-urlencoded command batch
//!
//! ## Authentication
//!
//! Every request carries HTTP Basic credentials from the configuration, even
//! when they are empty.
//!
//! ## Header tolerance
//!
//! The controller's embedded web server emits header lines that strict
//! HTTP/1 parsers reject. The client ignores invalid header lines and
//! accepts obsolete line folding and spaces before the colon.
//!
//! ## Error handling
//!
//! Transport failures and timeouts become [`Error::Transport`]; non-2xx
//! responses become [`Error::Status`] with the status reason. Nothing is
//! retried.

use crate::command::CommandBatch;
use crate::config::ControllerConfig;
use crate::error::Error;
use crate::snapshot::{Snapshot, BRIEF_PATH, FULL_PATH};

/// HTTP client for a single controller.
#[derive(Clone, Debug)]
pub struct ControllerClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
}

impl ControllerClient {
    /// Build a client from connection settings.
    pub fn new(config: &ControllerConfig) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .http1_ignore_invalid_headers_in_responses(true)
            .http1_allow_obsolete_multiline_headers_in_responses(true)
            .http1_allow_spaces_after_header_name_in_responses(true)
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    /// The controller's base URL (without trailing slash).
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /sens_out.json` — states only, descriptions not guaranteed.
    pub async fn brief_snapshot(&self) -> Result<Snapshot, Error> {
        self.snapshot(BRIEF_PATH).await
    }

    /// `GET /d_sens_out.json` — states plus descriptions. Expensive for the
    /// controller to produce; don't poll it.
    pub async fn full_snapshot(&self) -> Result<Snapshot, Error> {
        self.snapshot(FULL_PATH).await
    }

    async fn snapshot(&self, path: &str) -> Result<Snapshot, Error> {
        tracing::debug!(path, "fetching snapshot");
        let resp = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?;
        let body = Self::handle_response(resp).await?;
        Ok(Snapshot::parse(&body)?)
    }

    /// `POST /` — send a command batch as one form-urlencoded body. Pairs
    /// keep their order, and `*` in level keys goes out unescaped.
    pub async fn send(&self, batch: &CommandBatch) -> Result<(), Error> {
        tracing::debug!(command = %batch, "sending command");
        let resp = self
            .http
            .post(format!("{}/", self.base_url))
            .basic_auth(&self.username, Some(&self.password))
            .form(batch.pairs())
            .send()
            .await?;
        Self::handle_response(resp).await?;
        Ok(())
    }

    /// Returns the body on 2xx, or [`Error::Status`] otherwise.
    async fn handle_response(resp: reqwest::Response) -> Result<String, Error> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp.text().await?);
        }
        let message = status
            .canonical_reason()
            .map(String::from)
            .unwrap_or_else(|| status.to_string());
        tracing::warn!(status = status.as_u16(), %message, "controller rejected request");
        Err(Error::Status {
            status: status.as_u16(),
            message,
        })
    }
}
