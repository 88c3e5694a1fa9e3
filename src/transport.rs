use std::fmt;
use std::time::Duration;

use anyhow::Context;
use base64::Engine;
use reqwest::blocking::multipart::Form;
use reqwest::header::{HeaderValue, AUTHORIZATION};

use crate::error::TransportError;

const BODY_EXCERPT_CHARS: usize = 200;

/// Sending-API key. Never printed.
#[derive(Clone)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

#[derive(Clone, Debug)]
pub struct MailgunConfig {
    pub api_base: String,
    pub domain: String,
    pub api_key: ApiKey,
    pub timeout: Duration,
}

pub trait MessageTransport: Send + Sync {
    /// Deliver `text` to one recipient. Success means a 2xx from the API.
    fn deliver(&self, to: &str, text: &str) -> Result<(), TransportError>;
}

pub fn basic_authorization(key: &ApiKey) -> String {
    let raw = format!("api:{}", key.expose());
    format!("Basic {}", base64::engine::general_purpose::STANDARD.encode(raw))
}

/// The request URL carries the sending domain, so it is dropped from errors.
fn redact_url(e: reqwest::Error) -> TransportError {
    TransportError::Http(e.without_url())
}

pub struct MailgunTransport {
    client: reqwest::blocking::Client,
    endpoint: String,
    sender: String,
    authorization: HeaderValue,
}

impl MailgunTransport {
    pub fn new(config: &MailgunConfig) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("build http client")?;
        let mut authorization = HeaderValue::from_str(&basic_authorization(&config.api_key))
            .context("encode authorization header")?;
        authorization.set_sensitive(true);

        Ok(Self {
            client,
            endpoint: format!(
                "{}/{}/messages",
                config.api_base.trim_end_matches('/'),
                config.domain
            ),
            sender: format!("Emergency Alert <mailgun@{}>", config.domain),
            authorization,
        })
    }

    fn build_request(&self, to: &str, text: &str) -> Result<reqwest::blocking::Request, TransportError> {
        let form = Form::new()
            .text("from", self.sender.clone())
            .text("to", to.to_owned())
            .text("text", text.to_owned());
        let request = self
            .client
            .post(&self.endpoint)
            .header(AUTHORIZATION, self.authorization.clone())
            .multipart(form)
            .build()
            .map_err(redact_url)?;
        Ok(request)
    }
}

impl MessageTransport for MailgunTransport {
    fn deliver(&self, to: &str, text: &str) -> Result<(), TransportError> {
        if !alert_core::is_deliverable(to) {
            return Err(TransportError::InvalidRecipient(to.to_owned()));
        }
        let request = self.build_request(to, text)?;
        let resp = self.client.execute(request).map_err(redact_url)?;
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = resp.text().unwrap_or_default();
        Err(TransportError::Status {
            status: status.as_u16(),
            body_excerpt: body.chars().take(BODY_EXCERPT_CHARS).collect(),
        })
    }
}

/// Used when no sending credentials are configured: logs and succeeds.
pub struct DryRunTransport;

impl MessageTransport for DryRunTransport {
    fn deliver(&self, to: &str, text: &str) -> Result<(), TransportError> {
        if !alert_core::is_deliverable(to) {
            return Err(TransportError::InvalidRecipient(to.to_owned()));
        }
        log::warn!("dry run: not delivering {} byte alert to {}", text.len(), to);
        Ok(())
    }
}
