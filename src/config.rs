use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use crate::alerts::AlertConfig;
use crate::app::AppSettings;
use crate::contacts::ContactStore;
use crate::location::{ConfiguredLocation, Permission, Position};
use crate::transport::{ApiKey, DryRunTransport, MailgunConfig, MailgunTransport, MessageTransport};

const DEFAULT_API_BASE: &str = "https://api.mailgun.net/v3";

#[derive(Parser, Debug)]
#[command(name = "drivesafe", version, about = "Shake-triggered emergency alerts")]
pub struct Cli {
    #[arg(long, default_value_t = alert_core::DEFAULT_THRESHOLD, help = "Shake threshold, clamped to 2.0..=10.0")]
    pub threshold: f64,

    #[arg(long = "contact", value_name = "EMAIL", help = "Emergency contact (repeatable)")]
    pub contacts: Vec<String>,

    #[arg(long, env = "MAILGUN_DOMAIN", help = "Sending domain")]
    pub mailgun_domain: Option<String>,

    #[arg(long, env = "MAILGUN_API_KEY", hide_env_values = true, help = "Sending API key")]
    pub mailgun_api_key: Option<String>,

    #[arg(long, default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    #[arg(long, default_value_t = 10_000)]
    pub request_timeout_ms: u64,

    #[arg(long, allow_hyphen_values = true, requires = "longitude")]
    pub latitude: Option<f64>,

    #[arg(long, allow_hyphen_values = true, requires = "latitude")]
    pub longitude: Option<f64>,

    #[arg(long, help = "Answer location permission requests with 'denied'")]
    pub deny_location: bool,

    #[arg(long, default_value_t = 100)]
    pub sample_interval_ms: u64,

    #[arg(long, default_value_t = 1000)]
    pub tick_ms: u64,

    #[arg(long)]
    pub no_speech: bool,

    #[arg(long)]
    pub no_vibration: bool,

    #[arg(long)]
    pub no_notification: bool,

    #[arg(long, default_value = "info", help = "Log filter when RUST_LOG is unset")]
    pub log_level: String,
}

impl Cli {
    pub fn settings(&self) -> AppSettings {
        AppSettings {
            threshold: alert_core::clamp_threshold(self.threshold).unwrap_or(alert_core::DEFAULT_THRESHOLD),
            countdown_ticks: alert_core::COUNTDOWN_TICKS,
            tick_interval_ms: self.tick_ms.max(1),
        }
    }

    pub fn alert_config(&self) -> AlertConfig {
        AlertConfig {
            vibration: !self.no_vibration,
            speech: !self.no_speech,
            notification: !self.no_notification,
        }
    }

    pub fn location(&self) -> ConfiguredLocation {
        let permission = if self.deny_location {
            Permission::Denied
        } else {
            Permission::Granted
        };
        let position = match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(Position { latitude, longitude }),
            _ => None,
        };
        ConfiguredLocation::new(permission, position)
    }

    /// Contacts given on the command line go through the same check as the UI.
    pub fn contact_store(&self) -> anyhow::Result<ContactStore> {
        let mut store = ContactStore::new();
        for c in &self.contacts {
            store.add(c).with_context(|| format!("--contact {:?}", c))?;
        }
        Ok(store)
    }

    pub fn mailgun(&self) -> Option<MailgunConfig> {
        match (&self.mailgun_domain, &self.mailgun_api_key) {
            (Some(domain), Some(key)) if !domain.is_empty() && !key.is_empty() => Some(MailgunConfig {
                api_base: self.api_base.clone(),
                domain: domain.clone(),
                api_key: ApiKey::new(key.clone()),
                timeout: Duration::from_millis(self.request_timeout_ms),
            }),
            _ => None,
        }
    }

    pub fn transport(&self) -> anyhow::Result<Arc<dyn MessageTransport>> {
        match self.mailgun() {
            Some(cfg) => {
                let transport = MailgunTransport::new(&cfg)?;
                log::info!("delivering via {}", cfg.api_base);
                Ok(Arc::new(transport))
            }
            None => {
                log::warn!("no sending credentials configured; alerts will be logged, not sent");
                Ok(Arc::new(DryRunTransport))
            }
        }
    }
}
