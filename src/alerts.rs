use std::io::Write;

use crate::error::{NotificationError, SpeechError};

pub const ALERT_TITLE: &str = "Emergency Alert";
pub const ALERT_BODY: &str = "Sending emergency notifications!";
pub const CANCEL_TITLE: &str = "Emergency Canceled";
pub const CANCEL_BODY: &str = "The emergency alert has been canceled.";
pub const SPEECH_TEXT: &str = "Emergency detected. Sending help messages.";

#[derive(Clone, Debug)]
pub struct AlertConfig {
    pub vibration: bool,
    pub speech: bool,
    pub notification: bool,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            vibration: true,
            speech: true,
            notification: true,
        }
    }
}

pub trait Haptics: Send + Sync {
    fn vibrate(&self, pattern_ms: &[u64]);
    fn cancel(&self);
}

pub trait NotificationSink: Send + Sync {
    fn schedule_immediate(&self, title: &str, body: &str) -> Result<(), NotificationError>;
}

/// Fire-and-forget; an error only means the utterance could not be queued.
pub trait SpeechAnnouncer: Send + Sync {
    fn speak(&self, text: &str) -> Result<(), SpeechError>;
}

/// Host stand-in for the phone's vibrator, notification tray and TTS.
pub struct ConsoleAlerts {
    config: AlertConfig,
}

impl ConsoleAlerts {
    pub fn new(config: AlertConfig) -> Self {
        Self { config }
    }

    fn emit(&self, line: &str) -> std::io::Result<()> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "{}", line)?;
        out.flush()
    }
}

impl Haptics for ConsoleAlerts {
    fn vibrate(&self, pattern_ms: &[u64]) {
        if !self.config.vibration {
            return;
        }
        let pattern: Vec<String> = pattern_ms.iter().map(|ms| ms.to_string()).collect();
        self.emit(&format!("~ bzzz [{}] ms ~", pattern.join("/"))).ok();
    }

    fn cancel(&self) {
        if self.config.vibration {
            log::debug!("vibration cancelled");
        }
    }
}

impl NotificationSink for ConsoleAlerts {
    fn schedule_immediate(&self, title: &str, body: &str) -> Result<(), NotificationError> {
        if !self.config.notification {
            log::debug!("notifications disabled, dropping {:?}", title);
            return Ok(());
        }
        self.emit(&format!("[notification] {}: {}", title, body))
            .map_err(|e| NotificationError(e.to_string()))
    }
}

impl SpeechAnnouncer for ConsoleAlerts {
    fn speak(&self, text: &str) -> Result<(), SpeechError> {
        if !self.config.speech {
            return Ok(());
        }
        self.emit(&format!("[speech] \"{}\"", text))
            .map_err(|e| SpeechError(e.to_string()))
    }
}
