//! In-memory stand-ins for every host port, for unit tests.

use std::sync::{Arc, Mutex};

use alert_core::AccelerationSample;

use crate::alerts::{Haptics, NotificationSink, SpeechAnnouncer};
use crate::error::{LocationError, NotificationError, SpeechError, TransportError};
use crate::location::{GeolocationProvider, Permission, Position};
use crate::pump::TickScheduler;
use crate::sensor::{MotionSampler, SampleCallback, SubscriptionHandle};
use crate::transport::MessageTransport;
use crate::ui::NoticeSink;

#[derive(Default)]
pub struct RecordingAlerts {
    pub events: Mutex<Vec<String>>,
    pub fail_notification: bool,
    pub fail_speech: bool,
}

impl RecordingAlerts {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.events().iter().filter(|e| e.starts_with(prefix)).count()
    }
}

impl Haptics for RecordingAlerts {
    fn vibrate(&self, pattern_ms: &[u64]) {
        self.events.lock().unwrap().push(format!("vibrate {:?}", pattern_ms));
    }

    fn cancel(&self) {
        self.events.lock().unwrap().push("vibrate cancel".into());
    }
}

impl NotificationSink for RecordingAlerts {
    fn schedule_immediate(&self, title: &str, _body: &str) -> Result<(), NotificationError> {
        self.events.lock().unwrap().push(format!("notify {}", title));
        if self.fail_notification {
            return Err(NotificationError("tray unavailable".into()));
        }
        Ok(())
    }
}

impl SpeechAnnouncer for RecordingAlerts {
    fn speak(&self, text: &str) -> Result<(), SpeechError> {
        self.events.lock().unwrap().push(format!("speak {}", text));
        if self.fail_speech {
            return Err(SpeechError("no voice".into()));
        }
        Ok(())
    }
}

pub struct FakeLocation {
    pub permission: Permission,
    pub position: Option<Position>,
    pub fetches: Mutex<usize>,
}

impl FakeLocation {
    pub fn at(latitude: f64, longitude: f64) -> Self {
        Self {
            permission: Permission::Granted,
            position: Some(Position { latitude, longitude }),
            fetches: Mutex::new(0),
        }
    }

    pub fn denied() -> Self {
        Self {
            permission: Permission::Denied,
            ..Self::at(0.0, 0.0)
        }
    }

    pub fn no_fix() -> Self {
        Self {
            position: None,
            ..Self::at(0.0, 0.0)
        }
    }

    pub fn fetches(&self) -> usize {
        *self.fetches.lock().unwrap()
    }
}

impl GeolocationProvider for FakeLocation {
    fn request_permission(&self) -> Permission {
        self.permission
    }

    fn current_position(&self) -> Result<Position, LocationError> {
        *self.fetches.lock().unwrap() += 1;
        self.position
            .ok_or_else(|| LocationError::Unavailable("gps timeout".into()))
    }
}

#[derive(Default)]
pub struct RecordingTransport {
    pub sent: Mutex<Vec<(String, String)>>,
    pub failing: Vec<String>,
}

impl RecordingTransport {
    pub fn failing_for(recipients: &[&str]) -> Self {
        Self {
            failing: recipients.iter().map(|r| r.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        let mut sent = self.sent.lock().unwrap().clone();
        sent.sort();
        sent
    }
}

impl MessageTransport for RecordingTransport {
    fn deliver(&self, to: &str, text: &str) -> Result<(), TransportError> {
        self.sent.lock().unwrap().push((to.to_owned(), text.to_owned()));
        if self.failing.iter().any(|f| f == to) {
            return Err(TransportError::Status {
                status: 500,
                body_excerpt: "upstream error".into(),
            });
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotices {
    pub notices: Mutex<Vec<(String, String)>>,
}

impl RecordingNotices {
    pub fn titles(&self) -> Vec<String> {
        self.notices.lock().unwrap().iter().map(|(t, _)| t.clone()).collect()
    }

    pub fn bodies(&self) -> Vec<String> {
        self.notices.lock().unwrap().iter().map(|(_, b)| b.clone()).collect()
    }
}

impl NoticeSink for RecordingNotices {
    fn notice(&self, title: &str, body: &str) {
        self.notices.lock().unwrap().push((title.to_owned(), body.to_owned()));
    }
}

/// Sampler whose callbacks the test invokes by hand.
#[derive(Clone, Default)]
pub struct FakeSampler {
    pub callbacks: Arc<Mutex<Vec<SampleCallback>>>,
    pub unsubscribes: Arc<Mutex<usize>>,
}

impl FakeSampler {
    pub fn emit(&self, sample: AccelerationSample) {
        for cb in self.callbacks.lock().unwrap().iter() {
            cb(sample);
        }
    }

    pub fn subscribers(&self) -> usize {
        self.callbacks.lock().unwrap().len()
    }
}

impl MotionSampler for FakeSampler {
    fn subscribe(&mut self, callback: SampleCallback) -> SubscriptionHandle {
        let mut callbacks = self.callbacks.lock().unwrap();
        callbacks.push(callback);
        SubscriptionHandle::new(callbacks.len() as u64)
    }

    fn unsubscribe_all(&mut self) {
        self.callbacks.lock().unwrap().clear();
        *self.unsubscribes.lock().unwrap() += 1;
    }
}

#[derive(Clone, Default)]
pub struct FakeTicker {
    pub running: Arc<Mutex<Option<u64>>>,
    pub generation: Arc<Mutex<u64>>,
    pub intervals: Arc<Mutex<Vec<u64>>>,
}

impl FakeTicker {
    pub fn running(&self) -> Option<u64> {
        *self.running.lock().unwrap()
    }
}

impl TickScheduler for FakeTicker {
    fn start(&mut self, interval_ms: u64) -> u64 {
        let mut generation = self.generation.lock().unwrap();
        *generation += 1;
        *self.running.lock().unwrap() = Some(*generation);
        self.intervals.lock().unwrap().push(interval_ms);
        *generation
    }

    fn stop(&mut self) {
        *self.running.lock().unwrap() = None;
    }
}
