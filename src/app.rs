use std::sync::Arc;

use alert_core::{AccelerationSample, Countdown, ShakeDetector, TickOutcome, HAPTIC_PATTERN_MS};
use crossbeam_channel::Sender;

use crate::alerts::{Haptics, NotificationSink, SpeechAnnouncer, CANCEL_BODY, CANCEL_TITLE};
use crate::commands::UiCommand;
use crate::contacts::ContactStore;
use crate::dispatch::{AlertDispatcher, DispatchOutcome};
use crate::location::GeolocationProvider;
use crate::pump::TickScheduler;
use crate::sensor::MotionSampler;
use crate::transport::MessageTransport;
use crate::ui::{NoticeSink, StatusView};

/// Everything the main loop multiplexes, in arrival order.
#[derive(Debug)]
pub enum AppOp {
    Sample(AccelerationSample),
    /// Countdown tick carrying the timer generation that produced it.
    Pump(u64),
    Command(UiCommand),
    Quit,
}

/// What the main loop should do after an op.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Flow {
    Continue,
    Redraw,
    ShowContacts,
    ShowHelp,
    Quit,
}

pub struct Services {
    pub haptics: Arc<dyn Haptics>,
    pub notifier: Arc<dyn NotificationSink>,
    pub speech: Arc<dyn SpeechAnnouncer>,
    pub location: Arc<dyn GeolocationProvider>,
    pub transport: Arc<dyn MessageTransport>,
    pub notices: Arc<dyn NoticeSink>,
}

#[derive(Clone, Debug)]
pub struct AppSettings {
    pub threshold: f64,
    pub countdown_ticks: u8,
    pub tick_interval_ms: u64,
}

/// Owns all alert state; every op is handled to completion before the next.
pub struct SafetyApp {
    detector: ShakeDetector,
    countdown: Countdown,
    dispatcher: AlertDispatcher,
    contacts: ContactStore,

    haptics: Arc<dyn Haptics>,
    notifier: Arc<dyn NotificationSink>,
    notices: Arc<dyn NoticeSink>,

    sampler: Box<dyn MotionSampler>,
    ticker: Box<dyn TickScheduler>,
    events: Sender<AppOp>,
    tick_interval_ms: u64,

    tracking: bool,
    shake_detected: bool,
    active_tick: Option<u64>,
}

impl SafetyApp {
    pub fn new(
        settings: AppSettings,
        contacts: ContactStore,
        services: Services,
        sampler: Box<dyn MotionSampler>,
        ticker: Box<dyn TickScheduler>,
        events: Sender<AppOp>,
    ) -> Self {
        let dispatcher = AlertDispatcher::new(
            services.notifier.clone(),
            services.speech,
            services.location,
            services.transport,
            services.notices.clone(),
        );
        Self {
            detector: ShakeDetector::new(settings.threshold),
            countdown: Countdown::with_ticks(settings.countdown_ticks),
            dispatcher,
            contacts,
            haptics: services.haptics,
            notifier: services.notifier,
            notices: services.notices,
            sampler,
            ticker,
            events,
            tick_interval_ms: settings.tick_interval_ms,
            tracking: false,
            shake_detected: false,
            active_tick: None,
        }
    }

    pub fn handle(&mut self, op: AppOp) -> Flow {
        match op {
            AppOp::Sample(sample) => self.handle_sample(sample),
            AppOp::Pump(generation) => self.handle_pump(generation),
            AppOp::Command(cmd) => self.handle_command(cmd),
            AppOp::Quit => Flow::Quit,
        }
    }

    pub fn status(&self) -> StatusView {
        StatusView {
            tracking: self.tracking,
            shake_detected: self.shake_detected,
            reading: self.detector.last_reading(),
            countdown: self.countdown.phase(),
            threshold: self.detector.threshold(),
            contacts: self.contacts.len(),
            email_sent: self.dispatcher.email_sent(),
        }
    }

    pub fn contacts(&self) -> &ContactStore {
        &self.contacts
    }

    pub fn shutdown(&mut self) {
        if self.tracking {
            self.stop_tracking();
        }
        self.stop_timer();
    }

    fn handle_command(&mut self, cmd: UiCommand) -> Flow {
        match cmd {
            UiCommand::StartTracking => self.start_tracking(),
            UiCommand::StopTracking => self.stop_tracking(),
            UiCommand::ToggleTracking => {
                if self.tracking {
                    self.stop_tracking()
                } else {
                    self.start_tracking()
                }
            }
            UiCommand::Cancel => self.cancel(),
            UiCommand::SendNow => {
                log::info!("manual SOS requested");
                self.send_alert();
                Flow::Redraw
            }
            UiCommand::SetThreshold(value) => {
                let applied = self.detector.set_threshold(value);
                log::info!("shake threshold set to {:.1}", applied);
                Flow::Redraw
            }
            UiCommand::AddContact(input) => {
                match self.contacts.add(&input) {
                    Ok(()) => log::info!("contact added ({} total)", self.contacts.len()),
                    Err(e) => {
                        log::warn!("add contact: {}", e);
                        self.notices.notice("Invalid Email", "Please enter a valid email address.");
                    }
                }
                Flow::ShowContacts
            }
            UiCommand::RemoveContact(index) => {
                match self.contacts.remove(index) {
                    Ok(_) => log::info!("contact {} removed", index),
                    Err(e) => {
                        log::warn!("remove contact: {}", e);
                        self.notices.notice("Error", &e.to_string());
                    }
                }
                Flow::ShowContacts
            }
            UiCommand::ListContacts => Flow::ShowContacts,
            UiCommand::Status => Flow::Redraw,
            UiCommand::Help => Flow::ShowHelp,
            UiCommand::Quit => Flow::Quit,
        }
    }

    fn start_tracking(&mut self) -> Flow {
        if self.tracking {
            return Flow::Continue;
        }
        let events = self.events.clone();
        let handle = self.sampler.subscribe(Box::new(move |sample| {
            events.send(AppOp::Sample(sample)).ok();
        }));
        self.tracking = true;
        log::info!("shake detection on (subscription {})", handle.id());
        Flow::Redraw
    }

    /// Releases the sampler and the timer; the countdown returns to idle.
    fn stop_tracking(&mut self) -> Flow {
        if !self.tracking {
            return Flow::Continue;
        }
        self.sampler.unsubscribe_all();
        self.stop_timer();
        self.countdown.reset();
        self.shake_detected = false;
        self.tracking = false;
        log::info!("shake detection off");
        Flow::Redraw
    }

    fn handle_sample(&mut self, sample: AccelerationSample) -> Flow {
        // Samples queued before unsubscribing may still arrive.
        if !self.tracking {
            return Flow::Continue;
        }
        match self.detector.observe(sample, self.countdown.shake_gate()) {
            Some(event) => {
                log::info!("shake confirmed (delta {:.2})", event.delta);
                self.shake_detected = true;
                self.start_countdown();
                Flow::Redraw
            }
            None => Flow::Continue,
        }
    }

    fn start_countdown(&mut self) {
        if !self.countdown.start() {
            log::debug!("countdown already {:?}; shake ignored", self.countdown.phase());
            return;
        }
        self.haptics.vibrate(&HAPTIC_PATTERN_MS);
        self.active_tick = Some(self.ticker.start(self.tick_interval_ms));
        log::info!("emergency countdown armed");
    }

    fn stop_timer(&mut self) {
        if self.active_tick.take().is_some() {
            self.ticker.stop();
        }
    }

    fn handle_pump(&mut self, generation: u64) -> Flow {
        if self.active_tick != Some(generation) {
            log::debug!("ignoring stale tick {}", generation);
            return Flow::Continue;
        }
        match self.countdown.tick() {
            TickOutcome::Remaining(n) => {
                log::debug!("countdown {}", n);
                Flow::Redraw
            }
            TickOutcome::Fired => {
                self.stop_timer();
                log::warn!("countdown expired; dispatching alert");
                self.send_alert();
                Flow::Redraw
            }
            TickOutcome::Cancelled => {
                self.stop_timer();
                Flow::Continue
            }
            TickOutcome::Stale => {
                self.stop_timer();
                Flow::Continue
            }
        }
    }

    fn cancel(&mut self) -> Flow {
        if !self.countdown.cancel() {
            log::debug!("nothing to cancel");
            return Flow::Continue;
        }
        self.haptics.cancel();
        if let Err(e) = self.notifier.schedule_immediate(CANCEL_TITLE, CANCEL_BODY) {
            log::warn!("cancel notification: {}", e);
        }
        log::info!("emergency countdown cancelled");
        Flow::Redraw
    }

    fn send_alert(&mut self) {
        match self.dispatcher.dispatch(&self.contacts) {
            Ok(DispatchOutcome::AlreadySent) => {}
            Ok(DispatchOutcome::Completed(report)) => {
                log::debug!(
                    "alert finished (notification: {}, speech: {})",
                    report.notified,
                    report.spoken
                );
                if report.failed() > 0 {
                    log::warn!("{} of {} deliveries failed", report.failed(), report.deliveries.len());
                }
            }
            Err(e) => log::error!("alert not sent: {}", e),
        }
    }
}
