use std::fmt;
use std::sync::Arc;

use alert_core::DispatchRecord;

use crate::alerts::{NotificationSink, SpeechAnnouncer, ALERT_BODY, ALERT_TITLE, SPEECH_TEXT};
use crate::contacts::ContactStore;
use crate::error::{DispatchError, LocationError, TransportError};
use crate::location::{locate, GeolocationProvider};
use crate::transport::MessageTransport;
use crate::ui::NoticeSink;

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum DispatchStep {
    Contacts,
    Notification,
    Speech,
    Location,
    Delivery,
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum StepPolicy {
    /// Failure aborts the dispatch before anything is sent.
    Fatal,
    /// Failure is logged and the dispatch carries on.
    BestEffort,
    /// Failures are reported per contact and never abort the batch.
    Isolated,
}

/// Execution order and failure policy of every dispatch step.
pub const STEPS: [(DispatchStep, StepPolicy); 5] = [
    (DispatchStep::Contacts, StepPolicy::Fatal),
    (DispatchStep::Notification, StepPolicy::BestEffort),
    (DispatchStep::Speech, StepPolicy::BestEffort),
    (DispatchStep::Location, StepPolicy::Fatal),
    (DispatchStep::Delivery, StepPolicy::Isolated),
];

impl DispatchStep {
    pub fn policy(self) -> StepPolicy {
        STEPS
            .iter()
            .find(|(step, _)| *step == self)
            .map(|(_, policy)| *policy)
            .unwrap_or(StepPolicy::Fatal)
    }

    pub fn name(self) -> &'static str {
        match self {
            DispatchStep::Contacts => "contacts",
            DispatchStep::Notification => "notification",
            DispatchStep::Speech => "speech",
            DispatchStep::Location => "location",
            DispatchStep::Delivery => "deliver",
        }
    }
}

#[derive(Debug)]
pub struct Delivery {
    pub contact: String,
    pub result: Result<(), TransportError>,
}

#[derive(Debug)]
pub struct DispatchReport {
    pub notified: bool,
    pub spoken: bool,
    pub deliveries: Vec<Delivery>,
    /// Contacts without an address shape, skipped without error.
    pub skipped: Vec<String>,
}

impl DispatchReport {
    pub fn delivered(&self) -> usize {
        self.deliveries.iter().filter(|d| d.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.deliveries.len() - self.delivered()
    }
}

#[derive(Debug)]
pub enum DispatchOutcome {
    /// An earlier dispatch already ran; nothing was done.
    AlreadySent,
    Completed(DispatchReport),
}

/// Log a non-fatal step failure according to its policy. Returns success.
fn settle<E: fmt::Display>(step: DispatchStep, result: Result<(), E>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            match step.policy() {
                StepPolicy::BestEffort => log::warn!("{}: {}; continuing", step.name(), e),
                StepPolicy::Fatal | StepPolicy::Isolated => log::error!("{}: {}", step.name(), e),
            }
            false
        }
    }
}

pub struct AlertDispatcher {
    record: DispatchRecord,
    notifier: Arc<dyn NotificationSink>,
    speech: Arc<dyn SpeechAnnouncer>,
    location: Arc<dyn GeolocationProvider>,
    transport: Arc<dyn MessageTransport>,
    notices: Arc<dyn NoticeSink>,
}

impl AlertDispatcher {
    pub fn new(
        notifier: Arc<dyn NotificationSink>,
        speech: Arc<dyn SpeechAnnouncer>,
        location: Arc<dyn GeolocationProvider>,
        transport: Arc<dyn MessageTransport>,
        notices: Arc<dyn NoticeSink>,
    ) -> Self {
        Self {
            record: DispatchRecord::new(),
            notifier,
            speech,
            location,
            transport,
            notices,
        }
    }

    pub fn email_sent(&self) -> bool {
        self.record.email_sent()
    }

    /// Run the alert once per process. Both countdown expiry and the manual
    /// "send now" path come through here.
    pub fn dispatch(&mut self, contacts: &ContactStore) -> Result<DispatchOutcome, DispatchError> {
        if self.record.email_sent() {
            log::info!("alert already sent; not resending");
            return Ok(DispatchOutcome::AlreadySent);
        }

        if contacts.is_empty() {
            log::error!("{}: none configured, alert not sent", DispatchStep::Contacts.name());
            self.notices.notice(
                "Missing Contact",
                "No email address provided. Please add at least one emergency contact.",
            );
            return Err(DispatchError::NoContacts);
        }

        let notified = settle(
            DispatchStep::Notification,
            self.notifier.schedule_immediate(ALERT_TITLE, ALERT_BODY),
        );
        let spoken = settle(DispatchStep::Speech, self.speech.speak(SPEECH_TEXT));

        let position = match locate(&*self.location) {
            Ok(p) => p,
            Err(e) => {
                log::error!("{}: {}; alert not sent", DispatchStep::Location.name(), e);
                match e {
                    LocationError::Denied => self.notices.notice(
                        "Permission Denied",
                        "Location access is required for emergency alerts.",
                    ),
                    LocationError::Unavailable(_) => {
                        self.notices.notice("Error", "Failed to get current location.")
                    }
                }
                return Err(e.into());
            }
        };
        log::info!("{}: position acquired", DispatchStep::Location.name());

        let (targets, skipped): (Vec<&String>, Vec<&String>) = contacts
            .list()
            .iter()
            .partition(|c| alert_core::is_deliverable(c));
        for contact in &skipped {
            log::debug!("{}: skipping non-address contact {:?}", DispatchStep::Delivery.name(), contact);
        }

        let text = alert_core::alert_text(position.latitude, position.longitude);
        let deliveries = self.deliver_all(&targets, &text);
        for delivery in &deliveries {
            match &delivery.result {
                Ok(()) => {
                    log::info!("{}: sent to {}", DispatchStep::Delivery.name(), delivery.contact);
                    self.notices.notice(
                        "Success",
                        &format!("Email sent successfully to {}", delivery.contact),
                    );
                }
                Err(e) => {
                    settle(DispatchStep::Delivery, Err(format!("{}: {}", delivery.contact, e)));
                    self.notices
                        .notice("Error", &format!("Failed to send email to {}", delivery.contact));
                }
            }
        }

        // Marks the attempt, not success: a partly failed batch is not retried.
        self.record.mark_sent();

        let report = DispatchReport {
            notified,
            spoken,
            deliveries,
            skipped: skipped.into_iter().cloned().collect(),
        };
        log::info!(
            "dispatch complete: {} delivered, {} failed, {} skipped",
            report.delivered(),
            report.failed(),
            report.skipped.len()
        );
        Ok(DispatchOutcome::Completed(report))
    }

    /// One worker per contact; results come back in contact order once all settle.
    fn deliver_all(&self, targets: &[&String], text: &str) -> Vec<Delivery> {
        let transport = &*self.transport;
        std::thread::scope(|scope| {
            let handles: Vec<_> = targets
                .iter()
                .map(|contact| {
                    let contact: &str = contact;
                    (contact, scope.spawn(move || transport.deliver(contact, text)))
                })
                .collect();
            handles
                .into_iter()
                .map(|(contact, handle)| Delivery {
                    contact: contact.to_owned(),
                    result: handle
                        .join()
                        .unwrap_or_else(|_| Err(TransportError::Aborted("delivery worker panicked".into()))),
                })
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::*;

    struct Harness {
        alerts: Arc<RecordingAlerts>,
        location: Arc<FakeLocation>,
        transport: Arc<RecordingTransport>,
        notices: Arc<RecordingNotices>,
        dispatcher: AlertDispatcher,
    }

    fn harness(alerts: RecordingAlerts, location: FakeLocation, transport: RecordingTransport) -> Harness {
        let alerts = Arc::new(alerts);
        let location = Arc::new(location);
        let transport = Arc::new(transport);
        let notices = Arc::new(RecordingNotices::default());
        let dispatcher = AlertDispatcher::new(
            alerts.clone(),
            alerts.clone(),
            location.clone(),
            transport.clone(),
            notices.clone(),
        );
        Harness { alerts, location, transport, notices, dispatcher }
    }

    fn default_harness() -> Harness {
        harness(RecordingAlerts::default(), FakeLocation::at(1.5, 2.5), RecordingTransport::default())
    }

    #[test]
    fn test_policy_table() {
        assert_eq!(DispatchStep::Contacts.policy(), StepPolicy::Fatal);
        assert_eq!(DispatchStep::Notification.policy(), StepPolicy::BestEffort);
        assert_eq!(DispatchStep::Speech.policy(), StepPolicy::BestEffort);
        assert_eq!(DispatchStep::Location.policy(), StepPolicy::Fatal);
        assert_eq!(DispatchStep::Delivery.policy(), StepPolicy::Isolated);
    }

    #[test]
    fn test_sends_location_to_contact() {
        let mut h = default_harness();
        let contacts = ContactStore::from_raw(["a@b.com"]);

        let outcome = h.dispatcher.dispatch(&contacts).unwrap();
        let report = match outcome {
            DispatchOutcome::Completed(r) => r,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(report.delivered(), 1);
        assert!(report.notified && report.spoken);

        let sent = h.transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "a@b.com");
        assert!(sent[0].1.contains("Latitude 1.5, Longitude 2.5"));
        assert!(sent[0].1.contains("https://www.google.com/maps?q=1.5,2.5"));

        assert_eq!(h.alerts.count("notify Emergency Alert"), 1);
        assert_eq!(h.alerts.count("speak"), 1);
        assert_eq!(h.notices.bodies(), vec!["Email sent successfully to a@b.com"]);
        assert!(h.dispatcher.email_sent());
    }

    #[test]
    fn test_second_dispatch_sends_nothing() {
        let mut h = default_harness();
        let contacts = ContactStore::from_raw(["a@b.com"]);
        h.dispatcher.dispatch(&contacts).unwrap();
        let events_before = h.alerts.events().len();

        let outcome = h.dispatcher.dispatch(&contacts).unwrap();
        assert!(matches!(outcome, DispatchOutcome::AlreadySent));
        assert_eq!(h.transport.sent().len(), 1);
        assert_eq!(h.alerts.events().len(), events_before);
        assert_eq!(h.location.fetches(), 1);
    }

    #[test]
    fn test_no_contacts_does_nothing() {
        let mut h = default_harness();
        let err = h.dispatcher.dispatch(&ContactStore::new()).unwrap_err();
        assert_eq!(err, DispatchError::NoContacts);
        assert!(h.alerts.events().is_empty());
        assert!(h.transport.sent().is_empty());
        assert_eq!(h.location.fetches(), 0);
        assert_eq!(h.notices.titles(), vec!["Missing Contact"]);
        assert!(!h.dispatcher.email_sent());
    }

    #[test]
    fn test_denied_location_sends_nothing() {
        let mut h = harness(RecordingAlerts::default(), FakeLocation::denied(), RecordingTransport::default());
        let contacts = ContactStore::from_raw(["a@b.com", "c@d.org"]);

        let err = h.dispatcher.dispatch(&contacts).unwrap_err();
        assert_eq!(err, DispatchError::PermissionDenied);
        assert!(h.transport.sent().is_empty());
        assert_eq!(h.location.fetches(), 0);
        assert_eq!(h.notices.titles(), vec!["Permission Denied"]);
        // Not marked: a later attempt may still go out
        assert!(!h.dispatcher.email_sent());
    }

    #[test]
    fn test_failed_fix_sends_nothing() {
        let mut h = harness(RecordingAlerts::default(), FakeLocation::no_fix(), RecordingTransport::default());
        let contacts = ContactStore::from_raw(["a@b.com"]);

        let err = h.dispatcher.dispatch(&contacts).unwrap_err();
        assert!(matches!(err, DispatchError::LocationUnavailable(_)));
        assert!(h.transport.sent().is_empty());
        assert_eq!(h.notices.bodies(), vec!["Failed to get current location."]);
    }

    #[test]
    fn test_non_address_contacts_are_skipped() {
        let mut h = default_harness();
        let contacts = ContactStore::from_raw(["not-an-email", "a@b.com"]);

        let report = match h.dispatcher.dispatch(&contacts).unwrap() {
            DispatchOutcome::Completed(r) => r,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(report.skipped, vec!["not-an-email"]);
        let recipients: Vec<String> = h.transport.sent().into_iter().map(|(to, _)| to).collect();
        assert_eq!(recipients, vec!["a@b.com"]);
    }

    #[test]
    fn test_only_non_address_contacts_still_marks_sent() {
        let mut h = default_harness();
        let contacts = ContactStore::from_raw(["not-an-email"]);
        assert!(h.dispatcher.dispatch(&contacts).is_ok());
        assert!(h.transport.sent().is_empty());
        assert!(h.dispatcher.email_sent());
    }

    #[test]
    fn test_partial_failure_is_isolated_and_final() {
        let mut h = harness(
            RecordingAlerts::default(),
            FakeLocation::at(1.5, 2.5),
            RecordingTransport::failing_for(&["bad@b.com"]),
        );
        let contacts = ContactStore::from_raw(["bad@b.com", "good@b.com"]);

        let report = match h.dispatcher.dispatch(&contacts).unwrap() {
            DispatchOutcome::Completed(r) => r,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(report.delivered(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.deliveries[0].contact, "bad@b.com");
        assert!(report.deliveries[0].result.is_err());
        assert_eq!(h.transport.sent().len(), 2);

        let mut bodies = h.notices.bodies();
        bodies.sort();
        assert_eq!(
            bodies,
            vec!["Email sent successfully to good@b.com", "Failed to send email to bad@b.com"]
        );

        // No automatic retry of the failed contact
        assert!(h.dispatcher.email_sent());
        assert!(matches!(h.dispatcher.dispatch(&contacts).unwrap(), DispatchOutcome::AlreadySent));
        assert_eq!(h.transport.sent().len(), 2);
    }

    #[test]
    fn test_best_effort_failures_do_not_abort() {
        let alerts = RecordingAlerts {
            fail_notification: true,
            fail_speech: true,
            ..RecordingAlerts::default()
        };
        let mut h = harness(alerts, FakeLocation::at(1.5, 2.5), RecordingTransport::default());
        let contacts = ContactStore::from_raw(["a@b.com"]);

        let report = match h.dispatcher.dispatch(&contacts).unwrap() {
            DispatchOutcome::Completed(r) => r,
            other => panic!("unexpected {:?}", other),
        };
        assert!(!report.notified);
        assert!(!report.spoken);
        assert_eq!(report.delivered(), 1);
    }
}
