use std::fmt::Write as _;
use std::io::Write as _;

use alert_core::{format_countdown, format_sample, format_threshold, AccelerationSample, CountdownPhase};

pub const HELP_TEXT: &str = "\
DriveSafe: Your Personal Safety Companion

  start | stop        activate / deactivate shake detection
  toggle              flip shake detection
  accel X Y Z         set the simulated accelerometer reading
  cancel              cancel a running emergency countdown
  sos                 send the SOS email now
  threshold N         shake threshold, 2.0 (sensitive) to 10.0
  add EMAIL           add an emergency contact
  remove N            remove contact number N
  contacts            list emergency contacts
  status              show current state
  help                this text
  quit                exit";

/// Human-readable, user-facing messages (the app's alert dialogs).
pub trait NoticeSink: Send + Sync {
    fn notice(&self, title: &str, body: &str);
}

pub struct ConsoleNotices;

impl NoticeSink for ConsoleNotices {
    fn notice(&self, title: &str, body: &str) {
        let mut out = std::io::stdout().lock();
        writeln!(out, "!! {}: {}", title, body).ok();
        out.flush().ok();
    }
}

#[derive(Clone, Debug)]
pub struct StatusView {
    pub tracking: bool,
    pub shake_detected: bool,
    pub reading: AccelerationSample,
    pub countdown: CountdownPhase,
    pub threshold: f64,
    pub contacts: usize,
    pub email_sent: bool,
}

pub fn render_status(view: &StatusView) -> String {
    let mut s = String::new();
    let toggle = if view.tracking {
        "Deactivate Shake Detection"
    } else {
        "Activate Shake Detection"
    };
    writeln!(s, "[{}]", toggle).ok();
    writeln!(s, "Shake Detected: {}", if view.shake_detected { "Yes" } else { "No" }).ok();
    writeln!(s, "Shake Data: {}", format_sample(&view.reading)).ok();
    match view.countdown {
        CountdownPhase::Armed(n) => {
            writeln!(s, "{}  (type 'cancel' to stop)", format_countdown(n)).ok();
        }
        CountdownPhase::Fired if view.shake_detected => {
            writeln!(s, "{}", format_countdown(0)).ok();
        }
        CountdownPhase::Cancelled => {
            writeln!(s, "Countdown cancelled").ok();
        }
        _ => {}
    }
    write!(
        s,
        "Shake Threshold: {}  Contacts: {}  SOS sent: {}",
        format_threshold(view.threshold),
        view.contacts,
        if view.email_sent { "yes" } else { "no" }
    )
    .ok();
    s
}

pub fn render_contacts(contacts: &[String]) -> String {
    if contacts.is_empty() {
        return "Current Emergency Contacts: (none)".into();
    }
    let mut s = String::from("Current Emergency Contacts:");
    for (i, c) in contacts.iter().enumerate() {
        write!(s, "\n  {}. {}", i, c).ok();
    }
    s
}

fn print_block(text: &str) {
    let mut out = std::io::stdout().lock();
    writeln!(out, "{}", text).ok();
    out.flush().ok();
}

pub fn draw_status(view: &StatusView) {
    print_block(&render_status(view));
}

pub fn draw_contacts(contacts: &[String]) {
    print_block(&render_contacts(contacts));
}

pub fn draw_help() {
    print_block(HELP_TEXT);
}
