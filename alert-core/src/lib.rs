//! Pure alert logic library with no platform dependencies.
//! Testable on host; the app wires sensors, timers and transports around it.

pub const MIN_THRESHOLD: f64 = 2.0;
pub const MAX_THRESHOLD: f64 = 10.0;
pub const DEFAULT_THRESHOLD: f64 = 6.0;

/// Seconds between a confirmed shake and dispatch.
pub const COUNTDOWN_TICKS: u8 = 10;

/// Vibrate, pause, vibrate (ms) played when a countdown arms.
pub const HAPTIC_PATTERN_MS: [u64; 3] = [500, 500, 500];

#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct AccelerationSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl AccelerationSample {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Sum of the per-axis absolute differences.
    pub fn delta(&self, other: &AccelerationSample) -> f64 {
        (self.x - other.x).abs() + (self.y - other.y).abs() + (self.z - other.z).abs()
    }
}

/// Whether the detector may emit. Closed while a countdown is armed or has fired.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum ShakeGate {
    Open,
    Closed,
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct ShakeEvent {
    pub sample: AccelerationSample,
    pub delta: f64,
}

/// Clamp a requested threshold into the supported range. `None` for NaN.
pub fn clamp_threshold(value: f64) -> Option<f64> {
    if value.is_nan() {
        return None;
    }
    Some(value.clamp(MIN_THRESHOLD, MAX_THRESHOLD))
}

/// Debounced threshold detector.
///
/// The comparison baseline is the sample at the last *confirmed* shake, not
/// the previous tick. Jitter above threshold therefore does not compound,
/// but the baseline goes stale: a device resting in a new orientation for a
/// long time is still compared against the old one, so a small later
/// movement can trigger. This is the intended coarse debounce.
pub struct ShakeDetector {
    threshold: f64,
    last_shake: AccelerationSample,
    last_reading: AccelerationSample,
}

impl ShakeDetector {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold: clamp_threshold(threshold).unwrap_or(DEFAULT_THRESHOLD),
            last_shake: AccelerationSample::default(),
            last_reading: AccelerationSample::default(),
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Takes effect on the next sample. Returns the threshold now in use.
    pub fn set_threshold(&mut self, value: f64) -> f64 {
        if let Some(t) = clamp_threshold(value) {
            self.threshold = t;
        }
        self.threshold
    }

    /// Most recent sample seen, for display.
    pub fn last_reading(&self) -> AccelerationSample {
        self.last_reading
    }

    pub fn last_shake(&self) -> AccelerationSample {
        self.last_shake
    }

    pub fn observe(&mut self, sample: AccelerationSample, gate: ShakeGate) -> Option<ShakeEvent> {
        self.last_reading = sample;
        let delta = sample.delta(&self.last_shake);
        if delta > self.threshold && gate == ShakeGate::Open {
            self.last_shake = sample;
            Some(ShakeEvent { sample, delta })
        } else {
            None
        }
    }
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum CountdownPhase {
    Idle,
    Armed(u8),
    Cancelled,
    Fired,
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum TickOutcome {
    /// Still armed with this many ticks left.
    Remaining(u8),
    /// Reached zero. The caller dispatches and stops the timer.
    Fired,
    /// First tick after a cancellation. The caller stops the timer.
    Cancelled,
    /// Nothing armed; the tick should not have arrived.
    Stale,
}

/// The emergency countdown, without side effects.
///
/// Cancellation and ticks are expected to be delivered in FIFO order from a
/// single queue; whichever is handled first wins, so a countdown can never
/// both fire and be cancelled.
pub struct Countdown {
    phase: CountdownPhase,
    ticks: u8,
    cancel_requested: bool,
}

impl Countdown {
    pub fn new() -> Self {
        Self::with_ticks(COUNTDOWN_TICKS)
    }

    pub fn with_ticks(ticks: u8) -> Self {
        Self {
            phase: CountdownPhase::Idle,
            ticks,
            cancel_requested: false,
        }
    }

    pub fn phase(&self) -> CountdownPhase {
        self.phase
    }

    pub fn is_armed(&self) -> bool {
        matches!(self.phase, CountdownPhase::Armed(_))
    }

    pub fn remaining(&self) -> Option<u8> {
        match self.phase {
            CountdownPhase::Armed(n) => Some(n),
            CountdownPhase::Fired => Some(0),
            _ => None,
        }
    }

    pub fn shake_gate(&self) -> ShakeGate {
        match self.phase {
            CountdownPhase::Idle | CountdownPhase::Cancelled => ShakeGate::Open,
            CountdownPhase::Armed(_) | CountdownPhase::Fired => ShakeGate::Closed,
        }
    }

    /// Arm the countdown. Starting from `Cancelled` cleans up to `Idle`
    /// first. Ignored while armed or after firing; returns whether it armed.
    pub fn start(&mut self) -> bool {
        match self.phase {
            CountdownPhase::Idle | CountdownPhase::Cancelled => {
                self.cancel_requested = false;
                self.phase = CountdownPhase::Armed(self.ticks);
                true
            }
            CountdownPhase::Armed(_) | CountdownPhase::Fired => false,
        }
    }

    pub fn cancel(&mut self) -> bool {
        if !self.is_armed() {
            return false;
        }
        self.cancel_requested = true;
        self.phase = CountdownPhase::Cancelled;
        true
    }

    pub fn tick(&mut self) -> TickOutcome {
        match self.phase {
            CountdownPhase::Armed(n) => {
                let left = n.saturating_sub(1);
                if left == 0 {
                    self.phase = CountdownPhase::Fired;
                    TickOutcome::Fired
                } else {
                    self.phase = CountdownPhase::Armed(left);
                    TickOutcome::Remaining(left)
                }
            }
            CountdownPhase::Cancelled if self.cancel_requested => {
                self.cancel_requested = false;
                TickOutcome::Cancelled
            }
            _ => TickOutcome::Stale,
        }
    }

    pub fn reset(&mut self) {
        self.phase = CountdownPhase::Idle;
        self.cancel_requested = false;
    }
}

impl Default for Countdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-lifetime guard against sending the alert twice.
/// There is deliberately no way to clear it.
#[derive(Default, Debug)]
pub struct DispatchRecord {
    email_sent: bool,
}

impl DispatchRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn email_sent(&self) -> bool {
        self.email_sent
    }

    pub fn mark_sent(&mut self) {
        self.email_sent = true;
    }
}

/// True when `input` contains `\S+@\S+\.\S+` anywhere.
pub fn is_valid_contact(input: &str) -> bool {
    input.split_whitespace().any(token_has_address_shape)
}

fn token_has_address_shape(token: &str) -> bool {
    let chars: Vec<char> = token.chars().collect();
    // The first '@' past position 0 leaves the most room for the domain.
    let at = match chars.iter().skip(1).position(|&c| c == '@') {
        Some(p) => p + 1,
        None => return false,
    };
    chars.len() >= at + 4 && chars[at + 2..chars.len() - 1].contains(&'.')
}

/// Contacts the transport can address. Anything else is skipped silently.
pub fn is_deliverable(contact: &str) -> bool {
    contact.contains('@')
}

pub fn maps_link(latitude: f64, longitude: f64) -> String {
    format!("https://www.google.com/maps?q={},{}", latitude, longitude)
}

/// Body of the message sent to each contact.
pub fn alert_text(latitude: f64, longitude: f64) -> String {
    format!(
        "Help! My current location is: Latitude {}, Longitude {}\n\nView on Google Maps: {}",
        latitude,
        longitude,
        maps_link(latitude, longitude)
    )
}

/// Format a sample as "x: 0.00, y: 0.00, z: 0.00"
pub fn format_sample(sample: &AccelerationSample) -> String {
    format!("x: {:.2}, y: {:.2}, z: {:.2}", sample.x, sample.y, sample.z)
}

/// Format remaining ticks as "Emergency in: 10s"
pub fn format_countdown(ticks: u8) -> String {
    format!("Emergency in: {}s", ticks)
}

/// Format a threshold with one decimal, as the slider shows it.
pub fn format_threshold(threshold: f64) -> String {
    format!("{:.1}", threshold)
}
