use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::Duration;

use alert_core::AccelerationSample;

pub type SampleCallback = Box<dyn Fn(AccelerationSample) + Send>;

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct SubscriptionHandle(u64);

impl SubscriptionHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

pub trait MotionSampler: Send {
    fn subscribe(&mut self, callback: SampleCallback) -> SubscriptionHandle;
    fn unsubscribe_all(&mut self);
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct Shared {
    reading: Mutex<AccelerationSample>,
    subscribers: Mutex<Vec<(u64, SampleCallback)>>,
    running: AtomicBool,
}

/// Sets the reading the simulated accelerometer reports from now on.
#[derive(Clone)]
pub struct ReadingHandle(Arc<Shared>);

impl ReadingHandle {
    pub fn set(&self, sample: AccelerationSample) {
        *lock(&self.0.reading) = sample;
    }
}

/// Host stand-in for the device accelerometer: reports the current reading
/// to every subscriber at a fixed rate.
pub struct SimulatedAccelerometer {
    shared: Arc<Shared>,
    next_id: u64,
    thread: Option<JoinHandle<()>>,
}

impl SimulatedAccelerometer {
    pub fn spawn(interval: Duration) -> std::io::Result<Self> {
        let shared = Arc::new(Shared {
            reading: Mutex::new(AccelerationSample::default()),
            subscribers: Mutex::new(Vec::new()),
            running: AtomicBool::new(true),
        });
        let worker = shared.clone();
        let thread = std::thread::Builder::new()
            .name("accelerometer".into())
            .spawn(move || sampler_thread(worker, interval))?;
        Ok(Self {
            shared,
            next_id: 0,
            thread: Some(thread),
        })
    }

    pub fn reading_handle(&self) -> ReadingHandle {
        ReadingHandle(self.shared.clone())
    }
}

impl MotionSampler for SimulatedAccelerometer {
    fn subscribe(&mut self, callback: SampleCallback) -> SubscriptionHandle {
        self.next_id += 1;
        lock(&self.shared.subscribers).push((self.next_id, callback));
        log::debug!("accelerometer subscription {}", self.next_id);
        SubscriptionHandle::new(self.next_id)
    }

    fn unsubscribe_all(&mut self) {
        let dropped = {
            let mut subs = lock(&self.shared.subscribers);
            let n = subs.len();
            subs.clear();
            n
        };
        log::debug!("accelerometer: dropped {} subscription(s)", dropped);
    }
}

impl Drop for SimulatedAccelerometer {
    fn drop(&mut self) {
        self.shared.running.store(false, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("accelerometer thread panicked");
            }
        }
    }
}

fn sampler_thread(shared: Arc<Shared>, interval: Duration) {
    while shared.running.load(Ordering::Relaxed) {
        std::thread::sleep(interval);
        let reading = *lock(&shared.reading);
        for (_, callback) in lock(&shared.subscribers).iter() {
            callback(reading);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribers_receive_current_reading() {
        let mut accel = SimulatedAccelerometer::spawn(Duration::from_millis(2)).unwrap();
        let (tx, rx) = crossbeam_channel::unbounded();
        accel.reading_handle().set(AccelerationSample::new(0.0, 0.0, 7.0));

        let handle = accel.subscribe(Box::new(move |s| {
            tx.send(s).ok();
        }));
        assert_eq!(handle.id(), 1);

        let got = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(got, AccelerationSample::new(0.0, 0.0, 7.0));
    }

    #[test]
    fn test_unsubscribe_all_stops_delivery() {
        let mut accel = SimulatedAccelerometer::spawn(Duration::from_millis(2)).unwrap();
        let (tx, rx) = crossbeam_channel::unbounded();
        accel.subscribe(Box::new(move |s| {
            tx.send(s).ok();
        }));
        rx.recv_timeout(Duration::from_secs(2)).unwrap();

        accel.unsubscribe_all();
        while rx.try_recv().is_ok() {}
        // The callback (and its sender) is gone, so the channel disconnects.
        assert!(matches!(
            rx.recv_timeout(Duration::from_millis(100)),
            Err(crossbeam_channel::RecvTimeoutError::Disconnected)
        ));
    }
}
