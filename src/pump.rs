use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::app::AppOp;

/// Repeating timer feeding `AppOp::Pump` into the app queue.
pub trait TickScheduler: Send {
    /// Begin, or restart, ticking. Returns the generation every tick will carry;
    /// ticks from earlier generations must be ignored by the receiver.
    fn start(&mut self, interval_ms: u64) -> u64;
    fn stop(&mut self);
}

enum PumpControl {
    Start { interval: Duration, generation: u64 },
    Stop,
    Quit,
}

pub struct Pump {
    control: Sender<PumpControl>,
    generation: u64,
    running: bool,
    thread: Option<JoinHandle<()>>,
}

impl Pump {
    pub fn spawn(events: Sender<AppOp>) -> std::io::Result<Self> {
        let (control, control_rx) = crossbeam_channel::unbounded();
        let thread = std::thread::Builder::new()
            .name("pump".into())
            .spawn(move || pump_thread(control_rx, events))?;
        Ok(Self {
            control,
            generation: 0,
            running: false,
            thread: Some(thread),
        })
    }

    fn send(&self, msg: PumpControl) {
        if self.control.send(msg).is_err() {
            log::error!("pump thread is gone; countdown ticks will not arrive");
        }
    }
}

impl TickScheduler for Pump {
    fn start(&mut self, interval_ms: u64) -> u64 {
        self.generation += 1;
        self.running = true;
        let interval = Duration::from_millis(interval_ms.max(1));
        self.send(PumpControl::Start {
            interval,
            generation: self.generation,
        });
        self.generation
    }

    fn stop(&mut self) {
        if self.running {
            self.running = false;
            self.send(PumpControl::Stop);
        }
    }
}

impl Drop for Pump {
    fn drop(&mut self) {
        self.control.send(PumpControl::Quit).ok();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("pump thread panicked");
            }
        }
    }
}

struct Armed {
    interval: Duration,
    generation: u64,
    deadline: Instant,
}

fn pump_thread(control: Receiver<PumpControl>, events: Sender<AppOp>) {
    let mut armed: Option<Armed> = None;

    loop {
        // Block while stopped; wait for the next deadline while running.
        let msg = match &armed {
            Some(a) => match control.recv_deadline(a.deadline) {
                Ok(msg) => Some(msg),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => break,
            },
            None => match control.recv() {
                Ok(msg) => Some(msg),
                Err(_) => break,
            },
        };

        match msg {
            None => {
                if let Some(a) = armed.as_mut() {
                    if events.send(AppOp::Pump(a.generation)).is_err() {
                        log::error!("app queue closed; pump exiting");
                        break;
                    }
                    let late = a.deadline.elapsed();
                    if late > a.interval {
                        // Starved: resynchronise instead of bursting the missed ticks.
                        log::warn!("tick {} late by {:?}", a.generation, late);
                        a.deadline = Instant::now() + a.interval;
                    } else {
                        a.deadline += a.interval;
                    }
                }
            }
            Some(PumpControl::Start { interval, generation }) => {
                armed = Some(Armed {
                    interval,
                    generation,
                    deadline: Instant::now() + interval,
                });
            }
            Some(PumpControl::Stop) => armed = None,
            Some(PumpControl::Quit) => break,
        }
    }
}
