mod alerts;
mod app;
mod commands;
mod config;
mod contacts;
mod dispatch;
mod error;
mod location;
mod pump;
mod sensor;
mod transport;
mod ui;

#[cfg(test)]
mod fakes;

use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use crossbeam_channel::Sender;
use tracing_subscriber::EnvFilter;

use crate::alerts::ConsoleAlerts;
use crate::app::{AppOp, Flow, SafetyApp, Services};
use crate::commands::{parse_input, Input};
use crate::config::Cli;
use crate::pump::Pump;
use crate::sensor::{ReadingHandle, SimulatedAccelerometer};
use crate::ui::ConsoleNotices;

fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // Also installs the `log` -> tracing bridge.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
}

/// Console input: readings go straight to the simulated sensor, commands
/// join the app queue behind whatever is already pending.
fn input_thread(events: Sender<AppOp>, reading: ReadingHandle) {
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                log::error!("stdin: {}", e);
                break;
            }
        };
        match parse_input(&line) {
            Ok(Some(Input::Reading(sample))) => reading.set(sample),
            Ok(Some(Input::Command(cmd))) => {
                if events.send(AppOp::Command(cmd)).is_err() {
                    return;
                }
            }
            Ok(None) => {}
            Err(e) => println!("{} (type 'help')", e),
        }
    }
    events.send(AppOp::Quit).ok();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);
    log::info!("DriveSafe PID is {}", std::process::id());

    let (events, queue) = crossbeam_channel::unbounded();

    let console = Arc::new(ConsoleAlerts::new(cli.alert_config()));
    let services = Services {
        haptics: console.clone(),
        notifier: console.clone(),
        speech: console,
        location: Arc::new(cli.location()),
        transport: cli.transport()?,
        notices: Arc::new(ConsoleNotices),
    };
    let contacts = cli.contact_store()?;

    let sampler = SimulatedAccelerometer::spawn(Duration::from_millis(cli.sample_interval_ms.max(1)))
        .context("start accelerometer")?;
    let reading = sampler.reading_handle();
    let pump = Pump::spawn(events.clone()).context("start countdown timer")?;

    let mut app = SafetyApp::new(
        cli.settings(),
        contacts,
        services,
        Box::new(sampler),
        Box::new(pump),
        events.clone(),
    );

    let input_events = events.clone();
    std::thread::Builder::new()
        .name("input".into())
        .spawn(move || input_thread(input_events, reading))
        .context("start input reader")?;

    ui::draw_help();
    ui::draw_status(&app.status());

    // The app holds a sender, so the queue never disconnects while we loop.
    while let Ok(op) = queue.recv() {
        match app.handle(op) {
            Flow::Continue => {}
            Flow::Redraw => ui::draw_status(&app.status()),
            Flow::ShowContacts => ui::draw_contacts(app.contacts().list()),
            Flow::ShowHelp => ui::draw_help(),
            Flow::Quit => break,
        }
    }

    app.shutdown();
    log::info!("DriveSafe exiting");
    Ok(())
}
