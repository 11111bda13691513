//! barfeed binary: config, logging, signal wiring, and the reactor loop
//! against stdout.

use std::io;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use barfeed::input::InputSource;
use barfeed::reactor::{Reactor, StopHandle};
use barfeed::{Config, widgets};

static STOP: OnceLock<StopHandle> = OnceLock::new();

extern "C" fn on_signal(_: i32) {
    // Atomic store plus one eventfd write; both signal-safe.
    if let Some(handle) = STOP.get() {
        handle.stop();
    }
}

fn install_signal_handlers(handle: StopHandle) -> Result<()> {
    STOP.set(handle).ok();
    let action = SigAction::new(
        SigHandler::Handler(on_signal),
        SaFlags::empty(),
        SigSet::empty(),
    );
    unsafe {
        sigaction(Signal::SIGINT, &action).context("failed to install SIGINT handler")?;
        sigaction(Signal::SIGTERM, &action).context("failed to install SIGTERM handler")?;
    }
    Ok(())
}

fn main() -> Result<()> {
    // stdout carries the wire format; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let config = Config::load();

    let mut reactor = Reactor::new().context("reactor startup failed")?;
    reactor.set_input(InputSource::stdin()?)?;
    install_signal_handlers(reactor.stop_handle())?;

    for name in &config.widgets {
        match widgets::create(name, &config) {
            Some(widget) => reactor.add_widget(widget)?,
            None => warn!(widget = %name, "unknown widget in config, skipping"),
        }
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    reactor.run(&mut out)
}
