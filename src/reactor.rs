//! The reactor: single-threaded event multiplexing over every wakeup source.
//!
//! One logical thread blocks in the multiplexer; dispatch, scheduling, and
//! feed serialization all run to completion on that thread, so no locking is
//! needed anywhere. Each wait produces one dispatch batch processed in a
//! fixed order (stop, input, clock fan-out, then widgets in registry order)
//! followed by exactly one feed emission.

use std::collections::HashSet;
use std::io::Write;
use std::os::unix::io::{AsFd, AsRawFd};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result, bail};
use nix::sys::eventfd::{EfdFlags, EventFd};
use nix::unistd;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::input::InputSource;
use crate::multiplexer::{Multiplexer, Owner};
use crate::protocol::{self, decode_click};
use crate::registry::Registry;
use crate::scheduler::Scheduler;
use crate::widget::{TriggerMode, Widget};

/// Reactor lifecycle. `Uninitialized` only exists during construction;
/// `Reactor::new` hands back an `Initialized` value or fails outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Initialized,
    Running,
    Stopped,
}

/// Clonable handle that requests a stop: sets the flag and wakes a blocked
/// wait through the stop eventfd. Safe to trigger from a signal handler
/// (atomic store plus a single eventfd write).
#[derive(Clone)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
    efd: Arc<EventFd>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
        let _ = self.efd.write(1);
    }

    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

pub struct Reactor {
    phase: Phase,
    multiplexer: Multiplexer,
    clock: Clock,
    scheduler: Scheduler,
    registry: Registry,
    input: Option<InputSource>,
    stop_flag: Arc<AtomicBool>,
    stop_efd: Arc<EventFd>,
}

impl Reactor {
    /// Construct the multiplexer, the shared clock, and the stop wakeup, and
    /// register them. Any failure here is fatal to startup.
    pub fn new() -> Result<Self> {
        let mut reactor = Self {
            phase: Phase::Uninitialized,
            multiplexer: Multiplexer::new()?,
            clock: Clock::new()?,
            scheduler: Scheduler::new(),
            registry: Registry::new(),
            input: None,
            stop_flag: Arc::new(AtomicBool::new(false)),
            stop_efd: Arc::new(
                EventFd::from_value_and_flags(0, EfdFlags::EFD_CLOEXEC | EfdFlags::EFD_NONBLOCK)
                    .context("failed to create stop eventfd")?,
            ),
        };
        reactor
            .multiplexer
            .register(reactor.clock.fd(), Owner::Clock)
            .context("failed to register clock with multiplexer")?;
        reactor
            .multiplexer
            .register(reactor.stop_efd.as_fd().as_raw_fd(), Owner::Stop)
            .context("failed to register stop eventfd with multiplexer")?;
        reactor.phase = Phase::Initialized;
        Ok(reactor)
    }

    /// Attach the click-feedback channel.
    pub fn set_input(&mut self, input: InputSource) -> Result<()> {
        if let Some(old) = self.input.take() {
            let _ = self.multiplexer.deregister(old.fd());
        }
        self.multiplexer
            .register(input.fd(), Owner::Input)
            .context("failed to register input source with multiplexer")?;
        self.input = Some(input);
        Ok(())
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn ticks(&self) -> u64 {
        self.scheduler.ticks()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The trigger mode the core last applied for `name`. Diverges from the
    /// widget's own report while a failure demotion is in effect.
    pub fn applied_mode(&self, name: &str) -> Option<TriggerMode> {
        self.registry.by_name(name).map(|slot| slot.applied)
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            flag: Arc::clone(&self.stop_flag),
            efd: Arc::clone(&self.stop_efd),
        }
    }

    pub fn mark_for_removal(&mut self, name: &str) -> bool {
        self.registry.mark_for_removal(name)
    }

    /// Register a widget: run its one-time init, apply its trigger mode, and
    /// give it the one synchronous update every newcomer receives. Init or
    /// update failures demote the widget to the 1-second polling retry; only
    /// a duplicate name rejects the widget itself.
    pub fn add_widget(&mut self, mut widget: Box<dyn Widget>) -> Result<()> {
        let init_err = widget.init().err();
        let name = widget.name().to_owned();
        self.registry.add(widget)?;
        let index = self.registry.len() - 1;
        if let Some(err) = init_err {
            warn!(widget = %name, error = %err, "widget init failed, starting degraded");
            if let Some(slot) = self.registry.get_mut(index) {
                slot.failed = true;
            }
            self.reconcile(index);
        }
        self.update_widget(index);
        Ok(())
    }

    /// Emit the protocol preamble and the initial feed, then enter `Running`.
    pub fn start<W: Write>(&mut self, out: &mut W) -> Result<()> {
        if self.phase != Phase::Initialized {
            bail!("reactor cannot start from {:?}", self.phase);
        }
        protocol::write_preamble(out).context("failed to write protocol preamble")?;
        protocol::write_cycle(out, &self.registry).context("failed to write initial feed")?;
        self.phase = Phase::Running;
        info!(widgets = self.registry.len(), "reactor running");
        Ok(())
    }

    /// Block for one dispatch batch, process it, and emit one feed element.
    pub fn step<W: Write>(&mut self, out: &mut W) -> Result<()> {
        if self.phase != Phase::Running {
            bail!("reactor cannot step from {:?}", self.phase);
        }
        let batch = self.multiplexer.wait()?;
        self.dispatch_batch(&batch);
        self.sweep_removals();
        protocol::write_cycle(out, &self.registry).context("failed to write feed")?;
        Ok(())
    }

    /// The main loop: wait, dispatch, emit, until a stop is requested. The
    /// stop flag is only observed between batches, so an in-flight batch
    /// always finishes and is emitted.
    pub fn run<W: Write>(&mut self, out: &mut W) -> Result<()> {
        self.start(out)?;
        while !self.stop_flag.load(Ordering::SeqCst) {
            self.step(out)?;
        }
        self.shutdown();
        Ok(())
    }

    /// Release every registered wakeup handle and mark the reactor stopped.
    /// The epoll instance itself is reclaimed when the reactor drops.
    pub fn shutdown(&mut self) {
        for index in 0..self.registry.len() {
            self.release_slot(index);
        }
        if let Some(input) = &self.input {
            let _ = self.multiplexer.deregister(input.fd());
        }
        let _ = self.multiplexer.deregister(self.clock.fd());
        let _ = self.multiplexer.deregister(self.stop_efd.as_fd().as_raw_fd());
        self.phase = Phase::Stopped;
        info!("reactor stopped");
    }

    /// Process one ready batch in deterministic order. Every widget updates
    /// at most once per batch, whether woken by its handle, by the clock, or
    /// by both in the same wait.
    fn dispatch_batch(&mut self, batch: &[Owner]) {
        let mut updated: HashSet<String> = HashSet::new();

        if batch.contains(&Owner::Stop) {
            self.drain_stop();
        }
        if batch.contains(&Owner::Input) {
            self.dispatch_input(&mut updated);
        }
        if batch.contains(&Owner::Clock) {
            self.dispatch_clock(&mut updated);
        }

        // Widget wakeups, ordered by registry position regardless of the
        // order epoll reported them in.
        let mut ready: Vec<(usize, String)> = batch
            .iter()
            .filter_map(|owner| match owner {
                Owner::Widget(name) => {
                    self.registry.position(name).map(|idx| (idx, name.clone()))
                }
                _ => None,
            })
            .collect();
        ready.sort_by_key(|(idx, _)| *idx);
        ready.dedup_by(|a, b| a.1 == b.1);

        for (index, name) in ready {
            if updated.insert(name) {
                self.update_widget(index);
            }
        }
    }

    fn drain_stop(&mut self) {
        let mut buf = [0u8; 8];
        let _ = unistd::read(self.stop_efd.as_fd().as_raw_fd(), &mut buf);
        self.stop_flag.store(true, Ordering::SeqCst);
    }

    /// Decode one click fragment and forward it to the named widget. Unknown
    /// names and malformed fragments are dropped silently.
    fn dispatch_input(&mut self, updated: &mut HashSet<String>) {
        let Some(input) = self.input.as_mut() else {
            return;
        };
        let mut buf = [0u8; 4096];
        let n = match input.read(&mut buf) {
            Ok(0) => return,
            Ok(n) => n,
            Err(err) => {
                warn!(error = %err, "input channel read failed");
                return;
            }
        };
        let Some(event) = decode_click(&buf[..n]) else {
            return;
        };
        let Some(index) = self.registry.position(&event.name) else {
            debug!(widget = %event.name, "click for unknown widget");
            return;
        };
        debug!(widget = %event.name, button = event.button, "routing click");
        if let Some(slot) = self.registry.get_mut(index) {
            slot.widget.handle_click(event.button);
        }
        // A click may update the payload or flip the trigger mode; it counts
        // as this batch's update for the widget.
        updated.insert(event.name);
        self.reconcile(index);
    }

    /// Drain the clock and fan the elapsed ticks out to every due polled
    /// widget, in scheduler registration order.
    fn dispatch_clock(&mut self, updated: &mut HashSet<String>) {
        let elapsed = self.clock.read();
        if elapsed == 0 {
            return;
        }
        self.scheduler.advance(elapsed);
        for name in self.scheduler.due() {
            if let Some(index) = self.registry.position(&name) {
                if updated.insert(name) {
                    self.update_widget(index);
                }
            } else {
                // Stale entry; the registry no longer knows this widget.
                self.scheduler.untrack(&name);
            }
        }
    }

    /// Invoke one widget update, absorbing any error at this dispatch site.
    /// A failing widget keeps its last payload and is demoted to the
    /// 1-second polling retry until an update succeeds again.
    fn update_widget(&mut self, index: usize) {
        let Some(slot) = self.registry.get_mut(index) else {
            return;
        };
        let name = slot.widget.name().to_owned();
        match slot.widget.update() {
            Ok(()) => {
                if slot.failed {
                    info!(widget = %name, "widget recovered");
                }
                slot.failed = false;
            }
            Err(err) => {
                warn!(widget = %name, error = %err, "widget update failed, demoting to 1s poll");
                slot.failed = true;
            }
        }
        self.reconcile(index);
    }

    /// Bring scheduler and multiplexer in line with the widget's current
    /// trigger mode. While the failure flag is set the desired mode is
    /// forced to `Polled { period: 1 }`, the uniform backoff/retry policy.
    fn reconcile(&mut self, index: usize) {
        let Some(slot) = self.registry.get(index) else {
            return;
        };
        let name = slot.widget.name().to_owned();
        let applied = slot.applied;
        let desired = if slot.failed {
            TriggerMode::Polled { period: 1 }
        } else {
            slot.widget.trigger_mode()
        };
        if desired == applied {
            return;
        }

        match applied {
            TriggerMode::Event(fd) => {
                if let Err(err) = self.multiplexer.deregister(fd) {
                    // The widget may have already closed the handle.
                    debug!(widget = %name, error = %err, "stale handle deregistration");
                }
            }
            TriggerMode::Polled { .. } => self.scheduler.untrack(&name),
            TriggerMode::Disabled => {}
        }

        let new_applied = match desired {
            TriggerMode::Disabled => TriggerMode::Disabled,
            TriggerMode::Polled { period } => {
                self.scheduler.track(&name, period);
                TriggerMode::Polled { period }
            }
            TriggerMode::Event(fd) => {
                match self.multiplexer.register(fd, Owner::Widget(name.clone())) {
                    Ok(()) => {
                        debug!(widget = %name, fd, "event-driven registration");
                        TriggerMode::Event(fd)
                    }
                    Err(err) => {
                        // Invalid handle: treat the widget as unavailable and
                        // keep it polled; the next poll retries registration.
                        warn!(widget = %name, error = %err, "handle registration failed, keeping polled");
                        self.scheduler.track(&name, 1);
                        TriggerMode::Polled { period: 1 }
                    }
                }
            }
        };

        if let Some(slot) = self.registry.get_mut(index) {
            slot.applied = new_applied;
        }
    }

    /// Deregister whatever the core holds for a slot: its wakeup handle in
    /// the multiplexer and its scheduler entry. The handle itself stays with
    /// the widget, which drops it when the registry reclaims the slot.
    fn release_slot(&mut self, index: usize) {
        let Some(slot) = self.registry.get(index) else {
            return;
        };
        let name = slot.widget.name().to_owned();
        if let TriggerMode::Event(fd) = slot.applied {
            let _ = self.multiplexer.deregister(fd);
        }
        self.scheduler.untrack(&name);
        if let Some(slot) = self.registry.get_mut(index) {
            slot.applied = TriggerMode::Disabled;
        }
    }

    /// Purge widgets flagged for removal, releasing their back-references
    /// first so the registry sweep fully reclaims them.
    fn sweep_removals(&mut self) {
        if !self.registry.has_pending_removals() {
            return;
        }
        for index in 0..self.registry.len() {
            let pending = self
                .registry
                .get(index)
                .is_some_and(|slot| slot.pending_removal());
            if pending {
                self.release_slot(index);
            }
        }
        let removed = self.registry.sweep();
        if removed > 0 {
            info!(removed, "swept widgets");
        }
    }
}
