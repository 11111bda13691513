//! Wakeup multiplexer: a thin wrapper over epoll.
//!
//! The reactor blocks here, and only here. Registered fds stay owned by
//! their widgets (or by the reactor for the clock/input/stop sources); the
//! multiplexer merely indexes fd → owner so a ready event can be routed.

use std::collections::HashMap;
use std::os::unix::io::{BorrowedFd, RawFd};

use anyhow::{Context, Result};
use nix::errno::Errno;
use nix::sys::epoll::{Epoll, EpollCreateFlags, EpollEvent, EpollFlags, EpollTimeout};
use tracing::warn;

/// Who a ready wakeup belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Owner {
    /// The shared 1 Hz clock source.
    Clock,
    /// The click-feedback channel (stdin in production).
    Input,
    /// The stop eventfd; ends the loop after the current batch.
    Stop,
    /// A widget-owned wakeup handle.
    Widget(String),
}

pub struct Multiplexer {
    epoll: Epoll,
    owners: HashMap<u64, Owner>,
}

/// epoll_wait batch size; matches the largest plausible widget roster.
const MAX_EVENTS: usize = 16;

impl Multiplexer {
    pub fn new() -> Result<Self> {
        let epoll = Epoll::new(EpollCreateFlags::EPOLL_CLOEXEC)
            .context("failed to create epoll instance")?;
        Ok(Self {
            epoll,
            owners: HashMap::new(),
        })
    }

    /// Start readiness-tracking `fd` on behalf of `owner`.
    ///
    /// The fd's lifetime stays with the caller. Errors (closed or invalid
    /// handles) are reported back and are non-fatal: the call site treats
    /// them as the widget being unavailable and keeps it polled.
    pub fn register(&mut self, fd: RawFd, owner: Owner) -> Result<()> {
        let token = fd as u64;
        // Safety: the registry keeps the owning widget alive for as long as
        // its fd is registered; deregistration precedes every removal.
        let borrowed = unsafe { BorrowedFd::borrow_raw(fd) };
        self.epoll
            .add(borrowed, EpollEvent::new(EpollFlags::EPOLLIN, token))
            .with_context(|| format!("failed to add fd {fd} to epoll"))?;
        self.owners.insert(token, owner);
        Ok(())
    }

    /// Stop tracking `fd`. Removing an fd that was never registered is an
    /// error for the caller to log, not a loop-stopper.
    pub fn deregister(&mut self, fd: RawFd) -> Result<()> {
        let borrowed = unsafe { BorrowedFd::borrow_raw(fd) };
        let res = self
            .epoll
            .delete(borrowed)
            .with_context(|| format!("failed to remove fd {fd} from epoll"));
        self.owners.remove(&(fd as u64));
        res
    }

    pub fn is_registered(&self, fd: RawFd) -> bool {
        self.owners.contains_key(&(fd as u64))
    }

    /// Block until at least one registered source is ready and return the
    /// owners of everything that fired. Interruption by an unrelated signal
    /// retries the wait instead of surfacing an error.
    pub fn wait(&self) -> Result<Vec<Owner>> {
        let mut events = [EpollEvent::empty(); MAX_EVENTS];
        loop {
            match self.epoll.wait(&mut events, EpollTimeout::NONE) {
                Ok(n) => {
                    let ready = events[..n]
                        .iter()
                        .filter_map(|ev| {
                            let token = ev.data();
                            let owner = self.owners.get(&token).cloned();
                            if owner.is_none() {
                                warn!(token, "ready event for unknown owner");
                            }
                            owner
                        })
                        .collect();
                    return Ok(ready);
                }
                Err(Errno::EINTR) => continue,
                Err(err) => return Err(err).context("epoll_wait failed"),
            }
        }
    }
}
