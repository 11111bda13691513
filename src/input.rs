//! Click-feedback input source.
//!
//! Wraps the fd the bar writes click events to (stdin in production, a pipe
//! in tests), switched to non-blocking so a spurious wakeup can never stall
//! the reactor. The source is registered with the multiplexer under the
//! `Input` owner; decoding and routing live in the reactor, not here.

use std::os::unix::io::{AsRawFd, OwnedFd, RawFd};

use anyhow::{Context, Result};
use nix::errno::Errno;
use nix::fcntl::{self, FcntlArg, OFlag};
use nix::unistd;

enum Source {
    /// Process stdin; not ours to close.
    Stdin,
    Owned(OwnedFd),
}

pub struct InputSource {
    source: Source,
}

impl InputSource {
    /// Use the process's stdin, set non-blocking.
    pub fn stdin() -> Result<Self> {
        set_nonblocking(libc_stdin())?;
        Ok(Self {
            source: Source::Stdin,
        })
    }

    /// Use an arbitrary readable fd, taking ownership.
    pub fn from_owned(fd: OwnedFd) -> Result<Self> {
        set_nonblocking(fd.as_raw_fd())?;
        Ok(Self {
            source: Source::Owned(fd),
        })
    }

    pub fn fd(&self) -> RawFd {
        match &self.source {
            Source::Stdin => libc_stdin(),
            Source::Owned(fd) => fd.as_raw_fd(),
        }
    }

    /// Read one buffer's worth of click data. Returns an empty slice length
    /// when nothing is pending (EAGAIN) or the peer closed.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        match unistd::read(self.fd(), buf) {
            Ok(n) => Ok(n),
            Err(Errno::EAGAIN) => Ok(0),
            Err(err) => Err(err).context("failed to read click input"),
        }
    }
}

fn libc_stdin() -> RawFd {
    0
}

fn set_nonblocking(fd: RawFd) -> Result<()> {
    let flags = fcntl::fcntl(fd, FcntlArg::F_GETFL).context("F_GETFL failed")?;
    let flags = OFlag::from_bits_truncate(flags) | OFlag::O_NONBLOCK;
    fcntl::fcntl(fd, FcntlArg::F_SETFL(flags)).context("F_SETFL failed")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::unistd::pipe;

    #[test]
    fn drained_pipe_reads_zero_without_blocking() {
        let (rx, tx) = pipe().unwrap();
        let mut input = InputSource::from_owned(rx).unwrap();
        let mut buf = [0u8; 64];
        assert_eq!(input.read(&mut buf).unwrap(), 0);

        unistd::write(&tx, b"{\"name\":\"cpu\",\"button\":1}").unwrap();
        let n = input.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"{\"name\":\"cpu\",\"button\":1}");
    }
}
