//! barfeed — an i3bar/swaybar status feed generator.
//!
//! A single-threaded reactor multiplexes every wakeup source (a shared 1 Hz
//! timerfd, widget-owned fds, the bar's click-event stream) through one
//! epoll wait, dispatches each batch to the owning widget, and serializes
//! the aggregate state as one i3bar streaming-array element per batch.

pub mod clock;
pub mod config;
pub mod input;
pub mod multiplexer;
pub mod protocol;
pub mod reactor;
pub mod registry;
pub mod scheduler;
pub mod widget;
pub mod widgets;

pub use config::Config;
pub use reactor::{Phase, Reactor, StopHandle};
pub use widget::{Payload, Severity, TriggerMode, Widget};
