//! Scheduler: maps the shared clock's tick counter onto polled widgets.
//!
//! The counter is absolute and wraps with defined arithmetic; a widget with
//! period `p` is due whenever `counter % p == 0`. Membership in the tracked
//! list follows each widget's current trigger mode and is maintained by the
//! reactor, keyed by name only — the registry stays the sole widget owner.

#[derive(Debug, Clone)]
struct Entry {
    name: String,
    period: u64,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    counter: u64,
    entries: Vec<Entry>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ticks(&self) -> u64 {
        self.counter
    }

    /// Advance the counter by however many intervals elapsed. Wraparound at
    /// the integer width is defined behavior, not an error.
    pub fn advance(&mut self, by: u64) -> u64 {
        self.counter = self.counter.wrapping_add(by);
        self.counter
    }

    /// Start scheduling `name` every `period` ticks. A zero period means
    /// "never auto-update" and is not tracked. Re-tracking an existing name
    /// replaces its period in place, keeping registration order.
    pub fn track(&mut self, name: &str, period: u64) {
        if period == 0 {
            self.untrack(name);
            return;
        }
        if let Some(entry) = self.entries.iter_mut().find(|e| e.name == name) {
            entry.period = period;
        } else {
            self.entries.push(Entry {
                name: name.to_owned(),
                period,
            });
        }
    }

    pub fn untrack(&mut self, name: &str) {
        self.entries.retain(|e| e.name != name);
    }

    pub fn is_tracked(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    pub fn period_of(&self, name: &str) -> Option<u64> {
        self.entries.iter().find(|e| e.name == name).map(|e| e.period)
    }

    /// Names due at the current counter value, in registration order.
    pub fn due(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| self.counter % e.period == 0)
            .map(|e| e.name.clone())
            .collect()
    }
}
