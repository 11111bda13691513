//! Widget registry: the ordered, owning collection of active widgets.
//!
//! The registry is the sole owner of every widget's lifetime. The scheduler
//! and multiplexer hold back-references only (names and fds), so a sweep
//! here fully reclaims a widget once the reactor has deregistered its
//! wakeup handle.

use anyhow::{Result, bail};

use crate::widget::{TriggerMode, Widget};

/// A registered widget plus the core-side bookkeeping the reactor needs.
pub struct Slot {
    pub(crate) widget: Box<dyn Widget>,
    /// The trigger mode the reactor last applied to scheduler/multiplexer.
    /// Diverges from `widget.trigger_mode()` until the next reconcile.
    pub(crate) applied: TriggerMode,
    /// Set when the last update errored; forces the 1-second polling
    /// fallback until an update succeeds again.
    pub(crate) failed: bool,
    /// Marked for removal by an external actor.
    pub(crate) removal: bool,
}

impl Slot {
    fn new(widget: Box<dyn Widget>) -> Self {
        Self {
            widget,
            applied: TriggerMode::Disabled,
            failed: false,
            removal: false,
        }
    }

    pub fn widget(&self) -> &dyn Widget {
        self.widget.as_ref()
    }

    pub fn pending_removal(&self) -> bool {
        self.removal || self.widget.should_remove()
    }
}

#[derive(Default)]
pub struct Registry {
    slots: Vec<Slot>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a widget, preserving insertion order. Names must be unique;
    /// a duplicate is rejected so click routing stays unambiguous.
    pub fn add(&mut self, widget: Box<dyn Widget>) -> Result<()> {
        let name = widget.name();
        if name.is_empty() {
            bail!("widget name must not be empty");
        }
        if self.position(name).is_some() {
            bail!("widget {name:?} is already registered");
        }
        self.slots.push(Slot::new(widget));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Slot> {
        self.slots.get(index)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut Slot> {
        self.slots.get_mut(index)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.slots.iter().position(|s| s.widget.name() == name)
    }

    pub fn by_name(&self, name: &str) -> Option<&Slot> {
        self.position(name).and_then(|i| self.get(i))
    }

    pub(crate) fn by_name_mut(&mut self, name: &str) -> Option<&mut Slot> {
        self.position(name).and_then(|i| self.slots.get_mut(i))
    }

    /// Flag a widget for removal at the next sweep. Returns false on an
    /// unknown name.
    pub fn mark_for_removal(&mut self, name: &str) -> bool {
        match self.by_name_mut(name) {
            Some(slot) => {
                slot.removal = true;
                true
            }
            None => false,
        }
    }

    /// Remove every slot flagged for removal, in place, preserving the
    /// relative order of survivors. Returns the number removed; the reactor
    /// deregisters wakeup handles and scheduler entries before calling this.
    pub fn sweep(&mut self) -> usize {
        let before = self.slots.len();
        self.slots.retain(|s| !s.pending_removal());
        before - self.slots.len()
    }

    pub fn has_pending_removals(&self) -> bool {
        self.slots.iter().any(|s| s.pending_removal())
    }

    /// Read-only traversal in registration order, for feed serialization.
    pub fn iter(&self) -> impl Iterator<Item = &Slot> {
        self.slots.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::Payload;

    struct Plain {
        name: &'static str,
        payload: Payload,
        remove_me: bool,
    }

    impl Plain {
        fn boxed(name: &'static str) -> Box<dyn Widget> {
            Box::new(Self {
                name,
                payload: Payload::new(),
                remove_me: false,
            })
        }
    }

    impl Widget for Plain {
        fn name(&self) -> &str {
            self.name
        }
        fn update(&mut self) -> Result<()> {
            Ok(())
        }
        fn payload(&self) -> &Payload {
            &self.payload
        }
        fn should_remove(&self) -> bool {
            self.remove_me
        }
    }

    #[test]
    fn add_preserves_insertion_order() {
        let mut reg = Registry::new();
        reg.add(Plain::boxed("battery")).unwrap();
        reg.add(Plain::boxed("volume")).unwrap();
        reg.add(Plain::boxed("date")).unwrap();

        let names: Vec<_> = reg.iter().map(|s| s.widget().name().to_owned()).collect();
        assert_eq!(names, ["battery", "volume", "date"]);
        assert_eq!(reg.position("volume"), Some(1));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut reg = Registry::new();
        reg.add(Plain::boxed("cpu")).unwrap();
        assert!(reg.add(Plain::boxed("cpu")).is_err());
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn lookup_miss_is_none_not_error() {
        let reg = Registry::new();
        assert!(reg.by_name("ghost").is_none());
        assert!(reg.get(42).is_none());
    }

    #[test]
    fn sweep_removes_flagged_and_is_idempotent() {
        let mut reg = Registry::new();
        reg.add(Plain::boxed("a")).unwrap();
        reg.add(Plain::boxed("b")).unwrap();
        reg.add(Plain::boxed("c")).unwrap();

        assert!(reg.mark_for_removal("b"));
        assert_eq!(reg.sweep(), 1);
        let names: Vec<_> = reg.iter().map(|s| s.widget().name().to_owned()).collect();
        assert_eq!(names, ["a", "c"], "survivor order preserved");

        // No new removals between calls: second sweep is a no-op.
        assert_eq!(reg.sweep(), 0);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn widget_driven_removal_is_honored() {
        let mut reg = Registry::new();
        reg.add(Box::new(Plain {
            name: "transient",
            payload: Payload::new(),
            remove_me: true,
        }))
        .unwrap();
        assert!(reg.has_pending_removals());
        assert_eq!(reg.sweep(), 1);
        assert!(reg.is_empty());
    }

    #[test]
    fn mark_unknown_name_is_false() {
        let mut reg = Registry::new();
        assert!(!reg.mark_for_removal("nope"));
    }
}
