use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use config::Workflow;
use mac_keycode::EventKey;

/// What an auto-repeat of a key replays without probing the cache.
#[derive(Clone, Debug)]
pub enum RepeatingHandler {
    /// Dispatch the workflow again with `is_repeat` set.
    Dispatch(Arc<Workflow>),
    /// Rewrite the event to the rebind target.
    Rebind(EventKey),
}

/// Per key code bookkeeping for suppressed downs and repeat handlers.
///
/// Owned by the coordinator; never shared.
#[derive(Debug, Default)]
pub struct KeyStateTracker {
    suppressed: HashSet<u16>,
    repeating: HashMap<u16, RepeatingHandler>,
}

impl KeyStateTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember that the key-down of `code` was suppressed.
    pub fn mark_suppressed(&mut self, code: u16) {
        self.suppressed.insert(code);
    }

    /// Forget a suppressed key-down.
    pub fn unmark(&mut self, code: u16) {
        self.suppressed.remove(&code);
    }

    /// True if the key-down of `code` was suppressed.
    pub fn is_suppressed(&self, code: u16) -> bool {
        self.suppressed.contains(&code)
    }

    /// Remove and return the suppressed mark for `code`.
    pub fn take_suppressed(&mut self, code: u16) -> bool {
        self.suppressed.remove(&code)
    }

    /// Cache the handler replayed by auto-repeats of `code`.
    pub fn set_repeating(&mut self, code: u16, handler: RepeatingHandler) {
        self.repeating.insert(code, handler);
    }

    /// Handler cached for `code`.
    pub fn repeating(&self, code: u16) -> Option<&RepeatingHandler> {
        self.repeating.get(&code)
    }

    /// Remove the handler cached for `code`.
    pub fn take_repeating(&mut self, code: u16) -> Option<RepeatingHandler> {
        self.repeating.remove(&code)
    }

    /// Remove every rebind handler, returning the targets still held down.
    pub fn take_rebinds(&mut self) -> Vec<EventKey> {
        let mut targets = Vec::new();
        self.repeating.retain(|_, h| match h {
            RepeatingHandler::Rebind(target) => {
                targets.push(*target);
                false
            }
            RepeatingHandler::Dispatch(_) => true,
        });
        targets
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.suppressed.clear();
        self.repeating.clear();
    }
}

#[cfg(test)]
mod tests {
    use mac_keycode::{Flags, Key};

    use super::*;

    #[test]
    fn marks_are_per_key() {
        let mut ks = KeyStateTracker::new();
        ks.mark_suppressed(Key::A as u16);
        assert!(ks.is_suppressed(Key::A as u16));
        assert!(!ks.is_suppressed(Key::B as u16));
        assert!(ks.take_suppressed(Key::A as u16));
        assert!(!ks.take_suppressed(Key::A as u16));
    }

    #[test]
    fn clear_drops_handlers() {
        let mut ks = KeyStateTracker::new();
        let target = EventKey::new(Key::Escape as u16, Flags::empty());
        ks.set_repeating(Key::CapsLock as u16, RepeatingHandler::Rebind(target));
        ks.mark_suppressed(Key::A as u16);
        assert!(ks.repeating(Key::CapsLock as u16).is_some());
        ks.clear();
        assert!(ks.repeating(Key::CapsLock as u16).is_none());
        assert!(!ks.is_suppressed(Key::A as u16));
    }

    #[test]
    fn take_rebinds_leaves_dispatch_handlers() {
        let mut ks = KeyStateTracker::new();
        let target = EventKey::new(Key::LeftArrow as u16, Flags::empty());
        let wf = Arc::new(Workflow::new("w", "", None, vec![]));
        ks.set_repeating(Key::H as u16, RepeatingHandler::Rebind(target));
        ks.set_repeating(Key::R as u16, RepeatingHandler::Dispatch(wf));
        assert_eq!(ks.take_rebinds(), vec![target]);
        assert!(ks.repeating(Key::H as u16).is_none());
        assert!(ks.repeating(Key::R as u16).is_some());
        assert!(ks.take_rebinds().is_empty());
    }
}
