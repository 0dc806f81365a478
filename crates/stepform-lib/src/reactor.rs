use std::time::{Duration, Instant};

use stepform_spec::{MutationKind, MutationRecord};

/// What woke the reactor up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    FieldChange,
    Structure,
}

/// Single pending deadline; scheduling again replaces it.
#[derive(Debug, Clone)]
pub struct Debouncer {
    wait: Duration,
    pending: Option<Instant>,
}

impl Debouncer {
    pub fn new(wait: Duration) -> Self {
        Self {
            wait,
            pending: None,
        }
    }

    pub fn wait(&self) -> Duration {
        self.wait
    }

    /// Cancels any pending deadline and arms a new one at `now + wait`.
    pub fn schedule(&mut self, now: Instant) {
        self.pending = Some(now + self.wait);
    }

    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending
    }

    /// Consumes the deadline once it has passed.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.pending {
            Some(deadline) if deadline <= now => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }
}

/// Coalesces field and structure changes into one deferred recompute.
#[derive(Debug, Clone)]
pub struct ChangeReactor {
    debouncer: Debouncer,
    watch_structure: bool,
    coalesced: usize,
}

impl ChangeReactor {
    pub fn new(wait: Duration, watch_structure: bool) -> Self {
        Self {
            debouncer: Debouncer::new(wait),
            watch_structure,
            coalesced: 0,
        }
    }

    pub fn notify(&mut self, trigger: Trigger, now: Instant) -> bool {
        if trigger == Trigger::Structure && !self.watch_structure {
            return false;
        }
        self.coalesced += 1;
        self.debouncer.schedule(now);
        tracing::trace!(?trigger, coalesced = self.coalesced, "recompute scheduled");
        true
    }

    pub fn observe(&mut self, record: &MutationRecord, now: Instant) -> bool {
        let trigger = match record.kind {
            MutationKind::Value | MutationKind::Checked => Trigger::FieldChange,
            MutationKind::ChildList => Trigger::Structure,
        };
        self.notify(trigger, now)
    }

    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    pub fn cancel(&mut self) {
        self.debouncer.cancel();
        self.coalesced = 0;
    }

    /// True once per quiet period; returns how many notifications were folded in.
    pub fn poll(&mut self, now: Instant) -> Option<usize> {
        if self.debouncer.fire(now) {
            Some(std::mem::take(&mut self.coalesced))
        } else {
            None
        }
    }
}
