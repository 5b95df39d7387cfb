use std::time::{Duration, Instant};

use crate::scene::ObjectId;

/// Minimum spacing between completion polls.
pub const WATCH_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum WatchKind {
    Image,
    Audio,
}

/// One outstanding "assign this resource once it finishes loading" request.
///
/// The watch survives the object being removed; completion against a gone
/// object is a harmless no-op.
#[derive(Debug, Clone)]
pub struct PendingWatch {
    pub object: ObjectId,
    pub kind: WatchKind,
    pub source: String,
}

/// Throttled list of pending watches, polled at tick boundaries so cache and
/// atlas mutations always happen between frames.
#[derive(Debug, Default)]
pub struct WatchList {
    watches: Vec<PendingWatch>,
    last_poll: Option<Instant>,
}

impl WatchList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, watch: PendingWatch) {
        self.watches.push(watch);
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.watches.is_empty()
    }

    /// True when a poll is due at `now`; updates the throttle timestamp.
    pub fn poll_due(&mut self, now: Instant) -> bool {
        if self.watches.is_empty() {
            return false;
        }
        match self.last_poll {
            Some(last) if now.duration_since(last) < WATCH_INTERVAL => false,
            _ => {
                self.last_poll = Some(now);
                true
            }
        }
    }

    /// Takes the current watches for processing; unfinished ones should be
    /// pushed back by the caller.
    pub fn take(&mut self) -> Vec<PendingWatch> {
        std::mem::take(&mut self.watches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn watch() -> PendingWatch {
        PendingWatch {
            object: ObjectId(1),
            kind: WatchKind::Image,
            source: "a.png".into(),
        }
    }

    #[test]
    fn empty_list_is_never_due() {
        let mut list = WatchList::new();
        assert!(!list.poll_due(Instant::now()));
    }

    #[test]
    fn poll_is_throttled_to_interval() {
        let mut list = WatchList::new();
        list.push(watch());

        let t0 = Instant::now();
        assert!(list.poll_due(t0));
        assert!(!list.poll_due(t0 + Duration::from_millis(10)));
        assert!(list.poll_due(t0 + WATCH_INTERVAL));
    }
}
