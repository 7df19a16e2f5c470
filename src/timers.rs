//! Cancellable one-shot timers on a host-supplied millisecond clock.
//!
//! Everything runs on one thread: the host calls [`TimerQueue::pop_due`] at frame
//! boundaries and dispatches whatever comes out. A cancelled id is gone from the
//! queue, so a late firing can never observe it.

/// Milliseconds on the host clock.
pub type Millis = f64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Debug)]
struct Pending<T> {
    id: TimerId,
    due: Millis,
    task: T,
}

#[derive(Debug)]
pub struct TimerQueue<T> {
    next_id: u64,
    pending: Vec<Pending<T>>,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            pending: Vec::new(),
        }
    }

    pub fn schedule(&mut self, due: Millis, task: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.pending.push(Pending { id, due, task });
        id
    }

    /// Returns whether the timer was still pending.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.pending.iter().position(|p| p.id == id) {
            Some(i) => {
                self.pending.swap_remove(i);
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.pending.iter().any(|p| p.id == id)
    }

    /// Earliest timer due at or before `now`, ties broken by scheduling order.
    pub fn pop_due(&mut self, now: Millis) -> Option<(TimerId, T)> {
        let i = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, p)| p.due <= now)
            .min_by(|(_, a), (_, b)| a.due.total_cmp(&b.due).then(a.id.cmp(&b.id)))
            .map(|(i, _)| i)?;
        let p = self.pending.swap_remove(i);
        Some((p.id, p.task))
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn tasks(&self) -> impl Iterator<Item = &T> {
        self.pending.iter().map(|p| &p.task)
    }
}
