//! Cancellable one-shot deferred actions on the engine's millisecond clock.
//!
//! The queue never holds more than a handful of entries (one wait timer, one
//! listening hand-off, one clock tick), so a linear scan is cheaper than a heap.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken(u64);

#[derive(Debug, Clone)]
struct Entry<A> {
    token: TimerToken,
    due_ms: f64,
    action: A,
}

#[derive(Debug, Clone)]
pub struct DeferredQueue<A> {
    entries: Vec<Entry<A>>,
    next_token: u64,
}

impl<A> Default for DeferredQueue<A> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            next_token: 0,
        }
    }
}

impl<A> DeferredQueue<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, due_ms: f64, action: A) -> TimerToken {
        let token = TimerToken(self.next_token);
        self.next_token += 1;
        self.entries.push(Entry {
            token,
            due_ms,
            action,
        });
        token
    }

    /// Returns true if the action was still pending.
    pub fn cancel(&mut self, token: TimerToken) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.token != token);
        self.entries.len() != before
    }

    pub fn cancel_all(&mut self) {
        self.entries.clear();
    }

    pub fn is_pending(&self, token: TimerToken) -> bool {
        self.entries.iter().any(|e| e.token == token)
    }

    /// Earliest due time, if anything is pending.
    pub fn next_due(&self) -> Option<f64> {
        self.entries.iter().map(|e| e.due_ms).min_by(f64::total_cmp)
    }

    /// Removes and returns the earliest action due at or before `now_ms`.
    ///
    /// Ties resolve in scheduling order.
    pub fn pop_due(&mut self, now_ms: f64) -> Option<(f64, A)> {
        let index = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.due_ms <= now_ms)
            .min_by(|(_, a), (_, b)| a.due_ms.total_cmp(&b.due_ms).then(a.token.0.cmp(&b.token.0)))
            .map(|(i, _)| i)?;
        let entry = self.entries.remove(index);
        Some((entry.due_ms, entry.action))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
