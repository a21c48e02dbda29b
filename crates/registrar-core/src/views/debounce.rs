use std::time::{Duration, Instant};

/// Holds back rapidly changing input until it has settled.
///
/// Callers push every keystroke and poll on their tick. A value is emitted
/// once it has gone unchanged for `delay`, and only if it differs from the
/// last emitted value.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    pending: Option<(String, Instant)>,
    last_emitted: Option<String>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
            // Input starts out empty and already applied.
            last_emitted: Some(String::new()),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Record new input at `now`, restarting the settling period.
    pub fn push(&mut self, value: impl Into<String>, now: Instant) {
        self.pending = Some((value.into(), now));
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// The settled value, if the settling period has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        let settled = match self.pending {
            Some((_, at)) => now.saturating_duration_since(at) >= self.delay,
            None => false,
        };
        if !settled {
            return None;
        }
        let (value, _) = self.pending.take()?;
        self.emit(value)
    }

    /// Emit the pending value immediately, e.g. on Enter.
    pub fn flush(&mut self) -> Option<String> {
        let (value, _) = self.pending.take()?;
        self.emit(value)
    }

    fn emit(&mut self, value: String) -> Option<String> {
        if self.last_emitted.as_deref() == Some(value.as_str()) {
            return None;
        }
        self.last_emitted = Some(value.clone());
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(500);

    #[test]
    fn test_typing_burst_emits_once() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(DELAY);

        for (i, text) in ["a", "al", "alg", "alge"].iter().enumerate() {
            let at = start + Duration::from_millis(100 * i as u64);
            debouncer.push(*text, at);
            assert_eq!(debouncer.poll(at), None);
        }

        let last_keystroke = start + Duration::from_millis(300);
        assert_eq!(debouncer.poll(last_keystroke + Duration::from_millis(499)), None);
        assert_eq!(
            debouncer.poll(last_keystroke + DELAY),
            Some("alge".to_string())
        );
        assert_eq!(debouncer.poll(last_keystroke + DELAY * 4), None);
    }

    #[test]
    fn test_unchanged_value_is_not_reemitted() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(DELAY);
        debouncer.push("math", start);
        assert!(debouncer.poll(start + DELAY).is_some());

        // Typed and erased back to the same query.
        debouncer.push("math", start + DELAY * 2);
        assert_eq!(debouncer.poll(start + DELAY * 3), None);
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn test_erasing_back_to_empty_is_not_emitted() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(DELAY);
        debouncer.push("a", start);
        debouncer.push("", start + Duration::from_millis(100));
        assert_eq!(debouncer.poll(start + DELAY * 2), None);
        assert_eq!(debouncer.flush(), None);

        // Clearing an applied search still goes through.
        debouncer.push("cse", start + DELAY * 3);
        assert_eq!(debouncer.flush(), Some("cse".to_string()));
        debouncer.push("", start + DELAY * 4);
        assert_eq!(debouncer.poll(start + DELAY * 5), Some(String::new()));
    }

    #[test]
    fn test_flush() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(DELAY);
        debouncer.push("cse", start);
        assert_eq!(debouncer.flush(), Some("cse".to_string()));
        assert_eq!(debouncer.poll(start + DELAY), None);
    }
}
