//! Re-entrancy lock and debounce for user transport operations
//!
//! Both are plain timestamp windows. A call landing inside a window is
//! dropped, never queued.

use crate::config::TransportConfig;

#[derive(Debug, Clone)]
pub struct OpGuard {
    lock_window: f64,
    debounce_window: f64,
    locked_until: f64,
    last_action: Option<f64>,
}

impl OpGuard {
    pub fn new(config: &TransportConfig) -> Self {
        Self {
            lock_window: config.lock_window.max(0.0),
            debounce_window: config.debounce_window.max(0.0),
            locked_until: f64::NEG_INFINITY,
            last_action: None,
        }
    }

    /// Try to start an operation at `now`
    ///
    /// With `debounce`, the call must also be at least one debounce window
    /// after the previous debounced operation. Accepting a call arms the lock.
    pub fn try_enter(&mut self, now: f64, debounce: bool) -> bool {
        if now < self.locked_until {
            return false;
        }
        if debounce {
            if let Some(last) = self.last_action {
                if now - last < self.debounce_window {
                    return false;
                }
            }
            self.last_action = Some(now);
        }
        self.locked_until = now + self.lock_window;
        true
    }

    /// Forget all windows (new track)
    pub fn reset(&mut self) {
        self.locked_until = f64::NEG_INFINITY;
        self.last_action = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard() -> OpGuard {
        OpGuard::new(&TransportConfig::default())
    }

    #[test]
    fn test_lock_window() {
        let mut g = guard();
        assert!(g.try_enter(1.0, false));
        assert!(!g.try_enter(1.005, false));
        assert!(g.try_enter(1.009, false));
    }

    #[test]
    fn test_debounce_window() {
        let mut g = guard();
        assert!(g.try_enter(1.0, true));
        // Past the lock but inside the debounce
        assert!(!g.try_enter(1.02, true));
        // Lock-only operations are not debounced
        assert!(g.try_enter(1.02, false));
        assert!(g.try_enter(1.041, true));
    }

    #[test]
    fn test_rejected_calls_do_not_extend_windows() {
        let mut g = guard();
        assert!(g.try_enter(0.0, true));
        assert!(!g.try_enter(0.03, true));
        assert!(g.try_enter(0.045, true));
    }

    #[test]
    fn test_reset() {
        let mut g = guard();
        assert!(g.try_enter(5.0, true));
        g.reset();
        assert!(g.try_enter(5.001, true));
    }
}
