use std::time::{Duration, Instant};

/// Single resettable deadline. Polled from the event loop tick.
#[derive(Debug)]
pub struct InactivityMonitor {
    timeout: Duration,
    deadline: Option<Instant>,
}

impl InactivityMonitor {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            deadline: None,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Replace any pending deadline with a fresh one.
    pub fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.timeout);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// True exactly once when the deadline has passed; the monitor disarms itself.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_once_after_timeout() {
        let mut monitor = InactivityMonitor::new(Duration::from_secs(30));
        let t0 = Instant::now();
        monitor.arm(t0);
        assert!(!monitor.poll(t0 + Duration::from_secs(29)));
        assert!(monitor.poll(t0 + Duration::from_secs(30)));
        assert!(!monitor.poll(t0 + Duration::from_secs(60)));
        assert!(!monitor.is_armed());
    }

    #[test]
    fn test_rearm_pushes_deadline_back() {
        let mut monitor = InactivityMonitor::new(Duration::from_secs(30));
        let t0 = Instant::now();
        monitor.arm(t0);
        monitor.arm(t0 + Duration::from_secs(20));
        assert!(!monitor.poll(t0 + Duration::from_secs(40)));
        assert!(monitor.poll(t0 + Duration::from_secs(50)));
    }

    #[test]
    fn test_cancel_prevents_expiry() {
        let mut monitor = InactivityMonitor::new(Duration::from_secs(1));
        let t0 = Instant::now();
        monitor.arm(t0);
        monitor.cancel();
        assert!(!monitor.poll(t0 + Duration::from_secs(5)));
    }
}
