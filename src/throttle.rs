//! Minimum-interval admission gate for the expensive query path.

use std::time::{Duration, SystemTime};

/// Admits at most one call per `min_interval`.
///
/// Rejected calls are dropped, not queued: the next location update that
/// arrives after the interval is admitted on its own.
#[derive(Debug, Clone)]
pub struct ThrottleGate {
    min_interval: Duration,
    last_admitted: Option<SystemTime>,
}

impl ThrottleGate {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_admitted: None,
        }
    }

    /// Returns `true` and records `now` if at least `min_interval` has passed
    /// since the last admitted call.
    ///
    /// A timestamp earlier than the last admitted one (the device clock was
    /// set back) is admitted and becomes the new reference point.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use curbside::ThrottleGate;
    /// use std::time::{Duration, SystemTime};
    ///
    /// let mut gate = ThrottleGate::new(Duration::from_secs(1));
    /// let t0 = SystemTime::now();
    /// assert!(gate.admit(t0));
    /// assert!(!gate.admit(t0 + Duration::from_millis(400)));
    /// assert!(gate.admit(t0 + Duration::from_millis(1000)));
    /// ```
    pub fn admit(&mut self, now: SystemTime) -> bool {
        let admitted = match self.last_admitted {
            None => true,
            Some(last) => match now.duration_since(last) {
                Ok(elapsed) => elapsed >= self.min_interval,
                Err(_) => {
                    log::debug!("Location timestamp went backwards; re-anchoring throttle");
                    true
                }
            },
        };

        if admitted {
            self.last_admitted = Some(now);
        }
        admitted
    }

    /// Forget the last admitted call so the next one is admitted.
    pub fn reset(&mut self) {
        self.last_admitted = None;
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn last_admitted(&self) -> Option<SystemTime> {
        self.last_admitted
    }
}
