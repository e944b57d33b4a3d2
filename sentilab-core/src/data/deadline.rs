//! Wall-clock guard for directory ingestion.
//!
//! Checked before each file is opened. Once the limit is exceeded every
//! subsequent check fails with `IngestError::ResourceLimit`, so a
//! pathologically large directory aborts instead of hanging.

use std::time::{Duration, Instant};

use super::ingest::IngestError;

#[derive(Debug, Clone, Copy)]
pub struct IngestDeadline {
    started: Instant,
    limit: Option<Duration>,
}

impl IngestDeadline {
    /// Start the clock now. `None` disables the guard.
    pub fn new(limit: Option<Duration>) -> Self {
        Self {
            started: Instant::now(),
            limit,
        }
    }

    pub fn unlimited() -> Self {
        Self::new(None)
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn is_expired(&self) -> bool {
        match self.limit {
            Some(limit) => self.elapsed() >= limit,
            None => false,
        }
    }

    /// Fail if the limit has passed. `processed`/`total` go into the error.
    pub fn check(&self, processed: usize, total: usize) -> Result<(), IngestError> {
        match self.limit {
            Some(limit) if self.is_expired() => Err(IngestError::ResourceLimit {
                limit,
                processed,
                total,
            }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlimited_never_expires() {
        let deadline = IngestDeadline::unlimited();
        assert!(!deadline.is_expired());
        assert!(deadline.check(0, 10).is_ok());
    }

    #[test]
    fn zero_limit_expires_immediately() {
        let deadline = IngestDeadline::new(Some(Duration::ZERO));
        assert!(deadline.is_expired());
        match deadline.check(3, 10) {
            Err(IngestError::ResourceLimit { processed, total, .. }) => {
                assert_eq!(processed, 3);
                assert_eq!(total, 10);
            }
            other => panic!("expected ResourceLimit, got {other:?}"),
        }
    }

    #[test]
    fn generous_limit_passes() {
        let deadline = IngestDeadline::new(Some(Duration::from_secs(3600)));
        assert!(deadline.check(0, 1).is_ok());
    }
}
