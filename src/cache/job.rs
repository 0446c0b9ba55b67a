//! Last-run bookkeeping for the background refresh jobs

use serde::Serialize;
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, SystemTime};

/// When a job last finished and how long that run took
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct JobInfo {
    pub last_run: SystemTime,
    pub duration: Duration,
}

impl JobInfo {
    pub fn finished_now(duration: Duration) -> Self {
        Self {
            last_run: SystemTime::now(),
            duration,
        }
    }

    /// Time since the run finished, zero if the clock went backwards
    pub fn age(&self) -> Duration {
        self.last_run.elapsed().unwrap_or_default()
    }
}

/// Single-writer, many-reader slot for a job's latest [`JobInfo`]
#[derive(Debug, Default)]
pub struct JobTracker {
    latest: RwLock<Option<JobInfo>>,
}

impl JobTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, info: JobInfo) {
        *self.latest.write().unwrap_or_else(PoisonError::into_inner) = Some(info);
    }

    /// `None` until the job has completed once
    pub fn latest(&self) -> Option<JobInfo> {
        *self.latest.read().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_overwrites() {
        let tracker = JobTracker::new();
        assert_eq!(tracker.latest(), None);

        tracker.record(JobInfo::finished_now(Duration::from_secs(3)));
        tracker.record(JobInfo::finished_now(Duration::from_secs(1)));
        let latest = tracker.latest().unwrap();
        assert_eq!(latest.duration, Duration::from_secs(1));
        assert!(latest.age() < Duration::from_secs(60));
    }
}
