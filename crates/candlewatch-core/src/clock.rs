use std::sync::Arc;

use chrono::{DateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use parking_lot::RwLock;
use tokio::sync::mpsc;

/// Wall-clock "now" plus market-session predicates (C8). Implementations
/// may drive from real time or from an injected test clock — required for
/// deterministic tests of §4.8.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
    fn in_session(&self, t: DateTime<Utc>) -> bool;
}

/// A real-time clock against configured session bounds in a named time
/// zone (default `Asia/Kolkata`, per spec §6).
pub struct SystemClock {
    timezone: Tz,
    session_start: NaiveTime,
    session_end: NaiveTime,
}

impl SystemClock {
    pub fn new(timezone: Tz, session_start: NaiveTime, session_end: NaiveTime) -> Self {
        Self {
            timezone,
            session_start,
            session_end,
        }
    }

    /// Spawns a tokio task that sends a tick every time `now()` crosses a
    /// boundary of `interval_secs`, only while `in_session`. The receiver
    /// side is the coordinator/aggregator's event loop.
    pub fn tick_stream(self: Arc<Self>, interval_secs: i64) -> mpsc::Receiver<DateTime<Utc>> {
        let (tx, rx) = mpsc::channel(8);
        tokio::spawn(async move {
            let mut last_boundary: Option<i64> = None;
            loop {
                tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                let now = self.now();
                if !self.in_session(now) {
                    continue;
                }
                let boundary = now.timestamp().div_euclid(interval_secs);
                if last_boundary != Some(boundary) {
                    last_boundary = Some(boundary);
                    if tx.send(now).await.is_err() {
                        break;
                    }
                }
            }
        });
        rx
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn in_session(&self, t: DateTime<Utc>) -> bool {
        let local = t.with_timezone(&self.timezone);
        let time_of_day = local.time();
        if self.session_start <= self.session_end {
            time_of_day >= self.session_start && time_of_day < self.session_end
        } else {
            time_of_day >= self.session_start || time_of_day < self.session_end
        }
    }
}

/// A manually-advanced clock for deterministic tests.
#[derive(Clone)]
pub struct TestClock {
    now: Arc<RwLock<DateTime<Utc>>>,
    session_start: NaiveTime,
    session_end: NaiveTime,
}

impl TestClock {
    pub fn new(start: DateTime<Utc>, session_start: NaiveTime, session_end: NaiveTime) -> Self {
        Self {
            now: Arc::new(RwLock::new(start)),
            session_start,
            session_end,
        }
    }

    pub fn advance(&self, duration: chrono::Duration) {
        let mut now = self.now.write();
        *now += duration;
    }

    pub fn set(&self, t: DateTime<Utc>) {
        *self.now.write() = t;
    }
}

impl Clock for TestClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read()
    }

    fn in_session(&self, t: DateTime<Utc>) -> bool {
        let time_of_day = t.time();
        if self.session_start <= self.session_end {
            time_of_day >= self.session_start && time_of_day < self.session_end
        } else {
            time_of_day >= self.session_start || time_of_day < self.session_end
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_clock_reports_session_membership() {
        let start = Utc.with_ymd_and_hms(2026, 1, 5, 3, 45, 0).unwrap(); // 09:15 IST
        let clock = TestClock::new(
            start,
            NaiveTime::from_hms_opt(9, 15, 0).unwrap(),
            NaiveTime::from_hms_opt(15, 30, 0).unwrap(),
        );
        assert!(clock.in_session(clock.now()));

        clock.advance(chrono::Duration::hours(10));
        assert!(!clock.in_session(clock.now()));
    }

    #[test]
    fn test_clock_advances_monotonically() {
        let start = Utc.with_ymd_and_hms(2026, 1, 5, 0, 0, 0).unwrap();
        let clock = TestClock::new(
            start,
            NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(23, 59, 0).unwrap(),
        );
        let t0 = clock.now();
        clock.advance(chrono::Duration::minutes(5));
        let t1 = clock.now();
        assert!(t1 > t0);
    }
}
