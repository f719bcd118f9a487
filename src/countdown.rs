use chrono::{DateTime, Local, TimeDelta};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::store::{keys, Store};

/// A countdown timer keyed to an absolute deadline.
///
/// While running, the remaining time is `end_at - now`; paused state keeps
/// the remaining amount in `duration` instead, so a pause-resume cycle
/// loses nothing. Expiry is edge-triggered through [`Countdown::poll`]:
/// the poll that crosses zero resets the timer and flags the snapshot,
/// and later polls see an idle timer.
#[derive(Clone, Debug)]
pub struct Countdown {
    duration: TimeDelta,
    running: bool,
    end_at: Option<DateTime<Local>>,
}

/// Display-relevant view of the countdown, returned by every operation.
#[derive(Clone, Debug)]
pub struct CountdownSnapshot {
    pub remaining: TimeDelta,
    pub running: bool,
    /// True only on the single poll that observed the timer reach zero.
    pub expired: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct CountdownRecord {
    #[serde(rename = "duration_ms", with = "crate::time::millis")]
    duration: TimeDelta,
    #[serde(rename = "end_at_ms", default, with = "crate::time::unix_ms_opt")]
    end_at: Option<DateTime<Local>>,
    running: bool,
    #[serde(rename = "saved_at_ms", with = "crate::time::unix_ms")]
    saved_at: DateTime<Local>,
}

impl Default for Countdown {
    fn default() -> Self {
        Self {
            duration: TimeDelta::zero(),
            running: false,
            end_at: None,
        }
    }
}

impl Countdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the countdown duration. Rejects non-positive durations,
    /// returning whether the new value was accepted.
    pub fn configure(&mut self, duration: TimeDelta) -> bool {
        if duration <= TimeDelta::zero() {
            return false;
        }

        self.duration = duration;
        true
    }

    /// Arm the deadline. No-op if already running or nothing is configured.
    pub fn start(&mut self, now: DateTime<Local>) -> CountdownSnapshot {
        if !self.running && self.duration > TimeDelta::zero() {
            self.end_at = Some(now + self.duration);
            self.running = true;
        }

        self.sample(now)
    }

    /// Freeze the remaining time. No-op if not running.
    pub fn pause(&mut self, now: DateTime<Local>) -> CountdownSnapshot {
        if self.running {
            self.duration = self.remaining(now);
            self.running = false;
            self.end_at = None;
        }

        self.sample(now)
    }

    /// Return to the idle zero state.
    pub fn reset(&mut self, now: DateTime<Local>) -> CountdownSnapshot {
        self.duration = TimeDelta::zero();
        self.running = false;
        self.end_at = None;

        self.sample(now)
    }

    /// Pure read of the remaining time, clamped to zero.
    pub fn remaining(&self, now: DateTime<Local>) -> TimeDelta {
        match (self.running, self.end_at) {
            (true, Some(end_at)) => (end_at - now).max(TimeDelta::zero()),
            _ => self.duration.max(TimeDelta::zero()),
        }
    }

    /// Sample the countdown, performing the expiry transition if the
    /// deadline has passed. Expiry fires at most once per run segment:
    /// the crossing poll leaves the timer idle, exactly as after
    /// [`Countdown::reset`].
    pub fn poll(&mut self, now: DateTime<Local>) -> CountdownSnapshot {
        if self.running && self.remaining(now).is_zero() {
            self.duration = TimeDelta::zero();
            self.running = false;
            self.end_at = None;

            return CountdownSnapshot {
                remaining: TimeDelta::zero(),
                running: false,
                expired: true,
            };
        }

        self.sample(now)
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_idle(&self) -> bool {
        !self.running && self.duration.is_zero()
    }

    fn sample(&self, now: DateTime<Local>) -> CountdownSnapshot {
        CountdownSnapshot {
            remaining: self.remaining(now),
            running: self.running,
            expired: false,
        }
    }

    /// Restore persisted state, shifting the deadline forward by the
    /// wall-clock gap since the record was saved. A deadline that had
    /// already passed restores as idle without replaying the alert.
    pub fn load(store: &dyn Store, now: DateTime<Local>) -> Self {
        let raw = match store.get(keys::TIMER) {
            Some(raw) => raw,
            None => return Self::default(),
        };

        match serde_json::from_str::<CountdownRecord>(&raw) {
            Ok(record) => Self::reconcile(record, now),
            Err(e) => {
                debug!("Discarding malformed timer record: {}", e);
                Self::default()
            }
        }
    }

    fn reconcile(record: CountdownRecord, now: DateTime<Local>) -> Self {
        if !record.running {
            return Self {
                duration: record.duration.max(TimeDelta::zero()),
                running: false,
                end_at: None,
            };
        }

        let end_at = match record.end_at {
            Some(end_at) => end_at + (now - record.saved_at),
            None => return Self::default(),
        };

        if end_at <= now {
            // Expired while the process was gone: idle, no alert replay.
            return Self::default();
        }

        Self {
            duration: record.duration.max(TimeDelta::zero()),
            running: true,
            end_at: Some(end_at),
        }
    }

    /// Persist the full state. Failures are logged and swallowed.
    pub fn save(&self, store: &dyn Store, now: DateTime<Local>) {
        let record = CountdownRecord {
            duration: self.duration,
            end_at: self.end_at,
            running: self.running,
            saved_at: now,
        };

        let result = serde_json::to_string(&record)
            .map_err(anyhow::Error::from)
            .and_then(|json| store.set(keys::TIMER, &json));

        if let Err(e) = result {
            warn!("Failed to persist timer state: {:#}", e);
        }
    }
}
