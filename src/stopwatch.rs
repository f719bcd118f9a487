use chrono::{DateTime, Local, TimeDelta};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::store::{keys, Store};

/// A recorded checkpoint of elapsed time during a continuous run.
///
/// The first lap's delta is measured against the run start, so it equals
/// the lap's total. Laps are append-only and cleared only in bulk by
/// [`Stopwatch::reset`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Lap {
    pub index: u32,
    pub total: TimeDelta,
    pub delta: TimeDelta,
}

/// A stopwatch that accumulates elapsed time across run segments and
/// survives process restarts by persisting absolute timestamps.
///
/// Elapsed time is always `accumulated + (now - started_at)` while running,
/// clamped so that a reconstructed start instant in the future contributes
/// nothing.
#[derive(Clone, Debug)]
pub struct Stopwatch {
    accumulated: TimeDelta,
    running: bool,
    started_at: Option<DateTime<Local>>,
    laps: Vec<Lap>,
}

/// Display-relevant view returned by every mutating operation, so callers
/// can update their affordances without poking at internal fields.
#[derive(Clone, Debug)]
pub struct StopwatchSnapshot {
    pub elapsed: TimeDelta,
    pub running: bool,
    pub laps: Vec<Lap>,
}

#[derive(Debug, Serialize, Deserialize)]
struct LapRecord {
    index: u32,
    #[serde(rename = "total_ms", with = "crate::time::millis")]
    total: TimeDelta,
}

#[derive(Debug, Serialize, Deserialize)]
struct StopwatchRecord {
    #[serde(rename = "accumulated_ms", with = "crate::time::millis")]
    accumulated: TimeDelta,
    running: bool,
    #[serde(
        rename = "started_at_ms",
        default,
        with = "crate::time::unix_ms_opt"
    )]
    started_at: Option<DateTime<Local>>,
    #[serde(default)]
    laps: Vec<LapRecord>,
    #[serde(rename = "saved_at_ms", with = "crate::time::unix_ms")]
    saved_at: DateTime<Local>,
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self {
            accumulated: TimeDelta::zero(),
            running: false,
            started_at: None,
            laps: Vec::new(),
        }
    }
}

impl Stopwatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a new run segment. No-op if already running.
    pub fn start(&mut self, now: DateTime<Local>) -> StopwatchSnapshot {
        if !self.running {
            self.started_at = Some(now);
            self.running = true;
        }

        self.snapshot(now)
    }

    /// Fold the current run segment into the accumulated total.
    /// No-op if not running.
    pub fn pause(&mut self, now: DateTime<Local>) -> StopwatchSnapshot {
        if self.running {
            self.accumulated = self.elapsed(now);
            self.running = false;
            self.started_at = None;
        }

        self.snapshot(now)
    }

    /// Return to the idle zero state and clear all laps.
    pub fn reset(&mut self, now: DateTime<Local>) -> StopwatchSnapshot {
        self.accumulated = TimeDelta::zero();
        self.running = false;
        self.started_at = None;
        self.laps.clear();

        self.snapshot(now)
    }

    /// Record a lap at the current elapsed time.
    ///
    /// Returns `None` when the stopwatch is not running.
    pub fn lap(&mut self, now: DateTime<Local>) -> Option<&Lap> {
        if !self.running {
            return None;
        }

        let total = self.elapsed(now);
        let prev = self
            .laps
            .last()
            .map(|lap| lap.total)
            .unwrap_or_else(TimeDelta::zero);

        self.laps.push(Lap {
            index: self.laps.len() as u32 + 1,
            total,
            delta: (total - prev).max(TimeDelta::zero()),
        });

        self.laps.last()
    }

    /// Pure read of the current elapsed time; safe to call at any
    /// sampling frequency.
    pub fn elapsed(&self, now: DateTime<Local>) -> TimeDelta {
        let segment = match (self.running, self.started_at) {
            (true, Some(started_at)) => (now - started_at).max(TimeDelta::zero()),
            _ => TimeDelta::zero(),
        };

        (self.accumulated + segment).max(TimeDelta::zero())
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn laps(&self) -> &[Lap] {
        &self.laps
    }

    pub fn is_idle(&self) -> bool {
        !self.running && self.accumulated.is_zero() && self.laps.is_empty()
    }

    pub fn snapshot(&self, now: DateTime<Local>) -> StopwatchSnapshot {
        StopwatchSnapshot {
            elapsed: self.elapsed(now),
            running: self.running,
            laps: self.laps.clone(),
        }
    }

    /// Restore persisted state, shifting the run-segment start forward by
    /// the wall-clock gap since the record was saved. A missing or
    /// malformed record yields the idle state.
    pub fn load(store: &dyn Store, now: DateTime<Local>) -> Self {
        let raw = match store.get(keys::STOPWATCH) {
            Some(raw) => raw,
            None => return Self::default(),
        };

        match serde_json::from_str::<StopwatchRecord>(&raw) {
            Ok(record) => Self::reconcile(record, now),
            Err(e) => {
                debug!("Discarding malformed stopwatch record: {}", e);
                Self::default()
            }
        }
    }

    fn reconcile(record: StopwatchRecord, now: DateTime<Local>) -> Self {
        let mut laps = Vec::with_capacity(record.laps.len());
        let mut prev = TimeDelta::zero();

        for (i, lap) in record.laps.iter().enumerate() {
            let total = lap.total.max(TimeDelta::zero());
            laps.push(Lap {
                index: i as u32 + 1,
                total,
                delta: (total - prev).max(TimeDelta::zero()),
            });
            prev = total;
        }

        let started_at = if record.running {
            // Shift the segment start by the time spent with the process
            // gone, clamping so it never lands in the future.
            record
                .started_at
                .map(|started_at| (started_at + (now - record.saved_at)).min(now))
        } else {
            None
        };

        Self {
            accumulated: record.accumulated.max(TimeDelta::zero()),
            running: record.running && started_at.is_some(),
            started_at,
            laps,
        }
    }

    /// Persist the full state. Failures are logged and swallowed; the
    /// in-memory state stays authoritative for the session.
    pub fn save(&self, store: &dyn Store, now: DateTime<Local>) {
        let record = StopwatchRecord {
            accumulated: self.accumulated,
            running: self.running,
            started_at: self.started_at,
            laps: self
                .laps
                .iter()
                .map(|lap| LapRecord {
                    index: lap.index,
                    total: lap.total,
                })
                .collect(),
            saved_at: now,
        };

        let result = serde_json::to_string(&record)
            .map_err(anyhow::Error::from)
            .and_then(|json| store.set(keys::STOPWATCH, &json));

        if let Err(e) = result {
            warn!("Failed to persist stopwatch state: {:#}", e);
        }
    }
}

#[cfg(test)]
mod test {
    use chrono::{prelude::*, TimeDelta};

    use super::Stopwatch;
    use crate::store::{keys, BrokenStore, MemStore, Store};

    fn dt(s: &str) -> DateTime<Local> {
        s.parse().unwrap()
    }

    #[test]
    fn starts_idle() {
        let sw = Stopwatch::new();
        let now = dt("2024-03-27T12:00:00-06:00");

        assert!(!sw.is_running());
        assert!(sw.is_idle());
        assert_eq!(sw.elapsed(now), TimeDelta::zero());
    }

    #[test]
    fn elapsed_sums_run_segments_exactly() {
        let t0 = dt("2024-03-27T12:00:00-06:00");
        let mut sw = Stopwatch::new();

        sw.start(t0);
        sw.pause(t0 + TimeDelta::milliseconds(1500));

        // A long idle gap must not count.
        let t1 = t0 + TimeDelta::seconds(300);
        assert_eq!(sw.elapsed(t1), TimeDelta::milliseconds(1500));

        sw.start(t1);
        sw.pause(t1 + TimeDelta::milliseconds(1000));

        assert_eq!(sw.elapsed(t1 + TimeDelta::seconds(60)), TimeDelta::milliseconds(2500));
    }

    #[test]
    fn pause_keeps_whole_elapsed_value() {
        // Minutes and seconds must survive a pause, not just the
        // sub-second remainder.
        let t0 = dt("2024-03-27T12:00:00-06:00");
        let mut sw = Stopwatch::new();

        sw.start(t0);
        let snap = sw.pause(t0 + TimeDelta::milliseconds(61_500));

        assert_eq!(snap.elapsed, TimeDelta::milliseconds(61_500));
    }

    #[test]
    fn start_while_running_is_a_noop() {
        let t0 = dt("2024-03-27T12:00:00-06:00");
        let mut sw = Stopwatch::new();

        sw.start(t0);
        sw.start(t0 + TimeDelta::seconds(10));

        assert_eq!(sw.elapsed(t0 + TimeDelta::seconds(20)), TimeDelta::seconds(20));
    }

    #[test]
    fn reset_clears_everything() {
        let t0 = dt("2024-03-27T12:00:00-06:00");
        let mut sw = Stopwatch::new();

        sw.start(t0);
        sw.lap(t0 + TimeDelta::seconds(1));
        let snap = sw.reset(t0 + TimeDelta::seconds(2));

        assert_eq!(snap.elapsed, TimeDelta::zero());
        assert!(!snap.running);
        assert!(snap.laps.is_empty());
        assert!(sw.is_idle());
    }

    #[test]
    fn laps_record_totals_and_deltas() {
        let t0 = dt("2024-03-27T12:00:00-06:00");
        let mut sw = Stopwatch::new();

        sw.start(t0);

        let lap1 = sw.lap(t0 + TimeDelta::milliseconds(1500)).unwrap().clone();
        assert_eq!(lap1.index, 1);
        assert_eq!(lap1.total, TimeDelta::milliseconds(1500));
        assert_eq!(lap1.delta, TimeDelta::milliseconds(1500));

        let lap2 = sw.lap(t0 + TimeDelta::milliseconds(2500)).unwrap().clone();
        assert_eq!(lap2.index, 2);
        assert_eq!(lap2.total, TimeDelta::milliseconds(2500));
        assert_eq!(lap2.delta, TimeDelta::milliseconds(1000));
    }

    #[test]
    fn lap_deltas_sum_to_final_total() {
        let t0 = dt("2024-03-27T12:00:00-06:00");
        let mut sw = Stopwatch::new();

        sw.start(t0);
        sw.lap(t0 + TimeDelta::milliseconds(700));
        sw.lap(t0 + TimeDelta::milliseconds(1900));
        sw.lap(t0 + TimeDelta::milliseconds(4200));

        let sum = sw
            .laps()
            .iter()
            .fold(TimeDelta::zero(), |acc, lap| acc + lap.delta);

        assert_eq!(sum, sw.laps().last().unwrap().total);
    }

    #[test]
    fn lap_while_paused_is_rejected() {
        let t0 = dt("2024-03-27T12:00:00-06:00");
        let mut sw = Stopwatch::new();

        assert!(sw.lap(t0).is_none());

        sw.start(t0);
        sw.pause(t0 + TimeDelta::seconds(1));

        assert!(sw.lap(t0 + TimeDelta::seconds(2)).is_none());
        assert!(sw.laps().is_empty());
    }

    #[test]
    fn future_start_contributes_nothing() {
        let t0 = dt("2024-03-27T12:00:00-06:00");
        let mut sw = Stopwatch::new();

        sw.start(t0);

        // Sampling with a clock that sits before the segment start must
        // clamp to zero rather than go negative.
        assert_eq!(sw.elapsed(t0 - TimeDelta::seconds(5)), TimeDelta::zero());
    }

    #[test]
    fn reload_with_zero_gap_is_idempotent() {
        let t0 = dt("2024-03-27T12:00:00-06:00");
        let store = MemStore::new();
        let mut sw = Stopwatch::new();

        sw.start(t0);
        sw.lap(t0 + TimeDelta::milliseconds(1234));
        sw.pause(t0 + TimeDelta::milliseconds(5678));
        sw.save(&store, t0 + TimeDelta::milliseconds(5678));

        let restored = Stopwatch::load(&store, t0 + TimeDelta::milliseconds(5678));

        assert_eq!(
            restored.elapsed(t0 + TimeDelta::milliseconds(5678)),
            TimeDelta::milliseconds(5678)
        );
        assert!(!restored.is_running());
        assert_eq!(restored.laps(), sw.laps());
    }

    #[test]
    fn reload_shifts_running_segment_across_the_gap() {
        let t0 = dt("2024-03-27T12:00:00-06:00");
        let store = MemStore::new();
        let mut sw = Stopwatch::new();

        sw.start(t0);
        sw.save(&store, t0 + TimeDelta::seconds(10));

        // Five more seconds pass with the process gone; they are not
        // charged to the elapsed total, which resumes from the saved
        // value and keeps advancing.
        let t1 = t0 + TimeDelta::seconds(15);
        let restored = Stopwatch::load(&store, t1);

        assert!(restored.is_running());
        assert_eq!(restored.elapsed(t1), TimeDelta::seconds(10));
        assert_eq!(
            restored.elapsed(t1 + TimeDelta::seconds(2)),
            TimeDelta::seconds(12)
        );
    }

    #[test]
    fn reload_recomputes_lap_deltas() {
        let t0 = dt("2024-03-27T12:00:00-06:00");
        let store = MemStore::new();
        let mut sw = Stopwatch::new();

        sw.start(t0);
        sw.lap(t0 + TimeDelta::milliseconds(1500));
        sw.lap(t0 + TimeDelta::milliseconds(2500));
        sw.save(&store, t0 + TimeDelta::seconds(3));

        let restored = Stopwatch::load(&store, t0 + TimeDelta::seconds(3));

        assert_eq!(restored.laps().len(), 2);
        assert_eq!(restored.laps()[1].delta, TimeDelta::milliseconds(1000));
    }

    #[test]
    fn missing_record_falls_back_to_idle() {
        let store = MemStore::new();
        let now = dt("2024-03-27T12:00:00-06:00");

        let sw = Stopwatch::load(&store, now);

        assert!(sw.is_idle());
    }

    #[test]
    fn malformed_record_falls_back_to_idle() {
        let store = MemStore::new();
        let now = dt("2024-03-27T12:00:00-06:00");

        store.set(keys::STOPWATCH, "{ not json").unwrap();
        let sw = Stopwatch::load(&store, now);

        assert!(sw.is_idle());
        assert_eq!(sw.elapsed(now), TimeDelta::zero());
    }

    #[test]
    fn save_failure_is_swallowed() {
        let t0 = dt("2024-03-27T12:00:00-06:00");
        let store = BrokenStore;
        let mut sw = Stopwatch::new();

        sw.start(t0);
        sw.lap(t0 + TimeDelta::seconds(1));

        // Only cross-restart continuity is lost; the in-memory state
        // stays authoritative for the session.
        sw.save(&store, t0 + TimeDelta::seconds(2));

        assert!(sw.is_running());
        assert_eq!(sw.elapsed(t0 + TimeDelta::seconds(2)), TimeDelta::seconds(2));
        assert_eq!(sw.laps().len(), 1);
    }

    #[test]
    fn reload_clamps_future_start_to_now() {
        let store = MemStore::new();
        let now = dt("2024-03-27T12:00:00-06:00");

        // A record saved by a skewed clock claims the segment starts an
        // hour from now.
        let record = format!(
            r#"{{"accumulated_ms":0,"running":true,"started_at_ms":{},"laps":[],"saved_at_ms":{}}}"#,
            (now + TimeDelta::hours(1)).timestamp_millis(),
            now.timestamp_millis()
        );
        store.set(keys::STOPWATCH, &record).unwrap();

        let sw = Stopwatch::load(&store, now);

        assert!(sw.is_running());
        assert_eq!(sw.elapsed(now), TimeDelta::zero());
        assert_eq!(sw.elapsed(now + TimeDelta::seconds(2)), TimeDelta::seconds(2));
    }
}
