//! Core engines for the `lapse` time-tracking CLI: a stopwatch with lap
//! recording, a countdown timer, a tally counter, and a persistent
//! greeting name.
//!
//! All timekeeping is arithmetic over absolute wall-clock instants.
//! Running timers persist their start or deadline timestamp together with
//! the instant the record was saved, so a later process can shift the
//! timestamps forward by the observed gap and carry on as if it never
//! exited. Every engine read tolerates a missing or malformed record by
//! falling back to the idle state; every engine write is fire-and-forget.

pub mod config;
pub mod counter;
pub mod countdown;
pub mod greeting;
pub mod hooks;
pub mod stopwatch;
pub mod store;
pub mod ticker;
pub mod time;

pub use countdown::{Countdown, CountdownSnapshot};
pub use stopwatch::{Lap, Stopwatch, StopwatchSnapshot};
