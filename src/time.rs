use anyhow::{bail, Context, Result};
use chrono::TimeDelta;
use regex::Regex;

/// Extensions to `TimeDelta`
pub trait TimeDeltaExt
where
    Self: Sized,
{
    /// Parse a `TimeDelta` from a human-friendly string.
    ///
    /// Accepts unit suffixes like "1h30m", "25m", "90s" (a bare number is
    /// taken as seconds), or clock notation like "05:00" and "1:30:00".
    fn from_human(s: &str) -> Result<Self>;

    /// Formats the TimeDelta as a "kitchen timer" string, e.g. mm:ss.
    ///
    /// If the delta is longer than an hour, the delta is formatted as hh:mm:ss.
    fn to_kitchen(&self) -> String;

    /// Formats the TimeDelta as a stopwatch readout, hh:mm:ss.mmm.
    fn to_clock(&self) -> String;

    /// Formats the TimeDelta in a humanized way, for example 22m30s.
    fn to_human(&self) -> String;
}

impl TimeDeltaExt for TimeDelta {
    fn from_human(s: &str) -> Result<Self> {
        let s = s.trim();

        let clock = Regex::new(r"^(?:([0-9]+):)?([0-9]{1,2}):([0-9]{2})$").unwrap();
        if let Some(cap) = clock.captures(s) {
            let hours: i64 = match cap.get(1) {
                Some(h) => h.as_str().parse()?,
                None => 0,
            };
            let minutes: i64 = cap[2].parse()?;
            let seconds: i64 = cap[3].parse()?;

            return TimeDelta::new(hours * 3600 + minutes * 60 + seconds, 0)
                .with_context(|| format!("Duration {} is out of range", s));
        }

        let units = Regex::new(r"^(?:([0-9]+)h)?(?:([0-9]+)m)?(?:([0-9]+)s?)?$").unwrap();
        let cap = units
            .captures(s)
            .with_context(|| format!("Could not parse {} as a duration", s))?;

        if cap.get(1).is_none() && cap.get(2).is_none() && cap.get(3).is_none() {
            bail!("Could not parse {} as a duration", s);
        }

        let hours: i64 = cap.get(1).map_or(Ok(0), |m| m.as_str().parse())?;
        let minutes: i64 = cap.get(2).map_or(Ok(0), |m| m.as_str().parse())?;
        let seconds: i64 = cap.get(3).map_or(Ok(0), |m| m.as_str().parse())?;

        TimeDelta::new(hours * 3600 + minutes * 60 + seconds, 0)
            .with_context(|| format!("Duration {} is out of range", s))
    }

    fn to_kitchen(&self) -> String {
        let hours = self.num_hours();
        let minutes = self.num_minutes() - (hours * 60);
        let seconds = self.num_seconds() - (self.num_minutes() * 60);

        if hours > 0 {
            format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
        } else {
            format!("{:02}:{:02}", minutes, seconds)
        }
    }

    fn to_clock(&self) -> String {
        let hours = self.num_hours();
        let minutes = self.num_minutes() - (hours * 60);
        let seconds = self.num_seconds() - (self.num_minutes() * 60);
        let millis = self.num_milliseconds() - (self.num_seconds() * 1000);

        format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis)
    }

    fn to_human(&self) -> String {
        use std::fmt::Write;

        if self.is_zero() {
            return "0s".to_string();
        }

        let hours = self.num_hours();
        let minutes = self.num_minutes() - (hours * 60);
        let seconds = self.num_seconds() - (self.num_minutes() * 60);

        let mut acc = String::new();

        if hours > 0 {
            write!(acc, "{}h", hours).unwrap();
        }

        if minutes > 0 {
            write!(acc, "{}m", minutes).unwrap();
        }

        if seconds > 0 {
            write!(acc, "{}s", seconds).unwrap();
        }

        acc
    }
}

#[doc(hidden)]
pub mod millis {
    use chrono::TimeDelta;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<TimeDelta, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms: i64 = Deserialize::deserialize(deserializer)?;
        Ok(TimeDelta::milliseconds(ms))
    }

    pub fn serialize<S>(delta: &TimeDelta, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(delta.num_milliseconds())
    }
}

#[doc(hidden)]
pub mod seconds {
    use chrono::TimeDelta;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<TimeDelta, D::Error>
    where
        D: Deserializer<'de>,
    {
        let sec: i64 = Deserialize::deserialize(deserializer)?;
        TimeDelta::new(sec, 0)
            .ok_or_else(|| serde::de::Error::custom(format!("duration {} is out of range", sec)))
    }

    pub fn serialize<S>(delta: &TimeDelta, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(delta.num_seconds())
    }
}

#[doc(hidden)]
pub mod unix_ms {
    use chrono::prelude::*;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Local>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ts: i64 = Deserialize::deserialize(deserializer)?;
        Local
            .timestamp_millis_opt(ts)
            .single()
            .ok_or_else(|| serde::de::Error::custom(format!("timestamp {} is out of range", ts)))
    }

    pub fn serialize<S>(dt: &DateTime<Local>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(dt.timestamp_millis())
    }
}

#[doc(hidden)]
pub mod unix_ms_opt {
    use chrono::prelude::*;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Local>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ts: Option<i64> = Deserialize::deserialize(deserializer)?;

        match ts {
            Some(ts) => Local
                .timestamp_millis_opt(ts)
                .single()
                .map(Some)
                .ok_or_else(|| {
                    serde::de::Error::custom(format!("timestamp {} is out of range", ts))
                }),
            None => Ok(None),
        }
    }

    pub fn serialize<S>(dt: &Option<DateTime<Local>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match dt {
            Some(ref dt) => serializer.serialize_some(&dt.timestamp_millis()),
            None => serializer.serialize_none(),
        }
    }
}
