use chrono::Duration;
use chrono::NaiveDateTime;

use serde::Deserialize;
use serde::Serialize;

use std::sync::Arc;

/// Who, where and what. Attached once when an entry is created and never recomputed. Fields that
/// were never provided are left out of the stored document.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone, Default)]
pub struct Meta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub userid: Option<Arc<str>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contextid: Option<Arc<str>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<Arc<str>>,
}

/// A committed span of time. Entries are only created stopped, a running timer lives in
/// [ActiveTimer] until it is stopped.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
pub struct Entry {
    pub id: Arc<str>,
    #[serde(with = "timestamp_ser")]
    pub start: NaiveDateTime,
    #[serde(with = "timestamp_ser")]
    pub stop: NaiveDateTime,
    pub meta: Meta,
}

impl Entry {
    pub fn duration(&self) -> Duration {
        self.stop - self.start
    }

    /// Returns the part of the entry that falls inside `from..to`, where a missing bound doesn't
    /// restrict anything. Overlaps of zero length (touching at a boundary) don't count.
    pub fn intersection(
        &self,
        from: Option<NaiveDateTime>,
        to: Option<NaiveDateTime>,
    ) -> Option<Entry> {
        let start = from.map_or(self.start, |from| self.start.max(from));
        let stop = to.map_or(self.stop, |to| self.stop.min(to));
        if start < stop {
            Some(Entry {
                start,
                stop,
                ..self.clone()
            })
        } else {
            None
        }
    }
}

/// The single timer that is running right now.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
pub struct ActiveTimer {
    pub id: Arc<str>,
    #[serde(with = "timestamp_ser")]
    pub start: NaiveDateTime,
    pub meta: Meta,
}

impl ActiveTimer {
    /// Turns the timer into a committed entry. `stop` isn't checked against `start`.
    pub fn finish(self, stop: NaiveDateTime) -> Entry {
        let ActiveTimer { id, start, meta } = self;
        Entry {
            id,
            start,
            stop,
            meta,
        }
    }
}

/// Everything a store persists.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone, Default)]
pub struct StoreDocument {
    #[serde(default)]
    pub entries: Vec<Entry>,
    #[serde(default)]
    pub timer: Option<ActiveTimer>,
}

/// ISO-8601 local timestamps. Older files separate date and time with a space, which is accepted
/// on read.
pub(crate) mod timestamp_ser {
    use chrono::NaiveDateTime;
    use serde::{self, de::Error, Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

    pub fn serialize<S>(time: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&time.format(FORMAT))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.trim()
            .replacen(' ', "T", 1)
            .parse::<NaiveDateTime>()
            .map_err(|e| D::Error::custom(format!("invalid timestamp {s:?}: {e}")))
    }
}
