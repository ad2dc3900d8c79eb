// libs/shared/models/src/slot.rs
use chrono::{Duration, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Canonical appointment length. Every slot on the grid is exactly this long.
pub const SLOT_MINUTES: i64 = 30;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SlotError {
    #[error("time {0} is not aligned to a 30-minute boundary")]
    InvalidSlotGranularity(NaiveTime),

    #[error("slot starting at {0} falls outside operating hours")]
    OutsideOperatingHours(NaiveTime),

    #[error("slot {start}-{end} must be exactly 30 minutes long")]
    InvalidDuration { start: NaiveTime, end: NaiveTime },
}

/// Serde helper for clinic wall-clock times on the wire ("HH:MM", 24h).
/// Deserialization also tolerates "HH:MM:SS" payloads.
pub mod wire_time {
    use chrono::NaiveTime;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub fn parse(raw: &str) -> Result<NaiveTime, String> {
        NaiveTime::parse_from_str(raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
            .map_err(|_| format!("expected HH:MM time, got {raw:?}"))
    }
}

/// A single cell of the half-hour grid, unique by its start time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeSlot {
    #[serde(with = "wire_time")]
    pub start_time: NaiveTime,
    #[serde(with = "wire_time")]
    pub end_time: NaiveTime,
}

impl TimeSlot {
    /// Build a slot from explicit bounds. The 30-minute length is an
    /// invariant, not a default: a mismatched pair is rejected, never
    /// silently corrected.
    pub fn new(start_time: NaiveTime, end_time: NaiveTime) -> Result<Self, SlotError> {
        if end_time - start_time != Duration::minutes(SLOT_MINUTES) {
            return Err(SlotError::InvalidDuration {
                start: start_time,
                end: end_time,
            });
        }
        Ok(Self {
            start_time,
            end_time,
        })
    }

    /// Build the canonical slot beginning at `start_time`.
    pub fn from_start(start_time: NaiveTime) -> Self {
        Self {
            start_time,
            end_time: start_time + Duration::minutes(SLOT_MINUTES),
        }
    }
}

impl std::fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}-{}",
            self.start_time.format("%H:%M"),
            self.end_time.format("%H:%M")
        )
    }
}

/// The clinic's half-hour time grid between opening and closing time.
/// Pure value type: validates and quantizes wall-clock times, enumerates
/// canonical slots. No side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotGrid {
    open: NaiveTime,
    close: NaiveTime,
}

impl SlotGrid {
    pub fn new(open: NaiveTime, close: NaiveTime) -> Result<Self, SlotError> {
        if !is_aligned(open) {
            return Err(SlotError::InvalidSlotGranularity(open));
        }
        if !is_aligned(close) || close <= open {
            return Err(SlotError::InvalidSlotGranularity(close));
        }
        Ok(Self { open, close })
    }

    pub fn open(&self) -> NaiveTime {
        self.open
    }

    pub fn close(&self) -> NaiveTime {
        self.close
    }

    /// Snap a wall-clock time onto the grid. Fails if the time is not on a
    /// 30-minute boundary or if the resulting slot would not fit inside the
    /// operating window.
    pub fn quantize(&self, time: NaiveTime) -> Result<TimeSlot, SlotError> {
        if !is_aligned(time) {
            return Err(SlotError::InvalidSlotGranularity(time));
        }
        let (end, wrap) = time.overflowing_add_signed(Duration::minutes(SLOT_MINUTES));
        if wrap != 0 || time < self.open || end > self.close {
            return Err(SlotError::OutsideOperatingHours(time));
        }
        Ok(TimeSlot {
            start_time: time,
            end_time: end,
        })
    }

    /// All canonical slots whose bounds fall inside `[from, until]`,
    /// clamped to the operating window, in ascending order.
    pub fn enumerate(&self, from: NaiveTime, until: NaiveTime) -> Vec<TimeSlot> {
        let mut slots = Vec::new();
        let mut cursor = self.open.max(from);
        if !is_aligned(cursor) {
            // Round up to the next grid boundary.
            let overshoot = i64::from(cursor.minute() % 30) * 60 + i64::from(cursor.second());
            cursor += Duration::seconds(30 * 60 - overshoot);
        }
        let limit = self.close.min(until);
        loop {
            let (end, wrap) = cursor.overflowing_add_signed(Duration::minutes(SLOT_MINUTES));
            if wrap != 0 || end > limit {
                break;
            }
            slots.push(TimeSlot {
                start_time: cursor,
                end_time: end,
            });
            cursor = end;
        }
        slots
    }

    /// The full operating-hours grid.
    pub fn all_slots(&self) -> Vec<TimeSlot> {
        self.enumerate(self.open, self.close)
    }
}

impl Default for SlotGrid {
    fn default() -> Self {
        Self {
            open: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            close: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
        }
    }
}

fn is_aligned(time: NaiveTime) -> bool {
    time.minute() % 30 == 0 && time.second() == 0 && time.nanosecond() == 0
}
