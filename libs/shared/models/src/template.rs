// libs/shared/models/src/template.rs
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::schedule::Weekday;
use crate::slot::TimeSlot;

/// A doctor's recurring weekly availability: per-weekday slot lists kept
/// sorted and unique by start time, plus calendar dates on which the doctor
/// is closed regardless of the weekday pattern.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeeklyTemplate {
    #[serde(default)]
    pub slots: BTreeMap<Weekday, Vec<TimeSlot>>,
    #[serde(default)]
    pub unavailable_dates: BTreeSet<NaiveDate>,
}

impl WeeklyTemplate {
    pub fn slots_for(&self, weekday: Weekday) -> &[TimeSlot] {
        self.slots.get(&weekday).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn offers(&self, weekday: Weekday, start_time: NaiveTime) -> bool {
        self.slots_for(weekday)
            .iter()
            .any(|slot| slot.start_time == start_time)
    }

    pub fn is_closed_on(&self, date: NaiveDate) -> bool {
        self.unavailable_dates.contains(&date)
    }

    pub fn available_days(&self) -> Vec<Weekday> {
        self.slots.keys().copied().collect()
    }

    /// Union new slots into a weekday; duplicates by start time merge
    /// silently and ordering by start time is preserved.
    pub fn union_slots<I>(&mut self, weekday: Weekday, new_slots: I)
    where
        I: IntoIterator<Item = TimeSlot>,
    {
        let day = self.slots.entry(weekday).or_default();
        for slot in new_slots {
            if !day.iter().any(|s| s.start_time == slot.start_time) {
                day.push(slot);
            }
        }
        day.sort_by_key(|s| s.start_time);
    }

    /// Remove the slot starting at `start_time`. A weekday whose last slot
    /// is removed disappears from the map entirely.
    pub fn remove_slot(&mut self, weekday: Weekday, start_time: NaiveTime) -> bool {
        let Some(day) = self.slots.get_mut(&weekday) else {
            return false;
        };
        let before = day.len();
        day.retain(|slot| slot.start_time != start_time);
        let removed = day.len() < before;
        if day.is_empty() {
            self.slots.remove(&weekday);
        }
        removed
    }

    pub fn mark_unavailable(&mut self, date: NaiveDate) {
        self.unavailable_dates.insert(date);
    }

    pub fn clear_unavailable(&mut self, date: NaiveDate) -> bool {
        self.unavailable_dates.remove(&date)
    }
}
