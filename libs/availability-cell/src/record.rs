//! Additive edits to availability records.
//!
//! Every merge leaves untouched days exactly as they were, and a time that
//! is already present for a day keeps its original capacity.

use chrono::NaiveDate;

use crate::models::{DatedSlots, SlotDefinition, Weekday, WeekdaySlots};

/// Appends `incoming` to `list`, skipping times already present.
fn append_unique<'a, I>(list: &mut Vec<SlotDefinition>, incoming: I)
where
    I: IntoIterator<Item = &'a SlotDefinition>,
{
    for slot in incoming {
        if !list.iter().any(|existing| existing.time == slot.time) {
            list.push(*slot);
        }
    }
}

/// Adds `new_slots` to each selected weekday.
pub fn merge_weekday_slots(
    existing: &WeekdaySlots,
    weekday_selections: &[Weekday],
    new_slots: &[SlotDefinition],
) -> WeekdaySlots {
    let mut merged = existing.clone();
    if new_slots.is_empty() {
        return merged;
    }

    for weekday in weekday_selections {
        append_unique(merged.entry(*weekday).or_default(), new_slots);
    }

    merged
}

/// Adds each proposed date's slots. Dates without proposals are ignored.
pub fn merge_dated_slots(existing: &DatedSlots, dated_selections: &DatedSlots) -> DatedSlots {
    let mut merged = existing.clone();

    for (date, proposed) in dated_selections {
        if proposed.is_empty() {
            continue;
        }
        append_unique(merged.entry(*date).or_default(), proposed);
    }

    merged
}

pub fn remove_weekday(existing: &WeekdaySlots, weekday: Weekday) -> WeekdaySlots {
    let mut updated = existing.clone();
    updated.remove(&weekday);
    updated
}

/// Calendar dates are the map keys, so they shrink along with it.
pub fn remove_date(existing: &DatedSlots, date: NaiveDate) -> DatedSlots {
    let mut updated = existing.clone();
    updated.remove(&date);
    updated
}

/// Collapses duplicate times within one day's list, first entry wins.
pub fn dedup_slots(slots: Vec<SlotDefinition>) -> Vec<SlotDefinition> {
    let mut unique = Vec::with_capacity(slots.len());
    append_unique(&mut unique, &slots);
    unique
}
