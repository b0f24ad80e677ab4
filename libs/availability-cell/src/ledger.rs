//! Occupancy of (physician, date, time) triples, derived from stored bookings.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;
use tracing::debug;

use shared_database::Document;

use crate::models::SlotTime;

pub const BOOKINGS_COLLECTION: &str = "agendamentos";

/// The part of a stored booking that consumes capacity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BookedSlot {
    pub physician_id: String,
    pub date: NaiveDate,
    pub time: SlotTime,
}

impl BookedSlot {
    pub fn new(physician_id: impl Into<String>, date: NaiveDate, time: SlotTime) -> Self {
        Self {
            physician_id: physician_id.into(),
            date,
            time,
        }
    }

    /// Reads `data`/`horario`, falling back to a combined `dataHora` timestamp.
    /// Bookings that name no physician or no readable slot are not counted.
    pub fn from_document(doc: &Document) -> Option<Self> {
        let physician_id = doc.str_field("medicoId").filter(|id| !id.is_empty())?;

        let split = doc
            .str_field("data")
            .and_then(|raw| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok())
            .zip(doc.str_field("horario").and_then(|raw| SlotTime::parse(raw).ok()));

        let (date, time) = match split {
            Some(pair) => pair,
            None => match doc.field("dataHora").and_then(parse_combined) {
                Some(pair) => pair,
                None => {
                    debug!("Booking {} has no readable slot; not counted", doc.id);
                    return None;
                }
            },
        };

        Some(Self::new(physician_id, date, time))
    }
}

fn parse_combined(value: &Value) -> Option<(NaiveDate, SlotTime)> {
    let raw = value.as_str()?;
    let local = DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.naive_local())
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
        .ok()?;

    let time = SlotTime::parse(&local.format("%H:%M").to_string()).ok()?;
    Some((local.date(), time))
}

/// Number of bookings that match the triple exactly.
pub fn occupancy(physician_id: &str, date: NaiveDate, time: SlotTime, bookings: &[BookedSlot]) -> usize {
    bookings
        .iter()
        .filter(|b| b.physician_id == physician_id && b.date == date && b.time == time)
        .count()
}

/// One physician's bookings, counted per (date, time).
#[derive(Debug, Clone, Default)]
pub struct SlotLedger {
    counts: HashMap<(NaiveDate, SlotTime), usize>,
}

impl SlotLedger {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Bookings for other physicians are ignored.
    pub fn from_bookings(physician_id: &str, bookings: &[BookedSlot]) -> Self {
        let mut counts = HashMap::new();
        for booking in bookings.iter().filter(|b| b.physician_id == physician_id) {
            *counts.entry((booking.date, booking.time)).or_insert(0) += 1;
        }
        Self { counts }
    }

    pub fn occupancy(&self, date: NaiveDate, time: SlotTime) -> usize {
        self.counts.get(&(date, time)).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap()
    }

    fn time(raw: &str) -> SlotTime {
        SlotTime::parse(raw).unwrap()
    }

    #[test]
    fn test_occupancy_counts_exact_triples_only() {
        let bookings = vec![
            BookedSlot::new("m1", date("2025-03-10"), time("09:00")),
            BookedSlot::new("m1", date("2025-03-10"), time("09:00")),
            BookedSlot::new("m1", date("2025-03-10"), time("10:00")),
            BookedSlot::new("m2", date("2025-03-10"), time("09:00")),
            BookedSlot::new("m1", date("2025-03-11"), time("09:00")),
        ];

        assert_eq!(occupancy("m1", date("2025-03-10"), time("09:00"), &bookings), 2);
        assert_eq!(occupancy("m1", date("2025-03-10"), time("11:00"), &bookings), 0);
        assert_eq!(occupancy("m3", date("2025-03-10"), time("09:00"), &bookings), 0);
    }

    #[test]
    fn test_ledger_agrees_with_linear_count() {
        let bookings = vec![
            BookedSlot::new("m1", date("2025-04-01"), time("09:00")),
            BookedSlot::new("m1", date("2025-04-01"), time("09:00")),
            BookedSlot::new("m2", date("2025-04-01"), time("09:00")),
        ];
        let ledger = SlotLedger::from_bookings("m1", &bookings);

        assert_eq!(ledger.occupancy(date("2025-04-01"), time("09:00")), 2);
        assert_eq!(ledger.occupancy(date("2025-04-01"), time("10:00")), 0);
        assert_eq!(ledger.total(), 2);
    }

    #[test]
    fn test_booked_slot_reads_split_fields() {
        let doc = Document::new("b1", json!({
            "medicoId": "m1",
            "data": "2025-04-01",
            "horario": "09:00",
        }));

        assert_eq!(
            BookedSlot::from_document(&doc),
            Some(BookedSlot::new("m1", date("2025-04-01"), time("09:00")))
        );
    }

    #[test]
    fn test_booked_slot_falls_back_to_combined_timestamp() {
        let doc = Document::new("b2", json!({
            "medicoId": "m1",
            "dataHora": "2025-04-01T14:30:00-03:00",
        }));

        assert_eq!(
            BookedSlot::from_document(&doc),
            Some(BookedSlot::new("m1", date("2025-04-01"), time("14:30")))
        );
    }

    #[test]
    fn test_unreadable_bookings_are_not_counted() {
        let no_physician = Document::new("b3", json!({"data": "2025-04-01", "horario": "09:00"}));
        let bad_time = Document::new("b4", json!({"medicoId": "m1", "data": "2025-04-01", "horario": "9h"}));

        assert_eq!(BookedSlot::from_document(&no_physician), None);
        assert_eq!(BookedSlot::from_document(&bad_time), None);
    }
}
