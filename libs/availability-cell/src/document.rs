//! The one place where stored availability documents become typed records.
//!
//! Slot entries that cannot be read are dropped with a warning, so one bad
//! entry never hides the rest of a physician's schedule.

use chrono::NaiveDate;
use serde_json::{json, Map, Value};
use tracing::warn;

use shared_database::Document;

use crate::models::{
    AvailabilityRecord, DatedSlots, PhysicianSchedule, Schedule, ScheduleError, ScheduleKind, SlotDefinition,
    SlotTime, Weekday, WeekdaySlots, WEEKDAY_ORDER,
};
use crate::record::dedup_slots;

pub const AVAILABILITY_COLLECTION: &str = "availability";

const KIND_FIELD: &str = "tipo";
const PHYSICIAN_FIELD: &str = "medicoId";
const WEEKDAY_SLOTS_FIELD: &str = "diasDaSemanaComHorarios";
const DATED_SLOTS_FIELD: &str = "horariosPorData";
const CALENDAR_FIELD: &str = "diasCalendario";
// Older fixed records: a Monday-first flag array sharing one list of times.
const LEGACY_DAY_FLAGS_FIELD: &str = "diasSemana";
const LEGACY_TIMES_FIELD: &str = "horarios";

const DEFAULT_CAPACITY: i64 = 1;

impl AvailabilityRecord {
    pub fn from_document(doc: &Document) -> Result<Self, ScheduleError> {
        let tag = doc.str_field(KIND_FIELD).ok_or_else(|| {
            ScheduleError::MalformedAvailability(format!("{}: missing '{}'", doc.id, KIND_FIELD))
        })?;
        let kind = ScheduleKind::from_stored_tag(tag).ok_or_else(|| {
            ScheduleError::MalformedAvailability(format!("{}: unknown schedule kind '{}'", doc.id, tag))
        })?;

        let physician_id = doc
            .str_field(PHYSICIAN_FIELD)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                ScheduleError::MalformedAvailability(format!("{}: missing '{}'", doc.id, PHYSICIAN_FIELD))
            })?
            .to_string();

        let schedule = match kind {
            ScheduleKind::Fixed => Schedule::Fixed {
                weekday_slots: parse_weekday_slots(doc),
            },
            ScheduleKind::Rotating => Schedule::Rotating {
                dated_slots: parse_dated_slots(doc),
            },
        };

        Ok(Self {
            id: doc.id.clone(),
            physician_id,
            schedule,
        })
    }

    /// The stored shape; rotating records carry their sorted calendar dates.
    pub fn to_document(&self) -> Value {
        let mut body = Map::new();
        body.insert(KIND_FIELD.to_string(), json!(self.kind().stored_tag()));
        body.insert(PHYSICIAN_FIELD.to_string(), json!(self.physician_id));

        match &self.schedule {
            Schedule::Fixed { weekday_slots } => {
                let days: Map<String, Value> = weekday_slots
                    .iter()
                    .map(|(day, slots)| (day.stored_name().to_string(), slots_to_value(slots)))
                    .collect();
                body.insert(WEEKDAY_SLOTS_FIELD.to_string(), Value::Object(days));
            }
            Schedule::Rotating { dated_slots } => {
                let dates: Map<String, Value> = dated_slots
                    .iter()
                    .map(|(date, slots)| (date.format("%Y-%m-%d").to_string(), slots_to_value(slots)))
                    .collect();
                let calendar: Vec<String> = self
                    .schedule
                    .calendar_dates()
                    .iter()
                    .map(|date| date.format("%Y-%m-%d").to_string())
                    .collect();
                body.insert(DATED_SLOTS_FIELD.to_string(), Value::Object(dates));
                body.insert(CALENDAR_FIELD.to_string(), json!(calendar));
            }
        }

        Value::Object(body)
    }
}

impl PhysicianSchedule {
    /// Assembles a schedule from the physician's stored records. Malformed
    /// records are skipped; when a kind appears twice the first one wins.
    pub fn from_documents(physician_id: &str, docs: &[Document]) -> Self {
        let mut schedule = PhysicianSchedule::empty(physician_id);

        for doc in docs {
            let record = match AvailabilityRecord::from_document(doc) {
                Ok(record) => record,
                Err(e) => {
                    warn!("Skipping availability {}: {}", doc.id, e);
                    continue;
                }
            };
            if record.physician_id != physician_id {
                continue;
            }

            let slot = match record.kind() {
                ScheduleKind::Fixed => &mut schedule.fixed,
                ScheduleKind::Rotating => &mut schedule.rotating,
            };
            if let Some(kept) = slot.as_ref() {
                warn!(
                    "Physician {} has more than one {} schedule; using {} and ignoring {}",
                    physician_id,
                    record.kind(),
                    kept.id,
                    record.id
                );
            } else {
                *slot = Some(record);
            }
        }

        schedule
    }
}

fn slots_to_value(slots: &[SlotDefinition]) -> Value {
    Value::Array(
        slots
            .iter()
            .map(|slot| json!({ "horario": slot.time.to_string(), "limite": slot.capacity }))
            .collect(),
    )
}

fn parse_weekday_slots(doc: &Document) -> WeekdaySlots {
    let mut weekday_slots = WeekdaySlots::new();

    match doc.field(WEEKDAY_SLOTS_FIELD) {
        Some(Value::Object(days)) => {
            for (name, entries) in days {
                let weekday = match name.parse::<Weekday>() {
                    Ok(weekday) => weekday,
                    Err(_) => {
                        warn!("Skipping unknown weekday '{}' in availability {}", name, doc.id);
                        continue;
                    }
                };
                let slots = parse_slot_list(&doc.id, name, entries);
                if !slots.is_empty() {
                    let list = weekday_slots.entry(weekday).or_default();
                    list.extend(slots);
                    *list = dedup_slots(std::mem::take(list));
                }
            }
        }
        Some(other) if !other.is_null() => {
            warn!("Ignoring non-object '{}' in availability {}", WEEKDAY_SLOTS_FIELD, doc.id);
        }
        _ => {
            parse_legacy_weekdays(doc, &mut weekday_slots);
        }
    }

    weekday_slots
}

fn parse_legacy_weekdays(doc: &Document, weekday_slots: &mut WeekdaySlots) {
    let (Some(Value::Array(flags)), Some(times)) =
        (doc.field(LEGACY_DAY_FLAGS_FIELD), doc.field(LEGACY_TIMES_FIELD))
    else {
        return;
    };

    let slots = parse_slot_list(&doc.id, LEGACY_TIMES_FIELD, times);
    if slots.is_empty() {
        return;
    }

    for (weekday, flag) in WEEKDAY_ORDER.iter().zip(flags) {
        if flag.as_bool() == Some(true) {
            weekday_slots.insert(*weekday, slots.clone());
        }
    }
}

fn parse_dated_slots(doc: &Document) -> DatedSlots {
    let mut dated_slots = DatedSlots::new();

    let Some(Value::Object(dates)) = doc.field(DATED_SLOTS_FIELD) else {
        if doc.field(DATED_SLOTS_FIELD).is_some_and(|v| !v.is_null()) {
            warn!("Ignoring non-object '{}' in availability {}", DATED_SLOTS_FIELD, doc.id);
        }
        return dated_slots;
    };

    for (raw_date, entries) in dates {
        let date = match NaiveDate::parse_from_str(raw_date, "%Y-%m-%d") {
            Ok(date) => date,
            Err(_) => {
                warn!("Skipping unparseable date '{}' in availability {}", raw_date, doc.id);
                continue;
            }
        };
        let slots = parse_slot_list(&doc.id, raw_date, entries);
        if !slots.is_empty() {
            dated_slots.insert(date, slots);
        }
    }

    dated_slots
}

fn parse_slot_list(record_id: &str, day_key: &str, entries: &Value) -> Vec<SlotDefinition> {
    let Some(entries) = entries.as_array() else {
        warn!("Slot list for '{}' in availability {} is not an array", day_key, record_id);
        return Vec::new();
    };

    let slots = entries
        .iter()
        .filter_map(|entry| match parse_slot(entry) {
            Ok(slot) => Some(slot),
            Err(reason) => {
                warn!("Skipping slot {} for '{}' in availability {}: {}", entry, day_key, record_id, reason);
                None
            }
        })
        .collect();

    dedup_slots(slots)
}

/// Older entries are bare `"HH:MM"` strings or omit `limite`; both mean one seat.
fn parse_slot(entry: &Value) -> Result<SlotDefinition, ScheduleError> {
    if let Value::String(raw_time) = entry {
        return SlotDefinition::new(SlotTime::parse(raw_time)?, DEFAULT_CAPACITY);
    }

    let raw_time = entry
        .get("horario")
        .and_then(Value::as_str)
        .ok_or_else(|| ScheduleError::MalformedAvailability("missing 'horario'".to_string()))?;
    let time = SlotTime::parse(raw_time)?;

    let capacity = match entry.get("limite") {
        None | Some(Value::Null) => DEFAULT_CAPACITY,
        Some(Value::Number(n)) => n.as_i64().ok_or_else(|| ScheduleError::InvalidCapacity {
            time: raw_time.to_string(),
            capacity: 0,
        })?,
        Some(Value::String(s)) => s.trim().parse::<i64>().map_err(|_| {
            ScheduleError::MalformedAvailability(format!("non-numeric 'limite' {}", s))
        })?,
        Some(other) => {
            return Err(ScheduleError::MalformedAvailability(format!("unreadable 'limite' {}", other)))
        }
    };

    SlotDefinition::new(time, capacity)
}
