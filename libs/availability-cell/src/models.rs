use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use shared_database::StoreError;
use shared_models::error::AppError;

// ==============================================================================
// WEEKDAYS
// ==============================================================================

/// Declaration order is the Monday-first display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

pub const WEEKDAY_ORDER: [Weekday; 7] = [
    Weekday::Monday,
    Weekday::Tuesday,
    Weekday::Wednesday,
    Weekday::Thursday,
    Weekday::Friday,
    Weekday::Saturday,
    Weekday::Sunday,
];

/// Index 0 is Sunday.
const SUNDAY_FIRST: [Weekday; 7] = [
    Weekday::Sunday,
    Weekday::Monday,
    Weekday::Tuesday,
    Weekday::Wednesday,
    Weekday::Thursday,
    Weekday::Friday,
    Weekday::Saturday,
];

impl Weekday {
    /// The key under which the clinic stores this weekday.
    pub fn stored_name(self) -> &'static str {
        match self {
            Weekday::Monday => "Segunda",
            Weekday::Tuesday => "Terça",
            Weekday::Wednesday => "Quarta",
            Weekday::Thursday => "Quinta",
            Weekday::Friday => "Sexta",
            Weekday::Saturday => "Sábado",
            Weekday::Sunday => "Domingo",
        }
    }

    /// The fixed-schedule lookup key for a calendar date.
    pub fn of(date: NaiveDate) -> Self {
        SUNDAY_FIRST[date.weekday().num_days_from_sunday() as usize]
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.stored_name())
    }
}

impl FromStr for Weekday {
    type Err = ScheduleError;

    /// Accepts stored names (with or without accents) and English names.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_lowercase();
        let weekday = match normalized.as_str() {
            "segunda" | "monday" => Weekday::Monday,
            "terça" | "terca" | "tuesday" => Weekday::Tuesday,
            "quarta" | "wednesday" => Weekday::Wednesday,
            "quinta" | "thursday" => Weekday::Thursday,
            "sexta" | "friday" => Weekday::Friday,
            "sábado" | "sabado" | "saturday" => Weekday::Saturday,
            "domingo" | "sunday" => Weekday::Sunday,
            _ => return Err(ScheduleError::InvalidWeekday(raw.to_string())),
        };
        Ok(weekday)
    }
}

impl TryFrom<String> for Weekday {
    type Error = ScheduleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Weekday> for String {
    fn from(value: Weekday) -> Self {
        value.stored_name().to_string()
    }
}

// ==============================================================================
// SLOTS
// ==============================================================================

/// A local wall-clock time in canonical `HH:MM` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SlotTime(NaiveTime);

impl SlotTime {
    pub fn parse(raw: &str) -> Result<Self, ScheduleError> {
        let bytes = raw.as_bytes();
        if bytes.len() != 5 || bytes[2] != b':' {
            return Err(ScheduleError::InvalidTime(raw.to_string()));
        }

        NaiveTime::parse_from_str(raw, "%H:%M")
            .map(SlotTime)
            .map_err(|_| ScheduleError::InvalidTime(raw.to_string()))
    }

    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(SlotTime)
    }

    pub fn as_naive_time(self) -> NaiveTime {
        self.0
    }
}

impl fmt::Display for SlotTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

impl FromStr for SlotTime {
    type Err = ScheduleError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        SlotTime::parse(raw)
    }
}

impl TryFrom<String> for SlotTime {
    type Error = ScheduleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        SlotTime::parse(&value)
    }
}

impl From<SlotTime> for String {
    fn from(value: SlotTime) -> Self {
        value.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SlotDefinition {
    pub time: SlotTime,
    pub capacity: u32,
}

impl SlotDefinition {
    pub fn new(time: SlotTime, capacity: i64) -> Result<Self, ScheduleError> {
        if capacity < 1 {
            return Err(ScheduleError::InvalidCapacity {
                time: time.to_string(),
                capacity,
            });
        }

        let capacity = u32::try_from(capacity).map_err(|_| ScheduleError::InvalidCapacity {
            time: time.to_string(),
            capacity,
        })?;

        Ok(Self { time, capacity })
    }
}

/// A slot as typed into the editor, before validation.
#[derive(Debug, Clone, Deserialize)]
pub struct SlotInput {
    pub time: String,
    pub capacity: i64,
}

impl SlotInput {
    pub fn validate(&self) -> Result<SlotDefinition, ScheduleError> {
        SlotDefinition::new(SlotTime::parse(&self.time)?, self.capacity)
    }
}

pub type WeekdaySlots = BTreeMap<Weekday, Vec<SlotDefinition>>;
pub type DatedSlots = BTreeMap<NaiveDate, Vec<SlotDefinition>>;

// ==============================================================================
// AVAILABILITY RECORDS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleKind {
    Fixed,
    Rotating,
}

impl ScheduleKind {
    pub fn stored_tag(self) -> &'static str {
        match self {
            ScheduleKind::Fixed => "fixa",
            ScheduleKind::Rotating => "rotativa",
        }
    }

    pub fn from_stored_tag(tag: &str) -> Option<Self> {
        match tag {
            "fixa" => Some(ScheduleKind::Fixed),
            "rotativa" => Some(ScheduleKind::Rotating),
            _ => None,
        }
    }
}

impl fmt::Display for ScheduleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleKind::Fixed => f.write_str("fixed"),
            ScheduleKind::Rotating => f.write_str("rotating"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Schedule {
    Fixed { weekday_slots: WeekdaySlots },
    Rotating { dated_slots: DatedSlots },
}

impl Schedule {
    pub fn kind(&self) -> ScheduleKind {
        match self {
            Schedule::Fixed { .. } => ScheduleKind::Fixed,
            Schedule::Rotating { .. } => ScheduleKind::Rotating,
        }
    }

    /// Dates with any slot entry, ascending. Empty for fixed schedules.
    pub fn calendar_dates(&self) -> Vec<NaiveDate> {
        match self {
            Schedule::Fixed { .. } => Vec::new(),
            Schedule::Rotating { dated_slots } => dated_slots.keys().copied().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AvailabilityRecord {
    pub id: String,
    pub physician_id: String,
    pub schedule: Schedule,
}

impl AvailabilityRecord {
    pub fn kind(&self) -> ScheduleKind {
        self.schedule.kind()
    }

    pub fn weekday_slots(&self) -> Option<&WeekdaySlots> {
        match &self.schedule {
            Schedule::Fixed { weekday_slots } => Some(weekday_slots),
            Schedule::Rotating { .. } => None,
        }
    }

    pub fn dated_slots(&self) -> Option<&DatedSlots> {
        match &self.schedule {
            Schedule::Rotating { dated_slots } => Some(dated_slots),
            Schedule::Fixed { .. } => None,
        }
    }

    pub fn to_view(&self) -> AvailabilityRecordView {
        AvailabilityRecordView {
            id: self.id.clone(),
            physician_id: self.physician_id.clone(),
            kind: self.kind(),
            weekday_slots: self.weekday_slots().cloned(),
            dated_slots: self.dated_slots().cloned(),
            calendar_dates: match self.kind() {
                ScheduleKind::Rotating => Some(self.schedule.calendar_dates()),
                ScheduleKind::Fixed => None,
            },
        }
    }
}

/// Everything the store holds about one physician's availability.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhysicianSchedule {
    pub physician_id: String,
    pub fixed: Option<AvailabilityRecord>,
    pub rotating: Option<AvailabilityRecord>,
}

impl PhysicianSchedule {
    pub fn empty(physician_id: &str) -> Self {
        Self {
            physician_id: physician_id.to_string(),
            fixed: None,
            rotating: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fixed.is_none() && self.rotating.is_none()
    }

    pub fn record(&self, kind: ScheduleKind) -> Option<&AvailabilityRecord> {
        match kind {
            ScheduleKind::Fixed => self.fixed.as_ref(),
            ScheduleKind::Rotating => self.rotating.as_ref(),
        }
    }

    pub fn to_view(&self) -> PhysicianScheduleView {
        PhysicianScheduleView {
            physician_id: self.physician_id.clone(),
            fixed: self.fixed.as_ref().map(AvailabilityRecord::to_view),
            rotating: self.rotating.as_ref().map(AvailabilityRecord::to_view),
        }
    }
}

// ==============================================================================
// API SHAPES
// ==============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct AvailabilityRecordView {
    pub id: String,
    pub physician_id: String,
    pub kind: ScheduleKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weekday_slots: Option<WeekdaySlots>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dated_slots: Option<DatedSlots>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calendar_dates: Option<Vec<NaiveDate>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PhysicianScheduleView {
    pub physician_id: String,
    pub fixed: Option<AvailabilityRecordView>,
    pub rotating: Option<AvailabilityRecordView>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SaveFixedScheduleRequest {
    pub weekdays: Vec<Weekday>,
    pub slots: Vec<SlotInput>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SaveRotatingScheduleRequest {
    pub dates: BTreeMap<NaiveDate, Vec<SlotInput>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlotsQuery {
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CalendarQuery {
    pub year: i32,
    pub month: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct DaySlots {
    pub physician_id: String,
    pub date: NaiveDate,
    pub status: crate::resolver::DayAvailability,
    pub slots: Vec<SlotTime>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScheduleError {
    #[error("Malformed availability record: {0}")]
    MalformedAvailability(String),

    #[error("Invalid slot time '{0}', expected HH:MM")]
    InvalidTime(String),

    #[error("Slot {time} must accept at least one booking (got capacity {capacity})")]
    InvalidCapacity { time: String, capacity: i64 },

    #[error("Unknown weekday '{0}'")]
    InvalidWeekday(String),

    #[error("Invalid calendar month {year}-{month}")]
    InvalidMonth { year: i32, month: u32 },

    #[error("Nothing to save: {0}")]
    EmptyEdit(String),

    #[error("Physician {physician_id} already has a {existing} schedule")]
    ScheduleKindConflict { physician_id: String, existing: ScheduleKind },

    #[error("Availability record {record_id} is not a {expected} schedule")]
    WrongScheduleKind { record_id: String, expected: ScheduleKind },

    #[error("Availability record not found: {0}")]
    RecordNotFound(String),

    #[error("Document store unavailable: {0}")]
    StoreUnavailable(String),
}

impl From<StoreError> for ScheduleError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { id, .. } => ScheduleError::RecordNotFound(id),
            other => ScheduleError::StoreUnavailable(other.to_string()),
        }
    }
}

impl From<ScheduleError> for AppError {
    fn from(err: ScheduleError) -> Self {
        match err {
            ScheduleError::RecordNotFound(_) => AppError::NotFound(err.to_string()),
            ScheduleError::ScheduleKindConflict { .. } | ScheduleError::WrongScheduleKind { .. } => {
                AppError::Conflict(err.to_string())
            }
            ScheduleError::StoreUnavailable(_) => AppError::StoreUnavailable(err.to_string()),
            ScheduleError::MalformedAvailability(_) => AppError::Internal(err.to_string()),
            ScheduleError::InvalidTime(_)
            | ScheduleError::InvalidCapacity { .. }
            | ScheduleError::InvalidWeekday(_)
            | ScheduleError::InvalidMonth { .. }
            | ScheduleError::EmptyEdit(_) => AppError::ValidationError(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weekday_lookup_uses_sunday_first_table() {
        // 2025-03-09 is a Sunday, 2025-03-10 a Monday.
        assert_eq!(Weekday::of(NaiveDate::from_ymd_opt(2025, 3, 9).unwrap()), Weekday::Sunday);
        assert_eq!(Weekday::of(NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()), Weekday::Monday);
        assert_eq!(Weekday::of(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()), Weekday::Wednesday);
        assert_eq!(Weekday::of(NaiveDate::from_ymd_opt(2025, 3, 15).unwrap()), Weekday::Saturday);
    }

    #[test]
    fn test_weekday_names_parse_in_both_languages() {
        assert_eq!("Terça".parse::<Weekday>().unwrap(), Weekday::Tuesday);
        assert_eq!("sabado".parse::<Weekday>().unwrap(), Weekday::Saturday);
        assert_eq!("Friday".parse::<Weekday>().unwrap(), Weekday::Friday);
        assert!("Funday".parse::<Weekday>().is_err());
    }

    #[test]
    fn test_monday_first_display_order() {
        let mut days = vec![Weekday::Sunday, Weekday::Wednesday, Weekday::Monday];
        days.sort();
        assert_eq!(days, vec![Weekday::Monday, Weekday::Wednesday, Weekday::Sunday]);
        assert_eq!(WEEKDAY_ORDER.first(), Some(&Weekday::Monday));
        assert_eq!(WEEKDAY_ORDER.last(), Some(&Weekday::Sunday));
    }

    #[test]
    fn test_slot_time_requires_canonical_form() {
        assert_eq!(SlotTime::parse("09:00").unwrap().to_string(), "09:00");
        assert_eq!(SlotTime::parse("23:59").unwrap().to_string(), "23:59");
        assert!(SlotTime::parse("9:00").is_err());
        assert!(SlotTime::parse("24:00").is_err());
        assert!(SlotTime::parse("09:60").is_err());
        assert!(SlotTime::parse("0900").is_err());
    }

    #[test]
    fn test_slot_times_order_by_time_of_day() {
        let early = SlotTime::parse("08:30").unwrap();
        let late = SlotTime::parse("14:00").unwrap();
        assert!(early < late);
    }

    #[test]
    fn test_capacity_below_one_is_rejected() {
        let time = SlotTime::parse("10:00").unwrap();
        assert!(SlotDefinition::new(time, 1).is_ok());
        assert_eq!(
            SlotDefinition::new(time, 0),
            Err(ScheduleError::InvalidCapacity { time: "10:00".to_string(), capacity: 0 })
        );
        assert!(SlotDefinition::new(time, -2).is_err());
    }

    #[test]
    fn test_weekday_serializes_as_stored_name() {
        let json = serde_json::to_value(Weekday::Tuesday).unwrap();
        assert_eq!(json, serde_json::json!("Terça"));
        let parsed: Weekday = serde_json::from_value(serde_json::json!("Tuesday")).unwrap();
        assert_eq!(parsed, Weekday::Tuesday);
    }

    #[test]
    fn test_schedule_errors_map_to_http_errors() {
        let conflict: AppError = ScheduleError::ScheduleKindConflict {
            physician_id: "m1".to_string(),
            existing: ScheduleKind::Rotating,
        }.into();
        assert!(matches!(conflict, AppError::Conflict(_)));

        let missing: AppError = ScheduleError::RecordNotFound("rec-1".to_string()).into();
        assert!(matches!(missing, AppError::NotFound(_)));
    }
}
