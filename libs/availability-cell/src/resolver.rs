//! Decides which slots a physician can still offer on a given date.
//!
//! Order of checks: past dates, holidays, candidate slots from both
//! schedule kinds, remaining capacity, and finally (for today only) the
//! current wall-clock time. Everything is evaluated against one `now`
//! captured when the resolver is built, so repeated calls agree.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use shared_config::HolidayCalendar;

use crate::ledger::SlotLedger;
use crate::models::{PhysicianSchedule, ScheduleError, SlotDefinition, SlotTime, Weekday};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayAvailability {
    Past,
    Holiday,
    NoSchedule,
    FullyBooked,
    Available,
}

impl DayAvailability {
    pub fn is_available(self) -> bool {
        matches!(self, DayAvailability::Available)
    }
}

/// One date-picker tile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub weekday: Weekday,
    pub status: DayAvailability,
    pub available: bool,
    pub open_slots: usize,
}

pub struct AvailabilityResolver<'a> {
    holidays: &'a HolidayCalendar,
    now: DateTime<FixedOffset>,
}

impl<'a> AvailabilityResolver<'a> {
    /// `now` must already be expressed in the clinic's offset.
    pub fn new(holidays: &'a HolidayCalendar, now: DateTime<FixedOffset>) -> Self {
        Self { holidays, now }
    }

    pub fn today(&self) -> NaiveDate {
        self.now.date_naive()
    }

    /// Rotating slots for the date, then fixed slots for its weekday. When
    /// both kinds define the same time the rotating entry is kept.
    pub fn candidate_slots(&self, schedule: &PhysicianSchedule, date: NaiveDate) -> Vec<SlotDefinition> {
        let dated = schedule
            .rotating
            .as_ref()
            .and_then(|record| record.dated_slots())
            .and_then(|slots| slots.get(&date));
        let weekly = schedule
            .fixed
            .as_ref()
            .and_then(|record| record.weekday_slots())
            .and_then(|slots| slots.get(&Weekday::of(date)));

        let mut candidates: Vec<SlotDefinition> = Vec::new();
        for slot in dated.into_iter().flatten().chain(weekly.into_iter().flatten()) {
            if !candidates.iter().any(|kept| kept.time == slot.time) {
                candidates.push(*slot);
            }
        }
        candidates
    }

    /// Times still open for booking, ascending.
    pub fn bookable_slots(
        &self,
        schedule: &PhysicianSchedule,
        date: NaiveDate,
        ledger: &SlotLedger,
    ) -> Vec<SlotTime> {
        let today = self.today();
        if date < today || self.holidays.is_holiday(date) {
            return Vec::new();
        }

        let cutoff = (date == today).then(|| self.now.time());

        let mut open: Vec<SlotTime> = self
            .candidate_slots(schedule, date)
            .into_iter()
            .filter(|slot| ledger.occupancy(date, slot.time) < slot.capacity as usize)
            .filter(|slot| cutoff.map_or(true, |now| slot.time.as_naive_time() > now))
            .map(|slot| slot.time)
            .collect();

        open.sort();
        open
    }

    pub fn is_bookable(
        &self,
        schedule: &PhysicianSchedule,
        date: NaiveDate,
        time: SlotTime,
        ledger: &SlotLedger,
    ) -> bool {
        self.bookable_slots(schedule, date, ledger).contains(&time)
    }

    pub fn classify_day(
        &self,
        schedule: &PhysicianSchedule,
        date: NaiveDate,
        ledger: &SlotLedger,
    ) -> DayAvailability {
        self.classify_with_count(schedule, date, ledger).0
    }

    fn classify_with_count(
        &self,
        schedule: &PhysicianSchedule,
        date: NaiveDate,
        ledger: &SlotLedger,
    ) -> (DayAvailability, usize) {
        if date < self.today() {
            return (DayAvailability::Past, 0);
        }
        if self.holidays.is_holiday(date) {
            return (DayAvailability::Holiday, 0);
        }
        if self.candidate_slots(schedule, date).is_empty() {
            return (DayAvailability::NoSchedule, 0);
        }

        match self.bookable_slots(schedule, date, ledger).len() {
            0 => (DayAvailability::FullyBooked, 0),
            open => (DayAvailability::Available, open),
        }
    }

    /// Classifies every day of `year`-`month`.
    pub fn month_calendar(
        &self,
        schedule: &PhysicianSchedule,
        year: i32,
        month: u32,
        ledger: &SlotLedger,
    ) -> Result<Vec<CalendarDay>, ScheduleError> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or(ScheduleError::InvalidMonth { year, month })?;

        let days = first
            .iter_days()
            .take_while(|date| date.month() == month)
            .map(|date| {
                let (status, open_slots) = self.classify_with_count(schedule, date, ledger);
                CalendarDay {
                    date,
                    weekday: Weekday::of(date),
                    status,
                    available: status.is_available(),
                    open_slots,
                }
            })
            .collect();

        Ok(days)
    }
}
