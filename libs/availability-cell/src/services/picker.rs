use std::sync::Arc;

use chrono::NaiveDate;
use tracing::debug;

use shared_config::HolidayCalendar;
use shared_utils::{AppState, Clock};

use crate::ledger::SlotLedger;
use crate::models::{DaySlots, PhysicianSchedule, ScheduleError};
use crate::resolver::{AvailabilityResolver, CalendarDay};
use crate::services::repository::ScheduleRepository;

/// Patient-facing slot lookups. Each call reads a fresh snapshot of the
/// physician's availability and bookings.
pub struct SlotPickerService {
    repository: ScheduleRepository,
    holidays: HolidayCalendar,
    clock: Arc<dyn Clock>,
}

impl SlotPickerService {
    pub fn new(state: &AppState) -> Self {
        Self {
            repository: ScheduleRepository::new(state.store.clone()),
            holidays: state.config.clinic.holidays.clone(),
            clock: state.clock.clone(),
        }
    }

    /// Schedule and bookings, read concurrently.
    pub async fn snapshot(&self, physician_id: &str) -> Result<(PhysicianSchedule, SlotLedger), ScheduleError> {
        futures::try_join!(
            self.repository.load_schedule(physician_id),
            self.repository.load_ledger(physician_id),
        )
    }

    pub async fn available_slots(&self, physician_id: &str, date: NaiveDate) -> Result<DaySlots, ScheduleError> {
        let (schedule, ledger) = self.snapshot(physician_id).await?;
        let resolver = AvailabilityResolver::new(&self.holidays, self.clock.now());

        let slots = resolver.bookable_slots(&schedule, date, &ledger);
        let status = resolver.classify_day(&schedule, date, &ledger);

        debug!(
            "Physician {} on {}: {:?} with {} open slots",
            physician_id,
            date,
            status,
            slots.len()
        );

        Ok(DaySlots {
            physician_id: physician_id.to_string(),
            date,
            status,
            slots,
        })
    }

    pub async fn month_calendar(
        &self,
        physician_id: &str,
        year: i32,
        month: u32,
    ) -> Result<Vec<CalendarDay>, ScheduleError> {
        // Reject a bad month before touching the store.
        if NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(ScheduleError::InvalidMonth { year, month });
        }

        let (schedule, ledger) = self.snapshot(physician_id).await?;
        AvailabilityResolver::new(&self.holidays, self.clock.now()).month_calendar(&schedule, year, month, &ledger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    use shared_utils::test_utils::{MockStoreDocuments, TestConfig};

    use crate::document::AVAILABILITY_COLLECTION;
    use crate::ledger::BOOKINGS_COLLECTION;
    use crate::models::SlotTime;
    use crate::resolver::DayAvailability;

    fn date(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap()
    }

    #[tokio::test]
    async fn test_available_slots_counts_stored_bookings() {
        let (state, store, _) = TestConfig::default().to_state("2025-03-01T08:00");
        store
            .insert_with_id(
                AVAILABILITY_COLLECTION,
                "fixed-1",
                MockStoreDocuments::fixed_availability("m1", &[(
                    "Segunda",
                    vec![MockStoreDocuments::slot("09:00", 2), MockStoreDocuments::slot("08:00", 1)],
                )]),
            )
            .await;
        store.insert_with_id(BOOKINGS_COLLECTION, "b1", MockStoreDocuments::booking("m1", "plan-1", "2025-03-10", "09:00")).await;
        store.insert_with_id(BOOKINGS_COLLECTION, "b2", MockStoreDocuments::booking("m1", "plan-1", "2025-03-10", "08:00")).await;
        store.insert_with_id(BOOKINGS_COLLECTION, "b3", MockStoreDocuments::booking("m2", "plan-1", "2025-03-10", "09:00")).await;

        let picker = SlotPickerService::new(&state);
        let day = picker.available_slots("m1", date("2025-03-10")).await.unwrap();

        assert_eq!(day.status, DayAvailability::Available);
        assert_eq!(day.slots, vec![SlotTime::parse("09:00").unwrap()]);

        store.insert_with_id(BOOKINGS_COLLECTION, "b4", MockStoreDocuments::booking("m1", "plan-1", "2025-03-10", "09:00")).await;
        let day = picker.available_slots("m1", date("2025-03-10")).await.unwrap();
        assert!(day.slots.is_empty());
        assert_eq!(day.status, DayAvailability::FullyBooked);
    }

    #[tokio::test]
    async fn test_clock_moves_past_slots_out() {
        let (state, store, clock) = TestConfig::default().to_state("2025-03-10T08:00");
        store
            .insert_with_id(
                AVAILABILITY_COLLECTION,
                "fixed-1",
                MockStoreDocuments::fixed_availability("m1", &[("Segunda", vec![MockStoreDocuments::slot("10:00", 1)])]),
            )
            .await;
        let picker = SlotPickerService::new(&state);

        assert_eq!(picker.available_slots("m1", date("2025-03-10")).await.unwrap().slots.len(), 1);

        let later = shared_utils::FixedClock::at_local(TestConfig::clinic_offset(), "2025-03-10T10:30").unwrap();
        clock.set(later.now());
        assert!(picker.available_slots("m1", date("2025-03-10")).await.unwrap().slots.is_empty());
    }

    #[tokio::test]
    async fn test_month_calendar_validates_month_first() {
        let (state, store, _) = TestConfig::default().to_state("2025-03-10T08:00");
        store.set_offline(true);
        let picker = SlotPickerService::new(&state);

        assert_matches!(
            picker.month_calendar("m1", 2025, 0).await,
            Err(ScheduleError::InvalidMonth { month: 0, .. })
        );
        assert_matches!(picker.month_calendar("m1", 2025, 3).await, Err(ScheduleError::StoreUnavailable(_)));
    }
}
