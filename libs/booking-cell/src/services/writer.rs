//! Turns a chosen slot into a stored booking.
//!
//! Capacity is re-checked against a fresh read right before the insert.
//! The check and the insert are two separate store calls, so two patients
//! racing for the last seat of a slot can both succeed; the store offers
//! no conditional write to close that window.

use std::sync::Arc;

use tracing::{debug, info, warn};

use availability_cell::{occupancy, AvailabilityResolver, ScheduleRepository, SlotLedger, BOOKINGS_COLLECTION};
use shared_config::HolidayCalendar;
use shared_database::DocumentStore;
use shared_utils::{AppState, Clock};

use crate::models::{Booking, BookingError, BookingReceipt, BookingRequest};

pub struct BookingWriter {
    store: Arc<dyn DocumentStore>,
    repository: ScheduleRepository,
    holidays: HolidayCalendar,
    clock: Arc<dyn Clock>,
}

impl BookingWriter {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
            repository: ScheduleRepository::new(state.store.clone()),
            holidays: state.config.clinic.holidays.clone(),
            clock: state.clock.clone(),
        }
    }

    pub async fn submit(&self, request: BookingRequest) -> Result<BookingReceipt, BookingError> {
        request.patient.validate()?;

        let physician_id = request.physician_id.clone();
        let (date, time) = (request.date, request.time);

        let (schedule, booked) = futures::try_join!(
            self.repository.load_schedule(&physician_id),
            self.repository.load_booked_slots(&physician_id),
        )?;

        let now = self.clock.now();
        let ledger = SlotLedger::from_bookings(&physician_id, &booked);
        let resolver = AvailabilityResolver::new(&self.holidays, now);

        debug!(
            "Physician {} has {} booking(s) at {} {} before write",
            physician_id,
            occupancy(&physician_id, date, time, &booked),
            date,
            time
        );

        if !resolver.is_bookable(&schedule, date, time, &ledger) {
            warn!("Rejected booking for physician {} at {} {}: slot unavailable", physician_id, date, time);
            return Err(BookingError::SlotUnavailable { date, time });
        }

        let mut booking = Booking::from_request(request, now);
        booking.id = self.store.create(BOOKINGS_COLLECTION, booking.to_document()).await?;

        info!("Created booking {} for physician {} at {} {}", booking.id, physician_id, date, time);
        Ok(booking.receipt())
    }
}
