use std::sync::Arc;

use tracing::{debug, warn};

use shared_database::DocumentStore;

use crate::document::AVAILABILITY_COLLECTION;
use crate::ledger::{BookedSlot, SlotLedger, BOOKINGS_COLLECTION};
use crate::models::{AvailabilityRecord, PhysicianSchedule, Schedule, ScheduleError};

/// Reads and writes availability records and booking snapshots.
#[derive(Clone)]
pub struct ScheduleRepository {
    store: Arc<dyn DocumentStore>,
}

impl ScheduleRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn load_schedule(&self, physician_id: &str) -> Result<PhysicianSchedule, ScheduleError> {
        debug!("Loading availability for physician {}", physician_id);

        let docs = self
            .store
            .find_by(AVAILABILITY_COLLECTION, "medicoId", physician_id)
            .await?;

        Ok(PhysicianSchedule::from_documents(physician_id, &docs))
    }

    pub async fn load_record(&self, record_id: &str) -> Result<AvailabilityRecord, ScheduleError> {
        let doc = self
            .store
            .get(AVAILABILITY_COLLECTION, record_id)
            .await?
            .ok_or_else(|| ScheduleError::RecordNotFound(record_id.to_string()))?;

        AvailabilityRecord::from_document(&doc)
    }

    pub async fn create_record(
        &self,
        physician_id: &str,
        schedule: Schedule,
    ) -> Result<AvailabilityRecord, ScheduleError> {
        let mut record = AvailabilityRecord {
            id: String::new(),
            physician_id: physician_id.to_string(),
            schedule,
        };

        record.id = self
            .store
            .create(AVAILABILITY_COLLECTION, record.to_document())
            .await?;

        debug!("Created {} availability {} for physician {}", record.kind(), record.id, physician_id);
        Ok(record)
    }

    pub async fn save_record(&self, record: &AvailabilityRecord) -> Result<(), ScheduleError> {
        self.store
            .replace(AVAILABILITY_COLLECTION, &record.id, record.to_document())
            .await?;
        Ok(())
    }

    pub async fn delete_record(&self, record_id: &str) -> Result<(), ScheduleError> {
        self.store.delete(AVAILABILITY_COLLECTION, record_id).await?;
        Ok(())
    }

    /// Every readable booking for the physician, in one read.
    pub async fn load_booked_slots(&self, physician_id: &str) -> Result<Vec<BookedSlot>, ScheduleError> {
        let docs = self
            .store
            .find_by(BOOKINGS_COLLECTION, "medicoId", physician_id)
            .await?;

        let total = docs.len();
        let booked: Vec<BookedSlot> = docs.iter().filter_map(BookedSlot::from_document).collect();
        if booked.len() < total {
            warn!(
                "{} of {} bookings for physician {} could not be read and are not counted",
                total - booked.len(),
                total,
                physician_id
            );
        }

        Ok(booked)
    }

    pub async fn load_ledger(&self, physician_id: &str) -> Result<SlotLedger, ScheduleError> {
        let booked = self.load_booked_slots(physician_id).await?;
        Ok(SlotLedger::from_bookings(physician_id, &booked))
    }
}
