use chrono::NaiveDate;
use tracing::{debug, info};

use shared_utils::AppState;

use crate::models::{
    AvailabilityRecord, DatedSlots, PhysicianSchedule, SaveFixedScheduleRequest,
    SaveRotatingScheduleRequest, Schedule, ScheduleError, ScheduleKind, SlotDefinition, SlotInput,
    Weekday, WeekdaySlots,
};
use crate::record::{merge_dated_slots, merge_weekday_slots, remove_date, remove_weekday};
use crate::services::repository::ScheduleRepository;

/// Staff-facing edits to a physician's availability.
pub struct AvailabilityEditorService {
    repository: ScheduleRepository,
}

impl AvailabilityEditorService {
    pub fn new(state: &AppState) -> Self {
        Self {
            repository: ScheduleRepository::new(state.store.clone()),
        }
    }

    pub async fn get_schedule(&self, physician_id: &str) -> Result<PhysicianSchedule, ScheduleError> {
        self.repository.load_schedule(physician_id).await
    }

    /// Adds the given slots to every selected weekday, creating the fixed
    /// record on first use.
    pub async fn save_fixed(
        &self,
        physician_id: &str,
        request: SaveFixedScheduleRequest,
    ) -> Result<AvailabilityRecord, ScheduleError> {
        let slots = validate_slots(&request.slots)?;
        if request.weekdays.is_empty() {
            return Err(ScheduleError::EmptyEdit("select at least one weekday".to_string()));
        }
        if slots.is_empty() {
            return Err(ScheduleError::EmptyEdit("add at least one slot".to_string()));
        }

        let schedule = self.repository.load_schedule(physician_id).await?;
        ensure_kind_allowed(&schedule, ScheduleKind::Fixed)?;

        let record = match schedule.fixed {
            Some(mut record) => {
                let existing = record.weekday_slots().cloned().unwrap_or_default();
                record.schedule = Schedule::Fixed {
                    weekday_slots: merge_weekday_slots(&existing, &request.weekdays, &slots),
                };
                self.repository.save_record(&record).await?;
                record
            }
            None => {
                let weekday_slots = merge_weekday_slots(&WeekdaySlots::new(), &request.weekdays, &slots);
                self.repository
                    .create_record(physician_id, Schedule::Fixed { weekday_slots })
                    .await?
            }
        };

        info!(
            "Saved fixed availability {} for physician {} ({} weekdays)",
            record.id,
            physician_id,
            record.weekday_slots().map_or(0, |days| days.len())
        );
        Ok(record)
    }

    /// Adds slots to specific dates, creating the rotating record on first use.
    pub async fn save_rotating(
        &self,
        physician_id: &str,
        request: SaveRotatingScheduleRequest,
    ) -> Result<AvailabilityRecord, ScheduleError> {
        let mut selections = DatedSlots::new();
        for (date, inputs) in &request.dates {
            let slots = validate_slots(inputs)?;
            if !slots.is_empty() {
                selections.insert(*date, slots);
            }
        }
        if selections.is_empty() {
            return Err(ScheduleError::EmptyEdit("add at least one slot to a date".to_string()));
        }

        let schedule = self.repository.load_schedule(physician_id).await?;
        ensure_kind_allowed(&schedule, ScheduleKind::Rotating)?;

        let record = match schedule.rotating {
            Some(mut record) => {
                let existing = record.dated_slots().cloned().unwrap_or_default();
                record.schedule = Schedule::Rotating {
                    dated_slots: merge_dated_slots(&existing, &selections),
                };
                self.repository.save_record(&record).await?;
                record
            }
            None => {
                let dated_slots = merge_dated_slots(&DatedSlots::new(), &selections);
                self.repository
                    .create_record(physician_id, Schedule::Rotating { dated_slots })
                    .await?
            }
        };

        info!(
            "Saved rotating availability {} for physician {} ({} dates)",
            record.id,
            physician_id,
            record.schedule.calendar_dates().len()
        );
        Ok(record)
    }

    pub async fn remove_weekday(
        &self,
        record_id: &str,
        weekday: Weekday,
    ) -> Result<AvailabilityRecord, ScheduleError> {
        let mut record = self.repository.load_record(record_id).await?;
        let existing = record.weekday_slots().ok_or_else(|| ScheduleError::WrongScheduleKind {
            record_id: record_id.to_string(),
            expected: ScheduleKind::Fixed,
        })?;

        record.schedule = Schedule::Fixed {
            weekday_slots: remove_weekday(existing, weekday),
        };
        self.repository.save_record(&record).await?;

        debug!("Removed {} from availability {}", weekday, record_id);
        Ok(record)
    }

    pub async fn remove_date(
        &self,
        record_id: &str,
        date: NaiveDate,
    ) -> Result<AvailabilityRecord, ScheduleError> {
        let mut record = self.repository.load_record(record_id).await?;
        let existing = record.dated_slots().ok_or_else(|| ScheduleError::WrongScheduleKind {
            record_id: record_id.to_string(),
            expected: ScheduleKind::Rotating,
        })?;

        record.schedule = Schedule::Rotating {
            dated_slots: remove_date(existing, date),
        };
        self.repository.save_record(&record).await?;

        debug!("Removed {} from availability {}", date, record_id);
        Ok(record)
    }

    /// Deleting the record frees the physician to switch schedule kinds.
    pub async fn delete_record(&self, record_id: &str) -> Result<(), ScheduleError> {
        let record = self.repository.load_record(record_id).await?;
        self.repository.delete_record(record_id).await?;

        info!("Deleted {} availability {} for physician {}", record.kind(), record_id, record.physician_id);
        Ok(())
    }
}

fn validate_slots(inputs: &[SlotInput]) -> Result<Vec<SlotDefinition>, ScheduleError> {
    inputs.iter().map(SlotInput::validate).collect()
}

/// A physician holds either a fixed or a rotating schedule, never both.
fn ensure_kind_allowed(schedule: &PhysicianSchedule, wanted: ScheduleKind) -> Result<(), ScheduleError> {
    let other = match wanted {
        ScheduleKind::Fixed => ScheduleKind::Rotating,
        ScheduleKind::Rotating => ScheduleKind::Fixed,
    };

    if schedule.record(other).is_some() {
        return Err(ScheduleError::ScheduleKindConflict {
            physician_id: schedule.physician_id.clone(),
            existing: other,
        });
    }
    Ok(())
}
