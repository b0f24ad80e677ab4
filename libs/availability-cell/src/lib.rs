pub mod document;
pub mod handlers;
pub mod ledger;
pub mod models;
pub mod record;
pub mod resolver;
pub mod router;
pub mod services;

pub use ledger::{occupancy, BookedSlot, SlotLedger, BOOKINGS_COLLECTION};
pub use models::*;
pub use resolver::{AvailabilityResolver, CalendarDay, DayAvailability};
pub use services::*;
