pub mod editor;
pub mod picker;
pub mod repository;

pub use editor::AvailabilityEditorService;
pub use picker::SlotPickerService;
pub use repository::ScheduleRepository;
