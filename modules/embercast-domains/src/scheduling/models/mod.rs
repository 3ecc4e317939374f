pub mod auto_schedule_settings;
pub mod schedule_entry;

pub use auto_schedule_settings::AutoScheduleSettings;
pub use schedule_entry::ScheduleEntry;
