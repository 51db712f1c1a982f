pub mod backup_exchange;
pub mod core;
pub mod routines;
pub mod shifts;
pub mod timetable;
