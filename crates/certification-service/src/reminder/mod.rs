//! 到期提醒与状态巡检

mod renewal;
mod schedule;
mod scheduler;
mod sweep;

pub use renewal::RenewalLinks;
pub use schedule::{
    PLANNING_MIN_VALIDITY_MONTHS, ScheduleEntry, derive_schedule, find_applicable_tier,
    should_fire,
};
pub use scheduler::{ReminderRunSummary, ReminderScheduler, ReminderSettings};
pub use sweep::{StatusSweeper, SweepSummary};
