//! 后台 Worker
//!
//! - `ReminderWorker`: 每日到期提醒
//! - `StatusSweepWorker`: 定期状态巡检

mod reminder_worker;
mod runner;
mod single_flight;
mod sweep_worker;

pub use reminder_worker::ReminderWorker;
pub use runner::run_every;
pub use single_flight::{SingleFlight, SingleFlightGuard};
pub use sweep_worker::StatusSweepWorker;
