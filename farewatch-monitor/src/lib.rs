pub mod scheduler;
pub mod cycle;

pub use scheduler::{CycleHandler, MonitorScheduler, MonitorTask, TaskStatus};
pub use cycle::SearchCycle;
