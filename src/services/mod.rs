pub mod completion;
pub mod definitions;
pub mod engine;
pub mod escalation;
pub mod estimate;
pub mod geo;
pub mod holidays;
pub mod lifecycle;
pub mod listing;
pub mod maintenance;
pub mod notify;
pub mod penalty;
pub mod providers;
pub mod recurrence;
pub mod release;
pub mod routing;
pub mod sweep_lock;
pub mod time_window;
pub mod vision;

pub use engine::{Clock, Collaborators, JobService, SystemClock};
