pub mod insights;
pub mod permissions;
pub mod progress;
pub mod schedule;
