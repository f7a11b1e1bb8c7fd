pub mod ai;
pub mod auth;
pub mod dashboard;
pub mod logs;
pub mod media;
pub mod notes;
pub mod organizations;
pub mod profile;
pub mod progress;
pub mod projects;
pub mod reports;
pub mod session;
pub mod supplies;
pub mod tasks;
pub mod weather;
