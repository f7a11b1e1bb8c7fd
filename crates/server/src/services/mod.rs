pub mod access;
pub mod ai;
pub mod records;
pub mod storage;
pub mod unit_progress;
pub mod weather;
