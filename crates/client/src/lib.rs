//! Typed access to the Canteiro API, plus the load-state bookkeeping the
//! screens use to decide between a full spinner and a background refresh.

pub mod client;
pub mod error;
pub mod state;

pub use client::CanteiroClient;
pub use error::{ClientError, Result};
pub use state::{LoadState, Resource};
