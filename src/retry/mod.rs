pub mod controller;

pub use crate::config::{RetryPolicy, fibonacci};
pub use controller::{Committed, RetryController, WriteIntent};
