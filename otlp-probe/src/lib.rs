#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

use shadow_rs::shadow;

pub mod config;
pub mod error;
mod observability;
pub mod probe;

shadow!(build);

pub use crate::probe::MetricProbe;
