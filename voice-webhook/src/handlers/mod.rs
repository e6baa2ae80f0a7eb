pub mod app;
pub mod metrics;
pub mod voice;

pub use app::{health_check, index, readiness_check};
