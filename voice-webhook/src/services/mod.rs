pub mod metrics;

pub use self::metrics::{get_metrics, init_metrics};
