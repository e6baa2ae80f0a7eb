pub mod config;
pub mod handlers;
pub mod services;
pub mod startup;
pub mod twiml;

pub use startup::{build_router, AppState, Application};
