pub mod access;
pub mod api;
pub mod config;
pub mod diff;
pub mod errors;
pub mod fleet;
pub mod health;
pub mod history;
pub mod http;
pub mod logging;
pub mod postgres;
pub mod profile;
pub mod triage;

pub use errors::TriageError;
