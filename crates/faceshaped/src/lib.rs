//! faceshaped — HTTP service classifying face shape from an uploaded photo.

pub mod config;
pub mod engine;
pub mod error;
pub mod routes;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use engine::{spawn_engine, EngineError, EngineHandle};
pub use routes::{router, AppState};
