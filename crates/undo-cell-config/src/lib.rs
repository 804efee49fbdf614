pub mod config;

pub use config::{AppConfig, MAX_CAPACITY};
