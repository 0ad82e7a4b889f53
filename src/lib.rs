pub mod app;
pub mod backup;
pub mod checkpoint;
pub mod cli;
pub mod completions;
pub mod config;
pub mod db;
pub mod domain;
pub mod imports;
pub mod logging;
pub mod rotation;
pub mod store;
pub mod views;

pub use app::{App, AppError};
pub use store::EventStore;
