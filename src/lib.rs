pub mod application;
pub mod cli;
pub mod client;
pub mod config;
pub mod domain;
pub mod server;
pub mod storage;
pub mod telemetry;

pub use application::{AppError, ErrorKind, TripService};
pub use domain::*;
pub use storage::Repository;
